//! Live monitoring of a connected wheel

use std::sync::Arc;

use anyhow::Result;
use clap::Args;
use colored::Colorize;
use racing_wheel_g29_session::{DeviceFilter, Session};
use racing_wheel_hid_g29_protocol::LOGITECH_VENDOR_ID;
use tracing::warn;

use crate::capture::parse_hex_u16;
use crate::commands::SessionArgs;
use crate::hid::HidWheelPort;
use crate::output;

#[derive(Args, Debug, Clone)]
pub struct MonitorArgs {
    /// Vendor ID to open (hex)
    #[arg(long, value_parser = parse_hex_u16)]
    pub vid: Option<u16>,

    /// Product ID to open (hex)
    #[arg(long, value_parser = parse_hex_u16)]
    pub pid: Option<u16>,

    #[command(flatten)]
    pub session: SessionArgs,
}

/// Execute monitor command
pub async fn execute(args: &MonitorArgs, json: bool) -> Result<()> {
    let mut config = args.session.load_config()?;
    let topics = args.session.topics()?;
    config = config.with_filter(DeviceFilter::new(
        args.vid.unwrap_or(config.filter.vendor_id),
        args.pid.unwrap_or(config.filter.product_id),
    ));
    if config.filter.vendor_id != LOGITECH_VENDOR_ID {
        warn!(filter = ?config.filter, "monitoring a non-Logitech device");
    }

    let mut session = Session::new(Arc::new(HidWheelPort));
    for topic in topics {
        session.subscribe(topic, move |event| output::print_event(event, json));
    }

    session.connect(config).await?;
    if !json {
        eprintln!(
            "{} {:04X}:{:04X} (Press Ctrl+C to stop)",
            "Monitoring".green().bold(),
            config.filter.vendor_id,
            config.filter.product_id
        );
    }

    session
        .run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "cannot listen for Ctrl+C");
                std::future::pending::<()>().await;
            }
        })
        .await?;

    output::print_summary(&session.stats(), &[], json);
    Ok(())
}
