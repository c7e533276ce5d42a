//! g29ctl - Logitech G29 command-line tool
//!
//! Replays hid-capture files through a wheel session, encodes single
//! commands to raw output reports, and (with the `hidapi` feature) monitors
//! a live wheel.

#![deny(static_mut_refs)]
#![deny(unused_must_use)]
#![deny(clippy::unwrap_used)]

mod capture;
mod commands;
mod error;
#[cfg(feature = "hidapi")]
mod hid;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::commands::EncodeCommand;
#[cfg(feature = "hidapi")]
use crate::commands::monitor::MonitorArgs;
use crate::commands::replay::ReplayArgs;

#[derive(Parser)]
#[command(name = "g29ctl")]
#[command(about = "Logitech G29 wheel tool - replay captures, encode commands, monitor input")]
#[command(version)]
struct Cli {
    /// Output format (human-readable or JSON)
    #[arg(
        long,
        global = true,
        help = "Output in JSON format for machine parsing"
    )]
    json: bool,

    /// Verbose logging
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a capture file and print the resulting events
    Replay(ReplayArgs),

    /// Print the output reports for one command
    #[command(subcommand)]
    Encode(EncodeCommand),

    /// Print events from a connected wheel until Ctrl+C
    #[cfg(feature = "hidapi")]
    Monitor(MonitorArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("g29ctl={log_level},racing_wheel_g29_session={log_level}").into()
            }),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    match execute_command(&cli).await {
        Ok(()) => Ok(()),
        Err(e) => {
            if cli.json {
                output::print_error_json(&e);
            } else {
                output::print_error_human(&e);
            }
            std::process::exit(error::exit_code(&e));
        }
    }
}

async fn execute_command(cli: &Cli) -> Result<()> {
    match &cli.command {
        Commands::Replay(args) => commands::replay::execute(args, cli.json).await,
        Commands::Encode(cmd) => commands::encode::execute(cmd, cli.json),
        #[cfg(feature = "hidapi")]
        Commands::Monitor(args) => commands::monitor::execute(args, cli.json).await,
    }
}
