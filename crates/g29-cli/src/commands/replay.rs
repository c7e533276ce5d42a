//! Replay a hid-capture file through a session

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Args;
use racing_wheel_g29_session::{Session, SessionConfig, SessionStats, Topic};
use tracing::info;

use crate::capture::{CaptureFile, ReplayPort};
use crate::commands::SessionArgs;
use crate::error::CliError;
use crate::output;

#[derive(Args, Debug, Clone)]
pub struct ReplayArgs {
    /// Capture file written by hid-capture
    pub capture: PathBuf,

    #[command(flatten)]
    pub session: SessionArgs,
}

/// What a replay left behind.
#[derive(Debug, Clone, PartialEq)]
pub struct ReplaySummary {
    pub stats: SessionStats,
    /// Output reports the session wrote, initialization included.
    pub written: Vec<Vec<u8>>,
}

/// Execute replay command
pub async fn execute(args: &ReplayArgs, json: bool) -> Result<()> {
    let text = std::fs::read_to_string(&args.capture).map_err(|e| {
        CliError::InvalidCapture(format!("cannot read {}: {e}", args.capture.display()))
    })?;
    let capture = CaptureFile::from_json_str(&text)?;
    let config = args.session.load_config()?;
    let topics = args.session.topics()?;

    let summary = replay(&capture, config, &topics, move |line| println!("{line}"), json).await?;
    output::print_summary(&summary.stats, &summary.written, json);
    Ok(())
}

/// Feed every captured frame through a fresh session, handing each formatted
/// event line to `sink`.
///
/// The device filter always comes from the capture file.
pub async fn replay<F>(
    capture: &CaptureFile,
    config: SessionConfig,
    topics: &[Topic],
    sink: F,
    json: bool,
) -> Result<ReplaySummary>
where
    F: Fn(String) + Send + Sync + 'static,
{
    let filter = capture.filter()?;
    let frames = capture.frames()?;
    info!(frames = frames.len(), ?filter, "replaying capture");

    let port = ReplayPort::new(filter, frames);
    let mut session = Session::new(Arc::new(port.clone()));
    let sink = Arc::new(sink);
    for &topic in topics {
        let sink = Arc::clone(&sink);
        session.subscribe(topic, move |event| sink(output::format_event(event, json)));
    }

    session.connect(config.with_filter(filter)).await?;
    session.run().await?;

    Ok(ReplaySummary {
        stats: session.stats(),
        written: port.written(),
    })
}
