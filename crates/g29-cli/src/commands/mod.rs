//! Command implementations for g29ctl

pub mod encode;
#[cfg(feature = "hidapi")]
pub mod monitor;
pub mod replay;

use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::Args;
use racing_wheel_g29_session::{SessionConfig, Topic};
use racing_wheel_hid_g29_protocol::AutoCenter;

use crate::error::CliError;

pub use encode::EncodeCommand;

/// Options shared by every command that opens a session.
#[derive(Args, Debug, Clone, Default)]
pub struct SessionArgs {
    /// JSON file with `range`, `autocenter` and `debug` keys
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Rotation range in degrees (overrides the config file)
    #[arg(long)]
    pub range: Option<u16>,

    /// Disable the auto-centering spring (overrides the config file)
    #[arg(long)]
    pub no_autocenter: bool,

    /// Log every change set at debug level
    #[arg(long)]
    pub debug: bool,

    /// Topics to print; `changes` when none are given
    #[arg(short, long = "topic", value_name = "TOPIC")]
    pub topics: Vec<String>,
}

impl SessionArgs {
    /// Build the session config from the file (if any) and the overrides.
    pub fn load_config(&self) -> Result<SessionConfig> {
        let mut config = match &self.config {
            Some(path) => read_config(path)?,
            None => SessionConfig::default(),
        };
        if let Some(range) = self.range {
            config = config.with_range(range);
        }
        if self.no_autocenter {
            config = config.with_autocenter(AutoCenter::Off);
        }
        if self.debug {
            config = config.with_debug(true);
        }
        Ok(config)
    }

    /// Parsed `--topic` values.
    pub fn topics(&self) -> Result<Vec<Topic>> {
        if self.topics.is_empty() {
            return Ok(vec![Topic::Changes]);
        }
        let topics = self
            .topics
            .iter()
            .map(|name| name.parse::<Topic>())
            .collect::<Result<Vec<_>, _>>()?;
        Ok(topics)
    }
}

fn read_config(path: &Path) -> Result<SessionConfig> {
    let text = std::fs::read_to_string(path).map_err(|e| {
        CliError::InvalidConfiguration(format!("cannot read {}: {e}", path.display()))
    })?;
    Ok(SessionConfig::from_json_str(&text)?)
}
