//! Offline command encoding

use anyhow::Result;
use clap::Subcommand;
use racing_wheel_hid_g29_protocol::{
    AutoCenter, Command, EffectSlot, G29_TABLE, LedPattern, encode,
};

use crate::capture::parse_hex_bytes;
use crate::error::CliError;
use crate::output;

#[derive(Subcommand, Debug, Clone)]
pub enum EncodeCommand {
    /// Rotation range in degrees
    Range { degrees: u16 },

    /// Auto-centering spring: `off`, `on`, or `STRENGTH,RATE`
    Autocenter { mode: String },

    /// Constant force; 0.5 is centered, 0 full left, 1 full right
    Constant { value: f32 },

    /// Friction coefficient in [0, 1]
    Friction { value: f32 },

    /// Stop an effect slot (0 stops every slot)
    ForceOff {
        #[arg(default_value_t = 0)]
        slot: u8,
    },

    /// Rev-bar LEDs: `off`, a fill level (`0.6`, `60%`), `10110`, or `1,0,1,1,0`
    Leds { pattern: String },

    /// Raw output report as hex bytes
    Relay {
        #[arg(required = true)]
        bytes: Vec<String>,
    },
}

/// Execute encode command
pub fn execute(cmd: &EncodeCommand, json: bool) -> Result<()> {
    let command = to_command(cmd)?;
    let reports = encode_reports(&command)?;
    output::print_reports(command.kind(), &reports, json);
    Ok(())
}

/// Encode against the G29 table.
pub fn encode_reports(command: &Command) -> Result<Vec<Vec<u8>>> {
    let sequence = encode(&G29_TABLE, command)?;
    Ok(sequence.iter().map(|r| r.to_vec()).collect())
}

pub fn to_command(cmd: &EncodeCommand) -> Result<Command, CliError> {
    let command = match cmd {
        EncodeCommand::Range { degrees } => Command::Range(*degrees),
        EncodeCommand::Autocenter { mode } => Command::AutoCenter(parse_autocenter(mode)?),
        EncodeCommand::Constant { value } => Command::ConstantForce(*value),
        EncodeCommand::Friction { value } => Command::Friction(*value),
        EncodeCommand::ForceOff { slot } => Command::ForceOff(
            EffectSlot::from_index(*slot).map_err(|e| CliError::InvalidArgument(e.to_string()))?,
        ),
        EncodeCommand::Leds { pattern } => Command::Leds(parse_led_pattern(pattern)?),
        EncodeCommand::Relay { bytes } => {
            Command::Relay(parse_hex_bytes(&bytes.join(" ")).map_err(CliError::InvalidArgument)?)
        }
    };
    Ok(command)
}

pub fn parse_autocenter(mode: &str) -> Result<AutoCenter, CliError> {
    match mode.trim().to_ascii_lowercase().as_str() {
        "off" | "false" => Ok(AutoCenter::Off),
        "on" | "true" | "default" => Ok(AutoCenter::Default),
        other => {
            let (strength, rate) = other.split_once(',').ok_or_else(|| {
                CliError::InvalidArgument(format!(
                    "autocenter must be off, on, or STRENGTH,RATE; got '{mode}'"
                ))
            })?;
            Ok(AutoCenter::Custom {
                strength: parse_unit(strength)?,
                rate: parse_unit(rate)?,
            })
        }
    }
}

pub fn parse_led_pattern(pattern: &str) -> Result<LedPattern, CliError> {
    let pattern = pattern.trim();
    if pattern.eq_ignore_ascii_case("off") {
        return Ok(LedPattern::Off);
    }
    if pattern.contains(',') {
        let segments = pattern
            .split(',')
            .map(|s| {
                s.trim()
                    .parse::<u8>()
                    .map_err(|e| CliError::InvalidArgument(format!("LED segment '{s}': {e}")))
            })
            .collect::<Result<Vec<_>, _>>()?;
        return Ok(LedPattern::Segments(segments));
    }
    if pattern.len() > 1 && pattern.chars().all(|c| c == '0' || c == '1') {
        return Ok(LedPattern::Text(pattern.to_string()));
    }
    match pattern.strip_suffix('%') {
        Some(percent) => Ok(LedPattern::Percent(parse_number(percent)? / 100.0)),
        None => Ok(LedPattern::Percent(parse_number(pattern)?)),
    }
}

fn parse_number(s: &str) -> Result<f32, CliError> {
    s.trim()
        .parse::<f32>()
        .map_err(|e| CliError::InvalidArgument(format!("'{s}': {e}")))
}

fn parse_unit(s: &str) -> Result<f32, CliError> {
    let value = parse_number(s)?;
    if (0.0..=1.0).contains(&value) {
        Ok(value)
    } else {
        Err(CliError::InvalidArgument(format!(
            "{value} is outside [0, 1]"
        )))
    }
}
