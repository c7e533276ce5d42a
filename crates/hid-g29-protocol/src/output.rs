//! Command encoding.
//!
//! All functions are pure and allocation-free: a [`Command`] maps to one or
//! two fixed-length output reports held inline in an [`OutputSequence`].
//!
//! Numeric parameters never fail; they are clamped to their documented range
//! (NaN is treated as the command's neutral value). Only structurally wrong
//! commands fail, with [`ProtocolError::InvalidCommandShape`].

#![deny(static_mut_refs)]

use core::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::error::{ProtocolError, ProtocolResult};
use crate::table::{
    AutoCenterMap, ConstantForceMap, ForceOffMap, FrictionMap, LedMap, OUTPUT_REPORT_LEN,
    OutputReport, ProtocolTable, RangeMap,
};

/// Number of LED segments on the rev bar.
pub const LED_SEGMENTS: usize = 5;

/// Hardware force-feedback effect slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum EffectSlot {
    /// Reserved address that stops every slot at once.
    #[default]
    All,
    /// A single slot, `1..=4`.
    Slot(u8),
}

impl EffectSlot {
    /// `0` selects every slot, `1..=4` a single one.
    pub fn from_index(index: u8) -> ProtocolResult<Self> {
        match index {
            0 => Ok(EffectSlot::All),
            1..=4 => Ok(EffectSlot::Slot(index)),
            other => Err(ProtocolError::invalid_shape(format!(
                "effect slot {other} out of range 0..=4"
            ))),
        }
    }
}

/// Auto-centering spring.
///
/// Serialized as `false` (off), `true` (device default profile) or a
/// `[strength, rate]` pair with both values in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "AutoCenterRepr", into = "AutoCenterRepr")]
pub enum AutoCenter {
    Off,
    #[default]
    Default,
    Custom { strength: f32, rate: f32 },
}

#[derive(Clone, Copy, Serialize, Deserialize)]
#[serde(untagged)]
enum AutoCenterRepr {
    Enabled(bool),
    Custom([f32; 2]),
}

impl From<AutoCenterRepr> for AutoCenter {
    fn from(repr: AutoCenterRepr) -> Self {
        match repr {
            AutoCenterRepr::Enabled(false) => AutoCenter::Off,
            AutoCenterRepr::Enabled(true) => AutoCenter::Default,
            AutoCenterRepr::Custom([strength, rate]) => AutoCenter::Custom { strength, rate },
        }
    }
}

impl From<AutoCenter> for AutoCenterRepr {
    fn from(value: AutoCenter) -> Self {
        match value {
            AutoCenter::Off => AutoCenterRepr::Enabled(false),
            AutoCenter::Default => AutoCenterRepr::Enabled(true),
            AutoCenter::Custom { strength, rate } => AutoCenterRepr::Custom([strength, rate]),
        }
    }
}

/// Rev-bar LED request.
#[derive(Debug, Clone, PartialEq)]
pub enum LedPattern {
    Off,
    /// Fill level in `[0, 1]`, quantized to 0..=5 lit segments.
    Percent(f32),
    /// Segment states left to right as `'0'`/`'1'` characters.
    Text(String),
    /// Segment states left to right as `0`/`1` values.
    Segments(Vec<u8>),
}

/// A semantic command for the device.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    ForceOff(EffectSlot),
    /// Constant force; `0.5` is centered (no force), `0.0` full left,
    /// `1.0` full right.
    ConstantForce(f32),
    /// Friction coefficient in `[0, 1]`; `0` turns friction off.
    Friction(f32),
    AutoCenter(AutoCenter),
    /// Rotation range in degrees.
    Range(u16),
    Leds(LedPattern),
    /// A caller-built output report, forwarded verbatim.
    Relay(Vec<u8>),
}

impl Command {
    /// Short name for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Command::ForceOff(_) => "force_off",
            Command::ConstantForce(_) => "constant_force",
            Command::Friction(_) => "friction",
            Command::AutoCenter(_) => "autocenter",
            Command::Range(_) => "range",
            Command::Leds(_) => "leds",
            Command::Relay(_) => "relay",
        }
    }
}

/// One or two output reports, to be written in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputSequence {
    reports: [OutputReport; 2],
    len: usize,
}

impl OutputSequence {
    fn single(report: OutputReport) -> Self {
        Self {
            reports: [report, [0; OUTPUT_REPORT_LEN]],
            len: 1,
        }
    }

    fn pair(first: OutputReport, second: OutputReport) -> Self {
        Self {
            reports: [first, second],
            len: 2,
        }
    }

    pub fn as_slice(&self) -> &[OutputReport] {
        self.reports.get(..self.len).unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.len
    }

    /// Always `false`; every command encodes to at least one report.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn first(&self) -> &OutputReport {
        &self.reports[0]
    }

    pub fn iter(&self) -> core::slice::Iter<'_, OutputReport> {
        self.as_slice().iter()
    }
}

impl<'a> IntoIterator for &'a OutputSequence {
    type Item = &'a OutputReport;
    type IntoIter = core::slice::Iter<'a, OutputReport>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Encode `command` into the report(s) to send.
///
/// # Errors
///
/// [`ProtocolError::InvalidCommandShape`] for an effect slot outside
/// `0..=4`, an LED pattern with values other than 0/1, or a relay report
/// that is not exactly [`OUTPUT_REPORT_LEN`] bytes. Nothing is encoded in
/// that case.
pub fn encode(table: &ProtocolTable, command: &Command) -> ProtocolResult<OutputSequence> {
    let out = &table.output;
    match command {
        Command::ForceOff(slot) => force_off(&out.force_off, *slot).map(OutputSequence::single),
        Command::ConstantForce(value) => {
            constant_force(&out.constant_force, &out.force_off, *value).map(OutputSequence::single)
        }
        Command::Friction(value) => {
            friction(&out.friction, &out.force_off, *value).map(OutputSequence::single)
        }
        Command::AutoCenter(mode) => Ok(autocenter(&out.autocenter, *mode)),
        Command::Range(degrees) => Ok(OutputSequence::single(range(&out.range, *degrees))),
        Command::Leds(pattern) => {
            let mask = led_mask(&out.leds, pattern)?;
            Ok(OutputSequence::single(leds(&out.leds, mask)))
        }
        Command::Relay(bytes) => {
            let report: OutputReport = bytes.as_slice().try_into().map_err(|_| {
                ProtocolError::invalid_shape(format!(
                    "relay report must be {OUTPUT_REPORT_LEN} bytes, got {}",
                    bytes.len()
                ))
            })?;
            Ok(OutputSequence::single(report))
        }
    }
}

fn force_off(map: &ForceOffMap, slot: EffectSlot) -> ProtocolResult<OutputReport> {
    let address = match slot {
        EffectSlot::All => map.all_slots,
        EffectSlot::Slot(n) => usize::from(n)
            .checked_sub(1)
            .and_then(|i| map.slot_addresses.get(i))
            .copied()
            .ok_or_else(|| {
                ProtocolError::invalid_shape(format!("effect slot {n} out of range 0..=4"))
            })?,
    };
    let mut report = map.template;
    report[map.address_offset] = address;
    Ok(report)
}

fn constant_force(
    map: &ConstantForceMap,
    off: &ForceOffMap,
    value: f32,
) -> ProtocolResult<OutputReport> {
    if value.is_nan() || value.total_cmp(&0.5) == Ordering::Equal {
        return force_off(off, EffectSlot::Slot(map.slot));
    }
    let value = value.clamp(0.0, 1.0);
    let mut report = map.template;
    map.magnitude.write(&mut report, map.magnitude.scale(1.0 - value));
    Ok(report)
}

fn friction(map: &FrictionMap, off: &ForceOffMap, value: f32) -> ProtocolResult<OutputReport> {
    if value.is_nan() || value <= 0.0 {
        return force_off(off, EffectSlot::Slot(map.slot));
    }
    let mut report = map.template;
    map.coefficient
        .write(&mut report, map.coefficient.scale(value));
    Ok(report)
}

fn autocenter(map: &AutoCenterMap, mode: AutoCenter) -> OutputSequence {
    let (strength, rate) = match mode {
        AutoCenter::Off => return OutputSequence::single(map.disable),
        AutoCenter::Default => (map.default_strength, map.default_rate),
        AutoCenter::Custom { strength, rate } => (map.strength.scale(strength), map.rate.scale(rate)),
    };
    let mut profile = map.profile;
    map.strength.write(&mut profile, strength);
    map.rate.write(&mut profile, rate);
    OutputSequence::pair(map.enable, profile)
}

fn range(map: &RangeMap, degrees: u16) -> OutputReport {
    let [lo, hi] = degrees
        .clamp(map.min_degrees, map.max_degrees)
        .to_le_bytes();
    let mut report = map.template;
    report[map.lsb_offset] = lo;
    report[map.msb_offset] = hi;
    report
}

fn leds(map: &LedMap, mask: u8) -> OutputReport {
    let mut report = map.template;
    report[map.mask_offset] = mask;
    report
}

/// Number of lit segments for a fill level.
fn lit_segments(percent: f32) -> usize {
    if percent.is_nan() {
        return 0;
    }
    #[allow(clippy::cast_possible_truncation)]
    let q = (percent.clamp(0.0, 1.0) * 100.0).round() as i32;
    match q {
        85.. => 5,
        70..=84 => 4,
        40..=69 => 3,
        20..=39 => 2,
        5..=19 => 1,
        _ => 0,
    }
}

/// Pack an LED pattern into the rev-bar bitmask.
///
/// At most [`LED_SEGMENTS`] segments are honoured; extra ones are discarded
/// before validation.
pub fn led_mask(map: &LedMap, pattern: &LedPattern) -> ProtocolResult<u8> {
    let mut lit = [false; LED_SEGMENTS];
    match pattern {
        LedPattern::Off => {}
        LedPattern::Percent(p) => {
            let n = lit_segments(*p);
            lit.iter_mut().take(n).for_each(|s| *s = true);
        }
        LedPattern::Text(text) => {
            for (slot, c) in lit.iter_mut().zip(text.chars()) {
                *slot = match c {
                    '0' => false,
                    '1' => true,
                    other => {
                        return Err(ProtocolError::invalid_shape(format!(
                            "LED character {other:?} is not '0' or '1'"
                        )));
                    }
                };
            }
        }
        LedPattern::Segments(values) => {
            for (slot, &v) in lit.iter_mut().zip(values) {
                *slot = match v {
                    0 => false,
                    1 => true,
                    other => {
                        return Err(ProtocolError::invalid_shape(format!(
                            "LED segment value {other} is not 0 or 1"
                        )));
                    }
                };
            }
        }
    }
    Ok(lit
        .iter()
        .zip(map.weights)
        .filter(|(on, _)| **on)
        .fold(0u8, |mask, (_, weight)| mask | weight))
}
