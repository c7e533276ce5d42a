//! Input report decoding.
//!
//! All functions are pure. Decoding is incremental: only the input groups
//! whose backing bytes differ from the previous frame are recomputed; every
//! other leaf is carried over from the previous state.

#![deny(static_mut_refs)]

use tracing::trace;

use crate::error::{ProtocolError, ProtocolResult};
use crate::state::{FieldValue, WheelInputState};
use crate::table::{ProtocolTable, Transform};

/// Set of byte offsets that differ between two frames.
///
/// Offsets past bit 63 are conservatively reported as changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ChangedBytes(u64);

impl ChangedBytes {
    /// Every byte changed (there is no previous frame to compare against).
    pub const ALL: ChangedBytes = ChangedBytes(u64::MAX);

    pub fn contains(&self, offset: usize) -> bool {
        offset >= 64 || self.0 & (1u64 << offset) != 0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn count(&self) -> u32 {
        self.0.count_ones()
    }

    fn insert(&mut self, offset: usize) {
        if offset < 64 {
            self.0 |= 1u64 << offset;
        }
    }
}

/// Byte-level diff of `frame` against `previous`.
///
/// A missing previous frame, or one of a different length, marks every byte
/// as changed.
pub fn changed_bytes(frame: &[u8], previous: Option<&[u8]>) -> ChangedBytes {
    let Some(previous) = previous.filter(|p| p.len() == frame.len()) else {
        return ChangedBytes::ALL;
    };
    let mut changed = ChangedBytes::default();
    for (offset, (a, b)) in frame.iter().zip(previous).enumerate() {
        if a != b {
            changed.insert(offset);
        }
    }
    changed
}

/// Decode `frame` into a new state tree, starting from `previous_state`.
///
/// # Errors
///
/// Returns [`ProtocolError::MalformedFrame`] if `frame` is not exactly
/// `table.frame_len` bytes long. Frames are never truncated or padded.
pub fn decode(
    table: &ProtocolTable,
    frame: &[u8],
    previous_frame: Option<&[u8]>,
    previous_state: &WheelInputState,
) -> ProtocolResult<WheelInputState> {
    if frame.len() != table.frame_len {
        return Err(ProtocolError::MalformedFrame {
            expected: table.frame_len,
            actual: frame.len(),
        });
    }

    let previous_frame = previous_frame.filter(|p| p.len() == frame.len());
    let changed = changed_bytes(frame, previous_frame);
    let mut next = *previous_state;
    if changed.is_empty() {
        return Ok(next);
    }

    for group in table.input {
        if !group.offsets.iter().any(|&offset| changed.contains(offset)) {
            continue;
        }
        for entry in group.entries {
            let current = previous_state.get(entry.field);
            let value = evaluate(&entry.transform, frame, previous_frame, current);
            if !next.set(entry.field, value) {
                trace!(field = %entry.field, ?value, "transform produced mismatched value kind");
            }
        }
    }

    trace!(changed_bytes = changed.count(), "decoded frame");
    Ok(next)
}

fn byte(frame: &[u8], offset: usize) -> u8 {
    frame.get(offset).copied().unwrap_or(0)
}

/// Compute one leaf from the frame. `current` is the leaf's previous value,
/// needed by stateful transforms such as the spinner counter.
fn evaluate(
    transform: &Transform,
    frame: &[u8],
    previous_frame: Option<&[u8]>,
    current: FieldValue,
) -> FieldValue {
    match *transform {
        Transform::Flag { offset, mask } => FieldValue::Bool(byte(frame, offset) & mask != 0),
        Transform::Lookup {
            offset,
            mask,
            table,
            default,
        } => {
            let key = byte(frame, offset) & mask;
            table
                .iter()
                .find(|(k, _)| *k == key)
                .map_or(default, |(_, v)| *v)
        }
        Transform::CenteredAxis16 { lo, hi } => {
            let raw = u16::from_le_bytes([byte(frame, lo), byte(frame, hi)]);
            FieldValue::Axis(normalize_centered(raw))
        }
        Transform::UnitAxis8 { offset, inverted } => {
            let raw = byte(frame, offset);
            let raw = if inverted { u8::MAX - raw } else { raw };
            FieldValue::Axis(f32::from(raw) / 255.0)
        }
        Transform::Spinner {
            offset,
            clockwise,
            counter_clockwise,
        } => {
            let now = byte(frame, offset);
            let before = previous_frame.map_or(0, |p| byte(p, offset));
            let rising = now & !before;
            let mut count = match current {
                FieldValue::Counter(c) => c,
                _ => 0,
            };
            if rising & clockwise != 0 {
                count = count.wrapping_add(1);
            }
            if rising & counter_clockwise != 0 {
                count = count.wrapping_sub(1);
            }
            FieldValue::Counter(count)
        }
    }
}

/// Normalize a 16-bit unsigned axis value to [-1.0, +1.0].
///
/// Center (0x8000) → 0.0, minimum (0x0000) → -1.0, maximum (0xFFFF) → ~+1.0.
fn normalize_centered(raw: u16) -> f32 {
    ((f32::from(raw) - 32768.0) / 32768.0).clamp(-1.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{Dpad, gear};
    use crate::table::{G29_INPUT_REPORT_LEN, G29_TABLE};

    /// Released pedals (0xFF), centered wheel, neutral hat.
    fn idle_frame() -> [u8; G29_INPUT_REPORT_LEN] {
        [0x08, 0x00, 0x00, 0x00, 0x00, 0x80, 0xFF, 0xFF, 0xFF, 0x80, 0x80, 0x00]
    }

    fn decode_from_default(frame: &[u8]) -> ProtocolResult<WheelInputState> {
        decode(&G29_TABLE, frame, None, &WheelInputState::default())
    }

    #[test]
    fn test_idle_frame_decodes_to_default() -> Result<(), Box<dyn std::error::Error>> {
        let state = decode_from_default(&idle_frame())?;
        assert_eq!(state, WheelInputState::default());
        Ok(())
    }

    #[test]
    fn test_wrong_length_rejected() {
        let result = decode_from_default(&[0x08, 0x00, 0x00]);
        assert_eq!(
            result,
            Err(ProtocolError::MalformedFrame {
                expected: 12,
                actual: 3
            })
        );

        let long = [0u8; 13];
        assert!(matches!(
            decode_from_default(&long),
            Err(ProtocolError::MalformedFrame { actual: 13, .. })
        ));
    }

    #[test]
    fn test_wheel_turn_extremes() -> Result<(), Box<dyn std::error::Error>> {
        let mut frame = idle_frame();
        frame[4] = 0x00;
        frame[5] = 0x00;
        let state = decode_from_default(&frame)?;
        assert!((state.wheel.turn + 1.0).abs() < 0.0001, "full left should be -1.0");

        frame[4] = 0xFF;
        frame[5] = 0xFF;
        let state = decode_from_default(&frame)?;
        assert!((state.wheel.turn - 1.0).abs() < 0.001, "full right should be ~+1.0");
        Ok(())
    }

    #[test]
    fn test_pedals_are_inverted() -> Result<(), Box<dyn std::error::Error>> {
        let mut frame = idle_frame();
        frame[6] = 0x00; // gas floored
        frame[7] = 0x80; // brake about half
        let state = decode_from_default(&frame)?;
        assert!((state.pedals.gas - 1.0).abs() < 0.001);
        assert!((state.pedals.brake - 127.0 / 255.0).abs() < 0.001);
        assert!(state.pedals.clutch.abs() < 0.001);
        Ok(())
    }

    #[test]
    fn test_dpad_positions() -> Result<(), Box<dyn std::error::Error>> {
        let expected = [
            Dpad::Up,
            Dpad::UpRight,
            Dpad::Right,
            Dpad::DownRight,
            Dpad::Down,
            Dpad::DownLeft,
            Dpad::Left,
            Dpad::UpLeft,
            Dpad::Neutral,
        ];
        for (raw, dpad) in (0u8..).zip(expected) {
            let mut frame = idle_frame();
            frame[0] = raw | 0x10;
            let state = decode_from_default(&frame)?;
            assert_eq!(state.wheel.dpad, dpad, "hat value {raw}");
            assert!(state.wheel.button_x, "X shares byte 0 with the hat");
        }
        let mut frame = idle_frame();
        frame[0] = 0x0C; // out-of-table hat value
        assert_eq!(decode_from_default(&frame)?.wheel.dpad, Dpad::Neutral);
        Ok(())
    }

    #[test]
    fn test_gear_lookup() -> Result<(), Box<dyn std::error::Error>> {
        let cases = [
            (0x00u8, gear::NEUTRAL),
            (0x01, 1),
            (0x04, 3),
            (0x20, 6),
            (0x40, gear::REVERSE),
            (0x03, gear::NEUTRAL), // two gears at once is not a position
        ];
        for (raw, expected) in cases {
            let mut frame = idle_frame();
            frame[2] = raw | 0x80;
            let state = decode_from_default(&frame)?;
            assert_eq!(state.shifter.gear, expected, "gear byte 0x{raw:02X}");
            assert!(state.wheel.button_plus);
        }
        Ok(())
    }

    #[test]
    fn test_button_bytes() -> Result<(), Box<dyn std::error::Error>> {
        let mut frame = idle_frame();
        frame[1] = 0x01 | 0x08 | 0x20;
        frame[3] = 0x01 | 0x08 | 0x10;
        let state = decode_from_default(&frame)?;
        let w = state.wheel;
        assert!(w.shift_right && !w.shift_left);
        assert!(w.button_l2 && !w.button_r2);
        assert!(w.button_option && !w.button_share);
        assert!(w.button_minus && w.button_spinner && w.button_playstation);
        Ok(())
    }

    #[test]
    fn test_untouched_groups_are_carried_over() -> Result<(), Box<dyn std::error::Error>> {
        let frame = idle_frame();
        let mut previous = WheelInputState::default();
        // A value the frame would never produce: only survives if byte 6 is
        // not recomputed.
        previous.pedals.gas = 0.25;

        let mut next_frame = frame;
        next_frame[5] = 0x70;
        let state = decode(&G29_TABLE, &next_frame, Some(&frame[..]), &previous)?;
        assert!((state.pedals.gas - 0.25).abs() < f32::EPSILON);
        assert!(state.wheel.turn < 0.0);
        Ok(())
    }

    #[test]
    fn test_spinner_counts_rising_edges() -> Result<(), Box<dyn std::error::Error>> {
        let released = idle_frame();
        let mut cw = released;
        cw[3] = 0x02;
        let mut ccw = released;
        ccw[3] = 0x04;

        let mut state = WheelInputState::default();
        let mut prev = released;
        for frame in [cw, released, cw, cw, released, ccw] {
            state = decode(&G29_TABLE, &frame, Some(&prev[..]), &state)?;
            prev = frame;
        }
        // Two clockwise edges (the repeated cw frame is not an edge), one
        // counter-clockwise edge.
        assert_eq!(state.wheel.spinner, 1);

        let state = decode(&G29_TABLE, &ccw, Some(&released[..]), &WheelInputState::default())?;
        assert_eq!(state.wheel.spinner, 255, "counter wraps below zero");
        Ok(())
    }

    #[test]
    fn test_changed_bytes() {
        let a = idle_frame();
        let mut b = a;
        b[4] = 0x01;
        b[5] = 0x7F;
        let changed = changed_bytes(&b, Some(&a[..]));
        assert_eq!(changed.count(), 2);
        assert!(changed.contains(4) && changed.contains(5));
        assert!(!changed.contains(0));

        assert_eq!(changed_bytes(&a, None), ChangedBytes::ALL);
        assert_eq!(changed_bytes(&a, Some(&a[..3])), ChangedBytes::ALL);
        assert!(changed_bytes(&a, Some(&a[..])).is_empty());
    }
}
