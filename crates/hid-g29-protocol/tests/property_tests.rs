//! Property-based tests for the G29 protocol crate.
//!
//! Uses proptest with 500 cases to verify invariants on:
//! - Decoder (range of normalized leaves, incremental vs. full decode)
//! - Differ (change set is exactly the differing leaves, idempotence)
//! - Encoder (clamping, report framing, scaling round-trips)

use proptest::prelude::*;
use racing_wheel_hid_g29_protocol::{
    AutoCenter, Command, Field, G29_INPUT_REPORT_LEN, G29_TABLE, LedPattern, OUTPUT_REPORT_LEN,
    WheelInputState, decode, diff, encode, led_mask,
};

fn frame() -> impl Strategy<Value = Vec<u8>> {
    proptest::collection::vec(any::<u8>(), G29_INPUT_REPORT_LEN)
}

fn full_decode(bytes: &[u8]) -> Result<WheelInputState, TestCaseError> {
    decode(&G29_TABLE, bytes, None, &WheelInputState::default())
        .map_err(|e| TestCaseError::fail(e.to_string()))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    // ── Decoder ──────────────────────────────────────────────────────────────

    /// Normalized leaves stay inside their documented ranges.
    #[test]
    fn prop_decoded_axes_in_range(bytes in frame()) {
        let state = full_decode(&bytes)?;
        prop_assert!((-1.0..=1.0).contains(&state.wheel.turn));
        for v in [state.pedals.gas, state.pedals.brake, state.pedals.clutch] {
            prop_assert!((0.0..=1.0).contains(&v), "pedal {} out of range", v);
        }
        prop_assert!((-1..=6).contains(&state.shifter.gear));
    }

    /// Frames of any other length are rejected, never truncated or padded.
    #[test]
    fn prop_wrong_length_rejected(len in 0usize..64) {
        prop_assume!(len != G29_INPUT_REPORT_LEN);
        let bytes = vec![0u8; len];
        prop_assert!(decode(&G29_TABLE, &bytes, None, &WheelInputState::default()).is_err());
    }

    /// Incremental decoding agrees with decoding from scratch on every
    /// stateless leaf.
    #[test]
    fn prop_incremental_matches_full(a in frame(), b in frame()) {
        let state_a = full_decode(&a)?;
        let incremental = decode(&G29_TABLE, &b, Some(a.as_slice()), &state_a)
            .map_err(|e| TestCaseError::fail(e.to_string()))?;
        let full = full_decode(&b)?;
        for field in Field::ALL {
            if field == Field::WheelSpinner {
                continue;
            }
            prop_assert_eq!(incremental.get(field), full.get(field), "{}", field);
        }
    }

    // ── Differ ───────────────────────────────────────────────────────────────

    /// The change set holds exactly the leaves that differ, with new values.
    #[test]
    fn prop_change_set_is_exact(a in frame(), b in frame()) {
        let previous = full_decode(&a)?;
        let next = decode(&G29_TABLE, &b, Some(a.as_slice()), &previous)
            .map_err(|e| TestCaseError::fail(e.to_string()))?;
        let changes = diff(&previous, &next);
        for field in Field::ALL {
            if previous.get(field) == next.get(field) {
                prop_assert!(!changes.contains(field), "{} reported unchanged", field);
            } else {
                prop_assert_eq!(changes.get(field), Some(next.get(field)));
            }
        }

        let mut rebuilt = previous;
        for (field, value) in changes.iter() {
            prop_assert!(rebuilt.set(field, value));
        }
        prop_assert_eq!(rebuilt, next);
    }

    /// Feeding the same frame twice yields no change the second time.
    #[test]
    fn prop_same_frame_twice_is_empty(bytes in frame()) {
        let first = full_decode(&bytes)?;
        let second = decode(&G29_TABLE, &bytes, Some(bytes.as_slice()), &first)
            .map_err(|e| TestCaseError::fail(e.to_string()))?;
        prop_assert!(diff(&first, &second).is_empty());
    }

    // ── Encoder ──────────────────────────────────────────────────────────────

    /// Range is always clamped into [40, 900].
    #[test]
    fn prop_range_clamped(degrees in any::<u16>()) {
        let seq = encode(&G29_TABLE, &Command::Range(degrees))
            .map_err(|e| TestCaseError::fail(e.to_string()))?;
        let r = seq.first();
        let encoded = u16::from_le_bytes([r[2], r[3]]);
        prop_assert_eq!(encoded, degrees.clamp(40, 900));
        prop_assert_eq!(&r[..2], &[0xF8u8, 0x81][..]);
    }

    /// Constant force never fails and always lands in one report.
    #[test]
    fn prop_constant_force_total(v in any::<f32>()) {
        let seq = encode(&G29_TABLE, &Command::ConstantForce(v))
            .map_err(|e| TestCaseError::fail(e.to_string()))?;
        prop_assert_eq!(seq.len(), 1);
        prop_assert_eq!(seq.first().len(), OUTPUT_REPORT_LEN);
    }

    /// Constant-force magnitude is within one step of |v - 1| * 255.
    #[test]
    fn prop_constant_force_magnitude(v in 0.0f32..=1.0) {
        prop_assume!((v - 0.5).abs() > f32::EPSILON);
        let seq = encode(&G29_TABLE, &Command::ConstantForce(v))
            .map_err(|e| TestCaseError::fail(e.to_string()))?;
        let magnitude = f32::from(seq.first()[2]);
        prop_assert!((magnitude - (1.0 - v) * 255.0).abs() <= 0.5 + 1e-3);
    }

    /// Friction writes the same coefficient for both directions.
    #[test]
    fn prop_friction_symmetric(v in 0.01f32..=1.0) {
        let seq = encode(&G29_TABLE, &Command::Friction(v))
            .map_err(|e| TestCaseError::fail(e.to_string()))?;
        let r = seq.first();
        prop_assert_eq!(r[0], 0x21);
        prop_assert_eq!(r[2], r[4]);
        prop_assert!(r[2] <= 7);
    }

    /// Custom autocenter parameters round-trip within one quantization step.
    #[test]
    fn prop_autocenter_round_trip(strength in 0.0f32..=1.0, rate in 0.0f32..=1.0) {
        let map = &G29_TABLE.output.autocenter;
        let seq = encode(&G29_TABLE, &Command::AutoCenter(AutoCenter::Custom { strength, rate }))
            .map_err(|e| TestCaseError::fail(e.to_string()))?;
        prop_assert_eq!(seq.len(), 2);
        let profile = seq.as_slice()[1];
        prop_assert_eq!(profile[2], profile[3]);
        let s = map.strength.unscale(profile[2]);
        let r = map.rate.unscale(profile[4]);
        prop_assert!((s - strength).abs() <= 0.5 / 15.0 + 1e-4);
        prop_assert!((r - rate).abs() <= 0.5 / 255.0 + 1e-4);
    }

    /// The LED mask only uses the five segment bits.
    #[test]
    fn prop_led_mask_fits_five_bits(segments in proptest::collection::vec(0u8..=1, 0..10)) {
        let mask = led_mask(&G29_TABLE.output.leds, &LedPattern::Segments(segments.clone()))
            .map_err(|e| TestCaseError::fail(e.to_string()))?;
        prop_assert!(mask < 32);
        let lit = segments.iter().take(5).filter(|&&s| s == 1).count();
        prop_assert_eq!(mask.count_ones() as usize, lit);
    }

    /// Relay accepts exactly seven bytes.
    #[test]
    fn prop_relay_length(bytes in proptest::collection::vec(any::<u8>(), 0..16)) {
        let result = encode(&G29_TABLE, &Command::Relay(bytes.clone()));
        if bytes.len() == OUTPUT_REPORT_LEN {
            let seq = result.map_err(|e| TestCaseError::fail(e.to_string()))?;
            prop_assert_eq!(&seq.first()[..], &bytes[..]);
        } else {
            prop_assert!(result.is_err());
        }
    }
}
