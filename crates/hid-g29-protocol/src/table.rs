//! Protocol table: byte offsets, masks, and value transforms.
//!
//! Everything here is data. The decoder and encoder are written against
//! [`ProtocolTable`], so supporting another hardware revision means adding
//! another table, not touching `input.rs` or `output.rs`.
//!
//! # G29 input report (12 bytes, PS4 mode, no report ID)
//!
//! ```text
//! Byte 0:  bits 0-3 hat (0 = up, clockwise to 7 = up-left, 8 = neutral)
//!          0x10 X, 0x20 square, 0x40 circle, 0x80 triangle
//! Byte 1:  0x01 right paddle, 0x02 left paddle, 0x04 R2, 0x08 L2,
//!          0x10 share, 0x20 option, 0x40 R3, 0x80 L3
//! Byte 2:  bits 0-6 shifter gear, one-hot (1..6, 0x40 = reverse), 0x80 plus
//! Byte 3:  0x01 minus, 0x02 spinner clockwise, 0x04 spinner counter-clockwise,
//!          0x08 spinner press, 0x10 PlayStation
//! Byte 4-5: wheel rotation, u16 little-endian, 0x8000 = center
//! Byte 6:  gas    (0xFF = released, 0x00 = floored)
//! Byte 7:  brake  (same encoding)
//! Byte 8:  clutch (same encoding)
//! Byte 9-11: shifter stick raw position (not decoded)
//! ```
//!
//! # G29 output reports (7 bytes)
//!
//! | Command            | Bytes                                   |
//! |--------------------|-----------------------------------------|
//! | Force off (all)    | `F3 00 00 00 00 00 00`                  |
//! | Force off (slot n) | `n0 00 00 00 00 00 00`                  |
//! | Constant force     | `11 00 mm 00 00 00 00`                  |
//! | Friction           | `21 02 ff 00 ff 00 00`                  |
//! | Autocenter on      | `14 00 00 00 00 00 00` then `FE 0D ss ss rr 00 00` |
//! | Autocenter off     | `F5 00 00 00 00 00 00`                  |
//! | Range              | `F8 81 lo hi 00 00 00`                  |
//! | LEDs               | `F8 12 mask 00 00 00 01`                |

#![deny(static_mut_refs)]

use crate::ids::commands;
use crate::state::{Dpad, Field, FieldValue, gear};

/// Wire size of a G29 input report.
pub const G29_INPUT_REPORT_LEN: usize = 12;

/// Wire size of every G29 output report.
pub const OUTPUT_REPORT_LEN: usize = 7;

/// One output report.
pub type OutputReport = [u8; OUTPUT_REPORT_LEN];

/// How a leaf value is computed from frame bytes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Transform {
    /// `byte & mask != 0`.
    Flag { offset: usize, mask: u8 },
    /// `byte & mask` looked up in `table`; unlisted keys map to `default`.
    Lookup {
        offset: usize,
        mask: u8,
        table: &'static [(u8, FieldValue)],
        default: FieldValue,
    },
    /// Unsigned 16-bit little-endian axis, centered at 0x8000, scaled to [-1, 1].
    CenteredAxis16 { lo: usize, hi: usize },
    /// Unsigned 8-bit axis scaled to [0, 1]; `inverted` maps 0xFF to 0.0.
    UnitAxis8 { offset: usize, inverted: bool },
    /// Edge-triggered detent counter; a rising `clockwise` bit adds one, a
    /// rising `counter_clockwise` bit subtracts one, wrapping.
    Spinner {
        offset: usize,
        clockwise: u8,
        counter_clockwise: u8,
    },
}

impl Transform {
    /// Whether this transform reads the byte at `offset`.
    pub fn reads(&self, offset: usize) -> bool {
        match *self {
            Transform::Flag { offset: o, .. }
            | Transform::Lookup { offset: o, .. }
            | Transform::UnitAxis8 { offset: o, .. }
            | Transform::Spinner { offset: o, .. } => o == offset,
            Transform::CenteredAxis16 { lo, hi } => lo == offset || hi == offset,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InputEntry {
    pub field: Field,
    pub transform: Transform,
}

/// Entries that are recomputed together whenever any of `offsets` changes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InputGroup {
    pub offsets: &'static [usize],
    pub entries: &'static [InputEntry],
}

/// A normalized `[0, 1]` parameter written as an integer `0..=max` into
/// one or more report offsets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScaledParam {
    pub offsets: &'static [usize],
    pub max: u8,
}

impl ScaledParam {
    /// Scale `value` to the native integer range. NaN scales to zero.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn scale(&self, value: f32) -> u8 {
        if value.is_nan() {
            return 0;
        }
        (value.clamp(0.0, 1.0) * f32::from(self.max)).round() as u8
    }

    /// Map a native integer back to `[0, 1]`.
    pub fn unscale(&self, raw: u8) -> f32 {
        if self.max == 0 {
            return 0.0;
        }
        (f32::from(raw) / f32::from(self.max)).clamp(0.0, 1.0)
    }

    /// Write the scaled value into every configured offset of `report`.
    pub fn write(&self, report: &mut OutputReport, value: u8) {
        for &offset in self.offsets {
            if let Some(byte) = report.get_mut(offset) {
                *byte = value;
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ForceOffMap {
    pub template: OutputReport,
    pub address_offset: usize,
    /// Address that stops every slot.
    pub all_slots: u8,
    /// Addresses of slots 1..=4.
    pub slot_addresses: [u8; 4],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConstantForceMap {
    pub template: OutputReport,
    pub magnitude: ScaledParam,
    /// Slot cleared instead of sending a centered force.
    pub slot: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrictionMap {
    pub template: OutputReport,
    /// Written once per rotation direction.
    pub coefficient: ScaledParam,
    /// Slot cleared instead of sending zero friction.
    pub slot: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AutoCenterMap {
    pub enable: OutputReport,
    pub disable: OutputReport,
    pub profile: OutputReport,
    pub strength: ScaledParam,
    pub rate: ScaledParam,
    pub default_strength: u8,
    pub default_rate: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RangeMap {
    pub template: OutputReport,
    pub lsb_offset: usize,
    pub msb_offset: usize,
    pub min_degrees: u16,
    pub max_degrees: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedMap {
    pub template: OutputReport,
    pub mask_offset: usize,
    /// Bit weight of each segment, left to right.
    pub weights: [u8; 5],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputMap {
    pub force_off: ForceOffMap,
    pub constant_force: ConstantForceMap,
    pub friction: FrictionMap,
    pub autocenter: AutoCenterMap,
    pub range: RangeMap,
    pub leds: LedMap,
}

/// Complete description of one device revision's wire format.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProtocolTable {
    pub name: &'static str,
    pub revision: u16,
    /// Exact length of every input frame.
    pub frame_len: usize,
    pub input: &'static [InputGroup],
    pub output: OutputMap,
}

impl ProtocolTable {
    /// Iterate every input entry, in table order.
    pub fn entries(&self) -> impl Iterator<Item = &'static InputEntry> + '_ {
        self.input.iter().flat_map(|group| group.entries.iter())
    }
}

const DPAD_LOOKUP: &[(u8, FieldValue)] = &[
    (0, FieldValue::Dpad(Dpad::Up)),
    (1, FieldValue::Dpad(Dpad::UpRight)),
    (2, FieldValue::Dpad(Dpad::Right)),
    (3, FieldValue::Dpad(Dpad::DownRight)),
    (4, FieldValue::Dpad(Dpad::Down)),
    (5, FieldValue::Dpad(Dpad::DownLeft)),
    (6, FieldValue::Dpad(Dpad::Left)),
    (7, FieldValue::Dpad(Dpad::UpLeft)),
    (8, FieldValue::Dpad(Dpad::Neutral)),
];

const GEAR_LOOKUP: &[(u8, FieldValue)] = &[
    (0x00, FieldValue::Gear(gear::NEUTRAL)),
    (0x01, FieldValue::Gear(1)),
    (0x02, FieldValue::Gear(2)),
    (0x04, FieldValue::Gear(3)),
    (0x08, FieldValue::Gear(4)),
    (0x10, FieldValue::Gear(5)),
    (0x20, FieldValue::Gear(6)),
    (0x40, FieldValue::Gear(gear::REVERSE)),
];

const fn flag(field: Field, offset: usize, mask: u8) -> InputEntry {
    InputEntry {
        field,
        transform: Transform::Flag { offset, mask },
    }
}

const fn pedal(field: Field, offset: usize) -> InputEntry {
    InputEntry {
        field,
        transform: Transform::UnitAxis8 {
            offset,
            inverted: true,
        },
    }
}

const G29_INPUT: &[InputGroup] = &[
    InputGroup {
        offsets: &[0],
        entries: &[
            InputEntry {
                field: Field::WheelDpad,
                transform: Transform::Lookup {
                    offset: 0,
                    mask: 0x0F,
                    table: DPAD_LOOKUP,
                    default: FieldValue::Dpad(Dpad::Neutral),
                },
            },
            flag(Field::WheelButtonX, 0, 0x10),
            flag(Field::WheelButtonSquare, 0, 0x20),
            flag(Field::WheelButtonCircle, 0, 0x40),
            flag(Field::WheelButtonTriangle, 0, 0x80),
        ],
    },
    InputGroup {
        offsets: &[1],
        entries: &[
            flag(Field::WheelShiftRight, 1, 0x01),
            flag(Field::WheelShiftLeft, 1, 0x02),
            flag(Field::WheelButtonR2, 1, 0x04),
            flag(Field::WheelButtonL2, 1, 0x08),
            flag(Field::WheelButtonShare, 1, 0x10),
            flag(Field::WheelButtonOption, 1, 0x20),
            flag(Field::WheelButtonR3, 1, 0x40),
            flag(Field::WheelButtonL3, 1, 0x80),
        ],
    },
    InputGroup {
        offsets: &[2],
        entries: &[
            InputEntry {
                field: Field::ShifterGear,
                transform: Transform::Lookup {
                    offset: 2,
                    mask: 0x7F,
                    table: GEAR_LOOKUP,
                    default: FieldValue::Gear(gear::NEUTRAL),
                },
            },
            flag(Field::WheelButtonPlus, 2, 0x80),
        ],
    },
    InputGroup {
        offsets: &[3],
        entries: &[
            flag(Field::WheelButtonMinus, 3, 0x01),
            InputEntry {
                field: Field::WheelSpinner,
                transform: Transform::Spinner {
                    offset: 3,
                    clockwise: 0x02,
                    counter_clockwise: 0x04,
                },
            },
            flag(Field::WheelButtonSpinner, 3, 0x08),
            flag(Field::WheelButtonPlaystation, 3, 0x10),
        ],
    },
    InputGroup {
        offsets: &[4, 5],
        entries: &[InputEntry {
            field: Field::WheelTurn,
            transform: Transform::CenteredAxis16 { lo: 4, hi: 5 },
        }],
    },
    InputGroup {
        offsets: &[6],
        entries: &[pedal(Field::PedalsGas, 6)],
    },
    InputGroup {
        offsets: &[7],
        entries: &[pedal(Field::PedalsBrake, 7)],
    },
    InputGroup {
        offsets: &[8],
        entries: &[pedal(Field::PedalsClutch, 8)],
    },
];

const fn report(b0: u8, b1: u8) -> OutputReport {
    [b0, b1, 0x00, 0x00, 0x00, 0x00, 0x00]
}

/// Logitech G29 (PS4 mode) protocol table.
pub static G29_TABLE: ProtocolTable = ProtocolTable {
    name: "logitech-g29",
    revision: 1,
    frame_len: G29_INPUT_REPORT_LEN,
    input: G29_INPUT,
    output: OutputMap {
        force_off: ForceOffMap {
            template: report(0x00, 0x00),
            address_offset: 0,
            all_slots: commands::FORCE_OFF_ALL,
            slot_addresses: [0x10, 0x20, 0x30, 0x40],
        },
        constant_force: ConstantForceMap {
            template: report(commands::CONSTANT_FORCE, 0x00),
            magnitude: ScaledParam {
                offsets: &[2],
                max: 0xFF,
            },
            slot: 1,
        },
        friction: FrictionMap {
            template: report(commands::FRICTION, commands::FRICTION_TYPE),
            coefficient: ScaledParam {
                offsets: &[2, 4],
                max: 0x07,
            },
            slot: 2,
        },
        autocenter: AutoCenterMap {
            enable: report(commands::AUTOCENTER_ENABLE, 0x00),
            disable: report(commands::AUTOCENTER_DISABLE, 0x00),
            profile: report(commands::EXTENDED, commands::AUTOCENTER_PROFILE),
            strength: ScaledParam {
                offsets: &[2, 3],
                max: 0x0F,
            },
            rate: ScaledParam {
                offsets: &[4],
                max: 0xFF,
            },
            default_strength: 0x07,
            default_rate: 0xFF,
        },
        range: RangeMap {
            template: report(commands::VENDOR, commands::SET_RANGE),
            lsb_offset: 2,
            msb_offset: 3,
            min_degrees: 40,
            max_degrees: 900,
        },
        leds: LedMap {
            template: [
                commands::VENDOR,
                commands::SET_LEDS,
                0x00,
                0x00,
                0x00,
                0x00,
                commands::SET_LEDS_TRAILER,
            ],
            mask_offset: 2,
            weights: [1, 2, 4, 8, 16],
        },
    },
};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::FIELD_COUNT;

    #[test]
    fn test_every_field_mapped_exactly_once() {
        let mut counts = [0usize; FIELD_COUNT];
        for entry in G29_TABLE.entries() {
            counts[entry.field.index()] += 1;
        }
        for field in Field::ALL {
            assert_eq!(counts[field.index()], 1, "{field} mapped {} times", counts[field.index()]);
        }
    }

    #[test]
    fn test_entries_read_only_their_group_offsets() {
        for group in G29_TABLE.input {
            for entry in group.entries {
                for offset in 0..G29_TABLE.frame_len {
                    if entry.transform.reads(offset) {
                        assert!(
                            group.offsets.contains(&offset),
                            "{} reads byte {offset} outside its group",
                            entry.field
                        );
                    }
                }
            }
        }
    }

    #[test]
    fn test_offsets_within_frame() {
        for group in G29_TABLE.input {
            for &offset in group.offsets {
                assert!(offset < G29_TABLE.frame_len, "offset {offset} past frame end");
            }
        }
    }

    #[test]
    fn test_scaled_param_bounds() {
        let p = ScaledParam {
            offsets: &[2],
            max: 0x0F,
        };
        assert_eq!(p.scale(0.0), 0);
        assert_eq!(p.scale(1.0), 15);
        assert_eq!(p.scale(-3.0), 0);
        assert_eq!(p.scale(42.0), 15);
        assert_eq!(p.scale(f32::NAN), 0);
        assert!((p.unscale(15) - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_scaled_param_writes_every_offset() {
        let mut r = report(0x21, 0x02);
        G29_TABLE.output.friction.coefficient.write(&mut r, 5);
        assert_eq!(r, [0x21, 0x02, 0x05, 0x00, 0x05, 0x00, 0x00]);
    }

    #[test]
    fn test_output_templates_have_fixed_prefixes() {
        let out = &G29_TABLE.output;
        assert_eq!(out.range.template[..2], [0xF8, 0x81]);
        assert_eq!(out.leds.template, [0xF8, 0x12, 0, 0, 0, 0, 0x01]);
        assert_eq!(out.autocenter.profile[..2], [0xFE, 0x0D]);
        assert_eq!(out.force_off.all_slots, 0xF3);
    }
}
