//! Logitech G29 HID protocol: protocol table, input decoding, state diffing,
//! and command encoding.
//!
//! This crate is intentionally I/O-free and allocation-free on hot paths.
//! It provides pure functions and types that can be tested without hardware.
//! The only retained state (previous frame, previous decoded state) is owned
//! by the caller and passed in explicitly.

#![deny(static_mut_refs)]

pub mod diff;
pub mod error;
pub mod ids;
pub mod input;
pub mod output;
pub mod state;
pub mod table;

pub use diff::{ChangeSet, diff};
pub use error::{ProtocolError, ProtocolResult};
pub use ids::{LOGITECH_VENDOR_ID, is_g29_product, product_ids};
pub use input::{ChangedBytes, changed_bytes, decode};
pub use output::{
    AutoCenter, Command, EffectSlot, LED_SEGMENTS, LedPattern, OutputSequence, encode, led_mask,
};
pub use state::{
    Dpad, FIELD_COUNT, Field, FieldValue, Group, PedalsState, ShifterState, WheelInputState,
    WheelState, gear,
};
pub use table::{G29_INPUT_REPORT_LEN, G29_TABLE, OUTPUT_REPORT_LEN, OutputReport, ProtocolTable};
