//! Session controller for the Logitech G29.
//!
//! Ties the pure protocol crate to a transport: inbound frames are decoded,
//! diffed and published on an [`EventBus`]; outbound [`Command`]s are encoded
//! and written in order. The transport itself sits behind the
//! [`WheelPort`]/[`WheelHandle`] traits so the controller can be driven by
//! real hardware, a capture replay, or the in-crate [`mock`] transport.
//!
//! [`Command`]: racing_wheel_hid_g29_protocol::Command

#![deny(static_mut_refs)]

pub mod bus;
pub mod config;
pub mod error;
pub mod session;
pub mod transport;

pub use bus::{Event, EventBus, SubscriptionId, Topic};
pub use config::SessionConfig;
pub use error::{SessionError, SessionResult, TransportError, TransportResult};
pub use session::{PollOutcome, Session, SessionState, SessionStats};
pub use transport::{DeviceFilter, WheelHandle, WheelPort, mock};
