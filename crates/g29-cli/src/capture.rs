//! Capture files and the replay transport built from them.
//!
//! The file format is the one written by `hid-capture`:
//!
//! ```json
//! {
//!   "vendor_id": "0x046D",
//!   "product_id": "0xC24F",
//!   "captures": [
//!     { "timestamp_us": 100, "report_id": 8, "data": "0x08 0x00 0x00 ..." }
//!   ]
//! }
//! ```

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use racing_wheel_g29_session::{
    DeviceFilter, TransportError, TransportResult, WheelHandle, WheelPort,
};
use serde::{Deserialize, Serialize};

use crate::error::CliError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureReport {
    pub timestamp_us: u64,
    pub report_id: u8,
    pub data: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureFile {
    pub vendor_id: String,
    pub product_id: String,
    pub captures: Vec<CaptureReport>,
}

impl CaptureFile {
    pub fn from_json_str(json: &str) -> Result<Self, CliError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Device the capture was taken from.
    pub fn filter(&self) -> Result<DeviceFilter, CliError> {
        let vendor_id = parse_hex_u16(&self.vendor_id).map_err(CliError::InvalidCapture)?;
        let product_id = parse_hex_u16(&self.product_id).map_err(CliError::InvalidCapture)?;
        Ok(DeviceFilter::new(vendor_id, product_id))
    }

    /// Raw frame bytes of every capture, in file order.
    pub fn frames(&self) -> Result<Vec<Vec<u8>>, CliError> {
        self.captures
            .iter()
            .enumerate()
            .map(|(i, report)| {
                parse_hex_bytes(&report.data)
                    .map_err(|e| CliError::InvalidCapture(format!("capture #{i}: {e}")))
            })
            .collect()
    }
}

pub fn parse_hex_u16(s: &str) -> Result<u16, String> {
    let s = s.trim_start_matches("0x").trim_start_matches("0X");
    u16::from_str_radix(s, 16).map_err(|e| format!("invalid hex value '{s}': {e}"))
}

pub fn parse_hex_u8(s: &str) -> Result<u8, String> {
    let s = s.trim_start_matches("0x").trim_start_matches("0X");
    u8::from_str_radix(s, 16).map_err(|e| format!("invalid hex byte '{s}': {e}"))
}

/// Parse whitespace-separated hex bytes (`"0x08 0x00 FF"`).
pub fn parse_hex_bytes(s: &str) -> Result<Vec<u8>, String> {
    s.split_whitespace().map(parse_hex_u8).collect()
}

#[derive(Debug, Default)]
struct ReplayState {
    frames: VecDeque<Vec<u8>>,
    written: Vec<Vec<u8>>,
}

/// A port whose single device plays back a fixed list of frames and records
/// whatever is written to it.
#[derive(Debug, Clone)]
pub struct ReplayPort {
    device: DeviceFilter,
    state: Arc<Mutex<ReplayState>>,
}

impl ReplayPort {
    pub fn new(device: DeviceFilter, frames: Vec<Vec<u8>>) -> Self {
        Self {
            device,
            state: Arc::new(Mutex::new(ReplayState {
                frames: frames.into(),
                written: Vec::new(),
            })),
        }
    }

    /// Output reports written so far.
    pub fn written(&self) -> Vec<Vec<u8>> {
        self.state.lock().written.clone()
    }
}

#[async_trait]
impl WheelPort for ReplayPort {
    async fn open(&self, filter: &DeviceFilter) -> TransportResult<Box<dyn WheelHandle>> {
        if !filter.matches(self.device.vendor_id, self.device.product_id) {
            return Err(TransportError::NoDeviceFound {
                vendor_id: filter.vendor_id,
                product_id: filter.product_id,
            });
        }
        Ok(Box::new(ReplayHandle {
            state: Arc::clone(&self.state),
            open: true,
        }))
    }
}

struct ReplayHandle {
    state: Arc<Mutex<ReplayState>>,
    open: bool,
}

#[async_trait]
impl WheelHandle for ReplayHandle {
    async fn send(&mut self, report: &[u8]) -> TransportResult<()> {
        if !self.open {
            return Err(TransportError::Disconnected);
        }
        self.state.lock().written.push(report.to_vec());
        Ok(())
    }

    async fn read_report(&mut self) -> TransportResult<Option<Vec<u8>>> {
        if !self.open {
            return Err(TransportError::Disconnected);
        }
        Ok(self.state.lock().frames.pop_front())
    }

    async fn close(&mut self) -> TransportResult<()> {
        self.open = false;
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.open
    }
}
