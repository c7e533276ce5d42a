//! hidapi-backed transport for a live wheel.

use std::sync::Arc;

use async_trait::async_trait;
use hidapi::{HidApi, HidDevice};
use parking_lot::Mutex;
use racing_wheel_g29_session::{
    DeviceFilter, TransportError, TransportResult, WheelHandle, WheelPort,
};
use tracing::{debug, info};

/// Poll interval for blocking reads, in milliseconds.
const READ_TIMEOUT_MS: i32 = 50;
const MAX_REPORT_LEN: usize = 64;

#[derive(Debug, Default, Clone, Copy)]
pub struct HidWheelPort;

#[async_trait]
impl WheelPort for HidWheelPort {
    async fn open(&self, filter: &DeviceFilter) -> TransportResult<Box<dyn WheelHandle>> {
        let filter = *filter;
        let device = tokio::task::spawn_blocking(move || open_device(filter))
            .await
            .map_err(|e| TransportError::io(e.to_string()))??;
        info!(
            "opened HID device {:04X}:{:04X}",
            filter.vendor_id, filter.product_id
        );
        Ok(Box::new(HidWheelHandle {
            device: Some(Arc::new(Mutex::new(device))),
        }))
    }
}

fn open_device(filter: DeviceFilter) -> TransportResult<HidDevice> {
    let api = HidApi::new().map_err(|e| TransportError::io(e.to_string()))?;
    let present = api
        .device_list()
        .any(|d| filter.matches(d.vendor_id(), d.product_id()));
    if !present {
        return Err(TransportError::NoDeviceFound {
            vendor_id: filter.vendor_id,
            product_id: filter.product_id,
        });
    }
    api.open(filter.vendor_id, filter.product_id)
        .map_err(|e| TransportError::PermissionDenied(e.to_string()))
}

pub struct HidWheelHandle {
    device: Option<Arc<Mutex<HidDevice>>>,
}

impl HidWheelHandle {
    fn device(&self) -> TransportResult<Arc<Mutex<HidDevice>>> {
        self.device.clone().ok_or(TransportError::Disconnected)
    }
}

#[async_trait]
impl WheelHandle for HidWheelHandle {
    async fn send(&mut self, report: &[u8]) -> TransportResult<()> {
        let device = self.device()?;
        // hidapi expects the report ID first; the G29 does not use one.
        let mut buf = Vec::with_capacity(report.len() + 1);
        buf.push(0x00);
        buf.extend_from_slice(report);
        tokio::task::spawn_blocking(move || device.lock().write(&buf))
            .await
            .map_err(|e| TransportError::io(e.to_string()))?
            .map_err(|e| TransportError::io(e.to_string()))?;
        Ok(())
    }

    async fn read_report(&mut self) -> TransportResult<Option<Vec<u8>>> {
        loop {
            let device = self.device()?;
            let frame = tokio::task::spawn_blocking(move || {
                let mut buf = [0u8; MAX_REPORT_LEN];
                device
                    .lock()
                    .read_timeout(&mut buf, READ_TIMEOUT_MS)
                    .map(|n| buf[..n].to_vec())
            })
            .await
            .map_err(|e| TransportError::io(e.to_string()))?
            .map_err(|e| TransportError::io(e.to_string()))?;
            if !frame.is_empty() {
                return Ok(Some(frame));
            }
        }
    }

    async fn close(&mut self) -> TransportResult<()> {
        if self.device.take().is_some() {
            debug!("closed HID device");
        }
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.device.is_some()
    }
}
