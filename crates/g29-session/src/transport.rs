//! Transport seam: how the session reaches the device.

use async_trait::async_trait;
use racing_wheel_hid_g29_protocol::{LOGITECH_VENDOR_ID, product_ids};
use serde::{Deserialize, Serialize};

use crate::error::TransportResult;

/// Vendor/product pair used to select a device when opening.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeviceFilter {
    pub vendor_id: u16,
    pub product_id: u16,
}

impl DeviceFilter {
    pub fn new(vendor_id: u16, product_id: u16) -> Self {
        Self {
            vendor_id,
            product_id,
        }
    }

    pub fn matches(&self, vendor_id: u16, product_id: u16) -> bool {
        self.vendor_id == vendor_id && self.product_id == product_id
    }
}

impl Default for DeviceFilter {
    fn default() -> Self {
        Self::new(LOGITECH_VENDOR_ID, product_ids::G29_PS)
    }
}

/// Opens device handles.
#[async_trait]
pub trait WheelPort: Send + Sync {
    /// Open the first device matching `filter`.
    ///
    /// # Errors
    ///
    /// `NoDeviceFound`, `PermissionDenied` or `NotSecureContext`.
    async fn open(&self, filter: &DeviceFilter) -> TransportResult<Box<dyn WheelHandle>>;
}

/// An open device.
#[async_trait]
pub trait WheelHandle: Send {
    /// Write one output report. Completes once the transport has accepted it.
    async fn send(&mut self, report: &[u8]) -> TransportResult<()>;

    /// Next input report in arrival order; `None` once the stream has ended.
    async fn read_report(&mut self) -> TransportResult<Option<Vec<u8>>>;

    /// Release the device. Calling it again is a no-op.
    async fn close(&mut self) -> TransportResult<()>;

    fn is_open(&self) -> bool;
}

pub mod mock {
    //! In-memory transport for tests and demos.

    use super::*;
    use crate::error::TransportError;
    use parking_lot::Mutex;
    use std::collections::VecDeque;
    use std::sync::Arc;

    #[derive(Debug, Default)]
    struct Shared {
        reads: VecDeque<Vec<u8>>,
        writes: Vec<Vec<u8>>,
        plugged_in: bool,
        fail_send: Option<TransportError>,
        fail_open: Option<TransportError>,
        opens: usize,
        closes: usize,
    }

    /// A port with a single simulated wheel. Clones share the same device,
    /// so a test can keep one clone to inspect writes while the session owns
    /// another.
    #[derive(Debug, Clone)]
    pub struct MockWheelPort {
        shared: Arc<Mutex<Shared>>,
    }

    impl MockWheelPort {
        pub fn new() -> Self {
            Self {
                shared: Arc::new(Mutex::new(Shared {
                    plugged_in: true,
                    ..Shared::default()
                })),
            }
        }

        /// Queue an input report for the next `read_report`.
        pub fn queue_report(&self, report: impl Into<Vec<u8>>) {
            self.shared.lock().reads.push_back(report.into());
        }

        /// Every output report written so far, in order.
        pub fn written_reports(&self) -> Vec<Vec<u8>> {
            self.shared.lock().writes.clone()
        }

        pub fn clear_written(&self) {
            self.shared.lock().writes.clear();
        }

        /// Make the next `send` fail with `err`.
        pub fn fail_next_send(&self, err: TransportError) {
            self.shared.lock().fail_send = Some(err);
        }

        /// Make the next `open` fail with `err`.
        pub fn fail_next_open(&self, err: TransportError) {
            self.shared.lock().fail_open = Some(err);
        }

        /// Simulate the cable being pulled: every open handle starts failing.
        pub fn unplug(&self) {
            self.shared.lock().plugged_in = false;
        }

        pub fn plug_in(&self) {
            self.shared.lock().plugged_in = true;
        }

        pub fn open_count(&self) -> usize {
            self.shared.lock().opens
        }

        pub fn close_count(&self) -> usize {
            self.shared.lock().closes
        }
    }

    impl Default for MockWheelPort {
        fn default() -> Self {
            Self::new()
        }
    }

    #[async_trait]
    impl WheelPort for MockWheelPort {
        async fn open(&self, filter: &DeviceFilter) -> TransportResult<Box<dyn WheelHandle>> {
            {
                let mut shared = self.shared.lock();
                if let Some(err) = shared.fail_open.take() {
                    return Err(err);
                }
                if !shared.plugged_in {
                    return Err(TransportError::NoDeviceFound {
                        vendor_id: filter.vendor_id,
                        product_id: filter.product_id,
                    });
                }
                shared.opens += 1;
            }
            Ok(Box::new(MockWheelHandle {
                shared: Arc::clone(&self.shared),
                closed: false,
            }))
        }
    }

    pub struct MockWheelHandle {
        shared: Arc<Mutex<Shared>>,
        closed: bool,
    }

    impl MockWheelHandle {
        fn check_open(&self) -> TransportResult<()> {
            if self.closed || !self.shared.lock().plugged_in {
                return Err(TransportError::Disconnected);
            }
            Ok(())
        }
    }

    #[async_trait]
    impl WheelHandle for MockWheelHandle {
        async fn send(&mut self, report: &[u8]) -> TransportResult<()> {
            self.check_open()?;
            let mut shared = self.shared.lock();
            if let Some(err) = shared.fail_send.take() {
                return Err(err);
            }
            shared.writes.push(report.to_vec());
            Ok(())
        }

        async fn read_report(&mut self) -> TransportResult<Option<Vec<u8>>> {
            self.check_open()?;
            Ok(self.shared.lock().reads.pop_front())
        }

        async fn close(&mut self) -> TransportResult<()> {
            if !self.closed {
                self.closed = true;
                self.shared.lock().closes += 1;
            }
            Ok(())
        }

        fn is_open(&self) -> bool {
            !self.closed && self.shared.lock().plugged_in
        }
    }
}
