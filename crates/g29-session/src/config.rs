//! Connection options.

use racing_wheel_hid_g29_protocol::AutoCenter;
use serde::{Deserialize, Serialize};

use crate::error::{SessionError, SessionResult};
use crate::transport::DeviceFilter;

/// Default rotation range, in degrees.
pub const DEFAULT_RANGE: u16 = 900;

/// Options applied while a session initializes the device.
///
/// Every key is optional when deserializing:
///
/// ```json
/// { "range": 540, "autocenter": [0.5, 0.25], "debug": true }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SessionConfig {
    /// Rotation range in degrees; clamped to what the hardware supports.
    pub range: u16,
    /// `false`, `true`, or `[strength, rate]`.
    pub autocenter: AutoCenter,
    /// Log every change set at `debug` instead of `trace`.
    pub debug: bool,
    pub filter: DeviceFilter,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            range: DEFAULT_RANGE,
            autocenter: AutoCenter::Default,
            debug: false,
            filter: DeviceFilter::default(),
        }
    }
}

impl SessionConfig {
    /// Parse a JSON config document.
    ///
    /// # Errors
    ///
    /// [`SessionError::Config`] on malformed JSON, unknown keys, or a
    /// wrongly shaped `autocenter` value.
    pub fn from_json_str(json: &str) -> SessionResult<Self> {
        serde_json::from_str(json).map_err(|e| SessionError::Config(e.to_string()))
    }

    pub fn with_range(mut self, degrees: u16) -> Self {
        self.range = degrees;
        self
    }

    pub fn with_autocenter(mut self, autocenter: AutoCenter) -> Self {
        self.autocenter = autocenter;
        self
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn with_filter(mut self, filter: DeviceFilter) -> Self {
        self.filter = filter;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SessionConfig::default();
        assert_eq!(config.range, 900);
        assert_eq!(config.autocenter, AutoCenter::Default);
        assert!(!config.debug);
        assert_eq!(config.filter, DeviceFilter::new(0x046D, 0xC24F));
    }

    #[test]
    fn test_partial_json_keeps_defaults() -> Result<(), SessionError> {
        let config = SessionConfig::from_json_str(r#"{ "range": 540, "autocenter": false }"#)?;
        assert_eq!(config.range, 540);
        assert_eq!(config.autocenter, AutoCenter::Off);
        assert_eq!(config.filter, DeviceFilter::default());

        let config = SessionConfig::from_json_str("{}")?;
        assert_eq!(config, SessionConfig::default());
        Ok(())
    }

    #[test]
    fn test_custom_autocenter_and_filter() -> Result<(), SessionError> {
        let config = SessionConfig::from_json_str(
            r#"{
                "autocenter": [0.5, 0.25],
                "debug": true,
                "filter": { "vendor_id": 1133, "product_id": 49760 }
            }"#,
        )?;
        assert_eq!(
            config.autocenter,
            AutoCenter::Custom {
                strength: 0.5,
                rate: 0.25
            }
        );
        assert!(config.debug);
        assert_eq!(config.filter.product_id, 0xC260);
        Ok(())
    }

    #[test]
    fn test_rejects_bad_shapes() {
        for bad in [
            r#"{ "autocenter": [1, 2, 3] }"#,
            r#"{ "autocenter": "yes" }"#,
            r#"{ "range": -5 }"#,
            r#"{ "rnage": 540 }"#,
            "not json",
        ] {
            assert!(
                matches!(SessionConfig::from_json_str(bad), Err(SessionError::Config(_))),
                "{bad} should be rejected"
            );
        }
    }

    #[test]
    fn test_builders() {
        let config = SessionConfig::default()
            .with_range(270)
            .with_autocenter(AutoCenter::Off)
            .with_debug(true);
        assert_eq!(config.range, 270);
        assert_eq!(config.autocenter, AutoCenter::Off);
        assert!(config.debug);
    }
}
