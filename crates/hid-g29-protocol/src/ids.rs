//! Logitech USB vendor/product ID constants and G29 command bytes.

#![deny(static_mut_refs)]

/// Logitech USB vendor ID.
pub const LOGITECH_VENDOR_ID: u16 = 0x046D;

/// Known G29 product IDs.
pub mod product_ids {
    /// G29 racing wheel (PlayStation/PC, 900°, 2.2 Nm).
    pub const G29_PS: u16 = 0xC24F;
    /// G29 racing wheel (Xbox variant).
    pub const G29_XBOX: u16 = 0xC260;
}

/// First byte (and sub-command byte where present) of every G29 output report.
pub mod commands {
    /// Vendor command prefix shared by range and LED reports.
    pub const VENDOR: u8 = 0xF8;
    /// Set wheel rotation range (follows `VENDOR`).
    pub const SET_RANGE: u8 = 0x81;
    /// Set rev-light LEDs (follows `VENDOR`).
    pub const SET_LEDS: u8 = 0x12;
    /// Trailing byte the LED report carries in its last position.
    pub const SET_LEDS_TRAILER: u8 = 0x01;

    /// Stop every effect slot except the autocenter spring.
    pub const FORCE_OFF_ALL: u8 = 0xF3;
    /// Download-and-play constant force into slot 1.
    pub const CONSTANT_FORCE: u8 = 0x11;
    /// Download-and-play a friction effect into slot 2.
    pub const FRICTION: u8 = 0x21;
    /// Effect type byte for friction.
    pub const FRICTION_TYPE: u8 = 0x02;

    /// Activate the built-in autocenter spring.
    pub const AUTOCENTER_ENABLE: u8 = 0x14;
    /// Deactivate the built-in autocenter spring.
    pub const AUTOCENTER_DISABLE: u8 = 0xF5;
    /// Extended command prefix used for the autocenter spring profile.
    pub const EXTENDED: u8 = 0xFE;
    /// Autocenter spring profile (follows `EXTENDED`).
    pub const AUTOCENTER_PROFILE: u8 = 0x0D;
}

/// Return `true` if the product ID corresponds to a G29 wheel.
pub fn is_g29_product(product_id: u16) -> bool {
    matches!(product_id, product_ids::G29_PS | product_ids::G29_XBOX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_g29_product() -> Result<(), Box<dyn std::error::Error>> {
        assert!(is_g29_product(product_ids::G29_PS));
        assert!(is_g29_product(product_ids::G29_XBOX));
        assert!(!is_g29_product(0xC299), "G25 is not a G29");
        assert!(!is_g29_product(0x0000));
        Ok(())
    }

    #[test]
    fn test_g29_ps_pid_decimal() -> Result<(), Box<dyn std::error::Error>> {
        // Device filters are frequently written in decimal.
        assert_eq!(product_ids::G29_PS, 49743);
        Ok(())
    }
}
