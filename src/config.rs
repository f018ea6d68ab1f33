//! Link settings for talking to a 364x PSU.
//!
//! The serial port used for PSU comms should be configured like so:
//! * Default baud rate: 38400 (must match the PSU menu setting)
//! * Data bits: 8
//! * Stop bits: 1
//! * Parity: None

use fugit::MillisDurationU32;

use crate::session::{DEFAULT_ADDRESS, MAX_ADDRESS};

/// Default baud rate of the PSU.
pub const DEFAULT_BAUD_RATE: u32 = 38400;

/// The PSU can take a while to respond, a reasonably large time out is required.
pub const DEFAULT_RESPONSE_TIMEOUT: MillisDurationU32 = MillisDurationU32::millis(2000);

/// Settings needed to open a link to one PSU.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkConfig {
    /// Address of the PSU, 0-254.
    pub address: u8,
    pub baud_rate: u32,
    /// How long to wait for a complete response frame.
    pub response_timeout: MillisDurationU32,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            address: DEFAULT_ADDRESS,
            baud_rate: DEFAULT_BAUD_RATE,
            response_timeout: DEFAULT_RESPONSE_TIMEOUT,
        }
    }
}

/// Reasons a [`LinkConfig`] can't be used.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid device address {0}, must be 0-254")]
    InvalidAddress(u8),
    #[error("Baud rate must not be zero")]
    ZeroBaudRate,
    #[error("Response timeout must not be zero")]
    ZeroTimeout,
}

impl LinkConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.address > MAX_ADDRESS {
            return Err(ConfigError::InvalidAddress(self.address));
        }
        if self.baud_rate == 0 {
            return Err(ConfigError::ZeroBaudRate);
        }
        if self.response_timeout.to_millis() == 0 {
            return Err(ConfigError::ZeroTimeout);
        }
        Ok(())
    }
}
