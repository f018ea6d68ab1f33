//! Fixed-point scaling between raw frame fields and physical units.
//!
//! The 364x PSUs transfer every quantity as an unsigned little-endian integer. Voltages and
//! currents are in thousandths (mV, mA), power and the firmware version in hundredths.

use crate::error::CodecError;

/// Divisor applied to a raw integer field to get its physical value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedPoint {
    divisor: u32,
}

impl FixedPoint {
    /// Volts, raw value in millivolts.
    pub const VOLTAGE: Self = Self::new(1000);
    /// Amps, raw value in milliamps.
    pub const CURRENT: Self = Self::new(1000);
    /// Watts, raw value in centiwatts.
    pub const POWER: Self = Self::new(100);
    /// Firmware version, raw `123` => `1.23`.
    pub const FIRMWARE: Self = Self::new(100);

    pub const fn new(divisor: u32) -> Self {
        Self { divisor }
    }

    pub const fn divisor(&self) -> u32 {
        self.divisor
    }

    /// Smallest representable step in physical units.
    pub fn resolution(&self) -> f32 {
        1.0 / self.divisor as f32
    }

    /// Convert a raw field value into physical units.
    #[inline]
    pub fn to_physical(&self, raw: u32) -> f32 {
        (raw as f64 / self.divisor as f64) as f32
    }

    /// Convert a physical value into a raw 32 bit field, rounding to the nearest step.
    pub fn to_raw_u32(&self, value: f32) -> Result<u32, CodecError> {
        let scaled = (value as f64 * self.divisor as f64).round();
        if !scaled.is_finite() || scaled < 0.0 || scaled > u32::MAX as f64 {
            return Err(CodecError::ValueOutOfRange { value });
        }
        Ok(scaled as u32)
    }

    /// Convert a physical value into a raw 16 bit field, rounding to the nearest step.
    pub fn to_raw_u16(&self, value: f32) -> Result<u16, CodecError> {
        let raw = self.to_raw_u32(value)?;
        u16::try_from(raw).map_err(|_| CodecError::ValueOutOfRange { value })
    }
}
