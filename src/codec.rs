//! Conversion between frame payloads and physical operating parameters.
//!
//! All offsets in this module are absolute offsets into the 26 byte frame, header included.

use core::fmt;

use modular_bitfield::prelude::*;

use crate::{
    error::CodecError,
    frame::FRAME_LEN,
    scaling::FixedPoint,
};

/// Length of the [`Command::Set`](crate::frame::Command::Set) payload.
pub const SET_PAYLOAD_LEN: usize = 13;

/// Field offsets within a READ response frame.
mod read_offsets {
    pub const MEASURE_CURRENT: usize = 3;
    pub const MEASURE_VOLTAGE: usize = 5;
    pub const MEASURE_POWER: usize = 9;
    pub const MAX_CURRENT: usize = 11;
    pub const MAX_VOLTAGE: usize = 13;
    pub const MAX_POWER: usize = 17;
    pub const VOLTAGE_SET: usize = 19;
    pub const STATUS: usize = 23;
}

/// Field offsets within a READ_INFO response frame.
mod info_offsets {
    pub const SERIAL: usize = 3;
    pub const MODEL: usize = 9;
    pub const FIRMWARE: usize = 14;
}

/// Length of the serial number field.
pub const SERIAL_LEN: usize = 6;
/// Length of the model number field.
pub const MODEL_LEN: usize = 5;

/// Capacity of the decoded serial number. Text is decoded byte for byte as Latin-1, which
/// takes up to two UTF-8 bytes per character.
pub const SERIAL_CAPACITY: usize = 2 * SERIAL_LEN;
/// Capacity of the decoded model number.
pub const MODEL_CAPACITY: usize = 2 * MODEL_LEN;

/// Status byte of a READ response.
#[bitfield(bytes = 1)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StatusFlags {
    pub output_enabled: bool,
    pub excessive_current: bool,
    pub excessive_power: bool,
    #[skip]
    unused: B5,
}

/// Single byte payload of a CONTROL_STATE command.
///
/// Bit assignment follows the device firmware; the device treats it as one combined state.
#[bitfield(bytes = 1)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControlState {
    pub output_on: bool,
    pub remote: bool,
    #[skip]
    unused: B6,
}

/// Operating parameters as reported by a READ.
///
/// Also used to write the set-points, but only [`Self::voltage_set`], [`Self::max_voltage`],
/// [`Self::max_current`] and [`Self::max_power`] are transmitted.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct OperatingParameters {
    /// Maximum allowable voltage (V).
    pub max_voltage: f32,
    /// Maximum allowable current (A).
    pub max_current: f32,
    /// Maximum allowable power (W).
    pub max_power: f32,
    /// Voltage set-point (V).
    pub voltage_set: f32,
    /// Measured output voltage (V).
    pub measure_voltage: f32,
    /// Measured output current (A).
    pub measure_current: f32,
    /// Measured output power (W).
    pub measure_power: f32,
    pub output_enabled: bool,
    pub excessive_current: bool,
    pub excessive_power: bool,
}

impl OperatingParameters {
    /// Status flags packed as they appear in a READ response.
    pub fn status_flags(&self) -> StatusFlags {
        StatusFlags::new()
            .with_output_enabled(self.output_enabled)
            .with_excessive_current(self.excessive_current)
            .with_excessive_power(self.excessive_power)
    }
}

impl fmt::Display for OperatingParameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "maxVoltage={}V, maxCurrent={}A, maxPower={}W, voltageSet={}V, \
             measureVoltage={}V, measureCurrent={}A, measurePower={}W, \
             output={}, excessiveCurrent={}, excessivePower={}",
            self.max_voltage,
            self.max_current,
            self.max_power,
            self.voltage_set,
            self.measure_voltage,
            self.measure_current,
            self.measure_power,
            if self.output_enabled { "ON" } else { "OFF" },
            self.excessive_current,
            self.excessive_power,
        )
    }
}

/// Identification returned by READ_INFO.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceInfo {
    pub serial: heapless::String<SERIAL_CAPACITY>,
    pub model: heapless::String<MODEL_CAPACITY>,
    /// Firmware version, e.g. `1.23`.
    pub firmware_version: f32,
}

impl fmt::Display for DeviceInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Model: {}  S/N: {}  FW Ver. {}",
            self.model, self.serial, self.firmware_version
        )
    }
}

fn read_u16(frame: &[u8; FRAME_LEN], offset: usize) -> u32 {
    u16::from_le_bytes([frame[offset], frame[offset + 1]]) as u32
}

fn read_u32(frame: &[u8; FRAME_LEN], offset: usize) -> u32 {
    u32::from_le_bytes([
        frame[offset],
        frame[offset + 1],
        frame[offset + 2],
        frame[offset + 3],
    ])
}

/// Decode the operating parameters from a READ response frame.
pub fn decode_parameters(frame: &[u8; FRAME_LEN]) -> OperatingParameters {
    use read_offsets as RO;

    let status = StatusFlags::from_bytes([frame[RO::STATUS]]);

    OperatingParameters {
        measure_current: FixedPoint::CURRENT.to_physical(read_u16(frame, RO::MEASURE_CURRENT)),
        measure_voltage: FixedPoint::VOLTAGE.to_physical(read_u32(frame, RO::MEASURE_VOLTAGE)),
        measure_power: FixedPoint::POWER.to_physical(read_u16(frame, RO::MEASURE_POWER)),
        max_current: FixedPoint::CURRENT.to_physical(read_u16(frame, RO::MAX_CURRENT)),
        max_voltage: FixedPoint::VOLTAGE.to_physical(read_u32(frame, RO::MAX_VOLTAGE)),
        max_power: FixedPoint::POWER.to_physical(read_u16(frame, RO::MAX_POWER)),
        voltage_set: FixedPoint::VOLTAGE.to_physical(read_u32(frame, RO::VOLTAGE_SET)),
        output_enabled: status.output_enabled(),
        excessive_current: status.excessive_current(),
        excessive_power: status.excessive_power(),
    }
}

/// Encode the set-points of `params` into a SET payload for the PSU at `address`.
///
/// Measured values and status flags are not transmitted.
pub fn encode_parameters(
    params: &OperatingParameters,
    address: u8,
) -> Result<[u8; SET_PAYLOAD_LEN], CodecError> {
    let max_current = FixedPoint::CURRENT.to_raw_u16(params.max_current)?;
    let max_voltage = FixedPoint::VOLTAGE.to_raw_u32(params.max_voltage)?;
    let max_power = FixedPoint::POWER.to_raw_u16(params.max_power)?;
    let voltage_set = FixedPoint::VOLTAGE.to_raw_u32(params.voltage_set)?;

    let mut payload = [0u8; SET_PAYLOAD_LEN];
    payload[0..2].copy_from_slice(&max_current.to_le_bytes());
    payload[2..6].copy_from_slice(&max_voltage.to_le_bytes());
    payload[6..8].copy_from_slice(&max_power.to_le_bytes());
    payload[8..12].copy_from_slice(&voltage_set.to_le_bytes());
    payload[12] = address;
    Ok(payload)
}

/// Decode the identification from a READ_INFO response frame.
///
/// Bytes outside ASCII are kept as the matching Latin-1 character rather than rejected.
pub fn decode_info(frame: &[u8; FRAME_LEN]) -> DeviceInfo {
    use info_offsets as IO;

    DeviceInfo {
        serial: decode_text(frame, IO::SERIAL, SERIAL_LEN),
        model: decode_text(frame, IO::MODEL, MODEL_LEN),
        firmware_version: FixedPoint::FIRMWARE.to_physical(read_u16(frame, IO::FIRMWARE)),
    }
}

/// Read `len` bytes of text, dropping trailing NUL and space padding.
fn decode_text<const CAP: usize>(
    frame: &[u8; FRAME_LEN],
    offset: usize,
    len: usize,
) -> heapless::String<CAP> {
    let field = &frame[offset..offset + len];
    let end = field
        .iter()
        .rposition(|b| *b != 0x00 && *b != b' ')
        .map_or(0, |last| last + 1);

    let mut text = heapless::String::new();
    for &byte in &field[..end] {
        // CAP holds two bytes for every byte of the field.
        let _ = text.push(char::from(byte));
    }
    text
}
