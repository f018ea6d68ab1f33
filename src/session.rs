//! Per-connection state owned by a [`PsuClient`](crate::client::PsuClient).

/// Highest usable device address. 255 is not a valid 364x address.
pub const MAX_ADDRESS: u8 = 254;

/// Default device address of a 364x PSU.
pub const DEFAULT_ADDRESS: u8 = 1;

/// The address we talk to and whether we believe the PSU is under remote control.
///
/// The remote control flag is only ever updated after the PSU accepted a
/// remote control or output state change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Session {
    address: u8,
    remote_control_active: bool,
}

impl Session {
    /// Returns `None` if `address` is outside 0-254.
    pub fn new(address: u8) -> Option<Self> {
        (address <= MAX_ADDRESS).then_some(Self {
            address,
            remote_control_active: false,
        })
    }

    pub fn address(&self) -> u8 {
        self.address
    }

    pub fn remote_control_active(&self) -> bool {
        self.remote_control_active
    }

    pub(crate) fn set_remote_control_active(&mut self, active: bool) {
        self.remote_control_active = active;
    }
}
