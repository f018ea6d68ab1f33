use crate::{
    codec::{self, ControlState, DeviceInfo, OperatingParameters},
    config::LinkConfig,
    dispatcher::{CommandDispatcher, Outcome},
    error::{Error, Result},
    frame::Command,
    session::Session,
};

/// Diagnostic attached to an accepted set-point write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advisory {
    /// Nothing to report.
    Clean,
    /// Set-points were written while the PSU was not under remote control.
    ///
    /// The PSU accepts the write, but its front panel still governs the output.
    LocalControl,
}

/// You can create a PsuClient using any interface which implements [embedded_io::Read],
/// [embedded_io::Write] & [embedded_io::ReadReady].
///
/// The interface must report a read which produced no data within its timeout as
/// [`embedded_io::ErrorKind::TimedOut`]. Anything already waiting to be read when a command
/// is sent is discarded.
///
/// For its methods, "get" style accessors (e.g. [`Self::max_voltage`]) read back a
/// configured value, "measure" reads a live value and "set" writes a configuration.
///
/// Every method returns [`Outcome::Rejected`] when the PSU refused the exchange it depends on.
pub struct PsuClient<S: embedded_io::Read + embedded_io::Write + embedded_io::ReadReady> {
    session: Session,
    dispatcher: CommandDispatcher<S>,
}

impl<S: embedded_io::Read + embedded_io::Write + embedded_io::ReadReady> PsuClient<S> {
    /// Create a new PsuClient talking to the PSU at `address` (0-254).
    pub fn new(interface: S, address: u8) -> Result<Self, S::Error> {
        let session = Session::new(address).ok_or(Error::InvalidAddress(address))?;
        Ok(Self {
            session,
            dispatcher: CommandDispatcher::new(interface),
        })
    }

    /// Create a new PsuClient using the address from `config`.
    ///
    /// The baud rate and response timeout have to be applied to `interface` by the caller.
    pub fn from_config(interface: S, config: &LinkConfig) -> Result<Self, S::Error> {
        Self::new(interface, config.address)
    }

    pub fn address(&self) -> u8 {
        self.session.address()
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Whether the last accepted control state change left the PSU under remote control.
    pub fn is_remote_control_active(&self) -> bool {
        self.session.remote_control_active()
    }

    pub fn interface(&self) -> &S {
        self.dispatcher.interface()
    }

    pub fn interface_mut(&mut self) -> &mut S {
        self.dispatcher.interface_mut()
    }

    /// Check the PSU answers by reading its identification.
    ///
    /// Any stale input on the line is flushed first, so this also brings a link back into step
    /// after a timeout.
    pub fn probe(&mut self) -> Result<Outcome<DeviceInfo>, S::Error> {
        let outcome = self.read_info()?;
        match &outcome {
            Outcome::Accepted(info) => log::info!("PSU {} found: {}", self.address(), info),
            Outcome::Rejected { .. } => {
                log::info!("PSU {} refused to identify itself", self.address())
            }
        }
        Ok(outcome)
    }

    /// Hand control back to the front panel and return the interface.
    ///
    /// A PSU refusing to leave remote control does not stop the interface being returned.
    pub fn close(mut self) -> Result<S, S::Error> {
        if let Outcome::Rejected { code, result } = self.disable_remote_control()? {
            log::warn!(
                "PSU {} did not leave remote control (code={:#04X} result={:#04X})",
                self.address(),
                code,
                result
            );
        }
        Ok(self.dispatcher.into_interface())
    }

    /// Read the operating parameters and live measurements.
    pub fn read_parameters(&mut self) -> Result<Outcome<OperatingParameters>, S::Error> {
        let outcome = self.dispatcher.send(&self.session, Command::Read, &[])?;
        Ok(outcome.map(|frame| codec::decode_parameters(frame.as_bytes())))
    }

    /// Write the set-points of `params`.
    ///
    /// Only [`OperatingParameters::voltage_set`], [`OperatingParameters::max_voltage`],
    /// [`OperatingParameters::max_current`] and [`OperatingParameters::max_power`] are sent.
    /// Writing while the PSU is not under remote control is allowed, but flagged with
    /// [`Advisory::LocalControl`].
    pub fn write_parameters(
        &mut self,
        params: &OperatingParameters,
    ) -> Result<Outcome<Advisory>, S::Error> {
        let payload = codec::encode_parameters(params, self.address())?;

        let advisory = if self.session.remote_control_active() {
            Advisory::Clean
        } else {
            log::warn!(
                "PSU {} needs to be in remote control mode to apply operating parameters",
                self.address()
            );
            Advisory::LocalControl
        };

        let outcome = self.dispatcher.send(&self.session, Command::Set, &payload)?;
        Ok(outcome.map(|_| advisory))
    }

    /// Read the serial number, model and firmware version.
    pub fn read_info(&mut self) -> Result<Outcome<DeviceInfo>, S::Error> {
        let outcome = self.dispatcher.send(&self.session, Command::ReadInfo, &[])?;
        Ok(outcome.map(|frame| codec::decode_info(frame.as_bytes())))
    }

    /// Turn the output on or off. This also puts the PSU under remote control.
    pub fn set_output_enabled(&mut self, enabled: bool) -> Result<Outcome<()>, S::Error> {
        let state = ControlState::new().with_output_on(enabled).with_remote(true);
        let outcome = self.send_control_state(state)?;
        if outcome.is_accepted() {
            self.session.set_remote_control_active(true);
        }
        Ok(outcome)
    }

    pub fn enable_output(&mut self) -> Result<Outcome<()>, S::Error> {
        self.set_output_enabled(true)
    }

    pub fn disable_output(&mut self) -> Result<Outcome<()>, S::Error> {
        self.set_output_enabled(false)
    }

    /// Read whether the output is enabled.
    pub fn is_output_enabled(&mut self) -> Result<Outcome<bool>, S::Error> {
        Ok(self.read_parameters()?.map(|params| params.output_enabled))
    }

    /// Give control to the serial link (`true`) or to the front panel (`false`).
    ///
    /// The output state is sent along with the control mode, so the parameters are read
    /// first to keep the output as it currently is.
    pub fn set_remote_control_enabled(&mut self, remote: bool) -> Result<Outcome<()>, S::Error> {
        let params = match self.read_parameters()? {
            Outcome::Accepted(params) => params,
            Outcome::Rejected { code, result } => return Ok(Outcome::Rejected { code, result }),
        };

        let state = ControlState::new()
            .with_output_on(params.output_enabled)
            .with_remote(remote);
        let outcome = self.send_control_state(state)?;
        if outcome.is_accepted() {
            self.session.set_remote_control_active(remote);
        }
        Ok(outcome)
    }

    pub fn enable_remote_control(&mut self) -> Result<Outcome<()>, S::Error> {
        self.set_remote_control_enabled(true)
    }

    pub fn disable_remote_control(&mut self) -> Result<Outcome<()>, S::Error> {
        self.set_remote_control_enabled(false)
    }

    /// Return the measured output voltage in volts.
    pub fn measure_voltage(&mut self) -> Result<Outcome<f32>, S::Error> {
        self.read_field(|params| params.measure_voltage)
    }

    /// Return the measured output current in amps.
    pub fn measure_current(&mut self) -> Result<Outcome<f32>, S::Error> {
        self.read_field(|params| params.measure_current)
    }

    /// Return the measured output power in watts.
    pub fn measure_power(&mut self) -> Result<Outcome<f32>, S::Error> {
        self.read_field(|params| params.measure_power)
    }

    /// Get the voltage set-point in volts.
    pub fn voltage(&mut self) -> Result<Outcome<f32>, S::Error> {
        self.read_field(|params| params.voltage_set)
    }

    /// Set the voltage set-point in volts.
    pub fn set_voltage(&mut self, volts: f32) -> Result<Outcome<Advisory>, S::Error> {
        self.modify(|params| params.voltage_set = volts)
    }

    /// Get the maximum voltage in volts.
    pub fn max_voltage(&mut self) -> Result<Outcome<f32>, S::Error> {
        self.read_field(|params| params.max_voltage)
    }

    /// Set the maximum voltage in volts.
    pub fn set_max_voltage(&mut self, volts: f32) -> Result<Outcome<Advisory>, S::Error> {
        self.modify(|params| params.max_voltage = volts)
    }

    /// Get the maximum current in amps.
    pub fn max_current(&mut self) -> Result<Outcome<f32>, S::Error> {
        self.read_field(|params| params.max_current)
    }

    /// Set the maximum current in amps.
    pub fn set_max_current(&mut self, amps: f32) -> Result<Outcome<Advisory>, S::Error> {
        self.modify(|params| params.max_current = amps)
    }

    /// Get the maximum power in watts.
    pub fn max_power(&mut self) -> Result<Outcome<f32>, S::Error> {
        self.read_field(|params| params.max_power)
    }

    /// Set the maximum power in watts.
    pub fn set_max_power(&mut self, watts: f32) -> Result<Outcome<Advisory>, S::Error> {
        self.modify(|params| params.max_power = watts)
    }

    fn send_control_state(&mut self, state: ControlState) -> Result<Outcome<()>, S::Error> {
        let outcome = self
            .dispatcher
            .send(&self.session, Command::ControlState, &state.into_bytes())?;
        Ok(outcome.map(|_| ()))
    }

    fn read_field(
        &mut self,
        field: impl FnOnce(&OperatingParameters) -> f32,
    ) -> Result<Outcome<f32>, S::Error> {
        Ok(self.read_parameters()?.map(|params| field(&params)))
    }

    /// Read the parameters, apply `change` and write them back.
    fn modify(
        &mut self,
        change: impl FnOnce(&mut OperatingParameters),
    ) -> Result<Outcome<Advisory>, S::Error> {
        let mut params = match self.read_parameters()? {
            Outcome::Accepted(params) => params,
            Outcome::Rejected { code, result } => return Ok(Outcome::Rejected { code, result }),
        };
        change(&mut params);
        self.write_parameters(&params)
    }
}
