//! This crate provides an interface for communicating with and controlling the Array 364x series of
//! programmable power supplies.
//!
//! These power supplies are rebadged under many names, so this should work with:
//! * Array 3644A, 3645A and 3646A
//! * Circuit Specialist 3644A, 3645A and 3646A
//! * 3com 364x
//!
//! The PSU speaks a simple binary protocol: each command is a fixed 26 byte frame, answered by
//! one 26 byte frame from the PSU. See [`frame`] for the layout.
//!
//! Any interface implementing [`embedded_io::Read`] and [`embedded_io::Write`] can be used, as
//! long as it reports a read timeout as [`embedded_io::ErrorKind::TimedOut`]. See
//! [`config`] for the serial settings.
//!
//! ```no_run
//! # fn demo<S: embedded_io::Read + embedded_io::Write + embedded_io::ReadReady>(port: S) -> psu364x::error::Result<(), S::Error> {
//! use psu364x::{Outcome, PsuClient};
//!
//! let mut psu = PsuClient::new(port, 0)?;
//! if let Outcome::Accepted(params) = psu.read_parameters()? {
//!     println!("{}", params);
//! }
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod codec;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod frame;
pub mod scaling;
pub mod session;
pub mod shared;

pub use client::{Advisory, PsuClient};
pub use codec::{DeviceInfo, OperatingParameters};
pub use dispatcher::Outcome;
pub use shared::SharedPsu;

#[cfg(test)]
mod mock_serial;
