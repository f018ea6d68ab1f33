//! Sharing one PSU between threads.
//!
//! The link is half duplex, so two exchanges must never interleave. [`SharedPsu`] holds a
//! lock for the whole of each [`SharedPsu::transaction`].

use std::sync::{Arc, Mutex, PoisonError};

use crate::client::PsuClient;

/// A cloneable handle to a [`PsuClient`], usable from several threads.
pub struct SharedPsu<S: embedded_io::Read + embedded_io::Write + embedded_io::ReadReady> {
    inner: Arc<Mutex<PsuClient<S>>>,
}

impl<S: embedded_io::Read + embedded_io::Write + embedded_io::ReadReady> Clone for SharedPsu<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: embedded_io::Read + embedded_io::Write + embedded_io::ReadReady> SharedPsu<S> {
    pub fn new(client: PsuClient<S>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(client)),
        }
    }

    /// Run `f` with exclusive access to the client.
    ///
    /// A panic in another transaction does not poison the handle: the session only changes
    /// once an exchange has completed, so it is never left half updated.
    pub fn transaction<R>(&self, f: impl FnOnce(&mut PsuClient<S>) -> R) -> R {
        let mut client = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut client)
    }

    /// Take the client back, if this is the last handle.
    pub fn try_unwrap(self) -> Result<PsuClient<S>, Self> {
        match Arc::try_unwrap(self.inner) {
            Ok(mutex) => Ok(mutex.into_inner().unwrap_or_else(PoisonError::into_inner)),
            Err(inner) => Err(Self { inner }),
        }
    }
}
