use crate::core::address::MeshAddr;
use crate::core::packet::DataType;
use crate::error::{constants, MeshError, Result};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, RwLock};
use tracing::error;

/// Consumer of validated inbound payloads: source address, payload tag and
/// payload bytes (the payload length is `payload.len()`).
pub type ReceiveCallback = dyn Fn(&MeshAddr, DataType, &[u8]) + Send + Sync + 'static;

/// Outcome of handing a payload to the dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Delivered,
    /// No callback was registered; the payload was dropped.
    NoCallback,
    /// The callback panicked; the payload is considered consumed.
    CallbackPanicked,
}

/// Single-slot callback holder shared by the receive loop and the application.
///
/// The slot is cloned out under the read lock and invoked after the lock is
/// released, so replacing the callback never waits for an in-flight call;
/// the new callback sees the next frame.
pub struct Dispatcher {
    callback: RwLock<Option<Arc<ReceiveCallback>>>,
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Dispatcher {
    pub fn new() -> Self {
        Self {
            callback: RwLock::new(None),
        }
    }

    /// Install `callback`, replacing any previous one.
    pub fn register<F>(&self, callback: F) -> Result<()>
    where
        F: Fn(&MeshAddr, DataType, &[u8]) + Send + Sync + 'static,
    {
        let mut slot = self
            .callback
            .write()
            .map_err(|_| MeshError::LockPoisoned(constants::ERR_CALLBACK_LOCK))?;

        *slot = Some(Arc::new(callback));
        Ok(())
    }

    /// Remove the callback. Returns whether one was installed.
    pub fn clear(&self) -> Result<bool> {
        let mut slot = self
            .callback
            .write()
            .map_err(|_| MeshError::LockPoisoned(constants::ERR_CALLBACK_LOCK))?;

        Ok(slot.take().is_some())
    }

    pub fn is_registered(&self) -> bool {
        self.callback
            .read()
            .map(|slot| slot.is_some())
            .unwrap_or(false)
    }

    /// Invoke the current callback synchronously on the calling task.
    pub fn dispatch(&self, from: &MeshAddr, data_type: DataType, payload: &[u8]) -> Result<Delivery> {
        let callback = {
            let slot = self
                .callback
                .read()
                .map_err(|_| MeshError::LockPoisoned(constants::ERR_CALLBACK_LOCK))?;
            slot.clone()
        };

        let Some(callback) = callback else {
            return Ok(Delivery::NoCallback);
        };

        match catch_unwind(AssertUnwindSafe(|| callback(from, data_type, payload))) {
            Ok(()) => Ok(Delivery::Delivered),
            Err(_) => {
                error!(%from, %data_type, "Receive callback panicked");
                Ok(Delivery::CallbackPanicked)
            }
        }
    }
}
