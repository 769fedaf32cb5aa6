//! Shared, releasable handle to a transport.
//!
//! In-flight calls hold their own `Arc` to the transport, so releasing the
//! connection never interrupts them; it only stops new calls from starting.

use std::sync::{Arc, PoisonError, RwLock};

use crate::error::{NeuralexError, Result};

pub(crate) struct Connection<T> {
    transport: RwLock<Option<Arc<T>>>,
}

impl<T> Connection<T> {
    pub(crate) fn open(transport: T) -> Self {
        Self {
            transport: RwLock::new(Some(Arc::new(transport))),
        }
    }

    /// Borrow the transport for one call, or fail with
    /// [`NeuralexError::Closed`] once released.
    pub(crate) fn acquire(&self) -> Result<Arc<T>> {
        self.transport
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or(NeuralexError::Closed)
    }

    /// Drop this handle's reference. Returns `false` if it was already released.
    pub(crate) fn release(&self) -> bool {
        self.transport
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .is_some()
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.transport
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_none()
    }
}
