//! Native boundary.
//!
//! The platform layer owns the channel that produces raw input batches and
//! receives category toggles. This module only describes that boundary:
//!
//! ```text
//! Platform ──[InputEvent batches]──► EventRouter ──► Listeners
//!    ▲                                   │
//!    └────[category toggles, handle]─────┘
//! ```
//!
//! [`NativeSlot`] owns one allocated handle and releases it exactly once, either
//! through an explicit release or when the owning scope ends.

pub mod loopback;

pub use loopback::LoopbackTransport;

use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};

use crate::controller::forward::ForwardReply;
use crate::event::EventCategory;

/// Handle to native dispatch resources allocated by a transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NativeHandle(pub u64);

impl fmt::Display for NativeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "native#{}", self.0)
    }
}

// Transport errors
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("Failed to allocate native dispatch resources: {0}")]
    AllocationFailed(String),

    #[error("Transport is closed")]
    Closed,
}

/// Platform side of the boundary.
///
/// Only `allocate`, `release` and `set_category_enabled` are required. The
/// controller operations default to no-ops so touch-only platforms do not
/// have to implement them; the default forward-vector request drops the reply,
/// which callers observe as an unanswered query.
pub trait NativeTransport: Send + Sync {
    fn allocate(&self) -> Result<NativeHandle, TransportError>;

    fn release(&self, handle: NativeHandle);

    fn set_category_enabled(&self, handle: NativeHandle, category: EventCategory, enabled: bool);

    fn set_reticle_visible(&self, _handle: NativeHandle, _visible: bool) {}

    fn set_controller_visible(&self, _handle: NativeHandle, _visible: bool) {}

    fn set_light_receiving_bitmask(&self, _handle: NativeHandle, _bitmask: u32) {}

    /// Asks the platform for the controller forward vector. The platform calls
    /// [`ForwardReply::answer`] once the value is known, from any thread.
    fn request_forward_vector(&self, _handle: NativeHandle, reply: ForwardReply) {
        drop(reply);
    }
}

/// Exclusive owner of one native handle.
pub struct NativeSlot {
    transport: Arc<dyn NativeTransport>,
    handle: Option<NativeHandle>,
}

impl NativeSlot {
    pub fn acquire(transport: Arc<dyn NativeTransport>) -> Result<Self, TransportError> {
        let handle = transport.allocate()?;
        debug!("Acquired {}", handle);
        Ok(Self {
            transport,
            handle: Some(handle),
        })
    }

    /// The live handle, `None` once released.
    pub fn handle(&self) -> Option<NativeHandle> {
        self.handle
    }

    pub fn transport(&self) -> &Arc<dyn NativeTransport> {
        &self.transport
    }

    /// Releases the handle. Returns `false` if it was already released.
    pub fn release(&mut self) -> bool {
        match self.handle.take() {
            Some(handle) => {
                self.transport.release(handle);
                info!("Released {}", handle);
                true
            }
            None => false,
        }
    }
}

impl Drop for NativeSlot {
    fn drop(&mut self) {
        self.release();
    }
}

impl fmt::Debug for NativeSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeSlot")
            .field("handle", &self.handle)
            .finish_non_exhaustive()
    }
}
