//! Routing of raw input batches to application listeners
//!
//! 1. [`event_router`] - category filtering, ordered delivery
//! 2. [`click`] - per-source click synthesis
//! 3. [`listener`] - generation-checked listener registrations

pub mod click;
pub mod event_router;
pub mod listener;

pub use click::ClickTracker;
pub use event_router::EventRouter;
pub use listener::{EventListener, ListenerHandle, ListenerRegistry, ListenerToken, SharedListener};

use crate::native::TransportError;

// Router errors
#[derive(Debug, thiserror::Error)]
pub enum RouterError {
    #[error("Router has been disposed")]
    InvalidHandle,

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),
}
