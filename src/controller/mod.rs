//! Controller subsystem
//!
//! Builds controller-specific behaviour on top of the event router:
//!
//! 1. [`facade`] - visibility state, forward-vector queries, click/hover listeners
//! 2. [`forward`] - one-shot replies for forward-vector queries
//! 3. [`snapshot`] - polled controller state diffed into raw batches
//! 4. `gamepad` - gilrs collector feeding snapshots (feature `gamepad`)
//!
//! # Architecture
//!
//! ```text
//! Gamepad ──► Collector ──► SnapshotTracker ──► DispatchPump ──► ControllerFacade
//!             (snapshots)   (raw batches)                         (listeners)
//! ```

pub mod facade;
pub mod forward;
#[cfg(feature = "gamepad")]
pub mod gamepad;
pub mod snapshot;

pub use facade::{ClickListener, ControllerFacade, ForwardQuery, HoverListener};
pub use forward::ForwardReply;
pub use snapshot::{ButtonStates, ControllerSnapshot, InputSource, SnapshotTracker};

use serde::{Deserialize, Serialize};

use crate::router::RouterError;

// Controller errors
#[derive(Debug, thiserror::Error)]
pub enum ControllerError {
    #[error("Controller facade has been disposed")]
    InvalidHandle,

    #[error("Router error: {0}")]
    Router(#[from] RouterError),

    #[error("Forward vector query was dropped before an answer arrived")]
    ForwardQueryDropped,

    #[error("Blocking forward vector query issued on the dispatch thread")]
    WouldBlockDispatch,
}

/// Initial controller presentation state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerSettings {
    pub reticle_visible: bool,
    pub controller_visible: bool,
    pub light_receiving_bitmask: u32,
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self {
            reticle_visible: true,
            controller_visible: true,
            light_receiving_bitmask: 0x1,
        }
    }
}
