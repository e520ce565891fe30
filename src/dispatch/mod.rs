//! Dispatch loop
//!
//! Raw batches from the platform (or a collector) are queued on an mpsc channel
//! and drained by a [`DispatchPump`] running on one tokio task, which is the
//! single dispatch thread every listener is called from.
//!
//! ```text
//! Producer ──[Vec<InputEvent>]──► mpsc ──► DispatchPump ──► Dispatcher
//!                                          (Waiting ⇄ Dispatching)
//! ```

pub mod pump;

pub use pump::{run_pump_loop, DispatchPump, EventBatch, PumpHandle, PumpStats};

use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::mpsc;

use crate::controller::{ControllerError, ControllerFacade};
use crate::event::InputEvent;
use crate::router::{EventRouter, RouterError};
use crate::scene::NodeRegistry;

pub type BatchSender = mpsc::Sender<Vec<InputEvent>>;
pub type BatchReceiver = mpsc::Receiver<Vec<InputEvent>>;

// Pump errors
#[derive(Debug, thiserror::Error)]
pub enum PumpError {
    #[error("Batch channel closed")]
    ChannelClosed,

    #[error("Pump cancelled")]
    Cancelled,

    #[error("Router error: {0}")]
    Router(#[from] RouterError),

    #[error("Controller error: {0}")]
    Controller(#[from] ControllerError),

    #[error("Pump task failed: {0}")]
    TaskFailed(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchSettings {
    pub channel_capacity: usize,
    pub stats_interval_secs: i64,
}

impl Default for DispatchSettings {
    fn default() -> Self {
        Self {
            channel_capacity: 1000,
            stats_interval_secs: 30,
        }
    }
}

impl DispatchSettings {
    pub fn channel(&self) -> (BatchSender, BatchReceiver) {
        mpsc::channel(self.channel_capacity.max(1))
    }
}

/// Anything that can take a raw batch on the dispatch thread.
pub trait Dispatcher: Send + fmt::Debug {
    /// Returns how many events reached a listener.
    fn dispatch_batch(&mut self, batch: Vec<InputEvent>) -> Result<usize, PumpError>;
}

impl Dispatcher for EventRouter {
    fn dispatch_batch(&mut self, batch: Vec<InputEvent>) -> Result<usize, PumpError> {
        Ok(self.dispatch(batch)?)
    }
}

impl<R: NodeRegistry + 'static> Dispatcher for ControllerFacade<R> {
    fn dispatch_batch(&mut self, batch: Vec<InputEvent>) -> Result<usize, PumpError> {
        Ok(self.dispatch(batch)?)
    }
}
