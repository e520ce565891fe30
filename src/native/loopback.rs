//! In-process transport.
//!
//! Stands in for the platform layer in the demo binary and in tests: it hands
//! out handles, remembers what was toggled, and queues forward-vector requests
//! until they are answered (or answers them immediately when a fixed forward
//! vector is configured).

use glam::Vec3;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet, VecDeque};
use tracing::{debug, warn};

use super::{NativeHandle, NativeTransport, TransportError};
use crate::controller::forward::ForwardReply;
use crate::event::{CategoryMask, EventCategory};

#[derive(Debug, Default)]
struct LoopbackState {
    next_handle: u64,
    closed: bool,
    live: HashSet<NativeHandle>,
    releases: HashMap<NativeHandle, usize>,
    categories: HashMap<NativeHandle, CategoryMask>,
    reticle_visible: HashMap<NativeHandle, bool>,
    controller_visible: HashMap<NativeHandle, bool>,
    light_bitmask: HashMap<NativeHandle, u32>,
    pending_forward: VecDeque<ForwardReply>,
    fixed_forward: Option<Vec3>,
}

#[derive(Debug, Default)]
pub struct LoopbackTransport {
    state: Mutex<LoopbackState>,
}

impl LoopbackTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answers every forward-vector request immediately with `forward`.
    pub fn with_forward_vector(forward: Vec3) -> Self {
        let transport = Self::default();
        transport.state.lock().fixed_forward = Some(forward);
        transport
    }

    /// Makes further allocations fail.
    pub fn close(&self) {
        self.state.lock().closed = true;
    }

    pub fn is_live(&self, handle: NativeHandle) -> bool {
        self.state.lock().live.contains(&handle)
    }

    pub fn release_count(&self, handle: NativeHandle) -> usize {
        self.state.lock().releases.get(&handle).copied().unwrap_or(0)
    }

    pub fn enabled_categories(&self, handle: NativeHandle) -> CategoryMask {
        self.state
            .lock()
            .categories
            .get(&handle)
            .copied()
            .unwrap_or_default()
    }

    pub fn reticle_visible(&self, handle: NativeHandle) -> Option<bool> {
        self.state.lock().reticle_visible.get(&handle).copied()
    }

    pub fn controller_visible(&self, handle: NativeHandle) -> Option<bool> {
        self.state.lock().controller_visible.get(&handle).copied()
    }

    pub fn light_receiving_bitmask(&self, handle: NativeHandle) -> Option<u32> {
        self.state.lock().light_bitmask.get(&handle).copied()
    }

    pub fn pending_forward_requests(&self) -> usize {
        self.state.lock().pending_forward.len()
    }

    /// Answers all queued forward-vector requests. Returns how many were answered.
    pub fn answer_forward_requests(&self, forward: Vec3) -> usize {
        // Replies may run callbacks, so they are answered outside the lock.
        let pending: Vec<ForwardReply> = self.state.lock().pending_forward.drain(..).collect();
        let count = pending.len();
        for reply in pending {
            reply.answer(forward);
        }
        count
    }

    /// Drops all queued forward-vector requests without answering them.
    pub fn drop_forward_requests(&self) -> usize {
        let pending: Vec<ForwardReply> = self.state.lock().pending_forward.drain(..).collect();
        pending.len()
    }
}

impl NativeTransport for LoopbackTransport {
    fn allocate(&self) -> Result<NativeHandle, TransportError> {
        let mut state = self.state.lock();
        if state.closed {
            return Err(TransportError::Closed);
        }
        state.next_handle += 1;
        let handle = NativeHandle(state.next_handle);
        state.live.insert(handle);
        debug!("Loopback allocated {}", handle);
        Ok(handle)
    }

    fn release(&self, handle: NativeHandle) {
        let mut state = self.state.lock();
        if !state.live.remove(&handle) {
            warn!("Loopback asked to release {} which is not live", handle);
        }
        *state.releases.entry(handle).or_insert(0) += 1;
        state.categories.remove(&handle);
    }

    fn set_category_enabled(&self, handle: NativeHandle, category: EventCategory, enabled: bool) {
        let mut state = self.state.lock();
        if !state.live.contains(&handle) {
            warn!("Category toggle for released {}", handle);
            return;
        }
        state.categories.entry(handle).or_default().set(category, enabled);
    }

    fn set_reticle_visible(&self, handle: NativeHandle, visible: bool) {
        self.state.lock().reticle_visible.insert(handle, visible);
    }

    fn set_controller_visible(&self, handle: NativeHandle, visible: bool) {
        self.state.lock().controller_visible.insert(handle, visible);
    }

    fn set_light_receiving_bitmask(&self, handle: NativeHandle, bitmask: u32) {
        self.state.lock().light_bitmask.insert(handle, bitmask);
    }

    fn request_forward_vector(&self, handle: NativeHandle, reply: ForwardReply) {
        let fixed = {
            let mut state = self.state.lock();
            match state.fixed_forward {
                Some(forward) => Some((forward, reply)),
                None => {
                    debug!("Queued forward vector request for {}", handle);
                    state.pending_forward.push_back(reply);
                    None
                }
            }
        };
        if let Some((forward, reply)) = fixed {
            reply.answer(forward);
        }
    }
}
