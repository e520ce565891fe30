//! Listener registration.
//!
//! Routers never own application listeners. The application registers a
//! listener here and keeps the returned [`ListenerHandle`]; routers only hold the
//! copyable [`ListenerToken`]. A token is an index plus a generation, so once the
//! handle is dropped the slot's generation moves on and every router holding
//! the old token sees an empty slot instead of a stale listener.

use parking_lot::Mutex;
use std::fmt;
use std::sync::{Arc, Weak};
use tracing::debug;

use crate::event::InputEvent;

/// Receives every enabled category's events, one call per dispatch, in arrival order.
pub trait EventListener: Send {
    fn on_events(&mut self, events: &[InputEvent]);
}

impl<F> EventListener for F
where
    F: FnMut(&[InputEvent]) + Send,
{
    fn on_events(&mut self, events: &[InputEvent]) {
        self(events)
    }
}

pub type SharedListener = Arc<Mutex<dyn EventListener>>;

/// Non-owning reference to a registered listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerToken {
    index: u32,
    generation: u32,
}

struct Slot {
    generation: u32,
    listener: Option<SharedListener>,
}

#[derive(Default)]
struct Slots {
    entries: Vec<Slot>,
    free: Vec<u32>,
}

impl Slots {
    fn remove(&mut self, token: ListenerToken) -> bool {
        match self.entries.get_mut(token.index as usize) {
            Some(slot) if slot.generation == token.generation && slot.listener.is_some() => {
                slot.listener = None;
                slot.generation = slot.generation.wrapping_add(1);
                self.free.push(token.index);
                true
            }
            _ => false,
        }
    }
}

/// Shared table of application listeners. Cloning shares the table.
#[derive(Clone, Default)]
pub struct ListenerRegistry {
    slots: Arc<Mutex<Slots>>,
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<L: EventListener + 'static>(&self, listener: L) -> ListenerHandle {
        self.register_shared(Arc::new(Mutex::new(listener)))
    }

    /// Registers a listener the caller keeps its own reference to.
    pub fn register_shared<L: EventListener + 'static>(&self, listener: Arc<Mutex<L>>) -> ListenerHandle {
        let listener: SharedListener = listener;
        let mut slots = self.slots.lock();
        let token = match slots.free.pop() {
            Some(index) => {
                let slot = &mut slots.entries[index as usize];
                slot.listener = Some(listener);
                ListenerToken {
                    index,
                    generation: slot.generation,
                }
            }
            None => {
                let index = slots.entries.len() as u32;
                slots.entries.push(Slot {
                    generation: 0,
                    listener: Some(listener),
                });
                ListenerToken { index, generation: 0 }
            }
        };
        debug!("Registered listener {:?}", token);
        ListenerHandle {
            token,
            slots: Arc::downgrade(&self.slots),
        }
    }

    /// The listener behind `token`, if its registration is still alive.
    pub fn resolve(&self, token: ListenerToken) -> Option<SharedListener> {
        let slots = self.slots.lock();
        slots
            .entries
            .get(token.index as usize)
            .filter(|slot| slot.generation == token.generation)
            .and_then(|slot| slot.listener.clone())
    }

    pub fn is_live(&self, token: ListenerToken) -> bool {
        self.resolve(token).is_some()
    }

    pub fn len(&self) -> usize {
        let slots = self.slots.lock();
        slots.entries.len() - slots.free.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for ListenerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerRegistry")
            .field("live", &self.len())
            .finish()
    }
}

/// Keeps a registration alive. Dropping it unregisters the listener.
#[derive(Debug)]
pub struct ListenerHandle {
    token: ListenerToken,
    slots: Weak<Mutex<Slots>>,
}

impl ListenerHandle {
    pub fn token(&self) -> ListenerToken {
        self.token
    }

    pub fn release(self) {
        drop(self)
    }
}

impl Drop for ListenerHandle {
    fn drop(&mut self) {
        if let Some(slots) = self.slots.upgrade() {
            if slots.lock().remove(self.token) {
                debug!("Unregistered listener {:?}", self.token);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop(_: &[InputEvent]) {}

    #[test]
    fn test_token_expires_with_handle() {
        let registry = ListenerRegistry::new();
        let handle = registry.register(noop);
        let token = handle.token();
        assert!(registry.is_live(token));

        handle.release();
        assert!(!registry.is_live(token));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_reused_slot_does_not_revive_old_token() {
        let registry = ListenerRegistry::new();
        let first = registry.register(noop);
        let stale = first.token();
        drop(first);

        let second = registry.register(noop);
        assert_ne!(second.token(), stale);
        assert!(!registry.is_live(stale));
        assert!(registry.is_live(second.token()));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_handle_outliving_registry() {
        let registry = ListenerRegistry::new();
        let handle = registry.register(noop);
        drop(registry);
        drop(handle);
    }
}
