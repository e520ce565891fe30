//! Event Router - filters raw batches and delivers them to one listener
//!
//! ```text
//! Transport ──[batch]──► category mask ──► click synthesis ──► listener (weak)
//! ```
//!
//! All calls are expected on the dispatch thread. Listener callbacks run
//! synchronously inside [`EventRouter::dispatch`], so a slow listener stalls
//! input processing for everyone.

use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, trace, warn};

use super::click::ClickTracker;
use super::listener::{ListenerRegistry, ListenerToken};
use super::RouterError;
use crate::event::{CategoryId, CategoryMask, EventCategory, InputEvent};
use crate::native::{NativeHandle, NativeSlot, NativeTransport};

pub struct EventRouter {
    native: NativeSlot,
    mask: CategoryMask,
    listeners: ListenerRegistry,
    listener: Option<ListenerToken>,
    clicks: ClickTracker,
}

impl EventRouter {
    /// Allocates native dispatch resources. Every category starts disabled.
    pub fn create(
        transport: Arc<dyn NativeTransport>,
        listeners: ListenerRegistry,
    ) -> Result<Self, RouterError> {
        let native = NativeSlot::acquire(transport)?;
        info!("Event router created on {:?}", native.handle());
        Ok(Self {
            native,
            mask: CategoryMask::empty(),
            listeners,
            listener: None,
            clicks: ClickTracker::new(),
        })
    }

    /// Releases native resources. Calling it again has no further effect.
    pub fn dispose(&mut self) {
        if self.native.release() {
            self.listener = None;
            self.clicks.clear();
            info!("Event router disposed");
        } else {
            debug!("Event router already disposed");
        }
    }

    pub fn is_disposed(&self) -> bool {
        self.native.handle().is_none()
    }

    pub fn native_handle(&self) -> Option<NativeHandle> {
        self.native.handle()
    }

    pub fn transport(&self) -> &Arc<dyn NativeTransport> {
        self.native.transport()
    }

    pub(crate) fn live_handle(&self) -> Result<NativeHandle, RouterError> {
        self.native.handle().ok_or(RouterError::InvalidHandle)
    }

    /// Enables or disables a category by wire id. Unknown ids are logged and ignored.
    pub fn set_category_enabled(
        &mut self,
        id: impl Into<CategoryId>,
        enabled: bool,
    ) -> Result<(), RouterError> {
        let handle = self.live_handle()?;
        let id = id.into();
        let Some(category) = EventCategory::from_id(id) else {
            warn!("Ignoring toggle for unknown event category id {}", id);
            return Ok(());
        };

        self.mask.set(category, enabled);
        self.native
            .transport()
            .set_category_enabled(handle, category, enabled);
        debug!("Category {} enabled={}", category, enabled);
        Ok(())
    }

    pub fn is_category_enabled(&self, category: EventCategory) -> bool {
        self.mask.is_enabled(category)
    }

    pub fn mask(&self) -> CategoryMask {
        self.mask
    }

    /// Points the router at a registered listener, or at nothing.
    /// The router never keeps the listener alive.
    pub fn set_listener(&mut self, listener: Option<ListenerToken>) -> Result<(), RouterError> {
        self.live_handle()?;
        debug!("Router listener set to {:?}", listener);
        self.listener = listener;
        Ok(())
    }

    pub fn listener(&self) -> Option<ListenerToken> {
        self.listener
    }

    /// Filters a batch to the enabled categories, synthesizes clicks, and hands
    /// the result to the listener in arrival order.
    ///
    /// Returns how many events reached the listener. A cleared or expired
    /// listener is not an error: nothing is delivered and `Ok(0)` is returned.
    pub fn dispatch<I>(&mut self, batch: I) -> Result<usize, RouterError>
    where
        I: IntoIterator<Item = InputEvent>,
    {
        self.live_handle()?;

        let mut delivered = Vec::new();
        for event in batch {
            match event {
                // Press state is tracked even while Click is disabled so that a
                // release after re-enabling still completes the click.
                InputEvent::Button(button) => {
                    let click_enabled = self.mask.is_enabled(EventCategory::Click);
                    for out in self.clicks.track(button) {
                        if click_enabled {
                            delivered.push(InputEvent::Button(out));
                        }
                    }
                }
                other => {
                    if self.mask.is_enabled(other.category()) {
                        delivered.push(other);
                    } else {
                        trace!("Filtered {:?} event", other.category());
                    }
                }
            }
        }

        if delivered.is_empty() {
            return Ok(0);
        }

        let Some(token) = self.listener else {
            trace!("No listener set, dropping {} events", delivered.len());
            return Ok(0);
        };
        let Some(listener) = self.listeners.resolve(token) else {
            debug!("Listener {:?} is gone, dropping {} events", token, delivered.len());
            return Ok(0);
        };

        listener.lock().on_events(&delivered);
        Ok(delivered.len())
    }
}

impl fmt::Debug for EventRouter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventRouter")
            .field("native", &self.native)
            .field("mask", &self.mask)
            .field("listener", &self.listener)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{
        ButtonEvent, ClickPhase, ControllerStatusEvent, DegreesOfFreedom, DeviceId, HoverEvent,
        NodeId, SourceId, TriggerEvent,
    };
    use crate::native::LoopbackTransport;
    use parking_lot::Mutex;

    fn recorder(registry: &ListenerRegistry) -> (Arc<Mutex<Vec<Vec<InputEvent>>>>, crate::router::ListenerHandle) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let handle = registry.register(move |events: &[InputEvent]| sink.lock().push(events.to_vec()));
        (seen, handle)
    }

    fn hover() -> InputEvent {
        HoverEvent {
            device: DeviceId(1),
            source: SourceId(1),
            target: Some(NodeId(5)),
            is_hovering: true,
            position: None,
        }
        .into()
    }

    fn status() -> InputEvent {
        ControllerStatusEvent::new(DeviceId(1), true, DegreesOfFreedom::Six, 90).into()
    }

    fn setup() -> (Arc<LoopbackTransport>, ListenerRegistry, EventRouter) {
        let transport = Arc::new(LoopbackTransport::new());
        let registry = ListenerRegistry::new();
        let router = EventRouter::create(transport.clone(), registry.clone()).unwrap();
        (transport, registry, router)
    }

    #[test]
    fn test_categories_disabled_by_default() {
        let (_transport, registry, mut router) = setup();
        let (seen, handle) = recorder(&registry);
        router.set_listener(Some(handle.token())).unwrap();

        assert_eq!(router.dispatch(vec![hover(), status()]).unwrap(), 0);
        assert!(seen.lock().is_empty());
    }

    #[test]
    fn test_only_enabled_category_reaches_listener() {
        let (transport, registry, mut router) = setup();
        let (seen, handle) = recorder(&registry);
        router.set_listener(Some(handle.token())).unwrap();
        router.set_category_enabled(EventCategory::Hover, true).unwrap();

        assert_eq!(router.dispatch(vec![hover(), status()]).unwrap(), 1);
        let batches = seen.lock();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0], vec![hover()]);

        let handle_id = router.native_handle().unwrap();
        assert!(transport.enabled_categories(handle_id).is_enabled(EventCategory::Hover));
    }

    #[test]
    fn test_last_toggle_wins() {
        let (_transport, registry, mut router) = setup();
        let (seen, handle) = recorder(&registry);
        router.set_listener(Some(handle.token())).unwrap();

        router.set_category_enabled(EventCategory::Trigger, true).unwrap();
        router.set_category_enabled(EventCategory::Trigger, false).unwrap();
        let trigger: InputEvent = TriggerEvent::new(DeviceId(1), SourceId(3), 0.5).into();
        assert_eq!(router.dispatch(vec![trigger.clone()]).unwrap(), 0);

        router.set_category_enabled(EventCategory::Trigger, true).unwrap();
        assert_eq!(router.dispatch(vec![trigger]).unwrap(), 1);
        assert_eq!(seen.lock().len(), 1);
    }

    #[test]
    fn test_unknown_category_is_ignored() {
        let (_transport, _registry, mut router) = setup();
        router.set_category_enabled(CategoryId(42), true).unwrap();
        router.set_category_enabled(0u32, true).unwrap();
        assert!(router.mask().is_empty());
    }

    #[test]
    fn test_click_sequence_preserves_order() {
        let (_transport, registry, mut router) = setup();
        let (seen, handle) = recorder(&registry);
        router.set_listener(Some(handle.token())).unwrap();
        router.set_category_enabled(EventCategory::Click, true).unwrap();

        let down = ButtonEvent::new(DeviceId(1), SourceId(1), Some(NodeId(42)), ClickPhase::Down);
        let up = ButtonEvent::new(DeviceId(1), SourceId(1), Some(NodeId(42)), ClickPhase::Up);
        assert_eq!(router.dispatch(vec![down.into(), hover(), up.into()]).unwrap(), 3);

        let batches = seen.lock();
        let phases: Vec<ClickPhase> = batches[0]
            .iter()
            .filter_map(|e| e.as_button().map(|b| b.phase))
            .collect();
        assert_eq!(phases, vec![ClickPhase::Down, ClickPhase::Up, ClickPhase::Clicked]);
    }

    #[test]
    fn test_expired_listener_is_silent() {
        let (_transport, registry, mut router) = setup();
        let (seen, handle) = recorder(&registry);
        router.set_listener(Some(handle.token())).unwrap();
        router.set_category_enabled(EventCategory::Hover, true).unwrap();
        drop(handle);

        assert_eq!(router.dispatch(vec![hover()]).unwrap(), 0);
        assert!(seen.lock().is_empty());
    }

    #[test]
    fn test_cleared_listener_is_silent() {
        let (_transport, registry, mut router) = setup();
        let (seen, handle) = recorder(&registry);
        router.set_listener(Some(handle.token())).unwrap();
        router.set_category_enabled(EventCategory::Hover, true).unwrap();
        router.set_listener(None).unwrap();

        assert_eq!(router.dispatch(vec![hover()]).unwrap(), 0);
        assert!(seen.lock().is_empty());
    }

    #[test]
    fn test_dispose_is_idempotent() {
        let (transport, _registry, mut router) = setup();
        let handle = router.native_handle().unwrap();

        router.dispose();
        router.dispose();
        drop(router);

        assert_eq!(transport.release_count(handle), 1);
    }

    #[test]
    fn test_disposed_router_rejects_operations() {
        let (_transport, _registry, mut router) = setup();
        router.dispose();

        assert!(matches!(
            router.set_category_enabled(EventCategory::Hover, true),
            Err(RouterError::InvalidHandle)
        ));
        assert!(matches!(router.set_listener(None), Err(RouterError::InvalidHandle)));
        assert!(matches!(router.dispatch(vec![hover()]), Err(RouterError::InvalidHandle)));
    }

    #[test]
    fn test_create_fails_on_closed_transport() {
        let transport = Arc::new(LoopbackTransport::new());
        transport.close();
        let result = EventRouter::create(transport, ListenerRegistry::new());
        assert!(matches!(result, Err(RouterError::Transport(_))));
    }
}
