//! Controller Facade - controller state and single-slot listeners over a router
//!
//! ```text
//!                      ┌──► ClickListener (Button events, target resolved)
//! EventRouter ──► Sink ├──► HoverListener (Hover events, target resolved)
//!                      └──► general listener (whole batch)
//! ```
//!
//! Setting a click or hover listener enables its category on the router,
//! clearing it disables the category again.

use glam::Vec3;
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use std::thread::{self, ThreadId};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace};

use super::forward::ForwardReply;
use super::{ControllerError, ControllerSettings};
use crate::event::{ClickPhase, EventCategory, InputEvent, NodeId, SourceId};
use crate::native::{NativeHandle, NativeTransport};
use crate::router::{EventListener, EventRouter, ListenerHandle, ListenerRegistry, ListenerToken};
use crate::scene::NodeRegistry;

pub trait ClickListener<E>: Send {
    /// Called for every click phase. Forwards `Clicked` to [`ClickListener::on_click`] by default.
    fn on_click_state(
        &mut self,
        source: SourceId,
        target: Option<E>,
        phase: ClickPhase,
        position: Option<Vec3>,
    ) {
        if phase == ClickPhase::Clicked {
            self.on_click(source, target, position);
        }
    }

    fn on_click(&mut self, _source: SourceId, _target: Option<E>, _position: Option<Vec3>) {}
}

pub trait HoverListener<E>: Send {
    fn on_hover(&mut self, source: SourceId, target: Option<E>, is_hovering: bool, position: Option<Vec3>);
}

struct ControllerSink<R: NodeRegistry> {
    nodes: Arc<R>,
    registry: ListenerRegistry,
    click: Option<Box<dyn ClickListener<R::Entity>>>,
    hover: Option<Box<dyn HoverListener<R::Entity>>>,
    general: Option<ListenerToken>,
}

impl<R: NodeRegistry> ControllerSink<R> {
    fn resolve(nodes: &R, target: Option<NodeId>) -> Option<R::Entity> {
        let id = target?;
        let entity = nodes.lookup(id);
        if entity.is_none() {
            trace!("Target {} not in node registry", id);
        }
        entity
    }

    fn clear(&mut self) {
        self.click = None;
        self.hover = None;
        self.general = None;
    }
}

impl<R: NodeRegistry> EventListener for ControllerSink<R> {
    fn on_events(&mut self, events: &[InputEvent]) {
        for event in events {
            match event {
                InputEvent::Button(button) => {
                    if let Some(listener) = self.click.as_mut() {
                        let target = Self::resolve(&self.nodes, button.target);
                        listener.on_click_state(button.source, target, button.phase, button.position);
                    }
                }
                InputEvent::Hover(hover) => {
                    if let Some(listener) = self.hover.as_mut() {
                        let target = Self::resolve(&self.nodes, hover.target);
                        listener.on_hover(hover.source, target, hover.is_hovering, hover.position);
                    }
                }
                _ => {}
            }
        }

        if let Some(listener) = self.general.and_then(|token| self.registry.resolve(token)) {
            listener.lock().on_events(events);
        }
    }
}

/// Pending awaitable forward-vector query.
#[derive(Debug)]
pub struct ForwardQuery {
    rx: tokio::sync::oneshot::Receiver<Vec3>,
    cancel: CancellationToken,
}

impl ForwardQuery {
    /// Waits for the platform's answer. Fails with `InvalidHandle` when the
    /// facade is disposed before the answer arrives. An answer that arrived
    /// before disposal is still returned.
    pub async fn resolve(mut self) -> Result<Vec3, ControllerError> {
        if let Ok(answer) = self.rx.try_recv() {
            return Ok(answer);
        }
        tokio::select! {
            biased;
            answer = &mut self.rx => answer.map_err(|_| ControllerError::ForwardQueryDropped),
            _ = self.cancel.cancelled() => Err(ControllerError::InvalidHandle),
        }
    }
}

pub struct ControllerFacade<R: NodeRegistry + 'static> {
    router: EventRouter,
    sink: Arc<Mutex<ControllerSink<R>>>,
    _sink_registration: ListenerHandle,
    settings: ControllerSettings,
    cancel: CancellationToken,
    /// Thread that last ran `dispatch`.
    dispatch_thread: Mutex<Option<ThreadId>>,
}

impl<R: NodeRegistry + 'static> ControllerFacade<R> {
    pub fn create(
        transport: Arc<dyn NativeTransport>,
        registry: ListenerRegistry,
        nodes: Arc<R>,
        settings: ControllerSettings,
    ) -> Result<Self, ControllerError> {
        let mut router = EventRouter::create(transport, registry.clone())?;

        let sink = Arc::new(Mutex::new(ControllerSink {
            nodes,
            registry: registry.clone(),
            click: None,
            hover: None,
            general: None,
        }));
        let registration = registry.register_shared(sink.clone());
        router.set_listener(Some(registration.token()))?;

        let handle = router.live_handle()?;
        let native = router.transport();
        native.set_reticle_visible(handle, settings.reticle_visible);
        native.set_controller_visible(handle, settings.controller_visible);
        native.set_light_receiving_bitmask(handle, settings.light_receiving_bitmask);

        info!("Controller facade created: {:?}", settings);
        Ok(Self {
            router,
            sink,
            _sink_registration: registration,
            settings,
            cancel: CancellationToken::new(),
            dispatch_thread: Mutex::new(None),
        })
    }

    /// Releases the router and drops every listener. Pending forward-vector
    /// callbacks will not fire. Calling it again has no further effect.
    pub fn dispose(&mut self) {
        if self.router.is_disposed() {
            debug!("Controller facade already disposed");
            return;
        }
        self.cancel.cancel();
        self.sink.lock().clear();
        self.router.dispose();
        info!("Controller facade disposed");
    }

    pub fn is_disposed(&self) -> bool {
        self.router.is_disposed()
    }

    fn live_handle(&self) -> Result<NativeHandle, ControllerError> {
        self.router.live_handle().map_err(|_| ControllerError::InvalidHandle)
    }

    pub fn settings(&self) -> &ControllerSettings {
        &self.settings
    }

    pub fn reticle_visible(&self) -> Result<bool, ControllerError> {
        self.live_handle()?;
        Ok(self.settings.reticle_visible)
    }

    pub fn set_reticle_visible(&mut self, visible: bool) -> Result<(), ControllerError> {
        let handle = self.live_handle()?;
        self.router.transport().set_reticle_visible(handle, visible);
        self.settings.reticle_visible = visible;
        Ok(())
    }

    pub fn controller_visible(&self) -> Result<bool, ControllerError> {
        self.live_handle()?;
        Ok(self.settings.controller_visible)
    }

    pub fn set_controller_visible(&mut self, visible: bool) -> Result<(), ControllerError> {
        let handle = self.live_handle()?;
        self.router.transport().set_controller_visible(handle, visible);
        self.settings.controller_visible = visible;
        Ok(())
    }

    pub fn light_receiving_bitmask(&self) -> Result<u32, ControllerError> {
        self.live_handle()?;
        Ok(self.settings.light_receiving_bitmask)
    }

    pub fn set_light_receiving_bitmask(&mut self, bitmask: u32) -> Result<(), ControllerError> {
        let handle = self.live_handle()?;
        self.router.transport().set_light_receiving_bitmask(handle, bitmask);
        self.settings.light_receiving_bitmask = bitmask;
        Ok(())
    }

    pub fn set_click_listener(
        &mut self,
        listener: Option<Box<dyn ClickListener<R::Entity>>>,
    ) -> Result<(), ControllerError> {
        self.live_handle()?;
        let enabled = listener.is_some();
        self.sink.lock().click = listener;
        self.router.set_category_enabled(EventCategory::Click, enabled)?;
        Ok(())
    }

    pub fn set_hover_listener(
        &mut self,
        listener: Option<Box<dyn HoverListener<R::Entity>>>,
    ) -> Result<(), ControllerError> {
        self.live_handle()?;
        let enabled = listener.is_some();
        self.sink.lock().hover = listener;
        self.router.set_category_enabled(EventCategory::Hover, enabled)?;
        Ok(())
    }

    /// Attaches a registered listener that receives every enabled category.
    /// Categories other than Click and Hover are toggled with
    /// [`ControllerFacade::set_category_enabled`].
    pub fn set_event_listener(&mut self, listener: Option<ListenerToken>) -> Result<(), ControllerError> {
        self.live_handle()?;
        self.sink.lock().general = listener;
        Ok(())
    }

    pub fn set_category_enabled(&mut self, category: EventCategory, enabled: bool) -> Result<(), ControllerError> {
        self.live_handle()?;
        self.router.set_category_enabled(category, enabled)?;
        Ok(())
    }

    pub fn is_category_enabled(&self, category: EventCategory) -> bool {
        self.router.is_category_enabled(category)
    }

    /// Blocks until the platform reports the controller forward vector.
    ///
    /// On the thread that dispatches events it fails with `WouldBlockDispatch`
    /// instead of blocking. Call it from a plain thread or `spawn_blocking`;
    /// async tasks use [`ControllerFacade::forward_vector`].
    pub fn forward_vector_blocking(&self) -> Result<Vec3, ControllerError> {
        let handle = self.live_handle()?;
        if self.is_dispatch_thread() {
            return Err(ControllerError::WouldBlockDispatch);
        }

        let (reply, rx) = ForwardReply::channel();
        self.router.transport().request_forward_vector(handle, reply);
        rx.blocking_recv().map_err(|_| ControllerError::ForwardQueryDropped)
    }

    /// Requests the forward vector and calls `callback` once with the answer.
    /// The callback never runs if the facade is disposed first.
    pub fn forward_vector_async<F>(&self, callback: F) -> Result<(), ControllerError>
    where
        F: FnOnce(Vec3) + Send + 'static,
    {
        let handle = self.live_handle()?;
        let reply = ForwardReply::callback(self.cancel.clone(), callback);
        self.router.transport().request_forward_vector(handle, reply);
        Ok(())
    }

    /// Starts an awaitable forward-vector query.
    pub fn query_forward_vector(&self) -> Result<ForwardQuery, ControllerError> {
        let handle = self.live_handle()?;
        let (reply, rx) = ForwardReply::channel();
        self.router.transport().request_forward_vector(handle, reply);
        Ok(ForwardQuery {
            rx,
            cancel: self.cancel.clone(),
        })
    }

    fn is_dispatch_thread(&self) -> bool {
        *self.dispatch_thread.lock() == Some(thread::current().id())
    }

    pub async fn forward_vector(&self) -> Result<Vec3, ControllerError> {
        self.query_forward_vector()?.resolve().await
    }

    pub fn dispatch<I>(&mut self, batch: I) -> Result<usize, ControllerError>
    where
        I: IntoIterator<Item = InputEvent>,
    {
        if self.is_disposed() {
            return Err(ControllerError::InvalidHandle);
        }
        *self.dispatch_thread.lock() = Some(thread::current().id());
        Ok(self.router.dispatch(batch)?)
    }

    pub fn router(&self) -> &EventRouter {
        &self.router
    }
}

impl<R: NodeRegistry + 'static> Drop for ControllerFacade<R> {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl<R: NodeRegistry + 'static> fmt::Debug for ControllerFacade<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ControllerFacade")
            .field("router", &self.router)
            .field("settings", &self.settings)
            .field("disposed", &self.cancel.is_cancelled())
            .finish_non_exhaustive()
    }
}
