//! Input event routing and touch gesture recognition.
//!
//! ```text
//! NativeTransport ──► DispatchPump ──► EventRouter ──► listeners
//!                                          │
//!                                 ControllerFacade (click / hover, forward vector)
//!
//! TouchSample ──► GestureRecognizer ──► GestureEvent
//! ```

pub mod config;
pub mod controller;
pub mod dispatch;
pub mod event;
pub mod gesture;
pub mod native;
pub mod router;
pub mod scene;

pub use config::{ConfigError, InputConfig};
pub use controller::{ClickListener, ControllerError, ControllerFacade, ControllerSettings, HoverListener};
pub use dispatch::{Dispatcher, DispatchSettings, PumpError, PumpHandle};
pub use event::{CategoryId, EventCategory, InputEvent};
pub use gesture::{GestureEvent, GestureRecognizer, GestureSettings};
pub use native::{LoopbackTransport, NativeHandle, NativeTransport, TransportError};
pub use router::{EventListener, EventRouter, ListenerHandle, ListenerRegistry, ListenerToken, RouterError};
pub use scene::{NodeRegistry, SceneNodes};
