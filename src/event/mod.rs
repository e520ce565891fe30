//! Event model shared by the router, the controller facade and the transports.

pub mod category;
pub mod input;

pub use category::{CategoryId, CategoryMask, EventCategory, CATEGORY_TABLE, CATEGORY_TABLE_VERSION};
pub use input::{
    ButtonEvent, CameraTransformEvent, ClickPhase, ControllerStatusEvent, DegreesOfFreedom,
    DeviceId, HoverEvent, InputEvent, MoveEvent, NodeId, SourceId, ThumbStickEvent, TriggerEvent,
};
