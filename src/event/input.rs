//! Normalized input events.
//!
//! Transports hand the router batches of [`InputEvent`]s. The same type is
//! delivered to listeners, with `Clicked` button events synthesized by the
//! router in between.

use chrono::{DateTime, Local};
use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::category::EventCategory;

/// Identifies the physical device (controller, headset, touchscreen).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DeviceId(pub u32);

/// Identifies the input origin on a device (button, finger, ray).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SourceId(pub u32);

/// Opaque scene entity id. Only used as a lookup key and for equality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub u64);

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "device:{}", self.0)
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "source:{}", self.0)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node:{}", self.0)
    }
}

// Click phase, wire values 1..3
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ClickPhase {
    Down,
    Up,
    /// Only ever produced by the router, never by a transport.
    Clicked,
}

impl ClickPhase {
    pub fn from_wire(value: i32) -> Option<Self> {
        match value {
            1 => Some(ClickPhase::Down),
            2 => Some(ClickPhase::Up),
            3 => Some(ClickPhase::Clicked),
            _ => None,
        }
    }

    pub fn wire(self) -> i32 {
        match self {
            ClickPhase::Down => 1,
            ClickPhase::Up => 2,
            ClickPhase::Clicked => 3,
        }
    }
}

// Tracking capability of a controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DegreesOfFreedom {
    /// Orientation only.
    Three,
    /// Orientation and position.
    Six,
}

impl DegreesOfFreedom {
    pub fn count(self) -> u8 {
        match self {
            DegreesOfFreedom::Three => 3,
            DegreesOfFreedom::Six => 6,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ButtonEvent {
    pub device: DeviceId,
    pub source: SourceId,
    /// Hit-test result of the ray/finger at the time of the event, `None` for background.
    pub target: Option<NodeId>,
    pub phase: ClickPhase,
    pub position: Option<Vec3>,
    pub timestamp: DateTime<Local>,
}

impl ButtonEvent {
    pub fn new(device: DeviceId, source: SourceId, target: Option<NodeId>, phase: ClickPhase) -> Self {
        Self {
            device,
            source,
            target,
            phase,
            position: None,
            timestamp: Local::now(),
        }
    }

    pub fn with_position(mut self, position: Vec3) -> Self {
        self.position = Some(position);
        self
    }

    pub fn at(mut self, timestamp: DateTime<Local>) -> Self {
        self.timestamp = timestamp;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HoverEvent {
    pub device: DeviceId,
    pub source: SourceId,
    pub target: Option<NodeId>,
    pub is_hovering: bool,
    pub position: Option<Vec3>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ThumbStickEvent {
    pub device: DeviceId,
    pub source: SourceId,
    pub is_pressed: bool,
    pub axis: Vec3,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TriggerEvent {
    pub device: DeviceId,
    pub source: SourceId,
    /// Pull weight in `[0, 1]`.
    pub weight: f32,
}

impl TriggerEvent {
    /// Builds a trigger event, clamping the weight into `[0, 1]`.
    pub fn new(device: DeviceId, source: SourceId, weight: f32) -> Self {
        Self {
            device,
            source,
            weight: weight.clamp(0.0, 1.0),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MoveEvent {
    pub device: DeviceId,
    pub source: SourceId,
    pub position: Vec3,
    pub orientation: Quat,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ControllerStatusEvent {
    pub device: DeviceId,
    pub connected: bool,
    pub degrees_of_freedom: DegreesOfFreedom,
    /// Battery charge in percent, `0..=100`.
    pub battery_percent: u8,
}

impl ControllerStatusEvent {
    pub fn new(
        device: DeviceId,
        connected: bool,
        degrees_of_freedom: DegreesOfFreedom,
        battery_percent: u8,
    ) -> Self {
        Self {
            device,
            connected,
            degrees_of_freedom,
            battery_percent: battery_percent.min(100),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CameraTransformEvent {
    pub position: Vec3,
    /// Euler rotation in radians.
    pub rotation: Vec3,
    pub forward: Vec3,
    pub up: Vec3,
}

/// One normalized input event.
#[derive(Debug, Clone, PartialEq)]
pub enum InputEvent {
    Button(ButtonEvent),
    Hover(HoverEvent),
    ThumbStick(ThumbStickEvent),
    Trigger(TriggerEvent),
    Move(MoveEvent),
    ControllerStatus(ControllerStatusEvent),
    CameraTransform(CameraTransformEvent),
}

impl InputEvent {
    pub fn category(&self) -> EventCategory {
        match self {
            InputEvent::Button(_) => EventCategory::Click,
            InputEvent::Hover(_) => EventCategory::Hover,
            InputEvent::ThumbStick(_) => EventCategory::ThumbStick,
            InputEvent::Trigger(_) => EventCategory::Trigger,
            InputEvent::Move(_) => EventCategory::Move,
            InputEvent::ControllerStatus(_) => EventCategory::ControllerStatus,
            InputEvent::CameraTransform(_) => EventCategory::CameraTransform,
        }
    }

    pub fn device(&self) -> Option<DeviceId> {
        match self {
            InputEvent::Button(e) => Some(e.device),
            InputEvent::Hover(e) => Some(e.device),
            InputEvent::ThumbStick(e) => Some(e.device),
            InputEvent::Trigger(e) => Some(e.device),
            InputEvent::Move(e) => Some(e.device),
            InputEvent::ControllerStatus(e) => Some(e.device),
            InputEvent::CameraTransform(_) => None,
        }
    }

    pub fn as_button(&self) -> Option<&ButtonEvent> {
        match self {
            InputEvent::Button(e) => Some(e),
            _ => None,
        }
    }

    pub fn as_hover(&self) -> Option<&HoverEvent> {
        match self {
            InputEvent::Hover(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ButtonEvent> for InputEvent {
    fn from(event: ButtonEvent) -> Self {
        InputEvent::Button(event)
    }
}

impl From<HoverEvent> for InputEvent {
    fn from(event: HoverEvent) -> Self {
        InputEvent::Hover(event)
    }
}

impl From<ThumbStickEvent> for InputEvent {
    fn from(event: ThumbStickEvent) -> Self {
        InputEvent::ThumbStick(event)
    }
}

impl From<TriggerEvent> for InputEvent {
    fn from(event: TriggerEvent) -> Self {
        InputEvent::Trigger(event)
    }
}

impl From<MoveEvent> for InputEvent {
    fn from(event: MoveEvent) -> Self {
        InputEvent::Move(event)
    }
}

impl From<ControllerStatusEvent> for InputEvent {
    fn from(event: ControllerStatusEvent) -> Self {
        InputEvent::ControllerStatus(event)
    }
}

impl From<CameraTransformEvent> for InputEvent {
    fn from(event: CameraTransformEvent) -> Self {
        InputEvent::CameraTransform(event)
    }
}
