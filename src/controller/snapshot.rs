//! Controller snapshot differ.
//!
//! Platforms that only expose polled controller state hand over one
//! [`ControllerSnapshot`] per device and frame. [`SnapshotTracker`] compares it
//! with the previous snapshot of the same device and turns the differences into
//! an ordered raw batch for the router.

use glam::{Quat, Vec2, Vec3};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, warn};

use crate::event::{
    ButtonEvent, ClickPhase, ControllerStatusEvent, DegreesOfFreedom, DeviceId, HoverEvent, InputEvent,
    MoveEvent, NodeId, SourceId, ThumbStickEvent, TriggerEvent,
};

/// Input sources of a tracked controller. Ids are append-only like category ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InputSource {
    None,
    ButtonA,
    ButtonB,
    TriggerIndex,
    TriggerHand,
    Thumbstick,
}

impl InputSource {
    pub const fn id(self) -> SourceId {
        match self {
            InputSource::None => SourceId(0),
            InputSource::ButtonA => SourceId(1),
            InputSource::ButtonB => SourceId(2),
            InputSource::TriggerIndex => SourceId(3),
            InputSource::TriggerHand => SourceId(4),
            InputSource::Thumbstick => SourceId(5),
        }
    }

    pub fn from_id(id: SourceId) -> Option<Self> {
        [
            InputSource::None,
            InputSource::ButtonA,
            InputSource::ButtonB,
            InputSource::TriggerIndex,
            InputSource::TriggerHand,
            InputSource::Thumbstick,
        ]
        .into_iter()
        .find(|source| source.id() == id)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ButtonStates {
    pub a: bool,
    pub b: bool,
    pub trigger_index: bool,
    pub trigger_hand: bool,
    pub thumbstick: bool,
}

impl ButtonStates {
    fn pressed(&self) -> [(InputSource, bool); 5] {
        [
            (InputSource::ButtonA, self.a),
            (InputSource::ButtonB, self.b),
            (InputSource::TriggerIndex, self.trigger_index),
            (InputSource::TriggerHand, self.trigger_hand),
            (InputSource::Thumbstick, self.thumbstick),
        ]
    }
}

/// Polled state of one controller.
#[derive(Debug, Clone, PartialEq)]
pub struct ControllerSnapshot {
    pub device: DeviceId,
    pub buttons: ButtonStates,
    pub index_trigger: f32,
    pub hand_trigger: f32,
    pub thumbstick: Vec2,
    pub position: Vec3,
    pub rotation: Quat,
    pub connected: bool,
    pub six_dof: bool,
    pub battery_percent: u8,
    /// Scene node under the controller ray, if any.
    pub hit_target: Option<NodeId>,
    pub hit_position: Option<Vec3>,
}

impl ControllerSnapshot {
    /// Disconnected controller at rest.
    pub fn new(device: DeviceId) -> Self {
        Self {
            device,
            buttons: ButtonStates::default(),
            index_trigger: 0.0,
            hand_trigger: 0.0,
            thumbstick: Vec2::ZERO,
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            connected: false,
            six_dof: false,
            battery_percent: 0,
            hit_target: None,
            hit_position: None,
        }
    }

    fn degrees_of_freedom(&self) -> DegreesOfFreedom {
        if self.six_dof {
            DegreesOfFreedom::Six
        } else {
            DegreesOfFreedom::Three
        }
    }
}

#[derive(Debug, Default)]
pub struct SnapshotTracker {
    devices: HashMap<DeviceId, Option<ControllerSnapshot>>,
}

impl SnapshotTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_device(&mut self, device: DeviceId) {
        debug!("Tracking controller device {}", device);
        self.devices.entry(device).or_insert(None);
    }

    pub fn unregister_device(&mut self, device: DeviceId) -> bool {
        self.devices.remove(&device).is_some()
    }

    pub fn is_registered(&self, device: DeviceId) -> bool {
        self.devices.contains_key(&device)
    }

    /// Diffs every snapshot against the last one seen for its device.
    ///
    /// Per snapshot the batch holds, in order: status, move, hover, button
    /// edges, thumbstick, triggers. The first snapshot of a device always
    /// reports status and pose.
    ///
    /// A node that stops being hit gets a hover-off event. The node under the
    /// ray gets a hover-on event whenever the target, the pose or the hit
    /// point changes.
    pub fn process<I>(&mut self, snapshots: I) -> Vec<InputEvent>
    where
        I: IntoIterator<Item = ControllerSnapshot>,
    {
        let mut batch = Vec::new();
        for snapshot in snapshots {
            let Some(slot) = self.devices.get_mut(&snapshot.device) else {
                warn!("Skipping snapshot from unregistered device {}", snapshot.device);
                continue;
            };
            let previous = slot.replace(snapshot.clone());
            diff(previous.as_ref(), &snapshot, &mut batch);
        }
        batch
    }
}

fn diff(previous: Option<&ControllerSnapshot>, current: &ControllerSnapshot, out: &mut Vec<InputEvent>) {
    let first = previous.is_none();
    let rest = ControllerSnapshot::new(current.device);
    let previous = previous.unwrap_or(&rest);
    let device = current.device;

    if first
        || previous.connected != current.connected
        || previous.six_dof != current.six_dof
        || previous.battery_percent != current.battery_percent
    {
        out.push(
            ControllerStatusEvent::new(
                device,
                current.connected,
                current.degrees_of_freedom(),
                current.battery_percent,
            )
            .into(),
        );
    }

    let moved = first || previous.position != current.position || previous.rotation != current.rotation;
    if moved {
        out.push(
            MoveEvent {
                device,
                source: InputSource::None.id(),
                position: current.position,
                orientation: current.rotation,
            }
            .into(),
        );
    }

    let retargeted = previous.hit_target != current.hit_target;
    if retargeted && previous.hit_target.is_some() {
        out.push(
            HoverEvent {
                device,
                source: InputSource::None.id(),
                target: previous.hit_target,
                is_hovering: false,
                position: previous.hit_position,
            }
            .into(),
        );
    }
    if current.hit_target.is_some() && (retargeted || moved || previous.hit_position != current.hit_position) {
        out.push(
            HoverEvent {
                device,
                source: InputSource::None.id(),
                target: current.hit_target,
                is_hovering: true,
                position: current.hit_position,
            }
            .into(),
        );
    }

    for ((source, was), (_, is)) in previous.buttons.pressed().into_iter().zip(current.buttons.pressed()) {
        if was == is {
            continue;
        }
        let phase = if is { ClickPhase::Down } else { ClickPhase::Up };
        let mut event = ButtonEvent::new(device, source.id(), current.hit_target, phase);
        if let Some(position) = current.hit_position {
            event = event.with_position(position);
        }
        out.push(event.into());
    }

    if previous.buttons.thumbstick != current.buttons.thumbstick || previous.thumbstick != current.thumbstick {
        out.push(
            ThumbStickEvent {
                device,
                source: InputSource::Thumbstick.id(),
                is_pressed: current.buttons.thumbstick,
                axis: current.thumbstick.extend(0.0),
            }
            .into(),
        );
    }

    if previous.index_trigger != current.index_trigger {
        out.push(TriggerEvent::new(device, InputSource::TriggerIndex.id(), current.index_trigger).into());
    }
    if previous.hand_trigger != current.hand_trigger {
        out.push(TriggerEvent::new(device, InputSource::TriggerHand.id(), current.hand_trigger).into());
    }
}
