//! Click synthesis.
//!
//! A `Clicked` event is produced when a source releases on the same target it
//! pressed on. Pressing again on another target replaces the pending press, and
//! releasing elsewhere (drag-off) cancels the click.

use chrono::{DateTime, Local};
use std::collections::HashMap;
use tracing::{debug, warn};

use crate::event::{ButtonEvent, ClickPhase, DeviceId, NodeId, SourceId};

#[derive(Clone, Debug)]
struct PendingClick {
    target: Option<NodeId>,
    pressed_at: DateTime<Local>,
}

/// Per-source pending press state. Sources never affect each other.
#[derive(Debug, Default)]
pub struct ClickTracker {
    pending: HashMap<(DeviceId, SourceId), PendingClick>,
}

impl ClickTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds one raw button event and returns what should be delivered for it,
    /// in order: the event itself, followed by a synthesized `Clicked` when the
    /// release completes a click. Orphan releases and raw `Clicked` events
    /// produce nothing.
    pub fn track(&mut self, event: ButtonEvent) -> Vec<ButtonEvent> {
        let key = (event.device, event.source);
        match event.phase {
            ClickPhase::Down => {
                if let Some(previous) = self.pending.get(&key) {
                    if previous.target != event.target {
                        debug!(
                            "{} {} pressed again on {:?}, dropping pending press on {:?}",
                            event.device, event.source, event.target, previous.target
                        );
                    }
                }
                self.pending.insert(
                    key,
                    PendingClick {
                        target: event.target,
                        pressed_at: event.timestamp,
                    },
                );
                vec![event]
            }
            ClickPhase::Up => match self.pending.remove(&key) {
                None => {
                    debug!(
                        "Dropping Up from {} {} without a preceding Down",
                        event.device, event.source
                    );
                    Vec::new()
                }
                Some(pending) if pending.target == event.target => {
                    let held = event.timestamp - pending.pressed_at;
                    debug!(
                        "Click on {:?} from {} {} after {}ms",
                        event.target,
                        event.device,
                        event.source,
                        held.num_milliseconds()
                    );
                    let clicked = ButtonEvent {
                        phase: ClickPhase::Clicked,
                        ..event.clone()
                    };
                    vec![event, clicked]
                }
                Some(pending) => {
                    debug!(
                        "{} {} released on {:?} after pressing {:?}, no click",
                        event.device, event.source, event.target, pending.target
                    );
                    vec![event]
                }
            },
            ClickPhase::Clicked => {
                warn!(
                    "Ignoring Clicked from transport ({} {}); clicks are synthesized",
                    event.device, event.source
                );
                Vec::new()
            }
        }
    }

    /// Target of the pending press for a source, if any.
    pub fn pending_target(&self, device: DeviceId, source: SourceId) -> Option<Option<NodeId>> {
        self.pending.get(&(device, source)).map(|pending| pending.target)
    }

    pub fn clear(&mut self) {
        self.pending.clear();
    }
}
