//! Normalized gesture output.

use chrono::{DateTime, Local};
use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::touch::{PointerId, TouchPhase};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GesturePhase {
    Begin,
    Update,
    End,
}

#[derive(Debug, Clone, PartialEq)]
pub enum GestureEvent {
    /// Raw finger change, passed through in order.
    Touch {
        action: TouchPhase,
        pointer: PointerId,
        position: Vec2,
        timestamp: DateTime<Local>,
    },
    /// Synthesized when a session ends as a tap.
    Clicked {
        pointer: PointerId,
        position: Vec2,
        timestamp: DateTime<Local>,
    },
    /// Single-finger drag, translation measured from the touch origin.
    Drag {
        phase: GesturePhase,
        pointer: PointerId,
        translation: Vec2,
    },
    /// Span multiplier, 1.0 at Begin.
    Scale { phase: GesturePhase, factor: f32 },
    /// Radians turned since Begin.
    Rotate { phase: GesturePhase, radians: f32 },
}

impl GestureEvent {
    pub fn is_clicked(&self) -> bool {
        matches!(self, GestureEvent::Clicked { .. })
    }

    pub fn phase(&self) -> Option<GesturePhase> {
        match self {
            GestureEvent::Drag { phase, .. }
            | GestureEvent::Scale { phase, .. }
            | GestureEvent::Rotate { phase, .. } => Some(*phase),
            _ => None,
        }
    }
}
