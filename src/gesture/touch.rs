//! Raw touch model.

use chrono::{DateTime, Local};
use glam::Vec2;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PointerId(pub u32);

impl fmt::Display for PointerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "pointer#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TouchPhase {
    Down,
    Move,
    Up,
    /// The platform aborted the whole touch session.
    Cancel,
}

/// One pointer change reported by the platform.
#[derive(Debug, Clone, PartialEq)]
pub struct TouchSample {
    pub pointer: PointerId,
    pub phase: TouchPhase,
    /// Screen position in pixels.
    pub position: Vec2,
    pub timestamp: DateTime<Local>,
}

impl TouchSample {
    pub fn new(pointer: PointerId, phase: TouchPhase, position: Vec2) -> Self {
        Self {
            pointer,
            phase,
            position,
            timestamp: Local::now(),
        }
    }

    pub fn at(mut self, timestamp: DateTime<Local>) -> Self {
        self.timestamp = timestamp;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Touch {
    pub pointer: PointerId,
    pub origin: Vec2,
    pub position: Vec2,
}

impl Touch {
    /// Distance from where the finger went down.
    pub fn travel(&self) -> f32 {
        self.origin.distance(self.position)
    }

    pub fn translation(&self) -> Vec2 {
        self.position - self.origin
    }
}

/// Fingers currently down, in the order they touched.
#[derive(Debug, Clone, Default)]
pub struct TouchSet {
    touches: Vec<Touch>,
}

impl TouchSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns false if the pointer was already down.
    pub fn down(&mut self, pointer: PointerId, position: Vec2) -> bool {
        if self.get(pointer).is_some() {
            return false;
        }
        self.touches.push(Touch {
            pointer,
            origin: position,
            position,
        });
        true
    }

    pub fn moved(&mut self, pointer: PointerId, position: Vec2) -> Option<Touch> {
        let touch = self.touches.iter_mut().find(|t| t.pointer == pointer)?;
        touch.position = position;
        Some(*touch)
    }

    pub fn up(&mut self, pointer: PointerId) -> Option<Touch> {
        let index = self.touches.iter().position(|t| t.pointer == pointer)?;
        Some(self.touches.remove(index))
    }

    pub fn get(&self, pointer: PointerId) -> Option<&Touch> {
        self.touches.iter().find(|t| t.pointer == pointer)
    }

    pub fn primary(&self) -> Option<&Touch> {
        self.touches.first()
    }

    /// Positions of the first two fingers.
    pub fn pair(&self) -> Option<(Vec2, Vec2)> {
        match self.touches.as_slice() {
            [a, b, ..] => Some((a.position, b.position)),
            _ => None,
        }
    }

    pub fn len(&self) -> usize {
        self.touches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.touches.is_empty()
    }

    pub fn clear(&mut self) {
        self.touches.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = &Touch> {
        self.touches.iter()
    }
}
