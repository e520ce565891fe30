//! Tap and drag detection for one touch session.

use chrono::{DateTime, Local};
use glam::Vec2;
use tracing::debug;

use super::event::{GestureEvent, GesturePhase};
use super::touch::{PointerId, Touch, TouchSet};

/// What the session looked like so far, used to classify it on release.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TapCandidate {
    pub started_at: DateTime<Local>,
    /// Largest distance any finger moved from where it went down.
    pub max_travel: f32,
    pub dragged: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum DragState {
    Idle,
    Dragging { pointer: PointerId, translation: Vec2 },
}

#[derive(Debug, Clone)]
pub struct TapDetector {
    slop: f32,
    candidate: Option<TapCandidate>,
    drag: DragState,
}

impl TapDetector {
    pub fn new(slop: f32) -> Self {
        Self {
            slop,
            candidate: None,
            drag: DragState::Idle,
        }
    }

    pub fn begin(&mut self, started_at: DateTime<Local>) {
        self.candidate = Some(TapCandidate {
            started_at,
            max_travel: 0.0,
            dragged: false,
        });
        self.drag = DragState::Idle;
    }

    pub fn candidate(&self) -> Option<&TapCandidate> {
        self.candidate.as_ref()
    }

    pub fn is_dragging(&self, pointer: PointerId) -> bool {
        matches!(self.drag, DragState::Dragging { pointer: p, .. } if p == pointer)
    }

    /// Records movement of `touch`. Drags only start with exactly one finger
    /// down and no multi-finger gesture running.
    pub fn track(&mut self, touch: &Touch, touches: &TouchSet, gesture_active: bool) -> Option<GestureEvent> {
        let candidate = self.candidate.as_mut()?;
        candidate.max_travel = candidate.max_travel.max(touch.travel());

        match self.drag {
            DragState::Dragging { pointer, .. } if pointer == touch.pointer => {
                let translation = touch.translation();
                self.drag = DragState::Dragging { pointer, translation };
                Some(GestureEvent::Drag {
                    phase: GesturePhase::Update,
                    pointer,
                    translation,
                })
            }
            DragState::Idle if touches.len() == 1 && !gesture_active && touch.travel() > self.slop => {
                debug!("Drag began on {}", touch.pointer);
                candidate.dragged = true;
                let translation = touch.translation();
                self.drag = DragState::Dragging {
                    pointer: touch.pointer,
                    translation,
                };
                Some(GestureEvent::Drag {
                    phase: GesturePhase::Begin,
                    pointer: touch.pointer,
                    translation,
                })
            }
            _ => None,
        }
    }

    /// Counts the distance from a finger's origin to where it lifted.
    pub fn record_release(&mut self, touch: &Touch) {
        if let Some(candidate) = self.candidate.as_mut() {
            candidate.max_travel = candidate.max_travel.max(touch.travel());
        }
    }

    /// Ends a running drag, e.g. when another finger lands.
    pub fn interrupt(&mut self) -> Option<GestureEvent> {
        match std::mem::replace(&mut self.drag, DragState::Idle) {
            DragState::Dragging { pointer, translation } => {
                debug!("Drag ended on {}", pointer);
                Some(GestureEvent::Drag {
                    phase: GesturePhase::End,
                    pointer,
                    translation,
                })
            }
            DragState::Idle => None,
        }
    }

    /// Closes the session. Returns true when it qualifies as a tap.
    pub fn finish(
        &mut self,
        released_at: DateTime<Local>,
        min_duration_ms: u64,
        multi_finger_gesture: bool,
    ) -> bool {
        self.drag = DragState::Idle;
        let Some(candidate) = self.candidate.take() else {
            return false;
        };

        let held_ms = (released_at - candidate.started_at).num_milliseconds();
        let long_enough = held_ms >= 0 && held_ms as u64 >= min_duration_ms;
        let still = candidate.max_travel < self.slop && !candidate.dragged;
        debug!(
            "Touch session ended: held {}ms, travel {:.1}, gesture {}",
            held_ms, candidate.max_travel, multi_finger_gesture
        );
        long_enough && still && !multi_finger_gesture
    }

    pub fn cancel(&mut self) -> Option<GestureEvent> {
        self.candidate = None;
        self.interrupt()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn single(position: Vec2) -> (TouchSet, Touch) {
        let mut touches = TouchSet::new();
        touches.down(PointerId(0), Vec2::ZERO);
        let touch = touches.moved(PointerId(0), position).unwrap();
        (touches, touch)
    }

    #[test]
    fn test_held_time_floor() {
        let start = Local::now();
        let mut tap = TapDetector::new(12.0);

        tap.begin(start);
        assert!(!tap.finish(start + Duration::milliseconds(49), 50, false));

        tap.begin(start);
        assert!(tap.finish(start + Duration::milliseconds(50), 50, false));
    }

    #[test]
    fn test_small_jitter_keeps_tap() {
        let start = Local::now();
        let mut tap = TapDetector::new(12.0);
        tap.begin(start);

        let (touches, touch) = single(Vec2::new(3.0, 4.0));
        assert!(tap.track(&touch, &touches, false).is_none());
        assert!(tap.finish(start + Duration::milliseconds(80), 50, false));
    }

    #[test]
    fn test_drag_suppresses_tap() {
        let start = Local::now();
        let mut tap = TapDetector::new(12.0);
        tap.begin(start);

        let (touches, touch) = single(Vec2::new(30.0, 0.0));
        assert!(matches!(
            tap.track(&touch, &touches, false),
            Some(GestureEvent::Drag { phase: GesturePhase::Begin, .. })
        ));
        assert!(tap.is_dragging(PointerId(0)));
        assert_eq!(
            tap.interrupt(),
            Some(GestureEvent::Drag {
                phase: GesturePhase::End,
                pointer: PointerId(0),
                translation: Vec2::new(30.0, 0.0),
            })
        );
        assert!(!tap.finish(start + Duration::milliseconds(80), 50, false));
    }

    #[test]
    fn test_no_drag_during_multi_finger_gesture() {
        let start = Local::now();
        let mut tap = TapDetector::new(12.0);
        tap.begin(start);

        let (touches, touch) = single(Vec2::new(30.0, 0.0));
        assert!(tap.track(&touch, &touches, true).is_none());
        assert!(!tap.finish(start + Duration::milliseconds(80), 50, false));
    }
}
