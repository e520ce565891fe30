//! Two-finger rotation detector.
//!
//! Tracks the angle of the line between the first two fingers. Per-move deltas
//! are wrapped into `(-PI, PI]` before accumulating, so turning past the
//! atan2 seam does not produce a jump.

use glam::Vec2;
use std::f32::consts::{PI, TAU};
use tracing::debug;

use super::event::{GestureEvent, GesturePhase};
use super::touch::TouchSet;

#[derive(Debug, Clone, Copy, PartialEq)]
enum RotateState {
    Idle,
    Armed { last_angle: f32, accumulated: f32 },
    Active { last_angle: f32, total: f32 },
}

#[derive(Debug, Clone)]
pub struct RotateDetector {
    slop: f32,
    state: RotateState,
}

fn angle_of(a: Vec2, b: Vec2) -> f32 {
    let d = b - a;
    d.y.atan2(d.x)
}

fn wrap(delta: f32) -> f32 {
    let wrapped = (delta + PI).rem_euclid(TAU) - PI;
    if wrapped <= -PI {
        wrapped + TAU
    } else {
        wrapped
    }
}

impl RotateDetector {
    pub fn new(slop: f32) -> Self {
        Self {
            slop,
            state: RotateState::Idle,
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self.state, RotateState::Active { .. })
    }

    pub fn pointers_changed(&mut self, touches: &TouchSet) -> Option<GestureEvent> {
        let Some((a, b)) = touches.pair() else {
            return self.finish();
        };
        let angle = angle_of(a, b);
        self.state = match self.state {
            RotateState::Idle | RotateState::Armed { .. } => RotateState::Armed {
                last_angle: angle,
                accumulated: 0.0,
            },
            RotateState::Active { total, .. } => RotateState::Active {
                last_angle: angle,
                total,
            },
        };
        None
    }

    pub fn update(&mut self, touches: &TouchSet) -> Option<GestureEvent> {
        let (a, b) = touches.pair()?;
        let angle = angle_of(a, b);
        match self.state {
            RotateState::Idle => None,
            RotateState::Armed { last_angle, accumulated } => {
                let accumulated = accumulated + wrap(angle - last_angle);
                if accumulated.abs() <= self.slop {
                    self.state = RotateState::Armed {
                        last_angle: angle,
                        accumulated,
                    };
                    return None;
                }
                debug!("Rotation began after {:.3} rad", accumulated);
                self.state = RotateState::Active {
                    last_angle: angle,
                    total: 0.0,
                };
                Some(GestureEvent::Rotate {
                    phase: GesturePhase::Begin,
                    radians: 0.0,
                })
            }
            RotateState::Active { last_angle, total } => {
                let total = total + wrap(angle - last_angle);
                self.state = RotateState::Active {
                    last_angle: angle,
                    total,
                };
                Some(GestureEvent::Rotate {
                    phase: GesturePhase::Update,
                    radians: total,
                })
            }
        }
    }

    pub fn finish(&mut self) -> Option<GestureEvent> {
        match std::mem::replace(&mut self.state, RotateState::Idle) {
            RotateState::Active { total, .. } => {
                debug!("Rotation ended at {:.3} rad", total);
                Some(GestureEvent::Rotate {
                    phase: GesturePhase::End,
                    radians: total,
                })
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gesture::touch::PointerId;

    fn at_angle(radians: f32) -> Vec2 {
        Vec2::new(radians.cos(), radians.sin()) * 100.0
    }

    #[test]
    fn test_wrap_across_seam() {
        assert!((wrap(PI - (-PI + 0.1)) - (-0.1)).abs() < 1e-5);
        assert!((wrap(0.2) - 0.2).abs() < 1e-6);
        assert!((wrap(-TAU + 0.3) - 0.3).abs() < 1e-5);
    }

    #[test]
    fn test_accumulates_since_begin() {
        let mut touches = TouchSet::new();
        let mut detector = RotateDetector::new(0.087);
        touches.down(PointerId(0), Vec2::ZERO);
        touches.down(PointerId(1), at_angle(0.0));
        detector.pointers_changed(&touches);

        touches.moved(PointerId(1), at_angle(0.05));
        assert!(detector.update(&touches).is_none());

        touches.moved(PointerId(1), at_angle(0.1));
        assert_eq!(
            detector.update(&touches),
            Some(GestureEvent::Rotate { phase: GesturePhase::Begin, radians: 0.0 })
        );

        touches.moved(PointerId(1), at_angle(0.6));
        let Some(GestureEvent::Rotate { phase, radians }) = detector.update(&touches) else {
            panic!("expected rotate update");
        };
        assert_eq!(phase, GesturePhase::Update);
        assert!((radians - 0.5).abs() < 1e-4);

        touches.up(PointerId(0));
        assert!(matches!(
            detector.pointers_changed(&touches),
            Some(GestureEvent::Rotate { phase: GesturePhase::End, .. })
        ));
    }
}
