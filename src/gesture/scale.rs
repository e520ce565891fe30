//! Two-finger scale detector.
//!
//! Arms when a second finger lands and starts once the span between the first
//! two fingers has changed by more than the slop. The factor is relative to the
//! span at Begin.

use tracing::debug;

use super::event::{GestureEvent, GesturePhase};
use super::touch::TouchSet;

#[derive(Debug, Clone, Copy, PartialEq)]
enum ScaleState {
    Idle,
    Armed { start_span: f32 },
    Active { begin_span: f32, factor: f32 },
}

#[derive(Debug, Clone)]
pub struct ScaleDetector {
    slop: f32,
    state: ScaleState,
}

impl ScaleDetector {
    pub fn new(slop: f32) -> Self {
        Self {
            slop,
            state: ScaleState::Idle,
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self.state, ScaleState::Active { .. })
    }

    /// Called after a finger went down or up.
    pub fn pointers_changed(&mut self, touches: &TouchSet) -> Option<GestureEvent> {
        let Some((a, b)) = touches.pair() else {
            return self.finish();
        };
        let span = a.distance(b);
        match self.state {
            ScaleState::Idle => {
                self.state = ScaleState::Armed { start_span: span };
                None
            }
            ScaleState::Armed { .. } => {
                self.state = ScaleState::Armed { start_span: span };
                None
            }
            // Re-base so the factor stays continuous across a finger swap.
            ScaleState::Active { factor, .. } => {
                if span > f32::EPSILON {
                    self.state = ScaleState::Active {
                        begin_span: span / factor,
                        factor,
                    };
                }
                None
            }
        }
    }

    /// Called after a finger moved.
    pub fn update(&mut self, touches: &TouchSet) -> Option<GestureEvent> {
        let (a, b) = touches.pair()?;
        let span = a.distance(b);
        match self.state {
            ScaleState::Idle => None,
            ScaleState::Armed { start_span } => {
                if (span - start_span).abs() <= self.slop || span <= f32::EPSILON {
                    return None;
                }
                debug!("Scale began at span {:.1}", span);
                self.state = ScaleState::Active {
                    begin_span: span,
                    factor: 1.0,
                };
                Some(GestureEvent::Scale {
                    phase: GesturePhase::Begin,
                    factor: 1.0,
                })
            }
            ScaleState::Active { begin_span, .. } => {
                let factor = span / begin_span;
                self.state = ScaleState::Active { begin_span, factor };
                Some(GestureEvent::Scale {
                    phase: GesturePhase::Update,
                    factor,
                })
            }
        }
    }

    pub fn finish(&mut self) -> Option<GestureEvent> {
        let previous = std::mem::replace(&mut self.state, ScaleState::Idle);
        match previous {
            ScaleState::Active { factor, .. } => {
                debug!("Scale ended at factor {:.3}", factor);
                Some(GestureEvent::Scale {
                    phase: GesturePhase::End,
                    factor,
                })
            }
            _ => None,
        }
    }
}
