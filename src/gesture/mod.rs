//! Touch gesture recognition
//!
//! 1. [`touch`] - raw pointer samples and the set of fingers down
//! 2. [`tap`], [`scale`], [`rotate`] - independent detectors
//! 3. [`recognizer`] - fans samples out to the detectors and merges their output
//!
//! Tap synthesis happens here, before any hit-testing. Clicks the router
//! synthesizes from controller buttons are a separate mechanism.

pub mod event;
pub mod recognizer;
pub mod rotate;
pub mod scale;
pub mod tap;
pub mod touch;

pub use event::{GestureEvent, GesturePhase};
pub use recognizer::{GestureRecognizer, GestureSettings, GestureState};
pub use touch::{PointerId, TouchPhase, TouchSample, TouchSet};

/// Shortest press, in milliseconds, that still counts as a tap.
pub const DEFAULT_MIN_TAP_DURATION_MS: u64 = 50;
