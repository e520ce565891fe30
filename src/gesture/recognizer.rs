//! Gesture Recognizer - one touch stream in, one ordered gesture stream out
//!
//! ```text
//!                ┌──► TapDetector    (tap / drag)
//! TouchSample ──►├──► ScaleDetector  (pinch)       ──► merged Vec<GestureEvent>
//!                └──► RotateDetector (twist)
//! ```
//!
//! The scale and rotate detectors run side by side and never look at each
//! other. On a release the output order is: scale/rotate End, drag End, the
//! Touch Up, then Clicked if the session ended as a tap.

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use super::event::GestureEvent;
use super::rotate::RotateDetector;
use super::scale::ScaleDetector;
use super::tap::TapDetector;
use super::touch::{TouchPhase, TouchSample, TouchSet};
use super::DEFAULT_MIN_TAP_DURATION_MS;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GestureSettings {
    /// Touches released sooner than this are jitter, not taps.
    pub min_tap_duration_ms: u64,
    /// Pixels a finger may move before a tap turns into a drag.
    pub tap_slop: f32,
    /// Pixels the two-finger span must change before scaling starts.
    pub scale_slop: f32,
    /// Radians the two-finger line must turn before rotating starts.
    pub rotation_slop: f32,
}

impl Default for GestureSettings {
    fn default() -> Self {
        Self {
            min_tap_duration_ms: DEFAULT_MIN_TAP_DURATION_MS,
            tap_slop: 12.0,
            scale_slop: 16.0,
            rotation_slop: 0.087,
        }
    }
}

/// Where the current touch session stands.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GestureState {
    pub touching: bool,
    pub scaling: bool,
    pub rotating: bool,
}

impl GestureState {
    pub fn is_idle(&self) -> bool {
        !self.touching
    }
}

#[derive(Debug, Clone)]
pub struct GestureRecognizer {
    settings: GestureSettings,
    touches: TouchSet,
    tap: TapDetector,
    scale: ScaleDetector,
    rotate: RotateDetector,
    // Session entered Scaling or Rotating at some point.
    gestured: bool,
}

impl Default for GestureRecognizer {
    fn default() -> Self {
        Self::new(GestureSettings::default())
    }
}

impl GestureRecognizer {
    pub fn new(settings: GestureSettings) -> Self {
        debug!("Creating gesture recognizer with settings: {:?}", settings);
        Self {
            tap: TapDetector::new(settings.tap_slop),
            scale: ScaleDetector::new(settings.scale_slop),
            rotate: RotateDetector::new(settings.rotation_slop),
            touches: TouchSet::new(),
            gestured: false,
            settings,
        }
    }

    pub fn settings(&self) -> &GestureSettings {
        &self.settings
    }

    pub fn state(&self) -> GestureState {
        GestureState {
            touching: !self.touches.is_empty(),
            scaling: self.scale.is_active(),
            rotating: self.rotate.is_active(),
        }
    }

    pub fn process(&mut self, sample: TouchSample) -> Vec<GestureEvent> {
        let mut out = Vec::new();
        match sample.phase {
            TouchPhase::Down => self.on_down(sample, &mut out),
            TouchPhase::Move => self.on_move(sample, &mut out),
            TouchPhase::Up => self.on_up(sample, &mut out),
            TouchPhase::Cancel => self.on_cancel(sample, &mut out),
        }
        out
    }

    pub fn process_batch<I>(&mut self, samples: I) -> Vec<GestureEvent>
    where
        I: IntoIterator<Item = TouchSample>,
    {
        let mut out = Vec::new();
        for sample in samples {
            out.extend(self.process(sample));
        }
        out
    }

    /// Drops the current session without emitting anything.
    pub fn reset(&mut self) {
        self.touches.clear();
        self.tap = TapDetector::new(self.settings.tap_slop);
        self.scale = ScaleDetector::new(self.settings.scale_slop);
        self.rotate = RotateDetector::new(self.settings.rotation_slop);
        self.gestured = false;
    }

    fn touch_event(sample: &TouchSample) -> GestureEvent {
        GestureEvent::Touch {
            action: sample.phase,
            pointer: sample.pointer,
            position: sample.position,
            timestamp: sample.timestamp,
        }
    }

    fn on_down(&mut self, sample: TouchSample, out: &mut Vec<GestureEvent>) {
        let first = self.touches.is_empty();
        if !self.touches.down(sample.pointer, sample.position) {
            trace!("Duplicate down for {}", sample.pointer);
            return;
        }
        if first {
            debug!("Touch session started by {}", sample.pointer);
            self.gestured = false;
            self.tap.begin(sample.timestamp);
        }

        out.push(Self::touch_event(&sample));
        if self.touches.len() > 1 {
            out.extend(self.tap.interrupt());
        }
        out.extend(self.scale.pointers_changed(&self.touches));
        out.extend(self.rotate.pointers_changed(&self.touches));
    }

    fn on_move(&mut self, sample: TouchSample, out: &mut Vec<GestureEvent>) {
        let Some(touch) = self.touches.moved(sample.pointer, sample.position) else {
            trace!("Move for unknown {}", sample.pointer);
            return;
        };

        out.push(Self::touch_event(&sample));
        out.extend(self.scale.update(&self.touches));
        out.extend(self.rotate.update(&self.touches));

        let gesture_active = self.scale.is_active() || self.rotate.is_active();
        if gesture_active {
            self.gestured = true;
            out.extend(self.tap.interrupt());
        }
        out.extend(self.tap.track(&touch, &self.touches, gesture_active));
    }

    fn on_up(&mut self, sample: TouchSample, out: &mut Vec<GestureEvent>) {
        if let Some(lifted) = self.touches.moved(sample.pointer, sample.position) {
            self.tap.record_release(&lifted);
        }
        if self.touches.up(sample.pointer).is_none() {
            trace!("Up for unknown {}", sample.pointer);
            return;
        }

        out.extend(self.scale.pointers_changed(&self.touches));
        out.extend(self.rotate.pointers_changed(&self.touches));
        if self.tap.is_dragging(sample.pointer) {
            out.extend(self.tap.interrupt());
        }
        out.push(Self::touch_event(&sample));

        if self.touches.is_empty() {
            let tapped = self.tap.finish(
                sample.timestamp,
                self.settings.min_tap_duration_ms,
                self.gestured,
            );
            if tapped {
                debug!("Tap on {} at {:?}", sample.pointer, sample.position);
                out.push(GestureEvent::Clicked {
                    pointer: sample.pointer,
                    position: sample.position,
                    timestamp: sample.timestamp,
                });
            }
            self.gestured = false;
        }
    }

    fn on_cancel(&mut self, sample: TouchSample, out: &mut Vec<GestureEvent>) {
        if self.touches.is_empty() {
            return;
        }
        debug!("Touch session cancelled");
        self.touches.clear();
        out.extend(self.scale.finish());
        out.extend(self.rotate.finish());
        out.extend(self.tap.cancel());
        out.push(Self::touch_event(&sample));
        self.gestured = false;
    }
}
