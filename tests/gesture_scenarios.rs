use chrono::{DateTime, Duration, Local};
use glam::Vec2;
use openinput::gesture::{
    GestureEvent, GesturePhase, GestureRecognizer, GestureSettings, PointerId, TouchPhase, TouchSample,
    DEFAULT_MIN_TAP_DURATION_MS,
};

fn at(t0: DateTime<Local>, pointer: u32, phase: TouchPhase, x: f32, y: f32, ms: i64) -> TouchSample {
    TouchSample::new(PointerId(pointer), phase, Vec2::new(x, y)).at(t0 + Duration::milliseconds(ms))
}

fn clicks(events: &[GestureEvent]) -> usize {
    events.iter().filter(|e| e.is_clicked()).count()
}

#[test]
fn test_tap_floor_boundary() {
    let t0 = Local::now();
    let mut recognizer = GestureRecognizer::default();
    let floor = DEFAULT_MIN_TAP_DURATION_MS as i64;

    let short = recognizer.process_batch(vec![
        at(t0, 0, TouchPhase::Down, 50.0, 50.0, 0),
        at(t0, 0, TouchPhase::Up, 50.0, 50.0, 10),
    ]);
    let long = recognizer.process_batch(vec![
        at(t0, 0, TouchPhase::Down, 50.0, 50.0, 100),
        at(t0, 0, TouchPhase::Up, 50.0, 50.0, 100 + floor + 10),
    ]);

    assert_eq!(clicks(&short), 0);
    assert_eq!(clicks(&long), 1);
}

#[test]
fn test_fast_pinch_never_taps() {
    let t0 = Local::now();
    let mut recognizer = GestureRecognizer::default();
    let events = recognizer.process_batch(vec![
        at(t0, 0, TouchPhase::Down, 100.0, 100.0, 0),
        at(t0, 1, TouchPhase::Down, 150.0, 100.0, 1),
        at(t0, 1, TouchPhase::Move, 200.0, 100.0, 5),
        at(t0, 1, TouchPhase::Move, 250.0, 100.0, 10),
        at(t0, 1, TouchPhase::Up, 250.0, 100.0, 20),
        at(t0, 0, TouchPhase::Up, 100.0, 100.0, 30),
    ]);

    assert_eq!(clicks(&events), 0);
    let factors: Vec<(GesturePhase, f32)> = events
        .iter()
        .filter_map(|e| match e {
            GestureEvent::Scale { phase, factor } => Some((*phase, *factor)),
            _ => None,
        })
        .collect();
    assert_eq!(factors.first(), Some(&(GesturePhase::Begin, 1.0)));
    assert_eq!(factors.last().map(|f| f.0), Some(GesturePhase::End));
    assert!((factors.last().map(|f| f.1).unwrap_or_default() - 1.5).abs() < 1e-5);
}

#[test]
fn test_release_order() {
    let t0 = Local::now();
    let mut recognizer = GestureRecognizer::default();
    recognizer.process_batch(vec![
        at(t0, 0, TouchPhase::Down, 0.0, 0.0, 0),
        at(t0, 1, TouchPhase::Down, 100.0, 0.0, 5),
        at(t0, 1, TouchPhase::Move, 0.0, 150.0, 20),
    ]);

    let events = recognizer.process(at(t0, 0, TouchPhase::Up, 0.0, 0.0, 40));
    assert!(matches!(events[0], GestureEvent::Scale { phase: GesturePhase::End, .. }));
    assert!(matches!(events[1], GestureEvent::Rotate { phase: GesturePhase::End, .. }));
    assert!(matches!(events[2], GestureEvent::Touch { action: TouchPhase::Up, .. }));
    assert_eq!(events.len(), 3);
}

#[test]
fn test_custom_slop_turns_jitter_into_drag() {
    let t0 = Local::now();
    let mut recognizer = GestureRecognizer::new(GestureSettings {
        tap_slop: 2.0,
        ..GestureSettings::default()
    });
    let events = recognizer.process_batch(vec![
        at(t0, 0, TouchPhase::Down, 0.0, 0.0, 0),
        at(t0, 0, TouchPhase::Move, 5.0, 0.0, 30),
        at(t0, 0, TouchPhase::Up, 5.0, 0.0, 80),
    ]);

    assert_eq!(clicks(&events), 0);
    assert!(events
        .iter()
        .any(|e| matches!(e, GestureEvent::Drag { phase: GesturePhase::Begin, .. })));
}
