use glam::{Quat, Vec2, Vec3};
use openinput::controller::{ClickListener, ControllerSnapshot, HoverListener, SnapshotTracker};
use openinput::event::{ClickPhase, DeviceId, NodeId, SourceId};
use openinput::{
    ControllerFacade, ControllerSettings, DispatchSettings, ListenerRegistry, LoopbackTransport, PumpHandle,
    SceneNodes,
};
use parking_lot::Mutex;
use std::sync::Arc;

type Clicks = Arc<Mutex<Vec<(SourceId, Option<String>)>>>;

struct Collect(Clicks);

impl ClickListener<String> for Collect {
    fn on_click(&mut self, source: SourceId, target: Option<String>, _position: Option<Vec3>) {
        self.0.lock().push((source, target));
    }
}

#[tokio::test]
async fn test_snapshots_to_click_listener() {
    let transport = Arc::new(LoopbackTransport::new());
    let nodes = Arc::new(SceneNodes::new());
    nodes.insert(NodeId(42), "door".to_string());

    let mut facade =
        ControllerFacade::create(transport.clone(), ListenerRegistry::new(), nodes, ControllerSettings::default())
            .unwrap();
    let clicks: Clicks = Arc::default();
    facade.set_click_listener(Some(Box::new(Collect(clicks.clone())))).unwrap();
    let handle = facade.router().native_handle().unwrap();

    let settings = DispatchSettings::default();
    let (tx, rx) = settings.channel();
    let pump = PumpHandle::spawn(facade, rx, &settings);

    let mut tracker = SnapshotTracker::new();
    tracker.register_device(DeviceId(3));
    let idle = ControllerSnapshot {
        connected: true,
        hit_target: Some(NodeId(42)),
        thumbstick: Vec2::ZERO,
        ..ControllerSnapshot::new(DeviceId(3))
    };
    let mut pressed = idle.clone();
    pressed.buttons.b = true;

    for snapshot in [idle.clone(), pressed, idle] {
        tx.send(tracker.process([snapshot])).await.unwrap();
    }
    drop(tx);

    let stats = pump.join().await.unwrap();
    assert_eq!(*clicks.lock(), vec![(SourceId(2), Some("door".to_string()))]);
    // Status and move are disabled, only Down, Up and Clicked get through.
    assert_eq!(stats.delivered, 3);
    // The facade was dropped with the pump, releasing its native handle.
    assert_eq!(transport.release_count(handle), 1);
}

#[test]
fn test_forward_vector_answered_off_thread() {
    let transport = Arc::new(LoopbackTransport::new());
    let nodes = Arc::new(SceneNodes::<String>::new());
    let facade =
        ControllerFacade::create(transport.clone(), ListenerRegistry::new(), nodes, ControllerSettings::default())
            .unwrap();

    let platform = transport.clone();
    let answer = std::thread::spawn(move || {
        while platform.pending_forward_requests() == 0 {
            std::thread::yield_now();
        }
        platform.answer_forward_requests(Vec3::new(0.0, 0.0, -1.0))
    });

    assert_eq!(facade.forward_vector_blocking().unwrap(), Vec3::NEG_Z);
    assert_eq!(answer.join().unwrap(), 1);
}

#[test]
fn test_click_phases_forwarded_to_state_hook() {
    struct Phases(Arc<Mutex<Vec<ClickPhase>>>);
    impl ClickListener<String> for Phases {
        fn on_click_state(&mut self, _: SourceId, _: Option<String>, phase: ClickPhase, _: Option<Vec3>) {
            self.0.lock().push(phase);
        }
    }

    let transport = Arc::new(LoopbackTransport::new());
    let nodes = Arc::new(SceneNodes::<String>::new());
    let mut facade =
        ControllerFacade::create(transport, ListenerRegistry::new(), nodes, ControllerSettings::default()).unwrap();
    let phases = Arc::new(Mutex::new(Vec::new()));
    facade.set_click_listener(Some(Box::new(Phases(phases.clone())))).unwrap();

    let mut tracker = SnapshotTracker::new();
    tracker.register_device(DeviceId(1));
    let mut snapshot = ControllerSnapshot::new(DeviceId(1));
    tracker.process([snapshot.clone()]);
    snapshot.buttons.trigger_index = true;
    facade.dispatch(tracker.process([snapshot.clone()])).unwrap();
    snapshot.buttons.trigger_index = false;
    facade.dispatch(tracker.process([snapshot])).unwrap();

    assert_eq!(*phases.lock(), vec![ClickPhase::Down, ClickPhase::Up, ClickPhase::Clicked]);
}

type Hovers = Arc<Mutex<Vec<(Option<String>, bool)>>>;

struct CollectHovers(Hovers);

impl HoverListener<String> for CollectHovers {
    fn on_hover(&mut self, _source: SourceId, target: Option<String>, is_hovering: bool, _position: Option<Vec3>) {
        self.0.lock().push((target, is_hovering));
    }
}

#[tokio::test]
async fn test_snapshots_to_hover_listener() {
    let transport = Arc::new(LoopbackTransport::new());
    let nodes = Arc::new(SceneNodes::new());
    nodes.insert(NodeId(1), "lamp".to_string());
    nodes.insert(NodeId(2), "window".to_string());

    let mut facade =
        ControllerFacade::create(transport, ListenerRegistry::new(), nodes, ControllerSettings::default()).unwrap();
    let hovers: Hovers = Arc::default();
    facade.set_hover_listener(Some(Box::new(CollectHovers(hovers.clone())))).unwrap();

    let settings = DispatchSettings::default();
    let (tx, rx) = settings.channel();
    let pump = PumpHandle::spawn(facade, rx, &settings);

    let mut tracker = SnapshotTracker::new();
    tracker.register_device(DeviceId(1));
    let at_lamp = ControllerSnapshot {
        connected: true,
        hit_target: Some(NodeId(1)),
        ..ControllerSnapshot::new(DeviceId(1))
    };
    let mut at_window = at_lamp.clone();
    at_window.rotation = Quat::from_rotation_y(0.5);
    at_window.hit_target = Some(NodeId(2));

    for snapshot in [at_lamp, at_window] {
        tx.send(tracker.process([snapshot])).await.unwrap();
    }
    drop(tx);

    pump.join().await.unwrap();
    assert_eq!(
        *hovers.lock(),
        vec![
            (Some("lamp".to_string()), true),
            (Some("lamp".to_string()), false),
            (Some("window".to_string()), true),
        ]
    );
}
