use color_eyre::{eyre::eyre, Result};
use glam::{Vec2, Vec3};
use openinput::event::{NodeId, SourceId};
use openinput::gesture::{GestureEvent, PointerId, TouchPhase, TouchSample};
use openinput::{
    ClickListener, ControllerFacade, GestureRecognizer, HoverListener, InputConfig, ListenerRegistry,
    LoopbackTransport, PumpHandle, SceneNodes,
};
use std::sync::Arc;
use tracing::{debug, info, Level};
use tracing_subscriber::FmtSubscriber;

#[cfg(not(feature = "gamepad"))]
use glam::Quat;
#[cfg(not(feature = "gamepad"))]
use openinput::controller::{ControllerSnapshot, SnapshotTracker};
#[cfg(not(feature = "gamepad"))]
use openinput::event::DeviceId;

struct LogClicks;

impl ClickListener<&'static str> for LogClicks {
    fn on_click(&mut self, source: SourceId, target: Option<&'static str>, position: Option<Vec3>) {
        info!("Clicked {:?} with {} at {:?}", target, source, position);
    }
}

struct LogHovers;

impl HoverListener<&'static str> for LogHovers {
    fn on_hover(&mut self, source: SourceId, target: Option<&'static str>, is_hovering: bool, _position: Option<Vec3>) {
        info!("Hover {:?} by {}: {}", target, source, is_hovering);
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    setup()?;

    let config = InputConfig::load_or_default().await;
    debug!("Running with config: {:?}", config);

    let transport = Arc::new(LoopbackTransport::with_forward_vector(Vec3::NEG_Z));
    let nodes = Arc::new(SceneNodes::new());
    nodes.insert(NodeId(42), "start-button");
    nodes.insert(NodeId(7), "settings-panel");

    let mut facade = ControllerFacade::create(
        transport,
        ListenerRegistry::new(),
        nodes,
        config.controller.clone(),
    )
    .map_err(|e| eyre!("Failed to create controller facade: {}", e))?;
    facade.set_click_listener(Some(Box::new(LogClicks)))?;
    facade.set_hover_listener(Some(Box::new(LogHovers)))?;

    let forward = facade.forward_vector().await?;
    info!("Controller forward vector: {}", forward);

    let (batch_sender, batch_receiver) = config.dispatch.channel();
    let pump = PumpHandle::spawn(facade, batch_receiver, &config.dispatch);

    #[cfg(feature = "gamepad")]
    {
        use openinput::controller::gamepad::GamepadHandle;

        let cancel = pump.cancel_token();
        let gamepad = GamepadHandle::spawn(None, batch_sender.clone(), cancel.child_token())
            .map_err(|e| eyre!("Failed to spawn gamepad collector: {}", e))?;
        info!("Collecting gamepad input, press Ctrl-C to stop");
        tokio::signal::ctrl_c().await?;
        gamepad.shutdown().await;
    }

    #[cfg(not(feature = "gamepad"))]
    {
        let mut tracker = SnapshotTracker::new();
        tracker.register_device(DeviceId(1));
        for snapshot in scripted_snapshots() {
            let batch = tracker.process([snapshot]);
            if !batch.is_empty() {
                batch_sender.send(batch).await?;
            }
        }
    }

    drop(batch_sender);
    let stats = pump.join().await?;
    info!(
        "Dispatch finished: {} cycles, {} events, {} delivered",
        stats.cycles, stats.events, stats.delivered
    );

    let mut recognizer = GestureRecognizer::new(config.gesture.clone());
    for event in recognizer.process_batch(scripted_touches()) {
        match event {
            GestureEvent::Touch { .. } => debug!("{:?}", event),
            other => info!("Gesture: {:?}", other),
        }
    }

    Ok(())
}

fn setup() -> Result<()> {
    if std::env::var("RUST_LIB_BACKTRACE").is_err() {
        std::env::set_var("RUST_LIB_BACKTRACE", "0")
    }
    color_eyre::install()?;
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "info")
    }
    setup_logging_env();
    Ok(())
}

fn setup_logging_env() {
    FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .pretty()
        .init();
}

// A controller that connects, points at node 42, presses A, then turns to node 7.
#[cfg(not(feature = "gamepad"))]
fn scripted_snapshots() -> Vec<ControllerSnapshot> {
    let idle = ControllerSnapshot {
        connected: true,
        six_dof: true,
        battery_percent: 87,
        position: Vec3::new(0.2, 1.1, -0.3),
        rotation: Quat::from_rotation_y(0.1),
        hit_target: Some(NodeId(42)),
        hit_position: Some(Vec3::new(0.0, 1.0, -2.0)),
        ..ControllerSnapshot::new(DeviceId(1))
    };
    let mut pressed = idle.clone();
    pressed.buttons.a = true;
    pressed.index_trigger = 0.4;

    let mut turned = idle.clone();
    turned.rotation = Quat::from_rotation_y(0.4);
    turned.hit_target = Some(NodeId(7));
    turned.hit_position = Some(Vec3::new(0.0, 1.2, -2.0));

    vec![idle.clone(), pressed, idle, turned]
}

// A quick tap followed by a pinch.
fn scripted_touches() -> Vec<TouchSample> {
    let t0 = chrono::Local::now();
    let at = |ms: i64| t0 + chrono::Duration::milliseconds(ms);
    let touch = |pointer: u32, phase: TouchPhase, x: f32, y: f32, ms: i64| {
        TouchSample::new(PointerId(pointer), phase, Vec2::new(x, y)).at(at(ms))
    };

    vec![
        touch(0, TouchPhase::Down, 200.0, 300.0, 0),
        touch(0, TouchPhase::Up, 201.0, 300.0, 90),
        touch(0, TouchPhase::Down, 100.0, 100.0, 400),
        touch(1, TouchPhase::Down, 200.0, 100.0, 405),
        touch(1, TouchPhase::Move, 240.0, 100.0, 420),
        touch(1, TouchPhase::Move, 300.0, 100.0, 440),
        touch(1, TouchPhase::Up, 300.0, 100.0, 460),
        touch(0, TouchPhase::Up, 100.0, 100.0, 470),
    ]
}
