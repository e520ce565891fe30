//! Gamepad collector (feature `gamepad`)
//!
//! Polls gilrs, folds its events into a [`ControllerSnapshot`] for the active
//! gamepad and forwards the diffed raw batches to the dispatch channel.
//!
//! ```text
//! gilrs ──► GamepadCollector ──► SnapshotTracker ──[Vec<InputEvent>]──► DispatchPump
//! ```

use chrono::Local;
use gilrs::{Axis, Button, Event, EventType, Gamepad, GamepadId, Gilrs, PowerInfo};
use statum::{machine, state};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::snapshot::{ButtonStates, ControllerSnapshot, InputSource, SnapshotTracker};
use crate::event::{DeviceId, InputEvent};

// Collector settings
#[derive(Clone, Debug)]
pub struct GamepadSettings {
    pub device: DeviceId,
    pub thumbstick_deadzone: f32,
}

impl Default for GamepadSettings {
    fn default() -> Self {
        Self {
            device: DeviceId(1),
            thumbstick_deadzone: 0.05,
        }
    }
}

// Collector errors
#[derive(Debug, thiserror::Error)]
pub enum CollectorError {
    #[error("Failed to initialize gamepad input: {0}")]
    InitializationError(String),

    #[error("Failed to send batch: {0}")]
    BatchSendError(String),
}

#[state]
#[derive(Debug, Clone)]
pub enum CollectorState {
    Initializing,
    Collecting,
}

#[machine]
#[derive(Debug)]
pub struct GamepadCollector<S: CollectorState> {
    gilrs: Gilrs,
    active_gamepad: Option<GamepadId>,
    settings: GamepadSettings,
    snapshot: ControllerSnapshot,
    tracker: SnapshotTracker,
    batch_sender: mpsc::Sender<Vec<InputEvent>>,
}

impl<S: CollectorState> GamepadCollector<S> {
    pub fn settings(&self) -> &GamepadSettings {
        &self.settings
    }

    pub fn snapshot(&self) -> &ControllerSnapshot {
        &self.snapshot
    }
}

impl GamepadCollector<Initializing> {
    pub fn create(
        settings: Option<GamepadSettings>,
        batch_sender: mpsc::Sender<Vec<InputEvent>>,
    ) -> Result<Self, CollectorError> {
        let settings = settings.unwrap_or_default();
        debug!("Creating gamepad collector with settings: {:?}", settings);

        let gilrs = match Gilrs::new() {
            Ok(g) => {
                info!("Successfully initialized gilrs");
                g
            }
            Err(e) => {
                error!("Failed to initialize gilrs: {}", e);
                return Err(CollectorError::InitializationError(e.to_string()));
            }
        };

        let mut tracker = SnapshotTracker::new();
        tracker.register_device(settings.device);
        let snapshot = ControllerSnapshot::new(settings.device);

        Ok(Self::new(gilrs, None, settings, snapshot, tracker, batch_sender))
    }

    /// Picks the first connected gamepad and moves to collecting.
    pub fn initialize(mut self) -> GamepadCollector<Collecting> {
        let gamepads: Vec<(GamepadId, Gamepad<'_>)> = self.gilrs.gamepads().collect();

        match gamepads.first() {
            None => warn!("No gamepad connected, waiting for one"),
            Some((id, gamepad)) => {
                info!("Found {} gamepads, selected {} ({})", gamepads.len(), gamepad.name(), id);
                self.active_gamepad = Some(*id);
                self.snapshot.connected = true;
                self.snapshot.battery_percent = battery_percent(gamepad.power_info());
            }
        }

        info!("Gamepad collector initialized, transitioning to Collecting state");
        self.transition()
    }
}

impl GamepadCollector<Collecting> {
    /// Drains pending gilrs events and forwards the resulting batch.
    /// Returns the number of raw events sent.
    pub fn collect_pending(&mut self) -> Result<usize, CollectorError> {
        let mut changed = false;
        while let Some(Event { id, event, .. }) = self.gilrs.next_event() {
            match self.active_gamepad {
                Some(active) if active != id => {
                    debug!("Skipping event from non-active gamepad: {:?}", id);
                    continue;
                }
                None => {
                    info!("Adopting gamepad {} as active", id);
                    self.active_gamepad = Some(id);
                }
                _ => {}
            }

            if let EventType::Connected = event {
                self.snapshot.battery_percent = battery_percent(self.gilrs.gamepad(id).power_info());
            }
            changed |= fold_event(&mut self.snapshot, event, self.settings.thumbstick_deadzone);
        }

        if !changed {
            return Ok(0);
        }

        let batch = self.tracker.process([self.snapshot.clone()]);
        let count = batch.len();
        if count > 0 {
            self.batch_sender
                .try_send(batch)
                .map_err(|e| CollectorError::BatchSendError(e.to_string()))?;
        }
        Ok(count)
    }

    pub fn run_collection_loop(&mut self, cancel: CancellationToken) {
        info!("Starting gamepad collection loop");

        let mut event_count = 0usize;
        let mut last_log_time = Local::now();
        let log_interval = chrono::Duration::seconds(10);

        while !cancel.is_cancelled() {
            match self.collect_pending() {
                Ok(sent) => event_count += sent,
                Err(e) => error!("Error collecting gamepad input: {}", e),
            }

            let now = Local::now();
            if now - last_log_time > log_interval {
                info!(
                    "Gamepad collector stats: {} events in last {} seconds",
                    event_count,
                    log_interval.num_seconds()
                );
                event_count = 0;
                last_log_time = now;
            }

            std::thread::sleep(std::time::Duration::from_millis(1));
        }
        info!("Gamepad collection loop stopped");
    }
}

pub struct GamepadHandle {
    task: tokio::task::JoinHandle<()>,
    cancel: CancellationToken,
}

impl GamepadHandle {
    /// Starts the collector on a blocking task. Must be called inside a tokio runtime.
    pub fn spawn(
        settings: Option<GamepadSettings>,
        batch_sender: mpsc::Sender<Vec<InputEvent>>,
        cancel: CancellationToken,
    ) -> Result<Self, CollectorError> {
        let collector = GamepadCollector::create(settings, batch_sender)?;
        let stop = cancel.clone();
        let task = tokio::task::spawn_blocking(move || {
            let mut collecting = collector.initialize();
            collecting.run_collection_loop(stop);
        });
        info!("Gamepad collector started");
        Ok(Self { task, cancel })
    }

    pub async fn shutdown(self) {
        self.cancel.cancel();
        if let Err(e) = self.task.await {
            error!("Gamepad collector task failed: {}", e);
        }
    }
}

/// Applies one gilrs event to the snapshot. Returns whether anything changed.
fn fold_event(snapshot: &mut ControllerSnapshot, event: EventType, deadzone: f32) -> bool {
    match event {
        EventType::ButtonPressed(button, _) => {
            map_button(button).is_some_and(|source| set_pressed(&mut snapshot.buttons, source, true))
        }
        EventType::ButtonReleased(button, _) => {
            map_button(button).is_some_and(|source| set_pressed(&mut snapshot.buttons, source, false))
        }
        EventType::ButtonChanged(Button::RightTrigger2, value, _) => {
            replace(&mut snapshot.index_trigger, value)
        }
        EventType::ButtonChanged(Button::LeftTrigger2, value, _) => {
            replace(&mut snapshot.hand_trigger, value)
        }
        EventType::AxisChanged(Axis::LeftStickX, value, _) => {
            replace(&mut snapshot.thumbstick.x, apply_deadzone(value, deadzone))
        }
        EventType::AxisChanged(Axis::LeftStickY, value, _) => {
            replace(&mut snapshot.thumbstick.y, apply_deadzone(value, deadzone))
        }
        EventType::Connected => {
            info!("Gamepad connected");
            !std::mem::replace(&mut snapshot.connected, true)
        }
        EventType::Disconnected => {
            warn!("Gamepad disconnected");
            snapshot.buttons = ButtonStates::default();
            std::mem::replace(&mut snapshot.connected, false)
        }
        _ => false,
    }
}

fn replace(slot: &mut f32, value: f32) -> bool {
    let changed = *slot != value;
    *slot = value;
    changed
}

fn set_pressed(buttons: &mut ButtonStates, source: InputSource, pressed: bool) -> bool {
    let slot = match source {
        InputSource::ButtonA => &mut buttons.a,
        InputSource::ButtonB => &mut buttons.b,
        InputSource::TriggerIndex => &mut buttons.trigger_index,
        InputSource::TriggerHand => &mut buttons.trigger_hand,
        InputSource::Thumbstick => &mut buttons.thumbstick,
        InputSource::None => return false,
    };
    std::mem::replace(slot, pressed) != pressed
}

// Helper function to map gilrs Button to an input source
fn map_button(button: Button) -> Option<InputSource> {
    match button {
        Button::South => Some(InputSource::ButtonA),
        Button::East => Some(InputSource::ButtonB),
        Button::RightTrigger2 => Some(InputSource::TriggerIndex),
        Button::LeftTrigger2 => Some(InputSource::TriggerHand),
        Button::LeftThumb => Some(InputSource::Thumbstick),
        _ => None,
    }
}

fn battery_percent(power: PowerInfo) -> u8 {
    match power {
        PowerInfo::Discharging(level) | PowerInfo::Charging(level) => level.min(100),
        PowerInfo::Charged | PowerInfo::Wired => 100,
        PowerInfo::Unknown => 0,
    }
}

// Rescales values outside the deadzone back to the full range
fn apply_deadzone(value: f32, deadzone: f32) -> f32 {
    if value.abs() < deadzone {
        0.0
    } else {
        let sign = if value < 0.0 { -1.0 } else { 1.0 };
        sign * (value.abs() - deadzone) / (1.0 - deadzone)
    }
}
