//! Dispatch pump state machine.

use chrono::Local;
use statum::{machine, state};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace};

use super::{BatchReceiver, DispatchSettings, Dispatcher, PumpError};
use crate::event::InputEvent;

/// Events drained in one cycle, in arrival order.
#[derive(Debug, Clone, Default)]
pub struct EventBatch {
    pub events: Vec<InputEvent>,
    /// Channel messages merged into this batch.
    pub messages: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PumpStats {
    pub cycles: u64,
    pub messages: u64,
    pub events: u64,
    pub delivered: u64,
}

#[state]
#[derive(Debug, Clone)]
pub enum PumpState {
    Waiting,
    Dispatching(EventBatch),
}

#[machine]
#[derive(Debug)]
pub struct DispatchPump<S: PumpState> {
    dispatcher: Box<dyn Dispatcher>,
    batch_receiver: BatchReceiver,
    cancel: CancellationToken,
    stats: PumpStats,
}

impl<S: PumpState> DispatchPump<S> {
    pub fn stats(&self) -> PumpStats {
        self.stats
    }

    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }
}

impl DispatchPump<Waiting> {
    pub fn create<D>(dispatcher: D, batch_receiver: BatchReceiver, cancel: CancellationToken) -> Self
    where
        D: Dispatcher + 'static,
    {
        debug!("Creating dispatch pump for {:?}", dispatcher);
        Self::new(Box::new(dispatcher), batch_receiver, cancel, PumpStats::default())
    }

    /// Waits for the next batch, then drains whatever else is already queued.
    /// Nothing is coalesced or dropped.
    pub async fn wait_for_batch(mut self) -> Result<DispatchPump<Dispatching>, PumpError> {
        let first = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return Err(PumpError::Cancelled),
            batch = self.batch_receiver.recv() => batch.ok_or(PumpError::ChannelClosed)?,
        };

        let mut batch = EventBatch {
            events: first,
            messages: 1,
        };
        loop {
            match self.batch_receiver.try_recv() {
                Ok(more) => {
                    batch.events.extend(more);
                    batch.messages += 1;
                }
                Err(mpsc::error::TryRecvError::Empty) => break,
                // Dispatch what we have, closure shows up on the next wait.
                Err(mpsc::error::TryRecvError::Disconnected) => break,
            }
        }

        trace!(
            "Collected {} events from {} messages",
            batch.events.len(),
            batch.messages
        );
        Ok(self.transition_with(batch))
    }
}

impl DispatchPump<Dispatching> {
    pub fn dispatch(mut self) -> Result<DispatchPump<Waiting>, PumpError> {
        let batch = self.get_state_data_mut().map(std::mem::take).unwrap_or_default();

        self.stats.cycles += 1;
        self.stats.messages += batch.messages as u64;
        self.stats.events += batch.events.len() as u64;

        let delivered = self.dispatcher.dispatch_batch(batch.events)?;
        self.stats.delivered += delivered as u64;
        trace!("Delivered {} events", delivered);

        Ok(self.transition())
    }
}

/// Runs the pump until it is cancelled or every sender is gone.
pub async fn run_pump_loop(
    mut pump: DispatchPump<Waiting>,
    stats_interval_secs: i64,
) -> Result<PumpStats, PumpError> {
    info!("Starting dispatch loop");

    let stats_interval = chrono::Duration::seconds(stats_interval_secs.max(1));
    let mut last_stats_time = Local::now();
    let mut last_stats = PumpStats::default();

    loop {
        let stats = pump.stats();
        let dispatching = match pump.wait_for_batch().await {
            Ok(dispatching) => dispatching,
            Err(PumpError::Cancelled) => {
                info!("Dispatch loop cancelled");
                return Ok(stats);
            }
            Err(PumpError::ChannelClosed) => {
                info!("All batch senders dropped, stopping dispatch loop");
                return Ok(stats);
            }
            Err(e) => return Err(e),
        };
        pump = dispatching.dispatch()?;

        let now = Local::now();
        if now - last_stats_time > stats_interval {
            let current = pump.stats();
            let elapsed_seconds = (now - last_stats_time).num_seconds().max(1);
            info!(
                "Dispatch stats: {} cycles, {} events ({} delivered) in {} seconds",
                current.cycles - last_stats.cycles,
                current.events - last_stats.events,
                current.delivered - last_stats.delivered,
                elapsed_seconds
            );
            last_stats = current;
            last_stats_time = now;
        }
    }
}

pub struct PumpHandle {
    task: JoinHandle<Result<PumpStats, PumpError>>,
    cancel: CancellationToken,
}

impl PumpHandle {
    /// Spawns the dispatch loop on the current tokio runtime.
    pub fn spawn<D>(dispatcher: D, batch_receiver: BatchReceiver, settings: &DispatchSettings) -> Self
    where
        D: Dispatcher + 'static,
    {
        let cancel = CancellationToken::new();
        let pump = DispatchPump::create(dispatcher, batch_receiver, cancel.clone());
        let stats_interval_secs = settings.stats_interval_secs;

        let task = tokio::spawn(async move {
            let result = run_pump_loop(pump, stats_interval_secs).await;
            if let Err(e) = &result {
                error!("Dispatch loop terminated with error: {}", e);
            }
            result
        });
        info!("Dispatch pump started");

        Self { task, cancel }
    }

    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Stops the loop and returns its totals.
    pub async fn shutdown(self) -> Result<PumpStats, PumpError> {
        self.cancel.cancel();
        self.join().await
    }

    /// Waits for the loop to stop on its own.
    pub async fn join(self) -> Result<PumpStats, PumpError> {
        self.task
            .await
            .map_err(|e| PumpError::TaskFailed(e.to_string()))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{EventCategory, HoverEvent, DeviceId, NodeId, SourceId, TriggerEvent};
    use crate::native::LoopbackTransport;
    use crate::router::{EventRouter, ListenerHandle, ListenerRegistry};
    use parking_lot::Mutex;
    use std::sync::Arc;

    fn hover(target: u64) -> InputEvent {
        HoverEvent {
            device: DeviceId(1),
            source: SourceId(1),
            target: Some(NodeId(target)),
            is_hovering: true,
            position: None,
        }
        .into()
    }

    fn router() -> (EventRouter, Arc<Mutex<Vec<Vec<InputEvent>>>>, ListenerHandle) {
        let registry = ListenerRegistry::new();
        let mut router = EventRouter::create(Arc::new(LoopbackTransport::new()), registry.clone()).unwrap();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let handle = registry.register(move |events: &[InputEvent]| sink.lock().push(events.to_vec()));
        router.set_listener(Some(handle.token())).unwrap();
        router.set_category_enabled(EventCategory::Hover, true).unwrap();
        (router, seen, handle)
    }

    #[tokio::test]
    async fn test_cycle_merges_queued_batches_in_order() {
        let (router, seen, _handle) = router();
        let (tx, rx) = DispatchSettings::default().channel();
        tx.send(vec![hover(1), hover(2)]).await.unwrap();
        tx.send(vec![hover(3)]).await.unwrap();

        let pump = DispatchPump::create(router, rx, CancellationToken::new());
        let dispatching = pump.wait_for_batch().await.unwrap();
        assert_eq!(dispatching.get_state_data().map(|b| b.messages), Some(2));

        let pump = dispatching.dispatch().unwrap();
        assert_eq!(*seen.lock(), vec![vec![hover(1), hover(2), hover(3)]]);
        assert_eq!(
            pump.stats(),
            PumpStats {
                cycles: 1,
                messages: 2,
                events: 3,
                delivered: 3,
            }
        );
    }

    /// Records the buffer address of every batch it receives.
    #[derive(Debug, Default)]
    struct BufferWitness {
        received: Arc<Mutex<Vec<usize>>>,
    }

    impl Dispatcher for BufferWitness {
        fn dispatch_batch(&mut self, batch: Vec<InputEvent>) -> Result<usize, PumpError> {
            self.received.lock().push(batch.as_ptr() as usize);
            Ok(batch.len())
        }
    }

    #[tokio::test]
    async fn test_batch_is_moved_into_dispatcher() {
        let witness = BufferWitness::default();
        let received = witness.received.clone();
        let (tx, rx) = DispatchSettings::default().channel();
        tx.send(vec![hover(1), hover(2)]).await.unwrap();

        let pump = DispatchPump::create(witness, rx, CancellationToken::new());
        let dispatching = pump.wait_for_batch().await.unwrap();
        let buffer = dispatching.get_state_data().map(|b| b.events.as_ptr() as usize);

        let pump = dispatching.dispatch().unwrap();
        assert_eq!(received.lock().first().copied(), buffer);
        assert_eq!(pump.stats().delivered, 2);
    }

    #[tokio::test]
    async fn test_filtered_events_are_counted_but_not_delivered() {
        let (router, _seen, _handle) = router();
        let (tx, rx) = DispatchSettings::default().channel();
        tx.send(vec![TriggerEvent::new(DeviceId(1), SourceId(3), 1.0).into(), hover(1)])
            .await
            .unwrap();
        drop(tx);

        let handle = PumpHandle::spawn(router, rx, &DispatchSettings::default());
        let stats = handle.join().await.unwrap();
        assert_eq!(stats.events, 2);
        assert_eq!(stats.delivered, 1);
    }

    #[tokio::test]
    async fn test_shutdown_stops_idle_pump() {
        let (router, _seen, _handle) = router();
        let (_tx, rx) = DispatchSettings::default().channel();

        let handle = PumpHandle::spawn(router, rx, &DispatchSettings::default());
        let stats = handle.shutdown().await.unwrap();
        assert_eq!(stats, PumpStats::default());
    }

    #[tokio::test]
    async fn test_disposed_router_fails_loop() {
        let (mut router, _seen, _handle) = router();
        router.dispose();
        let (tx, rx) = DispatchSettings::default().channel();
        tx.send(vec![hover(1)]).await.unwrap();

        let handle = PumpHandle::spawn(router, rx, &DispatchSettings::default());
        assert!(matches!(
            handle.join().await,
            Err(PumpError::Router(crate::router::RouterError::InvalidHandle))
        ));
    }
}
