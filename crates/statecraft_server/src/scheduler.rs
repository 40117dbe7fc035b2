//! Async tick loop.
//!
//! The scheduler is either stopped or running. While running, one task
//! repeats:
//!
//! 1. note the start time
//! 2. lock the engine and run one tick
//! 3. publish the outcome
//! 4. sleep for whatever is left of the tick interval
//!
//! Ticks never overlap. A tick that overruns its interval is followed
//! immediately by the next one; missed ticks are not queued. The running flag
//! is checked once per iteration, before a tick starts, so stopping never
//! interrupts a tick in progress.
//!
//! A tick fault, or a panic inside the tick, is published as
//! [`TickOutcome::Fault`] and the loop carries on.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use statecraft_core::prelude::*;
use tokio::sync::{broadcast, Mutex, MutexGuard};
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// Default capacity of the event channel.
pub const DEFAULT_EVENT_CAPACITY: usize = 4096;

/// What a tick produced.
#[derive(Debug, Clone)]
pub enum TickOutcome {
    /// The tick completed.
    Update(Snapshot),
    /// The tick failed part-way; earlier passes stay applied.
    Fault(TickFault),
}

/// Published once per tick.
#[derive(Debug, Clone)]
pub struct SchedulerEvent {
    /// Tick number.
    pub tick: u64,
    /// When the tick began.
    pub started_at: Instant,
    /// How long the tick took, excluding the wait after it.
    pub elapsed: Duration,
    /// Snapshot or fault.
    pub outcome: TickOutcome,
}

impl SchedulerEvent {
    /// When the tick finished.
    #[must_use]
    pub fn finished_at(&self) -> Instant {
        self.started_at + self.elapsed
    }

    /// Whether the tick completed.
    #[must_use]
    pub fn is_update(&self) -> bool {
        matches!(self.outcome, TickOutcome::Update(_))
    }
}

/// Drives a [`GameEngine`] at its configured tick interval.
#[derive(Debug)]
pub struct Scheduler {
    engine: Arc<Mutex<GameEngine>>,
    events: broadcast::Sender<SchedulerEvent>,
    running: Arc<AtomicBool>,
    task: Option<JoinHandle<()>>,
}

impl Scheduler {
    /// Wrap an engine. The scheduler starts stopped.
    #[must_use]
    pub fn new(engine: GameEngine) -> Self {
        Self::with_capacity(engine, DEFAULT_EVENT_CAPACITY)
    }

    /// Wrap an engine with a custom event channel capacity.
    #[must_use]
    pub fn with_capacity(engine: GameEngine, capacity: usize) -> Self {
        let (events, _) = broadcast::channel(capacity.max(1));
        Self {
            engine: Arc::new(Mutex::new(engine)),
            events,
            running: Arc::new(AtomicBool::new(false)),
            task: None,
        }
    }

    /// Exclusive access to the engine between ticks.
    ///
    /// Commands issued through the guard are serialised against the tick
    /// loop; a tick waits while the guard is held.
    pub async fn engine(&self) -> MutexGuard<'_, GameEngine> {
        self.engine.lock().await
    }

    /// Receive every event published from now on.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<SchedulerEvent> {
        self.events.subscribe()
    }

    /// Whether the loop is running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Start the tick loop. Does nothing if it is already running.
    ///
    /// Must be called from within a tokio runtime. Returns whether a new
    /// loop was started.
    pub fn start(&mut self) -> bool {
        if self.is_running() {
            return false;
        }

        // One flag per run: a loop still sleeping after stop() stays stopped.
        let running = Arc::new(AtomicBool::new(true));
        self.running = Arc::clone(&running);
        self.task = Some(tokio::spawn(run_loop(
            Arc::clone(&self.engine),
            self.events.clone(),
            running,
        )));
        tracing::info!("scheduler started");
        true
    }

    /// Ask the loop to stop. The tick in progress, if any, completes.
    pub fn stop(&self) {
        if self.running.swap(false, Ordering::AcqRel) {
            tracing::info!("scheduler stopping");
        }
    }

    /// Change the tick interval, floored at 100ms. Returns the value applied.
    ///
    /// Takes effect from the next wait.
    pub async fn set_tick_interval(&self, ms: u64) -> u64 {
        self.engine.lock().await.set_tick_interval(ms)
    }

    /// Wait for a stopped loop to exit.
    pub async fn join(&mut self) {
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                tracing::error!(error = %e, "scheduler task ended abnormally");
            }
        }
    }
}

async fn run_loop(
    engine: Arc<Mutex<GameEngine>>,
    events: broadcast::Sender<SchedulerEvent>,
    running: Arc<AtomicBool>,
) {
    while running.load(Ordering::Acquire) {
        let started_at = Instant::now();
        let (tick, outcome, interval) = {
            let mut engine = engine.lock().await;
            let outcome = run_guarded(&mut engine);
            (engine.tick(), outcome, engine.tick_interval())
        };
        let elapsed = started_at.elapsed();

        match &outcome {
            TickOutcome::Update(_) => tracing::debug!(tick, ?elapsed, "tick complete"),
            TickOutcome::Fault(fault) => tracing::warn!(tick, %fault, "tick fault"),
        }
        // No subscribers is not an error.
        let _ = events.send(SchedulerEvent {
            tick,
            started_at,
            elapsed,
            outcome,
        });

        tokio::time::sleep(interval.saturating_sub(elapsed)).await;
    }
    tracing::info!("scheduler stopped");
}

/// Run one tick, converting a panic into a fault.
fn run_guarded(engine: &mut GameEngine) -> TickOutcome {
    match panic::catch_unwind(AssertUnwindSafe(|| engine.run_tick())) {
        Ok(Ok(snapshot)) => TickOutcome::Update(snapshot),
        Ok(Err(fault)) => TickOutcome::Fault(fault),
        Err(payload) => TickOutcome::Fault(TickFault {
            tick: engine.tick(),
            // The engine clock may be what panicked.
            timestamp: SystemClock.now_ms(),
            system: None,
            message: panic_message(payload.as_ref()),
        }),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "tick panicked".to_string()
    }
}
