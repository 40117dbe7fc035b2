//! Scheduler timing and fault containment, on tokio's paused clock.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use statecraft_core::prelude::*;
use statecraft_server::{Scheduler, SchedulerEvent, TickOutcome};
use statecraft_test_utils::fixtures::{engine_with_config, sample_engine, segment, START_MS};
use tokio::sync::broadcast;

fn drain(rx: &mut broadcast::Receiver<SchedulerEvent>) -> Vec<SchedulerEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

fn fast_engine() -> GameEngine {
    engine_with_config(EngineConfig::default().with_tick_interval(100)).0
}

/// A clock that panics on demand.
#[derive(Debug, Clone, Default)]
struct FaultyClock {
    armed: Arc<AtomicBool>,
}

impl Clock for FaultyClock {
    fn now_ms(&self) -> Millis {
        assert!(!self.armed.load(Ordering::SeqCst), "clock exploded");
        START_MS
    }
}

#[tokio::test(start_paused = true)]
async fn test_ticks_at_configured_interval_without_overlap() {
    let mut scheduler = Scheduler::new(fast_engine());
    let mut rx = scheduler.subscribe();

    assert!(scheduler.start());
    tokio::time::sleep(Duration::from_millis(1050)).await;
    scheduler.stop();
    scheduler.join().await;

    let events = drain(&mut rx);
    assert!(events.len() >= 10, "only {} ticks observed", events.len());
    assert!(events.iter().all(SchedulerEvent::is_update));
    for pair in events.windows(2) {
        assert_eq!(pair[1].tick, pair[0].tick + 1);
        assert!(pair[0].finished_at() <= pair[1].started_at);
        assert!(pair[1].started_at - pair[0].started_at >= Duration::from_millis(100));
    }
}

#[tokio::test(start_paused = true)]
async fn test_start_is_idempotent() {
    let mut scheduler = Scheduler::new(fast_engine());
    let mut rx = scheduler.subscribe();

    assert!(scheduler.start());
    assert!(!scheduler.start());
    assert!(scheduler.is_running());

    tokio::time::sleep(Duration::from_millis(550)).await;
    scheduler.stop();
    scheduler.join().await;

    let events = drain(&mut rx);
    let ticks: Vec<u64> = events.iter().map(|e| e.tick).collect();
    let expected: Vec<u64> = (1..=ticks.len() as u64).collect();
    assert_eq!(ticks, expected);
    assert!(ticks.len() <= 6);
}

#[tokio::test(start_paused = true)]
async fn test_stop_halts_ticking() {
    let mut scheduler = Scheduler::new(fast_engine());
    let mut rx = scheduler.subscribe();

    scheduler.start();
    tokio::time::sleep(Duration::from_millis(350)).await;
    scheduler.stop();
    assert!(!scheduler.is_running());
    scheduler.join().await;

    let stopped_at = scheduler.engine().await.tick();
    drain(&mut rx);
    tokio::time::sleep(Duration::from_millis(1000)).await;

    assert_eq!(scheduler.engine().await.tick(), stopped_at);
    assert!(drain(&mut rx).is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_restart_after_stop() {
    let mut scheduler = Scheduler::new(fast_engine());
    scheduler.start();
    tokio::time::sleep(Duration::from_millis(250)).await;
    scheduler.stop();
    assert!(scheduler.start());
    tokio::time::sleep(Duration::from_millis(250)).await;
    scheduler.stop();
    scheduler.join().await;

    // Both runs ticked; the first loop exits after its pending wait.
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(scheduler.engine().await.tick() >= 5);
}

#[tokio::test(start_paused = true)]
async fn test_faults_do_not_stop_the_loop() {
    let (mut engine, _) = sample_engine();
    engine.set_tick_interval(100);
    engine
        .population_mut()
        .add_segment(segment("aaa-runaway", f64::MAX, 100.0, 100.0))
        .unwrap();

    let mut scheduler = Scheduler::new(engine);
    let mut rx = scheduler.subscribe();
    scheduler.start();
    tokio::time::sleep(Duration::from_millis(450)).await;
    scheduler.stop();
    scheduler.join().await;

    let events = drain(&mut rx);
    assert!(events.len() >= 4);
    for event in &events {
        match &event.outcome {
            TickOutcome::Fault(fault) => {
                assert_eq!(fault.system, Some(SystemKind::Population));
                assert_eq!(fault.tick, event.tick);
            }
            TickOutcome::Update(_) => panic!("expected every tick to fault"),
        }
    }

    // Research ran before the fault on every tick.
    let engine = scheduler.engine().await;
    let progress = engine.research().project("lenses").unwrap().progress;
    assert!(progress > 0.0);
}

#[tokio::test(start_paused = true)]
async fn test_panics_become_faults() {
    let clock = FaultyClock::default();
    let engine = GameEngine::with_clock(
        EngineConfig::default().with_tick_interval(100),
        clock.clone(),
    );
    let mut scheduler = Scheduler::new(engine);
    let mut rx = scheduler.subscribe();

    scheduler.start();
    tokio::time::sleep(Duration::from_millis(150)).await;
    clock.armed.store(true, Ordering::SeqCst);
    tokio::time::sleep(Duration::from_millis(200)).await;
    clock.armed.store(false, Ordering::SeqCst);
    tokio::time::sleep(Duration::from_millis(200)).await;
    scheduler.stop();
    scheduler.join().await;

    let events = drain(&mut rx);
    let faults: Vec<_> = events
        .iter()
        .filter_map(|event| match &event.outcome {
            TickOutcome::Fault(fault) => Some(fault),
            TickOutcome::Update(_) => None,
        })
        .collect();
    assert!(!faults.is_empty());
    assert!(faults.iter().all(|f| f.system.is_none() && f.message.contains("clock exploded")));
    assert!(events.last().is_some_and(SchedulerEvent::is_update));
}

#[tokio::test(start_paused = true)]
async fn test_interval_change_applies_to_next_wait() {
    let mut scheduler = Scheduler::new(fast_engine());
    assert_eq!(scheduler.set_tick_interval(20).await, 100);
    assert_eq!(scheduler.set_tick_interval(500).await, 500);

    let mut rx = scheduler.subscribe();
    scheduler.start();
    tokio::time::sleep(Duration::from_millis(1050)).await;
    scheduler.stop();
    scheduler.join().await;

    let events = drain(&mut rx);
    assert_eq!(events.len(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_commands_between_ticks_are_serialised() {
    let mut scheduler = Scheduler::new(fast_engine());
    let mut rx = scheduler.subscribe();
    scheduler.start();

    {
        let mut engine = scheduler.engine().await;
        engine.establish_relation("player", "borealis", 50.0).unwrap();
        engine
            .diplomacy_mut()
            .initiate_diplomatic_action(DiplomaticAction {
                kind: ActionKind::Propose,
                initiator: "player".to_string(),
                target: "borealis".to_string(),
                content: ActionContent::Empty,
                timestamp: START_MS,
            })
            .unwrap();
    }

    tokio::time::sleep(Duration::from_millis(250)).await;
    scheduler.stop();
    scheduler.join().await;

    let events = drain(&mut rx);
    let TickOutcome::Update(snapshot) = &events.last().unwrap().outcome else {
        panic!("expected a snapshot");
    };
    assert_eq!(snapshot.diplomacy.pending_actions.len(), 1);
}
