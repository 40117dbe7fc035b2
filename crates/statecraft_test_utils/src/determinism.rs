//! Determinism testing utilities.
//!
//! Provides a harness for verifying that the engine produces identical
//! results given identical inputs.
//!
//! # Testing Strategy
//!
//! Sources of non-determinism the engine guards against:
//!
//! - **HashMap iteration order**: Rust's default hasher is randomized.
//!   Every subsystem iterates in sorted identifier order.
//!
//! - **Wall-clock time**: The engine only reads time through its clock.
//!   Tests drive a [`ManualClock`] so every run sees the same timestamps.
//!
//! # Test Levels
//!
//! 1. **Unit tests**: Individual subsystem passes
//! 2. **Property tests**: Random inputs must still produce deterministic outputs
//! 3. **Integration tests**: Full scenarios are reproducible

use statecraft_core::prelude::*;

/// Result of a determinism test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeterminismResult {
    /// Whether all runs produced identical results.
    pub is_deterministic: bool,
    /// Hashes from each run.
    pub hashes: Vec<u64>,
    /// Number of ticks simulated.
    pub ticks: u64,
}

impl DeterminismResult {
    /// Get all unique hashes (should be 1 for deterministic simulation).
    #[must_use]
    pub fn unique_hashes(&self) -> Vec<u64> {
        let mut unique: Vec<u64> = self.hashes.clone();
        unique.sort_unstable();
        unique.dedup();
        unique
    }

    /// Assert that the simulation was deterministic, with a detailed error message.
    ///
    /// # Panics
    ///
    /// Panics if the simulation produced different hashes across runs.
    pub fn assert_deterministic(&self) {
        if !self.is_deterministic {
            let unique = self.unique_hashes();
            panic!(
                "Simulation is non-deterministic!\n\
                 Runs: {}\n\
                 Ticks: {}\n\
                 Unique hashes: {} (expected 1)\n\
                 All hashes: {:?}",
                self.hashes.len(),
                self.ticks,
                unique.len(),
                self.hashes
            );
        }
    }
}

/// Run a simulation multiple times and verify determinism.
///
/// # Arguments
///
/// * `runs` - Number of times to run the simulation
/// * `ticks` - Number of ticks to simulate per run
/// * `setup` - Function to create initial simulation state
/// * `step` - Function to advance simulation by one tick
/// * `hash` - Function to compute state hash
pub fn verify_determinism<S, Setup, Step, HashFn>(
    runs: usize,
    ticks: u64,
    setup: Setup,
    step: Step,
    hash: HashFn,
) -> DeterminismResult
where
    Setup: Fn() -> S,
    Step: Fn(&mut S),
    HashFn: Fn(&S) -> u64,
{
    let mut hashes = Vec::with_capacity(runs);

    for _ in 0..runs {
        let mut state = setup();

        for _ in 0..ticks {
            step(&mut state);
        }

        hashes.push(hash(&state));
    }

    let is_deterministic = hashes.windows(2).all(|w| w[0] == w[1]);

    DeterminismResult {
        is_deterministic,
        hashes,
        ticks,
    }
}

/// Advance the clock by one tick interval, then run a tick.
///
/// Tick faults are ignored; the state they leave behind still counts.
pub fn step_engine(state: &mut (GameEngine, ManualClock)) {
    let (engine, clock) = state;
    clock.advance(engine.tick_interval_ms());
    let _ = engine.run_tick();
}

/// Run two engines built by `setup_fn` for `num_ticks` ticks and compare
/// their final state hashes.
///
/// # Example
///
/// ```
/// use statecraft_test_utils::determinism::verify_engine_determinism;
/// use statecraft_test_utils::fixtures::sample_engine;
///
/// assert!(verify_engine_determinism(sample_engine, 50));
/// ```
pub fn verify_engine_determinism<F>(setup_fn: F, num_ticks: u64) -> bool
where
    F: Fn() -> (GameEngine, ManualClock),
{
    verify_determinism(
        2,
        num_ticks,
        setup_fn,
        step_engine,
        |state: &(GameEngine, ManualClock)| state.0.state_hash(),
    )
    .is_deterministic
}

/// Compare two engine runs tick-by-tick, finding the first divergence.
///
/// # Returns
///
/// `None` if the runs match throughout, `Some(tick)` if they diverge at that tick.
pub fn find_first_divergence<F>(setup_fn: F, num_ticks: u64) -> Option<u64>
where
    F: Fn() -> (GameEngine, ManualClock),
{
    let mut first = setup_fn();
    let mut second = setup_fn();

    if first.0.state_hash() != second.0.state_hash() {
        return Some(0);
    }

    for tick in 1..=num_ticks {
        step_engine(&mut first);
        step_engine(&mut second);

        if first.0.state_hash() != second.0.state_hash() {
            return Some(tick);
        }
    }

    None
}

/// Proptest strategies for engine inputs.
pub mod strategies {
    use proptest::prelude::*;
    use statecraft_core::prelude::*;

    /// Any trust value in `[0, 100]`.
    pub fn arb_trust() -> impl Strategy<Value = f64> {
        0.0..=100.0f64
    }

    /// Any finite delta in `[-200, 200]`, wide enough to overshoot metric bounds.
    pub fn arb_delta() -> impl Strategy<Value = f64> {
        -200.0..=200.0f64
    }

    /// Any environment or resource metric.
    pub fn arb_metric() -> impl Strategy<Value = Metric> {
        prop::sample::select(Metric::ALL.to_vec())
    }

    /// Any resource metric.
    pub fn arb_resource_metric() -> impl Strategy<Value = Metric> {
        prop::sample::select(
            Metric::ALL
                .into_iter()
                .filter(|metric| metric.is_resource())
                .collect::<Vec<_>>(),
        )
    }

    /// Any resource action.
    pub fn arb_resource_action() -> impl Strategy<Value = ResourceAction> {
        prop_oneof![
            Just(ResourceAction::Extract),
            Just(ResourceAction::Conserve),
            Just(ResourceAction::Restore),
        ]
    }

    /// Any diplomatic action kind.
    pub fn arb_action_kind() -> impl Strategy<Value = ActionKind> {
        prop::sample::select(ActionKind::ALL.to_vec())
    }

    /// A valid population segment with the given id.
    pub fn arb_segment(id: &'static str) -> impl Strategy<Value = PopulationSegment> {
        (1.0..100_000.0f64, 0.0..=100.0f64, 0.1..10.0f64, 0.0..=100.0f64).prop_map(
            move |(size, happiness, productivity, education)| PopulationSegment {
                id: id.to_string(),
                name: id.to_string(),
                size,
                happiness,
                productivity,
                education,
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{manual_clock_engine, sample_engine, segment};
    use proptest::prelude::*;

    // =========================================================================
    // Basic determinism tests
    // =========================================================================

    #[test]
    fn test_verify_determinism_simple() {
        let result = verify_determinism(3, 100, || 0u64, |n| *n += 1, |n| *n);

        assert!(result.is_deterministic);
        assert_eq!(result.hashes, vec![100, 100, 100]);
    }

    #[test]
    fn test_empty_engine_determinism() {
        assert!(verify_engine_determinism(manual_clock_engine, 100));
    }

    #[test]
    fn test_sample_engine_determinism() {
        assert!(verify_engine_determinism(sample_engine, 200));
        assert_eq!(find_first_divergence(sample_engine, 50), None);
    }

    #[test]
    fn test_unique_hashes_reports_divergence() {
        let mismatched = DeterminismResult {
            is_deterministic: false,
            hashes: vec![1, 2, 2],
            ticks: 1,
        };
        assert_eq!(mismatched.unique_hashes(), vec![1, 2]);
    }

    #[test]
    fn test_step_engine_advances_clock() {
        let mut state = manual_clock_engine();
        let before = state.0.now();
        step_engine(&mut state);
        assert_eq!(state.0.now(), before + state.0.tick_interval_ms());
        assert_eq!(state.0.tick(), 1);
    }

    // =========================================================================
    // Property tests
    // =========================================================================

    proptest! {
        #[test]
        fn prop_population_runs_are_reproducible(
            a in strategies::arb_segment("a"),
            b in strategies::arb_segment("b"),
            ticks in 1u64..50,
        ) {
            let setup = || {
                let (mut engine, clock) = manual_clock_engine();
                engine.population_mut().add_segment(a.clone()).unwrap();
                engine.population_mut().add_segment(b.clone()).unwrap();
                (engine, clock)
            };
            prop_assert!(verify_engine_determinism(setup, ticks));
        }

        #[test]
        fn prop_relation_trust_runs_are_reproducible(trust in strategies::arb_trust()) {
            let setup = || {
                let (mut engine, clock) = manual_clock_engine();
                engine.establish_relation("player", "borealis", trust).unwrap();
                engine
                    .population_mut()
                    .add_segment(segment("s", 100.0, 50.0, 50.0))
                    .unwrap();
                (engine, clock)
            };
            prop_assert!(verify_engine_determinism(setup, 20));
        }
    }
}
