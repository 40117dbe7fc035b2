//! The engine owns one instance of every subsystem and runs the tick pass.
//!
//! The engine itself is synchronous and single-threaded; it never sleeps and
//! never reads the wall clock except through its [`Clock`]. Pacing ticks is
//! left to a host such as the async scheduler in `statecraft_server`.
//!
//! # Tick order
//!
//! Each [`GameEngine::run_tick`] runs the update passes in this order:
//!
//! 1. Research (a completed field can change what other systems allow)
//! 2. Population
//! 3. Environment
//! 4. Diplomacy
//!
//! Intelligence has no per-tick pass. If a pass fails the remaining passes
//! are skipped, the tick still counts, and whatever earlier passes changed
//! stays applied.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::time::Duration;

use crate::clock::{Clock, Millis, SystemClock};
use crate::config::{clamp_tick_interval, EngineConfig};
use crate::diplomacy::{DiplomacySystem, Response, TradeAgreement, Treaty};
use crate::environment::EnvironmentSystem;
use crate::error::{GameError, Result};
use crate::intelligence::IntelligenceSystem;
use crate::population::PopulationSystem;
use crate::research::ResearchSystem;
use crate::snapshot::{
    DiplomacyState, EnvironmentState, IntelligenceState, PopulationState, ResearchState, Snapshot,
    SystemKind, TickFault,
};

/// A single running game.
#[derive(Debug)]
pub struct GameEngine {
    config: EngineConfig,
    clock: Box<dyn Clock>,
    tick: u64,
    intelligence: IntelligenceSystem,
    population: PopulationSystem,
    environment: EnvironmentSystem,
    research: ResearchSystem,
    diplomacy: DiplomacySystem,
}

impl GameEngine {
    /// Create an engine driven by the system clock.
    #[must_use]
    pub fn new(config: EngineConfig) -> Self {
        Self::with_clock(config, SystemClock)
    }

    /// Create an engine driven by `clock`.
    #[must_use]
    pub fn with_clock(mut config: EngineConfig, clock: impl Clock + 'static) -> Self {
        config.tick_interval_ms = clamp_tick_interval(config.tick_interval_ms);
        Self {
            intelligence: IntelligenceSystem::new(),
            population: PopulationSystem::new(),
            environment: EnvironmentSystem::with_metrics(
                config.initial_environment,
                config.initial_resources,
            ),
            research: ResearchSystem::new(),
            diplomacy: DiplomacySystem::with_history_limit(config.history_limit),
            clock: Box::new(clock),
            tick: 0,
            config,
        }
    }

    /// Active configuration.
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Number of ticks run so far, including faulted ones.
    #[must_use]
    pub const fn tick(&self) -> u64 {
        self.tick
    }

    /// Current clock time.
    #[must_use]
    pub fn now(&self) -> Millis {
        self.clock.now_ms()
    }

    /// Milliseconds between tick starts.
    #[must_use]
    pub const fn tick_interval_ms(&self) -> u64 {
        self.config.tick_interval_ms
    }

    /// Tick interval as a [`Duration`].
    #[must_use]
    pub const fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.config.tick_interval_ms)
    }

    /// Change the tick interval, floored at 100ms. Returns the value applied.
    pub fn set_tick_interval(&mut self, ms: u64) -> u64 {
        self.config.tick_interval_ms = clamp_tick_interval(ms);
        tracing::debug!(interval_ms = self.config.tick_interval_ms, "tick interval changed");
        self.config.tick_interval_ms
    }

    /// Intelligence subsystem.
    #[must_use]
    pub fn intelligence(&self) -> &IntelligenceSystem {
        &self.intelligence
    }

    /// Mutable intelligence subsystem.
    pub fn intelligence_mut(&mut self) -> &mut IntelligenceSystem {
        &mut self.intelligence
    }

    /// Population subsystem.
    #[must_use]
    pub fn population(&self) -> &PopulationSystem {
        &self.population
    }

    /// Mutable population subsystem.
    pub fn population_mut(&mut self) -> &mut PopulationSystem {
        &mut self.population
    }

    /// Environment subsystem.
    #[must_use]
    pub fn environment(&self) -> &EnvironmentSystem {
        &self.environment
    }

    /// Mutable environment subsystem.
    pub fn environment_mut(&mut self) -> &mut EnvironmentSystem {
        &mut self.environment
    }

    /// Research subsystem.
    #[must_use]
    pub fn research(&self) -> &ResearchSystem {
        &self.research
    }

    /// Mutable research subsystem.
    pub fn research_mut(&mut self) -> &mut ResearchSystem {
        &mut self.research
    }

    /// Diplomacy subsystem.
    #[must_use]
    pub fn diplomacy(&self) -> &DiplomacySystem {
        &self.diplomacy
    }

    /// Mutable diplomacy subsystem. Calls made through it must supply their
    /// own timestamps; prefer the engine wrappers, which use the engine clock.
    pub fn diplomacy_mut(&mut self) -> &mut DiplomacySystem {
        &mut self.diplomacy
    }

    /// Register a relation, stamped with the current time.
    pub fn establish_relation(&mut self, a: &str, b: &str, trust: f64) -> Result<()> {
        let now = self.now();
        self.diplomacy.establish_relation(a, b, trust, now)
    }

    /// Propose a treaty, stamped with the current time.
    pub fn propose_treaty(&mut self, initiator: &str, target: &str, treaty: Treaty) -> Result<()> {
        let now = self.now();
        self.diplomacy.propose_treaty(initiator, target, treaty, now)
    }

    /// Open trade negotiations, stamped with the current time.
    pub fn negotiate_trade_agreement(
        &mut self,
        initiator: &str,
        target: &str,
        agreement: TradeAgreement,
    ) -> Result<()> {
        let now = self.now();
        self.diplomacy
            .negotiate_trade_agreement(initiator, target, agreement, now)
    }

    /// Answer a pending diplomatic action at the current time.
    pub fn respond_to_diplomatic_action(&mut self, action_id: &str, response: Response) -> Result<()> {
        let now = self.now();
        self.diplomacy
            .respond_to_diplomatic_action(action_id, response, now)
    }

    /// Advance every subsystem by one tick.
    ///
    /// Returns the resulting snapshot, or a fault naming the pass that failed.
    pub fn run_tick(&mut self) -> std::result::Result<Snapshot, TickFault> {
        self.tick += 1;
        let now = self.now();

        for system in SystemKind::UPDATE_ORDER {
            if let Err(err) = self.run_pass(system, now) {
                let system = match &err {
                    GameError::SystemFault { system, .. } => *system,
                    _ => system,
                };
                tracing::warn!(tick = self.tick, %system, error = %err, "tick faulted");
                return Err(TickFault {
                    tick: self.tick,
                    timestamp: now,
                    system: Some(system),
                    message: err.to_string(),
                });
            }
        }

        #[cfg(debug_assertions)]
        {
            let hash = self.state_hash();
            tracing::debug!(tick = self.tick, state_hash = hash, "Simulation state hash");
        }

        Ok(self.snapshot_at(now))
    }

    fn run_pass(&mut self, system: SystemKind, now: Millis) -> Result<()> {
        match system {
            SystemKind::Research => self.research.update_research(),
            SystemKind::Population => self.population.update_population_dynamics(),
            SystemKind::Environment => self.environment.update_environment(),
            SystemKind::Diplomacy => self.diplomacy.update_relations(now),
            SystemKind::Intelligence => Ok(()),
        }
    }

    /// Owned copy of the externally visible state at the current time.
    #[must_use]
    pub fn snapshot(&self) -> Snapshot {
        self.snapshot_at(self.now())
    }

    fn snapshot_at(&self, timestamp: Millis) -> Snapshot {
        Snapshot {
            tick: self.tick,
            timestamp,
            intelligence: IntelligenceState {
                active_operations: self.intelligence.active_operations(),
            },
            population: PopulationState {
                movements: self.population.movements(),
                trends: self.population.trends(),
            },
            environment: EnvironmentState {
                global: self.environment.global_metrics(),
                resources: self.environment.resource_metrics(),
                active_events: self.environment.active_events(),
            },
            research: ResearchState {
                active_projects: self.research.active_projects(),
                facilities: self.research.facilities(),
            },
            diplomacy: DiplomacyState {
                viewer: self.config.viewer.clone(),
                pending_actions: self.diplomacy.pending_actions(&self.config.viewer),
            },
        }
    }

    /// Compute a hash of the simulation state for determinism checks.
    ///
    /// Two engines with identical state produce identical hashes.
    #[must_use]
    pub fn state_hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.tick.hash(&mut hasher);
        self.intelligence.hash_into(&mut hasher);
        self.population.hash_into(&mut hasher);
        self.environment.hash_into(&mut hasher);
        self.research.hash_into(&mut hasher);
        self.diplomacy.hash_into(&mut hasher);
        hasher.finish()
    }
}
