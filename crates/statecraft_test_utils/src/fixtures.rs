//! Test fixtures and helpers.
//!
//! Pre-built engines and entity configurations for consistent testing.
//! Every engine built here runs on a [`ManualClock`] starting at
//! [`START_MS`], so tests control time explicitly.

use std::collections::BTreeMap;

use statecraft_core::prelude::*;

/// Clock reading every fixture engine starts at.
pub const START_MS: Millis = 1_700_000_000_000;

/// Nation used as the engine viewer in [`sample_engine`].
pub const PLAYER: &str = "player";

/// Create an empty engine with default configuration and a manual clock.
#[must_use]
pub fn manual_clock_engine() -> (GameEngine, ManualClock) {
    engine_with_config(EngineConfig::default())
}

/// Create an empty engine with `config` and a manual clock.
#[must_use]
pub fn engine_with_config(config: EngineConfig) -> (GameEngine, ManualClock) {
    let clock = ManualClock::new(START_MS);
    (GameEngine::with_clock(config, clock.clone()), clock)
}

/// Create an engine with [`sample_scenario`] applied.
///
/// # Panics
///
/// Panics if the sample scenario is rejected, which means a fixture is broken.
#[must_use]
pub fn sample_engine() -> (GameEngine, ManualClock) {
    let (mut engine, clock) = manual_clock_engine();
    sample_scenario()
        .apply(&mut engine)
        .expect("sample scenario must apply");
    (engine, clock)
}

/// A small world: two segments, a three-field tech chain with one lab,
/// one running project and relations between the player and two nations.
#[must_use]
pub fn sample_scenario() -> Scenario {
    Scenario {
        name: "Sample".to_string(),
        description: "Fixture world".to_string(),
        segments: vec![
            segment("urban", 10_000.0, 60.0, 70.0),
            segment("rural", 5_000.0, 45.0, 30.0),
        ],
        trends: vec![CulturalTrend {
            id: "renaissance".to_string(),
            name: "Renaissance".to_string(),
            strength: 40.0,
            effects: BTreeMap::from([("education".to_string(), 2.0)]),
        }],
        fields: vec![
            field("physics", "Physics", 50.0, &[]),
            field("optics", "Optics", 0.0, &[]),
            field("fusion", "Fusion", 0.0, &["physics"]),
        ],
        facilities: vec![facility("lab-optics", "Optics"), facility("lab-fusion", "Fusion")],
        technology_trees: vec![TechnologyTree {
            id: "energy".to_string(),
            name: "Energy".to_string(),
            nodes: vec![
                field("physics", "Physics", 50.0, &[]),
                field("fusion", "Fusion", 0.0, &["physics"]),
                field("optics", "Optics", 0.0, &[]),
            ],
            edges: vec![("physics".to_string(), "fusion".to_string())],
        }],
        projects: vec![project("lenses", "optics", 10)],
        relations: vec![
            RelationSetup {
                a: PLAYER.to_string(),
                b: "borealis".to_string(),
                trust: 80.0,
            },
            RelationSetup {
                a: PLAYER.to_string(),
                b: "cyrene".to_string(),
                trust: 20.0,
            },
        ],
    }
}

/// Build a population segment with productivity 1.
#[must_use]
pub fn segment(id: &str, size: f64, happiness: f64, education: f64) -> PopulationSegment {
    PopulationSegment {
        id: id.to_string(),
        name: id.to_string(),
        size,
        happiness,
        productivity: 1.0,
        education,
    }
}

/// Build a research field with no cost.
#[must_use]
pub fn field(id: &str, name: &str, progress: f64, requirements: &[&str]) -> ResearchField {
    ResearchField {
        id: id.to_string(),
        name: name.to_string(),
        progress,
        cost: ResourceCost::new(),
        requirements: requirements.iter().map(ToString::to_string).collect(),
    }
}

/// Build a level-10, efficiency-1 facility with capacity 50.
#[must_use]
pub fn facility(id: &str, specialization: &str) -> ResearchFacility {
    ResearchFacility {
        id: id.to_string(),
        name: id.to_string(),
        level: 10,
        capacity: 50.0,
        efficiency: 1.0,
        specialization: specialization.to_string(),
    }
}

/// Build a fresh project.
#[must_use]
pub fn project(id: &str, field: &str, researchers: u32) -> ResearchProject {
    ResearchProject {
        id: id.to_string(),
        name: id.to_string(),
        field: field.to_string(),
        progress: 0.0,
        researchers,
        cost: ResourceCost::new(),
        breakthrough: false,
    }
}

/// Build a technology export agreement.
#[must_use]
pub fn trade_agreement(id: &str, start_time: Millis, duration: Millis) -> TradeAgreement {
    TradeAgreement {
        id: id.to_string(),
        kind: TradeKind::Export,
        resource: ResourceType::Technology,
        amount: 50.0,
        price: 3.0,
        duration,
        start_time,
    }
}

/// Build a peace treaty with one term.
#[must_use]
pub fn treaty(id: &str, start_time: Millis, duration: Millis) -> Treaty {
    Treaty {
        id: id.to_string(),
        kind: TreatyKind::Peace,
        terms: vec!["cease hostilities".to_string()],
        benefits: BTreeMap::from([("stability".to_string(), 5.0)]),
        obligations: BTreeMap::new(),
        start_time,
        duration,
    }
}

/// Build a surveillance operation against `target`.
#[must_use]
pub fn operation(id: &str, target: &str) -> IntelligenceOperation {
    IntelligenceOperation {
        id: id.to_string(),
        kind: "surveillance".to_string(),
        cost: ResourceCost::from([(ResourceType::Money, 100.0)]),
        duration: DAY_MS,
        success_rate: 0.6,
        target: target.to_string(),
    }
}
