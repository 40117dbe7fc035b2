//! # Statecraft Core
//!
//! Tick-based simulation core for a grand-strategy game.
//!
//! This crate contains **only** simulation logic:
//! - No rendering
//! - No IO
//! - No threads or timers
//! - No direct wall-clock reads (time comes from a [`clock::Clock`])
//!
//! This separation enables:
//! - Headless hosts that pace ticks however they like
//! - Deterministic tests with a manual clock
//! - Offline simulation from the command line
//!
//! ## Crate Structure
//!
//! - [`engine`] - The [`GameEngine`](engine::GameEngine) and its tick pass
//! - [`intelligence`] - Covert operations and report analysis
//! - [`population`] - Segments, social movements and cultural trends
//! - [`environment`] - Global and resource metrics
//! - [`research`] - Fields, projects, facilities and technology trees
//! - [`diplomacy`] - Relations, treaties and trade agreements
//! - [`snapshot`] - Read models emitted after each tick
//! - [`config`] / [`scenario`] - RON-loadable configuration and starting data

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod clock;
pub mod config;
pub mod diplomacy;
pub mod engine;
pub mod environment;
pub mod error;
pub mod intelligence;
pub mod population;
pub mod registry;
pub mod research;
pub mod resources;
pub mod scenario;
pub mod snapshot;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::clock::{Clock, ManualClock, Millis, SystemClock, DAY_MS};
    pub use crate::config::EngineConfig;
    pub use crate::diplomacy::{
        ActionContent, ActionKind, DiplomaticAction, DiplomaticRelation, RelationStatus, Response,
        TradeAgreement, TradeKind, Treaty, TreatyKind,
    };
    pub use crate::engine::GameEngine;
    pub use crate::environment::{
        ClimateEvent, EnvironmentalMetrics, EnvironmentalPolicy, Metric, ResourceAction,
        ResourceMetrics,
    };
    pub use crate::error::{GameError, Result};
    pub use crate::intelligence::{Insights, Intelligence, IntelligenceOperation};
    pub use crate::population::{
        CulturalTrend, DemographicProgram, PopulationAction, PopulationSegment, SocialMovement,
        SocialPolicy,
    };
    pub use crate::research::{
        FacilityUpgrade, ResearchAction, ResearchFacility, ResearchField, ResearchProject,
        TechnologyTree,
    };
    pub use crate::resources::{ResourceCost, ResourceType};
    pub use crate::scenario::{RelationSetup, Scenario};
    pub use crate::snapshot::{Snapshot, SystemKind, TickFault};
}
