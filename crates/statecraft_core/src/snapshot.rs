//! Per-tick read models handed to consumers outside the core.
//!
//! A [`Snapshot`] is an owned copy; nothing in it aliases engine state.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::clock::Millis;
use crate::diplomacy::DiplomaticAction;
use crate::environment::{ClimateEvent, EnvironmentalMetrics, ResourceMetrics};
use crate::intelligence::IntelligenceOperation;
use crate::population::{CulturalTrend, SocialMovement};
use crate::research::{ResearchFacility, ResearchProject};

/// One of the five subsystems owned by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SystemKind {
    /// Covert operations and reports.
    Intelligence,
    /// Segments, movements and trends.
    Population,
    /// Global and resource metrics.
    Environment,
    /// Fields, projects and facilities.
    Research,
    /// Relations, treaties and trade.
    Diplomacy,
}

impl SystemKind {
    /// Order of the per-tick update passes.
    pub const UPDATE_ORDER: [Self; 4] = [
        Self::Research,
        Self::Population,
        Self::Environment,
        Self::Diplomacy,
    ];

    /// Lower-case name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Intelligence => "intelligence",
            Self::Population => "population",
            Self::Environment => "environment",
            Self::Research => "research",
            Self::Diplomacy => "diplomacy",
        }
    }
}

impl fmt::Display for SystemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Intelligence view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntelligenceState {
    /// Operations still active.
    pub active_operations: Vec<IntelligenceOperation>,
}

/// Population view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PopulationState {
    /// Registered social movements.
    pub movements: Vec<SocialMovement>,
    /// Registered cultural trends.
    pub trends: Vec<CulturalTrend>,
}

/// Environment view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentState {
    /// Global metrics.
    pub global: EnvironmentalMetrics,
    /// Resource metrics.
    pub resources: ResourceMetrics,
    /// Climate events not yet cleared.
    pub active_events: Vec<ClimateEvent>,
}

/// Research view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResearchState {
    /// All projects.
    pub active_projects: Vec<ResearchProject>,
    /// All facilities.
    pub facilities: Vec<ResearchFacility>,
}

/// Diplomacy view, from the viewpoint of one nation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiplomacyState {
    /// Nation whose pending actions are listed.
    pub viewer: String,
    /// Pending actions sent or received by the viewer.
    pub pending_actions: Vec<DiplomaticAction>,
}

/// Consolidated state after a successful tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Tick number that produced this snapshot.
    pub tick: u64,
    /// Clock time when the snapshot was taken.
    pub timestamp: Millis,
    /// Intelligence view.
    pub intelligence: IntelligenceState,
    /// Population view.
    pub population: PopulationState,
    /// Environment view.
    pub environment: EnvironmentState,
    /// Research view.
    pub research: ResearchState,
    /// Diplomacy view.
    pub diplomacy: DiplomacyState,
}

/// Failure notice for a tick whose update pass did not complete.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickFault {
    /// Tick number that failed.
    pub tick: u64,
    /// Clock time when the fault was caught.
    pub timestamp: Millis,
    /// Subsystem that failed, if known.
    pub system: Option<SystemKind>,
    /// Human-readable description.
    pub message: String,
}

impl fmt::Display for TickFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.system {
            Some(system) => write!(f, "tick {} failed in {system}: {}", self.tick, self.message),
            None => write!(f, "tick {} failed: {}", self.tick, self.message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_order() {
        assert_eq!(SystemKind::UPDATE_ORDER[0], SystemKind::Research);
        assert_eq!(SystemKind::UPDATE_ORDER[3], SystemKind::Diplomacy);
        assert!(!SystemKind::UPDATE_ORDER.contains(&SystemKind::Intelligence));
    }

    #[test]
    fn test_fault_display() {
        let fault = TickFault {
            tick: 7,
            timestamp: 0,
            system: Some(SystemKind::Population),
            message: "size overflowed".to_string(),
        };
        assert_eq!(fault.to_string(), "tick 7 failed in population: size overflowed");
    }
}
