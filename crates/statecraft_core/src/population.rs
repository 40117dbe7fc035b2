//! Population segments, social movements and cultural trends.
//!
//! Player actions nudge a segment's education, happiness or productivity and
//! soft-cap the result at 100. Once per tick every segment grows:
//!
//! ```text
//! growth_rate   = 0.001 + (happiness - 50) * 0.0001 + education * 0.0001
//! size         *= 1 + growth_rate
//! productivity *= 1 + education * 0.001
//! ```
//!
//! Size and productivity have no ceiling and compound every tick.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{check, GameError, Result};
use crate::registry::{Identified, Registry};
use crate::snapshot::SystemKind;

/// Soft cap applied by player-driven population changes.
pub const SOFT_CAP: f64 = 100.0;

/// A demographic group within the nation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PopulationSegment {
    /// Unique identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Headcount.
    pub size: f64,
    /// Happiness, nominally `[0, 100]`.
    pub happiness: f64,
    /// Output per head.
    pub productivity: f64,
    /// Education, nominally `[0, 100]`.
    pub education: f64,
}

impl Identified for PopulationSegment {
    fn id(&self) -> &str {
        &self.id
    }
}

/// An organised movement that perturbs every segment when it appears.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SocialMovement {
    /// Unique identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Popular support in `[0, 100]`.
    pub support: f64,
    /// Political influence in `[0, 100]`.
    pub influence: f64,
    /// What the movement wants.
    #[serde(default)]
    pub demands: Vec<String>,
}

impl Identified for SocialMovement {
    fn id(&self) -> &str {
        &self.id
    }
}

/// A cultural initiative.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CulturalTrend {
    /// Unique identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Strength in `[0, 100]`.
    pub strength: f64,
    /// Named effects.
    #[serde(default)]
    pub effects: BTreeMap<String, f64>,
}

impl Identified for CulturalTrend {
    fn id(&self) -> &str {
        &self.id
    }
}

/// Direct action against a single segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PopulationAction {
    /// Raise education.
    Educate,
    /// Raise happiness.
    ImproveHappiness,
    /// Raise productivity.
    BoostProductivity,
}

impl PopulationAction {
    /// Snake-case name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Educate => "educate",
            Self::ImproveHappiness => "improve_happiness",
            Self::BoostProductivity => "boost_productivity",
        }
    }
}

impl FromStr for PopulationAction {
    type Err = GameError;

    fn from_str(s: &str) -> Result<Self> {
        [Self::Educate, Self::ImproveHappiness, Self::BoostProductivity]
            .into_iter()
            .find(|a| a.name() == s)
            .ok_or_else(|| GameError::UnknownName {
                kind: "population action",
                name: s.to_string(),
            })
    }
}

/// A fixed-effect policy applied to several segments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SocialPolicy {
    /// +5 happiness.
    Welfare,
    /// +3 education.
    EducationReform,
    /// +4 productivity.
    LaborPolicy,
}

impl SocialPolicy {
    /// Snake-case name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Welfare => "welfare",
            Self::EducationReform => "education_reform",
            Self::LaborPolicy => "labor_policy",
        }
    }
}

impl FromStr for SocialPolicy {
    type Err = GameError;

    fn from_str(s: &str) -> Result<Self> {
        [Self::Welfare, Self::EducationReform, Self::LaborPolicy]
            .into_iter()
            .find(|p| p.name() == s)
            .ok_or_else(|| GameError::UnknownName {
                kind: "social policy",
                name: s.to_string(),
            })
    }
}

impl fmt::Display for SocialPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Optional per-attribute deltas for a demographic program.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DemographicProgram {
    /// Education delta.
    #[serde(default)]
    pub education: Option<f64>,
    /// Happiness delta.
    #[serde(default)]
    pub happiness: Option<f64>,
    /// Productivity delta.
    #[serde(default)]
    pub productivity: Option<f64>,
}

/// Owns all segments, movements and trends.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PopulationSystem {
    segments: Registry<PopulationSegment>,
    movements: Registry<SocialMovement>,
    trends: Registry<CulturalTrend>,
}

impl PopulationSystem {
    /// Create an empty system.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new segment.
    pub fn add_segment(&mut self, segment: PopulationSegment) -> Result<()> {
        const ENTITY: &str = "population segment";
        check::non_empty(ENTITY, "id", &segment.id)?;
        check::non_empty(ENTITY, "name", &segment.name)?;
        check::non_negative(ENTITY, "size", segment.size)?;
        check::in_range(ENTITY, "happiness", segment.happiness, 0.0, SOFT_CAP)?;
        check::in_range(ENTITY, "education", segment.education, 0.0, SOFT_CAP)?;
        check::non_negative(ENTITY, "productivity", segment.productivity)?;
        if self.segments.contains(&segment.id) {
            return Err(GameError::DuplicateId {
                kind: "population segment",
                id: segment.id,
            });
        }
        self.segments.insert(segment);
        Ok(())
    }

    /// Apply a single action to one segment.
    pub fn process_population_action(
        &mut self,
        action: PopulationAction,
        segment_id: &str,
        value: f64,
    ) -> Result<()> {
        check::finite("population action", "value", value)?;
        let segment = self.segment_mut(segment_id)?;
        let attribute = match action {
            PopulationAction::Educate => &mut segment.education,
            PopulationAction::ImproveHappiness => &mut segment.happiness,
            PopulationAction::BoostProductivity => &mut segment.productivity,
        };
        *attribute = soft_cap(*attribute + value);
        tracing::debug!(segment = segment_id, action = action.name(), value, "population action applied");
        Ok(())
    }

    /// Apply a policy to every listed segment that exists.
    ///
    /// Unknown IDs are skipped; the call fails only when none of them exist.
    pub fn implement_social_policy(
        &mut self,
        policy: SocialPolicy,
        target_segments: &[String],
    ) -> Result<()> {
        let affected: Vec<&String> = target_segments
            .iter()
            .filter(|id| self.segments.contains(id))
            .collect();
        if affected.is_empty() {
            return Err(GameError::NotFound {
                kind: "population segment",
                id: target_segments.join(","),
            });
        }

        for id in affected {
            if let Some(segment) = self.segments.get_mut(id) {
                match policy {
                    SocialPolicy::Welfare => segment.happiness = soft_cap(segment.happiness + 5.0),
                    SocialPolicy::EducationReform => {
                        segment.education = soft_cap(segment.education + 3.0);
                    }
                    SocialPolicy::LaborPolicy => {
                        segment.productivity = soft_cap(segment.productivity + 4.0);
                    }
                }
            }
        }
        tracing::debug!(%policy, "social policy implemented");
        Ok(())
    }

    /// Register a cultural trend.
    pub fn launch_cultural_initiative(&mut self, trend: CulturalTrend) -> Result<()> {
        const ENTITY: &str = "cultural trend";
        check::non_empty(ENTITY, "id", &trend.id)?;
        check::non_empty(ENTITY, "name", &trend.name)?;
        check::in_range(ENTITY, "strength", trend.strength, 0.0, 100.0)?;
        check::all_finite(ENTITY, trend.effects.iter().map(|(k, v)| (k.as_str(), *v)))?;
        self.trends.insert(trend);
        Ok(())
    }

    /// Apply a program's deltas to one segment. Missing or zero deltas are skipped.
    pub fn implement_demographic_program(
        &mut self,
        segment_id: &str,
        program: DemographicProgram,
    ) -> Result<()> {
        const ENTITY: &str = "demographic program";
        for (field, delta) in [
            ("education", program.education),
            ("happiness", program.happiness),
            ("productivity", program.productivity),
        ] {
            if let Some(delta) = delta {
                check::finite(ENTITY, field, delta)?;
            }
        }

        let segment = self.segment_mut(segment_id)?;
        let apply = |value: &mut f64, delta: Option<f64>| {
            if let Some(delta) = delta.filter(|d| *d != 0.0) {
                *value = soft_cap(*value + delta);
            }
        };
        apply(&mut segment.education, program.education);
        apply(&mut segment.happiness, program.happiness);
        apply(&mut segment.productivity, program.productivity);
        Ok(())
    }

    /// Register a movement and apply its one-off effect to every segment.
    pub fn handle_social_movement(&mut self, movement: SocialMovement) -> Result<()> {
        const ENTITY: &str = "social movement";
        check::non_empty(ENTITY, "id", &movement.id)?;
        check::non_empty(ENTITY, "name", &movement.name)?;
        check::in_range(ENTITY, "support", movement.support, 0.0, 100.0)?;
        check::in_range(ENTITY, "influence", movement.influence, 0.0, 100.0)?;

        let impact = movement.support * movement.influence * 0.0001;
        for segment in self.segments.values_mut() {
            segment.happiness += impact;
            segment.productivity += impact * (segment.education / 100.0);
        }
        tracing::debug!(id = %movement.id, impact, "social movement registered");
        self.movements.insert(movement);
        Ok(())
    }

    /// Per-tick growth pass.
    ///
    /// Fails if any segment's size or productivity stops being finite. Segments
    /// processed before the failing one keep their update.
    pub fn update_population_dynamics(&mut self) -> Result<()> {
        for id in self.segments.sorted_ids() {
            let Some(segment) = self.segments.get_mut(&id) else {
                continue;
            };
            segment.size *= 1.0 + growth_rate(segment);
            segment.productivity *= 1.0 + segment.education * 0.001;

            if !segment.size.is_finite() || !segment.productivity.is_finite() {
                return Err(GameError::SystemFault {
                    system: SystemKind::Population,
                    message: format!("segment '{id}' grew beyond finite range"),
                });
            }
        }
        Ok(())
    }

    /// Look up a segment.
    #[must_use]
    pub fn segment(&self, id: &str) -> Option<&PopulationSegment> {
        self.segments.get(id)
    }

    /// All segments, in ID order.
    #[must_use]
    pub fn segments(&self) -> Vec<PopulationSegment> {
        self.segments.sorted_values()
    }

    /// All movements, in ID order.
    #[must_use]
    pub fn movements(&self) -> Vec<SocialMovement> {
        self.movements.sorted_values()
    }

    /// All trends, in ID order.
    #[must_use]
    pub fn trends(&self) -> Vec<CulturalTrend> {
        self.trends.sorted_values()
    }

    pub(crate) fn hash_into<H: std::hash::Hasher>(&self, hasher: &mut H) {
        self.segments.hash_into(hasher);
        self.movements.hash_into(hasher);
        self.trends.hash_into(hasher);
    }

    fn segment_mut(&mut self, id: &str) -> Result<&mut PopulationSegment> {
        self.segments.get_mut(id).ok_or_else(|| GameError::NotFound {
            kind: "population segment",
            id: id.to_string(),
        })
    }
}

/// Growth rate for one tick.
#[must_use]
pub fn growth_rate(segment: &PopulationSegment) -> f64 {
    0.001 + (segment.happiness - 50.0) * 0.0001 + segment.education * 0.0001
}

fn soft_cap(value: f64) -> f64 {
    value.min(SOFT_CAP)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segment(id: &str) -> PopulationSegment {
        PopulationSegment {
            id: id.to_string(),
            name: format!("{id} workers"),
            size: 1_000.0,
            happiness: 50.0,
            productivity: 10.0,
            education: 40.0,
        }
    }

    fn system_with(ids: &[&str]) -> PopulationSystem {
        let mut system = PopulationSystem::new();
        for id in ids {
            system.add_segment(segment(id)).unwrap();
        }
        system
    }

    #[test]
    fn test_action_soft_caps_at_100() {
        let mut system = system_with(&["urban"]);
        system
            .process_population_action(PopulationAction::Educate, "urban", 75.0)
            .unwrap();
        assert_eq!(system.segment("urban").unwrap().education, 100.0);
    }

    #[test]
    fn test_unknown_segment_or_action_fails() {
        let mut system = system_with(&["urban"]);
        assert!(system
            .process_population_action(PopulationAction::Educate, "rural", 5.0)
            .is_err());
        assert!("riot".parse::<PopulationAction>().is_err());
        assert!("austerity".parse::<SocialPolicy>().is_err());
        assert_eq!(system.segment("urban").unwrap().education, 40.0);
    }

    #[test]
    fn test_social_policy_skips_unknown_segments() {
        let mut system = system_with(&["urban", "rural"]);
        let targets = vec!["urban".to_string(), "coastal".to_string()];
        system
            .implement_social_policy(SocialPolicy::Welfare, &targets)
            .unwrap();

        assert_eq!(system.segment("urban").unwrap().happiness, 55.0);
        assert_eq!(system.segment("rural").unwrap().happiness, 50.0);

        let nobody = vec!["coastal".to_string()];
        assert!(system
            .implement_social_policy(SocialPolicy::LaborPolicy, &nobody)
            .is_err());
    }

    #[test]
    fn test_demographic_program_applies_present_fields() {
        let mut system = system_with(&["urban"]);
        system
            .implement_demographic_program(
                "urban",
                DemographicProgram {
                    education: Some(10.0),
                    happiness: None,
                    productivity: Some(95.0),
                },
            )
            .unwrap();

        let urban = system.segment("urban").unwrap();
        assert_eq!(urban.education, 50.0);
        assert_eq!(urban.happiness, 50.0);
        assert_eq!(urban.productivity, 100.0);
    }

    #[test]
    fn test_dynamics_formula() {
        let mut system = system_with(&["urban"]);
        system.update_population_dynamics().unwrap();

        let urban = system.segment("urban").unwrap();
        // growth = 0.001 + 0 + 40 * 0.0001 = 0.005
        assert!((urban.size - 1_005.0).abs() < 1e-9);
        assert!((urban.productivity - 10.4).abs() < 1e-9);
    }

    #[test]
    fn test_movement_effect_is_one_off() {
        let mut system = system_with(&["urban"]);
        system
            .handle_social_movement(SocialMovement {
                id: "green".to_string(),
                name: "Green Dawn".to_string(),
                support: 60.0,
                influence: 50.0,
                demands: vec!["clean air".to_string()],
            })
            .unwrap();

        let urban = system.segment("urban").unwrap().clone();
        // impact = 60 * 50 * 0.0001 = 0.3
        assert!((urban.happiness - 50.3).abs() < 1e-9);
        assert!((urban.productivity - 10.12).abs() < 1e-9);
        assert_eq!(system.movements().len(), 1);

        system.update_population_dynamics().unwrap();
        let after = system.segment("urban").unwrap();
        let expected_growth = 0.001 + 0.3 * 0.0001 + 40.0 * 0.0001;
        assert!((after.size - 1_000.0 * (1.0 + expected_growth)).abs() < 1e-9);
    }

    #[test]
    fn test_movement_validation() {
        let mut system = system_with(&["urban"]);
        let result = system.handle_social_movement(SocialMovement {
            id: "loud".to_string(),
            name: "Loud".to_string(),
            support: 120.0,
            influence: 10.0,
            demands: Vec::new(),
        });
        assert!(result.is_err());
        assert_eq!(system.segment("urban").unwrap().happiness, 50.0);
        assert!(system.movements().is_empty());
    }

    #[test]
    fn test_trend_validation() {
        let mut system = PopulationSystem::new();
        let mut trend = CulturalTrend {
            id: "renaissance".to_string(),
            name: "Renaissance".to_string(),
            strength: 40.0,
            effects: BTreeMap::new(),
        };
        trend.effects.insert("education".to_string(), f64::NAN);
        assert!(system.launch_cultural_initiative(trend.clone()).is_err());

        trend.effects.insert("education".to_string(), 2.0);
        assert!(system.launch_cultural_initiative(trend).is_ok());
        assert_eq!(system.trends().len(), 1);
    }

    #[test]
    fn test_overflow_is_reported() {
        let mut system = PopulationSystem::new();
        let mut huge = segment("swarm");
        huge.size = f64::MAX;
        huge.happiness = 100.0;
        huge.education = 100.0;
        system.add_segment(huge).unwrap();

        let err = system.update_population_dynamics().unwrap_err();
        assert!(matches!(
            err,
            GameError::SystemFault {
                system: SystemKind::Population,
                ..
            }
        ));
    }

    #[test]
    fn test_duplicate_segment_rejected() {
        let mut system = system_with(&["urban"]);
        assert!(matches!(
            system.add_segment(segment("urban")),
            Err(GameError::DuplicateId { .. })
        ));
    }
}
