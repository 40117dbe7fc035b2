//! Starting world data.
//!
//! A scenario lists the entities a game begins with. Applying it goes through
//! the same validated registration calls a controller would use, so a
//! scenario can never put the engine into a state the operations reject.

use serde::{Deserialize, Serialize};

use crate::engine::GameEngine;
use crate::error::{GameError, Result};
use crate::population::{CulturalTrend, PopulationSegment};
use crate::research::{ResearchFacility, ResearchField, ResearchProject, TechnologyTree};

/// A relation that exists at game start.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationSetup {
    /// First nation.
    pub a: String,
    /// Second nation.
    pub b: String,
    /// Starting trust.
    pub trust: f64,
}

/// Initial world contents.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Scenario {
    /// Scenario name.
    pub name: String,
    /// Human-readable description.
    pub description: String,
    /// Population segments.
    pub segments: Vec<PopulationSegment>,
    /// Cultural trends already under way.
    pub trends: Vec<CulturalTrend>,
    /// Research fields.
    pub fields: Vec<ResearchField>,
    /// Research facilities.
    pub facilities: Vec<ResearchFacility>,
    /// Technology trees.
    pub technology_trees: Vec<TechnologyTree>,
    /// Projects already started. Their fields' prerequisites must be met.
    pub projects: Vec<ResearchProject>,
    /// Diplomatic relations.
    pub relations: Vec<RelationSetup>,
}

impl Scenario {
    /// Parse a scenario from RON.
    pub fn from_ron_str(ron: &str) -> Result<Self> {
        ron::from_str(ron).map_err(|e| GameError::DataParseError {
            path: "<scenario>".to_string(),
            message: e.to_string(),
        })
    }

    /// Register every entity with `engine`, stopping at the first rejection.
    ///
    /// Entities registered before the failing one stay registered.
    pub fn apply(&self, engine: &mut GameEngine) -> Result<()> {
        for segment in &self.segments {
            engine.population_mut().add_segment(segment.clone())?;
        }
        for trend in &self.trends {
            engine.population_mut().launch_cultural_initiative(trend.clone())?;
        }
        for field in &self.fields {
            engine.research_mut().add_field(field.clone())?;
        }
        for facility in &self.facilities {
            engine.research_mut().add_facility(facility.clone())?;
        }
        for tree in &self.technology_trees {
            engine.research_mut().add_technology_tree(tree.clone())?;
        }
        for project in &self.projects {
            engine.research_mut().start_research_project(project.clone())?;
        }
        for relation in &self.relations {
            engine.establish_relation(&relation.a, &relation.b, relation.trust)?;
        }
        tracing::info!(
            scenario = %self.name,
            segments = self.segments.len(),
            fields = self.fields.len(),
            relations = self.relations.len(),
            "scenario applied"
        );
        Ok(())
    }
}
