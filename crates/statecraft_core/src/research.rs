//! Research fields, projects, facilities and technology trees.
//!
//! A project can only start once every prerequisite of its field is
//! complete. Each tick a project advances if some facility specialises in its
//! field's name:
//!
//! ```text
//! rate = 0.1 + researchers * 0.05 * efficiency * (level / 10)
//! ```
//!
//! Reaching 100 triggers a breakthrough exactly once: the field is completed
//! and every technology tree node for that field is replaced by the completed
//! field record.

use serde::{Deserialize, Serialize};

use crate::error::{check, GameError, Result};
use crate::registry::{Identified, Registry};
use crate::resources::{validate_cost, ResourceCost};

/// Progress value at which research is complete.
pub const COMPLETE: f64 = 100.0;

/// Highest facility level.
pub const MAX_FACILITY_LEVEL: u8 = 10;

/// Highest facility capacity.
pub const MAX_FACILITY_CAPACITY: f64 = 100.0;

/// Highest facility efficiency.
pub const MAX_FACILITY_EFFICIENCY: f64 = 2.0;

/// A branch of knowledge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResearchField {
    /// Unique identifier.
    pub id: String,
    /// Display name, matched against facility specialisations.
    pub name: String,
    /// Completion in `[0, 100]`.
    #[serde(default)]
    pub progress: f64,
    /// Cost to research.
    #[serde(default)]
    pub cost: ResourceCost,
    /// IDs of fields that must be complete before work can start.
    #[serde(default)]
    pub requirements: Vec<String>,
}

impl Identified for ResearchField {
    fn id(&self) -> &str {
        &self.id
    }
}

impl ResearchField {
    /// Whether the field is fully researched.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.progress >= COMPLETE
    }
}

/// Work underway in a field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResearchProject {
    /// Unique identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// ID of the field this project advances.
    pub field: String,
    /// Completion in `[0, 100]`.
    #[serde(default)]
    pub progress: f64,
    /// Assigned researchers.
    #[serde(default)]
    pub researchers: u32,
    /// Cost of the project.
    #[serde(default)]
    pub cost: ResourceCost,
    /// Set once the breakthrough for this project has fired. Owned by the
    /// research pass; never read from data.
    #[serde(default, skip_deserializing)]
    pub breakthrough: bool,
}

impl Identified for ResearchProject {
    fn id(&self) -> &str {
        &self.id
    }
}

/// Descriptive tree of fields. Edges are informational; prerequisites are
/// enforced through [`ResearchField::requirements`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TechnologyTree {
    /// Unique identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Field records, in tree order.
    pub nodes: Vec<ResearchField>,
    /// `(prerequisite, dependent)` pairs.
    #[serde(default)]
    pub edges: Vec<(String, String)>,
}

impl Identified for TechnologyTree {
    fn id(&self) -> &str {
        &self.id
    }
}

/// A laboratory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResearchFacility {
    /// Unique identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Level in `[1, 10]`.
    pub level: u8,
    /// Maximum researchers in `[0, 100]`.
    pub capacity: f64,
    /// Efficiency multiplier in `[0, 2]`.
    pub efficiency: f64,
    /// Field name this facility serves.
    pub specialization: String,
}

impl Identified for ResearchFacility {
    fn id(&self) -> &str {
        &self.id
    }
}

/// Additive facility upgrades; each result is capped at its ceiling.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FacilityUpgrade {
    /// Levels to add.
    #[serde(default)]
    pub level: Option<u8>,
    /// Capacity to add.
    #[serde(default)]
    pub capacity: Option<f64>,
    /// Efficiency to add.
    #[serde(default)]
    pub efficiency: Option<f64>,
}

/// Direct manipulation of a project.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResearchAction {
    /// Add progress, capped at 100.
    AllocateResources(f64),
    /// Add (or remove) researchers, floored at zero.
    AdjustResearchers(i64),
}

/// Owns fields, projects, facilities and technology trees.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResearchSystem {
    fields: Registry<ResearchField>,
    projects: Registry<ResearchProject>,
    facilities: Registry<ResearchFacility>,
    tech_trees: Registry<TechnologyTree>,
}

impl ResearchSystem {
    /// Create an empty system.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a research field.
    pub fn add_field(&mut self, field: ResearchField) -> Result<()> {
        validate_field(&field)?;
        if self.fields.contains(&field.id) {
            return Err(GameError::DuplicateId {
                kind: "research field",
                id: field.id,
            });
        }
        self.fields.insert(field);
        Ok(())
    }

    /// Register a facility.
    pub fn add_facility(&mut self, facility: ResearchFacility) -> Result<()> {
        const ENTITY: &str = "research facility";
        check::non_empty(ENTITY, "id", &facility.id)?;
        check::non_empty(ENTITY, "name", &facility.name)?;
        check::non_empty(ENTITY, "specialization", &facility.specialization)?;
        check::in_range(
            ENTITY,
            "level",
            f64::from(facility.level),
            1.0,
            f64::from(MAX_FACILITY_LEVEL),
        )?;
        check::in_range(ENTITY, "capacity", facility.capacity, 0.0, MAX_FACILITY_CAPACITY)?;
        check::in_range(
            ENTITY,
            "efficiency",
            facility.efficiency,
            0.0,
            MAX_FACILITY_EFFICIENCY,
        )?;
        if self.facilities.contains(&facility.id) {
            return Err(GameError::DuplicateId {
                kind: "research facility",
                id: facility.id,
            });
        }
        self.facilities.insert(facility);
        Ok(())
    }

    /// Register a technology tree.
    pub fn add_technology_tree(&mut self, tree: TechnologyTree) -> Result<()> {
        const ENTITY: &str = "technology tree";
        check::non_empty(ENTITY, "id", &tree.id)?;
        check::non_empty(ENTITY, "name", &tree.name)?;
        for node in &tree.nodes {
            validate_field(node)?;
        }
        if self.tech_trees.contains(&tree.id) {
            return Err(GameError::DuplicateId {
                kind: "technology tree",
                id: tree.id,
            });
        }
        self.tech_trees.insert(tree);
        Ok(())
    }

    /// Validate a project and start it if its field's prerequisites are done.
    ///
    /// The project starts with its breakthrough flag cleared.
    pub fn start_research_project(&mut self, mut project: ResearchProject) -> Result<()> {
        const ENTITY: &str = "research project";
        check::non_empty(ENTITY, "id", &project.id)?;
        check::non_empty(ENTITY, "name", &project.name)?;
        check::non_empty(ENTITY, "field", &project.field)?;
        check::in_range(ENTITY, "progress", project.progress, 0.0, COMPLETE)?;
        validate_cost(ENTITY, &project.cost)?;
        self.check_requirements(&project.field)?;

        project.breakthrough = false;
        tracing::debug!(id = %project.id, field = %project.field, "research project started");
        self.projects.insert(project);
        Ok(())
    }

    /// Per-tick research pass.
    pub fn update_research(&mut self) -> Result<()> {
        for id in self.projects.sorted_ids() {
            let Some(project) = self.projects.get(&id) else {
                continue;
            };
            if project.breakthrough {
                continue;
            }
            let Some(facility) = self.facility_for_project(project) else {
                continue;
            };
            let rate = progress_rate(project, facility);

            let Some(project) = self.projects.get_mut(&id) else {
                continue;
            };
            project.progress = (project.progress + rate).min(COMPLETE);
            if project.progress >= COMPLETE {
                project.breakthrough = true;
                let field = project.field.clone();
                self.handle_breakthrough(&id, &field);
            }
        }
        Ok(())
    }

    /// Assign researchers to a project, replacing the previous count.
    ///
    /// Requires a matching facility whose capacity covers `count`.
    pub fn allocate_researchers(&mut self, project_id: &str, count: u32) -> Result<()> {
        let project = self.project_ref(project_id)?;
        let facility = self.facility_for_project(project);
        match facility {
            Some(facility) if facility.capacity >= f64::from(count) => {}
            _ => {
                return Err(GameError::CapacityExceeded {
                    project: project_id.to_string(),
                    requested: count,
                })
            }
        }

        if let Some(project) = self.projects.get_mut(project_id) {
            project.researchers = count;
        }
        Ok(())
    }

    /// Share a project with partners: `5 * log10(partners + 1)` progress.
    pub fn initiate_collaboration(&mut self, project_id: &str, partner_ids: &[String]) -> Result<()> {
        let bonus = collaboration_bonus(partner_ids.len());
        let project = self.project_mut(project_id)?;
        project.progress = (project.progress + bonus).min(COMPLETE);
        tracing::debug!(project = project_id, partners = partner_ids.len(), bonus, "collaboration started");
        Ok(())
    }

    /// Apply upgrades to a facility, capping each attribute at its ceiling.
    pub fn upgrade_facility(&mut self, facility_id: &str, upgrade: FacilityUpgrade) -> Result<()> {
        const ENTITY: &str = "facility upgrade";
        if let Some(capacity) = upgrade.capacity {
            check::non_negative(ENTITY, "capacity", capacity)?;
        }
        if let Some(efficiency) = upgrade.efficiency {
            check::non_negative(ENTITY, "efficiency", efficiency)?;
        }

        let facility = self
            .facilities
            .get_mut(facility_id)
            .ok_or_else(|| GameError::NotFound {
                kind: "research facility",
                id: facility_id.to_string(),
            })?;
        if let Some(level) = upgrade.level {
            facility.level = facility.level.saturating_add(level).min(MAX_FACILITY_LEVEL);
        }
        if let Some(capacity) = upgrade.capacity {
            facility.capacity = (facility.capacity + capacity).min(MAX_FACILITY_CAPACITY);
        }
        if let Some(efficiency) = upgrade.efficiency {
            facility.efficiency = (facility.efficiency + efficiency).min(MAX_FACILITY_EFFICIENCY);
        }
        Ok(())
    }

    /// Manipulate a project's progress or staffing directly.
    pub fn process_research_action(&mut self, action: ResearchAction, project_id: &str) -> Result<()> {
        if let ResearchAction::AllocateResources(value) = action {
            check::finite("research action", "value", value)?;
        }
        let project = self.project_mut(project_id)?;
        match action {
            ResearchAction::AllocateResources(value) => {
                project.progress = (project.progress + value).clamp(0.0, COMPLETE);
            }
            ResearchAction::AdjustResearchers(delta) => {
                let adjusted = (i64::from(project.researchers) + delta).max(0);
                project.researchers = u32::try_from(adjusted).unwrap_or(u32::MAX);
            }
        }
        Ok(())
    }

    /// Look up a field.
    #[must_use]
    pub fn field(&self, id: &str) -> Option<&ResearchField> {
        self.fields.get(id)
    }

    /// Look up a project.
    #[must_use]
    pub fn project(&self, id: &str) -> Option<&ResearchProject> {
        self.projects.get(id)
    }

    /// Look up a facility.
    #[must_use]
    pub fn facility(&self, id: &str) -> Option<&ResearchFacility> {
        self.facilities.get(id)
    }

    /// Look up a technology tree.
    #[must_use]
    pub fn technology_tree(&self, id: &str) -> Option<&TechnologyTree> {
        self.tech_trees.get(id)
    }

    /// All projects, in ID order.
    #[must_use]
    pub fn active_projects(&self) -> Vec<ResearchProject> {
        self.projects.sorted_values()
    }

    /// All facilities, in ID order.
    #[must_use]
    pub fn facilities(&self) -> Vec<ResearchFacility> {
        self.facilities.sorted_values()
    }

    pub(crate) fn hash_into<H: std::hash::Hasher>(&self, hasher: &mut H) {
        self.fields.hash_into(hasher);
        self.projects.hash_into(hasher);
        self.facilities.hash_into(hasher);
        self.tech_trees.hash_into(hasher);
    }

    fn check_requirements(&self, field_id: &str) -> Result<()> {
        let field = self.fields.get(field_id).ok_or_else(|| GameError::NotFound {
            kind: "research field",
            id: field_id.to_string(),
        })?;
        for requirement in &field.requirements {
            let met = self
                .fields
                .get(requirement)
                .is_some_and(ResearchField::is_complete);
            if !met {
                return Err(GameError::RequirementNotMet {
                    field: field_id.to_string(),
                    requirement: requirement.clone(),
                });
            }
        }
        Ok(())
    }

    /// First facility, in ID order, specialising in the project's field name.
    fn facility_for_project(&self, project: &ResearchProject) -> Option<&ResearchFacility> {
        let field_name = &self.fields.get(&project.field)?.name;
        self.facilities
            .iter_sorted()
            .find(|facility| &facility.specialization == field_name)
    }

    fn handle_breakthrough(&mut self, project_id: &str, field_id: &str) {
        let Some(field) = self.fields.get_mut(field_id) else {
            return;
        };
        field.progress = COMPLETE;
        let completed = field.clone();

        let mut trees_updated = 0;
        for tree in self.tech_trees.values_mut() {
            let mut touched = false;
            for node in tree.nodes.iter_mut().filter(|node| node.id == completed.id) {
                *node = completed.clone();
                touched = true;
            }
            if touched {
                trees_updated += 1;
            }
        }
        tracing::info!(project = project_id, field = field_id, trees_updated, "research breakthrough");
    }

    fn project_ref(&self, id: &str) -> Result<&ResearchProject> {
        self.projects.get(id).ok_or_else(|| GameError::NotFound {
            kind: "research project",
            id: id.to_string(),
        })
    }

    fn project_mut(&mut self, id: &str) -> Result<&mut ResearchProject> {
        self.projects.get_mut(id).ok_or_else(|| GameError::NotFound {
            kind: "research project",
            id: id.to_string(),
        })
    }
}

fn validate_field(field: &ResearchField) -> Result<()> {
    const ENTITY: &str = "research field";
    check::non_empty(ENTITY, "id", &field.id)?;
    check::non_empty(ENTITY, "name", &field.name)?;
    check::in_range(ENTITY, "progress", field.progress, 0.0, COMPLETE)?;
    validate_cost(ENTITY, &field.cost)
}

/// Progress a project gains in one tick at `facility`.
#[must_use]
pub fn progress_rate(project: &ResearchProject, facility: &ResearchFacility) -> f64 {
    let researcher_contribution = f64::from(project.researchers) * 0.05;
    let facility_bonus = facility.efficiency * (f64::from(facility.level) / 10.0);
    0.1 + researcher_contribution * facility_bonus
}

/// Progress granted for collaborating with `partners` partners.
#[must_use]
pub fn collaboration_bonus(partners: usize) -> f64 {
    5.0 * ((partners + 1) as f64).log10()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field(id: &str, name: &str, progress: f64, requirements: &[&str]) -> ResearchField {
        ResearchField {
            id: id.to_string(),
            name: name.to_string(),
            progress,
            cost: ResourceCost::new(),
            requirements: requirements.iter().map(ToString::to_string).collect(),
        }
    }

    fn project(id: &str, field: &str) -> ResearchProject {
        ResearchProject {
            id: id.to_string(),
            name: format!("Project {id}"),
            field: field.to_string(),
            progress: 0.0,
            researchers: 10,
            cost: ResourceCost::new(),
            breakthrough: false,
        }
    }

    fn facility(id: &str, specialization: &str) -> ResearchFacility {
        ResearchFacility {
            id: id.to_string(),
            name: format!("Lab {id}"),
            level: 10,
            capacity: 50.0,
            efficiency: 2.0,
            specialization: specialization.to_string(),
        }
    }

    fn system() -> ResearchSystem {
        let mut system = ResearchSystem::new();
        system.add_field(field("f1", "Physics", 50.0, &[])).unwrap();
        system
            .add_field(field("f2", "Fusion", 0.0, &["f1"]))
            .unwrap();
        system.add_field(field("f3", "Optics", 0.0, &[])).unwrap();
        system.add_facility(facility("lab-1", "Optics")).unwrap();
        system
    }

    #[test]
    fn test_requirements_gate_project_start() {
        let mut system = system();
        let result = system.start_research_project(project("p1", "f2"));
        assert!(matches!(result, Err(GameError::RequirementNotMet { .. })));
        assert!(system.project("p1").is_none());
        assert!(system.start_research_project(project("p3", "f3")).is_ok());
    }

    #[test]
    fn test_unknown_field_rejected() {
        let mut system = system();
        assert!(matches!(
            system.start_research_project(project("p1", "nope")),
            Err(GameError::NotFound { .. })
        ));
    }

    #[test]
    fn test_progress_rate_formula() {
        let p = project("p", "f3");
        let lab = facility("lab", "Optics");
        // 0.1 + 10 * 0.05 * 2.0 * 1.0
        assert!((progress_rate(&p, &lab) - 1.1).abs() < 1e-9);
    }

    #[test]
    fn test_update_without_facility_does_nothing() {
        let mut system = system();
        let mut physics = field("f4", "Chemistry", 0.0, &[]);
        physics.requirements.clear();
        system.add_field(physics).unwrap();
        system.start_research_project(project("p4", "f4")).unwrap();

        system.update_research().unwrap();
        assert_eq!(system.project("p4").unwrap().progress, 0.0);
    }

    #[test]
    fn test_breakthrough_fires_once() {
        let mut system = system();
        system
            .add_technology_tree(TechnologyTree {
                id: "tree".to_string(),
                name: "Light".to_string(),
                nodes: vec![field("f3", "Optics", 0.0, &[]), field("f1", "Physics", 50.0, &[])],
                edges: vec![("f3".to_string(), "f1".to_string())],
            })
            .unwrap();
        let mut nearly = project("p3", "f3");
        nearly.progress = 99.5;
        system.start_research_project(nearly).unwrap();

        system.update_research().unwrap();
        let p3 = system.project("p3").unwrap();
        assert_eq!(p3.progress, COMPLETE);
        assert!(p3.breakthrough);
        assert!(system.field("f3").unwrap().is_complete());

        let tree = system.technology_tree("tree").unwrap();
        assert_eq!(tree.nodes.len(), 2);
        assert_eq!(tree.nodes[0].progress, COMPLETE);

        for _ in 0..5 {
            system.update_research().unwrap();
        }
        let tree = system.technology_tree("tree").unwrap();
        assert_eq!(tree.nodes.len(), 2);
        assert_eq!(tree.nodes.iter().filter(|n| n.id == "f3").count(), 1);
    }

    #[test]
    fn test_start_clears_breakthrough_flag() {
        let mut system = system();
        let mut flagged = project("p3", "f3");
        flagged.breakthrough = true;
        system.start_research_project(flagged).unwrap();
        assert!(!system.project("p3").unwrap().breakthrough);

        for _ in 0..200 {
            system.update_research().unwrap();
        }
        let p3 = system.project("p3").unwrap();
        assert_eq!(p3.progress, COMPLETE);
        assert!(p3.breakthrough);
        assert!(system.field("f3").unwrap().is_complete());
    }

    #[test]
    fn test_allocate_researchers_respects_capacity() {
        let mut system = system();
        system.start_research_project(project("p3", "f3")).unwrap();

        assert!(system.allocate_researchers("p3", 51).is_err());
        assert_eq!(system.project("p3").unwrap().researchers, 10);

        system.allocate_researchers("p3", 30).unwrap();
        assert_eq!(system.project("p3").unwrap().researchers, 30);
        system.allocate_researchers("p3", 5).unwrap();
        assert_eq!(system.project("p3").unwrap().researchers, 5);
    }

    #[test]
    fn test_allocate_without_facility_fails() {
        let mut system = system();
        system.add_field(field("f5", "Botany", 0.0, &[])).unwrap();
        system.start_research_project(project("p5", "f5")).unwrap();
        assert!(system.allocate_researchers("p5", 1).is_err());
    }

    #[test]
    fn test_collaboration_bonus() {
        let mut system = system();
        system.start_research_project(project("p3", "f3")).unwrap();
        let partners: Vec<String> = (0..9).map(|i| format!("n{i}")).collect();
        system.initiate_collaboration("p3", &partners).unwrap();
        // 5 * log10(10) = 5
        assert!((system.project("p3").unwrap().progress - 5.0).abs() < 1e-9);

        system.initiate_collaboration("p3", &[]).unwrap();
        assert!((system.project("p3").unwrap().progress - 5.0).abs() < 1e-9);
        assert!(system.initiate_collaboration("missing", &partners).is_err());
    }

    #[test]
    fn test_upgrade_caps() {
        let mut system = ResearchSystem::new();
        let mut lab = facility("lab", "Optics");
        lab.level = 8;
        lab.capacity = 90.0;
        lab.efficiency = 1.5;
        system.add_facility(lab).unwrap();

        system
            .upgrade_facility(
                "lab",
                FacilityUpgrade {
                    level: Some(5),
                    capacity: Some(25.0),
                    efficiency: Some(1.0),
                },
            )
            .unwrap();
        let lab = system.facility("lab").unwrap();
        assert_eq!(lab.level, MAX_FACILITY_LEVEL);
        assert_eq!(lab.capacity, MAX_FACILITY_CAPACITY);
        assert_eq!(lab.efficiency, MAX_FACILITY_EFFICIENCY);

        assert!(system
            .upgrade_facility("ghost", FacilityUpgrade::default())
            .is_err());
    }

    #[test]
    fn test_facility_validation() {
        let mut system = ResearchSystem::new();
        let mut lab = facility("lab", "Optics");
        lab.level = 0;
        assert!(system.add_facility(lab.clone()).is_err());
        lab.level = 3;
        lab.efficiency = 2.5;
        assert!(system.add_facility(lab).is_err());
        assert!(system.facilities().is_empty());
    }

    #[test]
    fn test_research_actions() {
        let mut system = system();
        system.start_research_project(project("p3", "f3")).unwrap();

        system
            .process_research_action(ResearchAction::AllocateResources(30.0), "p3")
            .unwrap();
        system
            .process_research_action(ResearchAction::AdjustResearchers(-25), "p3")
            .unwrap();
        let p3 = system.project("p3").unwrap();
        assert_eq!(p3.progress, 30.0);
        assert_eq!(p3.researchers, 0);
    }

    #[test]
    fn test_collaboration_completion_triggers_breakthrough_on_next_tick() {
        let mut system = system();
        let mut p = project("p3", "f3");
        p.progress = 98.0;
        system.start_research_project(p).unwrap();
        system
            .initiate_collaboration("p3", &["a".to_string(), "b".to_string()])
            .unwrap();
        assert_eq!(system.project("p3").unwrap().progress, COMPLETE);
        assert!(!system.field("f3").unwrap().is_complete());

        system.update_research().unwrap();
        assert!(system.field("f3").unwrap().is_complete());
    }
}
