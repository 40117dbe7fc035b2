//! Intelligence operations and report analysis.
//!
//! Operations are launched after validation and stay active until they are
//! concluded explicitly. Reports are stored permanently; analysing one yields
//! an insight map that weights every numeric payload field by the report's
//! reliability.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::clock::Millis;
use crate::error::{check, GameError, Result};
use crate::registry::{Identified, Registry};
use crate::resources::{validate_cost, ResourceCost};

/// Derived insight values keyed by payload field.
pub type Insights = BTreeMap<String, f64>;

/// A covert operation against a target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntelligenceOperation {
    /// Unique identifier.
    pub id: String,
    /// Operation type (e.g. "surveillance", "sabotage").
    pub kind: String,
    /// Resources committed to the operation.
    #[serde(default)]
    pub cost: ResourceCost,
    /// Planned duration in milliseconds. Must be positive.
    pub duration: Millis,
    /// Probability of success in `[0, 1]`.
    pub success_rate: f64,
    /// Target nation or asset.
    pub target: String,
}

impl Identified for IntelligenceOperation {
    fn id(&self) -> &str {
        &self.id
    }
}

/// A gathered intelligence report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Intelligence {
    /// Unique identifier.
    pub id: String,
    /// Report type.
    pub kind: String,
    /// Who supplied the report.
    pub source: String,
    /// Who the report is about.
    pub target: String,
    /// Reliability in `[0, 1]`.
    pub reliability: f64,
    /// When the report was gathered.
    pub timestamp: Millis,
    /// Opaque payload. Only numeric entries feed into insights.
    #[serde(default)]
    pub data: BTreeMap<String, Value>,
}

impl Identified for Intelligence {
    fn id(&self) -> &str {
        &self.id
    }
}

/// Owns all operations and reports.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IntelligenceSystem {
    operations: Registry<IntelligenceOperation>,
    reports: Registry<Intelligence>,
    active: BTreeSet<String>,
}

impl IntelligenceSystem {
    /// Create an empty system.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate and launch an operation. The operation becomes active.
    pub fn launch_operation(&mut self, operation: IntelligenceOperation) -> Result<()> {
        validate_operation(&operation)?;
        tracing::debug!(id = %operation.id, target = %operation.target, "intelligence operation launched");
        self.active.insert(operation.id.clone());
        self.operations.insert(operation);
        Ok(())
    }

    /// Deploy an asset in support of an active operation.
    ///
    /// Deployment has no state effect of its own; it only confirms the
    /// operation can receive assets.
    pub fn deploy_asset(&self, operation_id: &str, asset_type: &str) -> Result<()> {
        check::non_empty("asset", "type", asset_type)?;
        if !self.active.contains(operation_id) || !self.operations.contains(operation_id) {
            return Err(GameError::NotFound {
                kind: "active operation",
                id: operation_id.to_string(),
            });
        }
        tracing::debug!(operation = operation_id, asset_type, "asset deployed");
        Ok(())
    }

    /// Remove an operation from the active set. The record is kept.
    pub fn conclude_operation(&mut self, operation_id: &str) -> Result<()> {
        if !self.active.remove(operation_id) {
            return Err(GameError::NotFound {
                kind: "active operation",
                id: operation_id.to_string(),
            });
        }
        Ok(())
    }

    /// Store a report and derive insights from it.
    ///
    /// Each numeric payload field becomes `value * reliability`; everything
    /// else is dropped.
    pub fn analyze_intelligence(&mut self, intel: Intelligence) -> Result<Insights> {
        validate_intelligence(&intel)?;
        let insights = calculate_insights(&intel);
        self.reports.insert(intel);
        Ok(insights)
    }

    /// Start counter-measures against a known report's originator.
    pub fn initiate_counter_measures(&self, intel_id: &str) -> Result<()> {
        let Some(intel) = self.reports.get(intel_id) else {
            return Err(GameError::NotFound {
                kind: "intelligence",
                id: intel_id.to_string(),
            });
        };
        tracing::debug!(intel = intel_id, source = %intel.source, "counter-measures initiated");
        Ok(())
    }

    /// Active operations, in ID order.
    #[must_use]
    pub fn active_operations(&self) -> Vec<IntelligenceOperation> {
        self.active
            .iter()
            .filter_map(|id| self.operations.get(id).cloned())
            .collect()
    }

    /// Look up an operation, active or concluded.
    #[must_use]
    pub fn operation(&self, id: &str) -> Option<&IntelligenceOperation> {
        self.operations.get(id)
    }

    /// All stored reports about `target`, in ID order.
    #[must_use]
    pub fn intelligence_by_target(&self, target: &str) -> Vec<Intelligence> {
        self.reports
            .iter_sorted()
            .filter(|intel| intel.target == target)
            .cloned()
            .collect()
    }

    pub(crate) fn hash_into<H: std::hash::Hasher>(&self, hasher: &mut H) {
        self.operations.hash_into(hasher);
        self.reports.hash_into(hasher);
        for id in &self.active {
            hasher.write(id.as_bytes());
        }
    }
}

fn validate_operation(operation: &IntelligenceOperation) -> Result<()> {
    const ENTITY: &str = "intelligence operation";
    check::non_empty(ENTITY, "id", &operation.id)?;
    check::non_empty(ENTITY, "kind", &operation.kind)?;
    validate_cost(ENTITY, &operation.cost)?;
    if operation.duration == 0 {
        return Err(GameError::OutOfRange {
            entity: ENTITY,
            field: "duration",
            value: 0.0,
            min: 1.0,
            max: f64::MAX,
        });
    }
    check::in_range(ENTITY, "success_rate", operation.success_rate, 0.0, 1.0)
}

fn validate_intelligence(intel: &Intelligence) -> Result<()> {
    const ENTITY: &str = "intelligence";
    check::non_empty(ENTITY, "id", &intel.id)?;
    check::non_empty(ENTITY, "kind", &intel.kind)?;
    check::non_empty(ENTITY, "source", &intel.source)?;
    check::non_empty(ENTITY, "target", &intel.target)?;
    check::in_range(ENTITY, "reliability", intel.reliability, 0.0, 1.0)
}

fn calculate_insights(intel: &Intelligence) -> Insights {
    intel
        .data
        .iter()
        .filter_map(|(key, value)| {
            value
                .as_f64()
                .map(|number| (key.clone(), number * intel.reliability))
        })
        .collect()
}
