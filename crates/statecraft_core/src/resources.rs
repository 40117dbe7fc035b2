//! Resource types used to price operations, projects and policies.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{check, GameError, Result};

/// A spendable national resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceType {
    /// Treasury funds.
    Money,
    /// Political capital.
    Influence,
    /// Technological capacity.
    Technology,
    /// Military capacity.
    Military,
}

impl ResourceType {
    /// All resource types, in declaration order.
    pub const ALL: [Self; 4] = [Self::Money, Self::Influence, Self::Technology, Self::Military];

    /// Snake-case name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Money => "money",
            Self::Influence => "influence",
            Self::Technology => "technology",
            Self::Military => "military",
        }
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ResourceType {
    type Err = GameError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|r| r.name() == s)
            .ok_or_else(|| GameError::UnknownName {
                kind: "resource type",
                name: s.to_string(),
            })
    }
}

/// Cost of something, per resource type.
pub type ResourceCost = BTreeMap<ResourceType, f64>;

/// Check every entry of a cost map is finite and not negative.
pub(crate) fn validate_cost(entity: &'static str, cost: &ResourceCost) -> Result<()> {
    for (resource, amount) in cost {
        check::finite(entity, resource.name(), *amount)?;
        if *amount < 0.0 {
            return Err(GameError::OutOfRange {
                entity,
                field: "cost",
                value: *amount,
                min: 0.0,
                max: f64::MAX,
            });
        }
    }
    Ok(())
}
