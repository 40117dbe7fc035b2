//! Environmental and resource metrics.
//!
//! Two singleton records of bounded scalars. Every public mutator leaves all
//! eight values inside `[0, 100]`.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{check, GameError, Result};
use crate::registry::{Identified, Registry};
use crate::resources::{validate_cost, ResourceCost};

/// Lower bound of every metric.
pub const METRIC_MIN: f64 = 0.0;

/// Upper bound of every metric.
pub const METRIC_MAX: f64 = 100.0;

/// Name of a metric in either record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    /// Global pollution.
    Pollution,
    /// Global sustainability.
    Sustainability,
    /// Global biodiversity.
    Biodiversity,
    /// Global climate stability.
    ClimateStability,
    /// Renewable energy supply.
    RenewableEnergy,
    /// Raw material stockpile.
    RawMaterials,
    /// Water quality.
    WaterQuality,
    /// Air quality.
    AirQuality,
}

impl Metric {
    /// All metrics, environmental first.
    pub const ALL: [Self; 8] = [
        Self::Pollution,
        Self::Sustainability,
        Self::Biodiversity,
        Self::ClimateStability,
        Self::RenewableEnergy,
        Self::RawMaterials,
        Self::WaterQuality,
        Self::AirQuality,
    ];

    /// Snake-case name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Pollution => "pollution",
            Self::Sustainability => "sustainability",
            Self::Biodiversity => "biodiversity",
            Self::ClimateStability => "climate_stability",
            Self::RenewableEnergy => "renewable_energy",
            Self::RawMaterials => "raw_materials",
            Self::WaterQuality => "water_quality",
            Self::AirQuality => "air_quality",
        }
    }

    /// Whether the metric lives in the [`ResourceMetrics`] record.
    #[must_use]
    pub const fn is_resource(self) -> bool {
        matches!(
            self,
            Self::RenewableEnergy | Self::RawMaterials | Self::WaterQuality | Self::AirQuality
        )
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Metric {
    type Err = GameError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|m| m.name() == s)
            .ok_or_else(|| GameError::UnknownName {
                kind: "metric",
                name: s.to_string(),
            })
    }
}

/// Global environmental health.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvironmentalMetrics {
    /// Pollution level.
    pub pollution: f64,
    /// Sustainability score.
    pub sustainability: f64,
    /// Biodiversity score.
    pub biodiversity: f64,
    /// Climate stability score.
    pub climate_stability: f64,
}

impl Default for EnvironmentalMetrics {
    fn default() -> Self {
        Self {
            pollution: 50.0,
            sustainability: 50.0,
            biodiversity: 50.0,
            climate_stability: 50.0,
        }
    }
}

impl EnvironmentalMetrics {
    /// Mutable access to a metric held by this record.
    pub fn get_mut(&mut self, metric: Metric) -> Option<&mut f64> {
        match metric {
            Metric::Pollution => Some(&mut self.pollution),
            Metric::Sustainability => Some(&mut self.sustainability),
            Metric::Biodiversity => Some(&mut self.biodiversity),
            Metric::ClimateStability => Some(&mut self.climate_stability),
            _ => None,
        }
    }

    /// Value of a metric held by this record.
    #[must_use]
    pub fn get(&self, metric: Metric) -> Option<f64> {
        let mut copy = *self;
        copy.get_mut(metric).map(|v| *v)
    }

    fn values_mut(&mut self) -> [&mut f64; 4] {
        [
            &mut self.pollution,
            &mut self.sustainability,
            &mut self.biodiversity,
            &mut self.climate_stability,
        ]
    }
}

/// Natural resource health.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResourceMetrics {
    /// Renewable energy supply.
    pub renewable_energy: f64,
    /// Raw material stockpile.
    pub raw_materials: f64,
    /// Water quality.
    pub water_quality: f64,
    /// Air quality.
    pub air_quality: f64,
}

impl Default for ResourceMetrics {
    fn default() -> Self {
        Self {
            renewable_energy: 20.0,
            raw_materials: 100.0,
            water_quality: 80.0,
            air_quality: 70.0,
        }
    }
}

impl ResourceMetrics {
    /// Mutable access to a metric held by this record.
    pub fn get_mut(&mut self, metric: Metric) -> Option<&mut f64> {
        match metric {
            Metric::RenewableEnergy => Some(&mut self.renewable_energy),
            Metric::RawMaterials => Some(&mut self.raw_materials),
            Metric::WaterQuality => Some(&mut self.water_quality),
            Metric::AirQuality => Some(&mut self.air_quality),
            _ => None,
        }
    }

    /// Value of a metric held by this record.
    #[must_use]
    pub fn get(&self, metric: Metric) -> Option<f64> {
        let mut copy = *self;
        copy.get_mut(metric).map(|v| *v)
    }

    fn values_mut(&mut self) -> [&mut f64; 4] {
        [
            &mut self.renewable_energy,
            &mut self.raw_materials,
            &mut self.water_quality,
            &mut self.air_quality,
        ]
    }
}

/// A climate event. Applied once on registration, then kept until cleared.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClimateEvent {
    /// Unique identifier.
    pub id: String,
    /// Event type (e.g. "drought").
    pub kind: String,
    /// Severity in `[0, 100]`; scales every effect by `severity / 100`.
    pub severity: f64,
    /// Duration in milliseconds. Must be positive.
    pub duration: u64,
    /// Amount subtracted from each named metric at full severity.
    #[serde(default)]
    pub effects: BTreeMap<Metric, f64>,
}

impl Identified for ClimateEvent {
    fn id(&self) -> &str {
        &self.id
    }
}

/// An environmental policy. Applied once on registration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentalPolicy {
    /// Unique identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Cost of enacting the policy.
    #[serde(default)]
    pub cost: ResourceCost,
    /// Amount added to each environmental metric. Resource keys are ignored.
    #[serde(default)]
    pub effects: BTreeMap<Metric, f64>,
}

impl Identified for EnvironmentalPolicy {
    fn id(&self) -> &str {
        &self.id
    }
}

/// Ways to manage a natural resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceAction {
    /// Take from the stockpile. Fails if the balance is insufficient.
    Extract,
    /// Recover half the amount.
    Conserve,
    /// Recover the full amount and lift biodiversity.
    Restore,
}

impl FromStr for ResourceAction {
    type Err = GameError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "extract" => Ok(Self::Extract),
            "conserve" => Ok(Self::Conserve),
            "restore" => Ok(Self::Restore),
            _ => Err(GameError::UnknownName {
                kind: "resource action",
                name: s.to_string(),
            }),
        }
    }
}

/// Owns both metric records, active events and policies.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EnvironmentSystem {
    global: EnvironmentalMetrics,
    resources: ResourceMetrics,
    active_events: Registry<ClimateEvent>,
    active_policies: Registry<EnvironmentalPolicy>,
}

impl EnvironmentSystem {
    /// Create a system with default starting metrics.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a system with the given starting metrics, clamped into range.
    ///
    /// A non-finite value is replaced by that metric's default.
    #[must_use]
    pub fn with_metrics(global: EnvironmentalMetrics, resources: ResourceMetrics) -> Self {
        let defaults = Self::default();
        let mut system = Self {
            global,
            resources,
            ..Self::default()
        };
        for metric in Metric::ALL {
            let slot = system
                .global
                .get_mut(metric)
                .or_else(|| system.resources.get_mut(metric));
            if let Some(slot) = slot.filter(|value| !value.is_finite()) {
                tracing::warn!(%metric, value = *slot, "non-finite starting metric replaced by default");
                *slot = defaults.metric(metric);
            }
        }
        system.normalize_metrics();
        system
    }

    /// Add `value` to one metric, clamping it into range.
    pub fn process_environmental_action(&mut self, target: Metric, value: f64) -> Result<()> {
        check::finite("environmental action", "value", value)?;
        let slot = self.slot_mut(target);
        *slot = (*slot + value).clamp(METRIC_MIN, METRIC_MAX);
        Ok(())
    }

    /// Per-tick environment pass: a zero-delta touch of climate stability,
    /// which re-normalises the records.
    pub fn update_environment(&mut self) -> Result<()> {
        self.process_environmental_action(Metric::ClimateStability, 0.0)?;
        self.normalize_metrics();
        Ok(())
    }

    /// Register a policy and apply its effects once.
    pub fn implement_environmental_policy(&mut self, policy: EnvironmentalPolicy) -> Result<()> {
        const ENTITY: &str = "environmental policy";
        check::non_empty(ENTITY, "id", &policy.id)?;
        check::non_empty(ENTITY, "name", &policy.name)?;
        validate_cost(ENTITY, &policy.cost)?;
        check::all_finite(ENTITY, policy.effects.iter().map(|(k, v)| (k.name(), *v)))?;

        for (metric, effect) in &policy.effects {
            if let Some(value) = self.global.get_mut(*metric) {
                *value += effect;
            }
        }
        self.normalize_metrics();
        tracing::debug!(id = %policy.id, "environmental policy implemented");
        self.active_policies.insert(policy);
        Ok(())
    }

    /// Extract, conserve or restore a resource.
    pub fn manage_resources(
        &mut self,
        action: ResourceAction,
        resource: Metric,
        amount: f64,
    ) -> Result<()> {
        check::non_negative("resource management", "amount", amount)?;
        if !resource.is_resource() {
            return Err(GameError::UnknownName {
                kind: "resource metric",
                name: resource.name().to_string(),
            });
        }

        let balance = self.resources.get(resource).unwrap_or_default();
        match action {
            ResourceAction::Extract => {
                if balance < amount {
                    return Err(GameError::InsufficientResource {
                        resource: resource.name(),
                        required: amount,
                        available: balance,
                    });
                }
                *self.slot_mut(resource) -= amount;
                self.global.sustainability -= amount * 0.1;
            }
            ResourceAction::Conserve => {
                let slot = self.slot_mut(resource);
                *slot = (*slot + amount * 0.5).min(METRIC_MAX);
                self.global.sustainability += amount * 0.05;
            }
            ResourceAction::Restore => {
                let slot = self.slot_mut(resource);
                *slot = (*slot + amount).min(METRIC_MAX);
                self.global.sustainability += amount * 0.1;
                self.global.biodiversity += amount * 0.05;
            }
        }

        self.normalize_metrics();
        Ok(())
    }

    /// Register a climate event and subtract its severity-scaled effects once.
    pub fn respond_to_climate_event(&mut self, event: ClimateEvent) -> Result<()> {
        const ENTITY: &str = "climate event";
        check::non_empty(ENTITY, "id", &event.id)?;
        check::non_empty(ENTITY, "kind", &event.kind)?;
        check::in_range(ENTITY, "severity", event.severity, 0.0, 100.0)?;
        if event.duration == 0 {
            return Err(GameError::OutOfRange {
                entity: ENTITY,
                field: "duration",
                value: 0.0,
                min: 1.0,
                max: f64::MAX,
            });
        }
        check::all_finite(ENTITY, event.effects.iter().map(|(k, v)| (k.name(), *v)))?;

        let scale = event.severity / 100.0;
        for (metric, effect) in &event.effects {
            *self.slot_mut(*metric) -= effect * scale;
        }
        self.normalize_metrics();
        tracing::info!(id = %event.id, kind = %event.kind, severity = event.severity, "climate event applied");
        self.active_events.insert(event);
        Ok(())
    }

    /// Remove an event from the active set. Its effects are not reverted.
    pub fn clear_climate_event(&mut self, event_id: &str) -> Result<()> {
        self.active_events
            .remove(event_id)
            .map(|_| ())
            .ok_or_else(|| GameError::NotFound {
                kind: "climate event",
                id: event_id.to_string(),
            })
    }

    /// Invest in green technology to lift an environmental metric.
    ///
    /// `efficiency = 0.1 * log10(investment) / 10 * technology_bonus`; the
    /// target gains `efficiency` and renewable energy gains half of it.
    pub fn invest_in_green_technology(
        &mut self,
        technology: &str,
        investment: f64,
        target: Metric,
    ) -> Result<()> {
        check::positive("green investment", "investment", investment)?;
        if target.is_resource() {
            return Err(GameError::UnknownName {
                kind: "environmental metric",
                name: target.name().to_string(),
            });
        }

        let efficiency = investment_efficiency(technology, investment);
        *self.slot_mut(target) += efficiency;
        self.resources.renewable_energy += efficiency * 0.5;
        self.normalize_metrics();
        Ok(())
    }

    /// Copy of the environmental record.
    #[must_use]
    pub fn global_metrics(&self) -> EnvironmentalMetrics {
        self.global
    }

    /// Copy of the resource record.
    #[must_use]
    pub fn resource_metrics(&self) -> ResourceMetrics {
        self.resources
    }

    /// Value of any metric.
    #[must_use]
    pub fn metric(&self, metric: Metric) -> f64 {
        self.global
            .get(metric)
            .or_else(|| self.resources.get(metric))
            .unwrap_or_default()
    }

    /// Active climate events, in ID order.
    #[must_use]
    pub fn active_events(&self) -> Vec<ClimateEvent> {
        self.active_events.sorted_values()
    }

    /// Active policies, in ID order.
    #[must_use]
    pub fn active_policies(&self) -> Vec<EnvironmentalPolicy> {
        self.active_policies.sorted_values()
    }

    pub(crate) fn hash_into<H: std::hash::Hasher>(&self, hasher: &mut H) {
        for metric in Metric::ALL {
            hasher.write_u64(self.metric(metric).to_bits());
        }
        self.active_events.hash_into(hasher);
        self.active_policies.hash_into(hasher);
    }

    fn slot_mut(&mut self, metric: Metric) -> &mut f64 {
        if metric.is_resource() {
            match metric {
                Metric::RenewableEnergy => &mut self.resources.renewable_energy,
                Metric::RawMaterials => &mut self.resources.raw_materials,
                Metric::WaterQuality => &mut self.resources.water_quality,
                _ => &mut self.resources.air_quality,
            }
        } else {
            match metric {
                Metric::Pollution => &mut self.global.pollution,
                Metric::Sustainability => &mut self.global.sustainability,
                Metric::Biodiversity => &mut self.global.biodiversity,
                _ => &mut self.global.climate_stability,
            }
        }
    }

    fn normalize_metrics(&mut self) {
        for value in self
            .global
            .values_mut()
            .into_iter()
            .chain(self.resources.values_mut())
        {
            *value = value.clamp(METRIC_MIN, METRIC_MAX);
        }
    }
}

/// Per-technology multiplier. Every technology currently scores 1.0.
fn technology_bonus(_technology: &str) -> f64 {
    1.0
}

fn investment_efficiency(technology: &str, investment: f64) -> f64 {
    0.1 * (investment.log10() / 10.0) * technology_bonus(technology)
}
