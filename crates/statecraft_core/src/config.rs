//! Engine configuration.
//!
//! Configuration is plain data, normally written in RON:
//!
//! ```ron
//! (
//!     tick_interval_ms: 250,
//!     viewer: "aurelia",
//! )
//! ```
//!
//! Every field has a default, so an empty `()` is a valid configuration.

use serde::{Deserialize, Serialize};

use crate::diplomacy::DEFAULT_HISTORY_LIMIT;
use crate::environment::{EnvironmentalMetrics, Metric, ResourceMetrics};
use crate::error::{check, GameError, Result};

/// Shortest permitted tick interval.
pub const MIN_TICK_INTERVAL_MS: u64 = 100;

/// Tick interval used when none is configured.
pub const DEFAULT_TICK_INTERVAL_MS: u64 = 1000;

/// Viewer used when none is configured.
pub const DEFAULT_VIEWER: &str = "player";

/// Tunables for a [`GameEngine`](crate::engine::GameEngine).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Milliseconds between tick starts. Raised to [`MIN_TICK_INTERVAL_MS`]
    /// if lower.
    pub tick_interval_ms: u64,
    /// Nation whose pending diplomatic actions appear in snapshots.
    pub viewer: String,
    /// Diplomatic actions kept in history.
    pub history_limit: usize,
    /// Starting global metrics.
    pub initial_environment: EnvironmentalMetrics,
    /// Starting resource metrics.
    pub initial_resources: ResourceMetrics,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: DEFAULT_TICK_INTERVAL_MS,
            viewer: DEFAULT_VIEWER.to_string(),
            history_limit: DEFAULT_HISTORY_LIMIT,
            initial_environment: EnvironmentalMetrics::default(),
            initial_resources: ResourceMetrics::default(),
        }
    }
}

impl EngineConfig {
    /// Parse a RON document. The tick interval is floored at
    /// [`MIN_TICK_INTERVAL_MS`]; non-finite starting metrics are rejected.
    pub fn from_ron_str(ron: &str) -> Result<Self> {
        let mut config: Self = ron::from_str(ron).map_err(|e| GameError::DataParseError {
            path: "<engine config>".to_string(),
            message: e.to_string(),
        })?;
        config.tick_interval_ms = clamp_tick_interval(config.tick_interval_ms);
        config.validate()?;
        Ok(config)
    }

    /// Check every starting metric is a finite number.
    pub fn validate(&self) -> Result<()> {
        check::all_finite(
            "engine config",
            Metric::ALL.into_iter().filter_map(|metric| {
                self.initial_environment
                    .get(metric)
                    .or_else(|| self.initial_resources.get(metric))
                    .map(|value| (metric.name(), value))
            }),
        )
    }

    /// Builder-style tick interval override, floored at [`MIN_TICK_INTERVAL_MS`].
    #[must_use]
    pub fn with_tick_interval(mut self, ms: u64) -> Self {
        self.tick_interval_ms = clamp_tick_interval(ms);
        self
    }

    /// Builder-style viewer override.
    #[must_use]
    pub fn with_viewer(mut self, viewer: impl Into<String>) -> Self {
        self.viewer = viewer.into();
        self
    }
}

/// Apply the tick interval floor.
#[must_use]
pub const fn clamp_tick_interval(ms: u64) -> u64 {
    if ms < MIN_TICK_INTERVAL_MS {
        MIN_TICK_INTERVAL_MS
    } else {
        ms
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document_uses_defaults() {
        let config = EngineConfig::from_ron_str("()").unwrap();
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.viewer, "player");
        assert_eq!(config.initial_resources.raw_materials, 100.0);
    }

    #[test]
    fn test_tick_interval_floor() {
        let config = EngineConfig::from_ron_str("(tick_interval_ms: 20)").unwrap();
        assert_eq!(config.tick_interval_ms, MIN_TICK_INTERVAL_MS);
        assert_eq!(EngineConfig::default().with_tick_interval(250).tick_interval_ms, 250);
        assert_eq!(clamp_tick_interval(0), 100);
    }

    #[test]
    fn test_partial_metrics() {
        let config = EngineConfig::from_ron_str(
            "(viewer: \"aurelia\", initial_resources: (water_quality: 10.0))",
        )
        .unwrap();
        assert_eq!(config.viewer, "aurelia");
        assert_eq!(config.initial_resources.water_quality, 10.0);
        assert_eq!(config.initial_resources.air_quality, 70.0);
    }

    #[test]
    fn test_nan_metric_rejected() {
        let err = EngineConfig::from_ron_str("(initial_environment: (pollution: NaN))").unwrap_err();
        assert_eq!(
            err,
            GameError::NonFinite {
                entity: "engine config",
                field: "pollution".to_string(),
            }
        );
        assert!(EngineConfig::default().validate().is_ok());
    }

    #[test]
    fn test_parse_error() {
        let err = EngineConfig::from_ron_str("(tick_interval_ms: \"fast\")").unwrap_err();
        assert!(matches!(err, GameError::DataParseError { .. }));
    }
}
