//! Tracker configuration
//!
//! Every field has a default, so a partial JSON document (or none at all)
//! yields a usable configuration.

use serde::{Deserialize, Serialize};

use crate::alerts::{AlertThresholds, DEFAULT_COOLDOWN_MS, DEFAULT_HISTORY_CAPACITY};
use crate::error::ConfigError;
use crate::location::SamplingProfile;
use crate::registry::DEFAULT_RADIUS_METERS;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TrackerConfig {
    /// Radius used when a geofence is created without one
    pub default_radius_meters: f64,
    pub thresholds: AlertThresholds,
    /// Minimum spacing between identical notifications
    pub notification_cooldown_ms: u64,
    pub alert_history_capacity: usize,
    /// Profile requested when tracking starts
    pub sampling_profile: SamplingProfile,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        TrackerConfig {
            default_radius_meters: DEFAULT_RADIUS_METERS,
            thresholds: AlertThresholds::default(),
            notification_cooldown_ms: DEFAULT_COOLDOWN_MS,
            alert_history_capacity: DEFAULT_HISTORY_CAPACITY,
            sampling_profile: SamplingProfile::Foreground,
        }
    }
}

impl TrackerConfig {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.default_radius_meters > 0.0) {
            return Err(ConfigError::InvalidRadius(self.default_radius_meters));
        }
        let t = &self.thresholds;
        if !(t.approaching_meters > t.warning_meters) || !(t.warning_meters > 0.0) {
            return Err(ConfigError::ThresholdOrder {
                approaching: t.approaching_meters,
                warning: t.warning_meters,
            });
        }
        if self.alert_history_capacity == 0 {
            return Err(ConfigError::EmptyHistory);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = TrackerConfig::default();
        assert_eq!(config.default_radius_meters, 50.0);
        assert_eq!(config.thresholds.approaching_meters, 200.0);
        assert_eq!(config.thresholds.warning_meters, 100.0);
        assert_eq!(config.notification_cooldown_ms, 30_000);
        assert_eq!(config.alert_history_capacity, 50);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json() {
        let config = TrackerConfig::from_json(
            r#"{"defaultRadiusMeters": 75, "thresholds": {"warningMeters": 120}, "samplingProfile": "background"}"#,
        )
        .unwrap();
        assert_eq!(config.default_radius_meters, 75.0);
        assert_eq!(config.thresholds.approaching_meters, 200.0);
        assert_eq!(config.thresholds.warning_meters, 120.0);
        assert_eq!(config.sampling_profile, SamplingProfile::Background);
        assert_eq!(config.notification_cooldown_ms, 30_000);
    }

    #[test]
    fn test_validate() {
        let mut config = TrackerConfig::default();
        config.default_radius_meters = 0.0;
        assert_eq!(config.validate(), Err(ConfigError::InvalidRadius(0.0)));

        let mut config = TrackerConfig::default();
        config.thresholds.warning_meters = 250.0;
        assert!(matches!(config.validate(), Err(ConfigError::ThresholdOrder { .. })));

        let mut config = TrackerConfig::default();
        config.alert_history_capacity = 0;
        assert_eq!(config.validate(), Err(ConfigError::EmptyHistory));
    }
}
