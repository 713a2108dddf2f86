use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::notify::Severity;

/// Kind of proximity alert
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum AlertType {
    /// Crossed the approaching threshold (default 200 m) inbound
    Approaching,
    /// Crossed the warning threshold (default 100 m) inbound
    Warning,
    /// Entered the geofence radius
    Entered,
    /// Left the geofence radius
    Exited,
}

impl AlertType {
    /// Notification title. Together with the type this is the cooldown key.
    pub fn title(&self) -> &'static str {
        match self {
            AlertType::Approaching => "Approaching delivery",
            AlertType::Warning => "Almost at delivery",
            AlertType::Entered => "Arrived at delivery",
            AlertType::Exited => "Left delivery area",
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            AlertType::Approaching => Severity::Info,
            AlertType::Warning => Severity::Warning,
            AlertType::Entered => Severity::Success,
            AlertType::Exited => Severity::Warning,
        }
    }
}

/// One recorded alert
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProximityAlert {
    pub id: String,
    #[serde(rename = "type")]
    pub alert_type: AlertType,
    pub distance_meters: f64,
    pub threshold_meters: f64,
    pub timestamp_millis: i64,
    pub geofence_id: String,
    pub delivery_id: String,
    pub folio: String,
    pub client_name: String,
}

impl ProximityAlert {
    /// Notification body shown to the driver
    pub fn body(&self) -> String {
        match self.alert_type {
            AlertType::Approaching | AlertType::Warning => format!(
                "{} (folio {}): {:.0}m away",
                self.client_name, self.folio, self.distance_meters
            ),
            AlertType::Entered => format!(
                "{} (folio {}): you can now complete the delivery",
                self.client_name, self.folio
            ),
            AlertType::Exited => format!(
                "{} (folio {}): {:.0}m from the delivery point",
                self.client_name, self.folio, self.distance_meters
            ),
        }
    }
}

/// Distance thresholds for the level-based alerts, in meters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AlertThresholds {
    pub approaching_meters: f64,
    pub warning_meters: f64,
}

impl Default for AlertThresholds {
    fn default() -> Self {
        AlertThresholds {
            approaching_meters: 200.0,
            warning_meters: 100.0,
        }
    }
}

impl AlertThresholds {
    /// Thresholds in descending order, the order they are checked in
    pub fn descending(&self) -> [(AlertType, f64); 2] {
        [
            (AlertType::Approaching, self.approaching_meters),
            (AlertType::Warning, self.warning_meters),
        ]
    }
}

/// Where the driver is relative to a geofence
///
/// ```text
///  Far  >  approaching  >=  Approaching  >  warning  >=  Warning  >  radius  >=  Inside
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ProximityZone {
    Far,
    Approaching,
    Warning,
    Inside,
}

impl ProximityZone {
    pub fn classify(distance_meters: f64, radius_meters: f64, thresholds: &AlertThresholds) -> Self {
        if distance_meters <= radius_meters {
            ProximityZone::Inside
        } else if distance_meters <= thresholds.warning_meters {
            ProximityZone::Warning
        } else if distance_meters <= thresholds.approaching_meters {
            ProximityZone::Approaching
        } else {
            ProximityZone::Far
        }
    }

    /// Only `Inside` permits completing the delivery
    pub fn is_authorized(&self) -> bool {
        matches!(self, ProximityZone::Inside)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify() {
        let t = AlertThresholds::default();
        assert_eq!(ProximityZone::classify(500.0, 50.0, &t), ProximityZone::Far);
        assert_eq!(ProximityZone::classify(200.0, 50.0, &t), ProximityZone::Approaching);
        assert_eq!(ProximityZone::classify(150.0, 50.0, &t), ProximityZone::Approaching);
        assert_eq!(ProximityZone::classify(100.0, 50.0, &t), ProximityZone::Warning);
        assert_eq!(ProximityZone::classify(50.0, 50.0, &t), ProximityZone::Inside);
        assert!(ProximityZone::Inside.is_authorized());
        assert!(!ProximityZone::Warning.is_authorized());
    }

    #[test]
    fn test_descending() {
        let order = AlertThresholds::default().descending();
        assert_eq!(order[0], (AlertType::Approaching, 200.0));
        assert_eq!(order[1], (AlertType::Warning, 100.0));
    }

    #[test]
    fn test_alert_json() {
        let alert = ProximityAlert {
            id: "x".to_string(),
            alert_type: AlertType::Warning,
            distance_meters: 95.2,
            threshold_meters: 100.0,
            timestamp_millis: 10,
            geofence_id: "G".to_string(),
            delivery_id: "D".to_string(),
            folio: "F7".to_string(),
            client_name: "Ana".to_string(),
        };
        let json = serde_json::to_value(&alert).unwrap();
        assert_eq!(json["type"], "warning");
        assert_eq!(json["thresholdMeters"], 100.0);
        assert_eq!(alert.body(), "Ana (folio F7): 95m away");
    }
}
