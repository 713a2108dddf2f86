//! Delivery Authorization
//!
//! Reduces the edge-triggered statuses of the tracked geofence to the one
//! value the application reads to enable or disable "complete delivery".
//! Authorization is granted only as a direct consequence of an inside status.

use serde::{Deserialize, Serialize};

use crate::evaluator::GeofenceStatus;
use crate::events::{CurrentValue, SubscriptionId};
use crate::registry::{Geofence, DEFAULT_RADIUS_METERS};

pub const REASON_INSIDE: &str = "Driver inside delivery area";
pub const REASON_WAITING: &str = "Waiting for location";
pub const REASON_PERMISSIONS: &str = "Permissions required";
pub const REASON_REMOVED: &str = "Geofence removed";

/// Current authorization decision
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryAuthorizationStatus {
    pub is_authorized: bool,
    pub reason: String,
    pub distance_meters: f64,
    pub required_distance_meters: f64,
    pub geofence_id: Option<String>,
}

impl DeliveryAuthorizationStatus {
    fn unauthorized(reason: &str) -> Self {
        DeliveryAuthorizationStatus {
            is_authorized: false,
            reason: reason.to_string(),
            distance_meters: 0.0,
            required_distance_meters: DEFAULT_RADIUS_METERS,
            geofence_id: None,
        }
    }

    /// Initial state before any sample has arrived
    pub fn waiting_for_location() -> Self {
        Self::unauthorized(REASON_WAITING)
    }

    /// A geofence is selected but has not been evaluated yet
    pub fn waiting_for(geofence: &Geofence) -> Self {
        DeliveryAuthorizationStatus {
            required_distance_meters: geofence.radius_meters,
            geofence_id: Some(geofence.id.clone()),
            ..Self::waiting_for_location()
        }
    }

    pub fn permissions_required() -> Self {
        Self::unauthorized(REASON_PERMISSIONS)
    }

    /// State after the driving geofence was removed
    pub fn geofence_removed() -> Self {
        Self::unauthorized(REASON_REMOVED)
    }

    /// Derive authorization from a status of `geofence`
    pub fn from_status(geofence: &Geofence, status: &GeofenceStatus) -> Self {
        let reason = if status.is_inside {
            REASON_INSIDE.to_string()
        } else {
            format!("Driver outside area ({:.0}m away)", status.distance_meters)
        };

        DeliveryAuthorizationStatus {
            is_authorized: status.is_inside,
            reason,
            distance_meters: status.distance_meters,
            required_distance_meters: geofence.radius_meters,
            geofence_id: Some(geofence.id.clone()),
        }
    }
}

impl Default for DeliveryAuthorizationStatus {
    fn default() -> Self {
        Self::waiting_for_location()
    }
}

/// Tracks which geofence drives authorization and holds the current decision
#[derive(Debug)]
pub struct AuthorizationDeriver {
    tracked: Option<String>,
    current: CurrentValue<DeliveryAuthorizationStatus>,
}

impl AuthorizationDeriver {
    pub fn new() -> Self {
        AuthorizationDeriver {
            tracked: None,
            current: CurrentValue::new(DeliveryAuthorizationStatus::waiting_for_location()),
        }
    }

    pub fn tracked_id(&self) -> Option<&str> {
        self.tracked.as_deref()
    }

    pub fn is_tracking(&self, geofence_id: &str) -> bool {
        self.tracked.as_deref() == Some(geofence_id)
    }

    /// Select the geofence that drives authorization
    ///
    /// If the geofence already has a forwarded status, authorization is
    /// derived from it right away. Otherwise it waits for the first status
    /// of the new geofence.
    pub fn track(&mut self, geofence: &Geofence, last_status: Option<&GeofenceStatus>) {
        self.tracked = Some(geofence.id.clone());
        let value = match last_status {
            Some(status) => DeliveryAuthorizationStatus::from_status(geofence, status),
            None => DeliveryAuthorizationStatus::waiting_for(geofence),
        };
        self.current.set(value);
    }

    /// Apply a forwarded status. Statuses for other geofences are ignored.
    /// Returns true if the authorization value changed.
    pub fn apply(&mut self, geofence: &Geofence, status: &GeofenceStatus) -> bool {
        if !self.is_tracking(&geofence.id) {
            return false;
        }
        self.current
            .set(DeliveryAuthorizationStatus::from_status(geofence, status))
    }

    /// Forget the tracked geofence and reset to [`REASON_REMOVED`]
    pub fn reset_removed(&mut self) {
        self.tracked = None;
        self.current.set(DeliveryAuthorizationStatus::geofence_removed());
    }

    /// Permission check failed; the tracked selection is kept for a retry
    pub fn set_permissions_required(&mut self) {
        self.current
            .set(DeliveryAuthorizationStatus::permissions_required());
    }

    pub fn current(&self) -> &DeliveryAuthorizationStatus {
        self.current.get()
    }

    pub fn subscribe<F>(&mut self, callback: F) -> SubscriptionId
    where
        F: FnMut(&DeliveryAuthorizationStatus) + Send + 'static,
    {
        self.current.subscribe(callback)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.current.unsubscribe(id)
    }

    pub(crate) fn clear_subscribers(&mut self) {
        self.current.clear_subscribers();
    }
}

impl Default for AuthorizationDeriver {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::Coordinate;

    const TARGET: Coordinate = Coordinate::new_unchecked(19.4326, -99.1332);

    fn geofence(id: &str, radius: f64) -> Geofence {
        Geofence {
            id: id.to_string(),
            target_location: TARGET,
            radius_meters: radius,
            delivery_id: "D1".to_string(),
            folio: "F1".to_string(),
            client_name: "Ana".to_string(),
            is_active: true,
            created_at_millis: 0,
        }
    }

    fn status(inside: bool, distance: f64) -> GeofenceStatus {
        GeofenceStatus {
            is_inside: inside,
            distance_meters: distance,
            target_location: TARGET,
            current_location: TARGET.destination(0.0, distance),
        }
    }

    #[test]
    fn test_initial_state() {
        let deriver = AuthorizationDeriver::new();
        let current = deriver.current();
        assert!(!current.is_authorized);
        assert_eq!(current.reason, REASON_WAITING);
        assert_eq!(current.required_distance_meters, 50.0);
        assert!(current.geofence_id.is_none());
    }

    #[test]
    fn test_outside_reason() {
        let auth = DeliveryAuthorizationStatus::from_status(&geofence("G", 75.0), &status(false, 123.4));
        assert!(!auth.is_authorized);
        assert_eq!(auth.reason, "Driver outside area (123m away)");
        assert_eq!(auth.required_distance_meters, 75.0);
        assert_eq!(auth.geofence_id.as_deref(), Some("G"));
    }

    #[test]
    fn test_inside_authorizes() {
        let mut deriver = AuthorizationDeriver::new();
        let g = geofence("G", 50.0);
        deriver.track(&g, None);

        assert!(deriver.apply(&g, &status(true, 12.0)));
        assert!(deriver.current().is_authorized);
        assert_eq!(deriver.current().reason, REASON_INSIDE);
    }

    #[test]
    fn test_untracked_ignored() {
        let mut deriver = AuthorizationDeriver::new();
        deriver.track(&geofence("A", 50.0), None);

        assert!(!deriver.apply(&geofence("B", 50.0), &status(true, 1.0)));
        assert!(!deriver.current().is_authorized);
    }

    #[test]
    fn test_track_uses_last_status() {
        let mut deriver = AuthorizationDeriver::new();
        deriver.track(&geofence("A", 50.0), Some(&status(true, 3.0)));
        assert!(deriver.current().is_authorized);
        assert_eq!(deriver.tracked_id(), Some("A"));
    }

    #[test]
    fn test_track_without_status_revokes() {
        let mut deriver = AuthorizationDeriver::new();
        let a = geofence("A", 50.0);
        deriver.track(&a, None);
        deriver.apply(&a, &status(true, 3.0));
        assert!(deriver.current().is_authorized);

        deriver.track(&geofence("B", 120.0), None);
        let current = deriver.current();
        assert!(!current.is_authorized);
        assert_eq!(current.reason, REASON_WAITING);
        assert_eq!(current.geofence_id.as_deref(), Some("B"));
        assert_eq!(current.required_distance_meters, 120.0);
    }

    #[test]
    fn test_reset_removed() {
        let mut deriver = AuthorizationDeriver::new();
        let g = geofence("A", 80.0);
        deriver.track(&g, Some(&status(true, 3.0)));

        deriver.reset_removed();
        let current = deriver.current();
        assert!(!current.is_authorized);
        assert_eq!(current.reason, REASON_REMOVED);
        assert_eq!(current.distance_meters, 0.0);
        assert_eq!(current.required_distance_meters, 50.0);
        assert!(current.geofence_id.is_none());
        assert!(deriver.tracked_id().is_none());
    }
}
