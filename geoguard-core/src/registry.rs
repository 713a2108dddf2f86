//! Geofence Registry
//!
//! In-memory table of delivery geofences, one per in-flight delivery. The
//! registry is the only owner of [`Geofence`] values; everything else works
//! on clones.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::geo::Coordinate;

/// Default geofence radius in meters
pub const DEFAULT_RADIUS_METERS: f64 = 50.0;

/// Circular boundary around a delivery target
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Geofence {
    pub id: String,
    pub target_location: Coordinate,
    pub radius_meters: f64,
    pub delivery_id: String,
    pub folio: String,
    pub client_name: String,
    pub is_active: bool,
    /// Creation time on the provider clock
    pub created_at_millis: u64,
}

impl Geofence {
    /// Does `distance_meters` fall inside the boundary (inclusive)?
    pub fn contains_distance(&self, distance_meters: f64) -> bool {
        distance_meters <= self.radius_meters
    }
}

/// Parameters for a new geofence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeofenceRequest {
    pub delivery_id: String,
    pub folio: String,
    pub client_name: String,
    pub target_location: Coordinate,
    #[serde(default)]
    pub radius_meters: Option<f64>,
}

impl GeofenceRequest {
    pub fn new(
        delivery_id: impl Into<String>,
        folio: impl Into<String>,
        client_name: impl Into<String>,
        target_location: Coordinate,
    ) -> Self {
        GeofenceRequest {
            delivery_id: delivery_id.into(),
            folio: folio.into(),
            client_name: client_name.into(),
            target_location,
            radius_meters: None,
        }
    }

    pub fn with_radius(mut self, radius_meters: f64) -> Self {
        self.radius_meters = Some(radius_meters);
        self
    }
}

/// Geofences keyed by id
#[derive(Debug, Clone, Default)]
pub struct GeofenceRegistry {
    geofences: BTreeMap<String, Geofence>,
}

impl GeofenceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a new active geofence and return its id
    ///
    /// Ids are `"{delivery_id}_{now_ms}"`. Two creations for the same delivery
    /// in the same millisecond get a `-N` suffix so ids stay unique.
    pub fn create(&mut self, request: GeofenceRequest, default_radius: f64, now_ms: u64) -> String {
        let base = format!("{}_{}", request.delivery_id, now_ms);
        let mut id = base.clone();
        let mut suffix = 1;
        while self.geofences.contains_key(&id) {
            id = format!("{}-{}", base, suffix);
            suffix += 1;
        }

        let geofence = Geofence {
            id: id.clone(),
            target_location: request.target_location,
            radius_meters: request.radius_meters.unwrap_or(default_radius),
            delivery_id: request.delivery_id,
            folio: request.folio,
            client_name: request.client_name,
            is_active: true,
            created_at_millis: now_ms,
        };
        self.geofences.insert(id.clone(), geofence);
        id
    }

    pub fn activate(&mut self, id: &str) -> bool {
        self.set_active(id, true)
    }

    pub fn deactivate(&mut self, id: &str) -> bool {
        self.set_active(id, false)
    }

    fn set_active(&mut self, id: &str, active: bool) -> bool {
        match self.geofences.get_mut(id) {
            Some(geofence) => {
                geofence.is_active = active;
                true
            }
            None => false,
        }
    }

    /// Delete a geofence, returning it if it existed
    pub fn remove(&mut self, id: &str) -> Option<Geofence> {
        self.geofences.remove(id)
    }

    pub fn remove_all(&mut self) {
        self.geofences.clear();
    }

    pub fn get(&self, id: &str) -> Option<&Geofence> {
        self.geofences.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.geofences.contains_key(id)
    }

    /// Snapshot of the currently active geofences, ordered by id
    pub fn list_active(&self) -> Vec<Geofence> {
        self.active().cloned().collect()
    }

    pub(crate) fn active(&self) -> impl Iterator<Item = &Geofence> {
        self.geofences.values().filter(|g| g.is_active)
    }

    /// Most recently created geofence for a delivery
    pub fn find_by_delivery(&self, delivery_id: &str) -> Option<&Geofence> {
        self.geofences
            .values()
            .filter(|g| g.delivery_id == delivery_id)
            .max_by_key(|g| g.created_at_millis)
    }

    pub fn len(&self) -> usize {
        self.geofences.len()
    }

    pub fn is_empty(&self) -> bool {
        self.geofences.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(delivery: &str) -> GeofenceRequest {
        GeofenceRequest::new(delivery, "F-001", "Ana", Coordinate::new_unchecked(19.4326, -99.1332))
    }

    #[test]
    fn test_create_defaults() {
        let mut registry = GeofenceRegistry::new();
        let id = registry.create(request("D1"), DEFAULT_RADIUS_METERS, 1000);

        assert_eq!(id, "D1_1000");
        let geofence = registry.get(&id).unwrap();
        assert!(geofence.is_active);
        assert_eq!(geofence.radius_meters, 50.0);
        assert_eq!(geofence.folio, "F-001");
    }

    #[test]
    fn test_create_unique_ids() {
        let mut registry = GeofenceRegistry::new();
        let a = registry.create(request("D1"), 50.0, 1000);
        let b = registry.create(request("D1"), 50.0, 1000);
        let c = registry.create(request("D1"), 50.0, 1000);

        assert_eq!(a, "D1_1000");
        assert_eq!(b, "D1_1000-1");
        assert_eq!(c, "D1_1000-2");
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn test_custom_radius() {
        let mut registry = GeofenceRegistry::new();
        let id = registry.create(request("D2").with_radius(120.0), 50.0, 5);
        assert_eq!(registry.get(&id).unwrap().radius_meters, 120.0);
    }

    #[test]
    fn test_activate_deactivate() {
        let mut registry = GeofenceRegistry::new();
        let id = registry.create(request("D1"), 50.0, 1);

        assert!(registry.deactivate(&id));
        assert!(registry.list_active().is_empty());
        assert!(registry.contains(&id));

        assert!(registry.activate(&id));
        assert_eq!(registry.list_active().len(), 1);

        assert!(!registry.activate("stale"));
        assert!(!registry.deactivate("stale"));
    }

    #[test]
    fn test_remove() {
        let mut registry = GeofenceRegistry::new();
        let id = registry.create(request("D1"), 50.0, 1);
        registry.create(request("D2"), 50.0, 2);

        assert!(registry.remove(&id).is_some());
        assert!(registry.remove(&id).is_none());
        assert_eq!(registry.len(), 1);

        registry.remove_all();
        assert!(registry.is_empty());
    }

    #[test]
    fn test_find_by_delivery() {
        let mut registry = GeofenceRegistry::new();
        registry.create(request("D1"), 50.0, 1);
        let newer = registry.create(request("D1"), 50.0, 9);
        registry.create(request("D2"), 50.0, 20);

        assert_eq!(registry.find_by_delivery("D1").unwrap().id, newer);
        assert!(registry.find_by_delivery("D3").is_none());
    }
}
