//! Geofence Evaluator
//!
//! Evaluates every location sample against a geofence but only forwards a
//! status when the inside/outside boolean changes. A driver idling at the
//! curb produces one `Enter`, not one event per GPS tick.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::geo::{distance, Coordinate};
use crate::location::LocationSample;
use crate::registry::Geofence;

/// Result of evaluating one sample against one geofence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeofenceStatus {
    pub is_inside: bool,
    pub distance_meters: f64,
    pub target_location: Coordinate,
    pub current_location: Coordinate,
}

/// Boundary crossing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum GeofenceEvent {
    #[serde(rename_all = "camelCase")]
    Enter {
        geofence_id: String,
        status: GeofenceStatus,
    },
    #[serde(rename_all = "camelCase")]
    Exit {
        geofence_id: String,
        status: GeofenceStatus,
    },
}

impl GeofenceEvent {
    pub fn geofence_id(&self) -> &str {
        match self {
            GeofenceEvent::Enter { geofence_id, .. } | GeofenceEvent::Exit { geofence_id, .. } => {
                geofence_id
            }
        }
    }

    pub fn status(&self) -> &GeofenceStatus {
        match self {
            GeofenceEvent::Enter { status, .. } | GeofenceEvent::Exit { status, .. } => status,
        }
    }
}

/// A forwarded status change
///
/// `event` is `None` for the very first evaluation of a geofence when the
/// driver starts outside: there was no boundary crossing, but consumers
/// still need the initial status.
#[derive(Debug, Clone, PartialEq)]
pub struct GeofenceTransition {
    pub status: GeofenceStatus,
    pub event: Option<GeofenceEvent>,
}

/// Compute the status of `sample` relative to `geofence`
pub fn evaluate(geofence: &Geofence, sample: &LocationSample) -> GeofenceStatus {
    let distance_meters = distance(&sample.coordinates, &geofence.target_location);
    GeofenceStatus {
        is_inside: geofence.contains_distance(distance_meters),
        distance_meters,
        target_location: geofence.target_location,
        current_location: sample.coordinates,
    }
}

/// Edge detector over per-geofence statuses
#[derive(Debug, Clone, Default)]
pub struct GeofenceEvaluator {
    last_inside: HashMap<String, bool>,
    last_status: HashMap<String, GeofenceStatus>,
}

impl GeofenceEvaluator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Evaluate and return a transition only if `is_inside` changed
    pub fn update(
        &mut self,
        geofence: &Geofence,
        sample: &LocationSample,
    ) -> Option<GeofenceTransition> {
        self.apply(geofence, evaluate(geofence, sample))
    }

    /// Edge detection on an already computed status
    pub fn apply(&mut self, geofence: &Geofence, status: GeofenceStatus) -> Option<GeofenceTransition> {
        let previous = self.last_inside.insert(geofence.id.clone(), status.is_inside);

        if previous == Some(status.is_inside) {
            return None;
        }

        self.last_status.insert(geofence.id.clone(), status.clone());

        let event = match (previous, status.is_inside) {
            (_, true) => Some(GeofenceEvent::Enter {
                geofence_id: geofence.id.clone(),
                status: status.clone(),
            }),
            (Some(true), false) => Some(GeofenceEvent::Exit {
                geofence_id: geofence.id.clone(),
                status: status.clone(),
            }),
            (_, false) => None,
        };

        Some(GeofenceTransition { status, event })
    }

    /// Last forwarded status for a geofence
    pub fn last_status(&self, geofence_id: &str) -> Option<&GeofenceStatus> {
        self.last_status.get(geofence_id)
    }

    /// Drop edge state, e.g. after the geofence is removed
    pub fn forget(&mut self, geofence_id: &str) {
        self.last_inside.remove(geofence_id);
        self.last_status.remove(geofence_id);
    }

    pub fn reset(&mut self) {
        self.last_inside.clear();
        self.last_status.clear();
    }
}
