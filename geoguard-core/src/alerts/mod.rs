//! Proximity Alerting
//!
//! This module turns the continuous driver-to-target distance into discrete
//! proximity alerts and throttles the notifications they produce.
//!
//! # Features
//!
//! - Level-based thresholds (approaching / warning) with re-arm hysteresis
//! - `Entered` / `Exited` alerts from the geofence evaluator's edges
//! - Per-key notification cooldown (title + alert type)
//! - Bounded alert history
//!
//! # Example
//!
//! ```rust,ignore
//! use geoguard_core::alerts::ProximityAlertEngine;
//! use geoguard_core::notify::NullDispatcher;
//!
//! let mut engine = ProximityAlertEngine::default();
//!
//! // Feed the distance for every sample
//! for alert in engine.check_thresholds(&geofence, 150.0, timestamp) {
//!     engine.record_and_dispatch(&alert, &mut NullDispatcher, now_ms);
//! }
//!
//! let history = engine.history().to_vec();
//! ```

mod cooldown;
mod engine;
mod history;
mod types;

pub use cooldown::{NotificationCooldown, DEFAULT_COOLDOWN_MS};
pub use engine::{DispatchOutcome, ProximityAlertEngine};
pub use history::{AlertHistory, DEFAULT_HISTORY_CAPACITY};
pub use types::{AlertThresholds, AlertType, ProximityAlert, ProximityZone};
