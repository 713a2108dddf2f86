//! Platform-independent delivery geofencing
//!
//! `geoguard-core` decides, sample by sample, whether a delivery driver is
//! close enough to a drop-off point to be allowed to complete the delivery,
//! and raises proximity alerts on the way in.
//!
//! # Architecture
//!
//! - **geo**: Haversine distance and bearing projection
//! - **location**: location samples and the [`LocationProvider`] trait
//! - **registry**: in-memory geofence table
//! - **evaluator**: inside/outside evaluation with edge triggering
//! - **authorization**: the single "may complete delivery" decision
//! - **alerts**: threshold alerts, notification cooldown, alert history
//! - **notify**: the [`NotificationDispatcher`] trait
//! - **events**: subscriber lists with unsubscribe handles
//! - **tracker**: [`GeofenceTracker`], which wires all of the above together
//!
//! The crate performs no I/O and has no async runtime. Platforms supply a
//! [`LocationProvider`] and a [`NotificationDispatcher`]; the native
//! implementations live in `geoguard-server`.

pub mod alerts;
pub mod authorization;
pub mod config;
pub mod error;
pub mod evaluator;
pub mod events;
pub mod geo;
pub mod location;
pub mod notify;
pub mod registry;
pub mod tracker;

pub use alerts::{AlertType, ProximityAlert, ProximityZone};
pub use authorization::DeliveryAuthorizationStatus;
pub use config::TrackerConfig;
pub use error::{ConfigError, DispatchError, GeoError, LocationError, TrackerError};
pub use evaluator::{GeofenceEvent, GeofenceStatus};
pub use geo::{distance, Coordinate};
pub use location::{LocationProvider, LocationSample, SamplingProfile};
pub use notify::{NotificationDispatcher, Severity};
pub use registry::{Geofence, GeofenceRequest};
pub use tracker::{GeofenceTracker, SampleOutcome, TrackerState};
