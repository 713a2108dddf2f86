//! Error types
//!
//! Only operations that gate tracking (start) surface errors to the caller.
//! Stale geofence ids, missing samples and suppressed notifications are
//! expected conditions and are reported through return values instead.

use thiserror::Error;

/// Invalid geographic input
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GeoError {
    #[error("Invalid coordinate ({latitude}, {longitude})")]
    InvalidCoordinate { latitude: f64, longitude: f64 },
}

/// Failure reported by a [`LocationProvider`](crate::location::LocationProvider)
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LocationError {
    #[error("Location source unavailable: {0}")]
    Unavailable(String),
    #[error("Location subscription already active")]
    AlreadySubscribed,
}

/// Failure reported by a [`NotificationDispatcher`](crate::notify::NotificationDispatcher)
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Notification dispatch failed: {message}")]
pub struct DispatchError {
    pub message: String,
}

impl DispatchError {
    pub fn new(message: impl Into<String>) -> Self {
        DispatchError {
            message: message.into(),
        }
    }
}

/// Rejected tracker configuration
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("Geofence radius must be positive, got {0}")]
    InvalidRadius(f64),
    #[error("Approaching threshold ({approaching}) must be above warning threshold ({warning})")]
    ThresholdOrder { approaching: f64, warning: f64 },
    #[error("Alert history capacity must be at least 1")]
    EmptyHistory,
}

/// Errors returned by [`GeofenceTracker`](crate::tracker::GeofenceTracker) lifecycle calls
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TrackerError {
    #[error("Location permission denied")]
    PermissionDenied,
    #[error(transparent)]
    Location(#[from] LocationError),
    #[error("Tracker has been disposed")]
    Disposed,
}
