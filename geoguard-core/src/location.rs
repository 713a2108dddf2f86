//! Location Stream Abstraction
//!
//! The pipeline never talks to GPS hardware or an OS location service
//! directly. Instead it consumes samples through the [`LocationProvider`]
//! trait, which a platform implements on top of whatever it has: a live
//! location service, a simulated approach, or a replayed recording.
//!
//! The interface is poll-based, so the same tracker runs unchanged under a
//! native async runtime or inside a host that calls back into us:
//!
//! ```rust,ignore
//! use geoguard_core::location::{LocationProvider, SamplingProfile};
//!
//! fn drain<P: LocationProvider>(provider: &mut P) {
//!     let handle = provider.subscribe(SamplingProfile::Foreground).unwrap();
//!     while let Some(sample) = provider.poll_sample(&handle) {
//!         println!("{:?}", sample.coordinates);
//!     }
//!     provider.unsubscribe(handle);
//! }
//! ```

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::error::LocationError;
use crate::geo::Coordinate;

/// One position fix from the location producer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationSample {
    pub coordinates: Coordinate,
    /// Horizontal accuracy radius in meters
    pub accuracy_meters: f64,
    /// Milliseconds since the Unix epoch (or since provider start for simulations)
    pub timestamp_millis: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speed_meters_per_second: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub heading_degrees: Option<f64>,
}

impl LocationSample {
    /// Sample with only a position and timestamp
    pub fn new(coordinates: Coordinate, accuracy_meters: f64, timestamp_millis: i64) -> Self {
        LocationSample {
            coordinates,
            accuracy_meters,
            timestamp_millis,
            speed_meters_per_second: None,
            heading_degrees: None,
        }
    }
}

/// Sampling cadence requested from the producer
///
/// The event shape is identical for both profiles; only how often the
/// producer reports differs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum SamplingProfile {
    /// App in foreground: about one fix per second, 5 m displacement filter
    Foreground,
    /// App in background: about one fix every ten seconds, 10 m filter
    Background,
}

impl Default for SamplingProfile {
    fn default() -> Self {
        SamplingProfile::Foreground
    }
}

impl SamplingProfile {
    /// Nominal interval between samples in milliseconds
    pub fn interval_ms(&self) -> u64 {
        match self {
            SamplingProfile::Foreground => 1_000,
            SamplingProfile::Background => 10_000,
        }
    }

    /// Minimum displacement in meters before the producer reports again
    pub fn min_displacement_meters(&self) -> f64 {
        match self {
            SamplingProfile::Foreground => 5.0,
            SamplingProfile::Background => 10.0,
        }
    }
}

/// Opaque handle for an active location subscription
#[derive(Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionHandle(pub i32);

/// Platform-provided source of location samples
///
/// Implementations must return samples from [`poll_sample`](Self::poll_sample)
/// in the order they were produced and must never block.
pub trait LocationProvider {
    /// Capability/permission check performed before tracking starts
    fn can_use_location(&self) -> bool;

    /// Start producing samples with the given cadence
    fn subscribe(&mut self, profile: SamplingProfile) -> Result<SubscriptionHandle, LocationError>;

    /// Next pending sample for this subscription, if any
    fn poll_sample(&mut self, handle: &SubscriptionHandle) -> Option<LocationSample>;

    /// Release the subscription. Consumes the handle, so a handle can only
    /// be released once.
    fn unsubscribe(&mut self, handle: SubscriptionHandle);

    /// Monotonic clock in milliseconds, used for ids and cooldowns
    fn current_time_ms(&self) -> u64;
}

/// In-memory provider that hands out a prepared list of samples
///
/// Used for deterministic replays and tests. Time follows the timestamp of
/// the last sample handed out unless set explicitly.
#[derive(Debug, Default)]
pub struct ReplayLocationProvider {
    samples: VecDeque<LocationSample>,
    permission_denied: bool,
    active: Option<i32>,
    next_handle: i32,
    profile: Option<SamplingProfile>,
    now_ms: u64,
    subscribe_count: u32,
    unsubscribe_count: u32,
}

impl ReplayLocationProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Provider preloaded with samples
    pub fn with_samples(samples: impl IntoIterator<Item = LocationSample>) -> Self {
        ReplayLocationProvider {
            samples: samples.into_iter().collect(),
            ..Self::default()
        }
    }

    /// Parse a JSON array of samples
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let samples: Vec<LocationSample> = serde_json::from_str(json)?;
        Ok(Self::with_samples(samples))
    }

    /// Simulate the user revoking (or granting) location permission
    pub fn set_permission_denied(&mut self, denied: bool) {
        self.permission_denied = denied;
    }

    /// Queue another sample
    pub fn push(&mut self, sample: LocationSample) {
        self.samples.push_back(sample);
    }

    /// Override the provider clock
    pub fn set_time_ms(&mut self, now_ms: u64) {
        self.now_ms = now_ms;
    }

    pub fn pending(&self) -> usize {
        self.samples.len()
    }

    pub fn is_subscribed(&self) -> bool {
        self.active.is_some()
    }

    /// Profile of the active subscription
    pub fn profile(&self) -> Option<SamplingProfile> {
        self.profile
    }

    pub fn subscribe_count(&self) -> u32 {
        self.subscribe_count
    }

    pub fn unsubscribe_count(&self) -> u32 {
        self.unsubscribe_count
    }
}

impl LocationProvider for ReplayLocationProvider {
    fn can_use_location(&self) -> bool {
        !self.permission_denied
    }

    fn subscribe(&mut self, profile: SamplingProfile) -> Result<SubscriptionHandle, LocationError> {
        if self.permission_denied {
            return Err(LocationError::Unavailable("permission denied".to_string()));
        }
        if self.active.is_some() {
            return Err(LocationError::AlreadySubscribed);
        }
        self.next_handle += 1;
        self.active = Some(self.next_handle);
        self.profile = Some(profile);
        self.subscribe_count += 1;
        Ok(SubscriptionHandle(self.next_handle))
    }

    fn poll_sample(&mut self, handle: &SubscriptionHandle) -> Option<LocationSample> {
        if self.active != Some(handle.0) {
            return None;
        }
        let sample = self.samples.pop_front()?;
        if sample.timestamp_millis > 0 {
            self.now_ms = self.now_ms.max(sample.timestamp_millis as u64);
        }
        Some(sample)
    }

    fn unsubscribe(&mut self, handle: SubscriptionHandle) {
        if self.active == Some(handle.0) {
            self.active = None;
            self.profile = None;
            self.unsubscribe_count += 1;
        }
    }

    fn current_time_ms(&self) -> u64 {
        self.now_ms
    }
}
