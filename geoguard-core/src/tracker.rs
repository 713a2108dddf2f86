//! Geofence Tracker
//!
//! The pipeline context: owns the registry, evaluator, authorization deriver
//! and alert engine, and drives them from a [`LocationProvider`].
//!
//! All processing happens on the caller's thread. Each call to
//! [`GeofenceTracker::poll`] drains whatever samples the provider has queued
//! and processes them one at a time, to completion, in arrival order.
//!
//! ```rust,ignore
//! use geoguard_core::tracker::GeofenceTracker;
//! use geoguard_core::registry::GeofenceRequest;
//!
//! let mut tracker = GeofenceTracker::new(TrackerConfig::default());
//! tracker.create_geofence(GeofenceRequest::new("D1", "F-17", "Ana", target), now_ms);
//! tracker.start(&mut provider)?;
//!
//! loop {
//!     tracker.poll(&mut provider, &mut dispatcher);
//!     if tracker.authorization().is_authorized {
//!         // enable "complete delivery"
//!     }
//! }
//! ```

use crate::alerts::{DispatchOutcome, ProximityAlert, ProximityAlertEngine, ProximityZone};
use crate::authorization::{AuthorizationDeriver, DeliveryAuthorizationStatus};
use crate::config::TrackerConfig;
use crate::error::TrackerError;
use crate::evaluator::{evaluate, GeofenceEvaluator, GeofenceEvent};
use crate::events::{Subscribers, SubscriptionId};
use crate::location::{LocationProvider, LocationSample, SamplingProfile, SubscriptionHandle};
use crate::notify::NotificationDispatcher;
use crate::registry::{Geofence, GeofenceRegistry, GeofenceRequest};

/// Lifecycle of a tracker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackerState {
    /// Not subscribed to a location stream
    Idle,
    /// Subscribed and processing samples
    Tracking,
    /// Torn down; cannot be started again
    Disposed,
}

/// Everything one sample produced
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SampleOutcome {
    pub events: Vec<GeofenceEvent>,
    pub alerts: Vec<ProximityAlert>,
    /// True if the authorization value changed
    pub authorization_changed: bool,
}

/// Delivery geofencing pipeline
pub struct GeofenceTracker {
    config: TrackerConfig,
    state: TrackerState,
    subscription: Option<SubscriptionHandle>,
    profile: SamplingProfile,
    registry: GeofenceRegistry,
    evaluator: GeofenceEvaluator,
    authorization: AuthorizationDeriver,
    alerts: ProximityAlertEngine,
    geofence_events: Subscribers<GeofenceEvent>,
    proximity_alerts: Subscribers<ProximityAlert>,
    last_sample: Option<LocationSample>,
    samples_processed: u64,
}

impl GeofenceTracker {
    pub fn new(config: TrackerConfig) -> Self {
        let alerts = ProximityAlertEngine::new(
            config.thresholds,
            config.notification_cooldown_ms,
            config.alert_history_capacity,
        );
        GeofenceTracker {
            profile: config.sampling_profile,
            config,
            state: TrackerState::Idle,
            subscription: None,
            registry: GeofenceRegistry::new(),
            evaluator: GeofenceEvaluator::new(),
            authorization: AuthorizationDeriver::new(),
            alerts,
            geofence_events: Subscribers::new(),
            proximity_alerts: Subscribers::new(),
            last_sample: None,
            samples_processed: 0,
        }
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    pub fn state(&self) -> TrackerState {
        self.state
    }

    pub fn is_tracking(&self) -> bool {
        self.state == TrackerState::Tracking
    }

    pub fn profile(&self) -> SamplingProfile {
        self.profile
    }

    // -------------------------------------------------------------------------
    // Lifecycle
    // -------------------------------------------------------------------------

    /// Subscribe to the location stream with the configured profile
    ///
    /// Fails fast with [`TrackerError::PermissionDenied`] if the provider says
    /// location may not be used; authorization then reads
    /// "Permissions required" until a later start succeeds. Starting an
    /// already tracking tracker is a no-op.
    pub fn start<P: LocationProvider + ?Sized>(&mut self, provider: &mut P) -> Result<(), TrackerError> {
        self.start_with_profile(provider, self.profile)
    }

    pub fn start_with_profile<P: LocationProvider + ?Sized>(
        &mut self,
        provider: &mut P,
        profile: SamplingProfile,
    ) -> Result<(), TrackerError> {
        match self.state {
            TrackerState::Disposed => return Err(TrackerError::Disposed),
            TrackerState::Tracking => return Ok(()),
            TrackerState::Idle => {}
        }

        if !provider.can_use_location() {
            log::warn!("Location permission denied, tracking not started");
            self.authorization.set_permissions_required();
            // The next status of the tracked geofence must be forwarded again
            if let Some(id) = self.authorization.tracked_id() {
                self.evaluator.forget(id);
            }
            return Err(TrackerError::PermissionDenied);
        }

        let handle = provider.subscribe(profile)?;
        log::info!("Location tracking started ({} profile)", profile);
        self.subscription = Some(handle);
        self.profile = profile;
        self.state = TrackerState::Tracking;
        Ok(())
    }

    /// Switch sampling profile, re-subscribing if currently tracking
    pub fn set_profile<P: LocationProvider + ?Sized>(
        &mut self,
        provider: &mut P,
        profile: SamplingProfile,
    ) -> Result<(), TrackerError> {
        if profile == self.profile {
            return Ok(());
        }
        if self.is_tracking() {
            self.stop(provider);
            self.start_with_profile(provider, profile)
        } else {
            self.profile = profile;
            Ok(())
        }
    }

    /// Release the location subscription. Safe to call repeatedly.
    ///
    /// Geofences, authorization and history are left as they are.
    pub fn stop<P: LocationProvider + ?Sized>(&mut self, provider: &mut P) {
        if let Some(handle) = self.subscription.take() {
            provider.unsubscribe(handle);
            log::info!("Location tracking stopped");
        }
        if self.state == TrackerState::Tracking {
            self.state = TrackerState::Idle;
        }
    }

    /// Stop, clear every geofence, subscriber and alert. Terminal.
    pub fn dispose<P: LocationProvider + ?Sized>(&mut self, provider: &mut P) {
        self.stop(provider);
        self.remove_all_geofences();
        self.alerts.reset();
        self.geofence_events.clear();
        self.proximity_alerts.clear();
        self.authorization.clear_subscribers();
        self.last_sample = None;
        self.state = TrackerState::Disposed;
    }

    // -------------------------------------------------------------------------
    // Sample processing
    // -------------------------------------------------------------------------

    /// Drain and process every sample the provider has queued
    ///
    /// Returns the number of samples processed.
    pub fn poll<P, D>(&mut self, provider: &mut P, dispatcher: &mut D) -> usize
    where
        P: LocationProvider + ?Sized,
        D: NotificationDispatcher + ?Sized,
    {
        let mut processed = 0;
        self.alerts.prune_cooldowns(provider.current_time_ms());
        loop {
            let sample = match self.subscription.as_ref() {
                Some(handle) => provider.poll_sample(handle),
                None => None,
            };
            let Some(sample) = sample else {
                break;
            };
            let now_ms = provider.current_time_ms();
            self.handle_sample(sample, now_ms, dispatcher);
            processed += 1;
        }
        processed
    }

    /// Process one sample against every active geofence
    ///
    /// `now_ms` is the provider clock, used for notification cooldowns.
    pub fn handle_sample<D>(&mut self, sample: LocationSample, now_ms: u64, dispatcher: &mut D) -> SampleOutcome
    where
        D: NotificationDispatcher + ?Sized,
    {
        let mut outcome = SampleOutcome::default();

        if self.state == TrackerState::Disposed {
            return outcome;
        }
        if !sample.coordinates.is_valid() {
            log::warn!(
                "Ignoring sample with invalid coordinates ({}, {})",
                sample.coordinates.latitude,
                sample.coordinates.longitude
            );
            return outcome;
        }

        let timestamp = sample.timestamp_millis;
        let active = self.registry.list_active();

        for geofence in &active {
            let status = evaluate(geofence, &sample);
            let mut alerts =
                self.alerts
                    .check_thresholds(geofence, status.distance_meters, timestamp);

            if let Some(transition) = self.evaluator.apply(geofence, status) {
                if self.authorization.apply(geofence, &transition.status) {
                    outcome.authorization_changed = true;
                    log::debug!(
                        "{}: authorization now {} ({})",
                        geofence.id,
                        self.authorization.current().is_authorized,
                        self.authorization.current().reason
                    );
                }

                if let Some(event) = transition.event {
                    match &event {
                        GeofenceEvent::Enter { status, .. } => log::debug!(
                            "{}: entered geofence at {:.1}m",
                            geofence.id,
                            status.distance_meters
                        ),
                        GeofenceEvent::Exit { status, .. } => log::debug!(
                            "{}: left geofence at {:.1}m",
                            geofence.id,
                            status.distance_meters
                        ),
                    }
                    alerts.push(self.alerts.edge_alert(geofence, &event, timestamp));
                    self.geofence_events.publish(&event);
                    outcome.events.push(event);
                }
            }

            for alert in alerts {
                if self.alerts.record_and_dispatch(&alert, dispatcher, now_ms) == DispatchOutcome::Failed {
                    log::debug!("{}: alert {} kept without notification", geofence.id, alert.id);
                }
                self.proximity_alerts.publish(&alert);
                outcome.alerts.push(alert);
            }
        }

        self.last_sample = Some(sample);
        self.samples_processed += 1;
        outcome
    }

    /// Latest sample seen. No staleness policy applies: authorization keeps
    /// its last value for as long as the stream is silent.
    pub fn last_sample(&self) -> Option<&LocationSample> {
        self.last_sample.as_ref()
    }

    pub fn samples_processed(&self) -> u64 {
        self.samples_processed
    }

    // -------------------------------------------------------------------------
    // Geofences
    // -------------------------------------------------------------------------

    /// Register a geofence for a delivery and begin evaluating it
    ///
    /// The first geofence created while none is tracked becomes the one that
    /// drives authorization.
    pub fn create_geofence(&mut self, request: GeofenceRequest, now_ms: u64) -> String {
        let id = self
            .registry
            .create(request, self.config.default_radius_meters, now_ms);
        log::info!("{}: geofence created", id);

        if self.authorization.tracked_id().is_none() {
            self.track_delivery(&id);
        }
        id
    }

    /// Select the geofence whose status drives authorization
    pub fn track_delivery(&mut self, geofence_id: &str) -> bool {
        match self.registry.get(geofence_id) {
            Some(geofence) => {
                self.authorization
                    .track(geofence, self.evaluator.last_status(geofence_id));
                true
            }
            None => false,
        }
    }

    pub fn tracked_geofence(&self) -> Option<&Geofence> {
        self.authorization
            .tracked_id()
            .and_then(|id| self.registry.get(id))
    }

    pub fn activate_geofence(&mut self, geofence_id: &str) -> bool {
        self.registry.activate(geofence_id)
    }

    /// Stop evaluating a geofence. Authorization keeps its last value if the
    /// geofence is the tracked one; no sample can change it until reactivation.
    pub fn deactivate_geofence(&mut self, geofence_id: &str) -> bool {
        self.registry.deactivate(geofence_id)
    }

    /// Remove a geofence. Returns false for unknown ids.
    ///
    /// Removing the tracked geofence resets authorization.
    pub fn remove_geofence(&mut self, geofence_id: &str) -> bool {
        if self.registry.remove(geofence_id).is_none() {
            return false;
        }
        self.evaluator.forget(geofence_id);
        self.alerts.forget(geofence_id);
        if self.authorization.is_tracking(geofence_id) {
            self.authorization.reset_removed();
        }
        log::info!("{}: geofence removed", geofence_id);
        true
    }

    pub fn remove_all_geofences(&mut self) {
        self.registry.remove_all();
        self.evaluator.reset();
        self.alerts.forget_all();
        self.authorization.reset_removed();
    }

    pub fn list_active_geofences(&self) -> Vec<Geofence> {
        self.registry.list_active()
    }

    pub fn registry(&self) -> &GeofenceRegistry {
        &self.registry
    }

    pub fn zone(&self, geofence_id: &str) -> Option<ProximityZone> {
        self.alerts.zone(geofence_id)
    }

    // -------------------------------------------------------------------------
    // Outputs
    // -------------------------------------------------------------------------

    pub fn authorization(&self) -> &DeliveryAuthorizationStatus {
        self.authorization.current()
    }

    pub fn alert_history(&self) -> Vec<ProximityAlert> {
        self.alerts.history().to_vec()
    }

    pub fn alerts_for(&self, geofence_id: &str) -> Vec<ProximityAlert> {
        self.alerts.alerts_for(geofence_id)
    }

    pub fn clear_alert_history(&mut self) {
        self.alerts.clear_history();
    }

    pub fn subscribe_geofence_events<F>(&mut self, callback: F) -> SubscriptionId
    where
        F: FnMut(&GeofenceEvent) + Send + 'static,
    {
        self.geofence_events.subscribe(callback)
    }

    pub fn unsubscribe_geofence_events(&mut self, id: SubscriptionId) -> bool {
        self.geofence_events.unsubscribe(id)
    }

    pub fn subscribe_proximity_alerts<F>(&mut self, callback: F) -> SubscriptionId
    where
        F: FnMut(&ProximityAlert) + Send + 'static,
    {
        self.proximity_alerts.subscribe(callback)
    }

    pub fn unsubscribe_proximity_alerts(&mut self, id: SubscriptionId) -> bool {
        self.proximity_alerts.unsubscribe(id)
    }

    pub fn subscribe_authorization<F>(&mut self, callback: F) -> SubscriptionId
    where
        F: FnMut(&DeliveryAuthorizationStatus) + Send + 'static,
    {
        self.authorization.subscribe(callback)
    }

    pub fn unsubscribe_authorization(&mut self, id: SubscriptionId) -> bool {
        self.authorization.unsubscribe(id)
    }
}

impl Default for GeofenceTracker {
    fn default() -> Self {
        Self::new(TrackerConfig::default())
    }
}
