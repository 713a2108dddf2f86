use std::collections::HashMap;

use crate::evaluator::GeofenceEvent;
use crate::notify::NotificationDispatcher;
use crate::registry::Geofence;

use super::cooldown::NotificationCooldown;
use super::history::AlertHistory;
use super::types::{AlertThresholds, AlertType, ProximityAlert, ProximityZone};

/// What happened when an alert was offered to the dispatcher
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    Presented,
    /// Same notification key presented within the cooldown window
    Suppressed,
    /// Dispatcher returned an error (logged, not propagated)
    Failed,
}

/// Threshold hysteresis, enter/exit alerts, cooldown and history
#[derive(Debug)]
pub struct ProximityAlertEngine {
    thresholds: AlertThresholds,
    last_distance: HashMap<String, f64>,
    zones: HashMap<String, ProximityZone>,
    cooldown: NotificationCooldown,
    history: AlertHistory,
    sequence: u64,
}

impl ProximityAlertEngine {
    pub fn new(thresholds: AlertThresholds, cooldown_ms: u64, history_capacity: usize) -> Self {
        ProximityAlertEngine {
            thresholds,
            last_distance: HashMap::new(),
            zones: HashMap::new(),
            cooldown: NotificationCooldown::new(cooldown_ms),
            history: AlertHistory::new(history_capacity),
            sequence: 0,
        }
    }

    pub fn thresholds(&self) -> &AlertThresholds {
        &self.thresholds
    }

    /// Level-based threshold check for one distance reading
    ///
    /// A threshold fires when the previous distance was strictly above it and
    /// the current one is at or below it. Every threshold is checked on every
    /// reading, so a jump from far away straight to the door yields all of
    /// them in descending order.
    pub fn check_thresholds(
        &mut self,
        geofence: &Geofence,
        distance_meters: f64,
        timestamp_millis: i64,
    ) -> Vec<ProximityAlert> {
        let prev = self
            .last_distance
            .insert(geofence.id.clone(), distance_meters)
            .unwrap_or(f64::INFINITY);
        self.zones.insert(
            geofence.id.clone(),
            ProximityZone::classify(distance_meters, geofence.radius_meters, &self.thresholds),
        );

        let mut alerts = Vec::new();
        for (alert_type, threshold) in self.thresholds.descending() {
            if prev > threshold && distance_meters <= threshold {
                alerts.push(self.build(geofence, alert_type, distance_meters, threshold, timestamp_millis));
            }
        }
        alerts
    }

    /// Convert an evaluator edge into an `Entered` / `Exited` alert
    pub fn edge_alert(&mut self, geofence: &Geofence, event: &GeofenceEvent, timestamp_millis: i64) -> ProximityAlert {
        let alert_type = match event {
            GeofenceEvent::Enter { .. } => AlertType::Entered,
            GeofenceEvent::Exit { .. } => AlertType::Exited,
        };
        let distance = event.status().distance_meters;
        self.build(geofence, alert_type, distance, geofence.radius_meters, timestamp_millis)
    }

    fn build(
        &mut self,
        geofence: &Geofence,
        alert_type: AlertType,
        distance_meters: f64,
        threshold_meters: f64,
        timestamp_millis: i64,
    ) -> ProximityAlert {
        self.sequence += 1;
        ProximityAlert {
            id: format!(
                "{}-{}-{}-{}",
                geofence.id, alert_type, timestamp_millis, self.sequence
            ),
            alert_type,
            distance_meters,
            threshold_meters,
            timestamp_millis,
            geofence_id: geofence.id.clone(),
            delivery_id: geofence.delivery_id.clone(),
            folio: geofence.folio.clone(),
            client_name: geofence.client_name.clone(),
        }
    }

    /// Record an alert in history and offer it to the dispatcher
    ///
    /// The alert is recorded whether or not its notification goes out.
    pub fn record_and_dispatch<D>(&mut self, alert: &ProximityAlert, dispatcher: &mut D, now_ms: u64) -> DispatchOutcome
    where
        D: NotificationDispatcher + ?Sized,
    {
        self.history.push(alert.clone());
        log::info!(
            "{}: {} alert at {:.0}m (threshold {:.0}m)",
            alert.geofence_id,
            alert.alert_type,
            alert.distance_meters,
            alert.threshold_meters
        );

        let title = alert.alert_type.title();
        if !self.cooldown.try_acquire(title, alert.alert_type, now_ms) {
            log::debug!(
                "{}: '{}' notification suppressed by cooldown",
                alert.geofence_id,
                title
            );
            return DispatchOutcome::Suppressed;
        }

        match dispatcher.present(title, &alert.body(), alert.alert_type.severity()) {
            Ok(()) => DispatchOutcome::Presented,
            Err(e) => {
                log::warn!("{}: {}", alert.geofence_id, e);
                DispatchOutcome::Failed
            }
        }
    }

    /// Current zone of a geofence, once it has seen a sample
    pub fn zone(&self, geofence_id: &str) -> Option<ProximityZone> {
        self.zones.get(geofence_id).copied()
    }

    pub fn last_distance(&self, geofence_id: &str) -> Option<f64> {
        self.last_distance.get(geofence_id).copied()
    }

    pub fn history(&self) -> &AlertHistory {
        &self.history
    }

    /// Alerts still in history for one geofence, oldest first
    pub fn alerts_for(&self, geofence_id: &str) -> Vec<ProximityAlert> {
        self.history
            .iter()
            .filter(|a| a.geofence_id == geofence_id)
            .cloned()
            .collect()
    }

    pub fn clear_history(&mut self) {
        self.history.clear();
    }

    pub fn cooldown(&self) -> &NotificationCooldown {
        &self.cooldown
    }

    pub fn prune_cooldowns(&mut self, now_ms: u64) {
        self.cooldown.prune(now_ms);
    }

    /// Forget distance state for a removed geofence. History is kept.
    pub fn forget(&mut self, geofence_id: &str) {
        self.last_distance.remove(geofence_id);
        self.zones.remove(geofence_id);
    }

    /// Forget all per-geofence state. History and cooldowns are kept.
    pub fn forget_all(&mut self) {
        self.last_distance.clear();
        self.zones.clear();
    }

    pub fn reset(&mut self) {
        self.forget_all();
        self.cooldown.clear();
        self.history.clear();
    }
}

impl Default for ProximityAlertEngine {
    fn default() -> Self {
        ProximityAlertEngine::new(
            AlertThresholds::default(),
            super::cooldown::DEFAULT_COOLDOWN_MS,
            super::history::DEFAULT_HISTORY_CAPACITY,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluator::GeofenceStatus;
    use crate::geo::Coordinate;
    use crate::notify::RecordingDispatcher;

    const TARGET: Coordinate = Coordinate::new_unchecked(19.4326, -99.1332);

    fn geofence() -> Geofence {
        Geofence {
            id: "G".to_string(),
            target_location: TARGET,
            radius_meters: 50.0,
            delivery_id: "D1".to_string(),
            folio: "F1".to_string(),
            client_name: "Ana".to_string(),
            is_active: true,
            created_at_millis: 0,
        }
    }

    fn types_for(engine: &mut ProximityAlertEngine, distances: &[f64]) -> Vec<AlertType> {
        let g = geofence();
        distances
            .iter()
            .enumerate()
            .flat_map(|(i, d)| engine.check_thresholds(&g, *d, i as i64))
            .map(|a| a.alert_type)
            .collect()
    }

    #[test]
    fn test_monotonic_approach() {
        let mut engine = ProximityAlertEngine::default();
        let types = types_for(&mut engine, &[500.0, 150.0, 80.0, 40.0]);
        assert_eq!(types, vec![AlertType::Approaching, AlertType::Warning]);
    }

    #[test]
    fn test_rearm_only_after_rising_above() {
        let mut engine = ProximityAlertEngine::default();
        let types = types_for(&mut engine, &[500.0, 150.0, 250.0, 150.0, 40.0]);
        assert_eq!(
            types,
            vec![AlertType::Approaching, AlertType::Approaching, AlertType::Warning]
        );
    }

    #[test]
    fn test_exactly_on_threshold_does_not_rearm() {
        let mut engine = ProximityAlertEngine::default();
        // 200 is "at or below", so going back to exactly 200 does not re-arm
        let types = types_for(&mut engine, &[300.0, 150.0, 200.0, 150.0]);
        assert_eq!(types, vec![AlertType::Approaching]);
    }

    #[test]
    fn test_multi_threshold_jump() {
        let mut engine = ProximityAlertEngine::default();
        let types = types_for(&mut engine, &[900.0, 30.0]);
        assert_eq!(types, vec![AlertType::Approaching, AlertType::Warning]);
        assert_eq!(engine.zone("G"), Some(ProximityZone::Inside));
    }

    #[test]
    fn test_first_reading_counts_as_crossing_from_infinity() {
        let mut engine = ProximityAlertEngine::default();
        let types = types_for(&mut engine, &[150.0]);
        assert_eq!(types, vec![AlertType::Approaching]);
    }

    #[test]
    fn test_edge_alert() {
        let mut engine = ProximityAlertEngine::default();
        let g = geofence();
        let event = GeofenceEvent::Exit {
            geofence_id: "G".to_string(),
            status: GeofenceStatus {
                is_inside: false,
                distance_meters: 61.0,
                target_location: TARGET,
                current_location: TARGET.destination(0.0, 61.0),
            },
        };
        let alert = engine.edge_alert(&g, &event, 99);
        assert_eq!(alert.alert_type, AlertType::Exited);
        assert_eq!(alert.threshold_meters, 50.0);
        assert_eq!(alert.distance_meters, 61.0);
        assert_eq!(alert.folio, "F1");
    }

    #[test]
    fn test_cooldown_keeps_history() {
        let mut engine = ProximityAlertEngine::default();
        let mut dispatcher = RecordingDispatcher::new();
        let g = geofence();

        let first = engine.build(&g, AlertType::Entered, 10.0, 50.0, 0);
        let second = engine.build(&g, AlertType::Entered, 12.0, 50.0, 10_000);
        assert_ne!(first.id, second.id);

        assert_eq!(engine.record_and_dispatch(&first, &mut dispatcher, 0), DispatchOutcome::Presented);
        assert_eq!(
            engine.record_and_dispatch(&second, &mut dispatcher, 10_000),
            DispatchOutcome::Suppressed
        );

        assert_eq!(engine.history().len(), 2);
        assert_eq!(dispatcher.notifications.len(), 1);
        assert_eq!(dispatcher.notifications[0].title, "Arrived at delivery");
    }

    #[test]
    fn test_dispatch_failure_recorded() {
        let mut engine = ProximityAlertEngine::default();
        let mut dispatcher = RecordingDispatcher::failing();
        let alert = engine.build(&geofence(), AlertType::Warning, 90.0, 100.0, 0);

        assert_eq!(engine.record_and_dispatch(&alert, &mut dispatcher, 0), DispatchOutcome::Failed);
        assert_eq!(engine.history().len(), 1);
    }

    #[test]
    fn test_forget_keeps_history() {
        let mut engine = ProximityAlertEngine::default();
        let mut dispatcher = RecordingDispatcher::new();
        let g = geofence();
        for alert in engine.check_thresholds(&g, 150.0, 0) {
            engine.record_and_dispatch(&alert, &mut dispatcher, 0);
        }

        engine.forget("G");
        assert!(engine.last_distance("G").is_none());
        assert!(engine.zone("G").is_none());
        assert_eq!(engine.alerts_for("G").len(), 1);
    }
}
