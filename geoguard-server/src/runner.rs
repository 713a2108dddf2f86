use std::future::Future;

use geoguard_core::GeofenceTracker;
use tokio_graceful_shutdown::SubsystemHandle;

use crate::dispatch::LogDispatcher;
use crate::error::ServerError;
use crate::tokio_location::TokioLocationProvider;

/// How a tracking session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    StreamClosed,
    ShutdownRequested,
}

/// Owns the tracker and feeds it from the location channel
pub struct TrackerRunner {
    tracker: GeofenceTracker,
    provider: TokioLocationProvider,
    dispatcher: LogDispatcher,
}

impl TrackerRunner {
    pub fn new(tracker: GeofenceTracker, provider: TokioLocationProvider) -> Self {
        TrackerRunner {
            tracker,
            provider,
            dispatcher: LogDispatcher::new(),
        }
    }

    pub fn tracker(&self) -> &GeofenceTracker {
        &self.tracker
    }

    pub fn dispatcher(&self) -> &LogDispatcher {
        &self.dispatcher
    }

    /// Start tracking and process samples until the stream closes or
    /// `shutdown` resolves
    pub async fn process<S>(&mut self, shutdown: S) -> Result<SessionEnd, ServerError>
    where
        S: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        self.tracker.start(&mut self.provider)?;

        loop {
            let more = tokio::select! {
                _ = &mut shutdown => None,
                more = self.provider.wait() => Some(more),
            };
            match more {
                None => return Ok(SessionEnd::ShutdownRequested),
                Some(false) => {
                    log::info!("Location stream closed");
                    return Ok(SessionEnd::StreamClosed);
                }
                Some(true) => {
                    let n = self.tracker.poll(&mut self.provider, &mut self.dispatcher);
                    log::trace!("Processed {} samples", n);
                }
            }
        }
    }

    /// Stop tracking and log a summary of the session
    pub fn finish(&mut self) {
        self.tracker.stop(&mut self.provider);

        let authorization = self.tracker.authorization();
        log::info!(
            "Session done: {} samples, {} alerts, {} notifications; authorized={} ({})",
            self.tracker.samples_processed(),
            self.tracker.alert_history().len(),
            self.dispatcher.presented(),
            authorization.is_authorized,
            authorization.reason
        );
        self.tracker.dispose(&mut self.provider);
    }

    pub async fn run(mut self, subsys: SubsystemHandle) -> Result<(), ServerError> {
        let r = self.process(subsys.on_shutdown_requested()).await;
        self.finish();
        if let Ok(SessionEnd::StreamClosed) = r {
            subsys.request_shutdown();
        }
        r.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geoguard_core::{Coordinate, GeofenceRequest, LocationSample, TrackerConfig, TrackerError};

    const TARGET: Coordinate = Coordinate::new_unchecked(19.4326, -99.1332);

    fn runner() -> (TrackerRunner, crate::tokio_location::SampleSender) {
        let (provider, sender) = TokioLocationProvider::new();
        let mut tracker = GeofenceTracker::new(TrackerConfig::default());
        tracker.create_geofence(GeofenceRequest::new("DLV-7", "F-7", "Luis", TARGET), 0);
        (TrackerRunner::new(tracker, provider), sender)
    }

    #[tokio::test]
    async fn test_processes_until_stream_closes() {
        let (mut runner, sender) = runner();
        for (i, d) in [400.0, 150.0, 80.0, 20.0].iter().enumerate() {
            let sample = LocationSample::new(TARGET.destination(90.0, *d), 5.0, i as i64 * 1000);
            sender.samples.send(sample).await.unwrap();
        }
        drop(sender);

        let end = runner.process(std::future::pending()).await.unwrap();
        assert_eq!(end, SessionEnd::StreamClosed);
        assert_eq!(runner.tracker().samples_processed(), 4);
        assert!(runner.tracker().authorization().is_authorized);
        assert_eq!(runner.tracker().alert_history().len(), 3);
        assert_eq!(runner.dispatcher().presented(), 3);

        runner.finish();
        assert_eq!(runner.tracker().state(), geoguard_core::TrackerState::Disposed);
    }

    #[tokio::test]
    async fn test_shutdown_request() {
        let (mut runner, _sender) = runner();
        let end = runner.process(async {}).await.unwrap();
        assert_eq!(end, SessionEnd::ShutdownRequested);
    }

    #[tokio::test]
    async fn test_permission_denied() {
        let (mut provider, _sender) = TokioLocationProvider::new();
        provider.set_permitted(false);
        let mut runner = TrackerRunner::new(GeofenceTracker::default(), provider);

        let r = runner.process(std::future::pending()).await;
        assert!(matches!(r, Err(ServerError::Tracker(TrackerError::PermissionDenied))));
        assert!(!runner.tracker().authorization().is_authorized);
        assert_eq!(runner.tracker().authorization().reason, "Permissions required");
    }
}
