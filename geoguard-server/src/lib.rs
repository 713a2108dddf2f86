//! Native runtime for the geoguard delivery geofencing pipeline
//!
//! Wires a [`GeofenceTracker`] to a channel-fed location provider, a
//! simulated or replayed driver, and log based notifications.

use std::future::Future;

use anyhow::Context;
use geoguard_core::{GeofenceRequest, GeofenceTracker};
use tokio_graceful_shutdown::SubsystemHandle;

pub mod config;
pub mod dispatch;
pub mod error;
pub mod output;
pub mod runner;
pub mod simulation;
pub mod tokio_location;

use config::{load_tracker_config, Cli};
use error::ServerError;
use output::JsonLines;
use runner::TrackerRunner;
use simulation::{ReplayFeed, SimulatedDriver};
use tokio_location::TokioLocationProvider;

/// Where the samples come from
pub enum SampleSource {
    Simulated(SimulatedDriver),
    Replay(ReplayFeed),
}

impl SampleSource {
    /// Produce samples until done or until `shutdown` resolves
    pub async fn produce<S>(self, shutdown: S) -> Result<(), ServerError>
    where
        S: Future<Output = ()>,
    {
        match self {
            SampleSource::Simulated(driver) => driver.drive(shutdown).await,
            SampleSource::Replay(feed) => feed.play(shutdown).await,
        }
    }

    pub async fn run(self, subsys: SubsystemHandle) -> Result<(), ServerError> {
        match self.produce(subsys.on_shutdown_requested()).await {
            Err(ServerError::Shutdown) => Ok(()),
            r => r,
        }
    }
}

/// Build the tracker, its geofence and the sample producer from the command line
pub fn prepare(cli: &Cli) -> anyhow::Result<(TrackerRunner, SampleSource)> {
    let config = load_tracker_config(cli)?;
    let target = cli.target()?;

    let mut tracker = GeofenceTracker::new(config);
    if cli.output {
        JsonLines::stdout().attach(&mut tracker);
    }

    let mut request = GeofenceRequest::new(cli.delivery_id.clone(), cli.folio.clone(), cli.client_name.clone(), target);
    if let Some(radius) = cli.radius {
        request = request.with_radius(radius);
    }
    let now_ms = chrono::Utc::now().timestamp_millis().max(0) as u64;
    let geofence_id = tracker.create_geofence(request, now_ms);
    log::info!(
        "Geofence {} around ({:.5}, {:.5}) for {} (folio {})",
        geofence_id,
        target.latitude,
        target.longitude,
        cli.client_name,
        cli.folio
    );

    let (provider, sender) = TokioLocationProvider::new();
    let source = match &cli.replay {
        Some(path) => SampleSource::Replay(
            ReplayFeed::from_file(path, cli.interval_ms, sender).context("Cannot start replay")?,
        ),
        None => SampleSource::Simulated(SimulatedDriver::new(
            target,
            cli.bearing,
            cli.start_distance,
            cli.speed,
            cli.interval_ms,
            sender,
        )),
    };

    Ok((TrackerRunner::new(tracker, provider), source))
}
