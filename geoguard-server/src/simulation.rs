//! Sample producers for the native server
//!
//! [`SimulatedDriver`] drives a straight approach towards the delivery
//! target, [`ReplayFeed`] plays back a recorded JSON array of samples. Both
//! push into a [`SampleSender`] and only produce while the tracker holds a
//! location subscription, at the cadence of the profile it asked for.
//! Dropping the producer closes the stream, which ends the session.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::Duration;

use geoguard_core::{Coordinate, LocationSample, SamplingProfile};
use tokio::time::sleep;

use crate::error::ServerError;
use crate::tokio_location::SampleSender;

/// Number of samples sent from the target after arriving
pub const LINGER_SAMPLES: u32 = 3;

/// Playback interval for replays without an explicit one
pub const REPLAY_INTERVAL_MS: u64 = 200;

const SIMULATED_ACCURACY_METERS: f64 = 5.0;

/// Wait until a subscription is active and return its profile
async fn wait_for_profile<S>(sender: &mut SampleSender, shutdown: &mut S) -> Result<SamplingProfile, ServerError>
where
    S: Future<Output = ()> + Unpin,
{
    loop {
        let current = *sender.profile.borrow_and_update();
        if let Some(profile) = current {
            return Ok(profile);
        }
        tokio::select! {
            _ = &mut *shutdown => return Err(ServerError::Shutdown),
            r = sender.profile.changed() => {
                if r.is_err() {
                    // Provider is gone
                    return Err(ServerError::Shutdown);
                }
            }
        }
    }
}

async fn send_sample<S>(sender: &SampleSender, sample: LocationSample, shutdown: &mut S) -> Result<(), ServerError>
where
    S: Future<Output = ()> + Unpin,
{
    tokio::select! {
        _ = &mut *shutdown => Err(ServerError::Shutdown),
        r = sender.samples.send(sample) => r.map_err(|_| ServerError::Shutdown),
    }
}

async fn pause<S>(interval_ms: u64, shutdown: &mut S) -> Result<(), ServerError>
where
    S: Future<Output = ()> + Unpin,
{
    tokio::select! {
        _ = &mut *shutdown => Err(ServerError::Shutdown),
        _ = sleep(Duration::from_millis(interval_ms)) => Ok(()),
    }
}

fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// A driver heading straight for the target at constant speed
pub struct SimulatedDriver {
    target: Coordinate,
    bearing_deg: f64,
    start_distance_m: f64,
    speed_mps: f64,
    interval_ms: Option<u64>,
    sender: SampleSender,
}

impl SimulatedDriver {
    /// `bearing_deg` points from the target to the starting position
    pub fn new(
        target: Coordinate,
        bearing_deg: f64,
        start_distance_m: f64,
        speed_mps: f64,
        interval_ms: Option<u64>,
        sender: SampleSender,
    ) -> Self {
        SimulatedDriver {
            target,
            bearing_deg,
            start_distance_m: start_distance_m.max(0.0),
            speed_mps: speed_mps.max(0.0),
            interval_ms,
            sender,
        }
    }

    /// Remaining distance to the target after `elapsed_ms` of driving
    pub fn remaining_at(&self, elapsed_ms: u64) -> f64 {
        let driven = self.speed_mps * elapsed_ms as f64 / 1000.0;
        (self.start_distance_m - driven).max(0.0)
    }

    /// Position after `elapsed_ms` of driving
    pub fn position_at(&self, elapsed_ms: u64) -> Coordinate {
        self.target.destination(self.bearing_deg, self.remaining_at(elapsed_ms))
    }

    fn sample_at(&self, elapsed_ms: u64) -> LocationSample {
        let moving = self.remaining_at(elapsed_ms) > 0.0;
        LocationSample {
            speed_meters_per_second: Some(if moving { self.speed_mps } else { 0.0 }),
            heading_degrees: Some((self.bearing_deg + 180.0) % 360.0),
            ..LocationSample::new(self.position_at(elapsed_ms), SIMULATED_ACCURACY_METERS, now_millis())
        }
    }

    /// Produce samples until the driver has arrived and lingered, or until
    /// `shutdown` resolves
    pub async fn drive<S>(mut self, shutdown: S) -> Result<(), ServerError>
    where
        S: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        log::info!(
            "Simulated driver starting {:.0}m from target at {:.1} m/s",
            self.start_distance_m,
            self.speed_mps
        );

        let mut elapsed_ms = 0;
        let mut lingered = 0;
        loop {
            let profile = wait_for_profile(&mut self.sender, &mut shutdown).await?;
            let interval_ms = self.interval_ms.unwrap_or_else(|| profile.interval_ms());

            let sample = self.sample_at(elapsed_ms);
            log::trace!("Simulated sample {:?}", sample);
            send_sample(&self.sender, sample, &mut shutdown).await?;

            if self.remaining_at(elapsed_ms) <= 0.0 {
                lingered += 1;
                if lingered > LINGER_SAMPLES {
                    log::info!("Simulated driver arrived");
                    return Ok(());
                }
            }

            pause(interval_ms, &mut shutdown).await?;
            elapsed_ms += interval_ms;
        }
    }
}

/// Plays back recorded samples
pub struct ReplayFeed {
    samples: Vec<LocationSample>,
    interval_ms: Option<u64>,
    sender: SampleSender,
}

impl ReplayFeed {
    pub fn new(samples: Vec<LocationSample>, interval_ms: Option<u64>, sender: SampleSender) -> Self {
        ReplayFeed {
            samples,
            interval_ms,
            sender,
        }
    }

    /// Load a JSON array of samples from `path`
    pub fn from_file(path: &Path, interval_ms: Option<u64>, sender: SampleSender) -> Result<Self, ServerError> {
        let json = std::fs::read_to_string(path).map_err(|e| ServerError::ReplayRead(PathBuf::from(path), e))?;
        let samples: Vec<LocationSample> =
            serde_json::from_str(&json).map_err(|e| ServerError::ReplayFormat(PathBuf::from(path), e))?;
        log::info!("Loaded {} samples from {}", samples.len(), path.display());
        Ok(Self::new(samples, interval_ms, sender))
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Send every sample in order, then close the stream
    pub async fn play<S>(mut self, shutdown: S) -> Result<(), ServerError>
    where
        S: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        let interval_ms = self.interval_ms.unwrap_or(REPLAY_INTERVAL_MS);
        let samples = std::mem::take(&mut self.samples);

        for (i, sample) in samples.into_iter().enumerate() {
            wait_for_profile(&mut self.sender, &mut shutdown).await?;
            if i > 0 {
                pause(interval_ms, &mut shutdown).await?;
            }
            send_sample(&self.sender, sample, &mut shutdown).await?;
        }
        log::info!("Replay finished");
        Ok(())
    }
}
