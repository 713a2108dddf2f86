//! Tokio implementation of LocationProvider for the native server.
//!
//! Producers (the simulator, a replay file, a GPS bridge) push samples into
//! a bounded `mpsc` channel. `TokioLocationProvider` is the single consumer:
//! it exposes the channel through the poll-based `LocationProvider` trait
//! that `GeofenceTracker` expects, plus an async [`wait`](TokioLocationProvider::wait)
//! so the owning task can sleep until something arrives.
//!
//! The sampling profile requested by the tracker is published on a `watch`
//! channel; producers read it to choose their cadence and pause while
//! nobody is subscribed.

use std::collections::VecDeque;
use std::time::Instant;

use geoguard_core::error::LocationError;
use geoguard_core::location::{LocationProvider, LocationSample, SamplingProfile, SubscriptionHandle};
use tokio::sync::{mpsc, watch};

/// Capacity of the sample channel; at 1 Hz this is minutes of backlog
pub const SAMPLE_CHANNEL_CAPACITY: usize = 256;

/// Producer side of a [`TokioLocationProvider`]
#[derive(Debug, Clone)]
pub struct SampleSender {
    pub samples: mpsc::Sender<LocationSample>,
    /// `None` while no subscription is active
    pub profile: watch::Receiver<Option<SamplingProfile>>,
}

/// Channel-fed location provider
pub struct TokioLocationProvider {
    receiver: mpsc::Receiver<LocationSample>,
    profile_tx: watch::Sender<Option<SamplingProfile>>,
    pending: VecDeque<LocationSample>,
    permitted: bool,
    active: Option<i32>,
    next_handle: i32,
    closed: bool,
    start_time: Instant,
}

impl TokioLocationProvider {
    /// Create a provider and the sender its producers use
    pub fn new() -> (Self, SampleSender) {
        let (tx, rx) = mpsc::channel(SAMPLE_CHANNEL_CAPACITY);
        let (profile_tx, profile_rx) = watch::channel(None);
        let provider = TokioLocationProvider {
            receiver: rx,
            profile_tx,
            pending: VecDeque::new(),
            permitted: true,
            active: None,
            next_handle: 1,
            closed: false,
            start_time: Instant::now(),
        };
        let sender = SampleSender {
            samples: tx,
            profile: profile_rx,
        };
        (provider, sender)
    }

    /// Override the permission answer (e.g. from a platform capability check)
    pub fn set_permitted(&mut self, permitted: bool) {
        self.permitted = permitted;
    }

    /// Wait until at least one sample is queued
    ///
    /// Returns false once every producer has dropped its sender and the
    /// queue is empty.
    pub async fn wait(&mut self) -> bool {
        if !self.pending.is_empty() {
            return true;
        }
        if self.closed {
            return false;
        }
        match self.receiver.recv().await {
            Some(sample) => {
                self.pending.push_back(sample);
                true
            }
            None => {
                self.closed = true;
                false
            }
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed && self.pending.is_empty()
    }

    fn alloc_handle(&mut self) -> i32 {
        let handle = self.next_handle;
        self.next_handle += 1;
        handle
    }
}

impl LocationProvider for TokioLocationProvider {
    fn can_use_location(&self) -> bool {
        self.permitted
    }

    fn subscribe(&mut self, profile: SamplingProfile) -> Result<SubscriptionHandle, LocationError> {
        if !self.permitted {
            return Err(LocationError::Unavailable("location permission not granted".to_string()));
        }
        if self.active.is_some() {
            return Err(LocationError::AlreadySubscribed);
        }
        let handle = self.alloc_handle();
        self.active = Some(handle);
        // Nobody listening is fine: producers may not have started yet
        let _ = self.profile_tx.send(Some(profile));
        log::debug!("Location subscription {} ({})", handle, profile);
        Ok(SubscriptionHandle(handle))
    }

    fn poll_sample(&mut self, handle: &SubscriptionHandle) -> Option<LocationSample> {
        if self.active != Some(handle.0) {
            return None;
        }
        if let Some(sample) = self.pending.pop_front() {
            return Some(sample);
        }
        match self.receiver.try_recv() {
            Ok(sample) => Some(sample),
            Err(mpsc::error::TryRecvError::Empty) => None,
            Err(mpsc::error::TryRecvError::Disconnected) => {
                self.closed = true;
                None
            }
        }
    }

    fn unsubscribe(&mut self, handle: SubscriptionHandle) {
        if self.active == Some(handle.0) {
            self.active = None;
            let _ = self.profile_tx.send(None);
            log::debug!("Location subscription {} released", handle.0);
        }
    }

    fn current_time_ms(&self) -> u64 {
        self.start_time.elapsed().as_millis() as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geoguard_core::Coordinate;

    fn sample(ts: i64) -> LocationSample {
        LocationSample::new(Coordinate::new_unchecked(19.4326, -99.1332), 5.0, ts)
    }

    #[test]
    fn test_current_time_ms() {
        let (provider, _sender) = TokioLocationProvider::new();
        let time1 = provider.current_time_ms();
        std::thread::sleep(std::time::Duration::from_millis(10));
        let time2 = provider.current_time_ms();
        assert!(time2 >= time1 + 10);
    }

    #[test]
    fn test_handle_allocation() {
        let (mut provider, _sender) = TokioLocationProvider::new();
        let h1 = provider.alloc_handle();
        let h2 = provider.alloc_handle();
        assert_ne!(h1, h2);
    }

    #[tokio::test]
    async fn test_samples_in_order() {
        let (mut provider, sender) = TokioLocationProvider::new();
        let handle = provider.subscribe(SamplingProfile::Foreground).unwrap();

        for ts in 1..=3 {
            sender.samples.send(sample(ts)).await.unwrap();
        }
        assert!(provider.wait().await);

        let stamps: Vec<i64> = std::iter::from_fn(|| provider.poll_sample(&handle))
            .map(|s| s.timestamp_millis)
            .collect();
        assert_eq!(stamps, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_profile_published() {
        let (mut provider, sender) = TokioLocationProvider::new();
        assert_eq!(*sender.profile.borrow(), None);

        let handle = provider.subscribe(SamplingProfile::Background).unwrap();
        assert_eq!(*sender.profile.borrow(), Some(SamplingProfile::Background));

        provider.unsubscribe(handle);
        assert_eq!(*sender.profile.borrow(), None);
    }

    #[tokio::test]
    async fn test_wait_reports_closed() {
        let (mut provider, sender) = TokioLocationProvider::new();
        let handle = provider.subscribe(SamplingProfile::Foreground).unwrap();
        sender.samples.send(sample(1)).await.unwrap();
        drop(sender);

        assert!(provider.wait().await);
        assert!(provider.poll_sample(&handle).is_some());
        assert!(!provider.wait().await);
        assert!(provider.is_closed());
    }

    #[test]
    fn test_permission() {
        let (mut provider, _sender) = TokioLocationProvider::new();
        provider.set_permitted(false);
        assert!(!provider.can_use_location());
        assert!(provider.subscribe(SamplingProfile::Foreground).is_err());
    }
}
