//! Notification dispatchers for the native server
//!
//! There is no push service here, so notifications end up in the log.

use geoguard_core::error::DispatchError;
use geoguard_core::notify::{NotificationDispatcher, Severity};

/// Presents notifications as log records
#[derive(Debug, Default)]
pub struct LogDispatcher {
    presented: u64,
}

impl LogDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of notifications presented so far
    pub fn presented(&self) -> u64 {
        self.presented
    }
}

impl NotificationDispatcher for LogDispatcher {
    fn present(&mut self, title: &str, body: &str, severity: Severity) -> Result<(), DispatchError> {
        match severity {
            Severity::Info | Severity::Success => log::info!("[{}] {}: {}", severity, title, body),
            Severity::Warning => log::warn!("[{}] {}: {}", severity, title, body),
        }
        self.presented += 1;
        Ok(())
    }
}
