//! Notification Dispatch
//!
//! The pipeline hands user-facing alerts to a [`NotificationDispatcher`]
//! supplied by the platform. Dispatch is best effort: errors are logged by
//! the caller and never affect authorization or alert history.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::error::DispatchError;

/// How prominently the platform should present a notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Success,
}

/// Presents notifications to the user (push, banner, log...)
pub trait NotificationDispatcher {
    fn present(&mut self, title: &str, body: &str, severity: Severity) -> Result<(), DispatchError>;
}

/// Dispatcher that drops everything, for headless use
#[derive(Debug, Default, Clone, Copy)]
pub struct NullDispatcher;

impl NotificationDispatcher for NullDispatcher {
    fn present(&mut self, _title: &str, _body: &str, _severity: Severity) -> Result<(), DispatchError> {
        Ok(())
    }
}

/// A presented notification, as captured by [`RecordingDispatcher`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub title: String,
    pub body: String,
    pub severity: Severity,
}

/// Dispatcher that keeps every notification in memory
///
/// Can be told to fail, to exercise the swallow-and-log path.
#[derive(Debug, Default, Clone)]
pub struct RecordingDispatcher {
    pub notifications: Vec<Notification>,
    pub fail: bool,
}

impl RecordingDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        RecordingDispatcher {
            notifications: Vec::new(),
            fail: true,
        }
    }
}

impl NotificationDispatcher for RecordingDispatcher {
    fn present(&mut self, title: &str, body: &str, severity: Severity) -> Result<(), DispatchError> {
        if self.fail {
            return Err(DispatchError::new("notifications unavailable"));
        }
        self.notifications.push(Notification {
            title: title.to_string(),
            body: body.to_string(),
            severity,
        });
        Ok(())
    }
}

impl<D: NotificationDispatcher + ?Sized> NotificationDispatcher for Box<D> {
    fn present(&mut self, title: &str, body: &str, severity: Severity) -> Result<(), DispatchError> {
        (**self).present(title, body, severity)
    }
}
