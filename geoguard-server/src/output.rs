//! JSON lines output of tracker events

use std::io::Write;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use geoguard_core::{DeliveryAuthorizationStatus, GeofenceEvent, GeofenceTracker, ProximityAlert};
use serde::Serialize;

/// One line of output
#[derive(Debug, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum OutputRecord<'a> {
    GeofenceEvent {
        at: DateTime<Utc>,
        event: &'a GeofenceEvent,
    },
    ProximityAlert {
        at: DateTime<Utc>,
        alert: &'a ProximityAlert,
    },
    Authorization {
        at: DateTime<Utc>,
        status: &'a DeliveryAuthorizationStatus,
    },
}

/// Writes records to a shared sink, one JSON document per line
#[derive(Clone)]
pub struct JsonLines {
    sink: Arc<Mutex<Box<dyn Write + Send>>>,
}

impl JsonLines {
    pub fn new<W: Write + Send + 'static>(sink: W) -> Self {
        JsonLines {
            sink: Arc::new(Mutex::new(Box::new(sink))),
        }
    }

    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }

    pub fn write(&self, record: &OutputRecord<'_>) {
        let line = match serde_json::to_string(record) {
            Ok(line) => line,
            Err(e) => {
                log::warn!("Cannot serialize output record: {}", e);
                return;
            }
        };
        let Ok(mut sink) = self.sink.lock() else {
            log::warn!("Output sink poisoned");
            return;
        };
        if let Err(e) = writeln!(sink, "{}", line).and_then(|_| sink.flush()) {
            log::warn!("Cannot write output: {}", e);
        }
    }

    /// Subscribe to every tracker stream
    pub fn attach(&self, tracker: &mut GeofenceTracker) {
        let out = self.clone();
        tracker.subscribe_geofence_events(move |event| {
            out.write(&OutputRecord::GeofenceEvent { at: Utc::now(), event })
        });
        let out = self.clone();
        tracker.subscribe_proximity_alerts(move |alert| {
            out.write(&OutputRecord::ProximityAlert { at: Utc::now(), alert })
        });
        let out = self.clone();
        tracker.subscribe_authorization(move |status| {
            out.write(&OutputRecord::Authorization { at: Utc::now(), status })
        });
    }
}
