use std::io;
use std::path::PathBuf;

use geoguard_core::TrackerError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Shutdown")]
    Shutdown,
    #[error("Cannot read replay file {0}")]
    ReplayRead(PathBuf, #[source] io::Error),
    #[error("Replay file {0} is not a JSON array of location samples")]
    ReplayFormat(PathBuf, #[source] serde_json::Error),
    #[error("Tracker error: {0}")]
    Tracker(#[from] TrackerError),
}
