//! Command line and configuration file handling

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Parser;
use clap_verbosity_flag::{InfoLevel, Verbosity};
use directories::ProjectDirs;
use geoguard_core::{Coordinate, SamplingProfile, TrackerConfig};

/// Name of the config file looked up in the user's config directory
pub const CONFIG_FILE_NAME: &str = "tracker.json";

#[derive(Parser, Clone, Debug)]
#[command(version, about = "Track a delivery driver against a drop-off geofence")]
pub struct Cli {
    #[command(flatten)]
    pub verbose: Verbosity<InfoLevel>,

    /// Latitude of the delivery target
    #[arg(long, default_value_t = 19.4326, allow_hyphen_values = true)]
    pub target_lat: f64,

    /// Longitude of the delivery target
    #[arg(long, default_value_t = -99.1332, allow_hyphen_values = true)]
    pub target_lon: f64,

    /// Geofence radius in meters (defaults to the configured radius)
    #[arg(long)]
    pub radius: Option<f64>,

    #[arg(long, default_value = "DLV-0001")]
    pub delivery_id: String,

    #[arg(long, default_value = "F-0001")]
    pub folio: String,

    #[arg(long, default_value = "Customer")]
    pub client_name: String,

    /// Distance in meters at which the simulated driver starts
    #[arg(long, default_value_t = 400.0)]
    pub start_distance: f64,

    /// Bearing (degrees) from the target to the simulated driver's start
    #[arg(long, default_value_t = 225.0)]
    pub bearing: f64,

    /// Simulated driver speed in meters per second
    #[arg(long, default_value_t = 12.0)]
    pub speed: f64,

    /// Override the interval between simulated or replayed samples (ms)
    #[arg(long)]
    pub interval_ms: Option<u64>,

    /// Sampling profile: foreground or background
    #[arg(long)]
    pub profile: Option<SamplingProfile>,

    /// Replay a JSON array of location samples instead of simulating
    #[arg(long)]
    pub replay: Option<PathBuf>,

    /// Tracker configuration file (JSON)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Print geofence events, alerts and authorization changes as JSON lines
    #[arg(long, default_value_t = false)]
    pub output: bool,
}

impl Cli {
    pub fn target(&self) -> anyhow::Result<Coordinate> {
        Coordinate::new(self.target_lat, self.target_lon).context("Invalid --target-lat/--target-lon")
    }
}

/// Default config path in the user's config directory
pub fn default_config_path() -> Option<PathBuf> {
    ProjectDirs::from("", "", "geoguard").map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
}

pub fn read_config_file(path: &Path) -> anyhow::Result<TrackerConfig> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Cannot read config file {}", path.display()))?;
    TrackerConfig::from_json(&json).with_context(|| format!("Invalid config file {}", path.display()))
}

/// Build the tracker configuration
///
/// An explicit `--config` file must exist. Otherwise the file in the user's
/// config directory is used when present. Command line flags win.
pub fn load_tracker_config(cli: &Cli) -> anyhow::Result<TrackerConfig> {
    let mut config = match &cli.config {
        Some(path) => read_config_file(path)?,
        None => match default_config_path() {
            Some(path) if path.exists() => {
                log::info!("Using configuration from {}", path.display());
                read_config_file(&path)?
            }
            _ => TrackerConfig::default(),
        },
    };

    if let Some(radius) = cli.radius {
        config.default_radius_meters = radius;
    }
    if let Some(profile) = cli.profile {
        config.sampling_profile = profile;
    }

    config.validate()?;
    Ok(config)
}
