use clap::Parser;
use geoguard_core::{AlertType, Coordinate, LocationSample, TrackerState};
use geoguard_server::config::Cli;
use geoguard_server::runner::SessionEnd;
use geoguard_server::{prepare, SampleSource};

const TARGET: Coordinate = Coordinate::new_unchecked(19.4326, -99.1332);

fn cli(args: &[&str]) -> Cli {
    let mut argv = vec!["geoguard-server", "--target-lat", "19.4326", "--target-lon", "-99.1332"];
    argv.extend_from_slice(args);
    Cli::parse_from(argv)
}

#[tokio::test]
async fn test_replay_session() {
    let samples: Vec<LocationSample> = [300.0, 120.0, 70.0, 40.0, 45.0]
        .iter()
        .enumerate()
        .map(|(i, d)| LocationSample::new(TARGET.destination(45.0, *d), 5.0, 1_000 * (i as i64 + 1)))
        .collect();
    let file = tempfile::NamedTempFile::new().unwrap();
    std::fs::write(file.path(), serde_json::to_string(&samples).unwrap()).unwrap();

    let path = file.path().to_str().unwrap().to_string();
    let (mut runner, source) = prepare(&cli(&["--replay", &path, "--interval-ms", "1", "--delivery-id", "DLV-9"])).unwrap();
    assert!(matches!(source, SampleSource::Replay(_)));

    let producer = tokio::spawn(source.produce(std::future::pending()));
    let end = runner.process(std::future::pending()).await.unwrap();
    producer.await.unwrap().unwrap();

    assert_eq!(end, SessionEnd::StreamClosed);
    let tracker = runner.tracker();
    assert_eq!(tracker.samples_processed(), 5);
    assert!(tracker.authorization().is_authorized);
    assert!(tracker.authorization().geofence_id.as_deref().unwrap().starts_with("DLV-9_"));

    let types: Vec<AlertType> = tracker.alert_history().iter().map(|a| a.alert_type).collect();
    assert_eq!(types, vec![AlertType::Approaching, AlertType::Warning, AlertType::Entered]);

    runner.finish();
    assert_eq!(runner.tracker().state(), TrackerState::Disposed);
}

#[tokio::test]
async fn test_simulated_session_reaches_target() {
    // 40m per 1ms step from 300m
    let (mut runner, source) = prepare(&cli(&["--start-distance", "300", "--speed", "40000", "--interval-ms", "1"])).unwrap();
    assert!(matches!(source, SampleSource::Simulated(_)));

    let producer = tokio::spawn(source.produce(std::future::pending()));
    let end = runner.process(std::future::pending()).await.unwrap();
    producer.await.unwrap().unwrap();

    assert_eq!(end, SessionEnd::StreamClosed);
    let tracker = runner.tracker();
    assert!(tracker.authorization().is_authorized);
    assert_eq!(tracker.authorization().reason, "Driver inside delivery area");

    let entered = tracker
        .alert_history()
        .iter()
        .filter(|a| a.alert_type == AlertType::Entered)
        .count();
    assert_eq!(entered, 1);
}

#[test]
fn test_missing_replay_file() {
    let r = prepare(&cli(&["--replay", "/nonexistent/samples.json"]));
    assert!(r.is_err());
}
