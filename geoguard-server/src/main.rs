use std::time::Duration;

use clap::Parser;
use geoguard_server::config::Cli;
use tokio_graceful_shutdown::{SubsystemBuilder, SubsystemHandle, Toplevel};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    env_logger::Builder::new()
        .filter_level(cli.verbose.log_level_filter())
        .init();

    let (runner, source) = geoguard_server::prepare(&cli)?;

    Toplevel::new(|s| async move {
        s.start(SubsystemBuilder::new("tracker", move |s: SubsystemHandle| runner.run(s)));
        s.start(SubsystemBuilder::new("location", move |s: SubsystemHandle| source.run(s)));
    })
    .catch_signals()
    .handle_shutdown_requests(Duration::from_millis(1000))
    .await?;

    Ok(())
}
