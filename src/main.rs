use std::sync::Arc;

pub mod config;
pub mod events;
pub mod http_probe;
pub mod lifecycle;
pub mod logging;
pub mod round;
pub mod scheduler;
pub mod stats;
pub mod targets;

#[cfg(test)]
mod test_support;

use config::{ConfigSource, load_config};
use events::TracingSink;
use http_probe::prelude::*;
use lifecycle::{Shutdown, wait_for_signal};
use round::{KeepAliveContext, RoundCoordinator};
use scheduler::Scheduler;
use stats::StatsAggregator;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let (config, source) = load_config()?;
    logging::init_tracing(&config.logging)?;
    match &source {
        ConfigSource::File(path) => tracing::info!(%path, "Loaded configuration"),
        ConfigSource::Defaults(path) => tracing::info!(%path, "Config file not found, using defaults"),
    }

    let registry = Arc::new(config.build_registry());
    tracing::info!(
        targets = ?registry.snapshot(),
        cron_step_minutes = config.cron_step_minutes,
        check_interval_ms = config.check_interval_ms,
        overlap = ?config.overlap,
        "🚀 Starting keep-alive"
    );

    let fetcher = ReqwestFetcher::new(&config.user_agent)?;
    let context = KeepAliveContext {
        registry,
        stats: Arc::new(StatsAggregator::new()),
        events: Arc::new(TracingSink),
    };
    let prober = Prober::new(Arc::new(fetcher), config.probe_settings());
    let coordinator = Arc::new(RoundCoordinator::new(context, prober, config.round_settings()));

    let shutdown = Shutdown::new();
    let mut scheduler = Scheduler::new(coordinator, config.schedule_settings(), shutdown.subscribe());

    let signals = tokio::spawn(async move {
        match wait_for_signal().await {
            Ok(name) => {
                tracing::info!(signal = name, "🛑 Received {name}, shutting down");
                shutdown.trigger();
            }
            Err(e) => {
                // default signal dispositions still terminate the process
                tracing::error!(error = %e, "Failed to install signal handlers");
                std::future::pending::<()>().await;
            }
        }
    });

    let result = scheduler.run().await;
    signals.abort();
    tracing::info!(state = ?scheduler.state(), "Scheduler finished");
    result?;

    Ok(())
}
