use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

mod api;
mod config;

use config::Config;
use rig_stats::{run_consumer, PushMailbox, ReportCache, RigInfoRequest, RigStatsEngine};
use stats_rig::poller::{start_rig_polling, RequestGate};
use stats_rig::stats_handler::StatsHandler;
use stats_rig::upstream::UpstreamClient;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_args()?;
    info!("Starting rig-stats service for rig {}", config.rig_id);
    info!("Telemetry source: {}", config.upstream_address);
    info!("HTTP server: {}", config.http_address);

    let engine = RigStatsEngine::new(config.engine);
    let options = engine.options();
    info!(
        "Window policies: short={:?}, long={:?}",
        options.short, options.long
    );

    let mailbox = Arc::new(PushMailbox::new());
    let reports = Arc::new(ReportCache::new());

    let consumer = tokio::spawn(run_consumer(mailbox.clone(), engine, reports.clone()));

    // HTTP API exposes the latest report to chart consumers
    let http_address = config.http_address.clone();
    let reports_for_http = reports.clone();
    let staleness_threshold = Duration::from_secs(config.staleness_threshold_secs);
    tokio::spawn(async move {
        if let Err(e) = api::run_http_server(http_address, reports_for_http, staleness_threshold).await
        {
            error!("HTTP server error: {}", e);
        }
    });

    let gate = Arc::new(RequestGate::new());
    let handler = Arc::new(StatsHandler::new(mailbox.clone(), gate.clone()));
    let client = Arc::new(UpstreamClient::new(
        config.upstream_address.clone(),
        handler,
        gate,
    ));

    let polling = start_rig_polling(
        client,
        RigInfoRequest::new(config.rig_id.clone(), config.rig_ip.clone()),
        Duration::from_secs(config.poll_interval_secs),
        Duration::from_secs(config.request_timeout_secs),
    );

    tokio::select! {
        _ = polling => {}
        result = tokio::signal::ctrl_c() => {
            if let Err(e) = result {
                error!("Failed to listen for shutdown signal: {}", e);
            }
            info!("Shutdown requested");
        }
    }

    mailbox.close();
    consumer.await?;
    Ok(())
}
