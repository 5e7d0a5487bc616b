//! evpipe Server
//!
//! Accepts binary-encoded events, filters and transforms them, and delivers
//! them to an external HTTP service at a bounded rate.

mod config;
mod server;
mod shutdown;
mod state;

use clap::Parser;
use config::ConfigLoader;
use evpipe_core::events::raw_record_channel;
use evpipe_core::metrics::MetricsRegistry;
use evpipe_core::pipeline::Pipeline;
use evpipe_core::processors::{HttpSink, PipelineRunner};
use evpipe_core::throttle::RateLimiter;
use server::{build_router, run_server};
use shutdown::shutdown_signal;
use state::AppState;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::watch;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// evpipe - rate-limited event delivery pipeline
#[derive(Parser, Debug)]
#[command(name = "evpipe-server")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to the configuration file
    #[arg(short, long, env = "EVPIPE_CONFIG", default_value = "./evpipe-config.toml")]
    config: PathBuf,

    /// Override the listen address (e.g., 0.0.0.0:3000)
    #[arg(short, long)]
    listen: Option<SocketAddr>,

    /// Override the external service URL
    #[arg(long, env = "EVPIPE_EXTERNAL_SERVICE_URL")]
    external_service_url: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    init_tracing();

    // Parse command line arguments
    let args = Args::parse();

    tracing::info!("Starting evpipe-server v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config_loader =
        ConfigLoader::new(&args.config, args.listen).with_url_override(args.external_service_url);
    let loaded_config = config_loader.load().map_err(|e| {
        tracing::error!("Failed to load configuration: {}", e);
        e
    })?;
    tracing::info!("Configuration loaded from {:?}", args.config);

    let listen_addr = loaded_config.server.listen;
    let pipeline_config = loaded_config.pipeline;
    tracing::info!(
        topic = %pipeline_config.source.topic,
        workers = pipeline_config.source.workers.get(),
        max_count = pipeline_config.throttling.max_count.get(),
        period = ?pipeline_config.throttling.period,
        target = %pipeline_config.external_service.url,
        "Pipeline configured"
    );

    // Build the pipeline
    let metrics = MetricsRegistry::new();
    let pipeline = Arc::new(Pipeline::new(
        HttpSink::new(pipeline_config.external_service.timeout),
        RateLimiter::from_config(&pipeline_config.throttling),
        &pipeline_config.external_service,
        metrics.clone(),
    ));

    // Wire the runner
    let (record_tx, record_rx) = raw_record_channel();
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let runner = PipelineRunner::new(
        pipeline,
        record_rx,
        shutdown_rx,
        pipeline_config.source.workers,
    );
    let runner_handle = tokio::spawn(runner.run());

    // Build the router
    let state = AppState::new(metrics, record_tx, pipeline_config.source.topic);
    let router = build_router(state);

    // Run the server
    tracing::info!("Starting HTTP server on {}", listen_addr);
    let result = run_server(router, listen_addr, shutdown_signal()).await;

    // Stop the runner and wait for in-flight records
    tracing::info!("Draining pipeline...");
    let _ = shutdown_tx.send(true);
    if let Err(e) = runner_handle.await {
        tracing::error!("Pipeline runner task failed: {}", e);
    }
    tracing::info!("Server shutdown complete");

    result.map_err(Into::into)
}

/// Initialize the tracing subscriber with environment-based filtering.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,hyper=warn,reqwest=warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}
