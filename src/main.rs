mod app_state;
mod config;
mod error;
mod models;
mod routes;
mod services;

use std::sync::Arc;
use std::time::Duration;

use axum::routing::get;
use metrics_exporter_prometheus::PrometheusBuilder;
use tracing_subscriber::EnvFilter;

use app_state::AppState;
use config::AppConfig;
use services::{replicate::ReplicateClient, storage::ImageStore, tracker::JobTracker};

#[tokio::main]
async fn main() {
    // Initialize structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    // Load configuration from environment; aborts here when the required
    // REPLICATE_API_TOKEN is absent.
    let config = AppConfig::from_env().expect("Failed to load configuration from environment");

    tracing::info!("Initializing infracolor server");

    // Initialize Prometheus metrics recorder
    let prometheus_handle = PrometheusBuilder::new()
        .install_recorder()
        .expect("Failed to install Prometheus metrics recorder");
    let prometheus_handle = Arc::new(prometheus_handle);

    // Register application metrics
    metrics::describe_counter!("colorize_jobs_total", "Total colorization jobs submitted");
    metrics::describe_counter!(
        "colorize_jobs_completed",
        "Total colorization jobs completed"
    );
    metrics::describe_counter!("colorize_jobs_failed", "Total colorization jobs that failed");
    metrics::describe_histogram!(
        "colorize_processing_seconds",
        "Time from provider submission to a terminal result"
    );

    // Initialize image storage
    tracing::info!(data_dir = %config.data_dir.display(), "Opening image store");
    let store = Arc::new(
        ImageStore::open(&config)
            .await
            .expect("Failed to open image store"),
    );

    // Initialize Replicate client and the job tracker
    let client = Arc::new(ReplicateClient::new(&config.replicate_api_token));
    let tracker = Arc::new(JobTracker::new(
        Arc::clone(&store),
        client,
        Duration::from_secs(config.poll_interval_secs),
        Duration::from_secs(config.poll_timeout_secs),
    ));

    let bind_addr = config.bind_addr.clone();
    let state = AppState::new(config, store, tracker);

    let app = routes::router(state).route(
        "/metrics",
        get(routes::metrics::prometheus_metrics).with_state(prometheus_handle),
    );

    tracing::info!("Starting infracolor on {}", bind_addr);

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .expect("Failed to bind to address");

    tracing::info!("Server listening on {}", bind_addr);

    axum::serve(listener, app).await.expect("Server error");
}
