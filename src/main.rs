// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Strava importer service
//!
//! Runs the scheduled Strava import jobs and serves the OAuth login and
//! dashboard API.

use std::sync::Arc;
use strava_importer::{
    config::Config,
    db::{ActivityStore, FirestoreDb, TokenBackend},
    scheduler::{jobs, Scheduler},
    services::{
        Aggregator, FtpService, ImportPipeline, Publisher, StateStore, StravaClient,
        StravaService, TokenCache, TwitterPublisher,
    },
    AppState,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration from environment
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            init_logging("info");
            tracing::error!(error = %e, "Invalid configuration");
            std::process::exit(1);
        }
    };
    init_logging(&config.log_level);
    tracing::info!(port = config.port, "Starting Strava importer");

    // Initialize Firestore database
    let db = Arc::new(
        FirestoreDb::new(&config.gcp_project_id)
            .await?
            .with_op_timeout(config.store_timeout),
    );
    let store: Arc<dyn ActivityStore> = db.clone();
    let token_backend: Arc<dyn TokenBackend> = db;

    let tokens = Arc::new(TokenCache::new(token_backend));
    let strava = StravaService::new(StravaClient::new(&config)?, tokens);

    let ftp = Arc::new(FtpService::new(&config.ftp_file_path));
    ftp.reload_or_warn();

    let publisher = TwitterPublisher::new(&config)?;
    if !publisher.is_enabled() {
        tracing::info!("TWITTER_ACCESS_TOKEN not set, posts will only be logged");
    }
    let publisher: Arc<dyn Publisher> = Arc::new(publisher);

    let states = Arc::new(StateStore::new());
    let pipeline = Arc::new(ImportPipeline::new(
        &config,
        strava.clone(),
        store.clone(),
        ftp.clone(),
        publisher,
    ));
    let aggregator = Arc::new(Aggregator::new(store.clone()));

    let scheduler = Arc::new(Scheduler::new(config.job_timeout));
    jobs::register_all(
        &scheduler,
        &config.schedules,
        strava.clone(),
        pipeline,
        aggregator,
        states.clone(),
    )?;
    // A bad cron expression is fatal here.
    scheduler.start().await?;

    // Build shared state
    let state = Arc::new(AppState {
        config: config.clone(),
        store,
        strava,
        states,
        ftp,
        scheduler: scheduler.clone(),
    });

    let app = strava_importer::routes::create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    scheduler.stop().await?;
    tracing::info!("Shutdown complete");
    Ok(())
}

/// Initialize structured JSON logging.
///
/// `RUST_LOG` wins if set; otherwise `level` applies to this crate and
/// dependencies log at `info`.
fn init_logging(level: &str) {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("info,strava_importer={}", level)));

    tracing_subscriber::registry()
        .with(filter)
        .with(format)
        .init();
}

async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, draining connections");
}
