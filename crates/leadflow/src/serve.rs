// SPDX-FileCopyrightText: 2026 Leadflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `leadflow serve` command implementation.
//!
//! Wires the full service: SQLite store, notification hub, presence
//! tracker, distribution engine, optional board mirror, drop-folder
//! ingestion, the scheduled requeue sweep, and the HTTP/SSE gateway.
//! Supports graceful shutdown via signal handlers.

use std::sync::Arc;

use leadflow_board::BoardClient;
use leadflow_config::model::LeadflowConfig;
use leadflow_core::{BoardAdapter, LeadStore, LeadflowError, PluginAdapter};
use leadflow_engine::{Distributor, NotificationHub, PresenceTracker};
use leadflow_gateway::{AuthConfig, GatewayState, HealthState, ServerConfig};
use leadflow_ingest::DropFolderWatcher;
use leadflow_prometheus::PrometheusAdapter;
use leadflow_storage::SqliteLeadStore;
use tracing::{debug, error, info, warn};

use crate::scheduler;
use crate::shutdown;

/// Runs the `leadflow serve` command.
pub async fn run_serve(config: LeadflowConfig) -> Result<(), LeadflowError> {
    init_tracing(&config.service.log_level);

    info!(name = config.service.name.as_str(), "starting leadflow serve");

    // Fail-closed: refuse to expose the gateway without authentication.
    if config.server.bearer_token.is_none() {
        return Err(LeadflowError::Config(
            "gateway enabled but no authentication configured. Set server.bearer_token \
             (or LEADFLOW_SERVER_BEARER_TOKEN)."
                .to_string(),
        ));
    }

    // Initialize storage.
    let store = Arc::new(SqliteLeadStore::new(config.storage.clone()));
    store.initialize().await?;
    let store: Arc<dyn LeadStore> = store;

    // Initialize Prometheus metrics. A failed install (e.g. a second
    // recorder in tests) degrades to no-op metrics.
    let prometheus = match PrometheusAdapter::new() {
        Ok(adapter) => Some(adapter),
        Err(e) => {
            warn!(error = %e, "prometheus initialization failed, continuing without metrics");
            None
        }
    };
    let prometheus_render: Option<Arc<dyn Fn() -> String + Send + Sync>> =
        prometheus.as_ref().map(|adapter| {
            let handle = adapter.handle().clone();
            Arc::new(move || handle.render()) as Arc<dyn Fn() -> String + Send + Sync>
        });

    let hub = Arc::new(NotificationHub::new());
    let presence = Arc::new(PresenceTracker::new(
        store.clone(),
        hub.clone(),
        &config.presence,
    ));

    // Board mirror (if credentials are configured).
    let board: Option<Arc<dyn BoardAdapter>> = if config.board.is_configured() {
        let client = BoardClient::new(config.board.clone())?;
        info!("board mirror enabled");
        Some(Arc::new(client))
    } else {
        debug!("board mirror disabled (credentials not configured)");
        None
    };

    let distributor = Arc::new(Distributor::new(
        store.clone(),
        hub.clone(),
        presence.clone(),
        board,
        config.distribution.clone(),
    ));

    // Install signal handler.
    let cancel = shutdown::install_signal_handler();

    // Spawn the drop-folder watcher.
    let ingest = if config.ingest.enabled {
        let watcher = Arc::new(DropFolderWatcher::new(
            config.ingest.clone(),
            store.clone(),
            distributor.clone(),
        ));
        let task_watcher = watcher.clone();
        let task_cancel = cancel.clone();
        tokio::spawn(async move {
            if let Err(e) = task_watcher.run(task_cancel).await {
                error!(error = %e, "drop-folder watcher stopped");
            }
        });
        info!(dir = config.ingest.drop_dir.as_str(), "ingest watcher started");
        Some(watcher)
    } else {
        info!("ingest disabled by configuration");
        None
    };

    // Spawn the scheduled requeue sweep.
    if config.scheduler.enabled {
        let schedule = scheduler::parse_schedule(&config.scheduler.requeue_schedule)?;
        let sweep_distributor = distributor.clone();
        let sweep_cancel = cancel.clone();
        tokio::spawn(async move {
            scheduler::run_requeue_sweeps(schedule, sweep_distributor, sweep_cancel).await;
        });
        info!(
            schedule = config.scheduler.requeue_schedule.as_str(),
            "requeue scheduler started"
        );
    } else {
        debug!("scheduler disabled by configuration");
    }

    // Run the gateway in the foreground until shutdown.
    let state = GatewayState {
        store: store.clone(),
        distributor,
        presence,
        hub,
        ingest,
        auth: AuthConfig {
            bearer_token: config.server.bearer_token.clone(),
        },
        health: HealthState {
            start_time: std::time::Instant::now(),
            prometheus_render,
        },
    };
    let server_config = ServerConfig {
        host: config.server.host.clone(),
        port: config.server.port,
    };

    tokio::select! {
        result = leadflow_gateway::start_server(&server_config, state) => result?,
        _ = cancel.cancelled() => {
            info!("shutdown signal received, stopping gateway");
        }
    }

    store.shutdown().await?;
    info!("leadflow serve shutdown complete");
    Ok(())
}

/// Initializes the tracing subscriber with the given log level.
pub fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("leadflow={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .init();
}
