use anyhow::{Context, Result};
use catalog_service::api::{start_api_server, AppState};
use catalog_service::bulk::BulkMutator;
use catalog_service::catalog::CatalogStore;
use catalog_service::config::{Config, StorageProvider};
use catalog_service::download::DownloadLinkIssuer;
use catalog_service::extractor::{DefaultCodec, ImageCodec, MetadataExtractor};
use catalog_service::ingest::IngestionOrchestrator;
use catalog_service::storage::{FsStorage, S3Storage, StorageBackend};
use catalog_service::validator::UploadValidator;
use catalog_service::worker::ProcessingWorker;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let config = Config::load().context("Failed to load configuration")?;

    // Initialize logging
    init_tracing(&config.service.log_level);

    info!(
        service = %config.service.name,
        "Starting Shutterpress Catalog Service"
    );

    // Initialize metrics
    init_metrics(config.service.metrics_port)?;

    // Initialize components
    let store = Arc::new(
        CatalogStore::new(&config.database)
            .await
            .context("Failed to initialize catalog store")?,
    );

    // Run migrations if enabled
    if config.database.run_migrations {
        store
            .run_migrations()
            .await
            .context("Failed to run database migrations")?;
    }

    let storage: Arc<dyn StorageBackend> = match config.storage.provider {
        StorageProvider::S3 => Arc::new(
            S3Storage::new(&config.storage)
                .await
                .context("Failed to initialize S3 storage backend")?,
        ),
        StorageProvider::Filesystem => Arc::new(FsStorage::new(config.storage.fs_root.clone())),
    };

    let codec: Arc<dyn ImageCodec> = Arc::new(DefaultCodec);

    let ingestion = Arc::new(IngestionOrchestrator::new(
        store.clone(),
        storage.clone(),
        MetadataExtractor::new(codec.clone()),
        UploadValidator::new(config.upload.clone()),
        config.storage.container.clone(),
    ));

    let downloads = Arc::new(DownloadLinkIssuer::new(
        store.clone(),
        storage.clone(),
        config.download_url_expiry(),
    ));

    let bulk = Arc::new(BulkMutator::new(store.clone()));

    // Create API state
    let api_state = AppState {
        store: store.clone(),
        ingestion,
        bulk,
        downloads,
    };

    // Spawn background processing worker
    let worker = ProcessingWorker::new(
        store.clone(),
        storage.clone(),
        codec,
        config.worker.clone(),
        config.storage.container.clone(),
    );
    let worker_handle = tokio::spawn(async move {
        worker.run().await;
    });

    // Spawn API server task
    let api_config = config.api.clone();
    let upload_config = config.upload.clone();
    let api_handle = tokio::spawn(async move {
        if let Err(e) = start_api_server(api_state, &api_config, &upload_config).await {
            error!(error = %e, "API server error");
        }
    });

    info!("Catalog service started successfully");

    // Wait for shutdown signal
    shutdown_signal().await;

    info!("Shutting down catalog service");

    // Abort tasks
    worker_handle.abort();
    api_handle.abort();

    info!("Catalog service stopped");

    Ok(())
}

/// Initialize tracing/logging
fn init_tracing(log_level: &str) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().json())
        .init();
}

/// Initialize Prometheus metrics exporter
fn init_metrics(port: u16) -> Result<()> {
    let builder = metrics_exporter_prometheus::PrometheusBuilder::new();

    builder
        .with_http_listener(([0, 0, 0, 0], port))
        .install()
        .context("Failed to install Prometheus metrics exporter")?;

    info!(port = port, "Prometheus metrics exporter started");

    Ok(())
}

/// Wait for shutdown signal (SIGINT or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        }
        _ = terminate => {
            info!("Received SIGTERM signal");
        }
    }
}
