use serde::Deserialize;
use std::time::Duration;

/// Main configuration for the catalog service
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Service configuration
    pub service: ServiceConfig,
    /// Database configuration
    pub database: DatabaseConfig,
    /// Blob storage configuration
    pub storage: StorageConfig,
    /// Upload intake limits
    pub upload: UploadConfig,
    /// Background worker configuration
    pub worker: WorkerConfig,
    /// API configuration
    pub api: ApiConfig,
}

/// Service-level configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    /// Service name for logging/metrics
    #[serde(default = "default_service_name")]
    pub name: String,
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Metrics port
    #[serde(default = "default_metrics_port")]
    pub metrics_port: u16,
}

/// Database configuration
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub url: String,
    /// Maximum number of connections in the pool
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Minimum number of connections in the pool
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
    /// Connection timeout in seconds
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    /// Idle connection timeout in seconds
    #[serde(default = "default_idle_timeout_secs")]
    pub idle_timeout_secs: u64,
    /// Run migrations on startup
    #[serde(default = "default_run_migrations")]
    pub run_migrations: bool,
}

/// Which blob backend to use
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StorageProvider {
    S3,
    Filesystem,
}

/// Blob storage configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Backend selection
    #[serde(default = "default_provider")]
    pub provider: StorageProvider,
    /// S3 bucket (or filesystem root directory) for photo storage
    pub container: String,
    /// AWS region
    #[serde(default = "default_region")]
    pub region: String,
    /// Custom endpoint URL (for MinIO, LocalStack, etc.)
    pub endpoint_url: Option<String>,
    /// Force path-style access (required for MinIO)
    #[serde(default)]
    pub force_path_style: bool,
    /// Root directory for the filesystem backend
    #[serde(default = "default_fs_root")]
    pub fs_root: String,
    /// Download link expiration in minutes
    #[serde(default = "default_download_url_expiry_minutes")]
    pub download_url_expiry_minutes: u64,
}

/// Upload intake limits, enforced before any storage or extraction work
#[derive(Debug, Clone, Deserialize)]
pub struct UploadConfig {
    /// Maximum files per upload batch
    #[serde(default = "default_max_files_per_batch")]
    pub max_files_per_batch: usize,
    /// Maximum bytes per file
    #[serde(default = "default_max_file_size_bytes")]
    pub max_file_size_bytes: usize,
    /// Accepted declared MIME types
    #[serde(default = "default_allowed_mime_types")]
    pub allowed_mime_types: Vec<String>,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_files_per_batch: default_max_files_per_batch(),
            max_file_size_bytes: default_max_file_size_bytes(),
            allowed_mime_types: default_allowed_mime_types(),
        }
    }
}

/// Background worker configuration
#[derive(Debug, Clone, Deserialize)]
pub struct WorkerConfig {
    /// Poll interval in seconds
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    /// Maximum records claimed per poll
    #[serde(default = "default_batch_size")]
    pub batch_size: i64,
    /// Concurrent records processed within a batch
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    /// Longest edge of generated thumbnails, in pixels
    #[serde(default = "default_thumbnail_max_edge")]
    pub thumbnail_max_edge: u32,
    /// Seconds after which an unfinished claim counts as abandoned and the
    /// record becomes claimable again
    #[serde(default = "default_stale_claim_timeout_secs")]
    pub stale_claim_timeout_secs: u64,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval_secs(),
            batch_size: default_batch_size(),
            concurrency: default_concurrency(),
            thumbnail_max_edge: default_thumbnail_max_edge(),
            stale_claim_timeout_secs: default_stale_claim_timeout_secs(),
        }
    }
}

/// API configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    /// API listen address
    #[serde(default = "default_api_host")]
    pub host: String,
    /// API listen port
    #[serde(default = "default_api_port")]
    pub port: u16,
    /// Enable CORS
    #[serde(default = "default_true")]
    pub cors_enabled: bool,
    /// Allowed CORS origins
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

// Default value functions
fn default_service_name() -> String {
    "catalog-service".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_metrics_port() -> u16 {
    9090
}

fn default_max_connections() -> u32 {
    10
}

fn default_min_connections() -> u32 {
    2
}

fn default_connect_timeout_secs() -> u64 {
    30
}

fn default_idle_timeout_secs() -> u64 {
    600
}

fn default_run_migrations() -> bool {
    true
}

fn default_provider() -> StorageProvider {
    StorageProvider::S3
}

fn default_region() -> String {
    "us-east-1".to_string()
}

fn default_fs_root() -> String {
    "/var/lib/shutterpress/photos".to_string()
}

fn default_download_url_expiry_minutes() -> u64 {
    60
}

fn default_max_files_per_batch() -> usize {
    50
}

fn default_max_file_size_bytes() -> usize {
    25 * 1024 * 1024 // 25MB
}

fn default_allowed_mime_types() -> Vec<String> {
    vec![
        "image/jpeg".to_string(),
        "image/png".to_string(),
        "image/tiff".to_string(),
        "image/gif".to_string(),
        "image/webp".to_string(),
    ]
}

fn default_poll_interval_secs() -> u64 {
    5
}

fn default_batch_size() -> i64 {
    10
}

fn default_concurrency() -> usize {
    4
}

fn default_thumbnail_max_edge() -> u32 {
    400
}

fn default_stale_claim_timeout_secs() -> u64 {
    300
}

fn default_api_host() -> String {
    "0.0.0.0".to_string()
}

fn default_api_port() -> u16 {
    8080
}

fn default_true() -> bool {
    true
}

impl Config {
    /// Load configuration from environment and config files
    pub fn load() -> anyhow::Result<Self> {
        let config = config::Config::builder()
            // Start with default values
            .set_default("service.name", "catalog-service")?
            .set_default("service.log_level", "info")?
            .set_default("service.metrics_port", 9090)?
            // Add config file if present
            .add_source(config::File::with_name("config/catalog").required(false))
            .add_source(config::File::with_name("/etc/shutterpress/catalog").required(false))
            // Override with environment variables
            // CATALOG__DATABASE__URL -> database.url
            .add_source(
                config::Environment::with_prefix("CATALOG")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize().map_err(Into::into)
    }

    /// Get database connection timeout as Duration
    pub fn db_connect_timeout(&self) -> Duration {
        Duration::from_secs(self.database.connect_timeout_secs)
    }

    /// Get database idle timeout as Duration
    pub fn db_idle_timeout(&self) -> Duration {
        Duration::from_secs(self.database.idle_timeout_secs)
    }

    /// Get download link expiry as Duration
    pub fn download_url_expiry(&self) -> Duration {
        Duration::from_secs(self.storage.download_url_expiry_minutes * 60)
    }

    /// Get worker poll interval as Duration
    pub fn worker_poll_interval(&self) -> Duration {
        Duration::from_secs(self.worker.poll_interval_secs)
    }

    pub fn worker_stale_claim_timeout(&self) -> Duration {
        Duration::from_secs(self.worker.stale_claim_timeout_secs)
    }
}
