use serde::Deserialize;
use std::path::PathBuf;

/// Settings exactly as they appear in `config/settings.yaml` and the `APP__` environment.
#[derive(Debug, Deserialize, Clone)]
pub struct RawSettings {
    pub uploads: RawUploadSettings,
    pub remote: RawRemoteSettings,
    pub transfer: TransferSettings,
    pub worker: WorkerSettings,
    pub notifications: NotificationSettings,
    pub email: EmailSettings,
    pub logging: LoggingSettings,
    pub database: DatabaseSettings,
    pub secrets: SecretSettings,
}

/// Where staged read folders live and what the per-folder artifacts are called.
#[derive(Debug, Deserialize, Clone)]
pub struct RawUploadSettings {
    /// Every user gets `<upload_folder>/<email>`.
    pub upload_folder: PathBuf,
    pub manifest_file_name: String,
    pub status_file_name: String,
    pub log_file_name: String,
    /// Sort read files before writing the manifest.
    pub sort_manifest: bool,
    /// Force paired-end (`true`) or single-end (`false`) manifests. Detected per folder when unset.
    #[serde(default)]
    pub paired_end: Option<bool>,
    /// Prefix for generated project names, e.g. `QIB` gives `QIB-run-1-250101`.
    pub project_name_prefix: String,
    /// How many lines of the transfer log a status query returns.
    pub log_tail_lines: usize,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RawRemoteSettings {
    pub base_url: String,
    /// Passed through to the uploader tool, which scales its own timeouts by it.
    pub timeout_multiplier: u64,
    pub request_timeout_seconds: u64,
}

/// How the external uploader tool is invoked.
#[derive(Debug, Deserialize, Clone)]
pub struct TransferSettings {
    pub command: String,
    pub upload_mode: String,
    /// Number of trailing output lines kept as transfer details.
    pub detail_lines: usize,
}

#[derive(Debug, Deserialize, Clone)]
pub struct WorkerSettings {
    /// Number of jobs a worker process executes at the same time.
    pub concurrency: usize,
    pub max_retries: i32,
    pub retry_base_seconds: i64,
    pub poll_interval_ms: u64,
    pub heartbeat_interval_seconds: u64,
    pub heartbeat_timeout_seconds: f64,
    pub soft_time_limit_seconds: u64,
    pub hard_time_limit_seconds: u64,
    pub email_max_attempts: i32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct NotificationSettings {
    pub queue_refresh_seconds: u64,
    pub unread_limit: i64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmailSettings {
    pub from_address: String,
}

/// Logging configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingSettings {
    /// An `EnvFilter` directive, e.g. `info,sqlx=warn`.
    pub level: String,
}

/// Database connection pool configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseSettings {
    pub max_connections: u32,
    pub min_connection: u32,
    pub max_lifetime: u64,
    pub idle_timeout: u64,
    pub acquire_timeout: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SecretSettings {
    pub database_url: String,
    pub remote_client_id: String,
    pub remote_client_secret: String,
    pub remote_username: String,
    pub remote_password: String,
}
