// SPDX-FileCopyrightText: 2026 Leadflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Leadflow distribution engine.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use leadflow_core::AgentRole;
use serde::{Deserialize, Serialize};

/// Top-level Leadflow configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable
/// overrides. All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LeadflowConfig {
    /// Service identity and logging settings.
    #[serde(default)]
    pub service: ServiceConfig,

    /// HTTP gateway settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Storage backend settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Lead distribution settings.
    #[serde(default)]
    pub distribution: DistributionConfig,

    /// Agent presence settings.
    #[serde(default)]
    pub presence: PresenceConfig,

    /// Drop-folder ingestion settings.
    #[serde(default)]
    pub ingest: IngestConfig,

    /// External card-board mirror settings.
    #[serde(default)]
    pub board: BoardConfig,

    /// Scheduled requeue sweep settings.
    #[serde(default)]
    pub scheduler: SchedulerConfig,
}

/// Service identity and logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceConfig {
    /// Display name of the service instance.
    #[serde(default = "default_service_name")]
    pub name: String,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: default_service_name(),
            log_level: default_log_level(),
        }
    }
}

fn default_service_name() -> String {
    "leadflow".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// HTTP gateway configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Host address to bind.
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to bind.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Bearer token for authenticated routes. `None` leaves only the public
    /// health/metrics routes reachable.
    #[serde(default)]
    pub bearer_token: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            bearer_token: None,
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8350
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL (Write-Ahead Logging) mode for SQLite.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("leadflow").join("leadflow.db"))
        .unwrap_or_else(|| std::path::PathBuf::from("leadflow.db"))
        .to_string_lossy()
        .into_owned()
}

fn default_wal_mode() -> bool {
    true
}

/// Lead distribution configuration.
///
/// The automatic-distribution toggle itself lives in the store (flipped at
/// runtime by an administrator); these settings shape how the engine behaves
/// when it runs.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DistributionConfig {
    /// Minimum age in seconds a lead must reach before the automatic path
    /// assigns it. Zero disables the dwell window.
    #[serde(default)]
    pub min_delay_secs: u64,

    /// Maximum number of leads processed by a single batch sweep.
    #[serde(default = "default_batch_limit")]
    pub batch_limit: u32,

    /// When no weighted rule resolves a candidate, fall back to the
    /// available agent with the fewest assignments today.
    #[serde(default)]
    pub balanced_fallback: bool,
}

impl Default for DistributionConfig {
    fn default() -> Self {
        Self {
            min_delay_secs: 0,
            batch_limit: default_batch_limit(),
            balanced_fallback: false,
        }
    }
}

fn default_batch_limit() -> u32 {
    500
}

/// Agent presence configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PresenceConfig {
    /// Heartbeat staleness window in seconds. An agent whose last heartbeat
    /// is older than this is unavailable even with the online flag set.
    #[serde(default = "default_staleness_secs")]
    pub staleness_secs: u64,

    /// Roles eligible to receive leads.
    #[serde(default = "default_roles")]
    pub roles: Vec<AgentRole>,
}

impl Default for PresenceConfig {
    fn default() -> Self {
        Self {
            staleness_secs: default_staleness_secs(),
            roles: default_roles(),
        }
    }
}

fn default_staleness_secs() -> u64 {
    120
}

fn default_roles() -> Vec<AgentRole> {
    vec![AgentRole::Sales, AgentRole::SalesAdmin]
}

/// Drop-folder ingestion configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct IngestConfig {
    /// Enable the drop-folder watcher.
    #[serde(default = "default_ingest_enabled")]
    pub enabled: bool,

    /// Directory watched for `*.json` lead files.
    #[serde(default = "default_drop_dir")]
    pub drop_dir: String,

    /// Debounce window in milliseconds before a created/changed file is read,
    /// so partially written files settle first.
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// Sweep files already present in the drop directory at startup.
    #[serde(default = "default_scan_on_start")]
    pub scan_on_start: bool,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            enabled: default_ingest_enabled(),
            drop_dir: default_drop_dir(),
            debounce_ms: default_debounce_ms(),
            scan_on_start: default_scan_on_start(),
        }
    }
}

fn default_ingest_enabled() -> bool {
    true
}

fn default_drop_dir() -> String {
    dirs::data_dir()
        .map(|p| p.join("leadflow").join("drop"))
        .unwrap_or_else(|| std::path::PathBuf::from("drop"))
        .to_string_lossy()
        .into_owned()
}

fn default_debounce_ms() -> u64 {
    2000
}

fn default_scan_on_start() -> bool {
    true
}

/// External card-board mirror configuration.
///
/// Mirroring is enabled only when key, token, and a confirmed-list id are
/// all present; otherwise confirm transitions skip the mirror with a warn.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BoardConfig {
    /// Base URL of the board REST API.
    #[serde(default = "default_board_api_url")]
    pub api_url: String,

    /// API key. `None` disables mirroring.
    #[serde(default)]
    pub key: Option<String>,

    /// API token. `None` disables mirroring.
    #[serde(default)]
    pub token: Option<String>,

    /// Board list that receives confirmed-lead cards.
    #[serde(default)]
    pub confirmed_list: Option<String>,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            api_url: default_board_api_url(),
            key: None,
            token: None,
            confirmed_list: None,
        }
    }
}

impl BoardConfig {
    /// Whether enough credentials are present to mirror cards.
    pub fn is_configured(&self) -> bool {
        self.key.is_some() && self.token.is_some() && self.confirmed_list.is_some()
    }
}

fn default_board_api_url() -> String {
    "https://api.trello.com/1".to_string()
}

/// Scheduled requeue sweep configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SchedulerConfig {
    /// Enable the periodic sweep that re-runs distribution over queued leads.
    #[serde(default = "default_scheduler_enabled")]
    pub enabled: bool,

    /// Cron expression for the sweep cadence.
    #[serde(default = "default_requeue_schedule")]
    pub requeue_schedule: String,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            enabled: default_scheduler_enabled(),
            requeue_schedule: default_requeue_schedule(),
        }
    }
}

fn default_scheduler_enabled() -> bool {
    true
}

fn default_requeue_schedule() -> String {
    "0 */5 * * * *".to_string()
}
