//! Runtime configuration.
//!
//! Settings come from an optional TOML file; environment variables override
//! individual fields afterwards, so tokens never have to live on disk.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::worker::{RetryPolicy, WorkerConfig, WorkerMode};

pub const DEFAULT_DB_FILE: &str = "umkm-notify.db";
pub const DEFAULT_DASHBOARD_URL: &str = "http://localhost:3000";

const ENV_DB_PATH: &str = "UMKM_NOTIFY_DB_PATH";
const ENV_DASHBOARD_URL: &str = "UMKM_NOTIFY_DASHBOARD_URL";
const ENV_ANALYSIS_ENDPOINT: &str = "UMKM_NOTIFY_ANALYSIS_ENDPOINT";
const ENV_ANALYSIS_TOKEN: &str = "UMKM_NOTIFY_ANALYSIS_TOKEN";
const ENV_TRIGGER_TOKEN: &str = "UMKM_NOTIFY_TRIGGER_TOKEN";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid config file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Notification storage backend: "sqlite" persists locally, "noop" drops
/// everything (useful for dry runs).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Sqlite,
    Noop,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct FileConfig {
    db_path: Option<String>,
    dashboard_url: Option<String>,
    store: Option<StoreBackend>,

    worker: Option<WorkerSection>,
    analysis: Option<AnalysisSection>,
    trigger: Option<TriggerSection>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
struct WorkerSection {
    interval_minutes: Option<u64>,
    batch_size: Option<i64>,
    pacing_ms: Option<u64>,
    max_retries: Option<u32>,
    retry_base_ms: Option<u64>,
    mode: Option<WorkerMode>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
struct AnalysisSection {
    endpoint: Option<String>,
    token: Option<String>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
struct TriggerSection {
    token: Option<String>,
}

/// Fully resolved configuration the binary composes from.
#[derive(Debug, Clone)]
pub struct Config {
    pub db_path: PathBuf,
    pub dashboard_url: String,
    pub store: StoreBackend,
    pub analysis_endpoint: String,
    pub analysis_token: String,
    pub trigger_token: String,
    pub worker: WorkerConfig,
}

impl Config {
    /// Loads `.env`, then the TOML file if given, then applies environment
    /// overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let file = match path {
            Some(path) => {
                let content = std::fs::read_to_string(path)?;
                toml::from_str(&content)?
            }
            None => FileConfig::default(),
        };
        Ok(Self::resolve(file))
    }

    fn resolve(file: FileConfig) -> Self {
        let worker_section = file.worker.unwrap_or_default();
        let analysis = file.analysis.unwrap_or_default();
        let trigger = file.trigger.unwrap_or_default();

        let db_path = env_var(ENV_DB_PATH)
            .or(file.db_path)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DB_FILE));
        let dashboard_url = env_var(ENV_DASHBOARD_URL)
            .or(file.dashboard_url)
            .unwrap_or_else(|| DEFAULT_DASHBOARD_URL.to_string())
            .trim_end_matches('/')
            .to_string();
        let analysis_endpoint = env_var(ENV_ANALYSIS_ENDPOINT)
            .or(analysis.endpoint)
            .unwrap_or_else(|| format!("{}/api/ai-analysis", dashboard_url));

        let mut retry = RetryPolicy::default();
        if let Some(max_retries) = worker_section.max_retries {
            retry.max_retries = max_retries;
        }
        if let Some(base_delay_ms) = worker_section.retry_base_ms {
            retry.base_delay_ms = base_delay_ms;
        }

        let defaults = WorkerConfig::default();
        let worker = WorkerConfig {
            interval_minutes: worker_section
                .interval_minutes
                .unwrap_or(defaults.interval_minutes),
            batch_size: worker_section.batch_size.unwrap_or(defaults.batch_size),
            pacing: worker_section
                .pacing_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.pacing),
            retry,
            mode: worker_section.mode.unwrap_or(defaults.mode),
        };

        Self {
            db_path,
            dashboard_url,
            store: file.store.unwrap_or(StoreBackend::Sqlite),
            analysis_endpoint,
            analysis_token: env_var(ENV_ANALYSIS_TOKEN)
                .or(analysis.token)
                .unwrap_or_default(),
            trigger_token: env_var(ENV_TRIGGER_TOKEN)
                .or(trigger.token)
                .unwrap_or_default(),
            worker,
        }
    }
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|value| !value.is_empty())
}
