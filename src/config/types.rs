use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Opaque model-specific arguments, interpreted only by the model constructor.
pub type ModelArgs = serde_json::Map<String, serde_json::Value>;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    pub model: ModelConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub archive: ArchiveConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
    #[serde(default)]
    pub logs: LogsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogsConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    pub name: String,
    pub args: ModelArgs,
    #[serde(default = "default_model_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Root under which per-request workspaces are created.
    #[serde(default)]
    pub work_dir: Option<PathBuf>,
    #[serde(default)]
    pub memory_diagnostics: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchiveConfig {
    #[serde(default = "default_archive_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_archive_max_bytes")]
    pub max_bytes: u64,
    #[serde(default = "default_archive_max_entries")]
    pub max_entries: usize,
    #[serde(default = "default_archive_max_extracted_bytes")]
    pub max_extracted_bytes: u64,
}

impl ModelConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl PipelineConfig {
    pub fn work_root(&self) -> PathBuf {
        self.work_dir.clone().unwrap_or_else(std::env::temp_dir)
    }
}

impl ArchiveConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            max_upload_bytes: default_max_upload_bytes(),
            logs: LogsConfig::default(),
        }
    }
}

impl Default for LogsConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_archive_timeout_secs(),
            max_bytes: default_archive_max_bytes(),
            max_entries: default_archive_max_entries(),
            max_extracted_bytes: default_archive_max_extracted_bytes(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_max_upload_bytes() -> usize {
    512 * 1024 * 1024
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_model_timeout_secs() -> u64 {
    600
}

fn default_archive_timeout_secs() -> u64 {
    120
}

fn default_archive_max_bytes() -> u64 {
    2 * 1024 * 1024 * 1024
}

fn default_archive_max_entries() -> usize {
    10_000
}

fn default_archive_max_extracted_bytes() -> u64 {
    8 * 1024 * 1024 * 1024
}
