use std::path::PathBuf;
use std::time::Duration;

use clap::ValueEnum;

pub const DEFAULT_API_BASE: &str = "http://localhost:8000";
pub const DEFAULT_STORE_PATH: &str = "drives.json";
pub const DEFAULT_LOG_FILE: &str = "pawhub.log";
pub const DEFAULT_MOCK_LATENCY_MS: u64 = 1000;
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Which drive repository backs the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum BackendMode {
    /// In-process store with simulated latency; nothing leaves the machine.
    #[default]
    Memory,
    /// JSON document on local disk.
    File,
    /// The REST backend.
    Http,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BackendConfig {
    pub mode: BackendMode,
    pub api_base: String,
    pub api_token: Option<String>,
    pub store_path: PathBuf,
    pub mock_latency: Duration,
    pub timeout: Duration,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            mode: BackendMode::default(),
            api_base: DEFAULT_API_BASE.to_string(),
            api_token: None,
            store_path: PathBuf::from(DEFAULT_STORE_PATH),
            mock_latency: Duration::from_millis(DEFAULT_MOCK_LATENCY_MS),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

/// Everything the client needs at start-up, handed to constructors instead of
/// being read from globals.
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub backend: BackendConfig,
    pub log_file: PathBuf,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            backend: BackendConfig::default(),
            log_file: PathBuf::from(DEFAULT_LOG_FILE),
        }
    }
}
