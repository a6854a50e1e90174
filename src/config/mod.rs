use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Deserialize;
use tracing::{info, warn};

use crate::constants::*;
use crate::error::{MonitorError, MonitorResult};
use crate::models::{Band, Channel, ChannelRegistry};

/// Application configuration with sensible defaults.
///
/// Can be overridden via ~/.config/zerobreak/config.toml
#[derive(Debug, Clone)]
pub struct Config {
    /// Analysis backend base URL
    pub backend_url: String,
    /// Refresh interval for the live machine view (seconds)
    pub live_refresh_secs: u64,
    /// Refresh interval for the slower dashboard summary (seconds)
    pub dashboard_refresh_secs: u64,
    /// Rows requested with every latest-reading fetch
    pub recent_count: usize,
    /// Session store location; `None` keeps state in memory only
    pub state_db_path: Option<PathBuf>,
    /// Theme name (built-in)
    pub theme: String,
    /// Chat turns kept in the persisted transcript
    pub max_chat_history: usize,
    /// Machine to start monitoring immediately
    pub initial_machine: Option<String>,
    /// Threshold table used by the alert detector
    pub channels: Arc<ChannelRegistry>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend_url: DEFAULT_BACKEND_URL.to_string(),
            live_refresh_secs: DEFAULT_LIVE_REFRESH_SECS,
            dashboard_refresh_secs: DEFAULT_DASHBOARD_REFRESH_SECS,
            recent_count: DEFAULT_RECENT_COUNT,
            state_db_path: Some(default_state_db_path()),
            theme: "default".to_string(),
            max_chat_history: DEFAULT_MAX_CHAT_HISTORY,
            initial_machine: None,
            channels: Arc::new(ChannelRegistry::feed_mill()),
        }
    }
}

/// TOML-deserializable config file format.
/// All fields are optional; missing fields use defaults.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct FileConfig {
    backend_url: Option<String>,
    live_refresh_secs: Option<u64>,
    dashboard_refresh_secs: Option<u64>,
    recent_count: Option<usize>,
    state_db_path: Option<PathBuf>,
    theme: Option<String>,
    max_chat_history: Option<usize>,
    /// Kept raw so a bad channel table can't discard the rest of the file.
    channels: Option<toml::Value>,
}

/// One `[[channels]]` entry. The band's shape is chosen by its `kind` key.
#[derive(Debug, Deserialize)]
struct FileChannel {
    name: String,
    display_name: Option<String>,
    #[serde(default)]
    unit: String,
    #[serde(flatten)]
    band: Band,
}

impl FileChannel {
    fn into_channel(self) -> Channel {
        let display_name = self
            .display_name
            .filter(|d| !d.is_empty())
            .unwrap_or_else(|| crate::utils::split_camel_case(&self.name));
        Channel {
            name: self.name,
            display_name,
            unit: self.unit,
            band: self.band,
        }
    }
}

impl Config {
    /// Load config from `path` (or ~/.config/zerobreak/config.toml), falling
    /// back to defaults for any missing fields. If the file doesn't exist,
    /// returns pure defaults. The backend URL environment variable wins over
    /// the file.
    pub fn load(path: Option<&Path>) -> Self {
        let config_path = path
            .map(Path::to_path_buf)
            .unwrap_or_else(config_file_path);

        let mut config = match std::fs::read_to_string(&config_path) {
            Ok(content) => Self::from_toml_str(&content).unwrap_or_else(|e| {
                warn!("Failed to parse {}: {}. Using defaults.", config_path.display(), e);
                Config::default()
            }),
            Err(_) => Config::default(), // no config file, use defaults
        };

        if let Ok(url) = std::env::var(BACKEND_URL_ENV) {
            config.apply_backend_url(&url);
        }

        info!(
            backend = %config.backend_url,
            channels = config.channels.all_channels().len(),
            "configuration loaded"
        );
        config
    }

    /// Parse a config file body and merge it over the defaults.
    ///
    /// Only a syntax error fails the whole file. An invalid channel table is
    /// logged and the built-in registry is kept.
    pub fn from_toml_str(content: &str) -> MonitorResult<Self> {
        let file_config: FileConfig =
            toml::from_str(content).map_err(|e| MonitorError::Config(e.to_string()))?;

        let mut config = Config::default();

        if let Some(v) = file_config.backend_url {
            config.apply_backend_url(&v);
        }
        if let Some(v) = file_config.live_refresh_secs {
            config.live_refresh_secs = v.max(MIN_REFRESH_SECS);
        }
        if let Some(v) = file_config.dashboard_refresh_secs {
            config.dashboard_refresh_secs = v.max(MIN_REFRESH_SECS);
        }
        if let Some(v) = file_config.recent_count {
            config.recent_count = v.max(1);
        }
        if let Some(v) = file_config.state_db_path {
            config.state_db_path = Some(v);
        }
        if let Some(v) = file_config.theme {
            if !v.is_empty() {
                config.theme = v;
            }
        }
        if let Some(v) = file_config.max_chat_history {
            config.max_chat_history = v.max(MIN_CHAT_HISTORY);
        }
        if let Some(entries) = file_config.channels {
            match build_registry(entries) {
                Ok(registry) => config.channels = Arc::new(registry),
                Err(e) => warn!("Ignoring [[channels]] table: {}. Using built-in registry.", e),
            }
        }

        Ok(config)
    }

    /// Set the backend URL, dropping any trailing slash. Empty input is ignored.
    pub fn apply_backend_url(&mut self, url: &str) {
        let trimmed = url.trim().trim_end_matches('/');
        if !trimmed.is_empty() {
            self.backend_url = trimmed.to_string();
        }
    }

    /// Override the live refresh interval (e.g. from `--refresh`).
    pub fn apply_refresh_secs(&mut self, secs: u64) {
        self.live_refresh_secs = secs.max(MIN_REFRESH_SECS);
    }
}

fn build_registry(raw: toml::Value) -> MonitorResult<ChannelRegistry> {
    let entries: Vec<FileChannel> = raw
        .try_into()
        .map_err(|e: toml::de::Error| MonitorError::Config(e.to_string()))?;
    if entries.is_empty() {
        return Err(MonitorError::Config("channel table is empty".into()));
    }
    ChannelRegistry::new(entries.into_iter().map(FileChannel::into_channel).collect())
}
