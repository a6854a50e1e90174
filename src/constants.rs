//! Application-wide constants.
//!
//! Centralizes timing, capacities, endpoints and filesystem locations so the
//! rest of the crate never hardcodes them.

use std::path::PathBuf;

// ── Timing ────────────────────────────────────────────────────────
/// Refresh interval for live-style views (seconds).
pub const DEFAULT_LIVE_REFRESH_SECS: u64 = 5;
/// Refresh interval for the slower dashboard views (seconds).
pub const DEFAULT_DASHBOARD_REFRESH_SECS: u64 = 30;
/// Minimum allowed refresh interval (seconds).
pub const MIN_REFRESH_SECS: u64 = 1;
/// Event poll timeout (ms) -- how often the UI checks for input.
pub const EVENT_POLL_MS: u64 = 100;
/// Status message display duration (seconds).
pub const STATUS_MESSAGE_TIMEOUT_SECS: u64 = 5;
/// Timeout applied by the HTTP client to every backend call (seconds).
pub const HTTP_TIMEOUT_SECS: u64 = 10;

// ── Capacities ────────────────────────────────────────────────────
/// Number of recent rows requested with each latest-reading fetch.
pub const DEFAULT_RECENT_COUNT: usize = 10;
/// Maximum chat turns retained in the persisted transcript.
pub const DEFAULT_MAX_CHAT_HISTORY: usize = 200;
/// Minimum floor for the chat history cap.
pub const MIN_CHAT_HISTORY: usize = 10;
/// Maximum Q&A entries retained in the repair-manual log.
pub const MAX_MANUAL_HISTORY: usize = 100;

// ── Backend ───────────────────────────────────────────────────────
/// Default analysis backend base URL.
pub const DEFAULT_BACKEND_URL: &str = "http://localhost:8000";
/// Environment variable that overrides the backend URL.
pub const BACKEND_URL_ENV: &str = "ZEROBREAK_BACKEND_URL";
/// Environment variable holding the tracing filter directive.
pub const LOG_FILTER_ENV: &str = "ZEROBREAK_LOG";
/// Default tracing filter.
pub const DEFAULT_LOG_FILTER: &str = "zerobreak=info";
/// Machine identifier sent when a snapshot carries none.
pub const DEFAULT_MACHINE_TYPE: &str = "Feed Mill 1";

// ── Session store namespaces ──────────────────────────────────────
/// Navigation state (active tab).
pub const NS_APP: &str = "app";
/// Chat transcript.
pub const NS_CHAT: &str = "chat";
/// Repair-manual Q&A transcript.
pub const NS_MANUAL: &str = "manual";
/// Last uploaded / analyzed sensor snapshot.
pub const NS_SENSOR: &str = "sensor";

// ── UI ────────────────────────────────────────────────────────────
/// Spinner character sequence for loading indicators.
pub const SPINNER_CHARS: &[&str] = &["◐", "◓", "◑", "◒"];
/// Page up/down step size.
pub const PAGE_SIZE: usize = 10;

// ── Paths ─────────────────────────────────────────────────────────

/// Returns the user's home directory, falling back to /tmp.
pub fn home_dir() -> PathBuf {
    PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string()))
}

/// Returns `~/.config/zerobreak/`.
pub fn config_dir() -> PathBuf {
    home_dir().join(".config").join("zerobreak")
}

/// Returns `~/.config/zerobreak/config.toml`.
pub fn config_file_path() -> PathBuf {
    config_dir().join("config.toml")
}

/// Returns `~/.config/zerobreak/.env`.
pub fn env_file_path() -> PathBuf {
    config_dir().join(".env")
}

/// Returns `~/.local/share/zerobreak/`.
pub fn data_dir() -> PathBuf {
    home_dir().join(".local").join("share").join("zerobreak")
}

/// Returns `~/.local/share/zerobreak/session.db`.
pub fn default_state_db_path() -> PathBuf {
    data_dir().join("session.db")
}

/// Returns `~/.local/share/zerobreak/zerobreak.log`.
pub fn log_file_path() -> PathBuf {
    data_dir().join("zerobreak.log")
}
