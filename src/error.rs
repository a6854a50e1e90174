//! Error kinds for the monitoring core.
//!
//! Nothing here is fatal to the process: classifier errors abort one alert
//! cycle, fetch errors are retried on the next tick, and corrupt persisted
//! state falls back to defaults.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum MonitorError {
    /// A non-finite or unparsable value was presented for a channel.
    #[error("invalid reading for {channel}: {reason}")]
    InvalidReading { channel: String, reason: String },

    #[error("network error: {0}")]
    Network(String),

    /// The selected machine has no data yet.
    #[error("no data for {0}")]
    NotFound(String),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("persisted state for '{key}' is corrupt: {reason}")]
    PersistedStateCorrupt { key: String, reason: String },

    #[error(transparent)]
    Store(#[from] rusqlite::Error),

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl MonitorError {
    pub fn invalid_reading(channel: &str, reason: impl Into<String>) -> Self {
        Self::InvalidReading {
            channel: channel.to_string(),
            reason: reason.into(),
        }
    }
}

/// Failures reported by the backend collaborators.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("network error: {0}")]
    Network(String),

    #[error("no data for {0}")]
    NotFound(String),

    #[error("request rejected: {0}")]
    Validation(String),
}

impl From<FetchError> for MonitorError {
    fn from(e: FetchError) -> Self {
        match e {
            FetchError::Network(msg) => MonitorError::Network(msg),
            FetchError::NotFound(id) => MonitorError::NotFound(id),
            FetchError::Validation(msg) => MonitorError::Validation(msg),
        }
    }
}

pub type MonitorResult<T> = Result<T, MonitorError>;
