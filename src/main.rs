//! # Zerobreak - Terminal Machine Monitor
//!
//! Watches feed-mill machines through the analysis backend, classifies every
//! sensor value against its threshold band and raises alerts, with an
//! editable sensor snapshot, a maintenance chat and a repair-manual view.

mod ai;
mod alerts;
mod app;
mod config;
pub mod constants;
mod error;
mod models;
mod monitor;
mod store;
mod ui;
mod utils;

use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use config::Config;
use constants::*;
use store::{MemoryBackend, SessionStore, SqliteBackend, StateBackend};

/// Zerobreak - threshold monitor for feed-mill machines
#[derive(Parser, Debug)]
#[command(name = "zerobreak", version, about = "Terminal threshold monitor for feed-mill machines")]
struct Cli {
    /// Analysis backend base URL
    #[arg(long, short = 'b', value_name = "URL")]
    backend: Option<String>,

    /// Live refresh interval in seconds
    #[arg(long, short = 'r', value_name = "SECS")]
    refresh: Option<u64>,

    /// Config file (default ~/.config/zerobreak/config.toml)
    #[arg(long, short = 'c', value_name = "PATH")]
    config: Option<PathBuf>,

    /// Session state database
    #[arg(long, value_name = "PATH")]
    state: Option<PathBuf>,

    /// Start monitoring this machine immediately
    #[arg(long, short = 'm', value_name = "ID")]
    machine: Option<String>,

    /// Color theme (default, gruvbox, nord)
    #[arg(long, short = 't')]
    theme: Option<String>,

    /// Keep session state in memory only
    #[arg(long)]
    ephemeral: bool,
}

/// Log to a file; the terminal belongs to the TUI.
fn init_logging() -> Result<()> {
    let path = log_file_path();
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("creating log directory {}", dir.display()))?;
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("opening log file {}", path.display()))?;

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_env(LOG_FILTER_ENV)
                .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(Mutex::new(file))
                .with_ansi(false),
        )
        .init();
    Ok(())
}

fn open_session(config: &Config, ephemeral: bool) -> SessionStore {
    let backend: Arc<dyn StateBackend> = if ephemeral {
        Arc::new(MemoryBackend::new())
    } else {
        match SqliteBackend::open(config.state_db_path.as_deref()) {
            Ok(db) => Arc::new(db),
            Err(e) => {
                warn!(error = %e, "session store unavailable, state will not persist");
                Arc::new(MemoryBackend::new())
            }
        }
    };
    SessionStore::new(backend)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // .env may carry the backend URL and log filter
    let _ = dotenvy::from_path(env_file_path());
    init_logging()?;

    // Load and apply CLI overrides to config
    let mut config = Config::load(cli.config.as_deref());
    if let Some(ref url) = cli.backend {
        config.apply_backend_url(url);
    }
    if let Some(secs) = cli.refresh {
        config.apply_refresh_secs(secs);
    }
    if let Some(path) = cli.state {
        config.state_db_path = Some(path);
    }
    if let Some(machine) = cli.machine {
        config.initial_machine = Some(machine);
    }
    if let Some(theme) = cli.theme {
        config.theme = theme;
    }

    let session = open_session(&config, cli.ephemeral);
    info!(
        backend = %config.backend_url,
        ephemeral = cli.ephemeral,
        "zerobreak starting"
    );

    let mut app = app::App::new(&config, &session)?;
    app.run().await
}
