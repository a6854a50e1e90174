//! Live machine monitoring: backend access and the refresh loop.

mod client;
mod scheduler;

use std::future::Future;

use crate::error::FetchError;
use crate::models::Reading;

pub use client::{
    AnalysisResponse, BackendClient, ChatResponse, ManualResponse, PredictionResponse,
};
pub use scheduler::{MonitorEvent, MonitorState, Phase, RefreshScheduler};

#[cfg(test)]
pub use scheduler::CycleOutcome;

/// Where readings come from. Implemented by [`BackendClient`]; tests swap in
/// scripted sources.
pub trait ReadingSource: Send + Sync + 'static {
    /// Machines that currently have data, in backend order.
    fn fetch_entity_list(&self) -> impl Future<Output = Result<Vec<String>, FetchError>> + Send;

    /// Most recent reading for `entity`, considering the last `recent_count` rows.
    fn fetch_latest_reading(
        &self,
        entity: &str,
        recent_count: usize,
    ) -> impl Future<Output = Result<Reading, FetchError>> + Send;
}
