use squeeze_core::{PluginInfo, ScanOutcome};
use thiserror::Error;

use crate::pool::{BatchSummary, PoolError};
use crate::progress::ProgressSnapshot;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    PluginsLoaded(Result<Vec<PluginInfo>, BackendError>),
    ScanCompleted(Result<ScanOutcome, ScanError>),
    Batch(BatchEvent),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchEvent {
    Started {
        total: usize,
        workers: usize,
    },
    ItemStarted {
        index: usize,
        path: String,
        snapshot: ProgressSnapshot,
    },
    ItemFinished {
        index: usize,
        result: squeeze_core::CompressionResult,
        snapshot: ProgressSnapshot,
    },
    Finished(BatchSummary),
    Failed(PoolError),
}

/// Catastrophic collaborator failure. Ordinary per-file problems are
/// reported inside a `CompressionResult` instead.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    #[error("compression engine unavailable: {0}")]
    Unavailable(String),
    #[error("plugin failure: {0}")]
    Plugin(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScanError {
    #[error("cannot access {path}: {reason}")]
    Inaccessible { path: String, reason: String },
    #[error("active plugin not found: {0}")]
    UnknownPlugin(String),
    #[error(transparent)]
    Backend(#[from] BackendError),
}
