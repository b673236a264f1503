use std::any::Any;
use std::sync::Arc;

use futures_util::future::join_all;
use serde::Serialize;
use squeeze_core::{BatchPlan, CompressionResult};
use squeeze_logging::{squeeze_debug, squeeze_error, squeeze_info, squeeze_warn};
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::backend::Compressor;
use crate::progress::{BatchProgress, ProgressSink};
use crate::{BatchEvent, EngineEvent};

const MISSING_ERROR: &str = "compression failed without an error message";

/// Pool-level failures. Never recorded as a per-item result.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PoolError {
    #[error("worker {worker} panicked: {message}")]
    WorkerPanicked { worker: usize, message: String },
    #[error("worker {worker} was aborted before finishing")]
    WorkerAborted { worker: usize },
    #[error("run ended with {completed} of {total} items accounted for")]
    Incomplete { completed: usize, total: usize },
    #[error("a batch is already running")]
    AlreadyRunning,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    pub total: usize,
    pub completed: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub workers: usize,
    /// True when cancellation left some items unclaimed.
    pub cancelled: bool,
    pub bytes_saved: u64,
    /// Completion order, not plan order.
    pub results: Vec<CompressionResult>,
}

/// Runs one plan with at most `pool_size` concurrent `compress_one` calls.
pub struct WorkerPool {
    plan: Arc<BatchPlan>,
    progress: Arc<BatchProgress>,
    sink: Arc<dyn ProgressSink>,
}

impl WorkerPool {
    pub fn new(plan: BatchPlan, sink: Arc<dyn ProgressSink>) -> Self {
        let progress = Arc::new(BatchProgress::new(plan.len(), sink.clone()));
        Self {
            plan: Arc::new(plan),
            progress,
            sink,
        }
    }

    pub fn plan(&self) -> &BatchPlan {
        &self.plan
    }

    /// Live progress; stays readable after the run.
    pub fn progress(&self) -> Arc<BatchProgress> {
        self.progress.clone()
    }

    /// Drives the plan to completion, or until `cancel` fires.
    ///
    /// Cancellation is checked only before each claim, so items already in
    /// flight finish and are recorded.
    pub async fn run<C>(
        self,
        compressor: Arc<C>,
        cancel: CancellationToken,
    ) -> Result<BatchSummary, PoolError>
    where
        C: Compressor + ?Sized + 'static,
    {
        let total = self.plan.len();
        let workers = self.plan.worker_count();
        squeeze_info!(
            "Batch started: {} items, pool size {}, {} workers",
            total,
            self.plan.pool_size(),
            workers
        );
        self.sink
            .emit(EngineEvent::Batch(BatchEvent::Started { total, workers }));

        let handles = (0..workers)
            .map(|worker| {
                tokio::spawn(worker_loop(
                    worker,
                    self.plan.clone(),
                    self.progress.clone(),
                    compressor.clone(),
                    cancel.clone(),
                ))
            })
            .collect::<Vec<_>>();

        let mut failure = None;
        for (worker, joined) in join_all(handles).await.into_iter().enumerate() {
            match joined {
                Ok(claims) => squeeze_debug!("worker {} exited after {} claims", worker, claims),
                Err(err) if err.is_panic() => {
                    let message = panic_message(err.into_panic());
                    squeeze_error!("worker {} panicked: {}", worker, message);
                    failure.get_or_insert(PoolError::WorkerPanicked { worker, message });
                }
                Err(_) => {
                    squeeze_error!("worker {} was aborted", worker);
                    failure.get_or_insert(PoolError::WorkerAborted { worker });
                }
            }
        }
        if let Some(err) = failure {
            return Err(err);
        }

        let results = self.progress.results();
        let completed = results.len();
        let cancelled = cancel.is_cancelled() && completed < total;
        if !cancelled && completed != total {
            return Err(PoolError::Incomplete { completed, total });
        }

        let succeeded = results.iter().filter(|result| result.success).count();
        let summary = BatchSummary {
            total,
            completed,
            succeeded,
            failed: completed - succeeded,
            workers,
            cancelled,
            bytes_saved: results.iter().map(CompressionResult::bytes_saved).sum(),
            results,
        };
        squeeze_info!(
            "Batch finished: {} succeeded, {} failed, {} of {} done{}",
            summary.succeeded,
            summary.failed,
            summary.completed,
            summary.total,
            if summary.cancelled { " (cancelled)" } else { "" }
        );
        Ok(summary)
    }
}

async fn worker_loop<C>(
    worker: usize,
    plan: Arc<BatchPlan>,
    progress: Arc<BatchProgress>,
    compressor: Arc<C>,
    cancel: CancellationToken,
) -> usize
where
    C: Compressor + ?Sized,
{
    let mut claims = 0;
    loop {
        if cancel.is_cancelled() {
            squeeze_debug!("worker {} stopping: batch cancelled", worker);
            break;
        }
        let Some(index) = progress.claim_next() else {
            break;
        };
        claims += 1;

        let path = &plan.paths()[index];
        progress.begin_item(index, path);
        let outcome = compressor.compress_one(path, plan.plugin_order()).await;
        progress.finish_item(index, settle(path, outcome));
    }
    claims
}

/// Turns whatever the compressor returned into exactly one result for `path`.
fn settle(
    path: &str,
    outcome: Result<CompressionResult, crate::BackendError>,
) -> CompressionResult {
    let mut result = match outcome {
        Ok(result) => result,
        Err(err) => {
            squeeze_warn!("compress {} failed: {}", path, err);
            return CompressionResult::failed(path, err.to_string());
        }
    };
    if result.path != path {
        squeeze_debug!("result for {} reported path {}", path, result.path);
        result.path = path.to_string();
    }
    if !result.success {
        let error = result.error.get_or_insert_with(String::new);
        if error.trim().is_empty() {
            *error = MISSING_ERROR.to_string();
        }
        squeeze_warn!("compress {} failed: {}", path, error);
    }
    result
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(text) = payload.downcast_ref::<&str>() {
        (*text).to_string()
    } else if let Some(text) = payload.downcast_ref::<String>() {
        text.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
