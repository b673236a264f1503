use std::sync::{mpsc, Arc, Mutex, PoisonError};
use std::thread;
use std::time::Duration;

use squeeze_core::{BatchPlan, FilterConfig};
use squeeze_logging::{squeeze_info, squeeze_warn};
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::backend::{CompressionBackend, TimeoutCompressor};
use crate::pool::{PoolError, WorkerPool};
use crate::progress::{ChannelProgressSink, ProgressSink};
use crate::{BatchEvent, EngineEvent};

#[derive(Debug, Clone, Default)]
pub struct EngineSettings {
    /// Upper bound for a single `compress_one` call.
    pub item_timeout: Option<Duration>,
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("failed to start engine runtime: {0}")]
    Runtime(#[source] std::io::Error),
    #[error("failed to spawn engine thread: {0}")]
    Thread(#[source] std::io::Error),
}

enum EngineCommand {
    LoadPlugins,
    Scan {
        roots: Vec<String>,
        active_plugins: Vec<String>,
        filter: Option<FilterConfig>,
    },
    StartBatch(BatchPlan),
    CancelBatch,
}

/// Token of the batch currently running, if any.
type ActiveBatch = Arc<Mutex<Option<CancellationToken>>>;

/// Front door to the background runtime. Commands go in, events come out.
#[derive(Clone)]
pub struct EngineHandle {
    cmd_tx: mpsc::Sender<EngineCommand>,
    event_rx: Arc<Mutex<mpsc::Receiver<EngineEvent>>>,
}

impl EngineHandle {
    pub fn new(
        backend: Arc<dyn CompressionBackend>,
        settings: EngineSettings,
    ) -> Result<Self, EngineError> {
        let (cmd_tx, cmd_rx) = mpsc::channel();
        let (event_tx, event_rx) = mpsc::channel();
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .thread_name("squeeze-worker")
            .build()
            .map_err(EngineError::Runtime)?;

        thread::Builder::new()
            .name("squeeze-engine".to_string())
            .spawn(move || {
                let active: ActiveBatch = Arc::new(Mutex::new(None));
                // Batch slot changes happen here, in command order; only the work is spawned.
                while let Ok(command) = cmd_rx.recv() {
                    let context = CommandContext {
                        backend: backend.clone(),
                        settings: settings.clone(),
                        active: active.clone(),
                        event_tx: event_tx.clone(),
                    };
                    match command {
                        EngineCommand::StartBatch(plan) => match context.claim_slot(plan.len()) {
                            Some(cancel) => {
                                runtime.spawn(run_batch(context, plan, cancel));
                            }
                            None => context.emit(EngineEvent::Batch(BatchEvent::Failed(
                                PoolError::AlreadyRunning,
                            ))),
                        },
                        EngineCommand::CancelBatch => context.cancel_active(),
                        EngineCommand::LoadPlugins => {
                            runtime.spawn(load_plugins(context));
                        }
                        EngineCommand::Scan {
                            roots,
                            active_plugins,
                            filter,
                        } => {
                            runtime.spawn(scan(context, roots, active_plugins, filter));
                        }
                    }
                }
                squeeze_info!("Engine command channel closed; shutting down");
            })
            .map_err(EngineError::Thread)?;

        Ok(Self {
            cmd_tx,
            event_rx: Arc::new(Mutex::new(event_rx)),
        })
    }

    pub fn load_plugins(&self) {
        self.send(EngineCommand::LoadPlugins);
    }

    pub fn scan(
        &self,
        roots: Vec<String>,
        active_plugins: Vec<String>,
        filter: Option<FilterConfig>,
    ) {
        self.send(EngineCommand::Scan {
            roots,
            active_plugins,
            filter,
        });
    }

    pub fn start_batch(&self, plan: BatchPlan) {
        self.send(EngineCommand::StartBatch(plan));
    }

    pub fn cancel_batch(&self) {
        self.send(EngineCommand::CancelBatch);
    }

    pub fn try_recv(&self) -> Option<EngineEvent> {
        self.event_rx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .try_recv()
            .ok()
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Option<EngineEvent> {
        self.event_rx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .recv_timeout(timeout)
            .ok()
    }

    fn send(&self, command: EngineCommand) {
        if self.cmd_tx.send(command).is_err() {
            squeeze_warn!("Engine thread is gone; command dropped");
        }
    }
}

struct CommandContext {
    backend: Arc<dyn CompressionBackend>,
    settings: EngineSettings,
    active: ActiveBatch,
    event_tx: mpsc::Sender<EngineEvent>,
}

impl CommandContext {
    fn emit(&self, event: EngineEvent) {
        let _ = self.event_tx.send(event);
    }

    /// Token for a new batch, or `None` while another batch holds the slot.
    fn claim_slot(&self, items: usize) -> Option<CancellationToken> {
        let mut active = self.active.lock().unwrap_or_else(PoisonError::into_inner);
        if active.is_some() {
            squeeze_warn!("Rejecting batch of {} items: one is already running", items);
            return None;
        }
        let cancel = CancellationToken::new();
        *active = Some(cancel.clone());
        Some(cancel)
    }

    fn cancel_active(&self) {
        let active = self.active.lock().unwrap_or_else(PoisonError::into_inner);
        match active.as_ref() {
            Some(token) => token.cancel(),
            None => squeeze_warn!("Cancel requested with no batch running"),
        }
    }
}

async fn load_plugins(context: CommandContext) {
    let result = context.backend.compression_plugins().await;
    context.emit(EngineEvent::PluginsLoaded(result));
}

async fn scan(
    context: CommandContext,
    roots: Vec<String>,
    active_plugins: Vec<String>,
    filter: Option<FilterConfig>,
) {
    let result = context
        .backend
        .scan_compressible_files(&roots, &active_plugins, filter.as_ref())
        .await;
    context.emit(EngineEvent::ScanCompleted(result));
}

async fn run_batch(context: CommandContext, plan: BatchPlan, cancel: CancellationToken) {
    let sink: Arc<dyn ProgressSink> = Arc::new(ChannelProgressSink::new(context.event_tx.clone()));
    let pool = WorkerPool::new(plan, sink);
    let outcome = match context.settings.item_timeout {
        Some(timeout) => {
            let compressor = Arc::new(TimeoutCompressor::new(context.backend.clone(), timeout));
            pool.run(compressor, cancel).await
        }
        None => pool.run(context.backend.clone(), cancel).await,
    };

    // Free the slot before announcing the end so a follow-up batch is accepted.
    *context.active.lock().unwrap_or_else(PoisonError::into_inner) = None;
    let event = match outcome {
        Ok(summary) => BatchEvent::Finished(summary),
        Err(err) => BatchEvent::Failed(err),
    };
    context.emit(EngineEvent::Batch(event));
}
