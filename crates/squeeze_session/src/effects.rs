use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc, Mutex, PoisonError};
use std::thread;
use std::time::Duration;

use squeeze_core::{Effect, Msg};
use squeeze_engine::{write_batch_report, BatchEvent, BatchSummary, EngineEvent, EngineHandle};
use squeeze_logging::{squeeze_debug, squeeze_error, squeeze_info, squeeze_warn};

use crate::settings::SettingsStore;

const EVENT_POLL: Duration = Duration::from_millis(20);

/// Runs core effects against the engine and feeds engine events back as messages.
pub struct EffectRunner {
    engine: EngineHandle,
    settings: SettingsStore,
    last_summary: Arc<Mutex<Option<BatchSummary>>>,
    stop: Arc<AtomicBool>,
}

impl EffectRunner {
    pub fn new(
        engine: EngineHandle,
        settings: SettingsStore,
        report_dir: Option<PathBuf>,
        msg_tx: mpsc::Sender<Msg>,
    ) -> Self {
        let runner = Self {
            engine,
            settings,
            last_summary: Arc::new(Mutex::new(None)),
            stop: Arc::new(AtomicBool::new(false)),
        };
        runner.spawn_event_loop(report_dir, msg_tx);
        runner
    }

    pub fn settings(&self) -> &SettingsStore {
        &self.settings
    }

    pub fn last_summary(&self) -> Option<BatchSummary> {
        self.last_summary
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn run(&mut self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::LoadPlugins => self.engine.load_plugins(),
                Effect::StartScan {
                    roots,
                    active_plugins,
                    filter,
                } => {
                    squeeze_info!(
                        "StartScan roots={} plugins={} filtered={}",
                        roots.len(),
                        active_plugins.len(),
                        filter.is_some()
                    );
                    self.engine.scan(roots, active_plugins, filter);
                }
                Effect::StartBatch(plan) => self.engine.start_batch(plan),
                Effect::CancelBatch => self.engine.cancel_batch(),
                Effect::SaveSettings(settings) => {
                    if let Err(err) = self.settings.save_settings(&settings) {
                        squeeze_error!(
                            "Failed to save settings to {:?}: {}",
                            self.settings.path(),
                            err
                        );
                    }
                }
            }
        }
    }

    fn spawn_event_loop(&self, report_dir: Option<PathBuf>, msg_tx: mpsc::Sender<Msg>) {
        let engine = self.engine.clone();
        let last_summary = self.last_summary.clone();
        let stop = self.stop.clone();
        thread::spawn(move || {
            while !stop.load(Ordering::Acquire) {
                let Some(event) = engine.recv_timeout(EVENT_POLL) else {
                    continue;
                };
                if let EngineEvent::Batch(BatchEvent::Finished(summary)) = &event {
                    if let Some(dir) = &report_dir {
                        if let Err(err) = write_batch_report(dir, summary) {
                            squeeze_warn!("Failed to write batch report to {:?}: {}", dir, err);
                        }
                    }
                    *last_summary.lock().unwrap_or_else(PoisonError::into_inner) =
                        Some(summary.clone());
                }
                if msg_tx.send(event_to_msg(event)).is_err() {
                    break;
                }
            }
            squeeze_debug!("Engine event loop stopped");
        });
    }
}

impl Drop for EffectRunner {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Release);
    }
}

/// Maps one engine event onto the core message that reports it.
pub fn event_to_msg(event: EngineEvent) -> Msg {
    match event {
        EngineEvent::PluginsLoaded(Ok(plugins)) => Msg::PluginsLoaded(plugins),
        EngineEvent::PluginsLoaded(Err(err)) => Msg::PluginsUnavailable(err.to_string()),
        EngineEvent::ScanCompleted(Ok(outcome)) => Msg::ScanCompleted(outcome),
        EngineEvent::ScanCompleted(Err(err)) => Msg::ScanFailed(err.to_string()),
        EngineEvent::Batch(BatchEvent::Started { total, workers }) => {
            Msg::BatchStarted { total, workers }
        }
        EngineEvent::Batch(BatchEvent::ItemStarted { path, .. }) => Msg::ItemStarted { path },
        EngineEvent::Batch(BatchEvent::ItemFinished { result, .. }) => Msg::ItemFinished(result),
        EngineEvent::Batch(BatchEvent::Finished(summary)) => Msg::BatchFinished {
            cancelled: summary.cancelled,
        },
        EngineEvent::Batch(BatchEvent::Failed(err)) => Msg::BatchFailed(err.to_string()),
    }
}
