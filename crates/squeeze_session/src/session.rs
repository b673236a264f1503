use std::path::PathBuf;
use std::sync::{mpsc, Arc};
use std::time::{Duration, Instant};

use squeeze_core::{update, AppState, AppViewModel, Msg, PersistedSettings};
use squeeze_engine::{BatchSummary, CompressionBackend, EngineError, EngineHandle};
use squeeze_logging::squeeze_info;
use thiserror::Error;

use crate::config::SessionConfig;
use crate::effects::EffectRunner;
use crate::settings::SettingsStore;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("cannot load config {path:?}: {reason}")]
    Config { path: PathBuf, reason: String },
    #[error(transparent)]
    Engine(#[from] EngineError),
}

/// One user session: owns the workflow state and the engine behind it.
///
/// Messages from the host go through [`Session::dispatch`]; engine events
/// queue up and are applied by [`Session::pump`].
pub struct Session {
    state: AppState,
    runner: EffectRunner,
    msg_tx: mpsc::Sender<Msg>,
    msg_rx: mpsc::Receiver<Msg>,
}

impl Session {
    pub fn start(
        config: &SessionConfig,
        backend: Arc<dyn CompressionBackend>,
    ) -> Result<Self, SessionError> {
        let engine = EngineHandle::new(backend, config.engine_settings())?;
        let settings = SettingsStore::open(&config.settings_path);
        let restored = settings.load_settings(PersistedSettings {
            pool_size: config.default_pool_size,
            ..PersistedSettings::default()
        });

        let (msg_tx, msg_rx) = mpsc::channel();
        let runner = EffectRunner::new(engine, settings, config.report_dir.clone(), msg_tx.clone());
        let mut session = Self {
            state: AppState::new(),
            runner,
            msg_tx,
            msg_rx,
        };
        squeeze_info!(
            "Session started with {} stored scan roots",
            restored.scan_roots.len()
        );
        session.dispatch(Msg::SettingsRestored(restored));
        session.dispatch(Msg::SessionStarted);
        Ok(session)
    }

    /// Applies one message and runs its effects. Returns whether the view changed.
    pub fn dispatch(&mut self, msg: Msg) -> bool {
        let (mut state, effects) = update(std::mem::take(&mut self.state), msg);
        let changed = state.consume_dirty();
        self.state = state;
        self.runner.run(effects);
        changed
    }

    /// Applies every queued engine message. Returns how many were applied.
    pub fn pump(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(msg) = self.msg_rx.try_recv() {
            self.dispatch(msg);
            applied += 1;
        }
        applied
    }

    /// Pumps until `done` holds or `timeout` passes. Returns the final `done`.
    pub fn pump_until(&mut self, timeout: Duration, done: impl Fn(&AppState) -> bool) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            if done(&self.state) {
                return true;
            }
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            let wait = (deadline - now).min(Duration::from_millis(50));
            if let Ok(msg) = self.msg_rx.recv_timeout(wait) {
                self.dispatch(msg);
            }
        }
    }

    /// Sender for host-side messages such as ticks.
    pub fn sender(&self) -> mpsc::Sender<Msg> {
        self.msg_tx.clone()
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn view(&self) -> AppViewModel {
        self.state.view()
    }

    pub fn settings(&self) -> &SettingsStore {
        self.runner.settings()
    }

    /// Summary of the most recent finished run.
    pub fn last_summary(&self) -> Option<BatchSummary> {
        self.runner.last_summary()
    }
}
