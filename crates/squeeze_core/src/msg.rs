use crate::state::PersistedSettings;
use crate::types::{CompressionResult, FilterConfig, PluginInfo, ScanOutcome};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Msg {
    /// Host finished wiring; fetch the plugin catalog.
    SessionStarted,
    /// Restore values saved by a previous session.
    SettingsRestored(PersistedSettings),
    /// Engine returned the plugin catalog.
    PluginsLoaded(Vec<PluginInfo>),
    /// Engine could not provide the plugin catalog.
    PluginsUnavailable(String),
    /// User typed or picked a folder to scan.
    ScanRootSubmitted(String),
    ScanRootRemoved(String),
    ScanRootsCleared,
    FilterChanged(FilterConfig),
    /// User reordered or toggled plugins; first match wins during compression.
    PluginOrderChanged(Vec<String>),
    ScanClicked,
    ScanCompleted(ScanOutcome),
    ScanFailed(String),
    FileToggled(String),
    SelectAll,
    SelectNone,
    /// Scan -> Confirm.
    ConfirmClicked,
    PoolSizeChanged(usize),
    /// Confirm -> Scan.
    CancelClicked,
    /// Confirm -> Process.
    StartClicked,
    /// Engine spawned its workers for the current run.
    BatchStarted { total: usize, workers: usize },
    /// A worker claimed a path and dispatched it.
    ItemStarted { path: String },
    /// A worker recorded the outcome for one path.
    ItemFinished(CompressionResult),
    /// Every worker terminated.
    BatchFinished { cancelled: bool },
    /// The pool itself broke; not a per-item failure.
    BatchFailed(String),
    /// User asked to stop claiming new items.
    StopClicked,
    /// Process (complete) -> Scan.
    NewScanClicked,
    /// UI/render tick to coalesce rendering.
    Tick,
    /// Fallback for placeholder wiring.
    NoOp,
}
