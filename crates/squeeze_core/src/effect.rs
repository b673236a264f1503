use crate::plan::BatchPlan;
use crate::state::PersistedSettings;
use crate::types::FilterConfig;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    LoadPlugins,
    StartScan {
        roots: Vec<String>,
        active_plugins: Vec<String>,
        filter: Option<FilterConfig>,
    },
    StartBatch(BatchPlan),
    /// Stop issuing claims; in-flight items still finish.
    CancelBatch,
    SaveSettings(PersistedSettings),
}
