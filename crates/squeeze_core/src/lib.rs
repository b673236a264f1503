//! Squeeze core: pure workflow state machine, scan-root validation and batch plans.
mod effect;
mod msg;
pub mod path_set;
mod plan;
mod state;
mod types;
mod update;
mod view_model;

pub use effect::Effect;
pub use msg::Msg;
pub use path_set::{PathSet, PathValidation};
pub use plan::{
    check_pool_size, clamp_pool_size, BatchPlan, PlanError, DEFAULT_POOL_SIZE, MAX_POOL_SIZE,
    MIN_POOL_SIZE,
};
pub use state::{AppState, Notice, NoticeKind, PersistedSettings, Step};
pub use types::{
    CompressibleFile, CompressionResult, FilterConfig, PluginInfo, RejectedFile, RejectionReason,
    ScanOutcome,
};
pub use update::update;
pub use view_model::{AppViewModel, CandidateRowView, ProgressView};
