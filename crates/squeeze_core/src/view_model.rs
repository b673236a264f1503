use crate::{CompressionResult, FilterConfig, Notice, PluginInfo, Step};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppViewModel {
    pub step: Step,
    pub scan_roots: Vec<String>,
    pub path_warnings: Vec<String>,
    pub scanning: bool,
    pub plugins: Vec<PluginInfo>,
    pub plugin_order: Vec<String>,
    pub filter: FilterConfig,
    pub pool_size: usize,
    pub candidates: Vec<CandidateRowView>,
    pub rejected_count: usize,
    pub selected_count: usize,
    pub selected_bytes: u64,
    pub selected_estimated_savings: u64,
    pub progress: Option<ProgressView>,
    pub can_start_new_scan: bool,
    pub notice: Option<Notice>,
    pub dirty: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateRowView {
    pub path: String,
    pub original_size: u64,
    pub estimated_savings: u64,
    pub plugin_name: String,
    pub selected: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressView {
    pub total: usize,
    pub completed: usize,
    pub workers: usize,
    pub in_flight: Vec<String>,
    pub succeeded: usize,
    pub failed: usize,
    pub bytes_saved: u64,
    pub running: bool,
    pub cancel_requested: bool,
    pub cancelled: bool,
    pub is_complete: bool,
    /// Completion order, not plan order.
    pub results: Vec<CompressionResult>,
}
