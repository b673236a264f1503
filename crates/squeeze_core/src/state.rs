use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::path_set::{PathSet, PathValidation};
use crate::plan::{clamp_pool_size, BatchPlan, PlanError, DEFAULT_POOL_SIZE};
use crate::types::{
    CompressibleFile, CompressionResult, FilterConfig, PluginInfo, RejectedFile, ScanOutcome,
};
use crate::view_model::{AppViewModel, CandidateRowView, ProgressView};

/// Workflow step. "Complete" is not a step: it is `Process` with no run active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Step {
    #[default]
    Scan,
    Confirm,
    Process,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    /// Bad user input; nothing changed.
    Validation,
    /// The external scan failed.
    Scan,
    /// The engine or worker pool broke in a way the user cannot fix.
    Internal,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub text: String,
}

impl Notice {
    pub fn validation(text: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Validation,
            text: text.into(),
        }
    }

    pub fn scan(text: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Scan,
            text: text.into(),
        }
    }

    pub fn internal(text: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Internal,
            text: text.into(),
        }
    }
}

/// The values that outlive a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedSettings {
    pub scan_roots: Vec<String>,
    pub filter: FilterConfig,
    pub pool_size: usize,
    pub plugin_order: Vec<String>,
}

impl Default for PersistedSettings {
    fn default() -> Self {
        Self {
            scan_roots: Vec::new(),
            filter: FilterConfig::default(),
            pool_size: DEFAULT_POOL_SIZE,
            plugin_order: Vec::new(),
        }
    }
}

/// Observed mirror of the engine's progress for the current run.
#[derive(Debug, Clone, PartialEq, Eq)]
struct ProcessState {
    plan: BatchPlan,
    workers: usize,
    in_flight: BTreeSet<String>,
    results: Vec<CompressionResult>,
    running: bool,
    cancel_requested: bool,
    cancelled: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppState {
    step: Step,
    roots: PathSet,
    last_path_check: Option<PathValidation>,
    filter: FilterConfig,
    plugins: Vec<PluginInfo>,
    plugin_order: Vec<String>,
    pool_size: usize,
    scanning: bool,
    candidates: Vec<CompressibleFile>,
    rejected: Vec<RejectedFile>,
    selection: BTreeSet<String>,
    process: Option<ProcessState>,
    notice: Option<Notice>,
    dirty: bool,
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            step: Step::Scan,
            roots: PathSet::new(),
            last_path_check: None,
            filter: FilterConfig::default(),
            plugins: Vec::new(),
            plugin_order: Vec::new(),
            pool_size: DEFAULT_POOL_SIZE,
            scanning: false,
            candidates: Vec::new(),
            rejected: Vec::new(),
            selection: BTreeSet::new(),
            process: None,
            notice: None,
            dirty: false,
        }
    }
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn step(&self) -> Step {
        self.step
    }

    pub fn scan_roots(&self) -> &[String] {
        self.roots.roots()
    }

    pub fn pool_size(&self) -> usize {
        self.pool_size
    }

    pub fn plugin_order(&self) -> &[String] {
        &self.plugin_order
    }

    pub fn filter(&self) -> &FilterConfig {
        &self.filter
    }

    pub fn is_scanning(&self) -> bool {
        self.scanning
    }

    pub fn selection(&self) -> &BTreeSet<String> {
        &self.selection
    }

    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    /// Plan of the current or last run, if the process step was entered.
    pub fn plan(&self) -> Option<&BatchPlan> {
        self.process.as_ref().map(|process| &process.plan)
    }

    pub fn is_run_active(&self) -> bool {
        self.process.as_ref().is_some_and(|process| process.running)
    }

    /// Process step reached and its run has ended.
    pub fn is_complete(&self) -> bool {
        self.step == Step::Process && self.process.as_ref().is_some_and(|p| !p.running)
    }

    pub fn consume_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    pub fn view(&self) -> AppViewModel {
        let candidates = self
            .candidates
            .iter()
            .map(|file| CandidateRowView {
                path: file.path.clone(),
                original_size: file.original_size,
                estimated_savings: file.estimated_savings,
                plugin_name: file.plugin_name.clone(),
                selected: self.selection.contains(&file.path),
            })
            .collect::<Vec<_>>();
        let (selected_bytes, selected_estimated_savings) = candidates
            .iter()
            .filter(|row| row.selected)
            .fold((0u64, 0u64), |(bytes, savings), row| {
                (bytes + row.original_size, savings + row.estimated_savings)
            });

        AppViewModel {
            step: self.step,
            scan_roots: self.roots.roots().to_vec(),
            path_warnings: self
                .last_path_check
                .as_ref()
                .map(|check| check.warnings.clone())
                .unwrap_or_default(),
            scanning: self.scanning,
            plugins: self.plugins.clone(),
            plugin_order: self.plugin_order.clone(),
            filter: self.filter.clone(),
            pool_size: self.pool_size,
            selected_count: self.selection.len(),
            selected_bytes,
            selected_estimated_savings,
            candidates,
            rejected_count: self.rejected.len(),
            progress: self.process.as_ref().map(progress_view),
            can_start_new_scan: self.is_complete(),
            notice: self.notice.clone(),
            dirty: self.dirty,
        }
    }

    pub fn persisted_settings(&self) -> PersistedSettings {
        PersistedSettings {
            scan_roots: self.roots.roots().to_vec(),
            filter: self.filter.clone(),
            pool_size: self.pool_size,
            plugin_order: self.plugin_order.clone(),
        }
    }

    pub(crate) fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub(crate) fn set_notice(&mut self, notice: Notice) {
        self.notice = Some(notice);
        self.mark_dirty();
    }

    pub(crate) fn clear_notice(&mut self) {
        if self.notice.take().is_some() {
            self.mark_dirty();
        }
    }

    pub(crate) fn restore_settings(&mut self, settings: PersistedSettings) {
        self.roots = PathSet::from_roots(&settings.scan_roots);
        self.filter = settings.filter;
        self.pool_size = clamp_pool_size(settings.pool_size);
        self.plugin_order = settings.plugin_order;
        self.reconcile_plugin_order();
        self.mark_dirty();
    }

    pub(crate) fn add_root(&mut self, candidate: &str) -> PathValidation {
        let validation = self.roots.add(candidate);
        self.last_path_check = Some(validation.clone());
        self.mark_dirty();
        validation
    }

    pub(crate) fn remove_root(&mut self, path: &str) -> bool {
        let removed = self.roots.remove(path);
        if removed {
            self.last_path_check = None;
            self.mark_dirty();
        }
        removed
    }

    pub(crate) fn clear_roots(&mut self) -> bool {
        if self.roots.is_empty() {
            return false;
        }
        self.roots.clear();
        self.last_path_check = None;
        self.mark_dirty();
        true
    }

    pub(crate) fn set_filter(&mut self, filter: FilterConfig) -> bool {
        if self.filter == filter {
            return false;
        }
        self.filter = filter;
        self.mark_dirty();
        true
    }

    pub(crate) fn set_pool_size(&mut self, size: usize) -> bool {
        if self.pool_size == size {
            return false;
        }
        self.pool_size = size;
        self.mark_dirty();
        true
    }

    pub(crate) fn set_plugins(&mut self, plugins: Vec<PluginInfo>) {
        self.plugins = plugins;
        self.reconcile_plugin_order();
        self.mark_dirty();
    }

    pub(crate) fn set_plugin_order(&mut self, order: Vec<String>) -> bool {
        let mut seen = BTreeSet::new();
        let order: Vec<String> = order
            .into_iter()
            .filter(|name| self.plugins.is_empty() || self.plugins.iter().any(|p| &p.name == name))
            .filter(|name| seen.insert(name.clone()))
            .collect();
        if order.is_empty() || order == self.plugin_order {
            return false;
        }
        self.plugin_order = order;
        self.mark_dirty();
        true
    }

    /// Drops unknown plugin names; falls back to catalog order when nothing is left.
    fn reconcile_plugin_order(&mut self) {
        if self.plugins.is_empty() {
            return;
        }
        let plugins = &self.plugins;
        self.plugin_order
            .retain(|name| plugins.iter().any(|plugin| &plugin.name == name));
        if self.plugin_order.is_empty() {
            self.plugin_order = plugins.iter().map(|plugin| plugin.name.clone()).collect();
        }
    }

    pub(crate) fn begin_scan(&mut self) {
        self.scanning = true;
        self.candidates.clear();
        self.rejected.clear();
        self.selection.clear();
        self.notice = None;
        self.mark_dirty();
    }

    pub(crate) fn apply_scan(&mut self, outcome: ScanOutcome) {
        self.scanning = false;
        self.selection = outcome
            .compressible
            .iter()
            .map(|file| file.path.clone())
            .collect();
        self.candidates = outcome.compressible;
        self.rejected = outcome.rejected;
        self.mark_dirty();
    }

    pub(crate) fn fail_scan(&mut self, error: String) {
        self.scanning = false;
        self.candidates.clear();
        self.rejected.clear();
        self.selection.clear();
        self.set_notice(Notice::scan(error));
    }

    pub(crate) fn toggle_file(&mut self, path: &str) -> bool {
        if !self.candidates.iter().any(|file| file.path == path) {
            return false;
        }
        if !self.selection.remove(path) {
            self.selection.insert(path.to_string());
        }
        self.mark_dirty();
        true
    }

    pub(crate) fn select_all(&mut self) {
        self.selection = self
            .candidates
            .iter()
            .map(|file| file.path.clone())
            .collect();
        self.mark_dirty();
    }

    pub(crate) fn select_none(&mut self) {
        self.selection.clear();
        self.mark_dirty();
    }

    pub(crate) fn go_to(&mut self, step: Step) {
        if self.step != step {
            self.step = step;
            self.mark_dirty();
        }
    }

    /// Snapshot the selection, in scan order, into a frozen plan.
    pub(crate) fn build_plan(&self) -> Result<BatchPlan, PlanError> {
        let paths = self
            .candidates
            .iter()
            .filter(|file| self.selection.contains(&file.path))
            .map(|file| file.path.clone())
            .collect();
        BatchPlan::new(paths, self.plugin_order.clone(), self.pool_size)
    }

    pub(crate) fn begin_process(&mut self, plan: BatchPlan) {
        let workers = plan.worker_count();
        self.process = Some(ProcessState {
            plan,
            workers,
            in_flight: BTreeSet::new(),
            results: Vec::new(),
            running: true,
            cancel_requested: false,
            cancelled: false,
        });
        self.step = Step::Process;
        self.notice = None;
        self.mark_dirty();
    }

    fn active_process(&mut self) -> Option<&mut ProcessState> {
        self.process.as_mut().filter(|process| process.running)
    }

    pub(crate) fn apply_batch_started(&mut self, workers: usize) {
        if let Some(process) = self.active_process() {
            process.workers = workers;
            self.mark_dirty();
        }
    }

    pub(crate) fn apply_item_started(&mut self, path: String) {
        if let Some(process) = self.active_process() {
            process.in_flight.insert(path);
            self.mark_dirty();
        }
    }

    pub(crate) fn apply_item_finished(&mut self, result: CompressionResult) {
        if let Some(process) = self.active_process() {
            if process.results.len() >= process.plan.len() {
                return;
            }
            process.in_flight.remove(&result.path);
            process.results.push(result);
            self.mark_dirty();
        }
    }

    pub(crate) fn request_cancel(&mut self) -> bool {
        match self.active_process() {
            Some(process) if !process.cancel_requested => {
                process.cancel_requested = true;
                self.mark_dirty();
                true
            }
            _ => false,
        }
    }

    pub(crate) fn finish_process(&mut self, cancelled: bool) {
        if let Some(process) = self.active_process() {
            process.running = false;
            process.cancelled = cancelled;
            process.in_flight.clear();
            self.mark_dirty();
        }
    }

    pub(crate) fn fail_process(&mut self, error: String) {
        if self.active_process().is_some() {
            self.finish_process(false);
            self.set_notice(Notice::internal(error));
        }
    }

    /// Drop the finished run and the scan it came from.
    pub(crate) fn reset_for_new_scan(&mut self) {
        self.process = None;
        self.candidates.clear();
        self.rejected.clear();
        self.selection.clear();
        self.notice = None;
        self.step = Step::Scan;
        self.mark_dirty();
    }
}

fn progress_view(process: &ProcessState) -> ProgressView {
    let succeeded = process.results.iter().filter(|r| r.success).count();
    ProgressView {
        total: process.plan.len(),
        completed: process.results.len(),
        workers: process.workers,
        in_flight: process.in_flight.iter().cloned().collect(),
        succeeded,
        failed: process.results.len() - succeeded,
        bytes_saved: process.results.iter().map(CompressionResult::bytes_saved).sum(),
        running: process.running,
        cancel_requested: process.cancel_requested,
        cancelled: process.cancelled,
        is_complete: process.results.len() == process.plan.len(),
        results: process.results.clone(),
    }
}
