use squeeze_logging::{squeeze_debug, squeeze_info, squeeze_warn};

use crate::plan::check_pool_size;
use crate::{AppState, Effect, FilterConfig, Msg, Notice, Step};

/// Pure update function: applies a message to state and returns any effects.
pub fn update(mut state: AppState, msg: Msg) -> (AppState, Vec<Effect>) {
    let effects = match msg {
        Msg::SessionStarted => vec![Effect::LoadPlugins],
        Msg::SettingsRestored(settings) => {
            if state.step() != Step::Scan || state.is_scanning() {
                return (state, Vec::new());
            }
            state.restore_settings(settings);
            Vec::new()
        }
        Msg::PluginsLoaded(plugins) => {
            squeeze_info!("Loaded {} compression plugins", plugins.len());
            state.set_plugins(plugins);
            Vec::new()
        }
        Msg::PluginsUnavailable(error) => {
            squeeze_warn!("Plugin catalog unavailable: {}", error);
            state.set_notice(Notice::internal(format!(
                "Compression plugins unavailable: {error}"
            )));
            Vec::new()
        }
        Msg::ScanRootSubmitted(raw) => {
            if !accepts_scan_edits(&state) {
                return (state, Vec::new());
            }
            let candidate = raw.trim();
            if candidate.is_empty() {
                state.set_notice(Notice::validation("Enter a folder to scan"));
                return (state, Vec::new());
            }
            let validation = state.add_root(candidate);
            if validation.is_valid {
                squeeze_info!(
                    "Scan root added: {} (replaced {})",
                    candidate,
                    validation.contains.len()
                );
                state.clear_notice();
                vec![Effect::SaveSettings(state.persisted_settings())]
            } else {
                squeeze_debug!("Scan root rejected: {:?}", validation.warnings);
                state.set_notice(Notice::validation(validation.warnings.join("; ")));
                Vec::new()
            }
        }
        Msg::ScanRootRemoved(path) => {
            if accepts_scan_edits(&state) && state.remove_root(&path) {
                vec![Effect::SaveSettings(state.persisted_settings())]
            } else {
                Vec::new()
            }
        }
        Msg::ScanRootsCleared => {
            if accepts_scan_edits(&state) && state.clear_roots() {
                vec![Effect::SaveSettings(state.persisted_settings())]
            } else {
                Vec::new()
            }
        }
        Msg::FilterChanged(filter) => {
            if accepts_scan_edits(&state) && state.set_filter(filter) {
                vec![Effect::SaveSettings(state.persisted_settings())]
            } else {
                Vec::new()
            }
        }
        Msg::PluginOrderChanged(order) => {
            if accepts_scan_edits(&state) && state.set_plugin_order(order) {
                vec![Effect::SaveSettings(state.persisted_settings())]
            } else {
                Vec::new()
            }
        }
        Msg::ScanClicked => {
            if !accepts_scan_edits(&state) {
                return (state, Vec::new());
            }
            if state.scan_roots().is_empty() {
                state.set_notice(Notice::validation("Add at least one folder to scan"));
                return (state, Vec::new());
            }
            state.begin_scan();
            vec![Effect::StartScan {
                roots: state.scan_roots().to_vec(),
                active_plugins: state.plugin_order().to_vec(),
                filter: filter_for_scan(state.filter()),
            }]
        }
        Msg::ScanCompleted(outcome) => {
            if state.is_scanning() {
                squeeze_info!(
                    "Scan finished: {} compressible, {} rejected",
                    outcome.compressible.len(),
                    outcome.rejected.len()
                );
                state.apply_scan(outcome);
            }
            Vec::new()
        }
        Msg::ScanFailed(error) => {
            if state.is_scanning() {
                squeeze_warn!("Scan failed: {}", error);
                state.fail_scan(error);
            }
            Vec::new()
        }
        Msg::FileToggled(path) => {
            if accepts_selection_edits(&state) {
                state.toggle_file(&path);
            }
            Vec::new()
        }
        Msg::SelectAll => {
            if accepts_selection_edits(&state) {
                state.select_all();
            }
            Vec::new()
        }
        Msg::SelectNone => {
            if accepts_selection_edits(&state) {
                state.select_none();
            }
            Vec::new()
        }
        Msg::ConfirmClicked => {
            if !accepts_scan_edits(&state) {
                return (state, Vec::new());
            }
            if state.selection().is_empty() {
                state.set_notice(Notice::validation("Select at least one file to compress"));
                return (state, Vec::new());
            }
            state.clear_notice();
            state.go_to(Step::Confirm);
            Vec::new()
        }
        Msg::PoolSizeChanged(size) => {
            if !matches!(state.step(), Step::Scan | Step::Confirm) {
                return (state, Vec::new());
            }
            match check_pool_size(size) {
                Ok(size) => {
                    if state.set_pool_size(size) {
                        vec![Effect::SaveSettings(state.persisted_settings())]
                    } else {
                        Vec::new()
                    }
                }
                Err(err) => {
                    state.set_notice(Notice::validation(err.to_string()));
                    Vec::new()
                }
            }
        }
        Msg::CancelClicked => {
            if state.step() == Step::Confirm {
                state.go_to(Step::Scan);
            }
            Vec::new()
        }
        Msg::StartClicked => {
            if state.step() != Step::Confirm {
                return (state, Vec::new());
            }
            match state.build_plan() {
                Ok(plan) => {
                    squeeze_info!(
                        "Starting batch: {} files, pool size {}, {} workers",
                        plan.len(),
                        plan.pool_size(),
                        plan.worker_count()
                    );
                    state.begin_process(plan.clone());
                    vec![Effect::StartBatch(plan)]
                }
                Err(err) => {
                    state.set_notice(Notice::validation(err.to_string()));
                    Vec::new()
                }
            }
        }
        Msg::BatchStarted { total, workers } => {
            squeeze_debug!("Batch running: {} items across {} workers", total, workers);
            state.apply_batch_started(workers);
            Vec::new()
        }
        Msg::ItemStarted { path } => {
            state.apply_item_started(path);
            Vec::new()
        }
        Msg::ItemFinished(result) => {
            state.apply_item_finished(result);
            Vec::new()
        }
        Msg::BatchFinished { cancelled } => {
            state.finish_process(cancelled);
            Vec::new()
        }
        Msg::BatchFailed(error) => {
            state.fail_process(error);
            Vec::new()
        }
        Msg::StopClicked => {
            if state.request_cancel() {
                squeeze_info!("Cancellation requested; in-flight items will finish");
                vec![Effect::CancelBatch]
            } else {
                Vec::new()
            }
        }
        Msg::NewScanClicked => {
            if state.is_complete() {
                state.reset_for_new_scan();
            }
            Vec::new()
        }
        Msg::Tick | Msg::NoOp => Vec::new(),
    };

    (state, effects)
}

/// Roots, filters and scanning are only editable in the scan step while idle.
fn accepts_scan_edits(state: &AppState) -> bool {
    state.step() == Step::Scan && !state.is_scanning()
}

fn accepts_selection_edits(state: &AppState) -> bool {
    match state.step() {
        Step::Scan => !state.is_scanning(),
        Step::Confirm => true,
        Step::Process => false,
    }
}

fn filter_for_scan(filter: &FilterConfig) -> Option<FilterConfig> {
    if *filter == FilterConfig::default() {
        None
    } else {
        Some(filter.clone())
    }
}
