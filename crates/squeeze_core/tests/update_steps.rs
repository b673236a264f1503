use std::sync::Once;

use pretty_assertions::assert_eq;
use squeeze_core::{
    update, AppState, CompressibleFile, CompressionResult, Effect, FilterConfig, Msg, NoticeKind,
    PersistedSettings, PluginInfo, ScanOutcome, Step,
};

fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(squeeze_logging::initialize_for_tests);
}

fn apply(state: AppState, msgs: impl IntoIterator<Item = Msg>) -> (AppState, Vec<Effect>) {
    let mut state = state;
    let mut effects = Vec::new();
    for msg in msgs {
        let (next, mut produced) = update(state, msg);
        state = next;
        effects.append(&mut produced);
    }
    (state, effects)
}

fn candidate(path: &str, size: u64, savings: u64) -> CompressibleFile {
    CompressibleFile {
        path: path.to_string(),
        original_size: size,
        estimated_compressed_size: size - savings,
        estimated_savings: savings,
        plugin_name: "webp".to_string(),
    }
}

fn plugins() -> Vec<PluginInfo> {
    ["webp", "zip-webp"]
        .into_iter()
        .map(|name| PluginInfo {
            name: name.to_string(),
            description: format!("{name} plugin"),
            version: "1.0.0".to_string(),
        })
        .collect()
}

/// A state sitting in the scan step with three scanned, selected files.
fn scanned_state() -> AppState {
    let (state, _) = apply(
        AppState::new(),
        [
            Msg::PluginsLoaded(plugins()),
            Msg::ScanRootSubmitted("/photos".to_string()),
            Msg::ScanClicked,
            Msg::ScanCompleted(ScanOutcome {
                compressible: vec![
                    candidate("/photos/a.png", 1000, 400),
                    candidate("/photos/b.png", 2000, 500),
                    candidate("/photos/c.png", 3000, 600),
                ],
                rejected: Vec::new(),
            }),
        ],
    );
    state
}

fn start_batch(state: AppState) -> (AppState, Vec<Effect>) {
    apply(state, [Msg::ConfirmClicked, Msg::StartClicked])
}

#[test]
fn session_start_requests_plugin_catalog() {
    init_logging();
    let (_state, effects) = update(AppState::new(), Msg::SessionStarted);
    assert_eq!(effects, vec![Effect::LoadPlugins]);
}

#[test]
fn plugin_catalog_sets_default_order() {
    init_logging();
    let (state, _) = update(AppState::new(), Msg::PluginsLoaded(plugins()));
    assert_eq!(state.plugin_order(), ["webp".to_string(), "zip-webp".to_string()]);
}

#[test]
fn adding_root_saves_settings_and_rejecting_does_not() {
    init_logging();
    let (state, effects) = update(AppState::new(), Msg::ScanRootSubmitted("  /a/b ".into()));
    assert_eq!(state.scan_roots(), ["/a/b".to_string()]);
    assert!(matches!(effects.as_slice(), [Effect::SaveSettings(s)] if s.scan_roots == ["/a/b"]));

    let (state, effects) = update(state, Msg::ScanRootSubmitted("/a/b/c".into()));
    assert!(effects.is_empty());
    assert_eq!(state.scan_roots(), ["/a/b".to_string()]);
    let notice = state.notice().expect("rejection notice");
    assert_eq!(notice.kind, NoticeKind::Validation);
    assert!(notice.text.contains("/a/b"));
    assert!(!state.view().path_warnings.is_empty());
}

#[test]
fn blank_root_is_a_validation_failure() {
    init_logging();
    let (state, effects) = update(AppState::new(), Msg::ScanRootSubmitted("   ".into()));
    assert!(effects.is_empty());
    assert!(state.scan_roots().is_empty());
    assert_eq!(state.notice().map(|n| n.kind), Some(NoticeKind::Validation));
}

#[test]
fn scan_without_roots_is_rejected() {
    init_logging();
    let (state, effects) = update(AppState::new(), Msg::ScanClicked);
    assert!(effects.is_empty());
    assert!(!state.is_scanning());
    assert_eq!(state.notice().map(|n| n.kind), Some(NoticeKind::Validation));
}

#[test]
fn scan_passes_roots_plugins_and_filter_through() {
    init_logging();
    let filter = FilterConfig {
        min_size: Some(1024),
        extensions: Some(vec!["png".to_string()]),
        ..FilterConfig::default()
    };
    let (state, effects) = apply(
        AppState::new(),
        [
            Msg::PluginsLoaded(plugins()),
            Msg::ScanRootSubmitted("/photos".into()),
            Msg::FilterChanged(filter.clone()),
            Msg::ScanClicked,
        ],
    );

    assert!(state.is_scanning());
    assert_eq!(
        effects.last(),
        Some(&Effect::StartScan {
            roots: vec!["/photos".to_string()],
            active_plugins: vec!["webp".to_string(), "zip-webp".to_string()],
            filter: Some(filter),
        })
    );
}

#[test]
fn unfiltered_scan_sends_no_filter() {
    init_logging();
    let (_state, effects) = apply(
        AppState::new(),
        [Msg::ScanRootSubmitted("/photos".into()), Msg::ScanClicked],
    );
    assert!(matches!(
        effects.last(),
        Some(Effect::StartScan { filter: None, .. })
    ));
}

#[test]
fn roots_are_locked_while_scanning() {
    init_logging();
    let (state, _) = apply(
        AppState::new(),
        [Msg::ScanRootSubmitted("/photos".into()), Msg::ScanClicked],
    );
    let (state, effects) = update(state, Msg::ScanRootSubmitted("/music".into()));
    assert!(effects.is_empty());
    assert_eq!(state.scan_roots(), ["/photos".to_string()]);
}

#[test]
fn scan_selects_every_compressible_file() {
    init_logging();
    let view = scanned_state().view();
    assert_eq!(view.step, Step::Scan);
    assert_eq!(view.selected_count, 3);
    assert_eq!(view.selected_bytes, 6000);
    assert_eq!(view.selected_estimated_savings, 1500);
}

#[test]
fn scan_failure_stays_in_scan_and_surfaces_error() {
    init_logging();
    let (state, _) = apply(
        AppState::new(),
        [
            Msg::ScanRootSubmitted("/gone".into()),
            Msg::ScanClicked,
            Msg::ScanFailed("/gone is not accessible".into()),
        ],
    );
    assert_eq!(state.step(), Step::Scan);
    assert!(!state.is_scanning());
    assert!(state.view().candidates.is_empty());
    let notice = state.notice().expect("scan notice");
    assert_eq!(notice.kind, NoticeKind::Scan);
    assert!(state.plan().is_none());
}

#[test]
fn confirm_requires_a_selection() {
    init_logging();
    let (state, _) = apply(scanned_state(), [Msg::SelectNone, Msg::ConfirmClicked]);
    assert_eq!(state.step(), Step::Scan);
    assert_eq!(state.notice().map(|n| n.kind), Some(NoticeKind::Validation));

    let (state, _) = apply(state, [Msg::FileToggled("/photos/b.png".into()), Msg::ConfirmClicked]);
    assert_eq!(state.step(), Step::Confirm);
    assert!(state.notice().is_none());
}

#[test]
fn cancel_from_confirm_keeps_selection() {
    init_logging();
    let (state, _) = apply(
        scanned_state(),
        [
            Msg::ConfirmClicked,
            Msg::FileToggled("/photos/a.png".into()),
            Msg::CancelClicked,
        ],
    );
    assert_eq!(state.step(), Step::Scan);
    assert_eq!(state.view().selected_count, 2);
}

#[test]
fn toggling_unknown_path_is_ignored() {
    init_logging();
    let mut state = scanned_state();
    state.consume_dirty();
    let (mut state, _) = update(state, Msg::FileToggled("/elsewhere.png".into()));
    assert!(!state.consume_dirty());
    assert_eq!(state.view().selected_count, 3);
}

#[test]
fn pool_size_outside_range_is_rejected() {
    init_logging();
    let (state, effects) = update(scanned_state(), Msg::PoolSizeChanged(21));
    assert!(effects.is_empty());
    assert_eq!(state.pool_size(), 4);
    assert_eq!(state.notice().map(|n| n.kind), Some(NoticeKind::Validation));

    let (state, effects) = update(state, Msg::PoolSizeChanged(0));
    assert!(effects.is_empty());
    assert_eq!(state.pool_size(), 4);

    let (state, effects) = update(state, Msg::PoolSizeChanged(20));
    assert_eq!(state.pool_size(), 20);
    assert!(matches!(effects.as_slice(), [Effect::SaveSettings(s)] if s.pool_size == 20));
}

#[test]
fn start_commits_selection_in_scan_order() {
    init_logging();
    let (state, _) = apply(
        scanned_state(),
        [Msg::FileToggled("/photos/b.png".into()), Msg::PoolSizeChanged(2)],
    );
    let (state, effects) = start_batch(state);

    assert_eq!(state.step(), Step::Process);
    let plan = state.plan().expect("plan").clone();
    assert_eq!(
        plan.paths(),
        ["/photos/a.png".to_string(), "/photos/c.png".to_string()]
    );
    assert_eq!(plan.plugin_order(), ["webp".to_string(), "zip-webp".to_string()]);
    assert_eq!(plan.pool_size(), 2);
    assert_eq!(effects, vec![Effect::StartBatch(plan)]);
    assert!(state.is_run_active());
}

#[test]
fn no_way_out_of_process_while_running() {
    init_logging();
    let (state, _) = start_batch(scanned_state());

    let (state, effects) = apply(
        state,
        [
            Msg::NewScanClicked,
            Msg::CancelClicked,
            Msg::ScanClicked,
            Msg::PoolSizeChanged(1),
        ],
    );
    assert!(effects.is_empty());
    assert_eq!(state.step(), Step::Process);
    assert_eq!(state.plan().map(|p| p.pool_size()), Some(4));
    assert!(!state.view().can_start_new_scan);
}

#[test]
fn progress_mirrors_engine_events() {
    init_logging();
    let (state, _) = start_batch(scanned_state());
    let (state, _) = apply(
        state,
        [
            Msg::BatchStarted {
                total: 3,
                workers: 3,
            },
            Msg::ItemStarted {
                path: "/photos/a.png".into(),
            },
            Msg::ItemStarted {
                path: "/photos/b.png".into(),
            },
        ],
    );
    let progress = state.view().progress.expect("progress");
    assert_eq!(progress.in_flight.len(), 2);
    assert_eq!(progress.completed, 0);

    let (state, _) = apply(
        state,
        [
            Msg::ItemFinished(CompressionResult::failed("/photos/b.png", "disk full")),
            Msg::ItemFinished(CompressionResult::succeeded("/photos/a.png", 1000, 600, "webp")),
        ],
    );
    let progress = state.view().progress.expect("progress");
    assert!(progress.in_flight.is_empty());
    assert_eq!(progress.completed, 2);
    assert_eq!(progress.succeeded, 1);
    assert_eq!(progress.failed, 1);
    assert_eq!(progress.bytes_saved, 400);
    assert!(!progress.is_complete);
    assert!(state.is_run_active());
}

#[test]
fn finished_run_allows_new_scan_which_discards_everything() {
    init_logging();
    let (state, _) = start_batch(scanned_state());
    let (state, _) = apply(
        state,
        ["/photos/a.png", "/photos/b.png", "/photos/c.png"]
            .into_iter()
            .map(|path| Msg::ItemFinished(CompressionResult::succeeded(path, 10, 5, "webp")))
            .chain([Msg::BatchFinished { cancelled: false }]),
    );
    assert!(state.is_complete());
    let view = state.view();
    assert!(view.can_start_new_scan);
    assert!(view.progress.as_ref().is_some_and(|p| p.is_complete));

    let (state, effects) = update(state, Msg::NewScanClicked);
    assert!(effects.is_empty());
    let view = state.view();
    assert_eq!(view.step, Step::Scan);
    assert!(view.progress.is_none());
    assert!(view.candidates.is_empty());
    assert_eq!(view.selected_count, 0);
    assert_eq!(view.scan_roots, vec!["/photos".to_string()]);
}

#[test]
fn stop_requests_cancellation_once() {
    init_logging();
    let (state, _) = start_batch(scanned_state());

    let (state, effects) = update(state, Msg::StopClicked);
    assert_eq!(effects, vec![Effect::CancelBatch]);
    let (state, effects) = update(state, Msg::StopClicked);
    assert!(effects.is_empty());

    let (state, _) = apply(
        state,
        [
            Msg::ItemFinished(CompressionResult::succeeded("/photos/a.png", 10, 5, "webp")),
            Msg::BatchFinished { cancelled: true },
        ],
    );
    let progress = state.view().progress.expect("progress");
    assert!(progress.cancelled);
    assert!(!progress.is_complete);
    assert!(state.is_complete());
}

#[test]
fn pool_failure_is_reported_as_internal_error() {
    init_logging();
    let (state, _) = start_batch(scanned_state());
    let (state, _) = update(state, Msg::BatchFailed("worker 2 panicked".into()));

    assert!(!state.is_run_active());
    let notice = state.notice().expect("notice");
    assert_eq!(notice.kind, NoticeKind::Internal);
    assert_eq!(
        state.view().progress.map(|p| p.results.len()),
        Some(0),
        "pool errors never land in results"
    );
}

#[test]
fn progress_messages_outside_a_run_are_ignored() {
    init_logging();
    let mut state = scanned_state();
    state.consume_dirty();
    let (mut state, _) = apply(
        state,
        [
            Msg::ItemStarted { path: "/x".into() },
            Msg::ItemFinished(CompressionResult::failed("/x", "nope")),
            Msg::BatchFinished { cancelled: false },
        ],
    );
    assert!(!state.consume_dirty());
    assert!(state.view().progress.is_none());
}

#[test]
fn restored_settings_are_revalidated() {
    init_logging();
    let settings = PersistedSettings {
        scan_roots: vec!["/a".into(), "/a/b".into(), "/c".into()],
        filter: FilterConfig::default(),
        pool_size: 99,
        plugin_order: vec!["zip-webp".into(), "retired".into()],
    };
    let (state, _) = apply(
        AppState::new(),
        [Msg::PluginsLoaded(plugins()), Msg::SettingsRestored(settings)],
    );

    assert_eq!(state.scan_roots(), ["/a".to_string(), "/c".to_string()]);
    assert_eq!(state.pool_size(), 20);
    assert_eq!(state.plugin_order(), ["zip-webp".to_string()]);
}

#[test]
fn plugin_order_drops_unknown_and_duplicate_names() {
    init_logging();
    let (state, effects) = apply(
        AppState::new(),
        [
            Msg::PluginsLoaded(plugins()),
            Msg::PluginOrderChanged(vec![
                "zip-webp".into(),
                "missing".into(),
                "zip-webp".into(),
                "webp".into(),
            ]),
        ],
    );
    assert_eq!(state.plugin_order(), ["zip-webp".to_string(), "webp".to_string()]);
    assert_eq!(effects.len(), 1);
}

#[test]
fn restored_blank_roots_are_dropped() {
    init_logging();
    let settings = PersistedSettings {
        scan_roots: vec!["/photos".into(), "".into(), "/music".into()],
        ..PersistedSettings::default()
    };
    let (state, _) = apply(AppState::new(), [Msg::SettingsRestored(settings)]);

    assert_eq!(
        state.scan_roots(),
        ["/photos".to_string(), "/music".to_string()]
    );
}
