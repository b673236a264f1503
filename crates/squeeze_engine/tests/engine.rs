use std::sync::{Arc, Once};
use std::time::{Duration, Instant};

use squeeze_core::{
    BatchPlan, CompressibleFile, CompressionResult, FilterConfig, PluginInfo, ScanOutcome,
};
use squeeze_engine::{
    BackendError, BatchEvent, CompressionBackend, Compressor, EngineEvent, EngineHandle,
    EngineSettings, PoolError, ScanError,
};
use tokio::sync::Semaphore;

/// Backend whose `compress_one` blocks until the test hands out permits.
struct GatedBackend {
    gate: Arc<Semaphore>,
}

impl GatedBackend {
    fn open() -> Self {
        Self {
            gate: Arc::new(Semaphore::new(Semaphore::MAX_PERMITS)),
        }
    }

    fn closed() -> Self {
        Self {
            gate: Arc::new(Semaphore::new(0)),
        }
    }
}

#[async_trait::async_trait]
impl Compressor for GatedBackend {
    async fn compress_one(
        &self,
        path: &str,
        plugin_order: &[String],
    ) -> Result<CompressionResult, BackendError> {
        let permit = self
            .gate
            .acquire()
            .await
            .map_err(|_| BackendError::Unavailable("gate closed".into()))?;
        permit.forget();
        let plugin = plugin_order.first().cloned().unwrap_or_default();
        Ok(CompressionResult::succeeded(path, 200, 150, plugin))
    }
}

#[async_trait::async_trait]
impl CompressionBackend for GatedBackend {
    async fn compression_plugins(&self) -> Result<Vec<PluginInfo>, BackendError> {
        Ok(vec![PluginInfo {
            name: "oxipng".into(),
            description: "Lossless PNG".into(),
            version: "9.1".into(),
        }])
    }

    async fn scan_compressible_files(
        &self,
        roots: &[String],
        active_plugins: &[String],
        filter: Option<&FilterConfig>,
    ) -> Result<ScanOutcome, ScanError> {
        if let Some(root) = roots.iter().find(|root| root.starts_with("/locked")) {
            return Err(ScanError::Inaccessible {
                path: root.clone(),
                reason: "permission denied".into(),
            });
        }
        let min_size = filter.and_then(|f| f.min_size).unwrap_or(0);
        let compressible = roots
            .iter()
            .map(|root| CompressibleFile {
                path: format!("{root}/big.png"),
                original_size: 1_000 + min_size,
                estimated_compressed_size: 700,
                estimated_savings: 300 + min_size,
                plugin_name: active_plugins.first().cloned().unwrap_or_default(),
            })
            .collect();
        Ok(ScanOutcome {
            compressible,
            rejected: Vec::new(),
        })
    }
}

fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(squeeze_logging::initialize_for_tests);
}

fn wait_for<T>(
    engine: &EngineHandle,
    mut pick: impl FnMut(EngineEvent) -> Option<T>,
) -> T {
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        if let Some(event) = engine.recv_timeout(Duration::from_millis(50)) {
            if let Some(found) = pick(event) {
                return found;
            }
        }
    }
    panic!("timed out waiting for engine event");
}

fn plan(count: usize, pool_size: usize) -> BatchPlan {
    let paths = (0..count).map(|i| format!("/photos/{i}.png")).collect();
    BatchPlan::new(paths, vec!["oxipng".into()], pool_size).unwrap()
}

#[test]
fn loads_plugins_and_scans() {
    init_logging();
    let engine = EngineHandle::new(Arc::new(GatedBackend::open()), EngineSettings::default()).unwrap();

    engine.load_plugins();
    let plugins = wait_for(&engine, |event| match event {
        EngineEvent::PluginsLoaded(result) => Some(result),
        _ => None,
    })
    .unwrap();
    assert_eq!(plugins[0].name, "oxipng");

    let filter = FilterConfig {
        min_size: Some(10),
        ..FilterConfig::default()
    };
    engine.scan(vec!["/photos".into()], vec!["oxipng".into()], Some(filter));
    let outcome = wait_for(&engine, |event| match event {
        EngineEvent::ScanCompleted(result) => Some(result),
        _ => None,
    })
    .unwrap();
    assert_eq!(outcome.compressible.len(), 1);
    assert_eq!(outcome.compressible[0].path, "/photos/big.png");
    assert_eq!(outcome.compressible[0].estimated_savings, 310);
}

#[test]
fn scan_failure_is_reported() {
    init_logging();
    let engine = EngineHandle::new(Arc::new(GatedBackend::open()), EngineSettings::default()).unwrap();

    engine.scan(vec!["/locked/dir".into()], Vec::new(), None);
    let result = wait_for(&engine, |event| match event {
        EngineEvent::ScanCompleted(result) => Some(result),
        _ => None,
    });
    assert!(matches!(result, Err(ScanError::Inaccessible { path, .. }) if path == "/locked/dir"));
}

#[test]
fn batch_streams_progress_then_summary() {
    init_logging();
    let engine = EngineHandle::new(Arc::new(GatedBackend::open()), EngineSettings::default()).unwrap();

    engine.start_batch(plan(4, 2));
    let mut finished = 0;
    let summary = wait_for(&engine, |event| match event {
        EngineEvent::Batch(BatchEvent::ItemFinished { .. }) => {
            finished += 1;
            None
        }
        EngineEvent::Batch(BatchEvent::Finished(summary)) => Some(summary),
        _ => None,
    });
    assert_eq!(finished, 4);
    assert_eq!(summary.completed, 4);
    assert_eq!(summary.succeeded, 4);
    assert_eq!(summary.workers, 2);
    assert!(summary
        .results
        .iter()
        .all(|r| r.plugin_name.as_deref() == Some("oxipng")));
}

#[test]
fn second_batch_is_rejected_while_one_runs() {
    init_logging();
    let backend = Arc::new(GatedBackend::closed());
    let gate = backend.gate.clone();
    let engine = EngineHandle::new(backend, EngineSettings::default()).unwrap();

    engine.start_batch(plan(2, 1));
    wait_for(&engine, |event| match event {
        EngineEvent::Batch(BatchEvent::ItemStarted { .. }) => Some(()),
        _ => None,
    });

    engine.start_batch(plan(1, 1));
    let err = wait_for(&engine, |event| match event {
        EngineEvent::Batch(BatchEvent::Failed(err)) => Some(err),
        _ => None,
    });
    assert_eq!(err, PoolError::AlreadyRunning);

    gate.add_permits(2);
    let summary = wait_for(&engine, |event| match event {
        EngineEvent::Batch(BatchEvent::Finished(summary)) => Some(summary),
        _ => None,
    });
    assert_eq!(summary.completed, 2);
}

#[test]
fn cancel_stops_claiming_after_in_flight_item() {
    init_logging();
    let backend = Arc::new(GatedBackend::closed());
    let gate = backend.gate.clone();
    let engine = EngineHandle::new(backend, EngineSettings::default()).unwrap();

    engine.start_batch(plan(3, 1));
    wait_for(&engine, |event| match event {
        EngineEvent::Batch(BatchEvent::ItemStarted { .. }) => Some(()),
        _ => None,
    });
    engine.cancel_batch();
    // Give the cancel command time to land before releasing the first item.
    std::thread::sleep(Duration::from_millis(100));
    gate.add_permits(3);

    let summary = wait_for(&engine, |event| match event {
        EngineEvent::Batch(BatchEvent::Finished(summary)) => Some(summary),
        _ => None,
    });
    assert!(summary.cancelled);
    assert_eq!(summary.completed, 1);
}

#[test]
fn cancel_sent_right_after_start_is_not_lost() {
    init_logging();
    let backend = Arc::new(GatedBackend::closed());
    let gate = backend.gate.clone();
    let engine = EngineHandle::new(backend, EngineSettings::default()).unwrap();

    engine.start_batch(plan(3, 1));
    engine.cancel_batch();
    // Both commands are handled in order before any item can finish.
    std::thread::sleep(Duration::from_millis(100));
    gate.add_permits(3);

    let summary = wait_for(&engine, |event| match event {
        EngineEvent::Batch(BatchEvent::Finished(summary)) => Some(summary),
        _ => None,
    });
    assert!(summary.cancelled);
    assert!(summary.completed <= 1);
}

#[test]
fn item_timeout_turns_stuck_items_into_failures() {
    init_logging();
    let settings = EngineSettings {
        item_timeout: Some(Duration::from_millis(50)),
    };
    let engine = EngineHandle::new(Arc::new(GatedBackend::closed()), settings).unwrap();

    engine.start_batch(plan(2, 2));
    let summary = wait_for(&engine, |event| match event {
        EngineEvent::Batch(BatchEvent::Finished(summary)) => Some(summary),
        _ => None,
    });
    assert_eq!(summary.completed, 2);
    assert_eq!(summary.failed, 2);
}
