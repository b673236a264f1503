use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{mpsc, Arc, Mutex, MutexGuard, PoisonError};

use squeeze_core::CompressionResult;
use squeeze_logging::{squeeze_trace, squeeze_warn};
use tokio::sync::watch;

use crate::{BatchEvent, EngineEvent};

pub trait ProgressSink: Send + Sync {
    fn emit(&self, event: EngineEvent);
}

pub struct ChannelProgressSink {
    tx: mpsc::Sender<EngineEvent>,
}

impl ChannelProgressSink {
    pub fn new(tx: mpsc::Sender<EngineEvent>) -> Self {
        Self { tx }
    }
}

impl ProgressSink for ChannelProgressSink {
    fn emit(&self, event: EngineEvent) {
        let _ = self.tx.send(event);
    }
}

/// Sink for callers that only watch snapshots or the final summary.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullProgressSink;

impl ProgressSink for NullProgressSink {
    fn emit(&self, _event: EngineEvent) {}
}

/// Point-in-time view of a run.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProgressSnapshot {
    pub total: usize,
    /// Indices handed out so far.
    pub claimed: usize,
    pub completed: usize,
    /// Paths dispatched and not yet returned, in plan order.
    pub in_flight: Vec<String>,
    pub succeeded: usize,
    pub failed: usize,
}

impl ProgressSnapshot {
    pub fn is_complete(&self) -> bool {
        self.completed == self.total
    }
}

#[derive(Debug, Default)]
struct Ledger {
    in_flight: BTreeMap<usize, String>,
    results: Vec<CompressionResult>,
    succeeded: usize,
}

/// Live state of one run: claim cursor, in-flight set and results.
///
/// Claims go through a lock-free cursor; in-flight and result bookkeeping
/// share one mutex that is never held across an await. Every mutation
/// publishes a snapshot to watchers and an event to the sink while the
/// ledger is locked, so both observe counts in commit order.
pub struct BatchProgress {
    total: usize,
    cursor: AtomicUsize,
    ledger: Mutex<Ledger>,
    updates: watch::Sender<ProgressSnapshot>,
    sink: Arc<dyn ProgressSink>,
}

impl BatchProgress {
    pub fn new(total: usize, sink: Arc<dyn ProgressSink>) -> Self {
        let (updates, _) = watch::channel(ProgressSnapshot {
            total,
            ..ProgressSnapshot::default()
        });
        Self {
            total,
            cursor: AtomicUsize::new(0),
            ledger: Mutex::new(Ledger::default()),
            updates,
            sink,
        }
    }

    pub fn total(&self) -> usize {
        self.total
    }

    /// Next unclaimed index, or `None` once every index is handed out.
    ///
    /// The cursor never moves past `total`, so each index is returned once.
    pub(crate) fn claim_next(&self) -> Option<usize> {
        self.cursor
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |cursor| {
                (cursor < self.total).then_some(cursor + 1)
            })
            .ok()
    }

    pub(crate) fn begin_item(&self, index: usize, path: &str) {
        let mut ledger = self.lock();
        ledger.in_flight.insert(index, path.to_string());
        let snapshot = self.snapshot_of(&ledger);
        squeeze_trace!("claimed #{} {} ({} in flight)", index, path, snapshot.in_flight.len());
        self.publish(
            BatchEvent::ItemStarted {
                index,
                path: path.to_string(),
                snapshot: snapshot.clone(),
            },
            snapshot,
        );
    }

    pub(crate) fn finish_item(&self, index: usize, result: CompressionResult) {
        let mut ledger = self.lock();
        if ledger.results.len() == self.total {
            squeeze_warn!("ignoring result for #{} after the run completed", index);
            return;
        }
        ledger.in_flight.remove(&index);
        if result.success {
            ledger.succeeded += 1;
        }
        ledger.results.push(result.clone());
        let snapshot = self.snapshot_of(&ledger);
        self.publish(
            BatchEvent::ItemFinished {
                index,
                result,
                snapshot: snapshot.clone(),
            },
            snapshot,
        );
    }

    pub fn subscribe(&self) -> watch::Receiver<ProgressSnapshot> {
        self.updates.subscribe()
    }

    pub fn snapshot(&self) -> ProgressSnapshot {
        let ledger = self.lock();
        self.snapshot_of(&ledger)
    }

    /// Results in completion order.
    pub fn results(&self) -> Vec<CompressionResult> {
        self.lock().results.clone()
    }

    pub fn completed(&self) -> usize {
        self.lock().results.len()
    }

    pub fn claimed(&self) -> usize {
        self.cursor.load(Ordering::Acquire)
    }

    pub fn is_complete(&self) -> bool {
        self.completed() == self.total
    }

    fn lock(&self) -> MutexGuard<'_, Ledger> {
        // Every critical section leaves the ledger consistent.
        self.ledger.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn snapshot_of(&self, ledger: &Ledger) -> ProgressSnapshot {
        ProgressSnapshot {
            total: self.total,
            claimed: self.claimed(),
            completed: ledger.results.len(),
            in_flight: ledger.in_flight.values().cloned().collect(),
            succeeded: ledger.succeeded,
            failed: ledger.results.len() - ledger.succeeded,
        }
    }

    fn publish(&self, event: BatchEvent, snapshot: ProgressSnapshot) {
        self.updates.send_replace(snapshot);
        self.sink.emit(EngineEvent::Batch(event));
    }
}
