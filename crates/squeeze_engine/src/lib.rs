//! Squeeze engine: batch execution against the external compression backend.
mod backend;
mod engine;
mod persist;
mod pool;
mod progress;
mod report;
mod types;

pub use backend::{CompressionBackend, Compressor, TimeoutCompressor};
pub use engine::{EngineError, EngineHandle, EngineSettings};
pub use persist::{ensure_dir, AtomicFileWriter, PersistError};
pub use pool::{BatchSummary, PoolError, WorkerPool};
pub use progress::{
    BatchProgress, ChannelProgressSink, NullProgressSink, ProgressSink, ProgressSnapshot,
};
pub use report::{write_batch_report, ReportError, REPORT_FILENAME};
pub use types::{BackendError, BatchEvent, EngineEvent, ScanError};
