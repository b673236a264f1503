use std::path::{Path, PathBuf};

use squeeze_logging::squeeze_info;
use thiserror::Error;

use crate::persist::{AtomicFileWriter, PersistError};
use crate::pool::BatchSummary;

pub const REPORT_FILENAME: &str = "squeeze-report.json";

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("serialize report: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("persist error: {0}")]
    Persist(#[from] PersistError),
}

/// Writes `summary` as pretty JSON to `{dir}/squeeze-report.json`.
pub fn write_batch_report(dir: &Path, summary: &BatchSummary) -> Result<PathBuf, ReportError> {
    let body = serde_json::to_string_pretty(summary)?;
    let path = AtomicFileWriter::new(dir).write(REPORT_FILENAME, body)?;
    squeeze_info!(
        "Wrote batch report for {} items to {:?}",
        summary.total,
        path
    );
    Ok(path)
}
