use std::sync::Arc;
use std::time::Duration;

use squeeze_core::{CompressionResult, FilterConfig, PluginInfo, ScanOutcome};

use crate::{BackendError, ScanError};

/// The per-file unit of work driven by the worker pool.
#[async_trait::async_trait]
pub trait Compressor: Send + Sync {
    /// Compress `path` in place, trying plugins in `plugin_order`.
    ///
    /// Disk-full, unsupported-format and permission problems come back as
    /// `Ok` with `success == false`. `Err` is reserved for the engine itself
    /// being unreachable.
    async fn compress_one(
        &self,
        path: &str,
        plugin_order: &[String],
    ) -> Result<CompressionResult, BackendError>;
}

/// The external engine: scanning, plugin catalog and compression.
#[async_trait::async_trait]
pub trait CompressionBackend: Compressor {
    async fn compression_plugins(&self) -> Result<Vec<PluginInfo>, BackendError>;

    /// Fails when any root is inaccessible; partial results are not returned.
    async fn scan_compressible_files(
        &self,
        roots: &[String],
        active_plugins: &[String],
        filter: Option<&FilterConfig>,
    ) -> Result<ScanOutcome, ScanError>;
}

/// Bounds each `compress_one` call; an elapsed deadline becomes a per-item failure.
pub struct TimeoutCompressor<C: ?Sized> {
    inner: Arc<C>,
    timeout: Duration,
}

impl<C: ?Sized> TimeoutCompressor<C> {
    pub fn new(inner: Arc<C>, timeout: Duration) -> Self {
        Self { inner, timeout }
    }
}

#[async_trait::async_trait]
impl<C> Compressor for TimeoutCompressor<C>
where
    C: Compressor + ?Sized,
{
    async fn compress_one(
        &self,
        path: &str,
        plugin_order: &[String],
    ) -> Result<CompressionResult, BackendError> {
        match tokio::time::timeout(self.timeout, self.inner.compress_one(path, plugin_order)).await
        {
            Ok(outcome) => outcome,
            Err(_) => Ok(CompressionResult::failed(
                path,
                format!("timed out after {} ms", self.timeout.as_millis()),
            )),
        }
    }
}
