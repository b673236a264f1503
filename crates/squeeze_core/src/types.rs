use serde::{Deserialize, Serialize};

/// A file the scanner found that at least one active plugin can shrink.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompressibleFile {
    pub path: String,
    pub original_size: u64,
    pub estimated_compressed_size: u64,
    pub estimated_savings: u64,
    pub plugin_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RejectionReason {
    pub plugin_name: String,
    pub reason: String,
}

/// A file every active plugin declined. Carried for display only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RejectedFile {
    pub path: String,
    pub size: u64,
    pub extension: String,
    pub rejection_reasons: Vec<RejectionReason>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ScanOutcome {
    pub compressible: Vec<CompressibleFile>,
    pub rejected: Vec<RejectedFile>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginInfo {
    pub name: String,
    pub description: String,
    pub version: String,
}

/// Scan filter handed through to the scanner untouched.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterConfig {
    pub min_size: Option<u64>,
    pub max_size: Option<u64>,
    pub extensions: Option<Vec<String>>,
    pub file_pattern: Option<String>,
}

/// Outcome of compressing one file in place. Exactly one exists per planned path.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CompressionResult {
    pub success: bool,
    pub path: String,
    pub backup_path: Option<String>,
    pub original_size: Option<u64>,
    pub compressed_size: Option<u64>,
    pub savings: Option<u64>,
    pub plugin_name: Option<String>,
    pub error: Option<String>,
}

impl CompressionResult {
    pub fn succeeded(
        path: impl Into<String>,
        original_size: u64,
        compressed_size: u64,
        plugin_name: impl Into<String>,
    ) -> Self {
        Self {
            success: true,
            path: path.into(),
            backup_path: None,
            original_size: Some(original_size),
            compressed_size: Some(compressed_size),
            savings: Some(original_size.saturating_sub(compressed_size)),
            plugin_name: Some(plugin_name.into()),
            error: None,
        }
    }

    pub fn failed(path: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            success: false,
            path: path.into(),
            error: Some(error.into()),
            ..Self::default()
        }
    }

    pub fn with_backup(mut self, backup_path: impl Into<String>) -> Self {
        self.backup_path = Some(backup_path.into());
        self
    }

    /// Bytes reclaimed by this item; zero for failures.
    pub fn bytes_saved(&self) -> u64 {
        if self.success {
            self.savings.unwrap_or(0)
        } else {
            0
        }
    }
}
