use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use squeeze_core::clamp_pool_size;
use squeeze_engine::EngineSettings;
use squeeze_logging::{parse_level, squeeze_info, squeeze_warn, LogDestination};

use crate::SessionError;

/// Where host log output goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LogOutput {
    File,
    #[default]
    Terminal,
    Both,
}

impl From<LogOutput> for LogDestination {
    fn from(output: LogOutput) -> Self {
        match output {
            LogOutput::File => LogDestination::File,
            LogOutput::Terminal => LogDestination::Terminal,
            LogOutput::Both => LogDestination::Both,
        }
    }
}

/// Host configuration, stored as `ron`.
///
/// Every field has a default, so a partial file is accepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub settings_path: PathBuf,
    /// Pool size used until the user picks one.
    pub default_pool_size: usize,
    pub item_timeout_ms: Option<u64>,
    /// Where a JSON report is written after each run; none when unset.
    pub report_dir: Option<PathBuf>,
    pub log_level: String,
    pub log_output: LogOutput,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            settings_path: PathBuf::from("squeeze-settings.ron"),
            default_pool_size: squeeze_core::DEFAULT_POOL_SIZE,
            item_timeout_ms: None,
            report_dir: None,
            log_level: "info".to_string(),
            log_output: LogOutput::default(),
        }
    }
}

impl SessionConfig {
    pub fn load(path: &Path) -> Result<Self, SessionError> {
        let text = fs::read_to_string(path).map_err(|err| SessionError::Config {
            path: path.to_path_buf(),
            reason: err.to_string(),
        })?;
        let mut config: Self = ron::from_str(&text).map_err(|err| SessionError::Config {
            path: path.to_path_buf(),
            reason: err.to_string(),
        })?;
        config.default_pool_size = clamp_pool_size(config.default_pool_size);
        Ok(config)
    }

    /// Like [`SessionConfig::load`], but any failure yields the defaults.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => {
                squeeze_info!("Loaded session config from {:?}", path);
                config
            }
            Err(err) => {
                squeeze_warn!("Using default session config: {}", err);
                Self::default()
            }
        }
    }

    pub fn engine_settings(&self) -> EngineSettings {
        EngineSettings {
            item_timeout: self.item_timeout_ms.map(Duration::from_millis),
        }
    }

    /// Installs the global logger. Returns `false` if one was already set.
    pub fn init_logging(&self) -> bool {
        squeeze_logging::initialize(self.log_output.into(), parse_level(&self.log_level))
    }
}
