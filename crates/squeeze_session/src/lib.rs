//! Squeeze session: host glue between the workflow core and the engine.
mod config;
mod effects;
mod session;
mod settings;

pub use config::{LogOutput, SessionConfig};
pub use effects::{event_to_msg, EffectRunner};
pub use session::{Session, SessionError};
pub use settings::{
    SettingsError, SettingsStore, KEY_FILTER, KEY_PLUGIN_ORDER, KEY_POOL_SIZE, KEY_SCAN_ROOTS,
};
