mod parsing;
mod settings;
mod types;

pub use types::{
    ApiSettings, ConfigError, DebounceScope, Environment, PersistenceSettings, RuntimeSettings,
    Settings, TelemetrySettings, ViewerSettings,
};
