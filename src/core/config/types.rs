use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Clone)]
pub struct Settings {
    pub(super) runtime: RuntimeSettings,
    pub(super) api: ApiSettings,
    pub(super) persistence: PersistenceSettings,
    pub(super) viewer: ViewerSettings,
    pub(super) telemetry: TelemetrySettings,
}

#[derive(Debug, Clone)]
pub struct RuntimeSettings {
    pub environment: Environment,
}

#[derive(Debug, Clone)]
pub struct ApiSettings {
    pub base_url: String,
    pub request_timeout_seconds: u64,
    pub connect_timeout_seconds: u64,
}

#[derive(Debug, Clone)]
pub struct PersistenceSettings {
    pub debounce_ms: u64,
    pub debounce_scope: DebounceScope,
}

#[derive(Debug, Clone)]
pub struct ViewerSettings {
    pub selection_highlight_ms: u64,
    pub surface_width: u32,
    pub surface_height: u32,
    pub stroke_width: u32,
}

#[derive(Debug, Clone)]
pub struct TelemetrySettings {
    pub log_level: String,
    pub json: bool,
    pub prometheus_enabled: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
    Staging,
    Test,
}

impl Environment {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Development => "development",
            Self::Production => "production",
            Self::Staging => "staging",
            Self::Test => "test",
        }
    }

    pub(super) fn is_production(self) -> bool {
        matches!(self, Self::Production)
    }
}

/// Which pending remote writes a new mark edit cancels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebounceScope {
    /// One timer per `(question, step)` target; edits to other targets never cancel it.
    Target,
    /// One timer shared by the whole session; only the latest edit overall is sent.
    Session,
}

impl DebounceScope {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Target => "target",
            Self::Session => "session",
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {field}: {value}")]
    InvalidValue { field: &'static str, value: String },
    #[error("invalid url for {field}: {value}")]
    InvalidUrl { field: &'static str, value: String },
    #[error("missing required setting {0}")]
    MissingValue(&'static str),
}

impl ApiSettings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_seconds)
    }
}

impl PersistenceSettings {
    pub fn quiet_period(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

impl ViewerSettings {
    pub fn highlight_delay(&self) -> Duration {
        Duration::from_millis(self.selection_highlight_ms)
    }
}
