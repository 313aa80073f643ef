use super::parsing::{
    env_optional, env_or_default, parse_base_url, parse_bool, parse_debounce_scope,
    parse_environment, parse_positive_u32, parse_positive_u64,
};
use super::types::{
    ApiSettings, ConfigError, DebounceScope, Environment, PersistenceSettings, RuntimeSettings,
    Settings, TelemetrySettings, ViewerSettings,
};

const DEFAULT_BASE_URL: &str = "http://localhost:8000";

impl Settings {
    pub fn load() -> Result<Self, ConfigError> {
        let environment = parse_environment(
            env_optional("GRADEGLIDE_ENV").or_else(|| env_optional("ENVIRONMENT")),
        );

        let raw_base_url = env_optional("REVIEW_API_BASE_URL");
        if raw_base_url.is_none() && environment.is_production() {
            return Err(ConfigError::MissingValue("REVIEW_API_BASE_URL"));
        }
        let base_url = parse_base_url(
            "REVIEW_API_BASE_URL",
            raw_base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
        )?;
        let request_timeout_seconds = parse_positive_u64(
            "REVIEW_API_TIMEOUT_SECONDS",
            env_or_default("REVIEW_API_TIMEOUT_SECONDS", "10"),
        )?;
        let connect_timeout_seconds = parse_positive_u64(
            "REVIEW_API_CONNECT_TIMEOUT_SECONDS",
            env_or_default("REVIEW_API_CONNECT_TIMEOUT_SECONDS", "5"),
        )?;

        let debounce_ms =
            parse_positive_u64("PERSIST_DEBOUNCE_MS", env_or_default("PERSIST_DEBOUNCE_MS", "600"))?;
        let debounce_scope =
            parse_debounce_scope(env_or_default("PERSIST_DEBOUNCE_SCOPE", "target"))?;

        let selection_highlight_ms = parse_positive_u64(
            "SELECTION_HIGHLIGHT_MS",
            env_or_default("SELECTION_HIGHLIGHT_MS", "1800"),
        )?;
        let surface_width = parse_positive_u32(
            "FREEHAND_SURFACE_WIDTH",
            env_or_default("FREEHAND_SURFACE_WIDTH", "1000"),
        )?;
        let surface_height = parse_positive_u32(
            "FREEHAND_SURFACE_HEIGHT",
            env_or_default("FREEHAND_SURFACE_HEIGHT", "1414"),
        )?;
        let stroke_width = parse_positive_u32(
            "FREEHAND_STROKE_WIDTH",
            env_or_default("FREEHAND_STROKE_WIDTH", "3"),
        )?;

        let log_level = env_or_default("LOG_LEVEL", "info");
        let json = env_optional("LOG_JSON").map(|value| parse_bool(&value)).unwrap_or(false);
        let prometheus_enabled =
            env_optional("PROMETHEUS_ENABLED").map(|value| parse_bool(&value)).unwrap_or(false);

        Ok(Self {
            runtime: RuntimeSettings { environment },
            api: ApiSettings { base_url, request_timeout_seconds, connect_timeout_seconds },
            persistence: PersistenceSettings { debounce_ms, debounce_scope },
            viewer: ViewerSettings {
                selection_highlight_ms,
                surface_width,
                surface_height,
                stroke_width,
            },
            telemetry: TelemetrySettings { log_level, json, prometheus_enabled },
        })
    }

    pub fn api(&self) -> &ApiSettings {
        &self.api
    }

    pub fn persistence(&self) -> &PersistenceSettings {
        &self.persistence
    }

    pub fn viewer(&self) -> &ViewerSettings {
        &self.viewer
    }

    pub fn telemetry(&self) -> &TelemetrySettings {
        &self.telemetry
    }

    pub fn runtime(&self) -> &RuntimeSettings {
        &self.runtime
    }

    pub fn with_debounce_scope(mut self, scope: DebounceScope) -> Self {
        self.persistence.debounce_scope = scope;
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.api.base_url = base_url.into();
        self
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            runtime: RuntimeSettings { environment: Environment::Development },
            api: ApiSettings {
                base_url: DEFAULT_BASE_URL.to_string(),
                request_timeout_seconds: 10,
                connect_timeout_seconds: 5,
            },
            persistence: PersistenceSettings {
                debounce_ms: 600,
                debounce_scope: DebounceScope::Target,
            },
            viewer: ViewerSettings {
                selection_highlight_ms: 1800,
                surface_width: 1000,
                surface_height: 1414,
                stroke_width: 3,
            },
            telemetry: TelemetrySettings {
                log_level: "info".to_string(),
                json: false,
                prometheus_enabled: false,
            },
        }
    }
}
