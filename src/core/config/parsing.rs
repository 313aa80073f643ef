use std::env;

use super::types::{ConfigError, DebounceScope, Environment};

pub(super) fn env_optional(key: &str) -> Option<String> {
    env::var(key).ok().map(|value| value.trim().to_string()).filter(|value| !value.is_empty())
}

pub(super) fn env_or_default(key: &str, default: &str) -> String {
    env_optional(key).unwrap_or_else(|| default.to_string())
}

pub(super) fn parse_u32(field: &'static str, value: String) -> Result<u32, ConfigError> {
    value.parse::<u32>().map_err(|_| ConfigError::InvalidValue { field, value })
}

pub(super) fn parse_u64(field: &'static str, value: String) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|_| ConfigError::InvalidValue { field, value })
}

pub(super) fn parse_positive_u64(field: &'static str, value: String) -> Result<u64, ConfigError> {
    match parse_u64(field, value.clone())? {
        0 => Err(ConfigError::InvalidValue { field, value }),
        parsed => Ok(parsed),
    }
}

pub(super) fn parse_positive_u32(field: &'static str, value: String) -> Result<u32, ConfigError> {
    match parse_u32(field, value.clone())? {
        0 => Err(ConfigError::InvalidValue { field, value }),
        parsed => Ok(parsed),
    }
}

pub(super) fn parse_base_url(field: &'static str, value: String) -> Result<String, ConfigError> {
    let parsed =
        reqwest::Url::parse(&value).map_err(|_| ConfigError::InvalidUrl { field, value: value.clone() })?;
    if parsed.cannot_be_a_base() || !matches!(parsed.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidUrl { field, value });
    }

    Ok(value.trim_end_matches('/').to_string())
}

pub(super) fn parse_debounce_scope(value: String) -> Result<DebounceScope, ConfigError> {
    match value.to_ascii_lowercase().as_str() {
        "target" | "question" | "per-target" => Ok(DebounceScope::Target),
        "session" | "global" => Ok(DebounceScope::Session),
        _ => Err(ConfigError::InvalidValue { field: "PERSIST_DEBOUNCE_SCOPE", value }),
    }
}

pub(super) fn parse_bool(value: &str) -> bool {
    matches!(value, "1" | "true" | "TRUE" | "yes" | "YES" | "on" | "ON")
}

pub(super) fn parse_environment(value: Option<String>) -> Environment {
    match value.as_deref().map(|item| item.to_lowercase()) {
        Some(ref val) if val == "production" || val == "prod" => Environment::Production,
        Some(ref val) if val == "staging" => Environment::Staging,
        Some(ref val) if val == "test" || val == "testing" => Environment::Test,
        _ => Environment::Development,
    }
}
