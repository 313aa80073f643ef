use std::sync::OnceLock;

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use crate::core::config::Settings;

static PROM_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

pub(crate) const SESSION_LOADS: &str = "review_session_loads_total";
pub(crate) const MARK_EDITS: &str = "review_mark_edits_total";
pub(crate) const REMOTE_WRITES: &str = "review_remote_writes_total";
pub(crate) const DEBOUNCE_COALESCED: &str = "review_debounce_coalesced_total";
pub(crate) const IMAGE_PLACEHOLDERS: &str = "review_image_placeholders_total";

pub(crate) fn init(settings: &Settings) -> anyhow::Result<()> {
    if !settings.telemetry().prometheus_enabled {
        return Ok(());
    }

    let handle = PrometheusBuilder::new().install_recorder()?;
    let _ = PROM_HANDLE.set(handle);
    Ok(())
}

pub(crate) fn render() -> Option<String> {
    PROM_HANDLE.get().map(|handle| handle.render())
}

pub(crate) fn record_remote_write(kind: &'static str, ok: bool) {
    let outcome = if ok { "ok" } else { "error" };
    metrics::counter!(REMOTE_WRITES, "kind" => kind, "outcome" => outcome).increment(1);
}
