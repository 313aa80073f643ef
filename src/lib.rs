pub mod console;
pub mod core;
pub mod grading;
pub mod schemas;
pub mod services;
pub mod viewer;
pub mod workspace;

#[cfg(test)]
mod test_support;

use std::sync::Arc;

use anyhow::Context;
use tokio::io::BufReader;

use crate::core::{config::Settings, telemetry};
use crate::services::review_api::HttpReviewBackend;
use crate::workspace::ReviewWorkspace;

pub async fn run() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let session_id =
        std::env::args().nth(1).context("usage: gradeglide-review <session-id>")?;

    let settings = Settings::load()?;
    telemetry::init_tracing(&settings)?;
    core::metrics::init(&settings)?;

    let backend = Arc::new(HttpReviewBackend::from_settings(&settings)?);
    tracing::info!(
        base_url = %settings.api().base_url,
        environment = %settings.runtime().environment.as_str(),
        session_id = %session_id,
        "Opening review session"
    );

    let mut workspace = ReviewWorkspace::open(backend, &settings, &session_id).await;

    let result = console::run_console(
        &mut workspace,
        BufReader::new(tokio::io::stdin()),
        tokio::io::stdout(),
        async {
            core::shutdown::shutdown_signal().await;
        },
    )
    .await;

    workspace.close();
    result
}
