use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use validator::Validate;

use crate::core::config::Settings;
use crate::schemas::session::{MarkUpdateRequest, SessionDocument};

/// Remote grading service as seen by the review view. Responses are only
/// interpreted as success or failure, apart from the two reads.
#[async_trait]
pub trait ReviewBackend: Send + Sync {
    async fn fetch_session(&self, session_id: &str) -> Result<SessionDocument>;

    async fn update_mark(&self, session_id: &str, update: &MarkUpdateRequest) -> Result<()>;

    async fn finalize(&self, session_id: &str) -> Result<()>;

    async fn fetch_image(&self, reference: &str) -> Result<Vec<u8>>;
}

#[derive(Debug, Clone)]
pub struct HttpReviewBackend {
    client: Client,
    base_url: String,
}

impl HttpReviewBackend {
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(settings.api().connect_timeout())
            .timeout(settings.api().request_timeout())
            .build()
            .context("Failed to build review API HTTP client")?;

        Ok(Self { client, base_url: settings.api().base_url.trim_end_matches('/').to_string() })
    }

    pub fn with_timeout(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build review API HTTP client")?;
        Ok(Self { client, base_url: base_url.trim_end_matches('/').to_string() })
    }

    fn session_url(&self, session_id: &str, suffix: &str) -> String {
        format!("{}/sessions/{}{}", self.base_url, session_id, suffix)
    }

    /// Image references are usually server-relative (`/uploads/...`).
    fn resolve_image_url(&self, reference: &str) -> Result<String> {
        if reference.starts_with("http://") || reference.starts_with("https://") {
            return Ok(reference.to_string());
        }
        let base = Url::parse(&format!("{}/", self.base_url))
            .with_context(|| format!("Invalid review API base url {}", self.base_url))?;
        let joined = base
            .join(reference.trim_start_matches('/'))
            .with_context(|| format!("Invalid image reference {reference}"))?;
        Ok(joined.to_string())
    }
}

fn ensure_success(status: StatusCode, operation: &str, body: &str) -> Result<()> {
    if status.is_success() {
        return Ok(());
    }
    Err(anyhow::anyhow!("{operation} failed (status {status}): {}", extract_detail(body)))
}

fn extract_detail(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|value| value.get("detail").and_then(|detail| detail.as_str()).map(str::to_string))
        .unwrap_or_else(|| body.chars().take(200).collect())
}

#[async_trait]
impl ReviewBackend for HttpReviewBackend {
    async fn fetch_session(&self, session_id: &str) -> Result<SessionDocument> {
        let response = self
            .client
            .get(self.session_url(session_id, ""))
            .send()
            .await
            .context("Failed to call session endpoint")?;

        let status = response.status();
        let raw_body = response.text().await.context("Failed to read session response")?;
        ensure_success(status, "Session fetch", &raw_body)?;

        serde_json::from_str(&raw_body).map_err(|err| {
            anyhow::anyhow!("Session endpoint returned an unexpected body (status {status}): {err}")
        })
    }

    async fn update_mark(&self, session_id: &str, update: &MarkUpdateRequest) -> Result<()> {
        update.validate().context("Refusing to send invalid mark update")?;

        let response = self
            .client
            .patch(self.session_url(session_id, "/marks"))
            .json(update)
            .send()
            .await
            .context("Failed to call mark update endpoint")?;

        let status = response.status();
        let raw_body = response.text().await.unwrap_or_default();
        ensure_success(status, "Mark update", &raw_body)
    }

    async fn finalize(&self, session_id: &str) -> Result<()> {
        let response = self
            .client
            .post(self.session_url(session_id, "/finalise"))
            .send()
            .await
            .context("Failed to call finalise endpoint")?;

        let status = response.status();
        let raw_body = response.text().await.unwrap_or_default();
        ensure_success(status, "Finalise", &raw_body)
    }

    async fn fetch_image(&self, reference: &str) -> Result<Vec<u8>> {
        let url = self.resolve_image_url(reference)?;
        let response =
            self.client.get(&url).send().await.context("Failed to call answer sheet endpoint")?;

        let status = response.status();
        if !status.is_success() {
            return Err(anyhow::anyhow!("Answer sheet fetch failed (status {status}) for {url}"));
        }
        let bytes = response.bytes().await.context("Failed to read answer sheet body")?;
        Ok(bytes.to_vec())
    }
}
