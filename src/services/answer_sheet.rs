use image::{Rgba, RgbaImage};

use crate::core::metrics::IMAGE_PLACEHOLDERS;
use crate::services::review_api::ReviewBackend;

const PLACEHOLDER_WIDTH: u32 = 600;
const PLACEHOLDER_HEIGHT: u32 = 848;
const PLACEHOLDER_RULE_SPACING: u32 = 32;
const PAPER: Rgba<u8> = Rgba([241, 245, 249, 255]);
const RULE: Rgba<u8> = Rgba([203, 213, 225, 255]);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnswerSheetSource {
    Remote { reference: String },
    Placeholder { reason: String },
}

/// Decoded page image shown under the overlays.
pub struct AnswerSheet {
    image: RgbaImage,
    source: AnswerSheetSource,
}

impl AnswerSheet {
    /// Fetches and decodes the page. Any failure yields the placeholder page.
    pub async fn load(backend: &dyn ReviewBackend, reference: Option<&str>) -> Self {
        let Some(reference) = reference.filter(|value| !value.trim().is_empty()) else {
            return Self::placeholder("session has no answer sheet");
        };

        let bytes = match backend.fetch_image(reference).await {
            Ok(bytes) => bytes,
            Err(err) => {
                tracing::warn!(reference, error = %err, "Answer sheet fetch failed; using placeholder");
                return Self::placeholder(format!("{err:#}"));
            }
        };

        match image::load_from_memory(&bytes) {
            Ok(decoded) => {
                let image = decoded.to_rgba8();
                let (width, height) = image.dimensions();
                tracing::info!(reference, width, height, "Answer sheet loaded");
                Self { image, source: AnswerSheetSource::Remote { reference: reference.to_string() } }
            }
            Err(err) => {
                tracing::warn!(reference, error = %err, "Answer sheet could not be decoded; using placeholder");
                Self::placeholder(err.to_string())
            }
        }
    }

    pub fn placeholder(reason: impl Into<String>) -> Self {
        metrics::counter!(IMAGE_PLACEHOLDERS).increment(1);
        let image = RgbaImage::from_fn(PLACEHOLDER_WIDTH, PLACEHOLDER_HEIGHT, |_, y| {
            if y > 0 && y % PLACEHOLDER_RULE_SPACING == 0 {
                RULE
            } else {
                PAPER
            }
        });
        Self { image, source: AnswerSheetSource::Placeholder { reason: reason.into() } }
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    pub fn source(&self) -> &AnswerSheetSource {
        &self.source
    }

    pub fn is_placeholder(&self) -> bool {
        matches!(self.source, AnswerSheetSource::Placeholder { .. })
    }
}
