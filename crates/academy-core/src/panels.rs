//! Comic panel illustration.
//!
//! One image call per panel. "No image returned" and a transport error are
//! both reported as [`AcademyError::ImageGeneration`] for that panel; the
//! transport kind is kept so callers can tell a bad key from a flaky service.

use secrecy::SecretString;

use crate::error::{AcademyError, Result};
use crate::lesson::{ComicPanel, ComicPanelScript};
use crate::model::{ImageModel, ImageRequest};

/// Inline SVG shown in place of a panel image that could not be generated.
pub const PLACEHOLDER_IMAGE_URI: &str = "data:image/svg+xml;base64,PHN2ZyB4bWxucz0iaHR0cDovL3d3dy53My5vcmcvMjAwMC9zdmciIHdpZHRoPSI1MTIiIGhlaWdodD0iNTEyIiB2aWV3Qm94PSIwIDAgNTEyIDUxMiI+PHJlY3Qgd2lkdGg9IjUxMiIgaGVpZ2h0PSI1MTIiIGZpbGw9IiNmM2YwZTgiLz48dGV4dCB4PSIyNTYiIHk9IjI2MiIgZm9udC1mYW1pbHk9InNhbnMtc2VyaWYiIGZvbnQtc2l6ZT0iMjgiIGZpbGw9IiM4YTgxNzAiIHRleHQtYW5jaG9yPSJtaWRkbGUiPklsbHVzdHJhdGlvbiB1bmF2YWlsYWJsZTwvdGV4dD48L3N2Zz4=";

/// Illustrates one panel.
///
/// `index` is the zero-based position in the script; errors report it one-based.
///
/// # Errors
///
/// Returns `AcademyError::ImageGeneration` if the call fails or yields no image.
pub async fn render_panel<I: ImageModel>(
    model: &I,
    credential: &SecretString,
    index: usize,
    script: &ComicPanelScript,
) -> Result<ComicPanel> {
    let panel = index + 1;
    let request = ImageRequest::panel(script.image_prompt.clone());

    tracing::debug!(panel, "Dispatching image request");

    let images = model
        .generate_images(credential, &request)
        .await
        .map_err(|e| AcademyError::image_transport(panel, e.kind, e.to_string()))?;

    let Some(image) = images.first() else {
        return Err(AcademyError::image_generation(
            panel,
            format!("no image returned for prompt: {}", script.image_prompt),
        ));
    };

    if images.len() > 1 {
        tracing::debug!(panel, count = images.len(), "Extra images returned; using the first");
    }

    Ok(ComicPanel {
        narrative: script.narrative.clone(),
        image_url: image.to_data_uri(),
    })
}

/// Builds a panel that keeps the narrative but shows the placeholder image.
#[must_use]
pub fn placeholder_panel(script: &ComicPanelScript) -> ComicPanel {
    ComicPanel {
        narrative: script.narrative.clone(),
        image_url: PLACEHOLDER_IMAGE_URI.to_string(),
    }
}
