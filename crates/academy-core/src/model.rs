//! Model service seams.
//!
//! The generator talks to the hosted service only through [`TextModel`] and
//! [`ImageModel`]. [`crate::gemini::GeminiClient`] implements both over HTTP;
//! tests substitute scripted doubles.
//!
//! Both traits use return-position `impl Future` (no `async_trait`), and
//! receive the resolved credential on every call so that a missing key can
//! be detected before any implementation is touched.

use std::future::Future;

use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::TransportErrorKind;

/// MIME type requested for structured text output.
pub const JSON_MIME_TYPE: &str = "application/json";

/// Output encoding requested for panel images.
pub const PANEL_IMAGE_MIME_TYPE: &str = "image/png";

/// Aspect ratio requested for panel images.
pub const PANEL_ASPECT_RATIO: &str = "1:1";

/// One text-generation call.
#[derive(Debug, Clone, PartialEq)]
pub struct TextRequest {
    /// Persona and output contract.
    pub system_instruction: String,
    /// The user-turn prompt.
    pub prompt: String,
    /// Requested response MIME type.
    pub response_mime_type: String,
    /// Declarative schema constraining the response.
    pub response_schema: Value,
}

impl TextRequest {
    /// Creates a request for schema-constrained JSON output.
    #[must_use]
    pub fn structured(
        system_instruction: impl Into<String>,
        prompt: impl Into<String>,
        response_schema: Value,
    ) -> Self {
        Self {
            system_instruction: system_instruction.into(),
            prompt: prompt.into(),
            response_mime_type: JSON_MIME_TYPE.to_string(),
            response_schema,
        }
    }
}

/// One image-generation call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRequest {
    /// Scene description.
    pub prompt: String,
    /// Number of images requested.
    pub count: u32,
    /// Output encoding.
    pub mime_type: String,
    /// Output aspect ratio.
    pub aspect_ratio: String,
}

impl ImageRequest {
    /// Creates the fixed single-image, square PNG request used for comic panels.
    #[must_use]
    pub fn panel(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            count: 1,
            mime_type: PANEL_IMAGE_MIME_TYPE.to_string(),
            aspect_ratio: PANEL_ASPECT_RATIO.to_string(),
        }
    }
}

/// An image returned by the image model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedImage {
    /// Image MIME type.
    pub mime_type: String,
    /// Base64-encoded image bytes.
    pub base64_data: String,
}

impl GeneratedImage {
    /// Renders the image as an inline `data:` URI.
    #[must_use]
    pub fn to_data_uri(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.base64_data)
    }
}

/// A failed call to the model service.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct ModelError {
    /// Failure category.
    pub kind: TransportErrorKind,
    /// Underlying message from the transport or service.
    pub message: String,
}

impl ModelError {
    /// Creates a new model error.
    #[must_use]
    pub fn new(kind: TransportErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// A structured text-generation backend.
pub trait TextModel: Send + Sync {
    /// Sends one request and returns the raw response text.
    fn generate_text(
        &self,
        credential: &SecretString,
        request: &TextRequest,
    ) -> impl Future<Output = Result<String, ModelError>> + Send;
}

/// An image-generation backend.
pub trait ImageModel: Send + Sync {
    /// Sends one request and returns every image produced (possibly none).
    fn generate_images(
        &self,
        credential: &SecretString,
        request: &ImageRequest,
    ) -> impl Future<Output = Result<Vec<GeneratedImage>, ModelError>> + Send;
}
