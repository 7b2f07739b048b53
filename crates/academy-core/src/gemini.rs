//! HTTP transport for the hosted Gemini API.
//!
//! [`GeminiClient`] implements both [`TextModel`] and [`ImageModel`]. The API
//! key is passed in per call as a [`SecretString`] and is only exposed when
//! the request header is built; it never appears in logs.

use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::Config;
use crate::error::{AcademyError, Result, TransportErrorKind};
use crate::model::{GeneratedImage, ImageModel, ImageRequest, ModelError, TextModel, TextRequest};

/// Header carrying the API key.
const API_KEY_HEADER: &str = "x-goog-api-key";

/// Client for the Gemini text and Imagen image endpoints.
#[derive(Debug, Clone)]
pub struct GeminiClient {
    client: reqwest::Client,
    base_url: String,
    text_model: String,
    image_model: String,
}

impl GeminiClient {
    /// Creates a client from configuration.
    ///
    /// # Errors
    ///
    /// Returns `AcademyError::ConfigValidationError` if the HTTP client
    /// cannot be constructed.
    pub fn from_config(config: &Config) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| {
                AcademyError::config_validation(
                    format!("failed to build HTTP client: {e}"),
                    "Check the TLS configuration of this machine",
                )
            })?;

        Ok(Self {
            client,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            text_model: config.text_model.clone(),
            image_model: config.image_model.clone(),
        })
    }

    /// Overrides the base URL (useful for testing or proxies).
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// The text model identifier.
    #[must_use]
    pub fn text_model(&self) -> &str {
        &self.text_model
    }

    /// The image model identifier.
    #[must_use]
    pub fn image_model(&self) -> &str {
        &self.image_model
    }

    fn url(&self, model: &str, method: &str) -> String {
        format!("{}/v1beta/models/{model}:{method}", self.base_url)
    }

    async fn post<B: Serialize + Sync>(
        &self,
        url: &str,
        credential: &SecretString,
        body: &B,
    ) -> std::result::Result<reqwest::Response, ModelError> {
        let response = self
            .client
            .post(url)
            .header(API_KEY_HEADER, credential.expose_secret())
            .json(body)
            .send()
            .await
            .map_err(|e| ModelError::new(classify_reqwest_error(&e), format!("HTTP request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            let detail = error_message(&error_body).unwrap_or(error_body);
            return Err(ModelError::new(
                classify_status(status.as_u16()),
                format!("HTTP {status}: {detail}"),
            ));
        }

        Ok(response)
    }
}

impl TextModel for GeminiClient {
    async fn generate_text(
        &self,
        credential: &SecretString,
        request: &TextRequest,
    ) -> std::result::Result<String, ModelError> {
        let url = self.url(&self.text_model, "generateContent");
        let body = GenerateContentRequest::from(request);

        tracing::debug!(
            model = %self.text_model,
            prompt_chars = request.prompt.len(),
            "Sending text generation request"
        );

        let response = self.post(&url, credential, &body).await?;
        let envelope: GenerateContentResponse = response.json().await.map_err(|e| {
            ModelError::new(
                TransportErrorKind::Other,
                format!("failed to parse response envelope: {e}"),
            )
        })?;

        envelope.into_text()
    }
}

impl ImageModel for GeminiClient {
    async fn generate_images(
        &self,
        credential: &SecretString,
        request: &ImageRequest,
    ) -> std::result::Result<Vec<GeneratedImage>, ModelError> {
        let url = self.url(&self.image_model, "predict");
        let body = PredictRequest::from(request);

        tracing::debug!(model = %self.image_model, "Sending image generation request");

        let response = self.post(&url, credential, &body).await?;
        let envelope: PredictResponse = response.json().await.map_err(|e| {
            ModelError::new(
                TransportErrorKind::Other,
                format!("failed to parse response envelope: {e}"),
            )
        })?;

        Ok(envelope.into_images(&request.mime_type))
    }
}

/// Maps an HTTP status code to a transport error kind.
#[must_use]
pub const fn classify_status(status: u16) -> TransportErrorKind {
    match status {
        401 | 403 => TransportErrorKind::Authentication,
        429 => TransportErrorKind::RateLimit,
        500..=599 => TransportErrorKind::Server,
        _ => TransportErrorKind::Other,
    }
}

fn classify_reqwest_error(error: &reqwest::Error) -> TransportErrorKind {
    if error.is_connect() || error.is_timeout() {
        TransportErrorKind::Network
    } else {
        TransportErrorKind::Other
    }
}

/// Pulls `error.message` out of a Google API error body.
fn error_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    value
        .get("error")?
        .get("message")?
        .as_str()
        .map(ToString::to_string)
}

// ============================================================================
// Wire types: generateContent
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    system_instruction: Content,
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize, Deserialize, Default)]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_mime_type: String,
    response_schema: Value,
}

impl From<&TextRequest> for GenerateContentRequest {
    fn from(request: &TextRequest) -> Self {
        Self {
            system_instruction: Content {
                role: None,
                parts: vec![Part {
                    text: Some(request.system_instruction.clone()),
                }],
            },
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![Part {
                    text: Some(request.prompt.clone()),
                }],
            }],
            generation_config: GenerationConfig {
                response_mime_type: request.response_mime_type.clone(),
                response_schema: request.response_schema.clone(),
            },
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Content,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

impl GenerateContentResponse {
    fn into_text(self) -> std::result::Result<String, ModelError> {
        if let Some(reason) = self.prompt_feedback.and_then(|f| f.block_reason) {
            return Err(ModelError::new(
                TransportErrorKind::Refusal,
                format!("prompt was blocked: {reason}"),
            ));
        }

        let Some(candidate) = self.candidates.into_iter().next() else {
            return Err(ModelError::new(
                TransportErrorKind::Refusal,
                "response contained no candidates",
            ));
        };

        let text: String = candidate
            .content
            .parts
            .into_iter()
            .filter_map(|part| part.text)
            .collect();

        if text.trim().is_empty() {
            let reason = candidate.finish_reason.unwrap_or_else(|| "unknown".to_string());
            return Err(ModelError::new(
                TransportErrorKind::Refusal,
                format!("response contained no text (finish reason: {reason})"),
            ));
        }

        Ok(text)
    }
}

// ============================================================================
// Wire types: predict
// ============================================================================

#[derive(Debug, Serialize)]
struct PredictRequest {
    instances: Vec<PredictInstance>,
    parameters: PredictParameters,
}

#[derive(Debug, Serialize)]
struct PredictInstance {
    prompt: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PredictParameters {
    sample_count: u32,
    aspect_ratio: String,
    output_options: OutputOptions,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct OutputOptions {
    mime_type: String,
}

impl From<&ImageRequest> for PredictRequest {
    fn from(request: &ImageRequest) -> Self {
        Self {
            instances: vec![PredictInstance {
                prompt: request.prompt.clone(),
            }],
            parameters: PredictParameters {
                sample_count: request.count,
                aspect_ratio: request.aspect_ratio.clone(),
                output_options: OutputOptions {
                    mime_type: request.mime_type.clone(),
                },
            },
        }
    }
}

#[derive(Debug, Deserialize)]
struct PredictResponse {
    #[serde(default)]
    predictions: Vec<Prediction>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Prediction {
    #[serde(default)]
    bytes_base64_encoded: Option<String>,
    #[serde(default)]
    mime_type: Option<String>,
}

impl PredictResponse {
    /// Keeps predictions that carry image bytes; filtered entries are dropped.
    fn into_images(self, default_mime: &str) -> Vec<GeneratedImage> {
        self.predictions
            .into_iter()
            .filter_map(|p| {
                let data = p.bytes_base64_encoded.filter(|d| !d.is_empty())?;
                Some(GeneratedImage {
                    mime_type: p.mime_type.unwrap_or_else(|| default_mime.to_string()),
                    base64_data: data,
                })
            })
            .collect()
    }
}
