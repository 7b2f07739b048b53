//! Configuration types for the lesson pipeline.
//!
//! Configuration lives in an optional `academy.json` file. Every field has a
//! default, unknown fields are ignored, and enum values are accepted in any
//! letter case.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{AcademyError, Result};
use crate::lesson::{GroundingMode, Language};

/// The default config file name.
const CONFIG_FILE_NAME: &str = "academy.json";

/// Default model used for the structured text call.
fn default_text_model() -> String {
    "gemini-2.5-flash".to_string()
}

/// Default model used for panel illustrations.
fn default_image_model() -> String {
    "imagen-4.0-generate-001".to_string()
}

/// Default base URL of the hosted model API.
fn default_api_base_url() -> String {
    "https://generativelanguage.googleapis.com".to_string()
}

/// Default environment variable holding the API credential.
fn default_api_key_env() -> String {
    "API_KEY".to_string()
}

/// Default timeout in seconds for a single outbound request.
const fn default_request_timeout() -> u64 {
    120
}

/// Default number of document characters forwarded to the model.
const fn default_max_document_chars() -> usize {
    30_000
}

/// Default output directory for exported lessons.
fn default_output_dir() -> String {
    ".".to_string()
}

/// Main configuration for lesson generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Model used for the structured text call.
    #[serde(default = "default_text_model")]
    pub text_model: String,

    /// Model used for panel illustrations.
    #[serde(default = "default_image_model")]
    pub image_model: String,

    /// Base URL of the hosted model API.
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// Environment variable that holds the API credential.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// Timeout for a single outbound request, in seconds.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Default lesson language.
    #[serde(default)]
    pub language: Language,

    /// Display names of the two supported languages.
    #[serde(default)]
    pub languages: LanguageNames,

    /// Default grounding mode when a document is supplied.
    #[serde(default)]
    pub grounding: GroundingMode,

    /// What to do when a panel illustration fails.
    #[serde(default)]
    pub panel_failure_policy: PanelFailurePolicy,

    /// Maximum number of document characters included in the prompt.
    #[serde(default = "default_max_document_chars")]
    pub max_document_chars: usize,

    /// Output directory for exported lessons.
    #[serde(default = "default_output_dir")]
    pub output_dir: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            text_model: default_text_model(),
            image_model: default_image_model(),
            api_base_url: default_api_base_url(),
            api_key_env: default_api_key_env(),
            request_timeout_secs: default_request_timeout(),
            language: Language::default(),
            languages: LanguageNames::default(),
            grounding: GroundingMode::default(),
            panel_failure_policy: PanelFailurePolicy::default(),
            max_document_chars: default_max_document_chars(),
            output_dir: default_output_dir(),
        }
    }
}

impl Config {
    /// Loads configuration from the current working directory.
    ///
    /// Looks for `academy.json` in the current directory and falls back to
    /// the defaults when it is absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but contains invalid JSON.
    pub fn load() -> Result<Self> {
        let current_dir = std::env::current_dir().map_err(|e| {
            AcademyError::config_parse(
                "<current directory>",
                format!("cannot determine current directory: {e}"),
            )
        })?;
        Self::load_from_dir(&current_dir)
    }

    /// Loads configuration from `academy.json` in a specific directory.
    pub fn load_from_dir(dir: &Path) -> Result<Self> {
        let config_path = dir.join(CONFIG_FILE_NAME);
        Self::load_from_file(&config_path)
    }

    /// Loads configuration from a specific file path.
    ///
    /// If the file does not exist, returns default configuration.
    ///
    /// # Errors
    ///
    /// Returns `AcademyError::ConfigParseError` if the file exists but contains
    /// invalid JSON or invalid enum values.
    ///
    /// Returns `AcademyError::ConfigValidationError` if the configuration values
    /// are invalid (e.g., empty model names, zero timeout).
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let config = Self::default();
                config.validate()?;
                return Ok(config);
            }
            Err(e) => {
                return Err(AcademyError::config_parse(
                    path,
                    format!("failed to read file: {e}"),
                ));
            }
        };

        let config: Self = serde_json::from_str(&contents)
            .map_err(|e| AcademyError::config_parse(path, e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration values.
    ///
    /// # Errors
    ///
    /// Returns `AcademyError::ConfigValidationError` if any validation check fails.
    pub fn validate(&self) -> Result<()> {
        if self.text_model.trim().is_empty() {
            return Err(AcademyError::config_validation(
                "textModel must not be empty",
                "Set textModel to a model name such as 'gemini-2.5-flash' in your academy.json",
            ));
        }

        if self.image_model.trim().is_empty() {
            return Err(AcademyError::config_validation(
                "imageModel must not be empty",
                "Set imageModel to a model name such as 'imagen-4.0-generate-001' in your academy.json",
            ));
        }

        let base_url = self.api_base_url.trim();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(AcademyError::config_validation(
                format!("apiBaseUrl must be an http(s) URL, got '{}'", self.api_base_url),
                "Set apiBaseUrl to a fully-qualified URL in your academy.json",
            ));
        }

        if self.api_key_env.trim().is_empty() {
            return Err(AcademyError::config_validation(
                "apiKeyEnv must not be empty",
                "Set apiKeyEnv to the name of the environment variable holding your API key",
            ));
        }

        if self.request_timeout_secs == 0 {
            return Err(AcademyError::config_validation(
                "requestTimeoutSecs must be greater than 0",
                "Set requestTimeoutSecs to at least 1 second in your academy.json",
            ));
        }

        if self.max_document_chars == 0 {
            return Err(AcademyError::config_validation(
                "maxDocumentChars must be greater than 0",
                "Set maxDocumentChars to at least 1 in your academy.json",
            ));
        }

        if self.languages.primary.trim().is_empty() || self.languages.secondary.trim().is_empty()
        {
            return Err(AcademyError::config_validation(
                "languages.primary and languages.secondary must not be empty",
                "Name both languages in your academy.json, e.g. \"English\" and \"Persian\"",
            ));
        }

        if self.output_dir.trim().is_empty() {
            return Err(AcademyError::config_validation(
                "outputDir must not be empty",
                "Provide a valid output directory path in your academy.json (use '.' for current directory)",
            ));
        }

        Ok(())
    }

    /// Returns the display name of a language.
    #[must_use]
    pub fn language_name(&self, language: Language) -> &str {
        match language {
            Language::Primary => &self.languages.primary,
            Language::Secondary => &self.languages.secondary,
        }
    }
}

/// Default display name of the primary language.
fn default_primary_language() -> String {
    "English".to_string()
}

/// Default display name of the secondary language.
fn default_secondary_language() -> String {
    "Persian".to_string()
}

/// Display names of the two supported lesson languages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LanguageNames {
    /// Name of the primary language.
    #[serde(default = "default_primary_language")]
    pub primary: String,

    /// Name of the secondary language.
    #[serde(default = "default_secondary_language")]
    pub secondary: String,
}

impl Default for LanguageNames {
    fn default() -> Self {
        Self {
            primary: default_primary_language(),
            secondary: default_secondary_language(),
        }
    }
}

/// Policy applied when an individual panel illustration fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PanelFailurePolicy {
    /// Any failed panel fails the entire lesson (default).
    #[default]
    FailLesson,
    /// Failed panels receive a placeholder image and the lesson carries a warning.
    Placeholder,
}

impl PanelFailurePolicy {
    /// Parses a string into a `PanelFailurePolicy`, case-insensitively.
    fn from_str_case_insensitive(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "faillesson" | "fail_lesson" | "fail-lesson" => Some(Self::FailLesson),
            "placeholder" => Some(Self::Placeholder),
            _ => None,
        }
    }
}

impl<'de> Deserialize<'de> for PanelFailurePolicy {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::from_str_case_insensitive(&s).ok_or_else(|| {
            serde::de::Error::custom(format!(
                "invalid panel failure policy '{s}': expected one of 'failLesson', 'placeholder'"
            ))
        })
    }
}

impl Serialize for PanelFailurePolicy {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let s = match self {
            Self::FailLesson => "failLesson",
            Self::Placeholder => "placeholder",
        };
        serializer.serialize_str(s)
    }
}
