//! Error types for the Animal Academy lesson pipeline.
//!
//! Every failure inside the pipeline is mapped to one [`AcademyError`]
//! variant at the generator boundary. Each variant renders a single
//! human-readable message, and [`AcademyError::class`] buckets it into the
//! coarse categories a caller needs to decide what to tell the user.

use std::path::PathBuf;

/// A specialized `Result` type for lesson pipeline operations.
pub type Result<T> = std::result::Result<T, AcademyError>;

/// Errors that can occur while building, generating, or handling a lesson.
#[derive(Debug, thiserror::Error)]
pub enum AcademyError {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Invalid JSON syntax in configuration file.
    #[error("Invalid JSON in config file '{path}': {message}\n\nSuggestion: Validate your academy.json with a JSON linter")]
    ConfigParseError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Description of the parse error.
        message: String,
    },

    /// Configuration validation failed.
    #[error("Invalid configuration: {message}\n\nSuggestion: {suggestion}")]
    ConfigValidationError {
        /// Description of the validation failure.
        message: String,
        /// Actionable suggestion for the user.
        suggestion: String,
    },

    /// The API credential is not available. No request was sent.
    #[error("API key is missing: environment variable '{env_var}' is not set\n\nSuggestion: Export {env_var} with your model service API key and try again")]
    MissingCredential {
        /// Name of the environment variable that was checked.
        env_var: String,
    },

    // ========================================================================
    // Input Errors
    // ========================================================================
    /// The lesson topic is blank.
    #[error("Please enter a concept to explain\n\nSuggestion: Provide a non-empty topic such as 'Photosynthesis'")]
    InvalidTopic,

    /// Source document was not found.
    #[error("Source document not found: '{path}'\n\nSuggestion: Check the --document path")]
    DocumentNotFound {
        /// Path where the document was expected.
        path: PathBuf,
    },

    /// Source document exceeds the size limit.
    #[error("Source document exceeds size limit (1024KB): '{path}' is {size_kb}KB\n\nSuggestion: Upload an excerpt instead of the whole file")]
    DocumentTooLarge {
        /// Path to the oversized document.
        path: PathBuf,
        /// Actual size in kilobytes.
        size_kb: u64,
    },

    /// Source document is not valid UTF-8.
    #[error("Source document has invalid encoding: '{path}'\n\nSuggestion: Convert the file to UTF-8 encoding")]
    DocumentEncoding {
        /// Path to the document with encoding issues.
        path: PathBuf,
    },

    /// Source document contains no text.
    #[error("Source document is empty: '{path}'\n\nSuggestion: Upload a document that contains text")]
    DocumentEmpty {
        /// Path to the empty document.
        path: PathBuf,
    },

    /// Source document format cannot be read directly.
    #[error("Unsupported document format: '{path}'\n\nSuggestion: Extract the text to a .txt or .md file first")]
    UnsupportedDocument {
        /// Path to the unsupported document.
        path: PathBuf,
    },

    // ========================================================================
    // Model Call Errors
    // ========================================================================
    /// The text-generation request failed in transport or was refused.
    #[error("Failed to generate the lesson: {stage} request failed ({kind}): {message}\n\nSuggestion: {suggestion}")]
    Transport {
        /// Which call failed.
        stage: CallStage,
        /// The kind of transport failure.
        kind: TransportErrorKind,
        /// Underlying transport error message.
        message: String,
        /// Actionable suggestion for the user.
        suggestion: String,
    },

    /// The text model returned something that is not JSON.
    #[error("Failed to generate the lesson: the model returned a malformed response: {message}\n\nSuggestion: Submit the topic again; the model output could not be read")]
    MalformedResponse {
        /// Description of the parse failure.
        message: String,
    },

    /// The text model returned JSON missing required content.
    #[error("Failed to generate the lesson: invalid response structure from the text model: {field} {message}\n\nSuggestion: Submit the topic again; the model skipped part of the lesson")]
    InvalidStructure {
        /// Path of the offending field (e.g. `comic_script[2].narrative`).
        field: String,
        /// What was wrong with it.
        message: String,
    },

    /// Image generation failed for a comic panel.
    #[error("Failed to generate the lesson: image generation failed for panel {panel}: {message}\n\nSuggestion: {suggestion}")]
    ImageGeneration {
        /// One-based panel number.
        panel: usize,
        /// Transport failure kind; `None` when the call succeeded but returned no image.
        kind: Option<TransportErrorKind>,
        /// Description of the failure.
        message: String,
        /// Actionable suggestion for the user.
        suggestion: String,
    },

    // ========================================================================
    // General Errors
    // ========================================================================
    /// General I/O error during file operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid state transition attempted.
    #[error("Invalid state transition: cannot go from {from} to {to}")]
    InvalidStateTransition {
        /// The current state.
        from: String,
        /// The attempted target state.
        to: String,
    },
}

/// Suggestion for a panel whose image call returned nothing.
const EMPTY_IMAGE_SUGGESTION: &str =
    "Submit the topic again, or enable the placeholder panel policy";

/// Which outbound model call an error came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallStage {
    /// The single text-generation call.
    Text,
    /// One of the per-panel image-generation calls.
    Image,
}

impl std::fmt::Display for CallStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text => write!(f, "text generation"),
            Self::Image => write!(f, "image generation"),
        }
    }
}

/// Categories of transport failures for structured error handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportErrorKind {
    /// Authentication failure (invalid API key, revoked credentials).
    Authentication,
    /// Rate limit or quota exceeded.
    RateLimit,
    /// Server error (5xx responses).
    Server,
    /// Network connectivity issues or timeouts.
    Network,
    /// The model declined to answer the prompt.
    Refusal,
    /// Other unclassified errors.
    Other,
}

impl std::fmt::Display for TransportErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Authentication => write!(f, "authentication"),
            Self::RateLimit => write!(f, "rate_limit"),
            Self::Server => write!(f, "server"),
            Self::Network => write!(f, "network"),
            Self::Refusal => write!(f, "refusal"),
            Self::Other => write!(f, "other"),
        }
    }
}

impl TransportErrorKind {
    /// Returns `true` for failures that may clear up on their own.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::RateLimit | Self::Server | Self::Network)
    }

    /// Returns a suggestion message for this error kind.
    #[must_use]
    pub const fn suggestion(&self) -> &'static str {
        match self {
            Self::Authentication => "Check that your API key is valid and enabled for both models",
            Self::RateLimit => "Wait a moment before submitting again; your quota may be exhausted",
            Self::Server => "Submit again later; the model service may be experiencing issues",
            Self::Network => "Check your network connection",
            Self::Refusal => "Rephrase the topic; the model declined to answer it",
            Self::Other => "Check the model service status page",
        }
    }
}

/// Coarse classification of an [`AcademyError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Credential or configuration problem; no call was attempted.
    Configuration,
    /// Caller-side input problem (blank topic, unreadable document).
    Input,
    /// Network or service failure on the text call.
    Transport,
    /// Text response was not valid JSON.
    MalformedResponse,
    /// Text response parsed but lacked required content.
    InvalidStructure,
    /// An image call failed or returned no image.
    ImageGeneration,
    /// Local I/O, serialization, or state-machine misuse.
    Internal,
}

impl AcademyError {
    /// Creates a new `ConfigParseError` with the given path and message.
    #[must_use]
    pub fn config_parse(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::ConfigParseError {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Creates a new `ConfigValidationError` with the given message and suggestion.
    #[must_use]
    pub fn config_validation(message: impl Into<String>, suggestion: impl Into<String>) -> Self {
        Self::ConfigValidationError {
            message: message.into(),
            suggestion: suggestion.into(),
        }
    }

    /// Creates a new `MissingCredential` error.
    #[must_use]
    pub fn missing_credential(env_var: impl Into<String>) -> Self {
        Self::MissingCredential {
            env_var: env_var.into(),
        }
    }

    /// Creates a new `DocumentNotFound` error.
    #[must_use]
    pub fn document_not_found(path: impl Into<PathBuf>) -> Self {
        Self::DocumentNotFound { path: path.into() }
    }

    /// Creates a new `DocumentTooLarge` error.
    #[must_use]
    pub fn document_too_large(path: impl Into<PathBuf>, size_kb: u64) -> Self {
        Self::DocumentTooLarge {
            path: path.into(),
            size_kb,
        }
    }

    /// Creates a new `DocumentEncoding` error.
    #[must_use]
    pub fn document_encoding(path: impl Into<PathBuf>) -> Self {
        Self::DocumentEncoding { path: path.into() }
    }

    /// Creates a new `DocumentEmpty` error.
    #[must_use]
    pub fn document_empty(path: impl Into<PathBuf>) -> Self {
        Self::DocumentEmpty { path: path.into() }
    }

    /// Creates a new `UnsupportedDocument` error.
    #[must_use]
    pub fn unsupported_document(path: impl Into<PathBuf>) -> Self {
        Self::UnsupportedDocument { path: path.into() }
    }

    /// Creates a new `Transport` error with automatic suggestion based on error kind.
    #[must_use]
    pub fn transport(stage: CallStage, kind: TransportErrorKind, message: impl Into<String>) -> Self {
        Self::Transport {
            stage,
            kind,
            message: message.into(),
            suggestion: kind.suggestion().to_string(),
        }
    }

    /// Creates a new `MalformedResponse` error.
    #[must_use]
    pub fn malformed_response(message: impl Into<String>) -> Self {
        Self::MalformedResponse {
            message: message.into(),
        }
    }

    /// Creates a new `InvalidStructure` error.
    #[must_use]
    pub fn invalid_structure(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidStructure {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Creates a new `ImageGeneration` error for a panel whose call returned no image.
    ///
    /// `panel` is one-based.
    #[must_use]
    pub fn image_generation(panel: usize, message: impl Into<String>) -> Self {
        Self::ImageGeneration {
            panel,
            kind: None,
            message: message.into(),
            suggestion: EMPTY_IMAGE_SUGGESTION.to_string(),
        }
    }

    /// Creates a new `ImageGeneration` error for a panel whose call failed in transport.
    #[must_use]
    pub fn image_transport(panel: usize, kind: TransportErrorKind, message: impl Into<String>) -> Self {
        Self::ImageGeneration {
            panel,
            kind: Some(kind),
            message: message.into(),
            suggestion: kind.suggestion().to_string(),
        }
    }

    /// Creates a new `InvalidStateTransition` error.
    #[must_use]
    pub fn invalid_transition(from: impl std::fmt::Display, to: impl std::fmt::Display) -> Self {
        Self::InvalidStateTransition {
            from: from.to_string(),
            to: to.to_string(),
        }
    }

    /// Returns the coarse class of this error.
    #[must_use]
    pub const fn class(&self) -> ErrorClass {
        match self {
            Self::ConfigParseError { .. }
            | Self::ConfigValidationError { .. }
            | Self::MissingCredential { .. } => ErrorClass::Configuration,
            Self::InvalidTopic
            | Self::DocumentNotFound { .. }
            | Self::DocumentTooLarge { .. }
            | Self::DocumentEncoding { .. }
            | Self::DocumentEmpty { .. }
            | Self::UnsupportedDocument { .. } => ErrorClass::Input,
            Self::Transport { .. } => ErrorClass::Transport,
            Self::MalformedResponse { .. } => ErrorClass::MalformedResponse,
            Self::InvalidStructure { .. } => ErrorClass::InvalidStructure,
            Self::ImageGeneration { .. } => ErrorClass::ImageGeneration,
            Self::Io(_) | Self::Json(_) | Self::InvalidStateTransition { .. } => {
                ErrorClass::Internal
            }
        }
    }

    /// Returns `true` if submitting the same request again may succeed.
    ///
    /// The pipeline itself never retries; this only informs the caller.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        match self {
            Self::Transport { kind, .. }
            | Self::ImageGeneration {
                kind: Some(kind), ..
            } => kind.is_transient(),
            Self::MalformedResponse { .. } | Self::ImageGeneration { kind: None, .. } => true,
            _ => false,
        }
    }
}
