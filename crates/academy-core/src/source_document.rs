//! Source document loading.
//!
//! A [`SourceDocument`] is the already-extracted text of a file the user
//! wants the lesson grounded in. Plain text and Markdown are read directly;
//! other office formats must be converted by an external tool first.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{AcademyError, Result};

/// Maximum allowed source document size in bytes (1 MiB).
pub const MAX_DOCUMENT_SIZE: u64 = 1024 * 1024;

/// Text formats that can be loaded directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentFormat {
    /// Plain text (`.txt`).
    Text,
    /// Markdown (`.md`, `.markdown`).
    Markdown,
}

impl DocumentFormat {
    /// Detects a readable format from a file extension.
    ///
    /// Returns `None` for anything that needs external text extraction.
    #[must_use]
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "txt" | "text" => Some(Self::Text),
            "md" | "markdown" => Some(Self::Markdown),
            _ => None,
        }
    }

    /// Detects a readable format from a file path.
    #[must_use]
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
    }
}

impl std::fmt::Display for DocumentFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text => write!(f, "text"),
            Self::Markdown => write!(f, "markdown"),
        }
    }
}

/// Extracted text of an uploaded document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceDocument {
    /// File name shown to the user and stored on the lesson.
    pub name: String,

    /// Full extracted text.
    pub text: String,
}

impl SourceDocument {
    /// Creates a document from text that was extracted elsewhere.
    #[must_use]
    pub fn new(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            text: text.into(),
        }
    }

    /// Loads a plain text or Markdown document from disk.
    ///
    /// # Errors
    ///
    /// Returns `AcademyError::UnsupportedDocument` for formats other than
    /// `.txt`, `.md` and `.markdown`.
    /// Returns `AcademyError::DocumentNotFound` if the file doesn't exist.
    /// Returns `AcademyError::DocumentTooLarge` if the file exceeds 1 MiB.
    /// Returns `AcademyError::DocumentEncoding` if the file is not valid UTF-8.
    /// Returns `AcademyError::DocumentEmpty` if the file has no text.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        if DocumentFormat::from_path(path).is_none() {
            return Err(AcademyError::unsupported_document(path));
        }

        let metadata = std::fs::metadata(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                AcademyError::document_not_found(path)
            } else {
                AcademyError::Io(e)
            }
        })?;

        let file_size = metadata.len();
        if file_size > MAX_DOCUMENT_SIZE {
            return Err(AcademyError::document_too_large(path, file_size / 1024));
        }

        let text = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::InvalidData {
                AcademyError::document_encoding(path)
            } else {
                AcademyError::Io(e)
            }
        })?;

        if text.trim().is_empty() {
            return Err(AcademyError::document_empty(path));
        }

        Ok(Self {
            name: file_name(path),
            text,
        })
    }

    /// Number of characters in the document text.
    #[must_use]
    pub fn char_count(&self) -> usize {
        self.text.chars().count()
    }

    /// Returns at most `max_chars` characters of the text and whether it was cut.
    #[must_use]
    pub fn excerpt(&self, max_chars: usize) -> (&str, bool) {
        match self.text.char_indices().nth(max_chars) {
            Some((byte_idx, _)) => (&self.text[..byte_idx], true),
            None => (&self.text, false),
        }
    }
}

fn file_name(path: &Path) -> String {
    path.file_name().map_or_else(
        || path.display().to_string(),
        |name| name.to_string_lossy().into_owned(),
    )
}
