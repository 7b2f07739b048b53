//! Animal Academy lesson export
//!
//! Renders a finished [`Lesson`] to Markdown for reading and to JSON for
//! programmatic use, and writes both next to each other on disk.
//!
//! # Example
//!
//! ```rust
//! use academy_core::Lesson;
//! use academy_export::{lesson_slug, MarkdownExporter};
//!
//! # fn lesson() -> Lesson {
//! #     serde_json::from_value(serde_json::json!({
//! #         "id": "6f1c2f4e-8a8e-4f55-9d6a-0d6b1c1c2a10",
//! #         "topic": "Photosynthesis",
//! #         "language": "primary",
//! #         "quote": { "text": "Look deep into nature.", "author": "Albert Einstein" },
//! #         "explanation": "Plants turn light into sugar.",
//! #         "recommendedReading": [],
//! #         "comicPanels": [],
//! #         "flashcards": [],
//! #         "mindMap": { "title": "Photosynthesis" },
//! #         "likes": 0,
//! #         "dislikes": 0,
//! #         "createdAt": "2026-01-01T00:00:00Z"
//! #     })).unwrap()
//! # }
//! let lesson = lesson();
//! let markdown = MarkdownExporter::new(&lesson).generate();
//! assert!(markdown.starts_with("# Photosynthesis"));
//! assert_eq!(lesson_slug(&lesson.topic), "photosynthesis");
//! ```

pub mod json;
mod markdown;

pub use markdown::MarkdownExporter;

use std::path::{Path, PathBuf};

use academy_core::Lesson;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::json::JsonExporter;

// ============================================================================
// Error Types
// ============================================================================

/// Errors that can occur while exporting a lesson.
#[derive(Debug, Error)]
pub enum ExportError {
    /// Failed to serialize the lesson to JSON.
    #[error("failed to serialize lesson: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Failed to create or write an export file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// No export format was requested.
    #[error("no export format selected")]
    NoFormats,
}

/// Result type for export operations.
pub type Result<T> = std::result::Result<T, ExportError>;

// ============================================================================
// Export Formats
// ============================================================================

/// File format a lesson can be exported to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    /// Human-readable Markdown.
    Markdown,
    /// Pretty-printed JSON.
    Json,
}

impl ExportFormat {
    /// File extension for this format.
    #[must_use]
    pub const fn extension(&self) -> &'static str {
        match self {
            Self::Markdown => "md",
            Self::Json => "json",
        }
    }
}

impl std::fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Markdown => write!(f, "markdown"),
            Self::Json => write!(f, "json"),
        }
    }
}

// ============================================================================
// File Export
// ============================================================================

/// Derives a file-name stem from a lesson topic.
///
/// Lowercases the topic and collapses every run of characters other than
/// letters and digits into a single `-`. Falls back to `lesson` when nothing
/// usable is left.
#[must_use]
pub fn lesson_slug(topic: &str) -> String {
    use regex::Regex;

    let lowered = topic.to_lowercase();
    let slug = match Regex::new(r"[^\p{L}\p{N}]+") {
        Ok(re) => re.replace_all(&lowered, "-").trim_matches('-').to_string(),
        Err(_) => String::new(),
    };

    if slug.is_empty() {
        "lesson".to_string()
    } else {
        slug
    }
}

/// Writes the lesson to `dir` in every requested format.
///
/// Files are named `<slug>.<ext>`. The directory is created if missing.
/// Returns the written paths in the order of `formats`.
///
/// # Errors
///
/// Returns [`ExportError::NoFormats`] if `formats` is empty, or an I/O or
/// serialization error from writing a file.
pub fn export_lesson(lesson: &Lesson, dir: &Path, formats: &[ExportFormat]) -> Result<Vec<PathBuf>> {
    if formats.is_empty() {
        return Err(ExportError::NoFormats);
    }

    std::fs::create_dir_all(dir)?;
    let slug = lesson_slug(&lesson.topic);

    let mut written = Vec::with_capacity(formats.len());
    for format in formats {
        let path = dir.join(format!("{slug}.{}", format.extension()));
        match format {
            ExportFormat::Markdown => {
                std::fs::write(&path, MarkdownExporter::new(lesson).generate())?;
            }
            ExportFormat::Json => JsonExporter::new(lesson).write_to_file(&path, true)?,
        }
        written.push(path);
    }

    Ok(written)
}
