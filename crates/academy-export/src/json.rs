//! JSON export of a lesson.
//!
//! The output uses the lesson's own serde representation (camelCase keys),
//! so it can be read back with `serde_json::from_str::<Lesson>`.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use academy_core::Lesson;

use crate::{ExportError, Result};

/// JSON lesson exporter.
pub struct JsonExporter<'a> {
    lesson: &'a Lesson,
}

impl<'a> JsonExporter<'a> {
    /// Creates a new JSON exporter for the given lesson.
    #[must_use]
    pub const fn new(lesson: &'a Lesson) -> Self {
        Self { lesson }
    }

    /// Generates compact JSON output (single line, no extra whitespace).
    ///
    /// # Errors
    ///
    /// Returns [`ExportError::Serialization`] if JSON serialization fails.
    pub fn generate(&self) -> Result<String> {
        serde_json::to_string(self.lesson).map_err(ExportError::from)
    }

    /// Generates pretty-printed JSON output with indentation.
    ///
    /// # Errors
    ///
    /// Returns [`ExportError::Serialization`] if JSON serialization fails.
    pub fn generate_pretty(&self) -> Result<String> {
        serde_json::to_string_pretty(self.lesson).map_err(ExportError::from)
    }

    /// Writes the JSON document to a file, replacing any existing one.
    ///
    /// Parent directories must exist.
    ///
    /// # Errors
    ///
    /// Returns [`ExportError::Serialization`] if JSON serialization fails.
    /// Returns [`ExportError::Io`] if file creation or writing fails.
    pub fn write_to_file(&self, path: &Path, pretty: bool) -> Result<()> {
        let json = if pretty {
            self.generate_pretty()?
        } else {
            self.generate()?
        };

        let mut file = File::create(path)?;
        file.write_all(json.as_bytes())?;

        Ok(())
    }
}
