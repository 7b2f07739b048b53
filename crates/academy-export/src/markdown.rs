//! Markdown rendering of a lesson.
//!
//! The document has the same sections, in the same order, as the lesson
//! page: title, quote, explanation, comic, flashcards, mind map, reading
//! list, source note, and a footer with the rating.
//!
//! # Example
//!
//! ```rust,ignore
//! let markdown = MarkdownExporter::new(&lesson).generate();
//! std::fs::write("photosynthesis.md", markdown)?;
//! ```

use std::fmt::Write;

use academy_core::{FlashcardEntry, Lesson, MindMapNode};
use chrono::{DateTime, Utc};

/// Renders a [`Lesson`] as a Markdown document.
pub struct MarkdownExporter<'a> {
    lesson: &'a Lesson,
}

impl<'a> MarkdownExporter<'a> {
    /// Creates a new exporter for the given lesson.
    #[must_use]
    pub const fn new(lesson: &'a Lesson) -> Self {
        Self { lesson }
    }

    /// Generates the complete Markdown document.
    #[must_use]
    pub fn generate(&self) -> String {
        let mut output = String::new();

        self.write_title(&mut output);
        self.write_quote(&mut output);
        self.write_explanation(&mut output);
        self.write_comic(&mut output);
        self.write_flashcards(&mut output);
        self.write_mind_map(&mut output);
        self.write_reading(&mut output);
        self.write_source(&mut output);
        self.write_notes(&mut output);
        self.write_footer(&mut output);

        output
    }

    fn write_title(&self, output: &mut String) {
        let _ = writeln!(output, "# {}\n", escape_markdown(self.lesson.topic.trim()));
    }

    fn write_quote(&self, output: &mut String) {
        let quote = &self.lesson.quote;
        let _ = writeln!(output, "> \"{}\"", escape_markdown(quote.text.trim()));
        let _ = writeln!(output, ">");
        let _ = writeln!(output, "> *{}*\n", escape_markdown(quote.author.trim()));
    }

    /// The explanation is already Markdown and is written verbatim.
    fn write_explanation(&self, output: &mut String) {
        let _ = writeln!(output, "## Explanation\n");
        let _ = writeln!(output, "{}\n", self.lesson.explanation.trim());
    }

    fn write_comic(&self, output: &mut String) {
        let _ = writeln!(output, "## Comic\n");

        if self.lesson.comic_panels.is_empty() {
            let _ = writeln!(output, "*No panels.*\n");
            return;
        }

        for (index, panel) in self.lesson.comic_panels.iter().enumerate() {
            let number = index + 1;
            let _ = writeln!(output, "### Panel {number}\n");
            let _ = writeln!(output, "![Panel {number}]({})\n", panel.image_url);
            let _ = writeln!(output, "{}\n", escape_markdown(&panel.narrative));
        }
    }

    fn write_flashcards(&self, output: &mut String) {
        let _ = writeln!(output, "## Flashcards\n");

        if self.lesson.flashcards.is_empty() {
            let _ = writeln!(output, "*No flashcards.*\n");
            return;
        }

        output.push_str(&render_flashcards(&self.lesson.flashcards));
        let _ = writeln!(output);
    }

    fn write_mind_map(&self, output: &mut String) {
        let _ = writeln!(output, "## Mind Map\n");
        output.push_str(&render_mind_map(&self.lesson.mind_map));
        let _ = writeln!(output);
    }

    fn write_reading(&self, output: &mut String) {
        let _ = writeln!(output, "## Recommended Reading\n");

        if self.lesson.recommended_reading.is_empty() {
            let _ = writeln!(output, "*No recommendations.*\n");
            return;
        }

        for (index, citation) in self.lesson.recommended_reading.iter().enumerate() {
            let _ = writeln!(output, "{}. {}", index + 1, citation.trim());
        }
        let _ = writeln!(output);
    }

    fn write_source(&self, output: &mut String) {
        if let Some(name) = &self.lesson.source_file_name {
            let _ = writeln!(output, "## Source\n");
            let _ = writeln!(
                output,
                "This lesson is grounded in *{}*.\n",
                escape_markdown(name)
            );
        }
    }

    fn write_notes(&self, output: &mut String) {
        if self.lesson.warnings.is_empty() {
            return;
        }

        let _ = writeln!(output, "## Notes\n");
        for warning in &self.lesson.warnings {
            let _ = writeln!(output, "- {}", escape_markdown(warning));
        }
        let _ = writeln!(output);
    }

    fn write_footer(&self, output: &mut String) {
        let _ = writeln!(output, "---");
        let _ = writeln!(
            output,
            "*{} likes, {} dislikes*",
            self.lesson.likes, self.lesson.dislikes
        );
        let timestamp = format_timestamp(&self.lesson.created_at);
        let _ = writeln!(output, "*Generated by Animal Academy at {timestamp}*");
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Renders flashcards as a two-column table.
///
/// Definitions keep their bold markup; only table-breaking characters are escaped.
fn render_flashcards(cards: &[FlashcardEntry]) -> String {
    let mut output = String::new();
    let _ = writeln!(output, "| Term | Definition |");
    let _ = writeln!(output, "|------|------------|");
    for card in cards {
        let _ = writeln!(
            output,
            "| {} | {} |",
            escape_table_cell(card.term.trim()),
            escape_table_cell(card.definition.trim())
        );
    }
    output
}

/// Renders a mind map as a nested bullet list with the root in bold.
fn render_mind_map(root: &MindMapNode) -> String {
    let mut output = String::new();
    write_mind_map_node(&mut output, root, 0);
    output
}

fn write_mind_map_node(output: &mut String, node: &MindMapNode, depth: usize) {
    let title = escape_markdown(node.title.trim());
    if depth == 0 {
        let _ = writeln!(output, "- **{title}**");
    } else {
        let indent = "  ".repeat(depth);
        let _ = writeln!(output, "{indent}- {title}");
    }

    for child in &node.children {
        write_mind_map_node(output, child, depth + 1);
    }
}

/// Formats a timestamp to a human-readable string.
///
/// Format: "YYYY-MM-DD HH:MM:SS UTC"
fn format_timestamp(dt: &DateTime<Utc>) -> String {
    dt.format("%Y-%m-%d %H:%M:%S UTC").to_string()
}

/// Escapes special Markdown characters in text.
///
/// This prevents model-written text from being interpreted as formatting.
fn escape_markdown(text: &str) -> String {
    let mut result = String::with_capacity(text.len());

    for ch in text.chars() {
        match ch {
            '*' | '_' | '`' | '#' | '[' | ']' | '(' | ')' | '!' | '\\' | '<' | '>' | '|' => {
                result.push('\\');
                result.push(ch);
            }
            '\n' => result.push(' '),
            _ => result.push(ch),
        }
    }

    result
}

/// Escapes characters that would break a table row.
fn escape_table_cell(text: &str) -> String {
    text.replace('|', "\\|").replace('\n', "<br>")
}
