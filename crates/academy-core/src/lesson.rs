//! Lesson data model.
//!
//! A [`Lesson`] is created exactly once per successful generation call and
//! handed to the caller. The pipeline never touches it again; ratings and
//! edits happen in caller-owned code such as [`crate::feedback`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{AcademyError, Result};
use crate::prompt::DOCUMENT_ATTRIBUTION_PHRASE;
use crate::source_document::SourceDocument;

// ============================================================================
// Language and GroundingMode
// ============================================================================

/// Target language selector for a lesson.
///
/// The display name of each language comes from [`crate::Config::languages`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Language {
    /// The primary interface language (default).
    #[default]
    Primary,
    /// The secondary interface language.
    Secondary,
}

impl Language {
    /// Parses a string into a `Language`, case-insensitively.
    #[must_use]
    pub fn from_str_case_insensitive(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "primary" => Some(Self::Primary),
            "secondary" => Some(Self::Secondary),
            _ => None,
        }
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Primary => write!(f, "primary"),
            Self::Secondary => write!(f, "secondary"),
        }
    }
}

impl<'de> Deserialize<'de> for Language {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::from_str_case_insensitive(&s).ok_or_else(|| {
            serde::de::Error::custom(format!(
                "invalid language '{s}': expected one of 'primary', 'secondary'"
            ))
        })
    }
}

impl Serialize for Language {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

/// How an uploaded document is used when writing the explanation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum GroundingMode {
    /// The document is the primary source; every use is attributed explicitly.
    #[default]
    Primary,
    /// Broader knowledge leads; document passages are quoted as blockquotes.
    Supplementary,
}

impl GroundingMode {
    /// Parses a string into a `GroundingMode`, case-insensitively.
    #[must_use]
    pub fn from_str_case_insensitive(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "primary" => Some(Self::Primary),
            "supplementary" => Some(Self::Supplementary),
            _ => None,
        }
    }
}

impl std::fmt::Display for GroundingMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Primary => write!(f, "primary"),
            Self::Supplementary => write!(f, "supplementary"),
        }
    }
}

impl<'de> Deserialize<'de> for GroundingMode {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::from_str_case_insensitive(&s).ok_or_else(|| {
            serde::de::Error::custom(format!(
                "invalid grounding mode '{s}': expected one of 'primary', 'supplementary'"
            ))
        })
    }
}

impl Serialize for GroundingMode {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

// ============================================================================
// LessonRequest
// ============================================================================

/// Everything the caller supplies for one lesson.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LessonRequest {
    /// The concept to explain. Must not be blank.
    pub topic: String,
    /// Target language.
    pub language: Language,
    /// Optional uploaded document whose text grounds the explanation.
    pub source_document: Option<SourceDocument>,
    /// How the document is used. Ignored when there is no document.
    pub grounding: GroundingMode,
}

impl LessonRequest {
    /// Creates a request for a topic in the primary language with no document.
    #[must_use]
    pub fn new(topic: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            language: Language::default(),
            source_document: None,
            grounding: GroundingMode::default(),
        }
    }

    /// Sets the target language.
    #[must_use]
    pub const fn with_language(mut self, language: Language) -> Self {
        self.language = language;
        self
    }

    /// Attaches a source document.
    #[must_use]
    pub fn with_document(mut self, document: SourceDocument) -> Self {
        self.source_document = Some(document);
        self
    }

    /// Sets the grounding mode.
    #[must_use]
    pub const fn with_grounding(mut self, grounding: GroundingMode) -> Self {
        self.grounding = grounding;
        self
    }

    /// Checks the caller-side preconditions.
    ///
    /// # Errors
    ///
    /// Returns [`AcademyError::InvalidTopic`] if the topic is blank.
    pub fn validate(&self) -> Result<()> {
        if self.topic.trim().is_empty() {
            return Err(AcademyError::InvalidTopic);
        }
        Ok(())
    }
}

// ============================================================================
// Lesson content types
// ============================================================================

/// An inspirational quote attached to the lesson.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quote {
    /// The quoted text.
    pub text: String,
    /// Who said it.
    pub author: String,
}

/// One entry of the model-written comic script, before illustration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComicPanelScript {
    /// Short caption, under about fifteen words.
    pub narrative: String,
    /// Prompt for the image model, starting with the canonical prefix.
    pub image_prompt: String,
}

/// A comic panel paired with its generated illustration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComicPanel {
    /// Caption shown under the image.
    pub narrative: String,
    /// Displayable image reference (data URI or remote URL).
    pub image_url: String,
}

/// A study flashcard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlashcardEntry {
    /// Term on the front of the card.
    pub term: String,
    /// Definition on the back; may contain `**bold**` emphasis.
    pub definition: String,
}

/// A node of the lesson mind map.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MindMapNode {
    /// Node label.
    pub title: String,
    /// Ordered child nodes.
    #[serde(default)]
    pub children: Vec<MindMapNode>,
}

impl MindMapNode {
    /// Creates a leaf node.
    #[must_use]
    pub fn leaf(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            children: Vec::new(),
        }
    }

    /// Creates a node with children.
    #[must_use]
    pub fn with_children(title: impl Into<String>, children: Vec<Self>) -> Self {
        Self {
            title: title.into(),
            children,
        }
    }

    /// Depth of the tree rooted here; a leaf has depth 1.
    #[must_use]
    pub fn depth(&self) -> usize {
        1 + self.children.iter().map(Self::depth).max().unwrap_or(0)
    }

    /// Total number of nodes in the tree rooted here.
    #[must_use]
    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(Self::node_count).sum::<usize>()
    }
}

/// A Markdown hyperlink found in the explanation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExplanationLink {
    /// Link text (the key term).
    pub text: String,
    /// Link target.
    pub url: String,
}

// ============================================================================
// Lesson
// ============================================================================

/// The complete educational artifact returned by the generator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lesson {
    /// Unique identifier, fresh for every generation.
    pub id: Uuid,
    /// Topic the lesson was generated for.
    pub topic: String,
    /// Language the lesson was written in.
    pub language: Language,
    /// Opening quote.
    pub quote: Quote,
    /// Explanation with blank-line paragraph breaks, links, and bold terms.
    pub explanation: String,
    /// Citations in bibliographic form.
    pub recommended_reading: Vec<String>,
    /// Illustrated panels, in script order.
    pub comic_panels: Vec<ComicPanel>,
    /// Study flashcards.
    pub flashcards: Vec<FlashcardEntry>,
    /// Mind map of the topic.
    pub mind_map: MindMapNode,
    /// File name of the grounding document, if one was supplied.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_file_name: Option<String>,
    /// Like count.
    pub likes: u32,
    /// Dislike count.
    pub dislikes: u32,
    /// When the lesson was assembled.
    pub created_at: DateTime<Utc>,
    /// Non-fatal issues noticed while generating (e.g. placeholder panels).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl Lesson {
    /// Returns every `[text](url)` link in the explanation, in order.
    #[must_use]
    pub fn explanation_links(&self) -> Vec<ExplanationLink> {
        extract_links(&self.explanation)
    }

    /// Returns `true` if the explanation attributes content to the uploaded document.
    #[must_use]
    pub fn attributes_source(&self) -> bool {
        attributes_document(&self.explanation)
    }

    /// Splits the explanation into its paragraphs.
    #[must_use]
    pub fn paragraphs(&self) -> Vec<&str> {
        self.explanation
            .split("\n\n")
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .collect()
    }

    /// Returns `true` if the lesson was generated without warnings.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }
}

/// Returns `true` if `text` contains the document-attribution phrase.
pub(crate) fn attributes_document(text: &str) -> bool {
    text.to_lowercase()
        .contains(&DOCUMENT_ATTRIBUTION_PHRASE.to_lowercase())
}

/// Extracts Markdown links from text.
///
/// Image links (`![alt](src)`) are skipped.
pub(crate) fn extract_links(content: &str) -> Vec<ExplanationLink> {
    use regex::Regex;

    // Captures link text in group 2 and target in group 3; group 1 catches a
    // leading '!' so image syntax can be skipped.
    let Ok(re) = Regex::new(r"(!?)\[([^\]]+)\]\(([^)\s]+)\)") else {
        return Vec::new();
    };

    re.captures_iter(content)
        .filter(|cap| cap.get(1).map_or(true, |m| m.as_str().is_empty()))
        .filter_map(|cap| {
            let text = cap.get(2)?.as_str().to_string();
            let url = cap.get(3)?.as_str().to_string();
            Some(ExplanationLink { text, url })
        })
        .collect()
}
