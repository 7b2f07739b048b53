//! Structured response contract for the text-generation call.
//!
//! [`response_schema`] is sent with the request so the model is constrained
//! to conforming JSON. [`parse_lesson_script`] then re-checks the returned
//! text, because the constraint is advisory and the model output untrusted.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::error::{AcademyError, Result};
use crate::lesson::{ComicPanelScript, FlashcardEntry, MindMapNode, Quote};
use crate::prompt::{IMAGE_PROMPT_PREFIX, MAX_PANELS, MIN_PANELS};

/// Top-level fields every response must carry, in schema order.
pub const REQUIRED_FIELDS: [&str; 6] = [
    "quote",
    "explanation",
    "recommended_reading",
    "comic_script",
    "flashcards",
    "mind_map",
];

/// Mind map levels described by the schema.
const MIND_MAP_DEPTH: usize = 3;

/// The validated, typed content of a text-model response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LessonScript {
    /// Opening quote.
    pub quote: Quote,
    /// Explanation text.
    pub explanation: String,
    /// Citation strings.
    pub recommended_reading: Vec<String>,
    /// Comic panels awaiting illustration.
    pub comic_script: Vec<ComicPanelScript>,
    /// Study flashcards.
    pub flashcards: Vec<FlashcardEntry>,
    /// Mind map root.
    pub mind_map: MindMapNode,
}

/// Returns the declarative response schema passed to the text model.
#[must_use]
pub fn response_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "quote": {
                "type": "OBJECT",
                "properties": {
                    "text": { "type": "STRING" },
                    "author": { "type": "STRING" }
                },
                "required": ["text", "author"]
            },
            "explanation": { "type": "STRING" },
            "recommended_reading": {
                "type": "ARRAY",
                "items": { "type": "STRING" }
            },
            "comic_script": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "narrative": { "type": "STRING" },
                        "image_prompt": { "type": "STRING" }
                    },
                    "required": ["narrative", "image_prompt"]
                }
            },
            "flashcards": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "term": { "type": "STRING" },
                        "definition": { "type": "STRING" }
                    },
                    "required": ["term", "definition"]
                }
            },
            "mind_map": mind_map_schema(MIND_MAP_DEPTH)
        },
        "required": REQUIRED_FIELDS
    })
}

fn mind_map_schema(levels: usize) -> Value {
    let mut properties = Map::new();
    properties.insert("title".to_string(), json!({ "type": "STRING" }));
    if levels > 1 {
        properties.insert(
            "children".to_string(),
            json!({ "type": "ARRAY", "items": mind_map_schema(levels - 1) }),
        );
    }
    json!({
        "type": "OBJECT",
        "properties": properties,
        "required": ["title"]
    })
}

/// Parses and validates raw text returned by the text model.
///
/// # Errors
///
/// Returns `AcademyError::MalformedResponse` if the text is not JSON.
/// Returns `AcademyError::InvalidStructure` if the JSON lacks a required
/// field, has a blank or mistyped value, a panel without the image prefix,
/// or more than the maximum number of panels.
pub fn parse_lesson_script(raw: &str) -> Result<LessonScript> {
    let body = strip_code_fence(raw);
    let value: Value =
        serde_json::from_str(body).map_err(|e| AcademyError::malformed_response(e.to_string()))?;

    let Value::Object(map) = &value else {
        return Err(AcademyError::invalid_structure(
            "response",
            "is not a JSON object",
        ));
    };

    for field in REQUIRED_FIELDS {
        match map.get(field) {
            None | Some(Value::Null) => {
                return Err(AcademyError::invalid_structure(field, "is missing"));
            }
            Some(v) if is_empty_value(v) => {
                return Err(AcademyError::invalid_structure(field, "is empty"));
            }
            Some(_) => {}
        }
    }

    let script: LessonScript = serde_json::from_value(value)
        .map_err(|e| AcademyError::invalid_structure("response", e.to_string()))?;
    script.validate()?;
    Ok(script)
}

impl LessonScript {
    /// Checks nested content the schema cannot express.
    ///
    /// # Errors
    ///
    /// Returns `AcademyError::InvalidStructure` naming the first offending field.
    pub fn validate(&self) -> Result<()> {
        require_text("quote.text", &self.quote.text)?;
        require_text("quote.author", &self.quote.author)?;
        require_text("explanation", &self.explanation)?;

        for (i, citation) in self.recommended_reading.iter().enumerate() {
            require_text(&format!("recommended_reading[{i}]"), citation)?;
        }

        let panels = self.comic_script.len();
        if panels < MIN_PANELS {
            return Err(AcademyError::invalid_structure(
                "comic_script",
                format!("has {panels} panels; at least {MIN_PANELS} are required"),
            ));
        }
        if panels > MAX_PANELS {
            return Err(AcademyError::invalid_structure(
                "comic_script",
                format!("has {panels} panels; at most {MAX_PANELS} are allowed"),
            ));
        }
        for (i, panel) in self.comic_script.iter().enumerate() {
            require_text(&format!("comic_script[{i}].narrative"), &panel.narrative)?;
            let field = format!("comic_script[{i}].image_prompt");
            require_text(&field, &panel.image_prompt)?;
            if !has_image_prefix(&panel.image_prompt) {
                return Err(AcademyError::invalid_structure(
                    field,
                    format!("does not start with '{IMAGE_PROMPT_PREFIX}'"),
                ));
            }
        }

        for (i, card) in self.flashcards.iter().enumerate() {
            require_text(&format!("flashcards[{i}].term"), &card.term)?;
            require_text(&format!("flashcards[{i}].definition"), &card.definition)?;
        }

        validate_mind_map(&self.mind_map, "mind_map")
    }
}

/// Returns `true` if an image prompt begins with the canonical prefix.
///
/// Leading whitespace is ignored and the comparison is ASCII case-insensitive.
#[must_use]
pub fn has_image_prefix(prompt: &str) -> bool {
    prompt
        .trim_start()
        .get(..IMAGE_PROMPT_PREFIX.len())
        .is_some_and(|head| head.eq_ignore_ascii_case(IMAGE_PROMPT_PREFIX))
}

fn validate_mind_map(node: &MindMapNode, path: &str) -> Result<()> {
    require_text(&format!("{path}.title"), &node.title)?;
    for (i, child) in node.children.iter().enumerate() {
        validate_mind_map(child, &format!("{path}.children[{i}]"))?;
    }
    Ok(())
}

fn require_text(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(AcademyError::invalid_structure(field, "is blank"));
    }
    Ok(())
}

fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::String(s) => s.trim().is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(fields) => fields.is_empty(),
        _ => false,
    }
}

/// Removes a surrounding Markdown code fence, if present.
fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the info string ("json") on the opening line. A fence written on
    // a single line has no line break, so only a leading word is dropped.
    let body = match rest.split_once('\n') {
        Some((_, body)) => body,
        None => rest.trim_start_matches(|c: char| c.is_ascii_alphabetic()),
    };
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}
