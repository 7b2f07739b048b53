//! Prompt construction for the text-generation call.
//!
//! Everything here is pure string building. The topic is assumed to have
//! been validated by the caller.

use serde::{Deserialize, Serialize};

use crate::lesson::{GroundingMode, LessonRequest};

/// Every image prompt must begin with this phrase.
pub const IMAGE_PROMPT_PREFIX: &str = "clean, minimalist, educational vector illustration of";

/// Separator between explanation paragraphs.
pub const PARAGRAPH_BREAK: &str = "\n\n";

/// Emphasis marker wrapped around key terms in flashcard definitions.
pub const BOLD_MARKER: &str = "**";

/// Sentence opener the model must use when drawing on the uploaded document.
pub const DOCUMENT_ATTRIBUTION_PHRASE: &str = "According to the uploaded document,";

/// Appended to a document excerpt that was cut to fit the prompt.
pub const TRUNCATION_MARKER: &str = "[... document truncated ...]";

/// Lower bound on comic panels accepted from any response.
pub const MIN_PANELS: usize = 4;

/// Upper bound on comic panels accepted from any response.
pub const MAX_PANELS: usize = 10;

/// Inclusive bounds on the number of comic panels requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PanelRange {
    /// Fewest panels the model may write.
    pub min: usize,
    /// Most panels the model may write.
    pub max: usize,
}

impl PanelRange {
    /// Panel bounds for a request.
    ///
    /// A document used as primary source gets a longer strip.
    #[must_use]
    pub const fn for_request(has_document: bool, grounding: GroundingMode) -> Self {
        match (has_document, grounding) {
            (true, GroundingMode::Primary) => Self {
                min: 6,
                max: MAX_PANELS,
            },
            _ => Self {
                min: MIN_PANELS,
                max: 8,
            },
        }
    }

    /// Returns `true` if `count` lies within the range.
    #[must_use]
    pub const fn contains(&self, count: usize) -> bool {
        count >= self.min && count <= self.max
    }
}

impl std::fmt::Display for PanelRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.min, self.max)
    }
}

/// The assembled prompt for one text-generation call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LessonPrompt {
    /// Fixed persona and output contract.
    pub system_instruction: String,
    /// Per-request instruction (topic, language, grounding).
    pub instruction: String,
    /// Panel bounds communicated to the model.
    pub panel_range: PanelRange,
    /// Whether the document excerpt was cut.
    pub document_truncated: bool,
}

/// Builds the prompt for a lesson request.
///
/// `language_name` is the display name of the target language (e.g.
/// "English"); `max_document_chars` bounds how much document text is embedded.
#[must_use]
pub fn build_prompt(
    request: &LessonRequest,
    language_name: &str,
    max_document_chars: usize,
) -> LessonPrompt {
    let document = request.source_document.as_ref();
    let panel_range = PanelRange::for_request(document.is_some(), request.grounding);

    let mut instruction = String::new();
    let mut document_truncated = false;

    if let Some(doc) = document {
        let (excerpt, truncated) = doc.excerpt(max_document_chars);
        document_truncated = truncated;

        instruction.push_str(&grounding_instruction(request.grounding));
        instruction.push_str(PARAGRAPH_BREAK);
        instruction.push_str(&format!(
            "--- BEGIN DOCUMENT \"{}\" ---\n{}",
            doc.name,
            excerpt.trim_end()
        ));
        if truncated {
            instruction.push('\n');
            instruction.push_str(TRUNCATION_MARKER);
        }
        instruction.push_str("\n--- END DOCUMENT ---");
        instruction.push_str(PARAGRAPH_BREAK);
    }

    instruction.push_str(&format!(
        "Please create a complete lesson about: {}.{PARAGRAPH_BREAK}\
         Write every text field in {language_name}, except the image prompts, which must \
         always be written in English.",
        request.topic.trim()
    ));

    LessonPrompt {
        system_instruction: system_instruction(panel_range),
        instruction,
        panel_range,
        document_truncated,
    }
}

fn grounding_instruction(grounding: GroundingMode) -> String {
    match grounding {
        GroundingMode::Primary => format!(
            "The user has uploaded the document below. Use it as the PRIMARY source for the \
             explanation. Every time you use information from it, attribute it explicitly \
             with a sentence that begins \"{DOCUMENT_ATTRIBUTION_PHRASE}\". Only add outside \
             knowledge where the document is silent."
        ),
        GroundingMode::Supplementary => "The user has uploaded the document below as a \
             SUPPLEMENTARY source. Build the explanation from your broader knowledge and \
             quote relevant passages of the document as Markdown blockquotes (lines starting \
             with \"> \") where they strengthen the lesson."
            .to_string(),
    }
}

fn system_instruction(panels: PanelRange) -> String {
    format!(
        "You are the wise Headmaster of the Animal Academy, an institution where animal experts \
explain complex concepts to learners of all ages. Your goal is to be clear, educational, and engaging.
For any given topic, you must produce a single JSON object with the properties \"quote\", \
\"explanation\", \"recommended_reading\", \"comic_script\", \"flashcards\" and \"mind_map\".

1. quote: an inspirational quote related to the topic, with \"text\" and \"author\". It must \
come from a well-known person and must NOT be taken from any uploaded document.

2. explanation: an encyclopedic overview of the topic in several paragraphs. Separate \
paragraphs with a blank line. Cover a one-sentence summary, the origin and history, the core \
meaning, the key people who created or popularized it, and related concepts. Turn key terms \
into Markdown links of the form [term](https://...) using fully-qualified URLs, and mark \
important words with {BOLD_MARKER}bold{BOLD_MARKER}.

3. recommended_reading: an array of citations for further study, each formatted as \
\"Author, A. (Year). Title. Publisher.\"

4. comic_script: an array of {min} to {max} panels that demonstrate a deeper aspect of the \
topic. Choose the number by the topic's complexity. The characters are always anthropomorphic \
animals dressed as academics (gowns, mortarboards, spectacles). Each panel has:
   a. \"narrative\": a short caption under 15 words, with no markup.
   b. \"image_prompt\": a detailed scene description for an image generator. It MUST start \
with '{IMAGE_PROMPT_PREFIX}...'.

5. flashcards: an array of study cards with \"term\" and \"definition\". Wrap the key words \
of each definition in {BOLD_MARKER}double asterisks{BOLD_MARKER}.

6. mind_map: a tree with a \"title\" and \"children\" summarizing the topic, at most three \
levels deep.

The final output MUST be a single JSON object that strictly follows the provided schema. \
The tone should be educational, clear, and charming.",
        min = panels.min,
        max = panels.max,
    )
}
