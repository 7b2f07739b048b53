//! Animal Academy lesson pipeline
//!
//! Builds prompts, calls the hosted text and image models, validates the
//! structured response, and assembles illustrated lessons.

pub mod config;
pub mod contract;
pub mod error;
pub mod feedback;
pub mod gemini;
pub mod generation_state;
pub mod generator;
pub mod lesson;
pub mod model;
pub mod panels;
pub mod prompt;
pub mod source_document;

pub use config::{Config, LanguageNames, PanelFailurePolicy};
pub use contract::{has_image_prefix, parse_lesson_script, response_schema, LessonScript, REQUIRED_FIELDS};
pub use error::{AcademyError, CallStage, ErrorClass, Result, TransportErrorKind};
pub use feedback::{Comment, LessonFeedback, Rating, ANONYMOUS_AUTHOR};
pub use gemini::GeminiClient;
pub use generation_state::{GenerationState, GenerationStatus, StateTransition};
pub use generator::LessonGenerator;
pub use lesson::{
    ComicPanel, ComicPanelScript, ExplanationLink, FlashcardEntry, GroundingMode, Language, Lesson,
    LessonRequest, MindMapNode, Quote,
};
pub use model::{GeneratedImage, ImageModel, ImageRequest, ModelError, TextModel, TextRequest};
pub use panels::PLACEHOLDER_IMAGE_URI;
pub use prompt::{
    build_prompt, LessonPrompt, PanelRange, DOCUMENT_ATTRIBUTION_PHRASE, IMAGE_PROMPT_PREFIX,
    MAX_PANELS, MIN_PANELS,
};
pub use source_document::{DocumentFormat, SourceDocument, MAX_DOCUMENT_SIZE};

pub use secrecy::SecretString;
