//! Integration tests for the lesson pipeline.
//!
//! These tests drive `LessonGenerator` end to end with scripted text and
//! image models, covering panel ordering, response validation, image
//! failures, credential handling, and export of the finished lesson.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use academy_core::{
    AcademyError, Config, ErrorClass, GeneratedImage, GenerationStatus, GroundingMode,
    ImageModel, ImageRequest, LessonGenerator, LessonRequest, ModelError, PanelFailurePolicy,
    SourceDocument, TextModel, TextRequest, TransportErrorKind, IMAGE_PROMPT_PREFIX,
    PLACEHOLDER_IMAGE_URI, REQUIRED_FIELDS,
};
use academy_export::{export_lesson, ExportFormat};
use secrecy::SecretString;
use serde_json::{json, Value};

/// Environment variable that no test ever sets.
const UNSET_KEY_ENV: &str = "ACADEMY_INTEGRATION_KEY_THAT_IS_NEVER_SET";

// ============================================================================
// Scripted models
// ============================================================================

/// Text model that answers every call with the same raw text.
struct ScriptedText {
    response: Result<String, ModelError>,
    calls: Arc<AtomicUsize>,
    last_request: Arc<Mutex<Option<TextRequest>>>,
}

impl ScriptedText {
    fn json(value: &Value) -> Self {
        Self::raw(Ok(value.to_string()))
    }

    fn raw(response: Result<String, ModelError>) -> Self {
        Self {
            response,
            calls: Arc::new(AtomicUsize::new(0)),
            last_request: Arc::new(Mutex::new(None)),
        }
    }
}

impl TextModel for ScriptedText {
    async fn generate_text(
        &self,
        _credential: &SecretString,
        request: &TextRequest,
    ) -> Result<String, ModelError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_request.lock().expect("lock poisoned") = Some(request.clone());
        self.response.clone()
    }
}

/// Image model that answers `IMG<n>` for a prompt ending in `scene <n>`.
///
/// Later panels answer sooner, so completion order is the reverse of
/// script order. Prompts containing `empty` get zero images.
struct ScriptedImages {
    calls: Arc<AtomicUsize>,
    in_flight: Arc<AtomicUsize>,
    max_in_flight: Arc<AtomicUsize>,
}

impl ScriptedImages {
    fn new() -> Self {
        Self {
            calls: Arc::new(AtomicUsize::new(0)),
            in_flight: Arc::new(AtomicUsize::new(0)),
            max_in_flight: Arc::new(AtomicUsize::new(0)),
        }
    }
}

impl ImageModel for ScriptedImages {
    async fn generate_images(
        &self,
        _credential: &SecretString,
        request: &ImageRequest,
    ) -> Result<Vec<GeneratedImage>, ModelError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        let n: u64 = request
            .prompt
            .rsplit(' ')
            .next()
            .and_then(|s| s.parse().ok())
            .unwrap_or(0);
        tokio::time::sleep(Duration::from_millis(10 * (12 - n.min(12)))).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if request.prompt.contains("empty") {
            return Ok(vec![]);
        }
        Ok(vec![GeneratedImage {
            mime_type: "image/png".to_string(),
            base64_data: format!("IMG{n}"),
        }])
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// A well-formed lesson response with `panels` comic panels.
fn lesson_json(panels: usize, explanation: &str) -> Value {
    let script: Vec<Value> = (0..panels)
        .map(|i| {
            json!({
                "narrative": format!("Professor Fox explains step {i}."),
                "image_prompt": format!("{IMAGE_PROMPT_PREFIX} a fox pointing at a leaf, scene {i}")
            })
        })
        .collect();

    json!({
        "quote": {
            "text": "Look deep into nature, and then you will understand everything better.",
            "author": "Albert Einstein"
        },
        "explanation": explanation,
        "recommended_reading": [
            "Raven, P. H., Evert, R. F., & Eichhorn, S. E. (2012). Biology of Plants. W. H. Freeman."
        ],
        "comic_script": script,
        "flashcards": [
            { "term": "Chlorophyll", "definition": "The **green pigment** that absorbs light." },
            { "term": "Stomata", "definition": "Pores that let **carbon dioxide** in." }
        ],
        "mind_map": {
            "title": "Photosynthesis",
            "children": [
                { "title": "Inputs", "children": [{ "title": "Light" }, { "title": "Water" }] },
                { "title": "Outputs", "children": [{ "title": "Glucose" }, { "title": "Oxygen" }] }
            ]
        }
    })
}

const EXPLANATION: &str = "Plants turn **light** into chemical energy.\n\nThe work happens inside [chloroplasts](https://en.wikipedia.org/wiki/Chloroplast).";

fn generator(
    text: ScriptedText,
    images: ScriptedImages,
    config: Config,
) -> LessonGenerator<ScriptedText, ScriptedImages> {
    LessonGenerator::new(text, images, config)
        .with_credential(SecretString::from("integration-key"))
}

// ============================================================================
// Successful generation
// ============================================================================

/// Panel i of the lesson corresponds to script entry i, whatever order the
/// image calls complete in.
#[tokio::test]
async fn test_panels_match_script_length_and_order() {
    let images = ScriptedImages::new();
    let max_in_flight = Arc::clone(&images.max_in_flight);
    let gen = generator(
        ScriptedText::json(&lesson_json(8, EXPLANATION)),
        images,
        Config::default(),
    );

    let lesson = gen
        .generate_lesson(&LessonRequest::new("Photosynthesis"))
        .await
        .expect("lesson should generate");

    assert_eq!(lesson.comic_panels.len(), 8);
    for (i, panel) in lesson.comic_panels.iter().enumerate() {
        assert_eq!(panel.narrative, format!("Professor Fox explains step {i}."));
        assert_eq!(panel.image_url, format!("data:image/png;base64,IMG{i}"));
    }

    // All panel calls were in flight together.
    assert!(max_in_flight.load(Ordering::SeqCst) > 1);
}

/// Topic "Photosynthesis", no document, primary language.
#[tokio::test]
async fn test_photosynthesis_without_document() {
    let text = ScriptedText::json(&lesson_json(5, EXPLANATION));
    let last_request = Arc::clone(&text.last_request);
    let gen = generator(text, ScriptedImages::new(), Config::default());

    let lesson = gen
        .generate_lesson(&LessonRequest::new("Photosynthesis"))
        .await
        .expect("lesson should generate");

    assert!(!lesson.explanation.trim().is_empty());
    assert!(!lesson.quote.author.trim().is_empty());
    assert!((4..=10).contains(&lesson.comic_panels.len()));
    assert!(!lesson.flashcards.is_empty());
    assert!(lesson.source_file_name.is_none());
    assert_eq!(lesson.likes, 0);
    assert_eq!(lesson.dislikes, 0);
    assert!(lesson.warnings.is_empty());
    assert_eq!(lesson.paragraphs().len(), 2);
    assert_eq!(lesson.explanation_links().len(), 1);
    assert_eq!(lesson.mind_map.node_count(), 7);

    let request = last_request
        .lock()
        .expect("lock poisoned")
        .clone()
        .expect("text call should be recorded");
    assert!(request.prompt.contains("Photosynthesis"));
    assert!(request.prompt.contains("English"));
    assert!(!request.prompt.contains("BEGIN DOCUMENT"));
    assert_eq!(request.response_mime_type, "application/json");
    assert!(request.system_instruction.contains(IMAGE_PROMPT_PREFIX));
}

/// Topic "Photosynthesis" grounded in notes.txt.
#[tokio::test]
async fn test_photosynthesis_with_document() {
    let explanation = "According to the uploaded document, photosynthesis occurs in chloroplasts.\n\nThose **chloroplasts** hold the pigment [chlorophyll](https://en.wikipedia.org/wiki/Chlorophyll).";
    let text = ScriptedText::json(&lesson_json(6, explanation));
    let last_request = Arc::clone(&text.last_request);
    let gen = generator(text, ScriptedImages::new(), Config::default());

    let request = LessonRequest::new("Photosynthesis").with_document(SourceDocument::new(
        "notes.txt",
        "Photosynthesis occurs in chloroplasts.",
    ));
    let lesson = gen
        .generate_lesson(&request)
        .await
        .expect("lesson should generate");

    assert_eq!(lesson.source_file_name.as_deref(), Some("notes.txt"));
    assert!(lesson.attributes_source());
    assert!(lesson.warnings.is_empty());

    let sent = last_request
        .lock()
        .expect("lock poisoned")
        .clone()
        .expect("text call should be recorded");
    assert!(sent.prompt.contains("Photosynthesis occurs in chloroplasts."));
    assert!(sent.prompt.contains("According to the uploaded document,"));
    assert!(sent.prompt.contains("notes.txt"));
}

/// A grounded lesson whose explanation never cites the document still
/// succeeds, with a warning.
#[tokio::test]
async fn test_missing_attribution_is_a_warning() {
    let gen = generator(
        ScriptedText::json(&lesson_json(6, EXPLANATION)),
        ScriptedImages::new(),
        Config::default(),
    );
    let request = LessonRequest::new("Photosynthesis")
        .with_document(SourceDocument::new("notes.txt", "Photosynthesis occurs in chloroplasts."));

    let lesson = gen
        .generate_lesson(&request)
        .await
        .expect("lesson should generate");

    assert!(!lesson.attributes_source());
    assert_eq!(lesson.warnings.len(), 1);
    assert!(lesson.warnings[0].contains("notes.txt"));
}

/// Supplementary grounding does not require attribution.
#[tokio::test]
async fn test_supplementary_grounding_needs_no_attribution() {
    let gen = generator(
        ScriptedText::json(&lesson_json(5, EXPLANATION)),
        ScriptedImages::new(),
        Config::default(),
    );
    let request = LessonRequest::new("Photosynthesis")
        .with_document(SourceDocument::new("notes.txt", "Photosynthesis occurs in chloroplasts."))
        .with_grounding(GroundingMode::Supplementary);

    let lesson = gen
        .generate_lesson(&request)
        .await
        .expect("lesson should generate");

    assert_eq!(lesson.source_file_name.as_deref(), Some("notes.txt"));
    assert!(lesson.warnings.is_empty());
}

/// Identical inputs never produce colliding lesson ids.
#[tokio::test]
async fn test_lesson_ids_are_unique() {
    let gen = generator(
        ScriptedText::json(&lesson_json(4, EXPLANATION)),
        ScriptedImages::new(),
        Config::default(),
    );
    let request = LessonRequest::new("Photosynthesis");

    let mut ids = std::collections::HashSet::new();
    for _ in 0..5 {
        let lesson = gen
            .generate_lesson(&request)
            .await
            .expect("lesson should generate");
        assert!(ids.insert(lesson.id), "duplicate lesson id {}", lesson.id);
    }
}

/// The trace of a successful run visits every stage once, in order.
#[tokio::test]
async fn test_successful_trace() {
    let gen = generator(
        ScriptedText::json(&lesson_json(4, EXPLANATION)),
        ScriptedImages::new(),
        Config::default(),
    );

    let (result, state) = gen
        .generate_lesson_traced(&LessonRequest::new("Photosynthesis"))
        .await;

    assert!(result.is_ok());
    assert_eq!(
        state.path(),
        vec![
            GenerationStatus::Idle,
            GenerationStatus::RequestingText,
            GenerationStatus::ParsingText,
            GenerationStatus::RequestingImages,
            GenerationStatus::Assembling,
            GenerationStatus::Done,
        ]
    );
}

// ============================================================================
// Response validation
// ============================================================================

/// Each required field, removed on its own, fails the lesson.
#[tokio::test]
async fn test_each_missing_field_is_invalid_structure() {
    for field in REQUIRED_FIELDS {
        let mut body = lesson_json(4, EXPLANATION);
        body.as_object_mut()
            .expect("lesson json is an object")
            .remove(field);

        let images = ScriptedImages::new();
        let image_calls = Arc::clone(&images.calls);
        let gen = generator(ScriptedText::json(&body), images, Config::default());

        let err = gen
            .generate_lesson(&LessonRequest::new("Photosynthesis"))
            .await
            .expect_err("missing field must fail");

        assert_eq!(err.class(), ErrorClass::InvalidStructure, "field {field}");
        match err {
            AcademyError::InvalidStructure { field: reported, .. } => {
                assert_eq!(reported, field);
            }
            other => panic!("expected InvalidStructure, got {other:?}"),
        }
        assert_eq!(image_calls.load(Ordering::SeqCst), 0, "field {field}");
    }
}

#[tokio::test]
async fn test_non_json_is_malformed_response() {
    let gen = generator(
        ScriptedText::raw(Ok("Once upon a time, plants ate sunlight.".to_string())),
        ScriptedImages::new(),
        Config::default(),
    );

    let err = gen
        .generate_lesson(&LessonRequest::new("Photosynthesis"))
        .await
        .expect_err("prose must fail");

    assert_eq!(err.class(), ErrorClass::MalformedResponse);
}

#[tokio::test]
async fn test_fenced_json_is_accepted() {
    let fenced = format!("```json\n{}\n```", lesson_json(4, EXPLANATION));
    let gen = generator(
        ScriptedText::raw(Ok(fenced)),
        ScriptedImages::new(),
        Config::default(),
    );

    let lesson = gen
        .generate_lesson(&LessonRequest::new("Photosynthesis"))
        .await
        .expect("fenced json should parse");
    assert_eq!(lesson.comic_panels.len(), 4);
}

#[tokio::test]
async fn test_image_prompt_without_prefix_is_rejected() {
    let mut body = lesson_json(4, EXPLANATION);
    body["comic_script"][2]["image_prompt"] = json!("a photo of a fox, scene 2");
    let gen = generator(ScriptedText::json(&body), ScriptedImages::new(), Config::default());

    let err = gen
        .generate_lesson(&LessonRequest::new("Photosynthesis"))
        .await
        .expect_err("unprefixed prompt must fail");

    match err {
        AcademyError::InvalidStructure { field, .. } => {
            assert_eq!(field, "comic_script[2].image_prompt");
        }
        other => panic!("expected InvalidStructure, got {other:?}"),
    }
}

#[tokio::test]
async fn test_text_refusal_is_transport_error() {
    let gen = generator(
        ScriptedText::raw(Err(ModelError::new(
            TransportErrorKind::Refusal,
            "prompt was blocked: SAFETY",
        ))),
        ScriptedImages::new(),
        Config::default(),
    );

    let err = gen
        .generate_lesson(&LessonRequest::new("Photosynthesis"))
        .await
        .expect_err("refusal must fail");

    assert_eq!(err.class(), ErrorClass::Transport);
    assert!(!err.is_transient());
    assert!(err.to_string().contains("SAFETY"));
}

// ============================================================================
// Image failures
// ============================================================================

/// One empty image result fails the whole lesson, the same way every time.
#[tokio::test]
async fn test_zero_images_fails_lesson_repeatably() {
    let mut body = lesson_json(5, EXPLANATION);
    body["comic_script"][3]["image_prompt"] =
        json!(format!("{IMAGE_PROMPT_PREFIX} an empty frame, scene 3"));

    for _ in 0..3 {
        let gen = generator(ScriptedText::json(&body), ScriptedImages::new(), Config::default());

        let err = gen
            .generate_lesson(&LessonRequest::new("Photosynthesis"))
            .await
            .expect_err("empty image must fail");

        assert_eq!(err.class(), ErrorClass::ImageGeneration);
        assert!(matches!(err, AcademyError::ImageGeneration { panel: 4, .. }));
    }
}

/// Under the placeholder policy the lesson survives with a warning.
#[tokio::test]
async fn test_placeholder_policy_keeps_lesson() {
    let mut body = lesson_json(5, EXPLANATION);
    body["comic_script"][1]["image_prompt"] =
        json!(format!("{IMAGE_PROMPT_PREFIX} an empty frame, scene 1"));
    let config = Config {
        panel_failure_policy: PanelFailurePolicy::Placeholder,
        ..Config::default()
    };
    let gen = generator(ScriptedText::json(&body), ScriptedImages::new(), config);

    let lesson = gen
        .generate_lesson(&LessonRequest::new("Photosynthesis"))
        .await
        .expect("placeholder policy should keep the lesson");

    assert_eq!(lesson.comic_panels.len(), 5);
    assert_eq!(lesson.comic_panels[1].image_url, PLACEHOLDER_IMAGE_URI);
    assert_eq!(lesson.comic_panels[1].narrative, "Professor Fox explains step 1.");
    assert_eq!(lesson.comic_panels[2].image_url, "data:image/png;base64,IMG2");
    assert_eq!(lesson.warnings.len(), 1);
    assert!(lesson.warnings[0].starts_with("Panel 2 image unavailable"));
}

// ============================================================================
// Credential handling
// ============================================================================

/// With no credential anywhere, no model call is made.
#[tokio::test]
async fn test_missing_credential_makes_zero_calls() {
    let text = ScriptedText::json(&lesson_json(4, EXPLANATION));
    let images = ScriptedImages::new();
    let text_calls = Arc::clone(&text.calls);
    let image_calls = Arc::clone(&images.calls);
    let config = Config {
        api_key_env: UNSET_KEY_ENV.to_string(),
        ..Config::default()
    };
    let gen = LessonGenerator::new(text, images, config);

    let err = gen
        .generate_lesson(&LessonRequest::new("Photosynthesis"))
        .await
        .expect_err("missing credential must fail");

    assert_eq!(err.class(), ErrorClass::Configuration);
    assert!(matches!(err, AcademyError::MissingCredential { .. }));
    assert_eq!(text_calls.load(Ordering::SeqCst), 0);
    assert_eq!(image_calls.load(Ordering::SeqCst), 0);
}

/// The credential can come from the configured environment variable.
#[tokio::test]
async fn test_credential_from_environment() {
    let env_var = "ACADEMY_INTEGRATION_KEY_FROM_ENV";
    std::env::set_var(env_var, "env-key");
    let config = Config {
        api_key_env: env_var.to_string(),
        ..Config::default()
    };
    let gen = LessonGenerator::new(
        ScriptedText::json(&lesson_json(4, EXPLANATION)),
        ScriptedImages::new(),
        config,
    );

    let lesson = gen.generate_lesson(&LessonRequest::new("Photosynthesis")).await;
    assert!(lesson.is_ok());
}

// ============================================================================
// Export
// ============================================================================

#[tokio::test]
async fn test_generated_lesson_exports() {
    let gen = generator(
        ScriptedText::json(&lesson_json(4, EXPLANATION)),
        ScriptedImages::new(),
        Config::default(),
    );
    let lesson = gen
        .generate_lesson(&LessonRequest::new("Photosynthesis"))
        .await
        .expect("lesson should generate");

    let dir = std::env::temp_dir().join(format!("academy_pipeline_export_{}", lesson.id));
    let paths = export_lesson(&lesson, &dir, &[ExportFormat::Markdown, ExportFormat::Json])
        .expect("export should succeed");

    let markdown = std::fs::read_to_string(&paths[0]).expect("markdown written");
    assert!(markdown.starts_with("# Photosynthesis"));
    assert!(markdown.contains("![Panel 4](data:image/png;base64,IMG3)"));
    assert!(markdown.contains("| Chlorophyll | The **green pigment** that absorbs light. |"));

    let json = std::fs::read_to_string(&paths[1]).expect("json written");
    let parsed: academy_core::Lesson = serde_json::from_str(&json).expect("json reads back");
    assert_eq!(parsed, lesson);

    std::fs::remove_dir_all(&dir).ok();
}
