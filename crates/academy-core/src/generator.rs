//! The lesson generation pipeline.
//!
//! [`LessonGenerator`] turns a [`LessonRequest`] into a [`Lesson`] with one
//! text call followed by one concurrent image call per comic panel. Every
//! failure is returned as a single [`AcademyError`]; no partial lesson is
//! ever produced and nothing is retried.

use futures::future::{join_all, try_join_all};
use secrecy::{ExposeSecret, SecretString};
use uuid::Uuid;

use crate::config::{Config, PanelFailurePolicy};
use crate::contract::{parse_lesson_script, response_schema, LessonScript};
use crate::error::{AcademyError, CallStage, Result};
use crate::generation_state::{GenerationState, GenerationStatus};
use crate::lesson::{attributes_document, ComicPanel, ComicPanelScript, GroundingMode, Lesson, LessonRequest};
use crate::model::{ImageModel, TextModel, TextRequest};
use crate::panels::{placeholder_panel, render_panel};
use crate::prompt::{build_prompt, LessonPrompt};

/// Generates lessons using a text model and an image model.
pub struct LessonGenerator<T, I> {
    text_model: T,
    image_model: I,
    config: Config,
    credential: Option<SecretString>,
}

impl<T, I> std::fmt::Debug for LessonGenerator<T, I> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LessonGenerator")
            .field("config", &self.config)
            .field("has_credential", &self.credential.is_some())
            .finish_non_exhaustive()
    }
}

impl<T: TextModel, I: ImageModel> LessonGenerator<T, I> {
    /// Creates a generator.
    ///
    /// The API key is read from the environment variable named by
    /// `config.api_key_env` on every call unless [`Self::with_credential`]
    /// supplies one.
    #[must_use]
    pub const fn new(text_model: T, image_model: I, config: Config) -> Self {
        Self {
            text_model,
            image_model,
            config,
            credential: None,
        }
    }

    /// Uses an explicit API key instead of the environment.
    #[must_use]
    pub fn with_credential(mut self, credential: SecretString) -> Self {
        self.credential = Some(credential);
        self
    }

    /// The configuration this generator runs with.
    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.config
    }

    /// Generates a lesson.
    ///
    /// # Errors
    ///
    /// Returns the first failure of the pipeline, classified by
    /// [`AcademyError::class`]. No lesson is returned on failure.
    pub async fn generate_lesson(&self, request: &LessonRequest) -> Result<Lesson> {
        self.generate_lesson_traced(request).await.0
    }

    /// Generates a lesson and also returns the state-machine trace.
    pub async fn generate_lesson_traced(
        &self,
        request: &LessonRequest,
    ) -> (Result<Lesson>, GenerationState) {
        let mut state = GenerationState::new();
        let result = self.run(request, &mut state).await;

        match &result {
            Ok(lesson) => tracing::info!(
                lesson_id = %lesson.id,
                panels = lesson.comic_panels.len(),
                warnings = lesson.warnings.len(),
                "Lesson generated"
            ),
            Err(e) => {
                tracing::error!(class = ?e.class(), error = %e, "Lesson generation failed");
                state.fail(e.to_string());
            }
        }

        (result, state)
    }

    async fn run(&self, request: &LessonRequest, state: &mut GenerationState) -> Result<Lesson> {
        request.validate()?;
        let credential = self.resolve_credential()?;

        tracing::info!(
            topic = %request.topic.trim(),
            language = %request.language,
            document = request.source_document.as_ref().map(|d| d.name.as_str()),
            "Generating lesson"
        );

        let mut warnings = Vec::new();
        let prompt = build_prompt(
            request,
            self.config.language_name(request.language),
            self.config.max_document_chars,
        );
        if prompt.document_truncated {
            if let Some(doc) = &request.source_document {
                warn(
                    &mut warnings,
                    format!(
                        "Document '{}' was truncated to {} characters",
                        doc.name, self.config.max_document_chars
                    ),
                );
            }
        }

        state.transition(GenerationStatus::RequestingText)?;
        let raw = self.request_text(&credential, &prompt).await?;

        state.transition(GenerationStatus::ParsingText)?;
        let script = parse_lesson_script(&raw)?;
        check_soft_contract(request, &prompt, &script, &mut warnings);

        state.transition(GenerationStatus::RequestingImages)?;
        let comic_panels = self
            .render_panels(&credential, &script.comic_script, &mut warnings)
            .await?;

        state.transition(GenerationStatus::Assembling)?;
        let lesson = assemble(request, script, comic_panels, warnings);

        state.transition(GenerationStatus::Done)?;
        Ok(lesson)
    }

    /// Resolves the API key before any call is made.
    fn resolve_credential(&self) -> Result<SecretString> {
        if let Some(credential) = &self.credential {
            if !credential.expose_secret().trim().is_empty() {
                return Ok(SecretString::from(credential.expose_secret().to_string()));
            }
        }

        match std::env::var(&self.config.api_key_env) {
            Ok(value) if !value.trim().is_empty() => Ok(SecretString::from(value)),
            _ => Err(AcademyError::missing_credential(&self.config.api_key_env)),
        }
    }

    async fn request_text(&self, credential: &SecretString, prompt: &LessonPrompt) -> Result<String> {
        let request = TextRequest::structured(
            prompt.system_instruction.clone(),
            prompt.instruction.clone(),
            response_schema(),
        );

        tracing::debug!(
            system_chars = request.system_instruction.len(),
            prompt_chars = request.prompt.len(),
            panel_range = %prompt.panel_range,
            "Requesting lesson text"
        );

        let raw = self
            .text_model
            .generate_text(credential, &request)
            .await
            .map_err(|e| AcademyError::transport(CallStage::Text, e.kind, e.message))?;

        tracing::debug!(response_chars = raw.len(), "Lesson text received");
        Ok(raw)
    }

    async fn render_panels(
        &self,
        credential: &SecretString,
        scripts: &[ComicPanelScript],
        warnings: &mut Vec<String>,
    ) -> Result<Vec<ComicPanel>> {
        let calls = scripts
            .iter()
            .enumerate()
            .map(|(index, script)| render_panel(&self.image_model, credential, index, script));

        match self.config.panel_failure_policy {
            PanelFailurePolicy::FailLesson => try_join_all(calls).await,
            PanelFailurePolicy::Placeholder => {
                let results = join_all(calls).await;
                let panels = results
                    .into_iter()
                    .zip(scripts)
                    .enumerate()
                    .map(|(index, (result, script))| match result {
                        Ok(panel) => panel,
                        Err(e) => {
                            let detail = match e {
                                AcademyError::ImageGeneration { message, .. } => message,
                                other => other.to_string(),
                            };
                            warn(
                                warnings,
                                format!("Panel {} image unavailable: {detail}", index + 1),
                            );
                            placeholder_panel(script)
                        }
                    })
                    .collect();
                Ok(panels)
            }
        }
    }
}

/// Records issues that do not void the lesson.
fn check_soft_contract(
    request: &LessonRequest,
    prompt: &LessonPrompt,
    script: &LessonScript,
    warnings: &mut Vec<String>,
) {
    let panels = script.comic_script.len();
    if !prompt.panel_range.contains(panels) {
        warn(
            warnings,
            format!(
                "Comic has {panels} panels; {} were requested",
                prompt.panel_range
            ),
        );
    }

    if let Some(doc) = &request.source_document {
        if request.grounding == GroundingMode::Primary && !attributes_document(&script.explanation) {
            warn(
                warnings,
                format!("Explanation does not attribute any content to '{}'", doc.name),
            );
        }
    }
}

fn warn(warnings: &mut Vec<String>, message: String) {
    tracing::warn!("{message}");
    warnings.push(message);
}

fn assemble(
    request: &LessonRequest,
    script: LessonScript,
    comic_panels: Vec<ComicPanel>,
    warnings: Vec<String>,
) -> Lesson {
    Lesson {
        id: Uuid::new_v4(),
        topic: request.topic.trim().to_string(),
        language: request.language,
        quote: script.quote,
        explanation: script.explanation,
        recommended_reading: script.recommended_reading,
        comic_panels,
        flashcards: script.flashcards,
        mind_map: script.mind_map,
        source_file_name: request.source_document.as_ref().map(|d| d.name.clone()),
        likes: 0,
        dislikes: 0,
        created_at: chrono::Utc::now(),
        warnings,
    }
}
