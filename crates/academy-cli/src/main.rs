//! Animal Academy CLI
//!
//! Generates an illustrated lesson for a topic and writes it to disk.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use academy_core::{
    AcademyError, Config, GeminiClient, GroundingMode, Language, Lesson, LessonGenerator,
    LessonRequest, SourceDocument,
};
use academy_export::{export_lesson, ExportFormat};
use clap::{Parser, ValueEnum};
use tracing_subscriber::EnvFilter;

/// Animal Academy - illustrated lesson generator
///
/// Asks the hosted model for an explanation, a quote, a reading list, a
/// comic, flashcards and a mind map about TOPIC, then exports the lesson.
#[derive(Parser, Debug)]
#[command(name = "academy")]
#[command(version, about, long_about = None)]
struct Args {
    /// The concept to explain
    #[arg(value_name = "TOPIC")]
    topic: String,

    /// Text or Markdown file to ground the lesson in
    #[arg(short, long, value_name = "FILE")]
    document: Option<String>,

    /// How strictly the lesson follows the document (primary or supplementary)
    #[arg(short, long, value_name = "MODE")]
    grounding: Option<String>,

    /// Lesson language (primary or secondary)
    #[arg(short, long, value_name = "LANGUAGE")]
    language: Option<String>,

    /// Path to configuration file (default: academy.json in current directory)
    #[arg(short, long, value_name = "FILE")]
    config: Option<String>,

    /// Output directory for exported lessons
    #[arg(short, long, value_name = "DIR")]
    output_dir: Option<String>,

    /// Export format
    #[arg(short, long, value_enum, default_value_t = FormatArg::Both)]
    format: FormatArg,

    /// Enable verbose output (sets log level to debug)
    #[arg(short, long)]
    verbose: bool,
}

/// Export formats selectable on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum FormatArg {
    Markdown,
    Json,
    Both,
}

impl FormatArg {
    fn formats(self) -> Vec<ExportFormat> {
        match self {
            Self::Markdown => vec![ExportFormat::Markdown],
            Self::Json => vec![ExportFormat::Json],
            Self::Both => vec![ExportFormat::Markdown, ExportFormat::Json],
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if args.verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    tracing::debug!(config = ?args.config, "Config file");
    tracing::debug!(output_dir = ?args.output_dir, "Output directory");

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::from(1)
        }
    }
}

/// Runs one lesson generation from the command line.
async fn run(args: Args) -> anyhow::Result<()> {
    if args.topic.trim().is_empty() {
        return Err(AcademyError::InvalidTopic.into());
    }

    let mut config = load_config(args.config.as_deref())?;
    apply_overrides(&mut config, &args)?;
    config.validate()?;

    let document = args
        .document
        .as_deref()
        .map(SourceDocument::load)
        .transpose()?;

    let mut request = LessonRequest::new(args.topic.trim())
        .with_language(config.language)
        .with_grounding(config.grounding);
    if let Some(document) = document {
        println!(
            "Grounding in '{}' ({} characters, {} mode)",
            document.name,
            document.char_count(),
            config.grounding
        );
        request = request.with_document(document);
    }

    let client = GeminiClient::from_config(&config)?;
    println!(
        "Generating lesson about '{}' in {} (text: {}, images: {})...",
        request.topic,
        config.language_name(request.language),
        client.text_model(),
        client.image_model()
    );

    let generator = LessonGenerator::new(client.clone(), client, config);
    let lesson = generator.generate_lesson(&request).await?;
    print_summary(&lesson);

    let output_dir = PathBuf::from(&generator.config().output_dir);
    let written = export_lesson(&lesson, &output_dir, &args.format.formats())?;

    println!();
    for path in &written {
        println!("Wrote {}", path.display());
    }

    Ok(())
}

/// Loads configuration from the specified path or default location.
fn load_config(config_path: Option<&str>) -> anyhow::Result<Config> {
    match config_path {
        Some(path_str) => {
            let path = Path::new(path_str);
            if !path.exists() {
                anyhow::bail!(
                    "Config file not found: '{}'\n\nSuggestion: Check the path or remove the --config flag to use defaults",
                    path.display()
                );
            }
            Config::load_from_file(path).map_err(|e| anyhow::anyhow!("{e}"))
        }
        None => Config::load().map_err(|e| anyhow::anyhow!("{e}")),
    }
}

/// Applies command-line overrides on top of the loaded configuration.
fn apply_overrides(config: &mut Config, args: &Args) -> anyhow::Result<()> {
    if let Some(ref language) = args.language {
        config.language = Language::from_str_case_insensitive(language).ok_or_else(|| {
            anyhow::anyhow!(
                "invalid language '{language}': expected one of 'primary', 'secondary'"
            )
        })?;
    }
    if let Some(ref grounding) = args.grounding {
        config.grounding = GroundingMode::from_str_case_insensitive(grounding).ok_or_else(|| {
            anyhow::anyhow!(
                "invalid grounding mode '{grounding}': expected one of 'primary', 'supplementary'"
            )
        })?;
    }
    if let Some(ref output_dir) = args.output_dir {
        config.output_dir.clone_from(output_dir);
    }
    Ok(())
}

/// Prints a summary of the generated lesson.
fn print_summary(lesson: &Lesson) {
    println!();
    println!("Lesson: {}", lesson.topic);
    println!("  Id: {}", lesson.id);
    println!("  Quote: \"{}\" ({})", lesson.quote.text, lesson.quote.author);
    println!("  Paragraphs: {}", lesson.paragraphs().len());
    println!("  Links: {}", lesson.explanation_links().len());
    println!("  Comic panels: {}", lesson.comic_panels.len());
    println!("  Flashcards: {}", lesson.flashcards.len());
    println!("  Mind map nodes: {}", lesson.mind_map.node_count());
    println!("  Recommended reading: {}", lesson.recommended_reading.len());
    if let Some(ref name) = lesson.source_file_name {
        let attributed = if lesson.attributes_source() { "yes" } else { "no" };
        println!("  Source: {name} (attributed: {attributed})");
    }

    if !lesson.warnings.is_empty() {
        println!();
        println!("Warnings:");
        for warning in &lesson.warnings {
            println!("  - {warning}");
        }
    }
}
