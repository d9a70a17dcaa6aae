use std::io::{self, IsTerminal};
use std::ops::Range;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use autotag::autotagger::TagFormatter;
use autotag::config::AUTOTAG_PREFIX;
use autotag::openai::{OpenAiClientBuilder, OpenAiError};
use autotag::tui::TerminalPrompter;
use autotag::{
    AutoApprove, AutoTagError, CaseConvention, CostEstimator, CostPreview, DiagnosticLog,
    HostDocument, Logger, MODEL_CATALOG, ModelDescriptor, ModelFeature, NoteFile, Outcome,
    Prompter, Settings, TagInserter,
};
use clap::{Parser, Subcommand};
use thiserror::Error;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// autotag - suggest and insert tags into markdown notes
#[derive(Parser)]
#[command(name = "autotag")]
#[command(about = "Suggests tags for markdown notes with an OpenAI model")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Available commands
#[derive(Subcommand)]
enum Commands {
    /// Suggest tags for a note and insert them
    Tag(TagCommand),
    /// Show the token count and cost of tagging a note
    Estimate(EstimateCommand),
    /// Format tags with a case convention
    Format(FormatCommand),
    /// List the supported models
    Models(ModelsCommand),
}

/// Tag a note
#[derive(Parser)]
struct TagCommand {
    /// Markdown note to tag
    #[arg(value_name = "PATH")]
    path: PathBuf,

    /// Where to insert tags: frontmatter, after-selection or before-selection
    #[arg(short, long, default_value = "frontmatter")]
    location: String,

    /// Byte range to use as the selection
    #[arg(long, value_name = "START..END", conflicts_with = "select")]
    selection: Option<String>,

    /// Select the first occurrence of this text
    #[arg(long, value_name = "TEXT")]
    select: Option<String>,

    /// Insert fixed demo tags instead of calling the API
    #[arg(long, conflicts_with = "no_demo")]
    demo: bool,

    /// Call the API even if demo mode is configured
    #[arg(long)]
    no_demo: bool,

    /// Model id from `autotag models`
    #[arg(short, long)]
    model: Option<String>,

    /// Sampling temperature (0-2)
    #[arg(short, long)]
    temperature: Option<f32>,

    /// Tag case convention, e.g. kebab-case or snake_case
    #[arg(short, long)]
    format: Option<String>,

    /// Maximum number of tags to suggest (1-10)
    #[arg(long)]
    max_tags: Option<usize>,

    /// Skip the cost and review dialogs
    #[arg(short, long)]
    yes: bool,
}

/// Estimate the cost of tagging a note
#[derive(Parser)]
struct EstimateCommand {
    /// Markdown note to estimate
    #[arg(value_name = "PATH")]
    path: PathBuf,

    /// Model id from `autotag models`
    #[arg(short, long)]
    model: Option<String>,
}

/// Format tags
#[derive(Parser)]
struct FormatCommand {
    /// Tags to format
    #[arg(value_name = "TAG", required = true)]
    tags: Vec<String>,

    /// Case convention
    #[arg(short, long, default_value = "kebab-case")]
    format: String,

    /// Prepend the autotag/ namespace
    #[arg(short, long)]
    prefix: bool,
}

/// List models
#[derive(Parser)]
struct ModelsCommand {
    /// Print the catalog as JSON
    #[arg(long)]
    json: bool,
}

/// Invalid command-line input.
#[derive(Debug, Error)]
#[error("{0}")]
struct UsageError(String);

fn main() {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();

    let result = match &cli.command {
        Commands::Tag(cmd) => handle_tag(cmd),
        Commands::Estimate(cmd) => handle_estimate(cmd),
        Commands::Format(cmd) => handle_format(cmd),
        Commands::Models(cmd) => handle_models(cmd),
    };

    if let Err(e) = result {
        let exit_code = if is_user_error(&e) { 1 } else { 2 };
        eprintln!("Error: {e:#}");
        std::process::exit(exit_code);
    }
}

/// Initializes `tracing` output, filtered by `RUST_LOG` (default `autotag=info`).
fn init_tracing() {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| "autotag=info".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_writer(io::stderr))
        .init();
}

/// Determines if an error is a user error (vs internal error).
///
/// User errors include bad flags, a missing selection, missing credentials,
/// and invalid input. Everything else (I/O, network, API) is internal.
fn is_user_error(error: &anyhow::Error) -> bool {
    error.chain().any(|cause| {
        if cause.is::<UsageError>() {
            return true;
        }
        if let Some(e) = cause.downcast_ref::<AutoTagError>() {
            return e.is_user_error();
        }
        if let Some(e) = cause.downcast_ref::<OpenAiError>() {
            return e.is_user_error();
        }
        false
    })
}

/// Handles the tag command: loads the note, runs the pipeline, reports the outcome.
fn handle_tag(cmd: &TagCommand) -> Result<()> {
    let mut settings = Settings::from_env();
    apply_overrides(&mut settings, cmd)?;

    let location = TagInserter::parse_location(&cmd.location)?;

    let mut note = NoteFile::open(&cmd.path)
        .with_context(|| format!("Failed to read note: {}", cmd.path.display()))?;
    if let Some(range) = &cmd.selection {
        note.select(parse_range(range)?)
            .map_err(|e| UsageError(e.to_string()))?;
    } else if let Some(text) = &cmd.select {
        note.select_text(text)
            .map_err(|e| UsageError(e.to_string()))?;
    }

    let logger = build_logger(&settings);

    let mut builder = OpenAiClientBuilder::new();
    if let Some(base_url) = &settings.base_url {
        builder = builder.base_url(base_url.clone());
    }
    let client = builder.build().context("Failed to create OpenAI client")?;

    let mut prompter = select_prompter(cmd.yes);
    let inserter = TagInserter::new(settings, Arc::new(client), logger);

    let outcome = inserter.run(&mut note, location, prompter.as_mut())?;
    println!("{}", describe_outcome(&outcome, note.path()));

    Ok(())
}

/// Applies command-line flags on top of the environment settings.
fn apply_overrides(settings: &mut Settings, cmd: &TagCommand) -> Result<()> {
    if cmd.demo {
        settings.demo_mode = true;
    }
    if cmd.no_demo {
        settings.demo_mode = false;
    }
    if let Some(model) = &cmd.model
        && !settings.set_model(model)
    {
        return Err(UsageError(format!(
            "Unknown model '{model}' (see `autotag models`)"
        ))
        .into());
    }
    if let Some(temperature) = cmd.temperature {
        settings.set_temperature(temperature);
    }
    if let Some(format) = &cmd.format {
        settings.tags_format = parse_convention(format)?;
    }
    if let Some(max_tags) = cmd.max_tags {
        settings.set_tags_to_insert(max_tags);
    }
    if cmd.yes {
        settings.show_cost_preview = false;
        settings.show_review_dialog = false;
    }
    Ok(())
}

/// Builds the diagnostic logger, falling back to `tracing` only if the log
/// file location cannot be prepared.
fn build_logger(settings: &Settings) -> Arc<dyn Logger> {
    if !settings.write_to_log_file {
        return Arc::new(DiagnosticLog::tracing_only());
    }

    let path = match &settings.log_file {
        Some(path) => Ok(path.clone()),
        None => autotag::utils::get_log_path(),
    };

    match path.and_then(DiagnosticLog::with_file) {
        Ok(logger) => Arc::new(logger),
        Err(e) => {
            warn!(error = %e, "diagnostic log file unavailable, logging to stderr only");
            Arc::new(DiagnosticLog::tracing_only())
        }
    }
}

/// Uses the terminal dialogs when attached to a terminal.
fn select_prompter(skip_dialogs: bool) -> Box<dyn Prompter> {
    if skip_dialogs {
        return Box::new(AutoApprove);
    }
    if io::stdin().is_terminal() && io::stdout().is_terminal() {
        Box::new(TerminalPrompter)
    } else {
        info!("not attached to a terminal, skipping dialogs");
        Box::new(AutoApprove)
    }
}

fn describe_outcome(outcome: &Outcome, path: &Path) -> String {
    match outcome {
        Outcome::Cancelled => "Cancelled, nothing was sent".to_string(),
        Outcome::NothingAccepted => format!("No tags accepted, {} unchanged", path.display()),
        Outcome::Inserted { tags, location } => format!(
            "Inserted {} tags into {} ({location}): {}",
            tags.len(),
            path.display(),
            tags.join(", ")
        ),
    }
}

/// Handles the estimate command by printing the cost preview for a note.
fn handle_estimate(cmd: &EstimateCommand) -> Result<()> {
    let model = match &cmd.model {
        Some(id) => ModelDescriptor::find(id)
            .ok_or_else(|| UsageError(format!("Unknown model '{id}' (see `autotag models`)")))?,
        None => Settings::from_env().model,
    };

    let note = NoteFile::open(&cmd.path)
        .with_context(|| format!("Failed to read note: {}", cmd.path.display()))?;

    let preview = CostPreview::new(&CostEstimator::new(), note.value(), model);
    println!("{preview}");
    Ok(())
}

/// Handles the format command by printing one formatted tag per line.
fn handle_format(cmd: &FormatCommand) -> Result<()> {
    let convention = parse_convention(&cmd.format)?;
    let prefix = cmd.prefix.then_some(AUTOTAG_PREFIX);

    for tag in TagFormatter::format_all(&cmd.tags, convention, prefix) {
        println!("{tag}");
    }
    Ok(())
}

fn parse_convention(name: &str) -> Result<CaseConvention> {
    CaseConvention::from_name(name).ok_or_else(|| {
        let known: Vec<&str> = CaseConvention::ALL.iter().map(|c| c.name()).collect();
        UsageError(format!(
            "Unknown tag format '{name}' (expected one of: {})",
            known.join(", ")
        ))
        .into()
    })
}

/// Parses a `START..END` byte range.
fn parse_range(input: &str) -> Result<Range<usize>> {
    let invalid = || UsageError(format!("Invalid selection '{input}', expected START..END"));

    let (start, end) = input.split_once("..").ok_or_else(invalid)?;
    let start: usize = start.trim().parse().map_err(|_| invalid())?;
    let end: usize = end.trim().parse().map_err(|_| invalid())?;
    if start > end {
        return Err(invalid().into());
    }
    Ok(start..end)
}

/// Handles the models command.
fn handle_models(cmd: &ModelsCommand) -> Result<()> {
    if cmd.json {
        let json = serde_json::to_string_pretty(MODEL_CATALOG)
            .context("Failed to serialize model catalog")?;
        println!("{json}");
    } else {
        print!("{}", render_models());
    }
    Ok(())
}

fn render_models() -> String {
    let default_id = ModelDescriptor::default_model().id;
    MODEL_CATALOG
        .iter()
        .map(|model| {
            let marker = if model.id == default_id { " (default)" } else { "" };
            let calling = if model.supports(ModelFeature::FunctionCalling) {
                "  function-calling"
            } else {
                ""
            };
            format!(
                "{:<20} {:>6} tokens  ${:.4}/1K in  ${:.4}/1K out{calling}{marker}\n",
                model.id, model.context_window, model.input_cost_1k, model.output_cost_1k
            )
        })
        .collect()
}
