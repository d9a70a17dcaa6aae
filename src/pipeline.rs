//! Tag insertion pipeline.
//!
//! One run takes a document from its current text to a version with accepted
//! tags merged in:
//!
//! ```text
//! Idle -> TextAcquired -> [CostPreview] -> Suggesting -> Suggested
//!      -> Formatting -> [UserReview] -> Merging -> Done
//! ```
//!
//! Any stage may end in `Failed`. The document is written at most once, in
//! `Merging`, while holding the document's lock.

use std::fmt;
use std::io;
use std::ops::Range;
use std::sync::{Arc, PoisonError};

use serde_json::json;
use thiserror::Error;
use tracing::debug;

use crate::autotagger::{TagFormatter, TagSuggester, TagSuggesterBuilder};
use crate::config::Settings;
use crate::cost::{CostEstimator, CostPreview};
use crate::document::{DocumentLocks, HostDocument};
use crate::frontmatter::{FrontMatterError, FrontMatterStore};
use crate::logger::Logger;
use crate::models::InsertLocation;
use crate::openai::{OpenAiClientTrait, OpenAiError};

/// Tags inserted in demo mode instead of calling the API.
pub const DEMO_TAGS: [&str; 3] = ["recipe", "food", "healthy"];

/// Errors that end a pipeline run.
#[derive(Debug, Error)]
pub enum AutoTagError {
    /// Inline insertion needs a selection
    #[error("Please select some text first")]
    NoSelection,

    /// Outside demo mode an API key is required
    #[error("OpenAI API key is missing: set OPENAI_API_KEY or enable demo mode")]
    MissingCredentials,

    #[error("Unknown insert location '{0}' (expected frontmatter, after-selection or before-selection)")]
    UnknownLocation(String),

    /// The document changed so the captured selection no longer fits
    #[error("The selection no longer matches the document")]
    StaleSelection,

    #[error("Tag suggestion failed: {0}")]
    Suggest(#[from] OpenAiError),

    #[error(transparent)]
    FrontMatter(#[from] FrontMatterError),

    #[error("Failed to update document: {0}")]
    Document(#[source] io::Error),

    #[error("Dialog failed: {0}")]
    Prompt(#[source] io::Error),
}

impl AutoTagError {
    /// Whether the error stems from user input or configuration.
    pub fn is_user_error(&self) -> bool {
        match self {
            Self::NoSelection | Self::MissingCredentials | Self::UnknownLocation(_) => true,
            Self::Suggest(e) => e.is_user_error(),
            _ => false,
        }
    }
}

/// How a run ended when it did not fail.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// The cost preview was declined. Nothing was sent or written.
    Cancelled,
    /// No tags were left to insert. The document is untouched.
    NothingAccepted,
    Inserted {
        tags: Vec<String>,
        location: InsertLocation,
    },
}

/// Pipeline stages, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Idle,
    TextAcquired,
    CostPreview,
    Suggesting,
    Suggested,
    Formatting,
    UserReview,
    Merging,
    Done,
    Failed,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::TextAcquired => "text-acquired",
            Self::CostPreview => "cost-preview",
            Self::Suggesting => "suggesting",
            Self::Suggested => "suggested",
            Self::Formatting => "formatting",
            Self::UserReview => "user-review",
            Self::Merging => "merging",
            Self::Done => "done",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// User interaction points of the pipeline.
pub trait Prompter {
    /// Shows the cost estimate. `Ok(false)` cancels the run.
    fn confirm_cost(&mut self, preview: &CostPreview) -> io::Result<bool>;

    /// Lets the user pick which tags to keep. Returns the accepted tags in
    /// their original order.
    fn review_tags(&mut self, tags: &[String]) -> io::Result<Vec<String>>;
}

/// Prompter that confirms every cost and accepts every tag.
#[derive(Debug, Clone, Copy, Default)]
pub struct AutoApprove;

impl Prompter for AutoApprove {
    fn confirm_cost(&mut self, _preview: &CostPreview) -> io::Result<bool> {
        Ok(true)
    }

    fn review_tags(&mut self, tags: &[String]) -> io::Result<Vec<String>> {
        Ok(tags.to_vec())
    }
}

struct StageTracker<'a> {
    current: Stage,
    logger: &'a dyn Logger,
}

impl StageTracker<'_> {
    fn advance(&mut self, next: Stage) {
        debug!(from = %self.current, to = %next, "pipeline stage");
        self.logger
            .debug(&format!("stage {} -> {}", self.current, next), None);
        self.current = next;
    }
}

/// Runs the tag insertion pipeline against host documents.
pub struct TagInserter {
    settings: Settings,
    suggester: TagSuggester,
    estimator: CostEstimator,
    logger: Arc<dyn Logger>,
    locks: DocumentLocks,
}

impl TagInserter {
    /// Creates an inserter using the process-wide document locks.
    pub fn new(
        settings: Settings,
        client: Arc<dyn OpenAiClientTrait>,
        logger: Arc<dyn Logger>,
    ) -> Self {
        let suggester = TagSuggesterBuilder::new(client)
            .max_tags(settings.tags_to_insert)
            .logger(Arc::clone(&logger))
            .build();

        Self {
            settings,
            suggester,
            estimator: CostEstimator::new(),
            logger,
            locks: DocumentLocks::global().clone(),
        }
    }

    /// Uses `locks` instead of the process-wide registry.
    #[must_use]
    pub fn with_locks(mut self, locks: DocumentLocks) -> Self {
        self.locks = locks;
        self
    }

    #[must_use]
    pub fn with_estimator(mut self, estimator: CostEstimator) -> Self {
        self.estimator = estimator;
        self
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Parses an insert location name.
    ///
    /// # Errors
    ///
    /// `AutoTagError::UnknownLocation` for unrecognized names.
    pub fn parse_location(name: &str) -> Result<InsertLocation, AutoTagError> {
        InsertLocation::from_name(name).ok_or_else(|| AutoTagError::UnknownLocation(name.to_string()))
    }

    /// Runs the pipeline with a location given by name.
    ///
    /// # Errors
    ///
    /// See [`TagInserter::run`]; additionally `AutoTagError::UnknownLocation`.
    pub fn run_named(
        &self,
        document: &mut dyn HostDocument,
        location: &str,
        prompter: &mut dyn Prompter,
    ) -> Result<Outcome, AutoTagError> {
        match Self::parse_location(location) {
            Ok(location) => self.run(document, location, prompter),
            Err(e) => {
                self.report_failure(&e);
                Err(e)
            }
        }
    }

    /// Runs the pipeline once.
    ///
    /// On error the document is left exactly as it was.
    ///
    /// # Errors
    ///
    /// Returns the `AutoTagError` of the stage that failed. Every failure is
    /// also written to the diagnostic log.
    pub fn run(
        &self,
        document: &mut dyn HostDocument,
        location: InsertLocation,
        prompter: &mut dyn Prompter,
    ) -> Result<Outcome, AutoTagError> {
        let mut tracker = StageTracker {
            current: Stage::Idle,
            logger: self.logger.as_ref(),
        };

        let result = self.execute(document, location, prompter, &mut tracker);

        match &result {
            Ok(Outcome::Cancelled) => tracker.advance(Stage::Idle),
            Ok(_) => tracker.advance(Stage::Done),
            Err(e) => {
                tracker.advance(Stage::Failed);
                self.report_failure(e);
            }
        }

        result
    }

    fn report_failure(&self, error: &AutoTagError) {
        self.logger.error(
            "tag insertion failed",
            Some(&json!({ "error": error.to_string() })),
        );
    }

    fn execute(
        &self,
        document: &mut dyn HostDocument,
        location: InsertLocation,
        prompter: &mut dyn Prompter,
        tracker: &mut StageTracker<'_>,
    ) -> Result<Outcome, AutoTagError> {
        let settings = &self.settings;
        let initial_cursor = document.cursor();
        let snapshot = document.value().to_string();

        let selection = document
            .selected_text()
            .filter(|text| !text.trim().is_empty())
            .map(str::to_string)
            .zip(document.selection());

        let (text, selection) = match selection {
            Some((text, range)) => {
                self.logger.debug(
                    "using selected text",
                    Some(&json!({ "length": text.chars().count() })),
                );
                (text, Some(range))
            }
            None if !location.requires_selection() => {
                let text = document.value().to_string();
                self.logger.debug(
                    "using full note contents",
                    Some(&json!({ "length": text.chars().count() })),
                );
                (text, None)
            }
            None => return Err(AutoTagError::NoSelection),
        };
        tracker.advance(Stage::TextAcquired);

        if !settings.demo_mode && settings.api_key.trim().is_empty() {
            return Err(AutoTagError::MissingCredentials);
        }

        if settings.show_cost_preview {
            tracker.advance(Stage::CostPreview);
            let preview = CostPreview::new(&self.estimator, &text, settings.model);
            self.logger.debug(
                "cost preview",
                Some(&json!({
                    "model": settings.model.id,
                    "tokens": preview.estimate.token_count,
                    "cost": preview.estimate.cost,
                })),
            );
            if !prompter
                .confirm_cost(&preview)
                .map_err(AutoTagError::Prompt)?
            {
                self.logger.log("cancelled at cost preview", None);
                return Ok(Outcome::Cancelled);
            }
        }

        tracker.advance(Stage::Suggesting);
        let raw_tags = if settings.demo_mode {
            DEMO_TAGS.iter().map(|tag| tag.to_string()).collect()
        } else {
            self.suggester.suggest(
                &text,
                &settings.api_key,
                settings.model.id,
                settings.temperature,
            )?
        };
        tracker.advance(Stage::Suggested);

        tracker.advance(Stage::Formatting);
        let formatted =
            TagFormatter::format_all(&raw_tags, settings.tags_format, settings.tag_prefix());
        self.logger
            .log("suggested tags", Some(&json!({ "tags": formatted })));

        let accepted = if settings.show_review_dialog {
            tracker.advance(Stage::UserReview);
            prompter
                .review_tags(&formatted)
                .map_err(AutoTagError::Prompt)?
        } else {
            formatted
        };

        if accepted.is_empty() {
            self.logger.log("no tags accepted, document unchanged", None);
            return Ok(Outcome::NothingAccepted);
        }

        tracker.advance(Stage::Merging);
        self.merge(document, location, selection, &snapshot, &accepted)?;

        document.set_cursor(initial_cursor);
        self.logger.log(
            &format!(
                "Inserted {} tags ({location}) [{}]",
                accepted.len(),
                hashtags(&accepted, ", ")
            ),
            None,
        );

        Ok(Outcome::Inserted {
            tags: accepted,
            location,
        })
    }

    /// Computes the new text under the document lock and writes it once.
    ///
    /// Inline locations need the reloaded text to equal `snapshot`, the text
    /// the selection was taken from.
    fn merge(
        &self,
        document: &mut dyn HostDocument,
        location: InsertLocation,
        selection: Option<Range<usize>>,
        snapshot: &str,
        tags: &[String],
    ) -> Result<(), AutoTagError> {
        let lock = self.locks.lock_for(&document.document_id());
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);

        document.reload().map_err(AutoTagError::Document)?;

        let updated = match location {
            InsertLocation::FrontMatter => FrontMatterStore::apply_to_document(
                document.value(),
                self.settings.frontmatter_key(),
                tags,
            )?,
            InsertLocation::AfterSelection => {
                let range = unchanged_selection(document.value(), snapshot, selection)?;
                insert_at(document.value(), range.end, &format!(" {}", hashtags(tags, " ")))?
            }
            InsertLocation::BeforeSelection => {
                let range = unchanged_selection(document.value(), snapshot, selection)?;
                insert_at(document.value(), range.start, &format!("{} ", hashtags(tags, " ")))?
            }
        };

        document.set_value(updated).map_err(AutoTagError::Document)
    }
}

/// Returns the captured selection if the document still reads as `snapshot`.
fn unchanged_selection(
    current: &str,
    snapshot: &str,
    selection: Option<Range<usize>>,
) -> Result<Range<usize>, AutoTagError> {
    let range = selection.ok_or(AutoTagError::NoSelection)?;
    if current != snapshot {
        return Err(AutoTagError::StaleSelection);
    }
    Ok(range)
}

fn hashtags(tags: &[String], separator: &str) -> String {
    tags.iter()
        .map(|tag| format!("#{tag}"))
        .collect::<Vec<_>>()
        .join(separator)
}

fn insert_at(text: &str, offset: usize, insertion: &str) -> Result<String, AutoTagError> {
    if !text.is_char_boundary(offset) {
        return Err(AutoTagError::StaleSelection);
    }

    let mut updated = String::with_capacity(text.len() + insertion.len());
    updated.push_str(&text[..offset]);
    updated.push_str(insertion);
    updated.push_str(&text[offset..]);
    Ok(updated)
}
