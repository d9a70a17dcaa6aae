//! Tag suggestion and formatting.
//!
//! This module provides the two halves of turning note text into tags:
//! `TagSuggester` asks the completion API for raw tags through a forced
//! function call, and `TagFormatter` converts raw tags into the configured
//! case convention.
//!
//! # Examples
//!
//! ```no_run
//! use std::sync::Arc;
//! use autotag::CaseConvention;
//! use autotag::autotagger::{TagFormatter, TagSuggesterBuilder};
//! use autotag::openai::OpenAiClientBuilder;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = OpenAiClientBuilder::new().build()?;
//! let suggester = TagSuggesterBuilder::new(Arc::new(client)).max_tags(3).build();
//!
//! let raw = suggester.suggest(
//!     "Roasted vegetables with tahini dressing",
//!     "sk-...",
//!     "gpt-3.5-turbo-1106",
//!     0.5,
//! )?;
//!
//! // ["autotag/roasted-vegetables", ...]
//! let tags = TagFormatter::format_all(&raw, CaseConvention::KebabCase, Some("autotag/"));
//! println!("{tags:?}");
//! # Ok(())
//! # }
//! ```

mod formatter;
mod suggester;

pub use formatter::TagFormatter;
pub use suggester::{
    MAX_RESPONSE_TOKENS, MAX_TAGS, MIN_TAGS, SUGGEST_FUNCTION_NAME, TagSuggester,
    TagSuggesterBuilder, build_request, extract_tags,
};
