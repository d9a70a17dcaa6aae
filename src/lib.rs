pub mod autotagger;
pub mod config;
pub mod cost;
pub mod document;
pub mod frontmatter;
pub mod logger;
pub mod models;
pub mod openai;
pub mod pipeline;
pub mod tui;
pub mod utils;

pub use config::Settings;
pub use cost::{CostEstimate, CostEstimator, CostPreview};
pub use document::{DocumentLocks, HostDocument, NoteBuffer, NoteFile};
pub use frontmatter::{FrontMatter, FrontMatterError, FrontMatterStore};
pub use logger::{DiagnosticLog, LogLevel, Logger};
pub use models::{CaseConvention, InsertLocation, MODEL_CATALOG, ModelDescriptor, ModelFeature};
pub use pipeline::{AutoApprove, AutoTagError, Outcome, Prompter, TagInserter};
