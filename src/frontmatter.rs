//! YAML front-matter parsing, merging and serialization.
//!
//! A front-matter block starts at byte 0 with a `---` line and ends at the
//! next `---` line. Everything after the block is the note body and is never
//! touched by the operations here.

use std::ops::Range;

use serde_yaml::{Mapping, Value};
use thiserror::Error;

const OPENING: &str = "---\n";
const CLOSING: &str = "\n---\n";
const CLOSING_AT_EOF: &str = "\n---";

/// Errors raised while reading or updating front-matter.
#[derive(Debug, Error)]
pub enum FrontMatterError {
    /// The block body is not valid YAML
    #[error("Invalid front-matter YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// The block body parsed, but not to a key/value mapping
    #[error("Front-matter must be a key/value mapping, found {found}")]
    NotAMapping { found: &'static str },

    /// The key exists but does not hold a list
    #[error("Front-matter key '{key}' holds {found}, expected a list")]
    TypeMismatch { key: String, found: &'static str },
}

/// A parsed front-matter block.
#[derive(Debug, Clone, PartialEq)]
pub struct FrontMatter {
    pub data: Mapping,
    /// YAML text between the delimiter lines.
    pub raw: String,
    /// Byte range of the whole block, delimiters included.
    pub span: Range<usize>,
}

/// Front-matter operations on whole document texts.
pub struct FrontMatterStore;

impl FrontMatterStore {
    /// Finds and parses the front-matter block at the start of `document`.
    ///
    /// Returns `Ok(None)` when the document has no block. An empty block
    /// yields an empty mapping.
    ///
    /// # Errors
    ///
    /// `FrontMatterError::Yaml` for invalid YAML and
    /// `FrontMatterError::NotAMapping` when the YAML is not a mapping.
    pub fn parse(document: &str) -> Result<Option<FrontMatter>, FrontMatterError> {
        let Some((body, span)) = locate(document) else {
            return Ok(None);
        };

        if body.trim().is_empty() {
            return Ok(Some(FrontMatter {
                data: Mapping::new(),
                raw: body.to_string(),
                span,
            }));
        }

        let data = match serde_yaml::from_str::<Value>(body)? {
            Value::Null => Mapping::new(),
            Value::Mapping(mapping) => mapping,
            other => {
                return Err(FrontMatterError::NotAMapping {
                    found: value_kind(&other),
                });
            }
        };

        Ok(Some(FrontMatter {
            data,
            raw: body.to_string(),
            span,
        }))
    }

    /// Appends `values` to the list stored under `key`.
    ///
    /// A missing or null key is set to `values`. Existing entries are kept and
    /// nothing is deduplicated.
    ///
    /// # Errors
    ///
    /// `FrontMatterError::TypeMismatch` if the key holds anything but a list.
    pub fn merge_key(
        data: &Mapping,
        key: &str,
        values: &[String],
    ) -> Result<Mapping, FrontMatterError> {
        let mut merged = data.clone();
        let new_items = values.iter().cloned().map(Value::String);

        match merged.get_mut(key) {
            None | Some(Value::Null) => {
                merged.insert(Value::String(key.to_string()), Value::Sequence(new_items.collect()));
            }
            Some(Value::Sequence(existing)) => existing.extend(new_items),
            Some(other) => {
                return Err(FrontMatterError::TypeMismatch {
                    key: key.to_string(),
                    found: value_kind(other),
                });
            }
        }

        Ok(merged)
    }

    /// Renders a mapping as block-style YAML without a trailing newline.
    ///
    /// Lists of scalars are written one item per line, indented by two spaces:
    ///
    /// ```text
    /// tags:
    ///   - foo
    ///   - bar
    /// ```
    ///
    /// # Errors
    ///
    /// Returns `FrontMatterError::Yaml` if a value cannot be rendered.
    pub fn serialize(data: &Mapping) -> Result<String, FrontMatterError> {
        let mut lines = Vec::with_capacity(data.len());

        for (key, value) in data {
            match value {
                Value::Sequence(items) if !items.is_empty() && items.iter().all(is_inline_scalar) => {
                    let mut entry = format!("{}:", render(key)?);
                    for item in items {
                        entry.push_str("\n  - ");
                        entry.push_str(&render(item)?);
                    }
                    lines.push(entry);
                }
                _ => {
                    let mut single = Mapping::new();
                    single.insert(key.clone(), value.clone());
                    lines.push(render(&Value::Mapping(single))?);
                }
            }
        }

        Ok(lines.join("\n"))
    }

    /// Merges `values` under `key` into the document's front-matter.
    ///
    /// An existing block is replaced in place; otherwise a new block is
    /// prepended followed by one blank line. Bytes outside the block are
    /// returned unchanged.
    ///
    /// # Errors
    ///
    /// Propagates parse, merge and serialization errors. The input is never
    /// partially modified since the result is a new string.
    pub fn apply_to_document(
        document: &str,
        key: &str,
        values: &[String],
    ) -> Result<String, FrontMatterError> {
        match Self::parse(document)? {
            Some(front_matter) => {
                let merged = Self::merge_key(&front_matter.data, key, values)?;
                let yaml = Self::serialize(&merged)?;
                Ok(format!(
                    "{}---\n{yaml}\n---\n{}",
                    &document[..front_matter.span.start],
                    &document[front_matter.span.end..]
                ))
            }
            None => {
                let merged = Self::merge_key(&Mapping::new(), key, values)?;
                let yaml = Self::serialize(&merged)?;
                Ok(format!("---\n{yaml}\n---\n\n{document}"))
            }
        }
    }
}

/// Returns the block body and the span of the whole block.
fn locate(document: &str) -> Option<(&str, Range<usize>)> {
    if !document.starts_with(OPENING) {
        return None;
    }

    // Search from the opening newline so an empty body (`---\n---\n`) matches.
    let search_from = OPENING.len() - 1;
    let rest = &document[search_from..];

    if let Some(pos) = rest.find(CLOSING) {
        let body_end = (search_from + pos).max(OPENING.len());
        let block_end = search_from + pos + CLOSING.len();
        return Some((&document[OPENING.len()..body_end], 0..block_end));
    }

    if rest.ends_with(CLOSING_AT_EOF) {
        let body_end = (document.len() - CLOSING_AT_EOF.len()).max(OPENING.len());
        return Some((&document[OPENING.len()..body_end], 0..document.len()));
    }

    None
}

fn render(value: &Value) -> Result<String, FrontMatterError> {
    Ok(serde_yaml::to_string(value)?.trim_end().to_string())
}

/// Scalars that render on a single line and can sit after `  - `.
fn is_inline_scalar(value: &Value) -> bool {
    match value {
        Value::Null | Value::Bool(_) | Value::Number(_) => true,
        Value::String(s) => !s.contains('\n'),
        _ => false,
    }
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Sequence(_) => "a list",
        Value::Mapping(_) => "a mapping",
        Value::Tagged(_) => "a tagged value",
    }
}
