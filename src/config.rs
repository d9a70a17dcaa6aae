//! Runtime settings.
//!
//! `Settings` is a plain value handed to the pipeline. It is loaded from
//! environment variables (the binary loads `.env` first) and then adjusted by
//! command-line flags.

use std::path::PathBuf;

use tracing::warn;

use crate::autotagger::{MAX_TAGS, MIN_TAGS};
use crate::models::{CaseConvention, ModelDescriptor};

/// Key used for tags in front-matter by default.
pub const TAGS_KEY: &str = "tags";
/// Alternate front-matter key, keeps suggested tags apart from manual ones.
pub const AUTOTAGS_KEY: &str = "autotags";
/// Namespace prepended to every inserted tag when enabled.
pub const AUTOTAG_PREFIX: &str = "autotag/";

/// Tag insertion settings.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    /// Skip the API and insert a fixed list of tags.
    pub demo_mode: bool,
    pub api_key: String,
    pub model: &'static ModelDescriptor,
    pub temperature: f32,
    pub tags_format: CaseConvention,
    pub use_autotag_prefix: bool,
    pub use_frontmatter_autotags_key: bool,
    pub show_cost_preview: bool,
    pub show_review_dialog: bool,
    pub tags_to_insert: usize,
    pub write_to_log_file: bool,
    /// Log file location; `None` means the default under the data directory.
    pub log_file: Option<PathBuf>,
    pub base_url: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            demo_mode: true,
            api_key: String::new(),
            model: ModelDescriptor::default_model(),
            temperature: 0.5,
            tags_format: CaseConvention::default(),
            use_autotag_prefix: true,
            use_frontmatter_autotags_key: false,
            show_cost_preview: true,
            show_review_dialog: true,
            tags_to_insert: 3,
            write_to_log_file: true,
            log_file: None,
            base_url: None,
        }
    }
}

impl Settings {
    /// Loads settings from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Loads settings through `lookup`, falling back to defaults for unset or
    /// invalid values.
    ///
    /// # Environment Variables
    ///
    /// - `AUTOTAG_DEMO_MODE`
    /// - `OPENAI_API_KEY`, or `AUTOTAG_OPENAI_API_KEY`
    /// - `AUTOTAG_MODEL`
    /// - `AUTOTAG_TEMPERATURE`
    /// - `AUTOTAG_TAGS_FORMAT`
    /// - `AUTOTAG_USE_PREFIX`
    /// - `AUTOTAG_USE_AUTOTAGS_KEY`
    /// - `AUTOTAG_SHOW_COST_PREVIEW`
    /// - `AUTOTAG_SHOW_REVIEW_DIALOG`
    /// - `AUTOTAG_TAGS_TO_INSERT`
    /// - `AUTOTAG_WRITE_LOG_FILE`
    /// - `AUTOTAG_LOG_FILE`
    /// - `OPENAI_BASE_URL`
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |name: &str| {
            lookup(name)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };
        let flag = |name: &str, default: bool| match get(name) {
            Some(value) => parse_bool(&value).unwrap_or_else(|| {
                warn!(variable = name, value = %value, "expected a boolean, using default");
                default
            }),
            None => default,
        };

        let mut settings = Self::default();

        settings.demo_mode = flag("AUTOTAG_DEMO_MODE", settings.demo_mode);
        settings.api_key = get("OPENAI_API_KEY")
            .or_else(|| get("AUTOTAG_OPENAI_API_KEY"))
            .unwrap_or_default();

        if let Some(model) = get("AUTOTAG_MODEL") {
            settings.set_model(&model);
        }

        if let Some(temperature) = get("AUTOTAG_TEMPERATURE") {
            match temperature.parse::<f32>() {
                Ok(value) => settings.set_temperature(value),
                Err(_) => warn!(value = %temperature, "invalid AUTOTAG_TEMPERATURE, using default"),
            }
        }

        if let Some(format) = get("AUTOTAG_TAGS_FORMAT") {
            settings.tags_format = CaseConvention::from_name_or_default(&format);
        }

        settings.use_autotag_prefix = flag("AUTOTAG_USE_PREFIX", settings.use_autotag_prefix);
        settings.use_frontmatter_autotags_key =
            flag("AUTOTAG_USE_AUTOTAGS_KEY", settings.use_frontmatter_autotags_key);
        settings.show_cost_preview = flag("AUTOTAG_SHOW_COST_PREVIEW", settings.show_cost_preview);
        settings.show_review_dialog =
            flag("AUTOTAG_SHOW_REVIEW_DIALOG", settings.show_review_dialog);

        if let Some(count) = get("AUTOTAG_TAGS_TO_INSERT") {
            match count.parse::<usize>() {
                Ok(value) => settings.set_tags_to_insert(value),
                Err(_) => warn!(value = %count, "invalid AUTOTAG_TAGS_TO_INSERT, using default"),
            }
        }

        settings.write_to_log_file = flag("AUTOTAG_WRITE_LOG_FILE", settings.write_to_log_file);
        settings.log_file = get("AUTOTAG_LOG_FILE").map(PathBuf::from);
        settings.base_url = get("OPENAI_BASE_URL");

        settings
    }

    /// Selects a catalog model. Unknown ids keep the current model and
    /// return `false`.
    pub fn set_model(&mut self, id: &str) -> bool {
        match ModelDescriptor::find(id) {
            Some(model) => {
                self.model = model;
                true
            }
            None => {
                warn!(model = id, fallback = self.model.id, "unknown model, keeping current");
                false
            }
        }
    }

    /// Sets the sampling temperature, clamped to 0.0..=2.0.
    pub fn set_temperature(&mut self, temperature: f32) {
        self.temperature = if temperature.is_nan() {
            0.5
        } else {
            temperature.clamp(0.0, 2.0)
        };
    }

    /// Sets how many tags to request, clamped to 1..=10.
    pub fn set_tags_to_insert(&mut self, count: usize) {
        self.tags_to_insert = count.clamp(MIN_TAGS, MAX_TAGS);
    }

    /// Front-matter key receiving the tags.
    pub fn frontmatter_key(&self) -> &'static str {
        if self.use_frontmatter_autotags_key {
            AUTOTAGS_KEY
        } else {
            TAGS_KEY
        }
    }

    /// Prefix applied to formatted tags, if any.
    pub fn tag_prefix(&self) -> Option<&'static str> {
        self.use_autotag_prefix.then_some(AUTOTAG_PREFIX)
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::collections::HashMap;

    fn from_pairs(pairs: &[(&str, &str)]) -> Settings {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Settings::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn defaults_are_demo_friendly() {
        let settings = from_pairs(&[]);
        assert_eq!(settings, Settings::default());
        assert!(settings.demo_mode);
        assert_eq!(settings.model.id, "gpt-3.5-turbo-1106");
        assert_eq!(settings.temperature, 0.5);
        assert_eq!(settings.tags_format, CaseConvention::KebabCase);
        assert_eq!(settings.tags_to_insert, 3);
        assert_eq!(settings.frontmatter_key(), "tags");
        assert_eq!(settings.tag_prefix(), Some("autotag/"));
    }

    #[test]
    fn reads_all_variables() {
        let settings = from_pairs(&[
            ("AUTOTAG_DEMO_MODE", "false"),
            ("OPENAI_API_KEY", " sk-live "),
            ("AUTOTAG_MODEL", "gpt-4"),
            ("AUTOTAG_TEMPERATURE", "1.2"),
            ("AUTOTAG_TAGS_FORMAT", "CONSTANT_CASE"),
            ("AUTOTAG_USE_PREFIX", "no"),
            ("AUTOTAG_USE_AUTOTAGS_KEY", "yes"),
            ("AUTOTAG_SHOW_COST_PREVIEW", "0"),
            ("AUTOTAG_SHOW_REVIEW_DIALOG", "off"),
            ("AUTOTAG_TAGS_TO_INSERT", "7"),
            ("AUTOTAG_WRITE_LOG_FILE", "FALSE"),
            ("AUTOTAG_LOG_FILE", "/tmp/autotag-test.log"),
            ("OPENAI_BASE_URL", "http://localhost:8080/v1"),
        ]);

        assert!(!settings.demo_mode);
        assert_eq!(settings.api_key, "sk-live");
        assert_eq!(settings.model.id, "gpt-4");
        assert_eq!(settings.temperature, 1.2);
        assert_eq!(settings.tags_format, CaseConvention::ConstantCase);
        assert_eq!(settings.tag_prefix(), None);
        assert_eq!(settings.frontmatter_key(), "autotags");
        assert!(!settings.show_cost_preview);
        assert!(!settings.show_review_dialog);
        assert_eq!(settings.tags_to_insert, 7);
        assert!(!settings.write_to_log_file);
        assert_eq!(settings.log_file, Some(PathBuf::from("/tmp/autotag-test.log")));
        assert_eq!(settings.base_url.as_deref(), Some("http://localhost:8080/v1"));
    }

    #[test]
    fn alternate_api_key_variable() {
        let settings = from_pairs(&[("AUTOTAG_OPENAI_API_KEY", "sk-alt")]);
        assert_eq!(settings.api_key, "sk-alt");

        let settings = from_pairs(&[
            ("OPENAI_API_KEY", "sk-main"),
            ("AUTOTAG_OPENAI_API_KEY", "sk-alt"),
        ]);
        assert_eq!(settings.api_key, "sk-main");
    }

    #[test]
    fn out_of_range_values_are_clamped() {
        let settings = from_pairs(&[
            ("AUTOTAG_TEMPERATURE", "9"),
            ("AUTOTAG_TAGS_TO_INSERT", "0"),
        ]);
        assert_eq!(settings.temperature, 2.0);
        assert_eq!(settings.tags_to_insert, 1);

        let settings = from_pairs(&[
            ("AUTOTAG_TEMPERATURE", "-1"),
            ("AUTOTAG_TAGS_TO_INSERT", "25"),
        ]);
        assert_eq!(settings.temperature, 0.0);
        assert_eq!(settings.tags_to_insert, 10);
    }

    #[test]
    fn invalid_values_fall_back_to_defaults() {
        let settings = from_pairs(&[
            ("AUTOTAG_DEMO_MODE", "maybe"),
            ("AUTOTAG_MODEL", "gpt-99"),
            ("AUTOTAG_TEMPERATURE", "warm"),
            ("AUTOTAG_TAGS_FORMAT", "sPoNgEbOb"),
            ("AUTOTAG_TAGS_TO_INSERT", "many"),
        ]);
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn set_model_reports_unknown_ids() {
        let mut settings = Settings::default();
        assert!(settings.set_model("gpt-4-32k"));
        assert_eq!(settings.model.id, "gpt-4-32k");
        assert!(!settings.set_model("davinci"));
        assert_eq!(settings.model.id, "gpt-4-32k");
    }

    #[test]
    #[serial]
    fn from_env_reads_process_environment() {
        unsafe {
            std::env::set_var("AUTOTAG_TAGS_TO_INSERT", "5");
            std::env::set_var("AUTOTAG_TAGS_FORMAT", "snake_case");
        }

        let settings = Settings::from_env();
        assert_eq!(settings.tags_to_insert, 5);
        assert_eq!(settings.tags_format, CaseConvention::SnakeCase);

        unsafe {
            std::env::remove_var("AUTOTAG_TAGS_TO_INSERT");
            std::env::remove_var("AUTOTAG_TAGS_FORMAT");
        }
    }
}
