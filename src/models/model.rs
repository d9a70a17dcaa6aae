use serde::Serialize;
use std::fmt;

/// Capability advertised by a catalog model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ModelFeature {
    /// The model accepts `functions` / `function_call` in chat requests.
    FunctionCalling,
}

/// Static description of a language model the tagger can use.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelDescriptor {
    pub id: &'static str,
    pub name: &'static str,
    pub features: &'static [ModelFeature],
    /// Context window size in tokens.
    pub context_window: usize,
    /// Price in USD per 1000 input tokens.
    pub input_cost_1k: f64,
    /// Price in USD per 1000 output tokens.
    pub output_cost_1k: f64,
}

/// The models offered for tag suggestion. The first entry is the default.
///
/// Only the pinned default advertises function calling. The generic aliases
/// are fallbacks.
pub const MODEL_CATALOG: &[ModelDescriptor] = &[
    ModelDescriptor {
        id: "gpt-3.5-turbo-1106",
        name: "GPT-3.5 Turbo (1106)",
        features: &[ModelFeature::FunctionCalling],
        context_window: 16_000,
        input_cost_1k: 0.0010,
        output_cost_1k: 0.0020,
    },
    ModelDescriptor {
        id: "gpt-3.5-turbo",
        name: "GPT-3.5 Turbo",
        features: &[],
        context_window: 4_000,
        input_cost_1k: 0.0015,
        output_cost_1k: 0.0020,
    },
    ModelDescriptor {
        id: "gpt-4",
        name: "GPT-4 (8K context)",
        features: &[],
        context_window: 8_000,
        input_cost_1k: 0.03,
        output_cost_1k: 0.06,
    },
    ModelDescriptor {
        id: "gpt-4-32k",
        name: "GPT-4 (32K context)",
        features: &[],
        context_window: 32_000,
        input_cost_1k: 0.06,
        output_cost_1k: 0.12,
    },
];

impl ModelDescriptor {
    /// Returns the default catalog model.
    pub fn default_model() -> &'static ModelDescriptor {
        &MODEL_CATALOG[0]
    }

    /// Finds a catalog model by its API identifier.
    pub fn find(id: &str) -> Option<&'static ModelDescriptor> {
        MODEL_CATALOG.iter().find(|model| model.id == id.trim())
    }

    pub fn supports(&self, feature: ModelFeature) -> bool {
        self.features.contains(&feature)
    }
}

impl fmt::Display for ModelDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_model_is_first_catalog_entry() {
        assert_eq!(ModelDescriptor::default_model().id, "gpt-3.5-turbo-1106");
    }

    #[test]
    fn find_matches_exact_ids_only() {
        assert_eq!(ModelDescriptor::find("gpt-4").map(|m| m.id), Some("gpt-4"));
        assert_eq!(
            ModelDescriptor::find(" gpt-4-32k ").map(|m| m.context_window),
            Some(32_000)
        );
        assert!(ModelDescriptor::find("gpt-5").is_none());
    }

    #[test]
    fn catalog_ids_are_unique() {
        for (i, a) in MODEL_CATALOG.iter().enumerate() {
            for b in &MODEL_CATALOG[i + 1..] {
                assert_ne!(a.id, b.id);
            }
        }
    }

    #[test]
    fn only_pinned_default_advertises_function_calling() {
        assert!(ModelDescriptor::default_model().supports(ModelFeature::FunctionCalling));
        for id in ["gpt-3.5-turbo", "gpt-4", "gpt-4-32k"] {
            let model = ModelDescriptor::find(id).unwrap();
            assert!(model.features.is_empty(), "{id} should list no features");
            assert!(!model.supports(ModelFeature::FunctionCalling));
        }
    }

    #[test]
    fn catalog_serializes_with_kebab_case_features() {
        let json = serde_json::to_value(MODEL_CATALOG).unwrap();
        assert_eq!(json[0]["id"], "gpt-3.5-turbo-1106");
        assert_eq!(json[0]["features"][0], "function-calling");
        assert_eq!(json[2]["features"].as_array().unwrap().len(), 0);
        assert_eq!(json[3]["context_window"], 32_000);
    }
}
