//! Token count and cost estimation before a suggestion request.
//!
//! Counting is local: the `cl100k_base` BPE is loaded once per estimator, and
//! a characters-per-token heuristic stands in if the tables cannot be loaded.

use std::fmt;

use tiktoken_rs::CoreBPE;
use tracing::warn;

use crate::models::ModelDescriptor;

/// Characters per token used when the BPE tables are unavailable.
const HEURISTIC_CHARS_PER_TOKEN: f64 = 3.7;

/// Token count and estimated price of sending a text to a model.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CostEstimate {
    pub token_count: usize,
    /// Estimated cost in USD.
    pub cost: f64,
}

enum TokenCounter {
    Bpe(CoreBPE),
    Heuristic,
}

/// Estimates tokens and cost for a text and model.
pub struct CostEstimator {
    counter: TokenCounter,
}

impl CostEstimator {
    /// Creates an estimator backed by the `cl100k_base` BPE.
    ///
    /// Falls back to the heuristic counter (and logs a warning) if the BPE
    /// cannot be initialised.
    pub fn new() -> Self {
        let counter = match tiktoken_rs::cl100k_base() {
            Ok(bpe) => TokenCounter::Bpe(bpe),
            Err(e) => {
                warn!(error = %e, "failed to load cl100k_base, using heuristic token count");
                TokenCounter::Heuristic
            }
        };
        Self { counter }
    }

    /// Creates an estimator that only uses the characters-per-token heuristic.
    pub fn heuristic() -> Self {
        Self {
            counter: TokenCounter::Heuristic,
        }
    }

    /// Whether counts come from the real tokenizer.
    pub fn is_exact(&self) -> bool {
        matches!(self.counter, TokenCounter::Bpe(_))
    }

    /// Counts tokens in `text`.
    pub fn count_tokens(&self, text: &str) -> usize {
        match &self.counter {
            TokenCounter::Bpe(bpe) => bpe.encode_ordinary(text).len(),
            TokenCounter::Heuristic => {
                (text.chars().count() as f64 / HEURISTIC_CHARS_PER_TOKEN).ceil() as usize
            }
        }
    }

    /// Estimates the cost of sending `text` to `model`.
    ///
    /// Output tokens are assumed to match input tokens, so the result
    /// overestimates for short replies such as a handful of tags.
    pub fn estimate(&self, text: &str, model: &ModelDescriptor) -> CostEstimate {
        let token_count = self.count_tokens(text);
        let thousands = token_count as f64 / 1000.0;
        let cost = thousands * model.input_cost_1k + thousands * model.output_cost_1k;

        CostEstimate { token_count, cost }
    }
}

impl Default for CostEstimator {
    fn default() -> Self {
        Self::new()
    }
}

/// Everything the cost confirmation shows before a request is sent.
#[derive(Debug, Clone)]
pub struct CostPreview {
    /// Length of the text in characters.
    pub text_length: usize,
    pub estimate: CostEstimate,
    pub model: &'static ModelDescriptor,
}

impl CostPreview {
    pub fn new(estimator: &CostEstimator, text: &str, model: &'static ModelDescriptor) -> Self {
        Self {
            text_length: text.chars().count(),
            estimate: estimator.estimate(text, model),
            model,
        }
    }

    /// Whether the text alone is larger than the model's context window.
    pub fn exceeds_context(&self) -> bool {
        self.estimate.token_count > self.model.context_window
    }

    /// Cost formatted in USD with four decimals.
    pub fn formatted_cost(&self) -> String {
        format!("${:.4}", self.estimate.cost)
    }
}

impl fmt::Display for CostPreview {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Model: {}", self.model)?;
        writeln!(f, "Text length: {} characters", self.text_length)?;
        writeln!(f, "Estimated tokens: {}", self.estimate.token_count)?;
        write!(f, "Estimated cost: {}", self.formatted_cost())?;
        if self.exceeds_context() {
            write!(
                f,
                "\nWarning: text exceeds the {} token context window",
                self.model.context_window
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MODEL_CATALOG;

    fn gpt4() -> &'static ModelDescriptor {
        ModelDescriptor::find("gpt-4").unwrap()
    }

    #[test]
    fn empty_text_costs_nothing() {
        let estimator = CostEstimator::new();
        let estimate = estimator.estimate("", gpt4());
        assert_eq!(estimate.token_count, 0);
        assert_eq!(estimate.cost, 0.0);
    }

    #[test]
    fn bpe_counts_known_sentence() {
        let estimator = CostEstimator::new();
        if estimator.is_exact() {
            assert_eq!(estimator.count_tokens("hello world"), 2);
        }
    }

    #[test]
    fn cost_uses_both_input_and_output_price() {
        let estimator = CostEstimator::heuristic();
        let text = "a".repeat(3700);
        let estimate = estimator.estimate(&text, gpt4());

        assert_eq!(estimate.token_count, 1000);
        assert!((estimate.cost - (0.03 + 0.06)).abs() < 1e-12);
    }

    #[test]
    fn heuristic_rounds_up() {
        let estimator = CostEstimator::heuristic();
        assert_eq!(estimator.count_tokens("abc"), 1);
        assert_eq!(estimator.count_tokens("abcd"), 2);
        assert!(!estimator.is_exact());
    }

    #[test]
    fn cost_is_monotonic_in_text_length() {
        for estimator in [CostEstimator::new(), CostEstimator::heuristic()] {
            for model in MODEL_CATALOG {
                let mut previous = estimator.estimate("", model).cost;
                let mut text = String::new();
                for i in 0..50 {
                    text.push_str(&format!("word{i} "));
                    let cost = estimator.estimate(&text, model).cost;
                    assert!(cost >= previous, "{} regressed at {i}", model.id);
                    previous = cost;
                }
            }
        }
    }

    #[test]
    fn preview_formats_cost_with_four_decimals() {
        let estimator = CostEstimator::heuristic();
        let preview = CostPreview::new(&estimator, &"b".repeat(370), gpt4());

        assert_eq!(preview.text_length, 370);
        assert_eq!(preview.estimate.token_count, 100);
        assert_eq!(preview.formatted_cost(), "$0.0090");

        let rendered = preview.to_string();
        assert!(rendered.contains("GPT-4 (8K context) (gpt-4)"));
        assert!(rendered.contains("Estimated tokens: 100"));
        assert!(!rendered.contains("Warning"));
    }

    #[test]
    fn preview_warns_when_context_is_exceeded() {
        let estimator = CostEstimator::heuristic();
        let model = ModelDescriptor::find("gpt-3.5-turbo").unwrap();
        let preview = CostPreview::new(&estimator, &"c".repeat(20_000), model);

        assert!(preview.exceeds_context());
        assert!(preview.to_string().contains("Warning"));
    }
}
