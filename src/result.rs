//! The report produced by a fusion run.

use crate::evaluator::best_index;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Immutable outcome of one [`FusionChain`](crate::FusionChain) run.
///
/// Every per-provider field is index-aligned with the provider list the
/// chain was run over.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FusionChainResult {
    top_response: String,
    all_prompt_responses: Vec<Vec<String>>,
    all_context_filled_prompts: Vec<Vec<String>>,
    performance_scores: Vec<f64>,
    provider_names: Vec<String>,
}

impl FusionChainResult {
    pub(crate) fn new(
        top_response: String,
        all_prompt_responses: Vec<Vec<String>>,
        all_context_filled_prompts: Vec<Vec<String>>,
        performance_scores: Vec<f64>,
        provider_names: Vec<String>,
    ) -> Self {
        Self {
            top_response,
            all_prompt_responses,
            all_context_filled_prompts,
            performance_scores,
            provider_names,
        }
    }

    /// The response the evaluator selected.
    pub fn top_response(&self) -> &str {
        &self.top_response
    }

    /// Every provider's outputs, one list per provider.
    pub fn all_prompt_responses(&self) -> &[Vec<String>] {
        &self.all_prompt_responses
    }

    /// Every provider's resolved prompts, one list per provider.
    pub fn all_context_filled_prompts(&self) -> &[Vec<String>] {
        &self.all_context_filled_prompts
    }

    pub fn performance_scores(&self) -> &[f64] {
        &self.performance_scores
    }

    pub fn provider_names(&self) -> &[String] {
        &self.provider_names
    }

    /// Index of the highest-scoring provider; the first wins ties.
    pub fn best_index(&self) -> Option<usize> {
        best_index(&self.performance_scores)
    }

    /// Every question and answer of one provider, followed by its score.
    ///
    /// Returns `None` when `index` is out of range.
    pub fn detailed_response(&self, index: usize) -> Option<String> {
        let name = self.provider_names.get(index)?;
        let responses = self.all_prompt_responses.get(index)?;
        let prompts = self.all_context_filled_prompts.get(index)?;
        let score = self.performance_scores.get(index)?;

        let mut report = format!("Detailed Report for {}:\n\n", name);
        for (i, (question, answer)) in prompts.iter().zip(responses).enumerate() {
            report.push_str(&format!("Question {}: {}\n", i + 1, question));
            report.push_str(&format!("Answer {}: {}\n\n", i + 1, answer));
        }
        report.push_str(&format!("Final Score: {}\n", score));
        Some(report)
    }
}

impl fmt::Display for FusionChainResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "FusionChain Report\n")?;
        writeln!(f, "Best Answer: {}\n", self.top_response)?;
        writeln!(f, "Scores:")?;
        for (name, score) in self.provider_names.iter().zip(&self.performance_scores) {
            writeln!(f, "{}: {}", name, score)?;
        }
        Ok(())
    }
}
