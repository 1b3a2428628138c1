//! Scoring the final answers of a fusion run.
//!
//! An [`Evaluator`] receives the last answer of every provider, in provider
//! order, and returns the winning response plus one score per provider. The
//! chain imposes no scoring algorithm; plain closures work through
//! [`evaluator_fn`], and [`AiEvaluator`] asks a model to act as the judge.

use crate::error::{ChainError, Result};
use crate::parsing;
use crate::provider::Provider;
use async_trait::async_trait;
use futures::future::try_join_all;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// The outcome of an evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    /// The response judged best.
    pub top_response: String,
    /// One score per evaluated response, in input order.
    pub scores: Vec<f64>,
}

impl Evaluation {
    pub fn new(top_response: impl Into<String>, scores: Vec<f64>) -> Self {
        Self {
            top_response: top_response.into(),
            scores,
        }
    }
}

/// Ranks or selects among candidate responses.
#[async_trait]
pub trait Evaluator: Send + Sync {
    async fn evaluate(&self, responses: &[String]) -> Result<Evaluation>;
}

#[async_trait]
impl<T: Evaluator + ?Sized> Evaluator for Arc<T> {
    async fn evaluate(&self, responses: &[String]) -> Result<Evaluation> {
        (**self).evaluate(responses).await
    }
}

/// An [`Evaluator`] backed by a closure. Build with [`evaluator_fn`].
pub struct FnEvaluator<F>(F);

/// Wrap a `(responses) -> (top_response, scores)` closure as an [`Evaluator`].
///
/// # Example
///
/// ```
/// use llm_chainable::evaluator::evaluator_fn;
///
/// // Longest answer wins; score is the length.
/// let longest = evaluator_fn(|responses: &[String]| {
///     let scores: Vec<f64> = responses.iter().map(|r| r.len() as f64).collect();
///     let top = responses.iter().max_by_key(|r| r.len()).cloned().unwrap_or_default();
///     (top, scores)
/// });
/// ```
pub fn evaluator_fn<F>(f: F) -> FnEvaluator<F>
where
    F: Fn(&[String]) -> (String, Vec<f64>) + Send + Sync,
{
    FnEvaluator(f)
}

#[async_trait]
impl<F> Evaluator for FnEvaluator<F>
where
    F: Fn(&[String]) -> (String, Vec<f64>) + Send + Sync,
{
    async fn evaluate(&self, responses: &[String]) -> Result<Evaluation> {
        let (top_response, scores) = (self.0)(responses);
        Ok(Evaluation {
            top_response,
            scores,
        })
    }
}

/// Index of the highest score; the first one wins ties.
pub(crate) fn best_index(scores: &[f64]) -> Option<usize> {
    scores
        .iter()
        .enumerate()
        .fold(None, |best: Option<(usize, f64)>, (i, &score)| match best {
            Some((_, top)) if top >= score => best,
            _ => Some((i, score)),
        })
        .map(|(i, _)| i)
}

/// A judge model's verdict on one response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Judgement {
    /// One score per criterion.
    #[serde(default)]
    pub scores: Vec<f64>,
    pub overall_score: f64,
    #[serde(default)]
    pub explanation: String,
}

/// A response with its verdict and 1-based rank.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedResponse {
    /// Position of the response in the evaluated list.
    pub index: usize,
    pub response: String,
    pub judgement: Judgement,
    pub rank: usize,
}

/// Model-as-judge evaluator.
///
/// Each response is sent to the judging provider with the configured
/// criteria and score range; the reply must contain a JSON object with
/// `scores`, `overall_score` and `explanation`. Fenced or prose-wrapped
/// JSON is accepted.
///
/// # Example
///
/// ```
/// use llm_chainable::{AiEvaluator, Evaluator, MockProvider};
///
/// # tokio_test::block_on(async {
/// let judge = MockProvider::new(vec![
///     r#"{"scores": [4, 5], "overall_score": 4.5, "explanation": "vivid"}"#.to_string(),
///     r#"{"scores": [2, 3], "overall_score": 2.5, "explanation": "flat"}"#.to_string(),
/// ]);
/// let evaluator = AiEvaluator::new(["creativity", "clarity"], (1.0, 5.0), judge).unwrap();
///
/// let evaluation = evaluator
///     .evaluate(&["a dragon sang".to_string(), "a dragon".to_string()])
///     .await
///     .unwrap();
/// assert_eq!(evaluation.top_response, "a dragon sang");
/// assert_eq!(evaluation.scores, vec![4.5, 2.5]);
/// # });
/// ```
#[derive(Debug)]
pub struct AiEvaluator<P> {
    criteria: Vec<String>,
    score_range: (f64, f64),
    provider: P,
}

impl<P: Provider> AiEvaluator<P> {
    /// Create a judge. Fails if the score range is empty or inverted.
    pub fn new<I, S>(criteria: I, score_range: (f64, f64), provider: P) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let (min, max) = score_range;
        if min.is_nan() || max.is_nan() || min >= max {
            return Err(ChainError::Validation(format!(
                "score range must satisfy min < max, got {} to {}",
                min, max
            )));
        }
        Ok(Self {
            criteria: criteria.into_iter().map(Into::into).collect(),
            score_range,
            provider,
        })
    }

    pub fn criteria(&self) -> &[String] {
        &self.criteria
    }

    /// The prompt sent to the judge for one response.
    pub fn judging_prompt(&self, content: &str) -> String {
        let (min, max) = self.score_range;
        format!(
            "Evaluate the following output based on these criteria:\n\
             {}\n\n\
             Use a score range of {} to {}.\n\n\
             Output to evaluate:\n\
             \"{}\"\n\n\
             Provide your evaluation in the following JSON format:\n\
             {{\n  \"scores\": [score1, score2, ...],\n  \"overall_score\": number,\n  \"explanation\": \"string\"\n}}",
            self.criteria.join(", "),
            min,
            max,
            content
        )
    }

    /// Ask the judge about a single response.
    ///
    /// Provider errors are returned unchanged; an unparseable verdict is
    /// [`ChainError::Evaluation`].
    pub async fn judge(&self, response: &str) -> Result<Judgement> {
        let raw = self
            .provider
            .generate_response(&self.judging_prompt(response))
            .await?;
        parsing::parse_as(&raw)
    }

    /// Judge every response concurrently and sort by `overall_score`,
    /// highest first. Equal scores keep their input order.
    pub async fn rank(&self, responses: &[String]) -> Result<Vec<RankedResponse>> {
        let judgements = try_join_all(responses.iter().map(|r| self.judge(r))).await?;

        let mut ranked: Vec<RankedResponse> = responses
            .iter()
            .zip(judgements)
            .enumerate()
            .map(|(index, (response, judgement))| RankedResponse {
                index,
                response: response.clone(),
                judgement,
                rank: 0,
            })
            .collect();
        ranked.sort_by(|a, b| {
            b.judgement
                .overall_score
                .total_cmp(&a.judgement.overall_score)
        });
        for (position, entry) in ranked.iter_mut().enumerate() {
            entry.rank = position + 1;
        }
        Ok(ranked)
    }
}

#[async_trait]
impl<P: Provider> Evaluator for AiEvaluator<P> {
    async fn evaluate(&self, responses: &[String]) -> Result<Evaluation> {
        let judgements = try_join_all(responses.iter().map(|r| self.judge(r))).await?;
        let scores: Vec<f64> = judgements.iter().map(|j| j.overall_score).collect();
        let top_response = best_index(&scores)
            .map(|i| responses[i].clone())
            .unwrap_or_default();
        Ok(Evaluation {
            top_response,
            scores,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::MockProvider;

    fn verdict(overall: f64) -> String {
        format!(
            "```json\n{{\"scores\": [{0}], \"overall_score\": {0}, \"explanation\": \"ok\"}}\n```",
            overall
        )
    }

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_fn_evaluator() {
        let evaluator = evaluator_fn(|responses: &[String]| (responses[0].clone(), vec![0.9, 0.8]));
        let evaluation = evaluator.evaluate(&strings(&["a", "b"])).await.unwrap();
        assert_eq!(evaluation, Evaluation::new("a", vec![0.9, 0.8]));
    }

    #[test]
    fn test_best_index() {
        assert_eq!(best_index(&[]), None);
        assert_eq!(best_index(&[1.0, 3.0, 2.0]), Some(1));
        assert_eq!(best_index(&[2.0, 2.0]), Some(0));
    }

    #[test]
    fn test_ai_evaluator_rejects_bad_range() {
        let result = AiEvaluator::new(["clarity"], (5.0, 1.0), MockProvider::echo());
        assert!(matches!(result, Err(ChainError::Validation(_))));
    }

    #[test]
    fn test_ai_evaluator_rejects_nan_and_empty_range() {
        for range in [(f64::NAN, 5.0), (1.0, f64::NAN), (3.0, 3.0)] {
            let result = AiEvaluator::new(["clarity"], range, MockProvider::echo());
            assert!(matches!(result, Err(ChainError::Validation(_))), "{:?}", range);
        }
    }

    #[test]
    fn test_judging_prompt_mentions_criteria_and_range() {
        let evaluator =
            AiEvaluator::new(["humor", "brevity"], (0.0, 10.0), MockProvider::echo()).unwrap();
        let prompt = evaluator.judging_prompt("knock knock");
        assert!(prompt.contains("humor, brevity"));
        assert!(prompt.contains("Use a score range of 0 to 10."));
        assert!(prompt.contains("\"knock knock\""));
        assert!(prompt.contains("\"overall_score\": number"));
    }

    #[tokio::test]
    async fn test_ai_evaluator_picks_highest() {
        let judge = MockProvider::new(vec![verdict(2.0), verdict(9.0), verdict(5.0)]);
        let evaluator = AiEvaluator::new(["quality"], (1.0, 10.0), judge).unwrap();

        let evaluation = evaluator
            .evaluate(&strings(&["meh", "great", "fine"]))
            .await
            .unwrap();
        assert_eq!(evaluation.top_response, "great");
        assert_eq!(evaluation.scores, vec![2.0, 9.0, 5.0]);
    }

    #[tokio::test]
    async fn test_ai_evaluator_rank_orders_descending() {
        let judge = MockProvider::new(vec![verdict(3.0), verdict(7.0), verdict(3.0)]);
        let evaluator = AiEvaluator::new(["quality"], (1.0, 10.0), judge).unwrap();

        let ranked = evaluator.rank(&strings(&["x", "y", "z"])).await.unwrap();
        let order: Vec<(usize, usize)> = ranked.iter().map(|r| (r.index, r.rank)).collect();
        assert_eq!(order, vec![(1, 1), (0, 2), (2, 3)]);
        assert_eq!(ranked[0].response, "y");
    }

    #[tokio::test]
    async fn test_ai_evaluator_unparseable_verdict() {
        let judge = MockProvider::fixed("I think it's pretty good!");
        let evaluator = AiEvaluator::new(["quality"], (1.0, 10.0), judge).unwrap();

        let err = evaluator.evaluate(&strings(&["x"])).await.unwrap_err();
        assert!(matches!(err, ChainError::Evaluation(_)));
    }

    #[tokio::test]
    async fn test_ai_evaluator_provider_error_unchanged() {
        let judge = MockProvider::failing("judge offline").with_name("judge");
        let evaluator = AiEvaluator::new(["quality"], (1.0, 10.0), judge).unwrap();

        let err = evaluator.evaluate(&strings(&["x"])).await.unwrap_err();
        assert!(matches!(err, ChainError::Provider { ref provider, .. } if provider == "judge"));
    }
}
