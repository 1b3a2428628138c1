//! Fan one prompt sequence out across several providers and score the
//! final answers.
//!
//! [`FusionChain::run`] visits providers in order on one shared working
//! context, so each provider can read everything earlier providers answered
//! through `previousAnswers`. [`FusionChain::run_parallel`] runs all of them
//! concurrently, each on its own snapshot of the same starting context.
//! Either way the last answer of every provider is handed to an
//! [`Evaluator`] and everything is bundled into a [`FusionChainResult`].

use crate::chainable::{BoxFut, Chainable};
use crate::context::{Context, PREVIOUS_ANSWERS};
use crate::dispatch::Dispatch;
use crate::error::{ChainError, Result};
use crate::evaluator::Evaluator;
use crate::events::Event;
use crate::executor::{ExecutionOutput, TemplateExecutor};
use crate::prompt::Prompt;
use crate::result::FusionChainResult;
use futures::future::try_join_all;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

type Namer<P> = Arc<dyn Fn(&P) -> String + Send + Sync>;

/// Multi-provider fan-out with evaluation.
///
/// Any provider failure aborts the run and no result is produced.
///
/// # Example
///
/// ```
/// use llm_chainable::evaluator::evaluator_fn;
/// use llm_chainable::{Context, FusionChain, MockProvider, Prompt, ProviderDispatch};
///
/// # tokio_test::block_on(async {
/// // Longest answer wins.
/// let evaluator = evaluator_fn(|answers: &[String]| {
///     let scores: Vec<f64> = answers.iter().map(|a| a.len() as f64).collect();
///     let top = answers.iter().max_by_key(|a| a.len()).cloned().unwrap_or_default();
///     (top, scores)
/// });
/// let chain = FusionChain::new(evaluator);
///
/// let providers = vec![
///     MockProvider::fixed("short").with_name("terse"),
///     MockProvider::fixed("a much longer answer").with_name("verbose"),
/// ];
/// let prompts = vec![Prompt::from("Describe {{topic}}")];
/// let ctx = Context::new().with("topic", "tides");
///
/// let result = chain.run(&ctx, &providers, &ProviderDispatch, &prompts).await.unwrap();
/// assert_eq!(result.top_response(), "a much longer answer");
/// assert_eq!(result.provider_names(), ["terse", "verbose"]);
/// assert_eq!(result.performance_scores(), [5.0, 20.0]);
/// # });
/// ```
pub struct FusionChain<P> {
    evaluator: Arc<dyn Evaluator>,
    namer: Namer<P>,
    providers: Vec<P>,
}

impl<P: fmt::Display + 'static> FusionChain<P> {
    /// Create a fusion chain naming providers by their `Display` output.
    pub fn new<E: Evaluator + 'static>(evaluator: E) -> Self {
        Self::with_namer(evaluator, |provider: &P| provider.to_string())
    }
}

impl<P> FusionChain<P> {
    /// Create a fusion chain with a custom provider naming function.
    pub fn with_namer<E, F>(evaluator: E, namer: F) -> Self
    where
        E: Evaluator + 'static,
        F: Fn(&P) -> String + Send + Sync + 'static,
    {
        Self {
            evaluator: Arc::new(evaluator),
            namer: Arc::new(namer),
            providers: Vec::new(),
        }
    }

    /// Providers used when the chain runs as a [`Chainable`] branch.
    pub fn with_providers(mut self, providers: Vec<P>) -> Self {
        self.providers = providers;
        self
    }

    pub fn providers(&self) -> &[P] {
        &self.providers
    }

    fn working_context(context: &Context) -> Context {
        let mut working = context.clone();
        working.insert(PREVIOUS_ANSWERS, Value::Array(Vec::new()));
        working
    }
}

impl<P: Sync> FusionChain<P> {
    /// Run providers one after another on a shared working context.
    ///
    /// After each provider finishes, all of its outputs are appended to
    /// `previousAnswers`. The caller's context is never modified.
    pub async fn run(
        &self,
        context: &Context,
        providers: &[P],
        dispatch: &dyn Dispatch<P>,
        prompts: &[Prompt],
    ) -> Result<FusionChainResult> {
        let names = self.names(providers);
        let mut working = Self::working_context(context);
        let mut runs = Vec::with_capacity(providers.len());

        for (provider, name) in providers.iter().zip(&names) {
            let run = Self::run_provider(&mut working, name, provider, dispatch, prompts).await?;
            working.extend_list(PREVIOUS_ANSWERS, run.outputs.iter().cloned());
            runs.push(run);
        }

        self.finish(&working, names, runs).await
    }

    /// Run all providers concurrently.
    ///
    /// Each provider works on its own copy of the initial working context, so
    /// none of them sees another's answers. The first failure fails the run.
    pub async fn run_parallel(
        &self,
        context: &Context,
        providers: &[P],
        dispatch: &dyn Dispatch<P>,
        prompts: &[Prompt],
    ) -> Result<FusionChainResult> {
        let names = self.names(providers);
        let working = Self::working_context(context);

        let runs = try_join_all(providers.iter().zip(&names).map(|(provider, name)| {
            let mut snapshot = working.clone();
            async move { Self::run_provider(&mut snapshot, name, provider, dispatch, prompts).await }
        }))
        .await?;

        self.finish(&working, names, runs).await
    }

    fn names(&self, providers: &[P]) -> Vec<String> {
        providers.iter().map(|p| (self.namer)(p)).collect()
    }

    async fn run_provider(
        context: &mut Context,
        name: &str,
        provider: &P,
        dispatch: &dyn Dispatch<P>,
        prompts: &[Prompt],
    ) -> Result<ExecutionOutput> {
        context.check_cancelled()?;
        context.emit(Event::ProviderStart {
            provider: name.to_string(),
        });
        let result = TemplateExecutor::run(context, provider, dispatch, prompts).await;
        context.emit(Event::ProviderEnd {
            provider: name.to_string(),
            ok: result.is_ok(),
        });
        result
    }

    async fn finish(
        &self,
        context: &Context,
        names: Vec<String>,
        runs: Vec<ExecutionOutput>,
    ) -> Result<FusionChainResult> {
        let last_outputs: Vec<String> = runs
            .iter()
            .map(|run| run.last_output().unwrap_or_default().to_string())
            .collect();

        let evaluation = self.evaluator.evaluate(&last_outputs).await?;
        if evaluation.scores.len() != runs.len() {
            return Err(ChainError::Validation(format!(
                "evaluator returned {} scores for {} providers",
                evaluation.scores.len(),
                runs.len()
            )));
        }
        context.emit(Event::Evaluated {
            top_response: evaluation.top_response.clone(),
            scores: evaluation.scores.clone(),
        });

        let (responses, prompts): (Vec<_>, Vec<_>) = runs
            .into_iter()
            .map(|run| (run.outputs, run.resolved_prompts))
            .unzip();

        Ok(FusionChainResult::new(
            evaluation.top_response,
            responses,
            prompts,
            evaluation.scores,
            names,
        ))
    }
}

impl<P> fmt::Debug for FusionChain<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FusionChain")
            .field("providers", &self.providers.len())
            .finish_non_exhaustive()
    }
}

/// As a branch, fans out over the configured providers, or over the branch
/// provider alone when none are configured, and returns the serialized
/// [`FusionChainResult`].
impl<P: Send + Sync> Chainable<P> for FusionChain<P> {
    fn kind(&self) -> &'static str {
        "fusion"
    }

    fn execute<'a>(
        &'a self,
        context: &'a mut Context,
        provider: &'a P,
        dispatch: &'a dyn Dispatch<P>,
        prompts: &'a [Prompt],
    ) -> BoxFut<'a, Result<Value>> {
        Box::pin(async move {
            let providers = if self.providers.is_empty() {
                std::slice::from_ref(provider)
            } else {
                self.providers.as_slice()
            };
            let result = self.run(context, providers, dispatch, prompts).await?;
            Ok(serde_json::to_value(result)?)
        })
    }
}
