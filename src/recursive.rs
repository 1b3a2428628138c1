//! Bounded iterative refinement.
//!
//! [`RecursiveChain`] reruns the same prompt list a fixed number of times,
//! writing each round's last answer to `previousOutput` and the round number
//! to `iteration` so template prompts can build on the previous round.

use crate::chainable::{BoxFut, Chainable};
use crate::context::{Context, ITERATION, PREVIOUS_OUTPUT};
use crate::dispatch::Dispatch;
use crate::error::Result;
use crate::events::Event;
use crate::executor::TemplateExecutor;
use crate::prompt::Prompt;
use serde_json::Value;

const DEFAULT_MAX_ITERATIONS: usize = 5;

/// Runs a prompt list exactly `max_iterations` times.
///
/// There is no convergence check: the bound is the only stopping rule.
///
/// # Example
///
/// ```
/// use llm_chainable::{Context, MockProvider, Prompt, ProviderDispatch, RecursiveChain};
///
/// # tokio_test::block_on(async {
/// let prompts = vec![Prompt::template(|ctx: &Context| match ctx.get_str("previousOutput") {
///     Some(previous) => format!("Continue: {}", previous),
///     None => "Start a story".to_string(),
/// })];
///
/// let (last, ctx) = RecursiveChain::new(3)
///     .run(Context::new(), &MockProvider::echo(), &ProviderDispatch, &prompts)
///     .await
///     .unwrap();
///
/// assert_eq!(ctx.get("iteration"), Some(&serde_json::json!(3)));
/// assert_eq!(
///     last,
///     "Response to Continue: Response to Continue: Response to Start a story"
/// );
/// # });
/// ```
#[derive(Debug, Clone, Copy)]
pub struct RecursiveChain {
    max_iterations: usize,
}

impl Default for RecursiveChain {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ITERATIONS)
    }
}

impl RecursiveChain {
    pub fn new(max_iterations: usize) -> Self {
        Self { max_iterations }
    }

    pub fn max_iterations(&self) -> usize {
        self.max_iterations
    }

    /// Iterate on an owned context and hand it back with the final output.
    ///
    /// With zero iterations the output is empty and the context unchanged.
    pub async fn run<P>(
        &self,
        mut context: Context,
        provider: &P,
        dispatch: &dyn Dispatch<P>,
        prompts: &[Prompt],
    ) -> Result<(String, Context)>
    where
        P: ?Sized + Sync,
    {
        let output = self.iterate(&mut context, provider, dispatch, prompts).await?;
        Ok((output, context))
    }

    /// Iterate in place on `context`, returning the last output.
    ///
    /// A failing round aborts the loop; rounds completed before it have
    /// already updated `previousOutput` and `iteration`.
    pub async fn iterate<P>(
        &self,
        context: &mut Context,
        provider: &P,
        dispatch: &dyn Dispatch<P>,
        prompts: &[Prompt],
    ) -> Result<String>
    where
        P: ?Sized + Sync,
    {
        let mut current = String::new();

        for iteration in 1..=self.max_iterations {
            context.check_cancelled()?;
            let round = TemplateExecutor::run(context, provider, dispatch, prompts).await?;
            current = round.last_output().unwrap_or_default().to_string();

            context.insert(PREVIOUS_OUTPUT, current.clone());
            context.insert(ITERATION, iteration);
            context.emit(Event::IterationEnd {
                iteration,
                max_iterations: self.max_iterations,
            });
        }

        Ok(current)
    }
}

/// As a branch, iterates in place and returns the last output as a string.
impl<P: ?Sized + Sync> Chainable<P> for RecursiveChain {
    fn kind(&self) -> &'static str {
        "recursive"
    }

    fn execute<'a>(
        &'a self,
        context: &'a mut Context,
        provider: &'a P,
        dispatch: &'a dyn Dispatch<P>,
        prompts: &'a [Prompt],
    ) -> BoxFut<'a, Result<Value>> {
        Box::pin(async move {
            let output = self.iterate(context, provider, dispatch, prompts).await?;
            Ok(Value::String(output))
        })
    }
}
