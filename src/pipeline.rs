//! Linear pipeline of transform steps.
//!
//! [`PipelineChain`] threads one `serde_json::Value` through an ordered list
//! of steps, handing every step the same mutable [`Context`] for side
//! information that should not travel in the value itself.

use crate::chainable::{BoxFut, Chainable};
use crate::context::Context;
use crate::dispatch::Dispatch;
use crate::error::Result;
use crate::events::Event;
use crate::prompt::Prompt;
use serde_json::Value;

type AsyncStep = Box<dyn for<'a> Fn(Value, &'a mut Context) -> BoxFut<'a, Result<Value>> + Send + Sync>;
type SyncStep = Box<dyn Fn(Value, &mut Context) -> Result<Value> + Send + Sync>;

enum Step {
    Async(AsyncStep),
    Sync(SyncStep),
}

/// A strictly linear chain of transform steps.
///
/// The output of step *i* is the input of step *i + 1*. No retries, no
/// branching; the first failing step ends the run.
///
/// # Example
///
/// ```
/// use llm_chainable::{Context, PipelineChain};
/// use serde_json::json;
///
/// # tokio_test::block_on(async {
/// let pipeline = PipelineChain::new("shout")
///     .add_sync_step(|value, _ctx| Ok(json!(value.as_str().unwrap_or_default().to_uppercase())))
///     .add_step(|value, ctx| {
///         Box::pin(async move {
///             ctx.insert("seen", value.clone());
///             Ok(json!(format!("{}!", value.as_str().unwrap_or_default())))
///         })
///     });
///
/// let mut ctx = Context::new();
/// let out = pipeline.run_with(json!("hello"), &mut ctx).await.unwrap();
/// assert_eq!(out, json!("HELLO!"));
/// assert_eq!(ctx.get("seen"), Some(&json!("HELLO")));
/// # });
/// ```
pub struct PipelineChain {
    name: String,
    steps: Vec<Step>,
}

impl PipelineChain {
    /// Create a new empty pipeline.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            steps: Vec::new(),
        }
    }

    /// Append an asynchronous step (builder style).
    pub fn add_step<F>(mut self, step: F) -> Self
    where
        F: for<'a> Fn(Value, &'a mut Context) -> BoxFut<'a, Result<Value>> + Send + Sync + 'static,
    {
        self.steps.push(Step::Async(Box::new(step)));
        self
    }

    /// Append a synchronous step (builder style).
    pub fn add_sync_step<F>(mut self, step: F) -> Self
    where
        F: Fn(Value, &mut Context) -> Result<Value> + Send + Sync + 'static,
    {
        self.steps.push(Step::Sync(Box::new(step)));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of steps in the pipeline.
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Whether the pipeline is empty.
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Run with a fresh, empty shared context.
    pub async fn run(&self, initial: Value) -> Result<Value> {
        let mut context = Context::new();
        self.run_with(initial, &mut context).await
    }

    /// Run every step in order against `context`.
    ///
    /// An empty pipeline returns `initial` unchanged. A failing step's error
    /// is returned as-is and no later step runs.
    pub async fn run_with(&self, initial: Value, context: &mut Context) -> Result<Value> {
        let mut current = initial;

        for (index, step) in self.steps.iter().enumerate() {
            context.check_cancelled()?;
            let result = match step {
                Step::Async(f) => f(current, context).await,
                Step::Sync(f) => f(current, context),
            };
            context.emit(Event::StepEnd {
                index,
                ok: result.is_ok(),
            });
            current = result?;
        }

        Ok(current)
    }
}

impl std::fmt::Debug for PipelineChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineChain")
            .field("name", &self.name)
            .field("steps", &self.steps.len())
            .finish()
    }
}

/// As a branch, the pipeline is seeded with a JSON snapshot of the context.
impl<P: ?Sized + Sync> Chainable<P> for PipelineChain {
    fn kind(&self) -> &'static str {
        "pipeline"
    }

    fn execute<'a>(
        &'a self,
        context: &'a mut Context,
        _provider: &'a P,
        _dispatch: &'a dyn Dispatch<P>,
        _prompts: &'a [Prompt],
    ) -> BoxFut<'a, Result<Value>> {
        Box::pin(async move {
            let seed = context.to_value();
            self.run_with(seed, context).await
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::ProviderDispatch;
    use crate::error::ChainError;
    use crate::provider::MockProvider;
    use serde_json::json;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Arc;

    fn as_i64(value: &Value) -> i64 {
        value.as_i64().unwrap_or_default()
    }

    #[tokio::test]
    async fn test_empty_pipeline_returns_input() {
        let pipeline = PipelineChain::new("empty");
        assert!(pipeline.is_empty());
        let out = pipeline.run(json!({"keep": "me"})).await.unwrap();
        assert_eq!(out, json!({"keep": "me"}));
    }

    #[tokio::test]
    async fn test_steps_compose_in_order() {
        let pipeline = PipelineChain::new("math")
            .add_sync_step(|v, _ctx| Ok(json!(as_i64(&v) + 1)))
            .add_step(|v, _ctx| Box::pin(async move { Ok(json!(as_i64(&v) * 10)) }))
            .add_sync_step(|v, _ctx| Ok(json!(as_i64(&v) - 3)));

        assert_eq!(pipeline.len(), 3);
        // ((2 + 1) * 10) - 3
        assert_eq!(pipeline.run(json!(2)).await.unwrap(), json!(27));
    }

    #[tokio::test]
    async fn test_shared_context_between_steps() {
        let pipeline = PipelineChain::new("side-channel")
            .add_step(|v, ctx| {
                Box::pin(async move {
                    ctx.insert("original_length", v.as_str().map_or(0, str::len));
                    Ok(json!("replaced"))
                })
            })
            .add_sync_step(|v, ctx| {
                let len = ctx.get("original_length").cloned().unwrap_or_default();
                Ok(json!({ "value": v, "original_length": len }))
            });

        let mut ctx = Context::new();
        let out = pipeline.run_with(json!("hello"), &mut ctx).await.unwrap();
        assert_eq!(out, json!({ "value": "replaced", "original_length": 5 }));
        assert_eq!(ctx.get("original_length"), Some(&json!(5)));
    }

    #[tokio::test]
    async fn test_failing_step_aborts() {
        let later_calls = Arc::new(AtomicUsize::new(0));
        let counter = later_calls.clone();

        let pipeline = PipelineChain::new("fails")
            .add_sync_step(|v, _ctx| Ok(v))
            .add_step(|_v, _ctx| {
                Box::pin(async move { Err(ChainError::Other("step exploded".to_string())) })
            })
            .add_sync_step(move |v, _ctx| {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(v)
            });

        let err = pipeline.run(json!(1)).await.unwrap_err();
        assert!(matches!(err, ChainError::Other(ref m) if m == "step exploded"));
        assert_eq!(later_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_cancellation_stops_pipeline() {
        let cancel = Arc::new(AtomicBool::new(true));
        let mut ctx = Context::builder().cancellation(Some(cancel)).build();
        let pipeline = PipelineChain::new("cancelled").add_sync_step(|v, _ctx| Ok(v));
        let result = pipeline.run_with(json!(1), &mut ctx).await;
        assert!(matches!(result, Err(ChainError::Cancelled)));
    }

    #[tokio::test]
    async fn test_as_chainable_seeds_with_context() {
        let pipeline = PipelineChain::new("branch").add_sync_step(|v, _ctx| Ok(v["user"].clone()));
        let mut ctx = Context::new().with("user", "Alice");
        let out = pipeline
            .execute(&mut ctx, &MockProvider::echo(), &ProviderDispatch, &[])
            .await
            .unwrap();
        assert_eq!(out, json!("Alice"));
    }
}
