//! # LLM Chainable
//!
//! Small composition primitives for prompt workflows: run templated prompts
//! against a provider, pipe values through steps, branch on the context,
//! iterate a prompt sequence, and fan one sequence out across several
//! providers with an evaluator picking the winner.
//!
//! The crate never talks to a model itself. Every prompt goes through a
//! [`Dispatch`], which receives the provider untouched; the built-in
//! [`ProviderDispatch`] forwards to [`Provider::generate_response`], and
//! [`dispatch_fn`] turns any closure into a dispatch.
//!
//! ## Core Concepts
//!
//! - **[`Context`]**: ordered key/value record threaded through a run. Source
//!   of `{{key}}` substitutions and scratch pad between chains.
//! - **[`Prompt`]**: literal template or closure over the context.
//! - **[`TemplateExecutor`]**: the leaf primitive. Resolves and dispatches a
//!   prompt list, returning outputs and resolved prompts.
//! - **[`PipelineChain`]**, **[`ConditionalChain`]**, **[`RecursiveChain`]**,
//!   **[`FusionChain`]**: composition shapes.
//! - **[`Chainable`]**: the uniform run contract that lets chains nest.
//!
//! ## Quick Start
//!
//! ```
//! use llm_chainable::{Context, MockProvider, Prompt, ProviderDispatch, TemplateExecutor};
//!
//! # tokio_test::block_on(async {
//! let mut ctx = Context::new().with("name", "Alice");
//! let prompts = vec![
//!     Prompt::from("Hello {{name}}"),
//!     Prompt::template(|ctx: &Context| {
//!         format!("Tell {} a joke", ctx.get_str("name").unwrap_or("someone"))
//!     }),
//! ];
//!
//! let run = TemplateExecutor::run(&mut ctx, &MockProvider::echo(), &ProviderDispatch, &prompts)
//!     .await
//!     .unwrap();
//!
//! assert_eq!(run.resolved_prompts, vec!["Hello Alice", "Tell Alice a joke"]);
//! assert_eq!(run.last_output(), Some("Response to Tell Alice a joke"));
//! # });
//! ```
//!
//! ## Branching
//!
//! ```
//! use llm_chainable::{ConditionalChain, Context, MockProvider, Prompt, ProviderDispatch, RecursiveChain, TemplateExecutor};
//!
//! # tokio_test::block_on(async {
//! let router = ConditionalChain::<MockProvider>::new("router")
//!     .add_branch(|ctx: &Context| ctx.get_str("mode") == Some("refine"), RecursiveChain::new(2))
//!     .set_default_branch(TemplateExecutor);
//!
//! let mut ctx = Context::new().with("mode", "refine");
//! let value = router
//!     .run(&mut ctx, &MockProvider::fixed("better"), &ProviderDispatch, &[Prompt::from("Improve")])
//!     .await
//!     .unwrap();
//! assert_eq!(value, serde_json::json!("better"));
//! # });
//! ```

pub mod chainable;
pub mod conditional;
pub mod context;
pub mod dispatch;
pub mod error;
pub mod evaluator;
pub mod events;
pub mod executor;
pub mod fusion;
pub mod parsing;
pub mod pipeline;
pub mod prompt;
pub mod provider;
pub mod recursive;
pub mod result;

pub use chainable::{chain_fn, BoxFut, Chainable};
pub use conditional::ConditionalChain;
pub use context::{Context, ContextBuilder};
pub use dispatch::{dispatch_fn, Dispatch, ProviderDispatch};
pub use error::{ChainError, Result};
pub use evaluator::{evaluator_fn, AiEvaluator, Evaluation, Evaluator};
pub use executor::{ExecutionOutput, TemplateExecutor};
pub use fusion::FusionChain;
pub use pipeline::PipelineChain;
pub use prompt::Prompt;
pub use provider::{MockProvider, Provider};
pub use recursive::RecursiveChain;
pub use result::FusionChainResult;
