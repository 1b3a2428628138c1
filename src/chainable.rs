//! The uniform run contract shared by every chain.
//!
//! [`Chainable`] is what lets chains nest: a
//! [`ConditionalChain`](crate::ConditionalChain) branch can be a bare closure
//! (wrapped by [`chain_fn`]) or any other chain, and the conditional chain
//! executes all of them through the same call.

use crate::context::Context;
use crate::dispatch::Dispatch;
use crate::error::Result;
use crate::prompt::Prompt;
use serde_json::Value;
use std::future::Future;
use std::pin::Pin;

/// A boxed, pinned, Send future -- the return type of [`Chainable::execute`].
pub type BoxFut<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Object-safe trait for executable chains.
///
/// Chains take the shared context, a provider, a dispatch, and a prompt
/// list, and produce a `serde_json::Value` so heterogeneous chains can be
/// stored together as `Box<dyn Chainable<P>>`.
pub trait Chainable<P: ?Sized + Sync>: Send + Sync {
    /// Stable identifier for the chain type (e.g. `"conditional"`, `"fusion"`).
    fn kind(&self) -> &'static str;

    /// Execute the chain.
    fn execute<'a>(
        &'a self,
        context: &'a mut Context,
        provider: &'a P,
        dispatch: &'a dyn Dispatch<P>,
        prompts: &'a [Prompt],
    ) -> BoxFut<'a, Result<Value>>;
}

/// A [`Chainable`] backed by a closure. Build with [`chain_fn`].
pub struct FnChain<F>(F);

/// Wrap a closure with the run signature as a [`Chainable`].
///
/// # Example
///
/// ```
/// use llm_chainable::{chain_fn, Chainable, Context, MockProvider, ProviderDispatch};
/// use serde_json::json;
///
/// # tokio_test::block_on(async {
/// let greet = chain_fn::<MockProvider, _>(|ctx, _provider, _dispatch, _prompts| {
///     ctx.insert("greeted", true);
///     Box::pin(async move { Ok(json!("hello")) })
/// });
///
/// let mut ctx = Context::new();
/// let out = greet
///     .execute(&mut ctx, &MockProvider::echo(), &ProviderDispatch, &[])
///     .await
///     .unwrap();
/// assert_eq!(out, json!("hello"));
/// assert_eq!(ctx.get("greeted"), Some(&json!(true)));
/// # });
/// ```
pub fn chain_fn<P, F>(f: F) -> FnChain<F>
where
    P: ?Sized + Sync,
    F: for<'a> Fn(
            &'a mut Context,
            &'a P,
            &'a dyn Dispatch<P>,
            &'a [Prompt],
        ) -> BoxFut<'a, Result<Value>>
        + Send
        + Sync,
{
    FnChain(f)
}

impl<P, F> Chainable<P> for FnChain<F>
where
    P: ?Sized + Sync,
    F: for<'a> Fn(
            &'a mut Context,
            &'a P,
            &'a dyn Dispatch<P>,
            &'a [Prompt],
        ) -> BoxFut<'a, Result<Value>>
        + Send
        + Sync,
{
    fn kind(&self) -> &'static str {
        "fn"
    }

    fn execute<'a>(
        &'a self,
        context: &'a mut Context,
        provider: &'a P,
        dispatch: &'a dyn Dispatch<P>,
        prompts: &'a [Prompt],
    ) -> BoxFut<'a, Result<Value>> {
        (self.0)(context, provider, dispatch, prompts)
    }
}
