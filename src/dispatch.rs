//! The dispatch seam between chains and providers.
//!
//! Every chain sends resolved prompts through a [`Dispatch`]. It is the only
//! place where a prompt meets a provider, so it is also where callers add
//! logging, prompt decoration, or routing of their own.

use crate::chainable::BoxFut;
use crate::context::Context;
use crate::error::Result;
use crate::provider::Provider;
use async_trait::async_trait;

/// Send one resolved prompt to a provider.
///
/// `P` is opaque to the chains: they pass it through untouched.
#[async_trait]
pub trait Dispatch<P: ?Sized + Sync>: Send + Sync {
    async fn dispatch(&self, provider: &P, prompt: &str, context: &Context) -> Result<String>;
}

/// Dispatch that forwards to [`Provider::generate_response`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ProviderDispatch;

#[async_trait]
impl<P: Provider + ?Sized> Dispatch<P> for ProviderDispatch {
    async fn dispatch(&self, provider: &P, prompt: &str, _context: &Context) -> Result<String> {
        provider.generate_response(prompt).await
    }
}

/// A [`Dispatch`] backed by a closure. Build with [`dispatch_fn`].
pub struct FnDispatch<F>(F);

/// Wrap a closure as a [`Dispatch`].
///
/// # Example
///
/// ```
/// use llm_chainable::dispatch::dispatch_fn;
/// use llm_chainable::{Context, MockProvider, Provider};
///
/// let shouting = dispatch_fn(|provider: &MockProvider, prompt: &str, _ctx: &Context| {
///     Box::pin(async move {
///         provider
///             .generate_response(prompt)
///             .await
///             .map(|answer| answer.to_uppercase())
///     })
/// });
/// ```
pub fn dispatch_fn<P, F>(f: F) -> FnDispatch<F>
where
    P: ?Sized + Sync,
    F: for<'a> Fn(&'a P, &'a str, &'a Context) -> BoxFut<'a, Result<String>> + Send + Sync,
{
    FnDispatch(f)
}

#[async_trait]
impl<P, F> Dispatch<P> for FnDispatch<F>
where
    P: ?Sized + Sync,
    F: for<'a> Fn(&'a P, &'a str, &'a Context) -> BoxFut<'a, Result<String>> + Send + Sync,
{
    async fn dispatch(&self, provider: &P, prompt: &str, context: &Context) -> Result<String> {
        (self.0)(provider, prompt, context).await
    }
}
