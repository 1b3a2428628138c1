//! Provider capability trait.
//!
//! A provider is the thing that actually generates text. Chains never call
//! it directly: they hand it, untouched, to a [`Dispatch`](crate::Dispatch),
//! and [`ProviderDispatch`](crate::dispatch::ProviderDispatch) is the
//! dispatch that forwards to [`Provider::generate_response`].
//!
//! Concrete HTTP adapters live outside this crate; [`MockProvider`] is the
//! built-in in-process implementation for tests and demos.

pub mod mock;

pub use mock::MockProvider;

use crate::error::Result;
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;

/// Abstraction over text-generation backends.
///
/// # Object Safety
///
/// This trait is object-safe and designed to be used as `Arc<dyn Provider>`.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Generate a completion for a fully resolved prompt.
    async fn generate_response(&self, prompt: &str) -> Result<String>;

    /// Human-readable name for reports and events.
    fn name(&self) -> String;
}

#[async_trait]
impl<T: Provider + ?Sized> Provider for Arc<T> {
    async fn generate_response(&self, prompt: &str) -> Result<String> {
        (**self).generate_response(prompt).await
    }

    fn name(&self) -> String {
        (**self).name()
    }
}

#[async_trait]
impl<T: Provider + ?Sized> Provider for Box<T> {
    async fn generate_response(&self, prompt: &str) -> Result<String> {
        (**self).generate_response(prompt).await
    }

    fn name(&self) -> String {
        (**self).name()
    }
}

impl fmt::Display for dyn Provider + '_ {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}
