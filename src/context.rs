//! Shared run context.
//!
//! [`Context`] is the ordered key/value record threaded through every chain
//! run. It is both the source for `{{key}}` prompt substitution and the
//! scratch pad chains use to signal each other (previous answers, iteration
//! counters, the last output). It also carries the runtime handles a run
//! needs: a cancellation flag, a per-dispatch timeout, and an event handler.
//!
//! ## Reserved keys
//!
//! The chains in this crate write the following keys. They share the same
//! namespace as caller variables and are overwritten on every run, so callers
//! should not use them for their own template variables.
//!
//! | Key | Written by |
//! |-----|------------|
//! | [`PREVIOUS_ANSWERS`] | [`FusionChain`](crate::FusionChain) |
//! | [`CONVERSATION`] | [`TemplateExecutor`](crate::TemplateExecutor), only if already an array |
//! | [`ITERATION`] | [`RecursiveChain`](crate::RecursiveChain) |
//! | [`PREVIOUS_OUTPUT`] | [`RecursiveChain`](crate::RecursiveChain) |

use crate::error::{ChainError, Result};
use crate::events::{Event, EventHandler};
use serde_json::{Map, Value};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

/// Answers accumulated across providers by a fusion run.
pub const PREVIOUS_ANSWERS: &str = "previousAnswers";
/// Question/answer transcript appended to when present as an array.
pub const CONVERSATION: &str = "conversation";
/// 1-indexed round counter of a recursive run.
pub const ITERATION: &str = "iteration";
/// Last output of the previous recursive round.
pub const PREVIOUS_OUTPUT: &str = "previousOutput";

/// Mutable key/value context shared across one chain run.
///
/// Keys keep insertion order. Cloning a context is a snapshot of its
/// variables; the runtime handles (cancellation, event handler) are shared
/// with the clone.
///
/// # Example
///
/// ```
/// use llm_chainable::Context;
///
/// let mut ctx = Context::builder()
///     .var("name", "Alice")
///     .var("age", 30)
///     .build();
/// ctx.insert("mood", "curious");
///
/// assert_eq!(ctx.get_str("name"), Some("Alice"));
/// assert_eq!(ctx.len(), 3);
/// ```
#[derive(Clone, Default)]
pub struct Context {
    vars: Map<String, Value>,
    cancellation: Option<Arc<AtomicBool>>,
    dispatch_timeout: Option<Duration>,
    event_handler: Option<Arc<dyn EventHandler>>,
}

impl Context {
    /// Create an empty context with no runtime handles.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new builder.
    pub fn builder() -> ContextBuilder {
        ContextBuilder::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    /// Insert or overwrite a variable, returning the previous value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.vars.insert(key.into(), value.into())
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.vars.get(key)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut Value> {
        self.vars.get_mut(key)
    }

    /// Get a variable if it holds a string.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.vars.get(key).and_then(Value::as_str)
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.vars.remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.vars.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    /// Iterate over variables in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.vars.iter()
    }

    /// Borrow the underlying variable map.
    pub fn vars(&self) -> &Map<String, Value> {
        &self.vars
    }

    /// Append values to the array stored under `key`.
    ///
    /// A missing key, or a key holding a non-array value, is replaced by a
    /// new array.
    pub fn extend_list<I>(&mut self, key: &str, values: I)
    where
        I: IntoIterator,
        I::Item: Into<Value>,
    {
        let entry = self
            .vars
            .entry(key.to_string())
            .or_insert_with(|| Value::Array(Vec::new()));
        if !entry.is_array() {
            *entry = Value::Array(Vec::new());
        }
        if let Value::Array(items) = entry {
            items.extend(values.into_iter().map(Into::into));
        }
    }

    /// Snapshot of the variables as a JSON object.
    pub fn to_value(&self) -> Value {
        Value::Object(self.vars.clone())
    }

    /// Check whether cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancellation
            .as_ref()
            .is_some_and(|c| c.load(Ordering::Relaxed))
    }

    /// Return an error if cancellation has been requested.
    pub fn check_cancelled(&self) -> Result<()> {
        if self.is_cancelled() {
            return Err(ChainError::Cancelled);
        }
        Ok(())
    }

    /// Upper bound for a single dispatch call, if configured.
    pub fn dispatch_timeout(&self) -> Option<Duration> {
        self.dispatch_timeout
    }

    /// Emit an event if a handler is present. No-op otherwise.
    pub(crate) fn emit(&self, event: Event) {
        if let Some(ref h) = self.event_handler {
            h.on_event(event);
        }
    }
}

impl From<Map<String, Value>> for Context {
    fn from(vars: Map<String, Value>) -> Self {
        Self {
            vars,
            ..Self::default()
        }
    }
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("vars", &self.vars)
            .field("has_cancellation", &self.cancellation.is_some())
            .field("dispatch_timeout", &self.dispatch_timeout)
            .field("has_event_handler", &self.event_handler.is_some())
            .finish()
    }
}

/// Render a context value for insertion into a prompt.
///
/// Strings are inserted verbatim; everything else as compact JSON.
pub(crate) fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Builder for [`Context`].
#[derive(Default)]
pub struct ContextBuilder {
    vars: Map<String, Value>,
    cancellation: Option<Arc<AtomicBool>>,
    dispatch_timeout: Option<Duration>,
    event_handler: Option<Arc<dyn EventHandler>>,
}

impl ContextBuilder {
    /// Insert a single variable.
    pub fn var(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.vars.insert(key.into(), value.into());
        self
    }

    /// Insert many variables, keeping iteration order.
    pub fn vars<K, V>(mut self, vars: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<Value>,
    {
        self.vars
            .extend(vars.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Set the cancellation flag.
    pub fn cancellation(mut self, cancel: Option<Arc<AtomicBool>>) -> Self {
        self.cancellation = cancel;
        self
    }

    /// Bound every dispatch call. Default: unbounded.
    pub fn dispatch_timeout(mut self, timeout: Duration) -> Self {
        self.dispatch_timeout = Some(timeout);
        self
    }

    /// Set the event handler.
    pub fn event_handler(mut self, handler: Arc<dyn EventHandler>) -> Self {
        self.event_handler = Some(handler);
        self
    }

    pub fn build(self) -> Context {
        Context {
            vars: self.vars,
            cancellation: self.cancellation,
            dispatch_timeout: self.dispatch_timeout,
            event_handler: self.event_handler,
        }
    }
}
