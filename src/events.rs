//! Event system for chain lifecycle hooks.
//!
//! Provides an optional, non-intrusive way to observe chain execution.
//! Chains emit events as prompts are dispatched, steps finish, branches are
//! selected, and providers complete. Implement [`EventHandler`] and attach it
//! to a [`Context`](crate::Context) to receive them for logging, progress
//! tracking, or transcripts.

/// Events emitted during chain execution.
#[derive(Debug, Clone)]
pub enum Event {
    /// A resolved prompt is about to be dispatched.
    PromptStart {
        /// Position of the prompt in the prompt list (0-based).
        index: usize,
        /// The resolved prompt text, exactly as sent to dispatch.
        prompt: String,
    },
    /// A dispatch call has finished.
    PromptEnd {
        /// Position of the prompt in the prompt list (0-based).
        index: usize,
        /// Whether the dispatch succeeded.
        ok: bool,
    },
    /// A pipeline step has finished.
    StepEnd {
        /// Position of the step in the pipeline (0-based).
        index: usize,
        /// Whether the step succeeded.
        ok: bool,
    },
    /// A conditional chain picked the branch it will execute.
    BranchSelected {
        /// Name of the conditional chain.
        chain: String,
        /// Index of the matching branch, or `None` for the default branch.
        branch: Option<usize>,
    },
    /// A recursive chain finished one iteration.
    IterationEnd {
        /// The iteration just completed (1-indexed).
        iteration: usize,
        /// Configured iteration bound.
        max_iterations: usize,
    },
    /// A fusion chain is starting a provider's prompt sequence.
    ProviderStart {
        /// Display name of the provider.
        provider: String,
    },
    /// A fusion chain finished a provider's prompt sequence.
    ProviderEnd {
        /// Display name of the provider.
        provider: String,
        /// Whether every prompt succeeded.
        ok: bool,
    },
    /// A fusion chain's evaluator has scored the final answers.
    Evaluated {
        /// The response the evaluator selected.
        top_response: String,
        /// Scores aligned with provider order.
        scores: Vec<f64>,
    },
}

/// Handler for chain lifecycle events.
///
/// This is entirely optional -- chains work without an event handler.
///
/// # Example
///
/// ```
/// use llm_chainable::events::{Event, EventHandler};
///
/// struct PrintHandler;
///
/// impl EventHandler for PrintHandler {
///     fn on_event(&self, event: Event) {
///         match event {
///             Event::PromptStart { index, prompt } => println!("[{}] > {}", index, prompt),
///             Event::ProviderEnd { provider, ok } => println!("{} ok={}", provider, ok),
///             _ => {}
///         }
///     }
/// }
/// ```
pub trait EventHandler: Send + Sync {
    /// Called when a chain emits an event.
    fn on_event(&self, event: Event);
}

/// An [`EventHandler`] backed by a closure.
///
/// # Example
///
/// ```
/// use llm_chainable::events::{Event, FnEventHandler};
/// use std::sync::Arc;
///
/// let handler = Arc::new(FnEventHandler(|event: Event| {
///     if let Event::IterationEnd { iteration, .. } = event {
///         eprintln!("finished round {}", iteration);
///     }
/// }));
/// ```
pub struct FnEventHandler<F: Fn(Event) + Send + Sync>(pub F);

impl<F: Fn(Event) + Send + Sync> EventHandler for FnEventHandler<F> {
    fn on_event(&self, event: Event) {
        (self.0)(event);
    }
}
