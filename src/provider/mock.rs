//! Mock provider for testing without a live LLM.
//!
//! [`MockProvider`] answers from canned responses, echoes prompts back, or
//! fails on demand, allowing deterministic tests of every chain shape.
//!
//! # Example
//!
//! ```
//! use llm_chainable::MockProvider;
//!
//! let mock = MockProvider::new(vec!["Hello, world!".to_string()]).with_name("greeter");
//! ```

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use super::Provider;
use crate::error::{ChainError, Result};

#[derive(Debug)]
enum Behavior {
    Canned(Vec<String>),
    Echo,
    Fail(String),
}

/// A test provider with scripted behavior.
///
/// Canned responses are returned in order and cycle back to the beginning
/// when exhausted. Every prompt received is recorded.
#[derive(Debug)]
pub struct MockProvider {
    name: String,
    behavior: Behavior,
    index: AtomicUsize,
    delay: Option<Duration>,
    received: Mutex<Vec<String>>,
}

impl MockProvider {
    /// Create a mock provider with the given canned responses.
    ///
    /// Responses are returned in order. When exhausted, cycles from the beginning.
    pub fn new(responses: Vec<String>) -> Self {
        assert!(!responses.is_empty(), "MockProvider requires at least one response");
        Self::with_behavior(Behavior::Canned(responses))
    }

    /// Create a mock that always returns the same response.
    pub fn fixed(response: impl Into<String>) -> Self {
        Self::new(vec![response.into()])
    }

    /// Create a mock that answers `"Response to {prompt}"`.
    pub fn echo() -> Self {
        Self::with_behavior(Behavior::Echo)
    }

    /// Create a mock whose every call fails with [`ChainError::Provider`].
    pub fn failing(message: impl Into<String>) -> Self {
        Self::with_behavior(Behavior::Fail(message.into()))
    }

    fn with_behavior(behavior: Behavior) -> Self {
        Self {
            name: "mock".to_string(),
            behavior,
            index: AtomicUsize::new(0),
            delay: None,
            received: Mutex::new(Vec::new()),
        }
    }

    /// Set the display name. Default: `"mock"`.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Sleep before answering, to exercise concurrent runs.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Every prompt received so far, in arrival order.
    pub fn prompts(&self) -> Vec<String> {
        self.received
            .lock()
            .map(|received| received.clone())
            .unwrap_or_default()
    }

    /// Number of calls received so far.
    pub fn call_count(&self) -> usize {
        self.received
            .lock()
            .map(|received| received.len())
            .unwrap_or_default()
    }

    fn record(&self, prompt: &str) {
        if let Ok(mut received) = self.received.lock() {
            received.push(prompt.to_string());
        }
    }
}

#[async_trait]
impl Provider for MockProvider {
    async fn generate_response(&self, prompt: &str) -> Result<String> {
        self.record(prompt);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        match &self.behavior {
            Behavior::Canned(responses) => {
                let idx = self.index.fetch_add(1, Ordering::Relaxed) % responses.len();
                Ok(responses[idx].clone())
            }
            Behavior::Echo => Ok(format!("Response to {}", prompt)),
            Behavior::Fail(message) => Err(ChainError::Provider {
                provider: self.name.clone(),
                message: message.clone(),
            }),
        }
    }

    fn name(&self) -> String {
        self.name.clone()
    }
}

impl fmt::Display for MockProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}
