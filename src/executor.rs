//! The template-execution primitive every chain builds on.
//!
//! [`TemplateExecutor::run`] resolves each prompt against the current
//! context, sends it through the dispatch, and collects the answers next to
//! the exact prompts that produced them.

use crate::chainable::{BoxFut, Chainable};
use crate::context::{Context, CONVERSATION};
use crate::dispatch::Dispatch;
use crate::error::{ChainError, Result};
use crate::events::Event;
use crate::prompt::Prompt;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Answers of one [`TemplateExecutor::run`], aligned with the prompt list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecutionOutput {
    /// One response per prompt, in prompt order.
    pub outputs: Vec<String>,
    /// The exact strings sent to dispatch, in prompt order.
    pub resolved_prompts: Vec<String>,
}

impl ExecutionOutput {
    /// The response to the last prompt, if any prompt was run.
    pub fn last_output(&self) -> Option<&str> {
        self.outputs.last().map(String::as_str)
    }
}

/// Runs a prompt list against one provider.
///
/// Stateless; as a [`Chainable`] it returns the [`ExecutionOutput`]
/// serialized to JSON.
#[derive(Debug, Clone, Copy, Default)]
pub struct TemplateExecutor;

impl TemplateExecutor {
    /// Resolve and dispatch every prompt in order.
    ///
    /// Each prompt is resolved against the context as it stands at that
    /// moment, so template prompts observe anything earlier calls wrote. When
    /// the context holds a `conversation` array, a `{question, answer}` entry
    /// is appended after every successful call.
    ///
    /// The first dispatch error aborts the run and is returned unchanged.
    /// Context changes made before the failure are kept.
    ///
    /// # Example
    ///
    /// ```
    /// use llm_chainable::{Context, MockProvider, Prompt, ProviderDispatch, TemplateExecutor};
    ///
    /// # tokio_test::block_on(async {
    /// let mut ctx = Context::new().with("name", "Alice");
    /// let prompts = vec![Prompt::from("Hello {{name}}"), Prompt::from("How are you?")];
    ///
    /// let run = TemplateExecutor::run(&mut ctx, &MockProvider::echo(), &ProviderDispatch, &prompts)
    ///     .await
    ///     .unwrap();
    ///
    /// assert_eq!(run.outputs, vec!["Response to Hello Alice", "Response to How are you?"]);
    /// assert_eq!(run.resolved_prompts, vec!["Hello Alice", "How are you?"]);
    /// # });
    /// ```
    pub async fn run<P>(
        context: &mut Context,
        provider: &P,
        dispatch: &dyn Dispatch<P>,
        prompts: &[Prompt],
    ) -> Result<ExecutionOutput>
    where
        P: ?Sized + Sync,
    {
        let mut output = ExecutionOutput {
            outputs: Vec::with_capacity(prompts.len()),
            resolved_prompts: Vec::with_capacity(prompts.len()),
        };

        for (index, prompt) in prompts.iter().enumerate() {
            context.check_cancelled()?;

            let resolved = prompt.resolve(context);
            output.resolved_prompts.push(resolved.clone());
            context.emit(Event::PromptStart {
                index,
                prompt: resolved.clone(),
            });

            let result = Self::dispatch_once(context, provider, dispatch, &resolved).await;
            context.emit(Event::PromptEnd {
                index,
                ok: result.is_ok(),
            });
            let response = result?;

            if let Some(Value::Array(turns)) = context.get_mut(CONVERSATION) {
                turns.push(json!({ "question": resolved, "answer": response }));
            }
            output.outputs.push(response);
        }

        Ok(output)
    }

    async fn dispatch_once<P>(
        context: &Context,
        provider: &P,
        dispatch: &dyn Dispatch<P>,
        prompt: &str,
    ) -> Result<String>
    where
        P: ?Sized + Sync,
    {
        match context.dispatch_timeout() {
            Some(limit) => tokio::time::timeout(limit, dispatch.dispatch(provider, prompt, context))
                .await
                .map_err(|_| ChainError::Timeout(limit))?,
            None => dispatch.dispatch(provider, prompt, context).await,
        }
    }

    /// Render a list of results as a delimited, human-readable report.
    ///
    /// Each entry gets its own section headed by a chain marker that grows by
    /// one link per entry.
    ///
    /// ```
    /// use llm_chainable::TemplateExecutor;
    ///
    /// let report = TemplateExecutor::to_delim_text("Story", &["a".to_string(), "b".to_string()]);
    /// assert!(report.contains("🔗 -------- Prompt Chain Result #1"));
    /// assert!(report.contains("🔗🔗 -------- Prompt Chain Result #2"));
    /// ```
    pub fn to_delim_text(title: &str, contents: &[String]) -> String {
        let mut report = format!("{}\n\n", title);
        for (i, content) in contents.iter().enumerate() {
            let marker = "🔗".repeat(i + 1);
            report.push_str(&format!(
                "{} -------- Prompt Chain Result #{} -------------\n\n",
                marker,
                i + 1
            ));
            report.push_str(content);
            report.push_str("\n\n");
        }
        report
    }
}

impl<P: ?Sized + Sync> Chainable<P> for TemplateExecutor {
    fn kind(&self) -> &'static str {
        "template"
    }

    fn execute<'a>(
        &'a self,
        context: &'a mut Context,
        provider: &'a P,
        dispatch: &'a dyn Dispatch<P>,
        prompts: &'a [Prompt],
    ) -> BoxFut<'a, Result<Value>> {
        Box::pin(async move {
            let output = Self::run(context, provider, dispatch, prompts).await?;
            Ok(serde_json::to_value(output)?)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::{dispatch_fn, ProviderDispatch};
    use crate::events::FnEventHandler;
    use crate::provider::MockProvider;
    use std::sync::atomic::AtomicBool;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    fn prompts(items: &[&str]) -> Vec<Prompt> {
        items.iter().map(|p| Prompt::from(*p)).collect()
    }

    #[tokio::test]
    async fn test_run_fills_and_dispatches() {
        let mut ctx = Context::new().with("name", "Alice");
        let provider = MockProvider::echo();

        let run = TemplateExecutor::run(
            &mut ctx,
            &provider,
            &ProviderDispatch,
            &prompts(&["Hello {{name}}", "How are you?"]),
        )
        .await
        .unwrap();

        assert_eq!(
            run.outputs,
            vec!["Response to Hello Alice", "Response to How are you?"]
        );
        assert_eq!(run.resolved_prompts, vec!["Hello Alice", "How are you?"]);
        assert_eq!(provider.call_count(), 2);
    }

    #[tokio::test]
    async fn test_run_function_prompts() {
        let mut ctx = Context::new().with("name", "Bob");
        let prompts = vec![
            Prompt::from("Hello {{name}}"),
            Prompt::template(|ctx: &Context| {
                format!("How are you, {}?", ctx.get_str("name").unwrap_or_default())
            }),
        ];

        let run = TemplateExecutor::run(&mut ctx, &MockProvider::echo(), &ProviderDispatch, &prompts)
            .await
            .unwrap();

        assert_eq!(
            run.outputs,
            vec!["Response to Hello Bob", "Response to How are you, Bob?"]
        );
        assert_eq!(run.resolved_prompts, vec!["Hello Bob", "How are you, Bob?"]);
    }

    #[tokio::test]
    async fn test_run_empty_prompt_list() {
        let mut ctx = Context::new();
        let run = TemplateExecutor::run(&mut ctx, &MockProvider::echo(), &ProviderDispatch, &[])
            .await
            .unwrap();
        assert!(run.outputs.is_empty());
        assert!(run.resolved_prompts.is_empty());
        assert_eq!(run.last_output(), None);
    }

    #[tokio::test]
    async fn test_run_propagates_dispatch_error() {
        let mut ctx = Context::new().with("name", "Charlie");
        let provider = MockProvider::failing("Test error").with_name("broken");

        let result = TemplateExecutor::run(
            &mut ctx,
            &provider,
            &ProviderDispatch,
            &prompts(&["Hello {{name}}", "never sent"]),
        )
        .await;

        match result {
            Err(ChainError::Provider { provider, message }) => {
                assert_eq!(provider, "broken");
                assert_eq!(message, "Test error");
            }
            other => panic!("expected provider error, got {:?}", other),
        }
        assert_eq!(provider.call_count(), 1);
    }

    #[tokio::test]
    async fn test_template_prompt_sees_earlier_mutation() {
        // The dispatch writes into the context; it is read by the next prompt.
        let dispatch = dispatch_fn(|_p: &(), prompt: &str, _ctx: &Context| {
            let answer = format!("<{}>", prompt);
            Box::pin(async move { Ok(answer) })
        });
        let mut ctx = Context::new().with(CONVERSATION, json!([]));
        let prompts = vec![
            Prompt::from("first"),
            Prompt::template(|ctx: &Context| {
                let turns = ctx.get(CONVERSATION).and_then(Value::as_array).map_or(0, Vec::len);
                format!("turns so far: {}", turns)
            }),
        ];

        let run = TemplateExecutor::run(&mut ctx, &(), &dispatch, &prompts).await.unwrap();
        assert_eq!(run.resolved_prompts[1], "turns so far: 1");
        assert_eq!(
            ctx.get(CONVERSATION),
            Some(&json!([
                { "question": "first", "answer": "<first>" },
                { "question": "turns so far: 1", "answer": "<turns so far: 1>" }
            ]))
        );
    }

    #[tokio::test]
    async fn test_no_conversation_key_means_no_transcript() {
        let mut ctx = Context::new();
        TemplateExecutor::run(&mut ctx, &MockProvider::echo(), &ProviderDispatch, &prompts(&["x"]))
            .await
            .unwrap();
        assert!(!ctx.contains_key(CONVERSATION));
    }

    #[tokio::test]
    async fn test_run_cancelled_before_dispatch() {
        let cancel = Arc::new(AtomicBool::new(true));
        let mut ctx = Context::builder().cancellation(Some(cancel)).build();
        let provider = MockProvider::echo();

        let result =
            TemplateExecutor::run(&mut ctx, &provider, &ProviderDispatch, &prompts(&["x"])).await;
        assert!(matches!(result, Err(ChainError::Cancelled)));
        assert_eq!(provider.call_count(), 0);
    }

    #[tokio::test]
    async fn test_run_dispatch_timeout() {
        let mut ctx = Context::builder()
            .dispatch_timeout(Duration::from_millis(10))
            .build();
        let provider = MockProvider::echo().with_delay(Duration::from_secs(5));

        let result =
            TemplateExecutor::run(&mut ctx, &provider, &ProviderDispatch, &prompts(&["slow"])).await;
        assert!(matches!(result, Err(ChainError::Timeout(_))));
    }

    #[tokio::test]
    async fn test_run_emits_prompt_events() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let mut ctx = Context::builder()
            .var("name", "Eve")
            .event_handler(Arc::new(FnEventHandler(move |event: Event| {
                sink.lock().unwrap().push(event);
            })))
            .build();

        TemplateExecutor::run(&mut ctx, &MockProvider::echo(), &ProviderDispatch, &prompts(&["Hi {{name}}"]))
            .await
            .unwrap();

        let events = seen.lock().unwrap();
        assert_eq!(events.len(), 2);
        assert!(matches!(&events[0], Event::PromptStart { index: 0, prompt } if prompt == "Hi Eve"));
        assert!(matches!(events[1], Event::PromptEnd { index: 0, ok: true }));
    }

    #[tokio::test]
    async fn test_execute_as_chainable() {
        let mut ctx = Context::new().with("topic", "rust");
        let value = TemplateExecutor
            .execute(&mut ctx, &MockProvider::echo(), &ProviderDispatch, &prompts(&["{{topic}}"]))
            .await
            .unwrap();
        assert_eq!(value["outputs"], json!(["Response to rust"]));
        assert_eq!(value["resolved_prompts"], json!(["rust"]));
    }

    #[test]
    fn test_to_delim_text() {
        let content = vec!["First response".to_string(), "Second response".to_string()];
        let result = TemplateExecutor::to_delim_text("TestChain", &content);

        let expected = "TestChain\n\n\
            🔗 -------- Prompt Chain Result #1 -------------\n\n\
            First response\n\n\
            🔗🔗 -------- Prompt Chain Result #2 -------------\n\n\
            Second response\n\n";
        assert_eq!(result, expected);
    }

    #[test]
    fn test_to_delim_text_empty() {
        assert_eq!(TemplateExecutor::to_delim_text("T", &[]), "T\n\n");
    }
}
