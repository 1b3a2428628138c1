//! Prompts and `{{key}}` substitution.

use crate::context::{display_value, Context};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

const OPEN: &str = "{{";
const CLOSE: &str = "}}";

/// A prompt computed from the current context.
pub type TemplateFn = Arc<dyn Fn(&Context) -> String + Send + Sync>;

/// A prompt handed to a chain.
///
/// Either a literal string with zero or more `{{key}}` placeholders, or a
/// function of the current [`Context`] evaluated immediately before
/// substitution. Function prompts let later prompts (or later recursive
/// rounds) adapt to what earlier calls wrote into the context.
///
/// # Example
///
/// ```
/// use llm_chainable::{Context, Prompt};
///
/// let ctx = Context::new().with("name", "Alice").with("iteration", 2);
///
/// let literal = Prompt::from("Hello {{name}}");
/// let computed = Prompt::template(|ctx: &Context| {
///     format!("Round {} for {{{{name}}}}", ctx.get("iteration").unwrap())
/// });
///
/// assert_eq!(literal.resolve(&ctx), "Hello Alice");
/// assert_eq!(computed.resolve(&ctx), "Round 2 for Alice");
/// ```
#[derive(Clone)]
pub enum Prompt {
    Literal(String),
    Template(TemplateFn),
}

impl Prompt {
    pub fn literal(text: impl Into<String>) -> Self {
        Prompt::Literal(text.into())
    }

    pub fn template<F>(f: F) -> Self
    where
        F: Fn(&Context) -> String + Send + Sync + 'static,
    {
        Prompt::Template(Arc::new(f))
    }

    /// Evaluate against `context` and substitute placeholders.
    ///
    /// The result is the exact text sent to dispatch.
    pub fn resolve(&self, context: &Context) -> String {
        match self {
            Prompt::Literal(text) => render(text, context),
            Prompt::Template(f) => render(&f(context), context),
        }
    }
}

impl From<&str> for Prompt {
    fn from(text: &str) -> Self {
        Prompt::Literal(text.to_string())
    }
}

impl From<String> for Prompt {
    fn from(text: String) -> Self {
        Prompt::Literal(text)
    }
}

impl fmt::Debug for Prompt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Prompt::Literal(text) => f.debug_tuple("Literal").field(text).finish(),
            Prompt::Template(_) => f.write_str("Template(<fn>)"),
        }
    }
}

/// Replace every `{{key}}` whose key is present in `context`.
///
/// Placeholders for absent keys stay verbatim. Substituted text is never
/// scanned again, so a value containing `{{other}}` is inserted literally.
/// Keys may themselves contain `}`: every `}}` after an opening `{{` is tried
/// as the closer, up to the next `{{`, and the shortest present key wins.
///
/// # Example
///
/// ```
/// use llm_chainable::{Context, prompt::render};
///
/// let ctx = Context::new().with("name", "Alice");
/// let result = render("Hi {{name}}, meet {{name}} and {{missing}}", &ctx);
/// assert_eq!(result, "Hi Alice, meet Alice and {{missing}}");
/// ```
pub fn render(template: &str, context: &Context) -> String {
    let mut rendered = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find(OPEN) {
        rendered.push_str(&rest[..start]);
        let after_open = &rest[start + OPEN.len()..];

        if !after_open.contains(CLOSE) {
            rest = &rest[start..];
            break;
        }

        match placeholder(after_open, context) {
            Some((end, value)) => {
                rendered.push_str(&display_value(value));
                rest = &after_open[end + CLOSE.len()..];
            }
            None => {
                // Emit one brace and rescan: "{{{{name}}" still finds "{{name}}".
                rendered.push('{');
                rest = &rest[start + 1..];
            }
        }
    }

    rendered.push_str(rest);
    rendered
}

/// The first present key in `after_open`, with the offset of its closer.
fn placeholder<'c>(after_open: &str, context: &'c Context) -> Option<(usize, &'c Value)> {
    after_open
        .char_indices()
        .map(|(i, _)| i)
        .filter(|&i| after_open[i..].starts_with(CLOSE))
        .take_while(|&end| !after_open[..end].contains(OPEN))
        .find_map(|end| context.get(&after_open[..end]).map(|value| (end, value)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_render_basic() {
        let ctx = Context::new().with("name", "Alice");
        assert_eq!(render("Hello {{name}}", &ctx), "Hello Alice");
    }

    #[test]
    fn test_render_every_occurrence() {
        let ctx = Context::new().with("x", "1").with("y", "2");
        assert_eq!(render("{{x}}{{y}}{{x}} {{y}}", &ctx), "121 2");
    }

    #[test]
    fn test_render_absent_key_verbatim() {
        let ctx = Context::new().with("name", "Alice");
        let template = "Dear {{ name }}, {{unknown}} and {{name";
        assert_eq!(render(template, &ctx), "Dear {{ name }}, {{unknown}} and {{name");
    }

    #[test]
    fn test_render_no_placeholders() {
        let ctx = Context::new();
        assert_eq!(render("static prompt", &ctx), "static prompt");
    }

    #[test]
    fn test_render_non_string_values() {
        let ctx = Context::new()
            .with("count", 3)
            .with("flags", json!([true, false]));
        assert_eq!(render("{{count}} {{flags}}", &ctx), "3 [true,false]");
    }

    #[test]
    fn test_render_does_not_rescan_values() {
        let ctx = Context::new().with("a", "{{b}}").with("b", "nope");
        assert_eq!(render("{{a}}", &ctx), "{{b}}");
    }

    #[test]
    fn test_render_nested_braces() {
        let ctx = Context::new().with("name", "Alice");
        assert_eq!(render("{{{{name}}", &ctx), "{{Alice");
    }

    #[test]
    fn test_render_key_ending_in_brace() {
        let ctx = Context::new().with("x}", "V");
        assert_eq!(render("{{x}}}", &ctx), "V");
        assert_eq!(render("[{{x}}}] {{x}}", &ctx), "[V] {{x}}");
    }

    #[test]
    fn test_render_shortest_present_key_wins() {
        let ctx = Context::new().with("a", "A").with("a}", "B");
        assert_eq!(render("{{a}}}", &ctx), "A}");
    }

    #[test]
    fn test_render_unicode_around_placeholder() {
        let ctx = Context::new().with("who", "Zoë");
        assert_eq!(render("🔗 {{who}} 🔗", &ctx), "🔗 Zoë 🔗");
    }

    #[test]
    fn test_template_prompt_sees_context() {
        let prompt = Prompt::template(|ctx: &Context| {
            format!("Continue from {}", ctx.get_str("previousOutput").unwrap_or("nothing"))
        });
        let ctx = Context::new().with("previousOutput", "once upon a time");
        assert_eq!(prompt.resolve(&ctx), "Continue from once upon a time");
    }

    #[test]
    fn test_template_prompt_output_is_substituted() {
        let prompt = Prompt::template(|_ctx: &Context| "Hi {{name}}".to_string());
        let ctx = Context::new().with("name", "Bob");
        assert_eq!(prompt.resolve(&ctx), "Hi Bob");
    }
}
