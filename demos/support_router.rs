//! Example: route customer questions to different chains by context.
//!
//! Run with: `cargo run --example support_router`

use llm_chainable::dispatch::dispatch_fn;
use llm_chainable::{
    chain_fn, ConditionalChain, Context, MockProvider, Prompt, Provider, RecursiveChain,
    TemplateExecutor,
};
use serde_json::json;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let provider = MockProvider::echo().with_name("support-bot");

    // Prefix every prompt with a persona before it reaches the provider.
    let dispatch = dispatch_fn(|provider: &MockProvider, prompt: &str, _ctx: &Context| {
        let decorated = format!("[friendly agent] {}", prompt);
        Box::pin(async move { provider.generate_response(&decorated).await })
    });

    let router = ConditionalChain::<MockProvider>::new("support")
        .add_branch(
            |ctx: &Context| ctx.get_str("category") == Some("billing"),
            TemplateExecutor,
        )
        .add_branch(
            |ctx: &Context| ctx.get_str("category") == Some("technical"),
            RecursiveChain::new(2),
        )
        .set_default_branch(chain_fn::<MockProvider, _>(|ctx, _provider, _dispatch, _prompts| {
            let customer = ctx.get_str("customer").unwrap_or("there").to_string();
            Box::pin(async move {
                Ok(json!(format!("Hi {}, a human agent will contact you shortly.", customer)))
            })
        }));

    let prompts = vec![Prompt::from("{{customer}} asks: {{question}}")];
    let tickets = [
        ("Ana", "billing", "Why was I charged twice?"),
        ("Bo", "technical", "The app crashes on startup."),
        ("Cy", "other", "Can I change my username?"),
    ];

    for (customer, category, question) in tickets {
        let mut ctx = Context::new()
            .with("customer", customer)
            .with("category", category)
            .with("question", question)
            .with("conversation", json!([]));

        let answer = router.run(&mut ctx, &provider, &dispatch, &prompts).await?;
        println!("{} ({}): {}", customer, category, answer);
        println!(
            "  transcript entries: {}",
            ctx.get("conversation")
                .and_then(|c| c.as_array())
                .map_or(0, Vec::len)
        );
    }

    Ok(())
}
