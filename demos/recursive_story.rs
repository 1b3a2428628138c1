//! Example: grow a story over several rounds, printing progress events.
//!
//! Run with: `cargo run --example recursive_story`

use llm_chainable::events::{Event, FnEventHandler};
use llm_chainable::{Context, MockProvider, Prompt, ProviderDispatch, RecursiveChain};
use std::sync::Arc;
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let provider = MockProvider::new(vec![
        "Once upon a time, a fox found a map.".to_string(),
        "The map led to a village of talking owls.".to_string(),
        "The owls asked the fox to guard their library.".to_string(),
        "And the fox became the wisest reader in the forest.".to_string(),
    ])
    .with_name("storyteller");

    let handler = Arc::new(FnEventHandler(|event: Event| {
        if let Event::IterationEnd {
            iteration,
            max_iterations,
        } = event
        {
            eprintln!("round {}/{} done", iteration, max_iterations);
        }
    }));

    let ctx = Context::builder()
        .var("hero", "a curious fox")
        .dispatch_timeout(Duration::from_secs(30))
        .event_handler(handler)
        .build();

    let prompts = vec![Prompt::template(|ctx: &Context| {
        match ctx.get_str("previousOutput") {
            Some(previous) => format!("Continue this story: {}", previous),
            None => "Start a bedtime story about {{hero}}.".to_string(),
        }
    })];

    let (story, ctx) = RecursiveChain::new(4)
        .run(ctx, &provider, &ProviderDispatch, &prompts)
        .await?;

    println!("After {} rounds:", ctx.get("iteration").cloned().unwrap_or_default());
    println!("{}", story);
    println!("\nPrompts sent:");
    for prompt in provider.prompts() {
        println!("  > {}", prompt);
    }

    Ok(())
}
