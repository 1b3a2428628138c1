//! Example: a pipeline that asks a model, then post-processes the answer.
//!
//! Run with: `cargo run --example pipeline_chain`

use llm_chainable::{ChainError, Context, MockProvider, PipelineChain, Prompt, Provider};
use serde_json::{json, Value};
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let provider: Arc<dyn Provider> = Arc::new(MockProvider::fixed(
        "```json\n{\"name\": \"Captain Quasar\", \"power\": \"bends starlight\"}\n```",
    ));

    let model = provider.clone();
    let pipeline = PipelineChain::new("superhero")
        .add_sync_step(|value, ctx| {
            ctx.insert("subject", value.clone());
            let prompt = Prompt::from("Invent a superhero for {{subject}} as JSON.");
            Ok(json!(prompt.resolve(ctx)))
        })
        .add_step(move |value, _ctx| {
            let model = model.clone();
            Box::pin(async move {
                let prompt = value.as_str().unwrap_or_default().to_string();
                model.generate_response(&prompt).await.map(Value::String)
            })
        })
        .add_sync_step(|value, _ctx| {
            let raw = value.as_str().unwrap_or_default();
            llm_chainable::parsing::parse_as::<Value>(raw)
        })
        .add_sync_step(|value, _ctx| {
            let name = value["name"]
                .as_str()
                .ok_or_else(|| ChainError::Other("model did not name the hero".to_string()))?;
            let power = value["power"].as_str().unwrap_or("no known powers");
            Ok(json!({ "hero": name, "card": format!("{} ({})", name, power) }))
        });

    let mut ctx = Context::new();
    let card = pipeline.run_with(json!("a shy astronomer"), &mut ctx).await?;

    println!("{} steps ran for '{}'", pipeline.len(), pipeline.name());
    println!("{}", serde_json::to_string_pretty(&card)?);

    Ok(())
}
