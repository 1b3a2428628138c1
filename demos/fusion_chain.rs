//! Example: three providers answer the same prompts, a judge model picks one.
//!
//! Run with: `cargo run --example fusion_chain`

use llm_chainable::{
    AiEvaluator, Context, FusionChain, MockProvider, Prompt, ProviderDispatch, TemplateExecutor,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let providers = vec![
        MockProvider::new(vec![
            "A lighthouse keeper befriends a whale.".to_string(),
            "The whale returns every winter with a new song.".to_string(),
        ])
        .with_name("storyteller-small"),
        MockProvider::new(vec![
            "A robot learns to bake bread.".to_string(),
            "Its loaves are terrible until it learns patience.".to_string(),
        ])
        .with_name("storyteller-medium"),
        MockProvider::new(vec![
            "Two rival chess clubs share one board.".to_string(),
            "They end up inventing a four-player variant.".to_string(),
        ])
        .with_name("storyteller-large"),
    ];

    // The judge scores each final answer in turn.
    let judge = MockProvider::new(vec![
        r#"{"scores": [7, 8], "overall_score": 7.5, "explanation": "warm"}"#.to_string(),
        r#"{"scores": [6, 6], "overall_score": 6.0, "explanation": "predictable"}"#.to_string(),
        r#"Here you go: {"scores": [9, 8], "overall_score": 8.5, "explanation": "inventive"}"#
            .to_string(),
    ])
    .with_name("judge");
    let evaluator = AiEvaluator::new(["creativity", "coherence"], (1.0, 10.0), judge)?;

    let prompts = vec![
        Prompt::from("Pitch a short story about {{theme}}."),
        Prompt::template(|ctx: &Context| {
            let earlier = ctx
                .get("previousAnswers")
                .and_then(|v| v.as_array())
                .map_or(0, Vec::len);
            format!("Give it an ending. ({} answers so far)", earlier)
        }),
    ];
    let ctx = Context::new().with("theme", "unlikely friendship");

    let chain = FusionChain::new(evaluator);
    let result = chain.run(&ctx, &providers, &ProviderDispatch, &prompts).await?;

    println!("{}", result);
    if let Some(best) = result.best_index() {
        if let Some(detail) = result.detailed_response(best) {
            println!("{}", detail);
        }
    }

    let finals: Vec<String> = result
        .all_prompt_responses()
        .iter()
        .filter_map(|outputs| outputs.last().cloned())
        .collect();
    println!("{}", TemplateExecutor::to_delim_text("Final answers", &finals));

    Ok(())
}
