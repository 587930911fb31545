use std::sync::Arc;

use gateway_harness::prelude::*;
use gateway_harness::vendors::echo::EchoProvider;
use gateway_harness::vendors::openrouter::OpenRouterProvider;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), HarnessError> {
    let harness = Harness::builder()
        .register_provider(Arc::new(EchoProvider::default()))
        .register_provider(Arc::new(OpenRouterProvider::from_env()?))
        .build()?;

    if !harness.is_available("openrouter") {
        eprintln!("OPENROUTER_API_KEY is not set");
        return Ok(());
    }

    let summary = harness
        .run()
        .provider("openrouter")
        .prompt("Reply with a short sentence.")
        .max_tokens(64)
        .collect()
        .await?;

    println!("{}", summary.content);
    if let Some(usage) = summary.usage {
        println!("{} prompt + {} completion tokens", usage.prompt_tokens, usage.completion_tokens);
    }
    Ok(())
}
