//! Runs one generation and prints the final report plus the step transcript.
//!
//! ```sh
//! OPENAI_API_KEY=sk-... cargo run --example collect_report -- <assistant_id> "your prompt"
//! ```

use std::sync::Arc;

use assistants_harness::prelude::*;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), GenerateError> {
    let mut args = std::env::args().skip(1);
    let assistant_id = args.next().unwrap_or_else(|| {
        eprintln!("usage: collect_report <assistant_id> <prompt>");
        std::process::exit(2);
    });
    let prompt = args.next().unwrap_or_else(|| "Say hello".to_string());

    let config = AssistantsConfig::from_env()?;
    let api_key = config.api_key.clone();
    let api = Arc::new(OpenAiAssistantsClient::new(config)?);
    let sink = Arc::new(MemorySink::new());
    let orchestrator = Orchestrator::new(api, sink);

    let report = orchestrator
        .generate(GenerationInputs::new(api_key, assistant_id, prompt))
        .await;

    println!("--- transcript ---");
    for line in &report.log {
        println!("{line}");
    }
    println!("--- output ---");
    println!("{}", report.output);
    if let Some(thread_id) = &report.thread_id {
        println!("thread: {thread_id}");
    }
    if let (Some(tokens), Some(seconds)) = (report.tokens, report.response_time) {
        println!("~{tokens} tokens in {seconds:.2}s");
    }

    if let GenerationOutcome::Failed(err) = report.outcome {
        eprintln!("generation failed: {err}");
        std::process::exit(1);
    }
    Ok(())
}
