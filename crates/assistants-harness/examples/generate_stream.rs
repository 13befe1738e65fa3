//! Streams one assistant answer to stdout as it is generated.
//!
//! ```sh
//! OPENAI_API_KEY=sk-... cargo run --example generate_stream -- <assistant_id> "your prompt"
//! ```

use std::io::Write as _;
use std::sync::{Arc, Mutex};

use assistants_harness::prelude::*;

/// Prints only the newly appended portion of each output publish.
#[derive(Default)]
struct StdoutSink {
    printed: Mutex<usize>,
}

impl StateSink for StdoutSink {
    fn publish_log(&self, _transcript: &str) {}

    fn publish_output(&self, output: &str) {
        let mut printed = match self.printed.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if output.len() > *printed {
            print!("{}", &output[*printed..]);
            let _ = std::io::stdout().flush();
            *printed = output.len();
        }
    }

    fn publish_thread_id(&self, thread_id: &str) {
        let _ = thread_id;
    }

    fn publish_response_time(&self, seconds: f64) {
        eprintln!("\n[{seconds:.2}s]");
    }

    fn publish_tokens(&self, _tokens: usize) {}

    fn generation_completed(&self) {}

    fn generation_error(&self) {}
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), GenerateError> {
    let mut args = std::env::args().skip(1);
    let assistant_id = args.next().unwrap_or_else(|| {
        eprintln!("usage: generate_stream <assistant_id> <prompt>");
        std::process::exit(2);
    });
    let prompt = args.next().unwrap_or_else(|| "Say hello".to_string());

    let config = AssistantsConfig::from_env()?;
    let api_key = config.api_key.clone();
    let api = Arc::new(OpenAiAssistantsClient::new(config)?);
    let orchestrator = Orchestrator::new(api, Arc::new(StdoutSink::default()));

    let report = orchestrator
        .generate(GenerationInputs::new(api_key, assistant_id, prompt))
        .await;

    if let GenerationOutcome::Failed(err) = report.outcome {
        eprintln!("generation failed: {err}");
        std::process::exit(1);
    }
    Ok(())
}
