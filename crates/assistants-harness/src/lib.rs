//! Async harness for OpenAI Assistants v2 conversations.
//!
//! One [`Orchestrator::generate`](orchestrator::Orchestrator::generate) call
//! drives a full exchange: resolve the thread, submit the user message, start
//! a streaming run, and recover a final answer through the status-poll and
//! message-fetch fallbacks when the stream ends without one. Progress is
//! published step by step into a [`StateSink`](sink::StateSink), so a host
//! UI can render the transcript and the growing output live.
//!
//! # Usage
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use assistants_harness::prelude::*;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), GenerateError> {
//! let api = Arc::new(OpenAiAssistantsClient::from_env()?);
//! let sink = Arc::new(MemorySink::new());
//! let orchestrator = Orchestrator::new(api, sink.clone());
//!
//! let report = orchestrator
//!     .generate(GenerationInputs::new(
//!         std::env::var("OPENAI_API_KEY").unwrap_or_default(),
//!         "asst_123",
//!         "Say hello",
//!     ))
//!     .await;
//!
//! println!("{}", report.output);
//! # Ok(())
//! # }
//! ```

/// Remote operation contract and response types.
pub mod api;
/// reqwest-backed Assistants v2 client.
pub mod client;
/// Client configuration.
pub mod config;
/// Public error types.
pub mod errors;
/// Normalized streaming events.
pub mod events;
/// Generation orchestration, inputs, reports, and cancellation.
pub mod orchestrator;
/// Common imports for typical usage.
pub mod prelude;
/// Host state publishing boundary.
pub mod sink;
/// Streamed frame decoding.
pub mod sse;

pub(crate) mod waiter;

pub use api::{AssistantApi, ByteStream, RunState, RunStatusKind, ThreadMessage};
pub use client::OpenAiAssistantsClient;
pub use config::AssistantsConfig;
pub use errors::{ApiError, GenerateError};
pub use events::AssistantStreamEvent;
pub use orchestrator::{
    AbortHandle, GenerationInputs, GenerationOutcome, GenerationReport, Orchestrator,
};
pub use sink::{MemorySink, MemorySinkState, StateSink};
pub use sse::AssistantEventDecoder;
