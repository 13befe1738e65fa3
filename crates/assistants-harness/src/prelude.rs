//! Common imports for typical harness usage.
//!
//! This module intentionally exports the types most callers need so examples
//! and application code need fewer import lines.
pub use crate::{
    AbortHandle, AssistantsConfig, GenerateError, GenerationInputs, GenerationOutcome,
    GenerationReport, MemorySink, OpenAiAssistantsClient, Orchestrator, StateSink,
};
