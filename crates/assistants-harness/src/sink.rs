use std::sync::{Mutex, MutexGuard, PoisonError};

/// Host boundary the orchestrator publishes into.
///
/// Each method corresponds to one host state key or terminal signal. The
/// latest value published for a key is authoritative. The transcript, output
/// and thread id are republished after every logged step; the response time
/// and token estimate are published exactly once at finalization, and exactly
/// one of the two terminal signals fires per invocation.
pub trait StateSink: Send + Sync {
    /// Publishes the full log transcript, newline-joined (`log` key).
    fn publish_log(&self, transcript: &str);
    /// Publishes the current accumulated or final output (`output` key).
    fn publish_output(&self, output: &str);
    /// Publishes the resolved thread id (`thread_id` key).
    fn publish_thread_id(&self, thread_id: &str);
    /// Publishes the elapsed wall-clock seconds (`response_time` key).
    fn publish_response_time(&self, seconds: f64);
    /// Publishes the token estimate (`tokens` key).
    fn publish_tokens(&self, tokens: usize);
    /// Signals that the invocation finalized successfully.
    fn generation_completed(&self);
    /// Signals that the invocation finalized on the error path.
    fn generation_error(&self);
}

/// Everything a [`MemorySink`] has observed so far.
///
/// `outputs` keeps the full publish history in order; the last entry is the
/// current value.
#[derive(Clone, Debug, Default)]
pub struct MemorySinkState {
    pub log: String,
    pub outputs: Vec<String>,
    pub thread_id: Option<String>,
    pub response_time: Option<f64>,
    pub tokens: Option<usize>,
    pub completed_signals: usize,
    pub error_signals: usize,
}

/// In-memory [`StateSink`] for tests and hosts without their own state store.
#[derive(Default)]
pub struct MemorySink {
    inner: Mutex<MemorySinkState>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copies out the current state.
    pub fn snapshot(&self) -> MemorySinkState {
        self.state().clone()
    }

    /// The latest published output, or an empty string.
    pub fn output(&self) -> String {
        self.state().outputs.last().cloned().unwrap_or_default()
    }

    fn state(&self) -> MutexGuard<'_, MemorySinkState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl StateSink for MemorySink {
    fn publish_log(&self, transcript: &str) {
        self.state().log = transcript.to_string();
    }

    fn publish_output(&self, output: &str) {
        self.state().outputs.push(output.to_string());
    }

    fn publish_thread_id(&self, thread_id: &str) {
        self.state().thread_id = Some(thread_id.to_string());
    }

    fn publish_response_time(&self, seconds: f64) {
        self.state().response_time = Some(seconds);
    }

    fn publish_tokens(&self, tokens: usize) {
        self.state().tokens = Some(tokens);
    }

    fn generation_completed(&self) {
        self.state().completed_signals += 1;
    }

    fn generation_error(&self) {
        self.state().error_signals += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_sink_keeps_output_history_in_order() {
        let sink = MemorySink::new();
        sink.publish_output("a");
        sink.publish_output("ab");
        assert_eq!(sink.output(), "ab");
        assert_eq!(sink.snapshot().outputs, vec!["a", "ab"]);
    }

    #[test]
    fn memory_sink_counts_terminal_signals() {
        let sink = MemorySink::new();
        sink.generation_completed();
        let state = sink.snapshot();
        assert_eq!(state.completed_signals, 1);
        assert_eq!(state.error_signals, 0);
    }
}
