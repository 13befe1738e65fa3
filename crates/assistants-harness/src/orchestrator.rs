use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use futures::StreamExt as _;
use tokio::sync::watch;
use tracing::{Instrument as _, debug};

use crate::api::{AssistantApi, ByteStream};
use crate::errors::GenerateError;
use crate::events::AssistantStreamEvent;
use crate::sink::StateSink;
use crate::sse::AssistantEventDecoder;
use crate::waiter;

/// Output published when neither streaming nor the message fetch produced
/// any text. The invocation still finalizes as a success.
const NO_RESPONSE_MARKER: &str = "Error: No response generated.";

/// Inputs for one generation invocation.
///
/// `thread_id` continues an existing conversation; pass the host-cached id
/// here when one exists (a caller-supplied id takes precedence over any
/// cache, so the caller performs that merge). `api_key` is checked for
/// presence only — the client owns authentication and must be configured
/// with the same key.
#[derive(Clone, Debug)]
pub struct GenerationInputs {
    pub api_key: String,
    pub assistant_id: String,
    pub user_input: String,
    pub thread_id: Option<String>,
}

impl GenerationInputs {
    pub fn new(
        api_key: impl Into<String>,
        assistant_id: impl Into<String>,
        user_input: impl Into<String>,
    ) -> Self {
        Self {
            api_key: api_key.into(),
            assistant_id: assistant_id.into(),
            user_input: user_input.into(),
            thread_id: None,
        }
    }

    /// Continues the given thread instead of creating a new one.
    pub fn thread_id(mut self, thread_id: impl Into<String>) -> Self {
        self.thread_id = Some(thread_id.into());
        self
    }
}

/// Terminal outcome of an invocation.
#[derive(Clone, Debug, PartialEq)]
pub enum GenerationOutcome {
    /// Finalized successfully (including the placeholder-output case).
    Completed,
    /// Finalized on the error path.
    Failed(GenerateError),
}

/// Final state of one invocation, mirroring what was published to the sink.
///
/// `tokens` and `response_time` are `None` when the invocation failed; they
/// are only computed and published on the success path.
#[derive(Clone, Debug)]
pub struct GenerationReport {
    pub output: String,
    pub tokens: Option<usize>,
    pub response_time: Option<f64>,
    pub log: Vec<String>,
    pub thread_id: Option<String>,
    pub outcome: GenerationOutcome,
}

/// Handle used to request cancellation of a running invocation.
///
/// Cancellation is best-effort and surfaces as a normal error finalization
/// with [`GenerateError::Cancelled`].
#[derive(Clone)]
pub struct AbortHandle {
    tx: watch::Sender<bool>,
}

impl AbortHandle {
    /// Requests cancellation.
    pub fn abort(&self) {
        let _ = self.tx.send(true);
    }
}

/// Abort channel threaded through every suspension point.
///
/// In the disabled state (the default) awaits pass straight through, which
/// matches the original unbounded streaming/polling behavior exactly.
pub(crate) struct AbortSignal(Option<watch::Receiver<bool>>);

impl AbortSignal {
    pub(crate) fn disabled() -> Self {
        Self(None)
    }

    fn new(rx: Option<watch::Receiver<bool>>) -> Self {
        Self(rx)
    }

    /// Awaits `fut`, racing it against the abort signal when one is wired.
    pub(crate) async fn guard<F>(&mut self, fut: F) -> Result<F::Output, GenerateError>
    where
        F: Future,
    {
        let Some(rx) = self.0.as_mut() else {
            return Ok(fut.await);
        };
        if *rx.borrow() {
            return Err(GenerateError::Cancelled);
        }
        let mut fut = std::pin::pin!(fut);
        loop {
            let sender_gone = tokio::select! {
                changed = rx.changed() => match changed {
                    Ok(()) if *rx.borrow() => return Err(GenerateError::Cancelled),
                    Ok(()) => false,
                    Err(_) => true,
                },
                out = fut.as_mut() => return Ok(out),
            };
            if sender_gone {
                // The handle was dropped; the signal can never fire.
                return Ok(fut.await);
            }
        }
    }
}

/// Per-invocation mutable state: accumulated output, transcript, resolved
/// thread id. Every log append republishes the full state, so progress is
/// observable after each step rather than only at finalization.
struct Turn {
    sink: Arc<dyn StateSink>,
    log: Vec<String>,
    output: String,
    thread_id: Option<String>,
    started: Instant,
}

impl Turn {
    fn new(sink: Arc<dyn StateSink>) -> Self {
        Self {
            sink,
            log: Vec::new(),
            output: String::new(),
            thread_id: None,
            started: Instant::now(),
        }
    }

    fn log(&mut self, message: impl Into<String>) {
        let stamp = chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true);
        self.log.push(format!("[{stamp}] {}", message.into()));
        self.publish_state();
    }

    fn publish_state(&self) {
        self.sink.publish_log(&self.log.join("\n"));
        self.sink.publish_output(&self.output);
        if let Some(thread_id) = &self.thread_id {
            self.sink.publish_thread_id(thread_id);
        }
    }

    fn append_output(&mut self, fragment: &str) {
        self.output.push_str(fragment);
        self.publish_state();
    }

    fn finalize_success(self) -> GenerationReport {
        let response_time = self.started.elapsed().as_secs_f64();
        let tokens = self.output.split_whitespace().count();
        self.sink.publish_response_time(response_time);
        self.sink.publish_tokens(tokens);
        self.sink.generation_completed();
        GenerationReport {
            output: self.output,
            tokens: Some(tokens),
            response_time: Some(response_time),
            log: self.log,
            thread_id: self.thread_id,
            outcome: GenerationOutcome::Completed,
        }
    }

    fn finalize_error(mut self, err: GenerateError) -> GenerationReport {
        self.output = format!("Error: {err}");
        self.publish_state();
        self.sink.generation_error();
        GenerationReport {
            output: self.output,
            tokens: None,
            response_time: None,
            log: self.log,
            thread_id: self.thread_id,
            outcome: GenerationOutcome::Failed(err),
        }
    }
}

struct StreamedRun {
    run_id: Option<String>,
    completed: bool,
}

/// Sequences one full assistant exchange: thread resolution, message
/// submission, streamed run consumption, fallback status wait, fallback
/// message fetch, finalization.
pub struct Orchestrator {
    api: Arc<dyn AssistantApi>,
    sink: Arc<dyn StateSink>,
    abort_rx: Option<watch::Receiver<bool>>,
}

impl Orchestrator {
    pub fn new(api: Arc<dyn AssistantApi>, sink: Arc<dyn StateSink>) -> Self {
        Self {
            api,
            sink,
            abort_rx: None,
        }
    }

    /// Enables cooperative cancellation and returns the handle.
    ///
    /// Without this, streaming and polling are unbounded, matching the
    /// original behavior.
    pub fn abortable(mut self) -> (Self, AbortHandle) {
        let (tx, rx) = watch::channel(false);
        self.abort_rx = Some(rx);
        (self, AbortHandle { tx })
    }

    /// Runs one generation to a terminal outcome.
    ///
    /// Never returns an error: every failure is converted into the error
    /// finalization (output `"Error: <message>"`, error signal) and carried
    /// in the report's outcome. Exactly one terminal signal fires on the
    /// sink per invocation.
    pub async fn generate(&self, inputs: GenerationInputs) -> GenerationReport {
        let invocation_id = uuid::Uuid::new_v4();
        self.run_invocation(inputs)
            .instrument(tracing::debug_span!("generation", %invocation_id))
            .await
    }

    async fn run_invocation(&self, inputs: GenerationInputs) -> GenerationReport {
        let mut turn = Turn::new(self.sink.clone());
        let mut abort = AbortSignal::new(self.abort_rx.clone());

        turn.thread_id = inputs
            .thread_id
            .clone()
            .filter(|id| !id.trim().is_empty());
        turn.log("Starting generation process...");

        if inputs.api_key.trim().is_empty()
            || inputs.assistant_id.trim().is_empty()
            || inputs.user_input.trim().is_empty()
        {
            turn.log("Error: Missing required fields.");
            return turn.finalize_error(GenerateError::Validation);
        }

        match self.drive(&inputs, &mut turn, &mut abort).await {
            Ok(()) => turn.finalize_success(),
            Err(err) => turn.finalize_error(err),
        }
    }

    async fn drive(
        &self,
        inputs: &GenerationInputs,
        turn: &mut Turn,
        abort: &mut AbortSignal,
    ) -> Result<(), GenerateError> {
        let thread_id = self.resolve_thread(inputs, turn, abort).await?;

        turn.log(format!("Creating run for thread {thread_id}..."));
        let stream = match abort
            .guard(self.api.create_run(&thread_id, &inputs.assistant_id))
            .await?
        {
            Ok(stream) => stream,
            Err(err) => {
                turn.log(format!("Error creating run: {err}"));
                return Err(err.into());
            }
        };
        turn.log("Run created successfully. Starting to process streamed response...");

        let streamed = match self.consume_stream(stream, turn, abort).await {
            Ok(streamed) => streamed,
            Err(err) => {
                turn.log(format!("Error processing streamed response: {err}"));
                return Err(err);
            }
        };

        if !streamed.completed
            && let Some(run_id) = streamed.run_id.as_deref()
        {
            turn.log(format!("Waiting for run {run_id} to complete..."));
            if let Err(err) =
                waiter::wait_until_terminal(self.api.as_ref(), &thread_id, run_id, abort).await
            {
                turn.log(format!("Error checking run status: {err}"));
                return Err(err);
            }
        }

        if turn.output.trim().is_empty() {
            turn.log(format!("Fetching messages for thread {thread_id}..."));
            match abort.guard(self.api.list_messages(&thread_id)).await? {
                Ok(messages) => {
                    turn.log(format!("Fetched {} messages.", messages.len()));
                    if let Some(text) = messages.first().and_then(|m| m.first_text()) {
                        turn.output = text.to_string();
                        turn.publish_state();
                    }
                }
                Err(err) => {
                    turn.log(format!("Error fetching messages: {err}"));
                    return Err(err.into());
                }
            }
        }

        if turn.output.trim().is_empty() {
            turn.output = NO_RESPONSE_MARKER.to_string();
            turn.publish_state();
        }

        Ok(())
    }

    /// Exactly one of `create_thread`/`add_message` happens per invocation.
    async fn resolve_thread(
        &self,
        inputs: &GenerationInputs,
        turn: &mut Turn,
        abort: &mut AbortSignal,
    ) -> Result<String, GenerateError> {
        if let Some(thread_id) = turn.thread_id.clone() {
            turn.log("Adding message to thread...");
            match abort
                .guard(self.api.add_message(&thread_id, &inputs.user_input))
                .await?
            {
                Ok(()) => {
                    turn.log(format!("Message added to thread {thread_id} successfully."));
                    Ok(thread_id)
                }
                Err(err) => {
                    turn.log(format!("Error adding message to thread: {err}"));
                    Err(err.into())
                }
            }
        } else {
            turn.log("Creating thread...");
            let created = match abort
                .guard(self.api.create_thread(&inputs.user_input))
                .await?
            {
                Ok(id) => id,
                Err(err) => {
                    turn.log(format!("Error creating thread: {err}"));
                    return Err(err.into());
                }
            };
            if created.trim().is_empty() {
                return Err(GenerateError::protocol("Failed to create thread."));
            }
            turn.thread_id = Some(created.clone());
            turn.log(format!("Thread created successfully. Thread ID: {created}"));
            Ok(created)
        }
    }

    /// Consumes the run's byte stream, appending and republishing output for
    /// every delta fragment. Stops at the `[DONE]` sentinel, at an explicit
    /// completed status, or at end of stream. The stream is dropped (and the
    /// connection released) on every exit path.
    async fn consume_stream(
        &self,
        mut stream: ByteStream,
        turn: &mut Turn,
        abort: &mut AbortSignal,
    ) -> Result<StreamedRun, GenerateError> {
        let mut decoder = AssistantEventDecoder::new();
        let mut completed = false;

        'read: loop {
            let Some(chunk) = abort.guard(stream.next()).await? else {
                turn.log("Stream finished.");
                break;
            };
            let chunk = chunk?;
            for event in decoder.push_chunk(&chunk) {
                match event {
                    AssistantStreamEvent::OutputDelta { text } => turn.append_output(&text),
                    AssistantStreamEvent::Done => {
                        turn.log("Received [DONE] signal.");
                        completed = true;
                        break 'read;
                    }
                    AssistantStreamEvent::RunStatus { status } if status == "completed" => {
                        turn.log("Run completed signal received.");
                        completed = true;
                        break 'read;
                    }
                    AssistantStreamEvent::RunStatus { status } => {
                        debug!(%status, "run status update");
                    }
                    AssistantStreamEvent::Unparsable { raw } => {
                        turn.log(format!("Error parsing streamed frame. Raw data: {raw}"));
                    }
                }
            }
        }

        Ok(StreamedRun {
            run_id: decoder.first_seen_id().map(ToOwned::to_owned),
            completed,
        })
    }
}
