use std::pin::Pin;

use crate::errors::ApiError;

/// Raw byte stream of a streaming run response.
pub type ByteStream =
    Pin<Box<dyn futures::Stream<Item = Result<bytes::Bytes, ApiError>> + Send + 'static>>;

/// Run status reported by the service.
#[derive(Clone, Debug, PartialEq, Eq, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatusKind {
    Queued,
    InProgress,
    Completed,
    Failed,
    /// Any status this crate does not recognize.
    #[serde(other)]
    Other,
}

/// Error detail reported alongside a failed run.
#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Deserialize)]
pub struct RunError {
    #[serde(default)]
    pub message: Option<String>,
}

/// Snapshot of a run as returned by the status endpoint.
#[derive(Clone, Debug, PartialEq, Eq, serde::Deserialize)]
pub struct RunState {
    pub status: RunStatusKind,
    #[serde(default)]
    pub last_error: Option<RunError>,
}

/// Text payload of a message content block.
#[derive(Clone, Debug, PartialEq, Eq, serde::Deserialize)]
pub struct MessageText {
    pub value: String,
}

/// One content block of a thread message.
#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Deserialize)]
pub struct MessageContent {
    #[serde(default)]
    pub text: Option<MessageText>,
}

/// A message stored on a thread.
#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Deserialize)]
pub struct ThreadMessage {
    #[serde(default)]
    pub content: Vec<MessageContent>,
}

impl ThreadMessage {
    /// Text of the first content block, when present.
    pub fn first_text(&self) -> Option<&str> {
        self.content
            .first()?
            .text
            .as_ref()
            .map(|text| text.value.as_str())
    }
}

/// The five remote operations of one assistant exchange.
///
/// Implementations perform exactly one request per call and never retry;
/// every call is independently retryable by the caller.
#[async_trait::async_trait]
pub trait AssistantApi: Send + Sync {
    /// Creates a thread seeded with a single user message and returns the
    /// new thread's id.
    async fn create_thread(&self, user_message: &str) -> Result<String, ApiError>;

    /// Appends a user message to an existing thread.
    async fn add_message(&self, thread_id: &str, user_message: &str) -> Result<(), ApiError>;

    /// Starts a streaming run for the thread and returns the open response
    /// body. The caller owns the stream and closes it by dropping it.
    async fn create_run(&self, thread_id: &str, assistant_id: &str)
    -> Result<ByteStream, ApiError>;

    /// Fetches the current status of a run.
    async fn run_status(&self, thread_id: &str, run_id: &str) -> Result<RunState, ApiError>;

    /// Lists the thread's messages, newest first.
    async fn list_messages(&self, thread_id: &str) -> Result<Vec<ThreadMessage>, ApiError>;
}
