/// Events decoded from a streaming run response.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AssistantStreamEvent {
    /// One incremental text fragment from a message delta. Fragments are
    /// never batched; consumers append them in order.
    OutputDelta { text: String },
    /// Run status carried by a `run_update` frame.
    RunStatus { status: String },
    /// The `data: [DONE]` sentinel; logical end of the stream.
    Done,
    /// A `data:` payload that could not be parsed. Recoverable: decoding
    /// continues with the next frame.
    Unparsable { raw: String },
}
