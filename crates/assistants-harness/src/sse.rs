use crate::events::AssistantStreamEvent;

const DATA_PREFIX: &str = "data:";
const DONE_MARKER: &str = "[DONE]";

/// Splits raw byte chunks into complete text lines.
///
/// Bytes are buffered until a terminating newline arrives, so a multi-byte
/// character (or a whole frame) split across chunk boundaries is never
/// corrupted. The unterminated tail stays in the buffer.
#[derive(Default)]
struct SseLineDecoder {
    buf: Vec<u8>,
}

impl SseLineDecoder {
    fn push_chunk(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buf.extend_from_slice(chunk);
        let mut lines = Vec::new();
        while let Some(idx) = self.buf.iter().position(|&b| b == b'\n') {
            let mut line = String::from_utf8_lossy(&self.buf[..idx]).into_owned();
            if line.ends_with('\r') {
                line.pop();
            }
            self.buf.drain(..=idx);
            lines.push(line);
        }
        lines
    }
}

#[derive(Debug, serde::Deserialize)]
struct StreamFrame {
    id: Option<String>,
    #[serde(rename = "type")]
    kind: Option<String>,
    status: Option<String>,
    delta: Option<FrameDelta>,
}

#[derive(Debug, serde::Deserialize)]
struct FrameDelta {
    content: Option<Vec<FrameContent>>,
}

#[derive(Debug, serde::Deserialize)]
struct FrameContent {
    #[serde(rename = "type")]
    kind: Option<String>,
    text: Option<FrameText>,
}

#[derive(Debug, serde::Deserialize)]
struct FrameText {
    value: Option<String>,
}

/// Decodes the `data: <json>` frame stream of a run into
/// [`AssistantStreamEvent`]s.
///
/// The decoder is stateful and non-restartable: feed chunks in arrival order
/// and consume the returned events in order. Lines without the `data:` prefix
/// and blank lines are ignored; an unparsable payload yields
/// [`AssistantStreamEvent::Unparsable`] and decoding continues.
#[derive(Default)]
pub struct AssistantEventDecoder {
    lines: SseLineDecoder,
    first_seen_id: Option<String>,
}

impl AssistantEventDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds one raw chunk and returns the events it completed, in order.
    pub fn push_chunk(&mut self, chunk: &[u8]) -> Vec<AssistantStreamEvent> {
        let mut events = Vec::new();
        for line in self.lines.push_chunk(chunk) {
            self.decode_line(&line, &mut events);
        }
        events
    }

    /// The first `id` field observed in any parsed frame; later ids are
    /// ignored.
    ///
    /// The id may belong to a message object rather than the run itself. The
    /// fallback status wait deliberately uses exactly this value.
    pub fn first_seen_id(&self) -> Option<&str> {
        self.first_seen_id.as_deref()
    }

    fn decode_line(&mut self, line: &str, events: &mut Vec<AssistantStreamEvent>) {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return;
        }
        let Some(rest) = trimmed.strip_prefix(DATA_PREFIX) else {
            return;
        };
        let payload = rest.trim_start();
        if payload == DONE_MARKER {
            events.push(AssistantStreamEvent::Done);
            return;
        }

        let frame: StreamFrame = match serde_json::from_str(payload) {
            Ok(frame) => frame,
            Err(err) => {
                tracing::warn!(%err, "unparsable stream frame");
                events.push(AssistantStreamEvent::Unparsable {
                    raw: payload.to_string(),
                });
                return;
            }
        };

        if self.first_seen_id.is_none()
            && let Some(id) = frame.id.filter(|id| !id.is_empty())
        {
            self.first_seen_id = Some(id);
        }

        if let Some(content) = frame.delta.and_then(|delta| delta.content) {
            for part in content {
                if part.kind.as_deref() == Some("text")
                    && let Some(text) = part.text.and_then(|text| text.value)
                {
                    events.push(AssistantStreamEvent::OutputDelta { text });
                }
            }
        }

        if frame.kind.as_deref() == Some("run_update")
            && let Some(status) = frame.status
        {
            events.push(AssistantStreamEvent::RunStatus { status });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn delta_frame(id: &str, value: &str) -> String {
        format!(
            "data: {{\"id\":\"{id}\",\"delta\":{{\"content\":[{{\"type\":\"text\",\"text\":{{\"value\":\"{value}\"}}}}]}}}}\n"
        )
    }

    #[test]
    fn emits_one_delta_event_per_fragment_in_order() {
        let mut decoder = AssistantEventDecoder::new();
        let frame = "data: {\"delta\":{\"content\":[\
            {\"type\":\"text\",\"text\":{\"value\":\"Hel\"}},\
            {\"type\":\"text\",\"text\":{\"value\":\"lo\"}}]}}\n";
        let events = decoder.push_chunk(frame.as_bytes());
        assert_eq!(
            events,
            vec![
                AssistantStreamEvent::OutputDelta { text: "Hel".into() },
                AssistantStreamEvent::OutputDelta { text: "lo".into() },
            ]
        );
    }

    #[test]
    fn handles_multibyte_characters_split_across_chunks() {
        let mut decoder = AssistantEventDecoder::new();
        let frame = delta_frame("msg_1", "héllo ✓");
        let bytes = frame.as_bytes();
        // Split inside the multi-byte "é".
        let split = frame.find('é').expect("é present") + 1;
        assert!(decoder.push_chunk(&bytes[..split]).is_empty());
        let events = decoder.push_chunk(&bytes[split..]);
        assert_eq!(
            events,
            vec![AssistantStreamEvent::OutputDelta {
                text: "héllo ✓".into()
            }]
        );
    }

    #[test]
    fn done_sentinel_yields_done_event() {
        let mut decoder = AssistantEventDecoder::new();
        let events = decoder.push_chunk(b"data: [DONE]\n");
        assert_eq!(events, vec![AssistantStreamEvent::Done]);
    }

    #[test]
    fn run_update_completed_yields_status_event() {
        let mut decoder = AssistantEventDecoder::new();
        let events =
            decoder.push_chunk(b"data: {\"type\":\"run_update\",\"status\":\"completed\"}\n");
        assert_eq!(
            events,
            vec![AssistantStreamEvent::RunStatus {
                status: "completed".into()
            }]
        );
    }

    #[test]
    fn run_update_carries_any_status_through() {
        let mut decoder = AssistantEventDecoder::new();
        let events =
            decoder.push_chunk(b"data: {\"type\":\"run_update\",\"status\":\"in_progress\"}\n");
        assert_eq!(
            events,
            vec![AssistantStreamEvent::RunStatus {
                status: "in_progress".into()
            }]
        );
    }

    #[test]
    fn unparsable_frame_does_not_abort_subsequent_frames() {
        let mut decoder = AssistantEventDecoder::new();
        let mut events = decoder.push_chunk(b"data: {not json}\n");
        events.extend(decoder.push_chunk(delta_frame("msg_2", "ok").as_bytes()));
        assert_eq!(
            events,
            vec![
                AssistantStreamEvent::Unparsable {
                    raw: "{not json}".into()
                },
                AssistantStreamEvent::OutputDelta { text: "ok".into() },
            ]
        );
    }

    #[test]
    fn first_seen_id_wins_over_later_ids() {
        let mut decoder = AssistantEventDecoder::new();
        decoder.push_chunk(delta_frame("msg_first", "a").as_bytes());
        decoder.push_chunk(delta_frame("run_second", "b").as_bytes());
        assert_eq!(decoder.first_seen_id(), Some("msg_first"));
    }

    #[test]
    fn blank_and_non_data_lines_are_ignored() {
        let mut decoder = AssistantEventDecoder::new();
        let events = decoder.push_chunk(b"\n\nevent: ping\n: comment\n");
        assert!(events.is_empty());
    }

    #[test]
    fn crlf_line_endings_are_tolerated() {
        let mut decoder = AssistantEventDecoder::new();
        let events = decoder.push_chunk(b"data: [DONE]\r\n");
        assert_eq!(events, vec![AssistantStreamEvent::Done]);
    }
}
