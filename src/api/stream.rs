//! Decoding of the streamed `/conversation` response.
//!
//! The backend writes one JSON `ChatResponse` per line. A turn typically
//! starts with a `tool` message carrying citations, followed by many small
//! `assistant` deltas that together form the answer:
//!
//! ```text
//! {"choices":[{"messages":[{"role":"tool","content":"{\"citations\":[...]}"}]}]}\n
//! {"choices":[{"messages":[{"role":"assistant","content":"Influenza"}]}]}\n
//! {"choices":[{"messages":[{"role":"assistant","content":" is ..."}]}]}\n
//! ```
//!
//! Network chunks do not line up with JSON lines, so bytes are buffered until
//! a newline arrives.

use futures::{Stream, StreamExt};
use log::{debug, info, warn};
use tokio_util::sync::CancellationToken;

use super::error::ApiError;
use super::types::{ChatMessage, ChatResponse, Role};

/// Something the backend said during a turn.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    Tool(ChatMessage),
    AssistantDelta(String),
    Error(String),
}

/// Incremental line decoder. Feed it raw body chunks in order.
#[derive(Default)]
pub struct ConversationDecoder {
    buffer: Vec<u8>,
    lines_seen: usize,
}

impl ConversationDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Buffers `chunk` and returns the events of every line it completed.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<StreamEvent> {
        self.buffer.extend_from_slice(chunk);

        let mut events = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            events.extend(self.decode_line(&line));
        }
        events
    }

    /// Decodes whatever is left once the body has ended.
    pub fn finish(&mut self) -> Vec<StreamEvent> {
        let rest = std::mem::take(&mut self.buffer);
        self.decode_line(&rest)
    }

    pub fn lines_seen(&self) -> usize {
        self.lines_seen
    }

    fn decode_line(&mut self, raw: &[u8]) -> Vec<StreamEvent> {
        let text = String::from_utf8_lossy(raw);
        let line = text.trim();
        if line.is_empty() {
            return Vec::new();
        }
        self.lines_seen += 1;

        let response: ChatResponse = match serde_json::from_str(line) {
            Ok(r) => r,
            Err(e) => {
                warn!("Skipping undecodable stream line ({} bytes): {}", line.len(), e);
                return Vec::new();
            }
        };

        if let Some(message) = response.error_message() {
            return vec![StreamEvent::Error(message)];
        }

        response
            .choices
            .into_iter()
            .flat_map(|choice| choice.messages)
            .filter_map(|message| match message.role() {
                Role::Tool => Some(StreamEvent::Tool(message)),
                Role::Assistant if message.content.is_empty() => None,
                Role::Assistant => Some(StreamEvent::AssistantDelta(message.content)),
                Role::Error => Some(StreamEvent::Error(message.content)),
                // Echo of our own input.
                Role::User => None,
            })
            .collect()
    }
}

/// Messages produced by one turn.
#[derive(Debug, Default, PartialEq)]
pub struct Turn {
    pub messages: Vec<ChatMessage>,
    /// True when the caller cancelled before the body ended.
    pub cancelled: bool,
}

/// Folds stream events into conversation messages.
#[derive(Debug, Default)]
pub struct TurnBuilder {
    messages: Vec<ChatMessage>,
}

impl TurnBuilder {
    pub fn apply(&mut self, event: StreamEvent) {
        match event {
            StreamEvent::Tool(message) => self.messages.push(message),
            StreamEvent::AssistantDelta(text) => {
                if let Some(last) = self.messages.last_mut()
                    && last.role() == Role::Assistant
                {
                    last.content.push_str(&text);
                    return;
                }
                self.messages.push(ChatMessage::assistant(text));
            }
            StreamEvent::Error(text) => self.messages.push(ChatMessage::error(text)),
        }
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn finish(self, cancelled: bool) -> Turn {
        Turn {
            messages: self.messages,
            cancelled,
        }
    }
}

/// Drives a body stream to completion, reporting each event as it arrives.
///
/// Cancellation is not an error: the messages collected so far are returned
/// with `cancelled` set. A broken body is `ApiError::Network`.
pub async fn read_turn<S, B, E>(
    body: S,
    cancel: &CancellationToken,
    mut on_event: impl FnMut(&StreamEvent),
) -> Result<Turn, ApiError>
where
    S: Stream<Item = Result<B, E>>,
    B: AsRef<[u8]>,
    E: std::fmt::Display,
{
    let mut body = std::pin::pin!(body);
    let mut decoder = ConversationDecoder::new();
    let mut builder = TurnBuilder::default();

    loop {
        let next = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                info!(
                    "Turn cancelled after {} lines, {} messages kept",
                    decoder.lines_seen(),
                    builder.messages().len()
                );
                return Ok(builder.finish(true));
            }
            next = body.next() => next,
        };

        match next {
            Some(Ok(chunk)) => {
                debug!("Body chunk received: {} bytes", chunk.as_ref().len());
                for event in decoder.push(chunk.as_ref()) {
                    on_event(&event);
                    builder.apply(event);
                }
            }
            Some(Err(e)) => {
                warn!("Conversation body failed mid-stream: {}", e);
                return Err(ApiError::Network(e.to_string()));
            }
            None => break,
        }
    }

    for event in decoder.finish() {
        on_event(&event);
        builder.apply(event);
    }

    info!(
        "Turn complete: {} lines, {} messages",
        decoder.lines_seen(),
        builder.messages().len()
    );
    Ok(builder.finish(false))
}

/// Reads the streamed body of a `/conversation` response.
pub async fn read_conversation(
    response: reqwest::Response,
    cancel: &CancellationToken,
    on_event: impl FnMut(&StreamEvent),
) -> Result<Turn, ApiError> {
    read_turn(response.bytes_stream(), cancel, on_event).await
}
