//! # Message Renderer
//!
//! Turns an ordered conversation into display items, one per visible message.
//!
//! ```text
//! [tool]       ──┐ citations parsed from here
//! [assistant]  ◄─┘ Assistant { content, citations }
//! [user]       →   User { content }
//! [error]      →   Error { content }
//! ```
//!
//! Tool messages never render on their own; they only feed the assistant
//! message right after them. The pairing is purely positional.
//!
//! Rendering is lazy and side-effect free. The citation handler supplied by
//! the caller only runs when [`RenderedMessage::click_citation`] is called.

use crate::api::{ChatMessage, Citation, Role};
use crate::chat::citations::citations_for;

/// Placeholder shown while an answer is being generated.
pub const LOADING_MESSAGE: &str = "Generating answer...";

/// What a single message renders as.
#[derive(Debug, Clone, PartialEq)]
pub enum RenderKind<'a> {
    User {
        content: &'a str,
    },
    Assistant {
        content: &'a str,
        citations: Vec<Citation>,
    },
    Error {
        content: &'a str,
    },
}

/// A display item plus the hook for citation clicks.
pub struct RenderedMessage<'a> {
    /// Position in the source conversation. `None` for the loading placeholder.
    pub index: Option<usize>,
    pub kind: RenderKind<'a>,
    on_citation: &'a dyn Fn(&Citation),
}

impl<'a> RenderedMessage<'a> {
    pub fn content(&self) -> &'a str {
        match &self.kind {
            RenderKind::User { content }
            | RenderKind::Assistant { content, .. }
            | RenderKind::Error { content } => *content,
        }
    }

    /// Citations attached to this item; empty for anything but assistant answers.
    pub fn citations(&self) -> &[Citation] {
        match &self.kind {
            RenderKind::Assistant { citations, .. } => citations.as_slice(),
            RenderKind::User { .. } | RenderKind::Error { .. } => &[],
        }
    }

    /// Reports a click on the `n`-th citation (0-based) to the handler.
    ///
    /// Returns false, without calling the handler, when there is no such citation.
    pub fn click_citation(&self, n: usize) -> bool {
        match self.citations().get(n) {
            Some(citation) => {
                (self.on_citation)(citation);
                true
            }
            None => false,
        }
    }
}

/// Lazy renderer over a borrowed conversation.
///
/// `Copy`, so [`iter`](Self::iter) can be called any number of times and
/// always yields the same sequence.
#[derive(Clone, Copy)]
pub struct MessageRenderer<'a> {
    messages: &'a [ChatMessage],
    on_citation: &'a dyn Fn(&Citation),
    show_loading: bool,
}

impl<'a> MessageRenderer<'a> {
    pub fn new(messages: &'a [ChatMessage], on_citation: &'a dyn Fn(&Citation)) -> Self {
        Self {
            messages,
            on_citation,
            show_loading: false,
        }
    }

    /// Appends a "Generating answer..." placeholder after the last message.
    pub fn with_loading(mut self, show_loading: bool) -> Self {
        self.show_loading = show_loading;
        self
    }

    pub fn iter(self) -> impl Iterator<Item = RenderedMessage<'a>> {
        let messages = self.messages;
        let on_citation = self.on_citation;

        let items = messages
            .iter()
            .enumerate()
            .filter_map(move |(index, message)| {
                let kind = match message.role() {
                    Role::User => RenderKind::User {
                        content: &message.content,
                    },
                    Role::Assistant => RenderKind::Assistant {
                        content: &message.content,
                        citations: citations_for(messages, index),
                    },
                    Role::Error => RenderKind::Error {
                        content: &message.content,
                    },
                    Role::Tool => return None,
                };
                Some(RenderedMessage {
                    index: Some(index),
                    kind,
                    on_citation,
                })
            });

        let loading = self.show_loading.then(|| RenderedMessage {
            index: None,
            kind: RenderKind::Assistant {
                content: LOADING_MESSAGE,
                citations: Vec::new(),
            },
            on_citation,
        });

        items.chain(loading)
    }
}

/// Shorthand for `MessageRenderer::new(messages, on_citation).iter()`.
pub fn render_messages<'a>(
    messages: &'a [ChatMessage],
    on_citation: &'a dyn Fn(&Citation),
) -> impl Iterator<Item = RenderedMessage<'a>> {
    MessageRenderer::new(messages, on_citation).iter()
}
