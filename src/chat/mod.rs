//! # Conversation Rendering
//!
//! Pure, UI-agnostic logic that turns stored messages into something a
//! front end can show.
//!
//! - [`citations`]: pull citation records out of tool messages
//! - [`render`]: map messages to display items, pairing answers with citations
//! - [`answer`]: rewrite `[docN]` markers into numbered footnotes

pub mod answer;
pub mod citations;
pub mod render;

pub use answer::{ParsedAnswer, parse_answer};
pub use citations::{citations_for, parse_citations};
pub use render::{MessageRenderer, RenderKind, RenderedMessage, render_messages};
