//! # Application State
//!
//! Everything the assistant remembers between turns. No I/O and no
//! presentation types live here.
//!
//! ```text
//! App
//! ├── current_chat: Option<Conversation>      // active conversation
//! ├── frontend_settings: Option<Value>        // from /frontend_settings
//! ├── document_sections: Vec<DocumentSection> // sections to draft
//! ├── research_topic: String                  // topic for drafting
//! ├── favorited_citations: Vec<Citation>      // starred sources
//! ├── is_loading: bool                        // waiting for the backend
//! └── status_message: String                  // one-line status
//! ```
//!
//! State changes only happen through `update(state, action)` in action.rs.

use crate::api::{ChatMessage, Citation, Conversation, DocumentSection};

pub const WELCOME_MESSAGE: &str = "Ask a question about your documents.";

#[derive(Debug, Clone, PartialEq)]
pub struct App {
    pub current_chat: Option<Conversation>,
    pub frontend_settings: Option<serde_json::Value>,
    pub document_sections: Vec<DocumentSection>,
    pub research_topic: String,
    pub favorited_citations: Vec<Citation>,
    pub is_loading: bool,
    pub status_message: String,
}

impl App {
    pub fn new() -> Self {
        Self {
            current_chat: None,
            frontend_settings: None,
            document_sections: Vec::new(),
            research_topic: String::new(),
            favorited_citations: Vec::new(),
            is_loading: false,
            status_message: WELCOME_MESSAGE.to_string(),
        }
    }

    /// Messages of the active conversation, empty when there is none.
    pub fn messages(&self) -> &[ChatMessage] {
        self.current_chat
            .as_ref()
            .map(|chat| chat.messages.as_slice())
            .unwrap_or_default()
    }

    pub fn is_favorite(&self, citation: &Citation) -> bool {
        self.favorited_citations
            .iter()
            .any(|f| same_citation(f, citation))
    }
}

impl Default for App {
    fn default() -> Self {
        Self::new()
    }
}

/// Citations are matched by id; id-less citations only match an identical one.
pub(crate) fn same_citation(a: &Citation, b: &Citation) -> bool {
    match (&a.id, &b.id) {
        (Some(x), Some(y)) => x == y,
        (None, None) => a == b,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::Role;

    #[test]
    fn test_app_new_defaults() {
        let app = App::new();
        assert_eq!(app.status_message, WELCOME_MESSAGE);
        assert!(!app.is_loading);
        assert!(app.current_chat.is_none());
        assert!(app.messages().is_empty());
        assert_eq!(app, App::default());
    }

    #[test]
    fn test_messages_reads_current_chat() {
        let mut app = App::new();
        let mut chat = Conversation::new("q");
        chat.messages.push(ChatMessage::user("q"));
        app.current_chat = Some(chat);
        assert_eq!(app.messages().len(), 1);
        assert_eq!(app.messages()[0].role(), Role::User);
    }

    #[test]
    fn test_same_citation_by_id() {
        let a = Citation {
            id: Some("1".into()),
            title: Some("A".into()),
            ..Default::default()
        };
        let renamed = Citation {
            title: Some("A (v2)".into()),
            ..a.clone()
        };
        assert!(same_citation(&a, &renamed));
        assert!(!same_citation(&a, &Citation::default()));
        assert!(same_citation(&Citation::default(), &Citation::default()));
    }
}
