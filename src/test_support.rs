//! Test utilities shared across the crate.
//!
//! This module is only compiled during tests (`#[cfg(test)]`).

use crate::api::{ChatMessage, Citation, Role};

/// A citation with just an id and a title.
pub fn citation(id: &str, title: &str) -> Citation {
    Citation {
        id: Some(id.to_string()),
        title: Some(title.to_string()),
        ..Default::default()
    }
}

/// A typical turn: a tool message with two sources, then an answer citing both.
pub fn cited_turn() -> Vec<ChatMessage> {
    vec![
        ChatMessage::bare(
            Role::Tool,
            r#"{"citations":[{"id":"1","title":"Flu facts","url":"https://example.org/flu","content":"Influenza is a respiratory illness."},{"id":"2","title":"Vaccines","content":"Annual vaccination is recommended."}],"intent":"[\"flu\"]"}"#,
        ),
        ChatMessage::bare(
            Role::Assistant,
            "Influenza is a respiratory illness [doc1]. Vaccinate yearly [doc2].",
        ),
    ]
}
