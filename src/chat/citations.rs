//! Citation extraction from tool messages.

use log::debug;

use crate::api::{ChatMessage, Citation, Role, ToolMessageContent};

/// Returns the citations carried by a tool message.
///
/// Anything that is not a tool message, or a tool message whose content is
/// not valid JSON, yields no citations. Never fails.
pub fn parse_citations(message: &ChatMessage) -> Vec<Citation> {
    if message.role() != Role::Tool {
        return Vec::new();
    }

    match serde_json::from_str::<ToolMessageContent>(&message.content) {
        Ok(tool) => tool.citations,
        Err(e) => {
            debug!("Tool message content is not citation JSON: {}", e);
            Vec::new()
        }
    }
}

/// Citations for the message at `index`, taken from the message just before it.
pub fn citations_for(messages: &[ChatMessage], index: usize) -> Vec<Citation> {
    index
        .checked_sub(1)
        .and_then(|prev| messages.get(prev))
        .map(parse_citations)
        .unwrap_or_default()
}
