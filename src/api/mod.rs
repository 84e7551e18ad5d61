//! Wire types and HTTP access for the research assistant backend.

pub mod client;
pub mod error;
pub mod stream;
pub mod types;

pub use client::{ApiClient, error_for_status};
pub use error::ApiError;
pub use stream::{ConversationDecoder, StreamEvent, Turn, read_conversation, read_turn};
pub use types::{
    ChatMessage, ChatResponse, Citation, Conversation, DocumentSection, Role, SectionRequest,
    ToolMessageContent, UserClaim, UserInfo, document_section_prompt,
};
