use chrono::Utc;
use serde::{Deserialize, Deserializer, Serialize};

/// Who authored a chat message.
///
/// The set is closed: the backend only ever produces these four roles, and
/// every consumer matches on them exhaustively.
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone, Copy)]
pub enum Role {
    #[serde(rename = "user")]
    User,
    #[serde(rename = "assistant")]
    Assistant,
    /// Output of a retrieval step; `content` is JSON carrying citations.
    #[serde(rename = "tool")]
    Tool,
    #[serde(rename = "error")]
    Error,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::Tool => "tool",
            Role::Error => "error",
        }
    }
}

/// A single entry of a conversation.
///
/// The role is fixed at construction; only the content may grow (streamed
/// assistant deltas are appended in place).
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ChatMessage {
    role: Role,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
}

impl ChatMessage {
    /// Creates a message stamped with a fresh UUID and the current time.
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            id: Some(uuid::Uuid::new_v4().to_string()),
            date: Some(Utc::now().to_rfc3339()),
        }
    }

    /// Creates a message without id or timestamp.
    pub fn bare(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            id: None,
            date: None,
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    pub fn tool(content: impl Into<String>) -> Self {
        Self::new(Role::Tool, content)
    }

    pub fn error(content: impl Into<String>) -> Self {
        Self::new(Role::Error, content)
    }

    pub fn role(&self) -> Role {
        self.role
    }
}

/// A reference record attached to an assistant answer.
///
/// Every attribute is optional; the backend fills in whatever the retrieval
/// index knows about the source chunk.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct Citation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub part_index: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(
        default,
        deserialize_with = "string_or_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filepath: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<String>,
    #[serde(
        default,
        deserialize_with = "string_or_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub chunk_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reindex_id: Option<String>,
}

impl Citation {
    /// Best human-readable label: title, then filepath, then url.
    pub fn label(&self) -> &str {
        self.title
            .as_deref()
            .or(self.filepath.as_deref())
            .or(self.url.as_deref())
            .unwrap_or("Untitled")
    }
}

/// Accepts a JSON string, number or null. Indexes disagree on whether chunk
/// ids are numeric.
fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(serde_json::Value::Null) => None,
        Some(serde_json::Value::String(s)) => Some(s),
        Some(other) => Some(other.to_string()),
    })
}

/// Decoded body of a tool message.
#[derive(Deserialize, Debug, Default)]
pub struct ToolMessageContent {
    #[serde(default)]
    pub citations: Vec<Citation>,
    /// Search intents; shape varies between backends, so kept untyped.
    #[serde(default)]
    pub intent: Option<serde_json::Value>,
}

/// A stored conversation.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Conversation {
    pub id: String,
    pub title: String,
    pub messages: Vec<ChatMessage>,
    pub date: String,
}

impl Conversation {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            title: title.into(),
            messages: Vec::new(),
            date: Utc::now().to_rfc3339(),
        }
    }
}

/// Body of `POST /conversation`.
#[derive(Serialize, Debug)]
pub struct ConversationRequest<'a> {
    pub messages: &'a [ChatMessage],
    pub index_name: &'a str,
}

/// One newline-delimited chunk of the `/conversation` response body.
#[derive(Deserialize, Debug, Default)]
pub struct ChatResponse {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub created: i64,
    #[serde(default)]
    pub object: String,
    #[serde(default)]
    pub choices: Vec<ChatResponseChoice>,
    /// Either a plain string or an object with a `message` field.
    #[serde(default)]
    pub error: Option<serde_json::Value>,
}

impl ChatResponse {
    /// Flattens the `error` field into a displayable message.
    pub fn error_message(&self) -> Option<String> {
        match self.error.as_ref()? {
            serde_json::Value::Null => None,
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(
                other
                    .get("message")
                    .and_then(|m| m.as_str())
                    .map(str::to_owned)
                    .unwrap_or_else(|| other.to_string()),
            ),
        }
    }
}

#[derive(Deserialize, Debug, Default)]
pub struct ChatResponseChoice {
    #[serde(default)]
    pub messages: Vec<ChatMessage>,
}

/// A single claim from the identity provider.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct UserClaim {
    #[serde(default)]
    pub typ: String,
    #[serde(default)]
    pub val: String,
}

/// One entry of the `/.auth/me` payload.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct UserInfo {
    #[serde(default)]
    pub access_token: String,
    #[serde(default)]
    pub expires_on: String,
    #[serde(default)]
    pub id_token: String,
    #[serde(default)]
    pub provider_name: String,
    #[serde(default)]
    pub user_claims: Vec<UserClaim>,
    #[serde(default)]
    pub user_id: String,
}

impl UserInfo {
    /// Value of the first claim with the given type.
    pub fn claim(&self, typ: &str) -> Option<&str> {
        self.user_claims
            .iter()
            .find(|c| c.typ == typ)
            .map(|c| c.val.as_str())
    }

    pub fn display_name(&self) -> Option<&str> {
        self.claim("name")
    }
}

/// A section of a drafted document, as configured under `[[sections]]`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct DocumentSection {
    pub title: String,
    /// Empty means "derive from the research topic".
    #[serde(rename = "metaPrompt", default)]
    pub meta_prompt: String,
}

/// The guidance the backend expects for drafting `title` under `topic`.
pub fn document_section_prompt(title: &str, topic: &str) -> String {
    format!("Create {title} section of research grant application for - {topic}.")
}

/// Body of `POST /draft_document/generate_section`.
#[derive(Serialize, Deserialize, Debug, PartialEq)]
pub struct SectionRequest {
    #[serde(rename = "grantTopic")]
    pub grant_topic: String,
    #[serde(rename = "sectionTitle")]
    pub section_title: String,
    #[serde(rename = "sectionContext")]
    pub section_context: String,
}

impl SectionRequest {
    pub fn new(topic: &str, section: &DocumentSection) -> Self {
        Self {
            grant_topic: topic.to_string(),
            section_title: section.title.clone(),
            section_context: section.meta_prompt.clone(),
        }
    }
}

/// Successful response of section generation.
#[derive(Deserialize, Debug, Default)]
pub struct GeneratedSection {
    #[serde(default)]
    pub content: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_serialization() {
        assert_eq!(serde_json::to_string(&Role::User).unwrap(), "\"user\"");
        assert_eq!(serde_json::to_string(&Role::Assistant).unwrap(), "\"assistant\"");
        assert_eq!(serde_json::to_string(&Role::Tool).unwrap(), "\"tool\"");
        assert_eq!(serde_json::to_string(&Role::Error).unwrap(), "\"error\"");
    }

    #[test]
    fn test_unknown_role_is_rejected() {
        let result = serde_json::from_str::<ChatMessage>(r#"{"role":"system","content":"x"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_new_message_is_stamped() {
        let msg = ChatMessage::user("hello");
        assert_eq!(msg.role(), Role::User);
        assert!(msg.id.is_some());
        assert!(msg.date.is_some());
    }

    /// Contract test: bare messages serialize without metadata keys.
    #[test]
    fn test_bare_message_serialization() {
        let msg = ChatMessage::bare(Role::Assistant, "hi there");
        let json = serde_json::to_string(&msg).unwrap();
        assert_eq!(json, r#"{"role":"assistant","content":"hi there"}"#);
    }

    #[test]
    fn test_conversation_request_serialization() {
        let messages = vec![ChatMessage::bare(Role::User, "hello")];
        let req = ConversationRequest {
            messages: &messages,
            index_name: "articles",
        };
        let json = serde_json::to_string(&req).unwrap();
        assert_eq!(
            json,
            r#"{"messages":[{"role":"user","content":"hello"}],"index_name":"articles"}"#
        );
    }

    #[test]
    fn test_citation_accepts_numeric_chunk_id() {
        let json = r#"{"content":"text","id":"2","chunk_id":8,"title":null}"#;
        let citation: Citation = serde_json::from_str(json).unwrap();
        assert_eq!(citation.chunk_id.as_deref(), Some("8"));
        assert_eq!(citation.id.as_deref(), Some("2"));
        assert_eq!(citation.title, None);
    }

    #[test]
    fn test_citation_ignores_unknown_keys() {
        let json = r#"{"title":"A","image_mapping":null,"score":0.9}"#;
        let citation: Citation = serde_json::from_str(json).unwrap();
        assert_eq!(citation.title.as_deref(), Some("A"));
    }

    #[test]
    fn test_citation_label_fallbacks() {
        let mut c = Citation {
            url: Some("https://example.com".into()),
            ..Default::default()
        };
        assert_eq!(c.label(), "https://example.com");
        c.filepath = Some("doc.pdf".into());
        assert_eq!(c.label(), "doc.pdf");
        c.title = Some("Title".into());
        assert_eq!(c.label(), "Title");
        assert_eq!(Citation::default().label(), "Untitled");
    }

    #[test]
    fn test_chat_response_ignores_extra_keys() {
        let json = r#"{"id":"c","model":"m","created":1,"object":"chunk",
            "choices":[{"messages":[{"role":"assistant","content":"AI"}]}],
            "apim-request-id":"x","history_metadata":{}}"#;
        let resp: ChatResponse = serde_json::from_str(json).unwrap();
        assert_eq!(resp.choices[0].messages[0].content, "AI");
        assert!(resp.error_message().is_none());
    }

    #[test]
    fn test_chat_response_error_shapes() {
        let plain: ChatResponse = serde_json::from_str(r#"{"error":"boom"}"#).unwrap();
        assert_eq!(plain.error_message().as_deref(), Some("boom"));

        let nested: ChatResponse =
            serde_json::from_str(r#"{"error":{"message":"content_filter","code":"400"}}"#).unwrap();
        assert_eq!(nested.error_message().as_deref(), Some("content_filter"));

        let null: ChatResponse = serde_json::from_str(r#"{"error":null}"#).unwrap();
        assert_eq!(null.error_message(), None);
    }

    #[test]
    fn test_user_info_claim_lookup() {
        let info = UserInfo {
            user_claims: vec![UserClaim {
                typ: "name".into(),
                val: "John Doe".into(),
            }],
            ..Default::default()
        };
        assert_eq!(info.display_name(), Some("John Doe"));
        assert_eq!(info.claim("email"), None);
    }

    #[test]
    fn test_document_section_prompt() {
        assert_eq!(
            document_section_prompt("Introduction", "Malaria vaccines"),
            "Create Introduction section of research grant application for - Malaria vaccines."
        );
    }

    #[test]
    fn test_document_section_prompt_may_be_omitted() {
        let section: DocumentSection = serde_json::from_str(r#"{"title":"Budget"}"#).unwrap();
        assert_eq!(section.meta_prompt, "");
    }

    #[test]
    fn test_section_request_round_trip() {
        let section = DocumentSection {
            title: "Introduction".into(),
            meta_prompt: "Summarize the grant".into(),
        };
        let json = serde_json::to_string(&SectionRequest::new("Malaria", &section)).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["grantTopic"], "Malaria");

        let decoded: SectionRequest = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded.section_title, section.title);
        assert_eq!(decoded.section_context, section.meta_prompt);
    }

    #[test]
    fn test_document_section_uses_camel_case_prompt() {
        let json = r#"{"title":"Budget","metaPrompt":"List costs"}"#;
        let section: DocumentSection = serde_json::from_str(json).unwrap();
        assert_eq!(section.meta_prompt, "List costs");
    }
}
