//! HTTP client for the research assistant backend.
//!
//! Every call is a single request with no retry. Only conversation submission
//! reports failures to the caller; the lookups degrade to an empty value so a
//! missing identity provider or settings endpoint never takes the app down.

use log::{debug, error, info, warn};
use tokio_util::sync::CancellationToken;

use super::error::ApiError;
use super::types::{
    ChatMessage, ConversationRequest, DocumentSection, GeneratedSection, SectionRequest, UserInfo,
};
use crate::core::config::DEFAULT_OBJECT_ID_CLAIM;

/// Stateless client for the backend endpoints.
///
/// Holds only connection settings; cloning is cheap and clones share the
/// underlying connection pool.
#[derive(Clone, Debug)]
pub struct ApiClient {
    base_url: String,
    object_id_claim: String,
    client: reqwest::Client,
}

impl ApiClient {
    /// Creates a client rooted at `base_url` (e.g. `http://localhost:50505`).
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            base_url,
            object_id_claim: DEFAULT_OBJECT_ID_CLAIM.to_string(),
            client: reqwest::Client::new(),
        }
    }

    /// Overrides the claim type used to resolve the user's object id.
    pub fn with_object_id_claim(mut self, claim: impl Into<String>) -> Self {
        self.object_id_claim = claim.into();
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Submits a conversation turn.
    ///
    /// A non-ok response is *not* an error here: it comes back as-is so the
    /// caller can inspect the status and body. Only transport failures and
    /// cancellation produce `Err`.
    pub async fn submit_conversation(
        &self,
        messages: &[ChatMessage],
        index_name: &str,
        cancel: &CancellationToken,
    ) -> Result<reqwest::Response, ApiError> {
        let request = ConversationRequest {
            messages,
            index_name,
        };

        info!(
            "Conversation request: index={}, message_count={}",
            index_name,
            messages.len()
        );

        let send = self
            .client
            .post(self.url("/conversation"))
            .json(&request)
            .send();

        let response = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                info!("Conversation request cancelled before a response arrived");
                return Err(ApiError::Cancelled);
            }
            result = send => result?,
        };

        debug!("Conversation response status: {}", response.status());
        if !response.status().is_success() {
            warn!("Conversation request rejected: HTTP {}", response.status());
        }

        Ok(response)
    }

    /// Reads the identity of the signed-in user from the platform endpoint.
    ///
    /// Returns an empty vector when no identity provider is configured, the
    /// request fails, or the payload cannot be decoded.
    pub async fn fetch_user_info(&self) -> Vec<UserInfo> {
        let response = match self.client.get(self.url("/.auth/me")).send().await {
            Ok(r) => r,
            Err(e) => {
                error!("Error fetching user info: {}", e);
                return Vec::new();
            }
        };

        if !response.status().is_success() {
            info!(
                "No identity provider found (HTTP {}). Access to chat will be blocked.",
                response.status()
            );
            return Vec::new();
        }

        let mut users: Vec<UserInfo> = match response.json().await {
            Ok(users) => users,
            Err(e) => {
                warn!("Could not decode user info payload: {}", e);
                return Vec::new();
            }
        };

        for user in &mut users {
            let object_id = user
                .claim(&self.object_id_claim)
                .filter(|v| !v.is_empty())
                .map(str::to_owned);
            if let Some(oid) = object_id {
                user.user_id = oid;
            }
        }

        debug!("Resolved {} identity entries", users.len());
        users
    }

    /// Fetches the frontend settings blob. `None` on any failure.
    pub async fn fetch_frontend_settings(&self) -> Option<serde_json::Value> {
        let response = match self.client.get(self.url("/frontend_settings")).send().await {
            Ok(r) => r,
            Err(e) => {
                error!("There was an issue fetching frontend settings: {}", e);
                return None;
            }
        };

        match response.json::<serde_json::Value>().await {
            Ok(settings) => Some(settings),
            Err(e) => {
                error!("Frontend settings were not valid JSON: {}", e);
                None
            }
        }
    }

    /// Asks the backend to draft one document section.
    ///
    /// Returns the response when the backend reports success, `None` when it
    /// rejects the request or the request never completes.
    pub async fn generate_document_section(
        &self,
        topic: &str,
        section: &DocumentSection,
    ) -> Option<reqwest::Response> {
        let body = SectionRequest::new(topic, section);
        info!("Generating section '{}' for topic '{}'", section.title, topic);

        let response = match self
            .client
            .post(self.url("/draft_document/generate_section"))
            .json(&body)
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) => {
                error!("Section generation request failed: {}", e);
                return None;
            }
        };

        if !response.status().is_success() {
            error!(
                "Section generation rejected: HTTP {}",
                response.status()
            );
            return None;
        }

        Some(response)
    }

    /// Generates a section and returns its text, or `""` if anything fails.
    pub async fn generate_section_content(&self, topic: &str, section: &DocumentSection) -> String {
        let Some(response) = self.generate_document_section(topic, section).await else {
            return String::new();
        };

        match response.json::<GeneratedSection>().await {
            Ok(generated) => generated.content,
            Err(e) => {
                error!("Could not decode generated section: {}", e);
                String::new()
            }
        }
    }
}

/// Turns a non-ok response into `ApiError::Api`, consuming its body as the message.
pub async fn error_for_status(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status().as_u16();
    let message = response
        .text()
        .await
        .unwrap_or_else(|_| "unknown error".to_string());
    warn!("API error: {} - {}", status, message);
    Err(ApiError::Api { status, message })
}
