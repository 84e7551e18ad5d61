//! # Actions
//!
//! Everything that can happen to the assistant becomes an `Action`.
//! User asks a question? That's `Action::Submit(question)`.
//! The backend finishes a turn? That's `Action::AppendMessages(messages)`.
//!
//! `update()` mutates the state and reports what the caller should do next.
//! No I/O happens here.
//!
//! ```text
//! State + Action  →  update()  →  State' + Effect
//! ```

use log::{debug, info, warn};

use crate::api::{ChatMessage, Citation, Conversation, DocumentSection, document_section_prompt};
use crate::core::state::{App, same_citation};

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Append the question to the current chat (starting one if needed).
    Submit(String),
    UpdateCurrentChat(Option<Conversation>),
    /// Messages produced by a turn, in order.
    AppendMessages(Vec<ChatMessage>),
    FrontendSettingsLoaded(Option<serde_json::Value>),
    /// Replace the sections; blank prompts are derived from the research topic.
    UpdateDocumentSections(Vec<DocumentSection>),
    /// Set the topic and re-derive every section prompt from it.
    UpdateResearchTopic(String),
    /// Draft every section, if there is a topic to draft for.
    GenerateSections,
    ToggleFavoriteCitation(Citation),
    SetLoading(bool),
}

/// Follow-up work for the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    None,
    /// Send the current chat to `/conversation`.
    SpawnRequest,
    /// Call section generation for each of `app.document_sections`.
    GenerateSections,
}

pub fn update(app: &mut App, action: Action) -> Effect {
    match action {
        Action::Submit(question) => {
            let question = question.trim();
            if question.is_empty() || app.is_loading {
                debug!("Ignoring submit (empty={}, loading={})", question.is_empty(), app.is_loading);
                return Effect::None;
            }
            let chat = app
                .current_chat
                .get_or_insert_with(|| Conversation::new(question));
            chat.messages.push(ChatMessage::user(question));
            app.is_loading = true;
            app.status_message = "Generating answer...".to_string();
            Effect::SpawnRequest
        }
        Action::UpdateCurrentChat(chat) => {
            info!(
                "Current chat set to {}",
                chat.as_ref().map(|c| c.id.as_str()).unwrap_or("<none>")
            );
            app.current_chat = chat;
            Effect::None
        }
        Action::AppendMessages(messages) => {
            if messages.is_empty() {
                return Effect::None;
            }
            let title = messages[0].content.clone();
            let chat = app
                .current_chat
                .get_or_insert_with(|| Conversation::new(title));
            chat.messages.extend(messages);
            Effect::None
        }
        Action::FrontendSettingsLoaded(settings) => {
            app.frontend_settings = settings;
            Effect::None
        }
        Action::UpdateDocumentSections(sections) => {
            app.document_sections = sections;
            let topic = app.research_topic.trim();
            if !topic.is_empty() {
                for section in &mut app.document_sections {
                    if section.meta_prompt.is_empty() {
                        section.meta_prompt = document_section_prompt(&section.title, topic);
                    }
                }
            }
            Effect::None
        }
        Action::UpdateResearchTopic(topic) => {
            app.research_topic = topic;
            let topic = app.research_topic.trim();
            for section in &mut app.document_sections {
                section.meta_prompt = document_section_prompt(&section.title, topic);
            }
            Effect::None
        }
        Action::GenerateSections => {
            if app.research_topic.trim().is_empty() {
                warn!("No research topic, not drafting {} sections", app.document_sections.len());
                app.status_message = "No research topic; nothing drafted.".to_string();
                return Effect::None;
            }
            if app.document_sections.is_empty() {
                app.status_message =
                    "No sections to draft. Pass --title or add [[sections]] to the config file."
                        .to_string();
                return Effect::None;
            }
            info!(
                "Drafting {} sections for '{}'",
                app.document_sections.len(),
                app.research_topic
            );
            Effect::GenerateSections
        }
        Action::ToggleFavoriteCitation(citation) => {
            let before = app.favorited_citations.len();
            app.favorited_citations
                .retain(|f| !same_citation(f, &citation));
            if app.favorited_citations.len() == before {
                app.status_message = format!("Saved \"{}\"", citation.label());
                app.favorited_citations.push(citation);
            } else {
                app.status_message = format!("Removed \"{}\"", citation.label());
            }
            Effect::None
        }
        Action::SetLoading(loading) => {
            app.is_loading = loading;
            if !loading {
                app.status_message = "Ready".to_string();
            }
            Effect::None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::Role;
    use crate::test_support::{cited_turn, citation};

    #[test]
    fn test_submit_starts_chat_and_requests() {
        let mut app = App::new();
        let effect = update(&mut app, Action::Submit("  What is flu?  ".into()));

        assert_eq!(effect, Effect::SpawnRequest);
        assert!(app.is_loading);
        let chat = app.current_chat.as_ref().unwrap();
        assert_eq!(chat.title, "What is flu?");
        assert_eq!(app.messages().len(), 1);
        assert_eq!(app.messages()[0].content, "What is flu?");
    }

    #[test]
    fn test_submit_ignored_when_empty_or_loading() {
        let mut app = App::new();
        assert_eq!(update(&mut app, Action::Submit("   ".into())), Effect::None);
        assert!(app.current_chat.is_none());

        update(&mut app, Action::SetLoading(true));
        assert_eq!(update(&mut app, Action::Submit("q".into())), Effect::None);
        assert!(app.messages().is_empty());
    }

    #[test]
    fn test_append_messages_extends_current_chat() {
        let mut app = App::new();
        update(&mut app, Action::Submit("q".into()));
        update(&mut app, Action::AppendMessages(cited_turn()));
        update(&mut app, Action::SetLoading(false));

        let roles: Vec<Role> = app.messages().iter().map(|m| m.role()).collect();
        assert_eq!(roles, vec![Role::User, Role::Tool, Role::Assistant]);
        assert!(!app.is_loading);
    }

    #[test]
    fn test_append_empty_is_noop() {
        let mut app = App::new();
        update(&mut app, Action::AppendMessages(Vec::new()));
        assert!(app.current_chat.is_none());
    }

    #[test]
    fn test_update_current_chat_replaces_and_clears() {
        let mut app = App::new();
        update(&mut app, Action::Submit("q".into()));
        let other = Conversation::new("other");
        update(&mut app, Action::UpdateCurrentChat(Some(other.clone())));
        assert_eq!(app.current_chat.as_ref(), Some(&other));

        update(&mut app, Action::UpdateCurrentChat(None));
        assert!(app.current_chat.is_none());
    }

    #[test]
    fn test_toggle_favorite_adds_then_removes() {
        let mut app = App::new();
        let c = citation("1", "Flu facts");

        update(&mut app, Action::ToggleFavoriteCitation(c.clone()));
        assert!(app.is_favorite(&c));
        assert_eq!(app.favorited_citations.len(), 1);

        // Same id, different payload still counts as the same citation.
        let same = Citation {
            content: Some("updated".into()),
            ..c.clone()
        };
        update(&mut app, Action::ToggleFavoriteCitation(same));
        assert!(app.favorited_citations.is_empty());
    }

    #[test]
    fn test_toggle_favorite_keeps_others() {
        let mut app = App::new();
        update(&mut app, Action::ToggleFavoriteCitation(citation("1", "A")));
        update(&mut app, Action::ToggleFavoriteCitation(citation("2", "B")));
        update(&mut app, Action::ToggleFavoriteCitation(citation("1", "A")));

        assert_eq!(app.favorited_citations, vec![citation("2", "B")]);
    }

    fn section(title: &str, meta_prompt: &str) -> DocumentSection {
        DocumentSection {
            title: title.into(),
            meta_prompt: meta_prompt.into(),
        }
    }

    #[test]
    fn test_settings_loaded() {
        let mut app = App::new();
        let settings = serde_json::json!({"auth_enabled": false});
        update(&mut app, Action::FrontendSettingsLoaded(Some(settings.clone())));
        assert_eq!(app.frontend_settings, Some(settings));
    }

    #[test]
    fn test_topic_rewrites_every_section_prompt() {
        let mut app = App::new();
        update(
            &mut app,
            Action::UpdateDocumentSections(vec![section("Intro", ""), section("Budget", "Keep it short.")]),
        );
        update(&mut app, Action::UpdateResearchTopic("Influenza".into()));

        assert_eq!(app.research_topic, "Influenza");
        assert_eq!(
            app.document_sections[0].meta_prompt,
            "Create Intro section of research grant application for - Influenza."
        );
        assert_eq!(
            app.document_sections[1].meta_prompt,
            "Create Budget section of research grant application for - Influenza."
        );
    }

    #[test]
    fn test_new_sections_keep_explicit_prompts_and_derive_blank_ones() {
        let mut app = App::new();
        update(&mut app, Action::UpdateResearchTopic("Influenza".into()));
        update(
            &mut app,
            Action::UpdateDocumentSections(vec![section("Intro", ""), section("Budget", "Keep it short.")]),
        );

        assert_eq!(
            app.document_sections[0].meta_prompt,
            "Create Intro section of research grant application for - Influenza."
        );
        assert_eq!(app.document_sections[1].meta_prompt, "Keep it short.");
    }

    #[test]
    fn test_sections_without_topic_stay_blank() {
        let mut app = App::new();
        update(&mut app, Action::UpdateDocumentSections(vec![section("Intro", "")]));
        assert_eq!(app.document_sections[0].meta_prompt, "");
    }

    #[test]
    fn test_generate_sections_requires_topic() {
        let mut app = App::new();
        update(&mut app, Action::UpdateDocumentSections(vec![section("Intro", "")]));
        update(&mut app, Action::UpdateResearchTopic("   ".into()));

        assert_eq!(update(&mut app, Action::GenerateSections), Effect::None);
        assert!(app.status_message.contains("No research topic"));
    }

    #[test]
    fn test_generate_sections_requires_sections() {
        let mut app = App::new();
        update(&mut app, Action::UpdateResearchTopic("Influenza".into()));
        assert_eq!(update(&mut app, Action::GenerateSections), Effect::None);
        assert!(app.status_message.contains("No sections"));
    }

    #[test]
    fn test_generate_sections_with_topic_and_sections() {
        let mut app = App::new();
        update(&mut app, Action::UpdateResearchTopic("Influenza".into()));
        update(&mut app, Action::UpdateDocumentSections(vec![section("Intro", "")]));
        assert_eq!(update(&mut app, Action::GenerateSections), Effect::GenerateSections);
    }
}
