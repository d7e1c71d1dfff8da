//! Chat session: the transcript of one conversation

use crate::api::ChatResponse;
use crate::models::{Citation, Locale, Message};
use crate::reference;

/// Messages exchanged so far, plus what the user last tapped
#[derive(Debug, Default)]
pub struct ChatSession {
    /// Transcript, oldest first
    pub messages: Vec<Message>,
    /// A question is waiting for its answer
    pub loading: bool,
    /// Reference of the citation the user opened last
    pub last_tapped_citation_ref: Option<String>,
}

impl ChatSession {
    /// Create an empty session
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a question and mark the session as waiting.
    ///
    /// Blank questions are ignored; returns whether one was added.
    pub fn add_user_message(&mut self, text: &str) -> bool {
        let text = text.trim();
        if text.is_empty() {
            return false;
        }
        self.messages.push(Message::user(text));
        self.loading = true;
        true
    }

    /// Record the assistant's answer with its resolved citations
    pub fn add_answer(&mut self, response: ChatResponse, locale: Locale) -> &Message {
        let citations = reference::resolve_citations(response.citations, &response.answer, locale);
        if !response.has_reliable_sources {
            tracing::debug!("Answer has no reliable sources");
        }
        self.loading = false;
        self.push_assistant(response.answer, citations)
    }

    /// Record a failed question as an assistant message
    pub fn add_error(&mut self, message: impl Into<String>) -> &Message {
        self.loading = false;
        self.push_assistant(message.into(), Vec::new())
    }

    fn push_assistant(&mut self, content: String, citations: Vec<Citation>) -> &Message {
        let index = self.messages.len();
        self.messages.push(Message::assistant(content, citations));
        &self.messages[index]
    }

    /// Remember a tapped citation and return the passage deeplink to open
    pub fn tap_citation(&mut self, citation: &Citation, locale: Locale) -> String {
        self.last_tapped_citation_ref = Some(citation.reference.clone());
        reference::build_passage_deeplink(&citation.reference, locale)
    }

    /// Last message, if any
    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// Start over
    pub fn clear(&mut self) {
        self.messages.clear();
        self.loading = false;
        self.last_tapped_citation_ref = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Span;

    fn response(answer: &str, citations: Vec<Citation>) -> ChatResponse {
        ChatResponse {
            success: true,
            answer: answer.to_string(),
            citations,
            has_reliable_sources: true,
        }
    }

    #[test]
    fn test_blank_question_ignored() {
        let mut chat = ChatSession::new();
        assert!(!chat.add_user_message("   "));
        assert!(chat.messages.is_empty());
        assert!(!chat.loading);

        assert!(chat.add_user_message(" What is love? "));
        assert!(chat.loading);
        assert_eq!(chat.messages[0].content, "What is love?");
    }

    #[test]
    fn test_answer_falls_back_to_parsed_refs() {
        let mut chat = ChatSession::new();
        chat.add_user_message("What is love?");
        let message = chat.add_answer(
            response("See 1 Corinthians 13:4-7 and John 3:16.", Vec::new()),
            Locale::En,
        );
        let refs: Vec<_> = message.citations.iter().map(|c| c.reference.as_str()).collect();
        assert_eq!(refs, vec!["1 Corinthians 13:4-7", "John 3:16"]);
        assert!(!chat.loading);
    }

    #[test]
    fn test_answer_keeps_backend_citations() {
        let mut chat = ChatSession::new();
        let backend = vec![
            Citation {
                reference: "Psalm 23:1".to_string(),
                text: "The Lord is my shepherd".to_string(),
                spans: vec![Span::new(0, 4), Span::new(0, 500)],
            },
            Citation::from_ref("Psalm 23:1"),
            Citation::from_ref(""),
        ];
        let message = chat.add_answer(response("Trust the shepherd.", backend), Locale::En);
        assert_eq!(message.citations.len(), 1);
        assert_eq!(message.citations[0].spans, vec![Span::new(0, 4)]);
    }

    #[test]
    fn test_tap_and_clear() {
        let mut chat = ChatSession::new();
        let link = chat.tap_citation(&Citation::from_ref("Jn 3:16"), Locale::En);
        assert_eq!(link, "app://passage/John%203%3A16");
        assert_eq!(chat.last_tapped_citation_ref.as_deref(), Some("Jn 3:16"));

        chat.add_user_message("hi");
        chat.clear();
        assert!(chat.messages.is_empty());
        assert!(chat.last_tapped_citation_ref.is_none());
    }
}
