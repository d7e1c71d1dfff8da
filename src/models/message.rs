//! Chat message model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Citation;

/// Who wrote a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The person using the app
    User,
    /// The AI assistant
    Assistant,
}

/// A chat transcript entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Unique ID
    pub id: Uuid,
    /// Author role
    pub role: Role,
    /// Message text
    pub content: String,
    /// Citations (assistant messages only)
    #[serde(default)]
    pub citations: Vec<Citation>,
    /// When the message was added
    pub timestamp: DateTime<Utc>,
}

impl Message {
    /// Create a user message
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            role: Role::User,
            content: content.into(),
            citations: Vec::new(),
            timestamp: Utc::now(),
        }
    }

    /// Create an assistant message with its resolved citations
    pub fn assistant(content: impl Into<String>, citations: Vec<Citation>) -> Self {
        Self {
            id: Uuid::new_v4(),
            role: Role::Assistant,
            content: content.into(),
            citations,
            timestamp: Utc::now(),
        }
    }

    /// Whether the user wrote this message
    pub fn is_user(&self) -> bool {
        self.role == Role::User
    }
}
