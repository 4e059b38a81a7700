//! Transcript messages
//!
//! A transcript is the ordered sequence of bot and visitor messages in one
//! session. Order matters: turn counting and "last user message" lookups both
//! depend on insertion order.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single chat message. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub content: String,
    pub sent_by_bot: bool,
    pub sent_at: DateTime<Utc>,
}

impl Message {
    pub fn bot(content: impl Into<String>) -> Self {
        Self::new(content, true)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(content, false)
    }

    fn new(content: impl Into<String>, sent_by_bot: bool) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            content: content.into(),
            sent_by_bot,
            sent_at: Utc::now(),
        }
    }
}

/// Number of visitor messages in the transcript
pub fn user_turn_count(transcript: &[Message]) -> usize {
    transcript.iter().filter(|m| !m.sent_by_bot).count()
}

/// Most recent visitor message, if any
pub fn last_user_message(transcript: &[Message]) -> Option<&Message> {
    transcript.iter().rev().find(|m| !m.sent_by_bot)
}
