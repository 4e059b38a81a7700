//! Prompt Building
//!
//! Maps a session transcript onto role-tagged chat messages.

use serde::{Deserialize, Serialize};
use std::fmt;

use lead_agent_core::Message as TranscriptMessage;

/// Message role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Chat message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

impl From<&TranscriptMessage> for Message {
    fn from(msg: &TranscriptMessage) -> Self {
        if msg.sent_by_bot {
            Message::assistant(msg.content.clone())
        } else {
            Message::user(msg.content.clone())
        }
    }
}

/// Prompt builder
#[derive(Debug, Clone, Default)]
pub struct PromptBuilder {
    messages: Vec<Message>,
}

impl PromptBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a system instruction
    pub fn system(mut self, content: impl Into<String>) -> Self {
        self.messages.push(Message::system(content));
        self
    }

    /// Append the transcript in order (bot turns become `assistant`)
    pub fn transcript(mut self, transcript: &[TranscriptMessage]) -> Self {
        self.messages.extend(transcript.iter().map(Message::from));
        self
    }

    pub fn user(mut self, content: impl Into<String>) -> Self {
        self.messages.push(Message::user(content));
        self
    }

    pub fn build(self) -> Vec<Message> {
        self.messages
    }
}

/// Render a transcript as plain `Role: text` lines for the analysis prompt
pub fn render_transcript(transcript: &[TranscriptMessage]) -> String {
    transcript
        .iter()
        .map(|m| {
            let speaker = if m.sent_by_bot { "Assistant" } else { "Visitor" };
            format!("{}: {}", speaker, m.content)
        })
        .collect::<Vec<_>>()
        .join("\n")
}
