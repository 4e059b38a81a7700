//! Conversation phases and recommended actions

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Conversation phases for the qualification flow
///
/// Ordered: a session only ever moves forward through
/// `Discovery -> Qualification -> Closing`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum ConversationPhase {
    /// Understanding the visitor's problem
    #[default]
    Discovery,
    /// Probing scope, budget and timeline
    Qualification,
    /// Steering a qualified lead to a consultation
    Closing,
}

impl ConversationPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConversationPhase::Discovery => "discovery",
            ConversationPhase::Qualification => "qualification",
            ConversationPhase::Closing => "closing",
        }
    }

    /// Forward-only transition: returns the later of the two phases
    pub fn advance_to(self, next: ConversationPhase) -> ConversationPhase {
        self.max(next)
    }

    /// Generic guidance for the reply prompt in this phase
    pub fn prompt_guidance(&self) -> &'static str {
        match self {
            ConversationPhase::Discovery => {
                "Understand the technical challenge and the business problem behind it. \
                 Ask one open question."
            },
            ConversationPhase::Qualification => {
                "Clarify scope, timeline and the investment they have in mind \
                 without asking for a number directly."
            },
            ConversationPhase::Closing => {
                "The project is a good fit. Offer a short technical consultation \
                 with the lead developer."
            },
        }
    }
}

impl fmt::Display for ConversationPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConversationPhase {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "discovery" => Ok(ConversationPhase::Discovery),
            "qualification" => Ok(ConversationPhase::Qualification),
            "closing" => Ok(ConversationPhase::Closing),
            other => Err(crate::Error::InvalidValue {
                field: "conversation_phase",
                value: other.to_string(),
            }),
        }
    }
}

/// Recommended next move for the bot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendedAction {
    /// Keep exploring the problem
    #[default]
    Continue,
    /// Gently probe the investment range
    QualifyBudget,
    /// Hand off to a human: show the contact form
    BookConsultation,
    /// Politely point the visitor elsewhere
    Redirect,
}

impl RecommendedAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecommendedAction::Continue => "continue",
            RecommendedAction::QualifyBudget => "qualify_budget",
            RecommendedAction::BookConsultation => "book_consultation",
            RecommendedAction::Redirect => "redirect",
        }
    }
}

impl fmt::Display for RecommendedAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RecommendedAction {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "continue" => Ok(RecommendedAction::Continue),
            "qualify_budget" => Ok(RecommendedAction::QualifyBudget),
            "book_consultation" => Ok(RecommendedAction::BookConsultation),
            "redirect" => Ok(RecommendedAction::Redirect),
            other => Err(crate::Error::InvalidValue {
                field: "recommended_action",
                value: other.to_string(),
            }),
        }
    }
}

/// Client class, used to pick timeouts and reply length
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClientProfile {
    #[default]
    Desktop,
    Mobile,
}

impl ClientProfile {
    const MOBILE_MARKERS: [&'static str; 8] = [
        "android",
        "webos",
        "iphone",
        "ipad",
        "ipod",
        "blackberry",
        "iemobile",
        "opera mini",
    ];

    /// Classify a User-Agent header value
    pub fn from_user_agent(user_agent: &str) -> Self {
        let ua = user_agent.to_ascii_lowercase();
        if Self::MOBILE_MARKERS.iter().any(|m| ua.contains(m)) {
            ClientProfile::Mobile
        } else {
            ClientProfile::Desktop
        }
    }

    pub fn is_mobile(&self) -> bool {
        matches!(self, ClientProfile::Mobile)
    }
}
