//! Lead qualification agent
//!
//! Features:
//! - Signal extraction from free-text visitor messages
//! - Additive lead scoring and a score/turn phase policy
//! - Conversation engine with concurrent reply and analysis branches
//! - Ordered fallback chain (remote analysis, local, heuristic, apology)
//! - Scripted mode reproducing the non-LLM widget
//! - Explicit per-session state with lead capture

pub mod analysis;
pub mod engine;
pub mod extractor;
pub mod fallback;
pub mod lead_scoring;
pub mod policy;
pub mod session;

pub use analysis::{local_analysis, AnalysisError, LeadIntelligence};
pub use engine::{AnalysisStage, ConversationEngine, ReplySource, TurnOutcome, TurnResponse};
pub use extractor::extract;
pub use fallback::{apology_update, canned_reply, heuristic_update, ScriptedResponder};
pub use lead_scoring::{is_business_email, qualification, score, ScoreBreakdown};
pub use policy::{decide, scripted_phase, Decision};
pub use session::{CapturedLead, ContactDetails, SessionState};

use thiserror::Error;

/// Agent errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AgentError {
    #[error("Message is empty")]
    EmptyMessage,

    #[error("Invalid contact details: {0}")]
    InvalidContact(String),
}
