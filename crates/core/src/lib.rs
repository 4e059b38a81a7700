//! Core types for the lead qualification agent
//!
//! This crate provides the foundational types used across all other crates:
//! - Transcript messages
//! - Lead record and partial lead updates
//! - Conversation phases, recommended actions, client profiles
//! - Error types

pub mod conversation;
pub mod error;
pub mod lead;
pub mod transcript;

pub use conversation::{ClientProfile, ConversationPhase, RecommendedAction};
pub use error::{Error, Result};
pub use lead::{
    clamp_score, contains_word, is_qualified, BudgetBand, DecisionAuthority, LeadInsights,
    LeadRecord, LeadUpdate, ProjectType, ScoreTier, Timeline, Urgency, MAX_SCORE,
    QUALIFICATION_THRESHOLD,
};
pub use transcript::{last_user_message, user_turn_count, Message};
