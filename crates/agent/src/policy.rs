//! Phase/Action Policy
//!
//! One canonical ladder keyed on score and user turn count. The turn-only
//! ladder (`scripted_phase`) picks scripted reply templates and never writes
//! a lead's phase.

use serde::{Deserialize, Serialize};

use lead_agent_core::{ConversationPhase, RecommendedAction, QUALIFICATION_THRESHOLD};

/// Score at which the bot starts qualifying budget
pub const BUDGET_PROBE_THRESHOLD: u8 = 40;

/// User turns after which a non-qualified lead moves to qualification
pub const DISCOVERY_TURNS: usize = 3;

/// Phase and action for the next bot turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decision {
    pub phase: ConversationPhase,
    pub action: RecommendedAction,
}

/// Decide phase and action from the cumulative score and user turn count
pub fn decide(score: u8, user_turn_count: usize) -> Decision {
    if score >= QUALIFICATION_THRESHOLD {
        return Decision {
            phase: ConversationPhase::Closing,
            action: RecommendedAction::BookConsultation,
        };
    }

    let phase = if user_turn_count > DISCOVERY_TURNS {
        ConversationPhase::Qualification
    } else {
        ConversationPhase::Discovery
    };

    let action = if score >= BUDGET_PROBE_THRESHOLD {
        RecommendedAction::QualifyBudget
    } else {
        RecommendedAction::Continue
    };

    Decision { phase, action }
}

/// Turn-indexed ladder used only for scripted templates
pub fn scripted_phase(user_turn_count: usize) -> ConversationPhase {
    match user_turn_count {
        0..=2 => ConversationPhase::Discovery,
        3..=4 => ConversationPhase::Qualification,
        _ => ConversationPhase::Closing,
    }
}

/// Question to steer the next turn when nothing better is known
pub fn default_next_question(score: u8) -> &'static str {
    if score >= QUALIFICATION_THRESHOLD {
        "Would you like to book a short technical consultation with our lead developer?"
    } else if score >= BUDGET_PROBE_THRESHOLD {
        "What timeline are you working with for this project?"
    } else {
        "What specific technical challenges are you facing?"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decide_examples() {
        assert_eq!(
            decide(60, 5),
            Decision {
                phase: ConversationPhase::Closing,
                action: RecommendedAction::BookConsultation,
            }
        );
        assert_eq!(
            decide(45, 2),
            Decision {
                phase: ConversationPhase::Discovery,
                action: RecommendedAction::QualifyBudget,
            }
        );
        assert_eq!(
            decide(10, 10),
            Decision {
                phase: ConversationPhase::Qualification,
                action: RecommendedAction::Continue,
            }
        );
    }

    #[test]
    fn test_threshold_edges() {
        assert_eq!(decide(60, 0).phase, ConversationPhase::Closing);
        assert_eq!(decide(59, 0).action, RecommendedAction::QualifyBudget);
        assert_eq!(decide(40, 3).phase, ConversationPhase::Discovery);
        assert_eq!(decide(39, 4).action, RecommendedAction::Continue);
        assert_eq!(decide(39, 4).phase, ConversationPhase::Qualification);
    }

    #[test]
    fn test_scripted_phase() {
        assert_eq!(scripted_phase(1), ConversationPhase::Discovery);
        assert_eq!(scripted_phase(2), ConversationPhase::Discovery);
        assert_eq!(scripted_phase(3), ConversationPhase::Qualification);
        assert_eq!(scripted_phase(4), ConversationPhase::Qualification);
        assert_eq!(scripted_phase(5), ConversationPhase::Closing);
    }

    #[test]
    fn test_default_next_question_tracks_score() {
        assert_ne!(default_next_question(10), default_next_question(45));
        assert!(default_next_question(70).contains("consultation"));
    }
}
