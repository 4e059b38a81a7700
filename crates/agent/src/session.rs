//! Session State
//!
//! Transcript plus lead record for one visitor. The engine never touches it;
//! the shell appends the user message, runs a turn and applies the returned
//! delta.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use lead_agent_config::PromptsConfig;
use lead_agent_core::{user_turn_count, ConversationPhase, LeadRecord, LeadUpdate, Message};

use crate::engine::TurnResponse;
use crate::lead_scoring;
use crate::AgentError;

/// Contact form submission
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContactDetails {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
}

impl ContactDetails {
    /// Trimmed copy, rejecting a blank name or an address without `@`
    pub fn normalized(&self) -> Result<Self, AgentError> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(AgentError::InvalidContact("name is required".to_string()));
        }

        let email = self.email.trim();
        match email.split_once('@') {
            Some((local, domain)) if !local.is_empty() && domain.contains('.') => {}
            _ => {
                return Err(AgentError::InvalidContact(format!(
                    "invalid email address: {}",
                    email
                )))
            }
        }

        Ok(Self {
            name: name.to_string(),
            email: email.to_string(),
            phone: self
                .phone
                .as_deref()
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(str::to_string),
        })
    }
}

/// Durable record of a captured lead
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapturedLead {
    #[serde(flatten)]
    pub lead: LeadRecord,
    pub captured_at: DateTime<Utc>,
    pub transcript: Vec<Message>,
}

/// Per-visitor conversation state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionState {
    pub id: String,
    pub created_at: DateTime<Utc>,
    transcript: Vec<Message>,
    lead: LeadRecord,
}

impl SessionState {
    /// New session whose transcript starts with the greeting
    pub fn new(greeting: impl Into<String>) -> Self {
        Self::with_id(uuid::Uuid::new_v4().to_string(), greeting)
    }

    pub fn with_id(id: impl Into<String>, greeting: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            created_at: Utc::now(),
            transcript: vec![Message::bot(greeting)],
            lead: LeadRecord::new(),
        }
    }

    pub fn transcript(&self) -> &[Message] {
        &self.transcript
    }

    pub fn lead(&self) -> &LeadRecord {
        &self.lead
    }

    /// Append a visitor message; blank input is rejected
    pub fn push_user_message(&mut self, text: &str) -> Result<&Message, AgentError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(AgentError::EmptyMessage);
        }
        self.transcript.push(Message::user(text));
        Ok(&self.transcript[self.transcript.len() - 1])
    }

    /// Append the bot message and merge the lead delta
    pub fn apply_turn(&mut self, turn: &TurnResponse) {
        self.transcript.push(turn.bot_message.clone());
        self.lead.merge(&turn.lead_update);
    }

    pub fn user_turn_count(&self) -> usize {
        user_turn_count(&self.transcript)
    }

    /// The contact form appears once the lead is qualified and closing
    pub fn should_offer_contact_form(&self) -> bool {
        self.lead.qualified() && self.lead.phase == ConversationPhase::Closing
    }

    /// Capture the lead with the visitor's contact details
    ///
    /// Rescores with the contact-domain signal, appends the confirmation
    /// message and returns the durable record.
    pub fn capture(
        &mut self,
        details: &ContactDetails,
        prompts: &PromptsConfig,
    ) -> Result<CapturedLead, AgentError> {
        let details = details.normalized()?;

        let mut update = LeadUpdate::default();
        update.name = Some(details.name.clone());
        update.email = Some(details.email.clone());
        update.phone = details.phone.clone();

        let rescored = self.lead.with_categories(&update);
        update.set_score(lead_scoring::score(&rescored));
        self.lead.merge(&update);

        self.transcript
            .push(Message::bot(prompts.confirmation(&details.name)));

        tracing::info!(
            session_id = %self.id,
            score = self.lead.score(),
            qualified = self.lead.qualified(),
            "Lead captured"
        );

        Ok(CapturedLead {
            lead: self.lead.clone(),
            captured_at: Utc::now(),
            transcript: self.transcript.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{AnalysisStage, ReplySource, TurnOutcome};
    use lead_agent_core::{BudgetBand, ProjectType, RecommendedAction};

    fn turn(text: &str, score: u8, phase: ConversationPhase) -> TurnResponse {
        let mut update = LeadUpdate::with_score(score);
        update.phase = Some(phase);
        TurnResponse {
            bot_message: Message::bot(text),
            lead_update: update,
            outcome: TurnOutcome {
                reply: ReplySource::Llm,
                analysis: AnalysisStage::Local,
                latency_ms: 1,
            },
        }
    }

    fn details() -> ContactDetails {
        ContactDetails {
            name: " Dana ".to_string(),
            email: "dana@acme-corp.io".to_string(),
            phone: Some("  ".to_string()),
        }
    }

    #[test]
    fn test_new_session_has_greeting_and_zero_lead() {
        let session = SessionState::new("Hello!");
        assert_eq!(session.transcript().len(), 1);
        assert!(session.transcript()[0].sent_by_bot);
        assert_eq!(session.lead().score(), 0);
        assert_eq!(session.user_turn_count(), 0);
        assert!(!session.should_offer_contact_form());
    }

    #[test]
    fn test_push_user_message() {
        let mut session = SessionState::new("Hello!");
        assert!(matches!(session.push_user_message("   "), Err(AgentError::EmptyMessage)));

        let msg = session.push_user_message("  We need an app ").unwrap();
        assert_eq!(msg.content, "We need an app");
        assert_eq!(session.user_turn_count(), 1);
    }

    #[test]
    fn test_apply_turn_is_cumulative() {
        let mut session = SessionState::new("Hello!");
        session.push_user_message("AI project").unwrap();
        session.apply_turn(&turn("Great", 65, ConversationPhase::Closing));
        assert!(session.should_offer_contact_form());

        session.push_user_message("anything else?").unwrap();
        session.apply_turn(&turn("Sure", 20, ConversationPhase::Discovery));
        assert_eq!(session.lead().score(), 65);
        assert_eq!(session.lead().phase, ConversationPhase::Closing);
        assert_eq!(session.transcript().len(), 5);
    }

    #[test]
    fn test_contact_form_needs_closing_phase() {
        let mut session = SessionState::new("Hello!");
        session.apply_turn(&turn("ok", 70, ConversationPhase::Qualification));
        assert!(session.lead().qualified());
        assert!(!session.should_offer_contact_form());
    }

    #[test]
    fn test_capture_adds_domain_signal() {
        let mut session = SessionState::new("Hello!");
        let mut update = LeadUpdate::with_score(50);
        update.project_type = Some(ProjectType::CustomSoftware);
        update.budget = Some(BudgetBand::From25kTo50k);
        update.action = Some(RecommendedAction::QualifyBudget);
        session.apply_turn(&TurnResponse {
            bot_message: Message::bot("ok"),
            lead_update: update,
            outcome: TurnOutcome {
                reply: ReplySource::Llm,
                analysis: AnalysisStage::Local,
                latency_ms: 1,
            },
        });

        let captured = session.capture(&details(), &PromptsConfig::default()).unwrap();

        // 20 custom + 30 budget + 10 business domain
        assert_eq!(captured.lead.score(), 60);
        assert!(captured.lead.qualified());
        assert_eq!(captured.lead.name.as_deref(), Some("Dana"));
        assert_eq!(captured.lead.phone, None);
        let last = captured.transcript.last().unwrap();
        assert!(last.sent_by_bot);
        assert!(last.content.starts_with("Thanks Dana!"));
    }

    #[test]
    fn test_capture_never_lowers_score() {
        let mut session = SessionState::new("Hello!");
        session.apply_turn(&turn("ok", 90, ConversationPhase::Closing));

        let mut free = details();
        free.email = "dana@gmail.com".to_string();
        let captured = session.capture(&free, &PromptsConfig::default()).unwrap();
        assert_eq!(captured.lead.score(), 90);
    }

    #[test]
    fn test_capture_rejects_invalid_contact() {
        let mut session = SessionState::new("Hello!");
        let mut bad = details();
        bad.email = "dana".to_string();
        assert!(matches!(
            session.capture(&bad, &PromptsConfig::default()),
            Err(AgentError::InvalidContact(_))
        ));
        assert_eq!(session.transcript().len(), 1);
    }

    #[test]
    fn test_captured_lead_serializes_flat() {
        let mut session = SessionState::new("Hello!");
        let captured = session.capture(&details(), &PromptsConfig::default()).unwrap();
        let json = serde_json::to_value(&captured).unwrap();
        assert_eq!(json["name"], "Dana");
        assert!(json["captured_at"].is_string());
        assert_eq!(json["transcript"].as_array().unwrap().len(), 2);
    }
}
