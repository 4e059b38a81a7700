//! Lead analysis
//!
//! Two producers of a `LeadUpdate` for a turn:
//! - `local_analysis`: Signal Extractor + Score Model + Policy
//! - `LeadIntelligence`: the strict-JSON reply of the remote analysis prompt,
//!   validated field by field with a fixed default for every field
//!
//! In both cases the policy decides the recorded phase and action.

use serde_json::{Map, Value};
use thiserror::Error;

use lead_agent_core::{
    clamp_score, contains_word, BudgetBand, ConversationPhase, DecisionAuthority, LeadInsights,
    LeadRecord, LeadUpdate, ProjectType, RecommendedAction, Urgency,
};
use lead_agent_llm::LlmError;

use crate::extractor;
use crate::lead_scoring;
use crate::policy::{self, Decision};

/// Analysis errors; every variant is recovered by the next fallback stage
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnalysisError {
    #[error("Malformed analysis output: {0}")]
    Malformed(String),

    #[error("Utterance too long for analysis: {len} > {max} chars")]
    InputTooLong { len: usize, max: usize },

    #[error("Remote analysis failed: {0}")]
    Llm(#[from] LlmError),
}

pub const DEFAULT_PROJECT_LABEL: &str = "Software Development";
pub const DEFAULT_RATING: u8 = 5;

const TECHNICAL_TERMS: &[&str] = &["api", "integration", "architecture", "microservice", "database"];
const AUTHORITY_TERMS: &[&str] = &["ceo", "cto", "founder", "owner", "we need"];
const NO_AUTHORITY_TERMS: &[&str] = &["my boss", "my manager", "need approval", "not my decision"];

/// Qualitative read of an utterance at a given score
pub fn insights_for(text: &str, score: u8) -> LeadInsights {
    let lower = text.to_lowercase();

    let technical_sophistication = if TECHNICAL_TERMS
        .iter()
        .any(|t| contains_word(&lower, t) || (t.len() > 3 && lower.contains(t)))
    {
        7
    } else {
        DEFAULT_RATING
    };

    let decision_authority = if AUTHORITY_TERMS
        .iter()
        .any(|t| contains_word(&lower, t) || (t.contains(' ') && lower.contains(t)))
    {
        DecisionAuthority::High
    } else if NO_AUTHORITY_TERMS.iter().any(|t| lower.contains(t)) {
        DecisionAuthority::Low
    } else {
        DecisionAuthority::Medium
    };

    LeadInsights {
        complexity_score: (score / 10).clamp(1, 10),
        technical_sophistication,
        decision_authority,
        next_best_question: policy::default_next_question(score).to_string(),
    }
}

/// Local analysis of the latest utterance
///
/// Fails only when the utterance exceeds `max_chars`; the caller then falls
/// back to the additive heuristic.
pub fn local_analysis(
    utterance: &str,
    current: &LeadRecord,
    user_turns: usize,
    max_chars: usize,
) -> Result<LeadUpdate, AnalysisError> {
    let len = utterance.chars().count();
    if len > max_chars {
        return Err(AnalysisError::InputTooLong { len, max: max_chars });
    }

    let mut update = extractor::extract(utterance);
    let merged = current.with_categories(&update);
    let score = current.score().max(lead_scoring::score(&merged));

    apply_decision(&mut update, score, user_turns);
    update.insights = Some(insights_for(utterance, score));

    Ok(update)
}

/// Set score, phase and action from the policy
pub(crate) fn apply_decision(update: &mut LeadUpdate, score: u8, user_turns: usize) -> Decision {
    let decision = policy::decide(score, user_turns);
    update.set_score(score);
    update.phase = Some(decision.phase);
    update.action = Some(decision.action);
    decision
}

/// Validated remote analysis
#[derive(Debug, Clone, PartialEq)]
pub struct LeadIntelligence {
    pub project_type: String,
    pub complexity_score: u8,
    pub budget_signals: Vec<String>,
    pub urgency_indicators: Vec<String>,
    pub technical_sophistication: u8,
    pub decision_authority: DecisionAuthority,
    pub lead_score: u8,
    pub next_best_question: String,
    pub conversation_phase: ConversationPhase,
    pub recommended_action: RecommendedAction,
}

impl LeadIntelligence {
    /// Parse the raw completion text
    ///
    /// Output that is not a JSON object is `Malformed`. Missing or invalid
    /// fields take their defaults: `lead_score` falls back to
    /// `current_score`, phase and action to the policy decision.
    pub fn parse(raw: &str, current_score: u8, user_turns: usize) -> Result<Self, AnalysisError> {
        let body = strip_code_fences(raw);
        let value: Value =
            serde_json::from_str(body).map_err(|e| AnalysisError::Malformed(e.to_string()))?;
        let Value::Object(fields) = value else {
            return Err(AnalysisError::Malformed("expected a JSON object".to_string()));
        };

        let lead_score = lead_score_field(&fields).unwrap_or(current_score);
        let decision = policy::decide(lead_score, user_turns);

        Ok(Self {
            project_type: non_empty_string(&fields, "projectType")
                .unwrap_or_else(|| DEFAULT_PROJECT_LABEL.to_string()),
            complexity_score: rating_field(&fields, "complexityScore").unwrap_or(DEFAULT_RATING),
            budget_signals: string_list(&fields, "budgetSignals").unwrap_or_default(),
            urgency_indicators: string_list(&fields, "urgencyIndicators").unwrap_or_default(),
            technical_sophistication: rating_field(&fields, "technicalSophistication")
                .unwrap_or(DEFAULT_RATING),
            decision_authority: enum_field(&fields, "decisionAuthority", parse_authority)
                .unwrap_or_default(),
            lead_score,
            next_best_question: non_empty_string(&fields, "nextBestQuestion")
                .unwrap_or_else(|| policy::default_next_question(lead_score).to_string()),
            conversation_phase: enum_field(&fields, "conversationPhase", |s| s.parse().ok())
                .unwrap_or(decision.phase),
            recommended_action: enum_field(&fields, "recommendedAction", |s| s.parse().ok())
                .unwrap_or(decision.action),
        })
    }

    /// Convert into a lead update for a lead currently at `current_score`
    ///
    /// The score stays cumulative and the policy decision replaces the
    /// model's phase and action, which are only logged.
    pub fn into_update(self, current_score: u8, user_turns: usize) -> LeadUpdate {
        let mut update = LeadUpdate::default();
        update.project_type = ProjectType::from_label(&self.project_type);
        update.budget = self
            .budget_signals
            .iter()
            .filter_map(|s| BudgetBand::from_label(s))
            .max();

        if self
            .urgency_indicators
            .iter()
            .any(|s| extractor::extract(s).urgency.is_some())
        {
            update.urgency = Some(Urgency::High);
        }

        let score = current_score.max(self.lead_score);
        let decision = apply_decision(&mut update, score, user_turns);
        if decision.phase != self.conversation_phase || decision.action != self.recommended_action
        {
            tracing::debug!(
                remote_phase = %self.conversation_phase,
                remote_action = %self.recommended_action,
                phase = %decision.phase,
                action = %decision.action,
                "Remote analysis disagrees with policy, keeping policy"
            );
        }

        update.insights = Some(LeadInsights {
            complexity_score: self.complexity_score,
            technical_sophistication: self.technical_sophistication,
            decision_authority: self.decision_authority,
            next_best_question: self.next_best_question,
        });

        update
    }
}

/// Remove a surrounding markdown code fence, if any
pub fn strip_code_fences(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // drop the info string (```json)
    let rest = match rest.find('\n') {
        Some(idx) => &rest[idx + 1..],
        None => rest,
    };
    rest.trim_end().trim_end_matches("```").trim()
}

fn non_empty_string(fields: &Map<String, Value>, key: &str) -> Option<String> {
    fields
        .get(key)?
        .as_str()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Number in `1..=10`; out-of-range values are invalid, not clamped
fn rating_field(fields: &Map<String, Value>, key: &str) -> Option<u8> {
    let n = fields.get(key)?.as_f64()?;
    if (1.0..=10.0).contains(&n) {
        Some(n.round() as u8)
    } else {
        None
    }
}

/// Integer score, clamped into `0..=100`
fn lead_score_field(fields: &Map<String, Value>) -> Option<u8> {
    let value = fields.get("leadScore")?;
    if let Some(n) = value.as_i64() {
        return Some(clamp_score(n));
    }
    let n = value.as_f64()?;
    (n.fract() == 0.0).then(|| clamp_score(n as i64))
}

fn string_list(fields: &Map<String, Value>, key: &str) -> Option<Vec<String>> {
    fields
        .get(key)?
        .as_array()?
        .iter()
        .map(|v| v.as_str().map(str::to_string))
        .collect()
}

fn enum_field<T>(
    fields: &Map<String, Value>,
    key: &str,
    parse: impl Fn(&str) -> Option<T>,
) -> Option<T> {
    fields.get(key)?.as_str().and_then(|s| parse(&s.trim().to_lowercase()))
}

fn parse_authority(s: &str) -> Option<DecisionAuthority> {
    match s {
        "high" => Some(DecisionAuthority::High),
        "medium" => Some(DecisionAuthority::Medium),
        "low" => Some(DecisionAuthority::Low),
        _ => None,
    }
}
