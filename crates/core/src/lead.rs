//! Lead record and partial lead updates
//!
//! `LeadRecord` is the per-session qualification state. It is only ever
//! changed by merging a `LeadUpdate` produced by the conversation engine.
//!
//! Invariants held by every write path:
//! - `score` is within `0..=100`
//! - `qualified == (score >= QUALIFICATION_THRESHOLD)`
//! - merging never lowers `score` and never moves `phase` backwards

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::conversation::{ConversationPhase, RecommendedAction};

/// Score at or above which a lead counts as qualified
pub const QUALIFICATION_THRESHOLD: u8 = 60;

/// Upper bound of the lead score
pub const MAX_SCORE: u8 = 100;

/// Clamp any intermediate score into `0..=100`
pub fn clamp_score(raw: i64) -> u8 {
    raw.clamp(0, MAX_SCORE as i64) as u8
}

/// Whether a score meets the qualification threshold
pub fn is_qualified(score: u8) -> bool {
    score >= QUALIFICATION_THRESHOLD
}

/// True when `word` appears in `text` as a whole alphanumeric token
pub fn contains_word(text: &str, word: &str) -> bool {
    text.split(|c: char| !c.is_alphanumeric())
        .any(|token| token.eq_ignore_ascii_case(word))
}

/// Project category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectType {
    AiMl,
    CustomSoftware,
    IntegrationAutomation,
    DataAnalytics,
}

impl ProjectType {
    pub fn label(&self) -> &'static str {
        match self {
            ProjectType::AiMl => "AI/ML Development",
            ProjectType::CustomSoftware => "Custom Software",
            ProjectType::IntegrationAutomation => "Integration/Automation",
            ProjectType::DataAnalytics => "Data Analytics",
        }
    }

    /// Best-effort mapping from a free-form label (e.g. remote analysis output)
    pub fn from_label(label: &str) -> Option<Self> {
        let lower = label.to_lowercase();
        if contains_word(&lower, "ai")
            || contains_word(&lower, "ml")
            || lower.contains("machine learning")
            || lower.contains("artificial intelligence")
            || lower.contains("computer vision")
        {
            Some(ProjectType::AiMl)
        } else if contains_word(&lower, "custom") || lower.contains("full-stack") {
            Some(ProjectType::CustomSoftware)
        } else if lower.contains("integration") || lower.contains("automation") {
            Some(ProjectType::IntegrationAutomation)
        } else if lower.contains("data") || lower.contains("analytics") {
            Some(ProjectType::DataAnalytics)
        } else {
            None
        }
    }
}

impl fmt::Display for ProjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Investment band, ordered from smallest to largest
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BudgetBand {
    From8kTo15k,
    From15kTo25k,
    From25kTo50k,
    Over50k,
}

impl BudgetBand {
    pub const ALL: [BudgetBand; 4] = [
        BudgetBand::From8kTo15k,
        BudgetBand::From15kTo25k,
        BudgetBand::From25kTo50k,
        BudgetBand::Over50k,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            BudgetBand::From8kTo15k => "$8K-$15K",
            BudgetBand::From15kTo25k => "$15K-$25K",
            BudgetBand::From25kTo50k => "$25K-$50K",
            BudgetBand::Over50k => "$50K+",
        }
    }

    /// Band containing an amount in dollars; `None` below $8K
    pub fn from_amount(dollars: f64) -> Option<Self> {
        if dollars >= 50_000.0 {
            Some(BudgetBand::Over50k)
        } else if dollars >= 25_000.0 {
            Some(BudgetBand::From25kTo50k)
        } else if dollars >= 15_000.0 {
            Some(BudgetBand::From15kTo25k)
        } else if dollars >= 8_000.0 {
            Some(BudgetBand::From8kTo15k)
        } else {
            None
        }
    }

    /// Map a band label such as "$25K-$50K" or "50k+" back to a band
    ///
    /// The lower bound of the label (its first amount) decides the band.
    pub fn from_label(label: &str) -> Option<Self> {
        let lower = label.to_lowercase().replace([' ', ','], "");
        if lower.contains("premium") {
            return Some(BudgetBand::Over50k);
        }

        let start = lower.find(|c: char| c.is_ascii_digit())?;
        let digits: String = lower[start..]
            .chars()
            .take_while(|c| c.is_ascii_digit())
            .collect();
        let value: f64 = digits.parse().ok()?;
        let amount = if lower[start + digits.len()..].starts_with('k') {
            value * 1_000.0
        } else {
            value
        };
        Self::from_amount(amount)
    }
}

impl fmt::Display for BudgetBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Delivery timeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Timeline {
    Asap,
    OneToTwoMonths,
    ThreeToSixMonths,
}

impl Timeline {
    pub fn label(&self) -> &'static str {
        match self {
            Timeline::Asap => "ASAP",
            Timeline::OneToTwoMonths => "1-2 months",
            Timeline::ThreeToSixMonths => "3-6 months",
        }
    }
}

impl fmt::Display for Timeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Urgency flag; only ever raised, never lowered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Urgency {
    High,
}

/// How much buying authority the visitor appears to have
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionAuthority {
    High,
    #[default]
    Medium,
    Low,
}

/// Qualitative read of the lead, produced alongside the score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeadInsights {
    /// 1-10
    pub complexity_score: u8,
    /// 1-10
    pub technical_sophistication: u8,
    pub decision_authority: DecisionAuthority,
    pub next_best_question: String,
}

/// Colour tier shown by the widget shell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreTier {
    Cold,
    Warm,
    Qualified,
}

impl ScoreTier {
    pub fn from_score(score: u8) -> Self {
        if is_qualified(score) {
            ScoreTier::Qualified
        } else if score > 30 {
            ScoreTier::Warm
        } else {
            ScoreTier::Cold
        }
    }
}

/// Per-session qualification state
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LeadRecord {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub project_type: Option<ProjectType>,
    pub timeline: Option<Timeline>,
    pub budget: Option<BudgetBand>,
    pub urgency: Option<Urgency>,
    pub company: Option<String>,
    pub challenges: Option<String>,
    score: u8,
    qualified: bool,
    pub phase: ConversationPhase,
}

impl LeadRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn score(&self) -> u8 {
        self.score
    }

    pub fn qualified(&self) -> bool {
        self.qualified
    }

    pub fn tier(&self) -> ScoreTier {
        ScoreTier::from_score(self.score)
    }

    /// Overwrite the score, keeping `qualified` in sync
    pub fn set_score(&mut self, score: u8) {
        self.score = score.min(MAX_SCORE);
        self.qualified = is_qualified(self.score);
    }

    /// Merge a partial update into this record
    ///
    /// Present fields replace stored ones, absent fields are kept. Budget
    /// keeps the highest band seen, matching the cumulative (`max`) score, and
    /// the phase only advances.
    pub fn merge(&mut self, update: &LeadUpdate) {
        fn take(slot: &mut Option<String>, value: &Option<String>) {
            if let Some(v) = value {
                *slot = Some(v.clone());
            }
        }

        take(&mut self.name, &update.name);
        take(&mut self.email, &update.email);
        take(&mut self.phone, &update.phone);
        take(&mut self.company, &update.company);
        take(&mut self.challenges, &update.challenges);

        self.project_type = update.project_type.or(self.project_type);
        self.timeline = update.timeline.or(self.timeline);
        self.budget = self.budget.max(update.budget);
        self.urgency = update.urgency.or(self.urgency);

        self.set_score(self.score.max(update.score()));

        if let Some(phase) = update.phase {
            self.phase = self.phase.advance_to(phase);
        }
    }

    /// Record with the update's categories layered on top, score untouched
    pub fn with_categories(&self, update: &LeadUpdate) -> LeadRecord {
        let mut merged = self.clone();
        merged.project_type = update.project_type.or(merged.project_type);
        merged.timeline = update.timeline.or(merged.timeline);
        merged.budget = merged.budget.max(update.budget);
        merged.urgency = update.urgency.or(merged.urgency);
        if update.email.is_some() {
            merged.email = update.email.clone();
        }
        merged
    }
}

/// Partial lead record produced by one engine turn
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LeadUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_type: Option<ProjectType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeline: Option<Timeline>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub budget: Option<BudgetBand>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub urgency: Option<Urgency>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub challenges: Option<String>,
    score: u8,
    qualified: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phase: Option<ConversationPhase>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<RecommendedAction>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub insights: Option<LeadInsights>,
}

impl LeadUpdate {
    /// Empty update carrying only a score
    pub fn with_score(score: u8) -> Self {
        let mut update = Self::default();
        update.set_score(score);
        update
    }

    pub fn score(&self) -> u8 {
        self.score
    }

    pub fn qualified(&self) -> bool {
        self.qualified
    }

    pub fn set_score(&mut self, score: u8) {
        self.score = score.min(MAX_SCORE);
        self.qualified = is_qualified(self.score);
    }

    /// True when no descriptive category was populated
    pub fn has_no_categories(&self) -> bool {
        self.name.is_none()
            && self.email.is_none()
            && self.phone.is_none()
            && self.project_type.is_none()
            && self.timeline.is_none()
            && self.budget.is_none()
            && self.urgency.is_none()
            && self.company.is_none()
            && self.challenges.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_score() {
        assert_eq!(clamp_score(-5), 0);
        assert_eq!(clamp_score(42), 42);
        assert_eq!(clamp_score(180), 100);
    }

    #[test]
    fn test_set_score_keeps_qualified_in_sync() {
        let mut lead = LeadRecord::new();
        lead.set_score(59);
        assert!(!lead.qualified());
        lead.set_score(60);
        assert!(lead.qualified());
        lead.set_score(250);
        assert_eq!(lead.score(), 100);
        assert!(lead.qualified());
    }

    #[test]
    fn test_merge_keeps_absent_fields() {
        let mut lead = LeadRecord::new();
        lead.project_type = Some(ProjectType::AiMl);
        lead.company = Some("Acme".to_string());

        let mut update = LeadUpdate::with_score(20);
        update.budget = Some(BudgetBand::From15kTo25k);
        lead.merge(&update);

        assert_eq!(lead.project_type, Some(ProjectType::AiMl));
        assert_eq!(lead.company.as_deref(), Some("Acme"));
        assert_eq!(lead.budget, Some(BudgetBand::From15kTo25k));
        assert_eq!(lead.score(), 20);
    }

    #[test]
    fn test_merge_never_lowers_score_or_phase() {
        let mut lead = LeadRecord::new();
        let mut high = LeadUpdate::with_score(70);
        high.phase = Some(ConversationPhase::Closing);
        lead.merge(&high);

        let mut low = LeadUpdate::with_score(10);
        low.phase = Some(ConversationPhase::Discovery);
        lead.merge(&low);

        assert_eq!(lead.score(), 70);
        assert!(lead.qualified());
        assert_eq!(lead.phase, ConversationPhase::Closing);
    }

    #[test]
    fn test_merge_keeps_highest_budget_band() {
        let mut lead = LeadRecord::new();
        let mut big = LeadUpdate::with_score(40);
        big.budget = Some(BudgetBand::Over50k);
        lead.merge(&big);

        let mut small = LeadUpdate::with_score(10);
        small.budget = Some(BudgetBand::From8kTo15k);
        lead.merge(&small);

        assert_eq!(lead.budget, Some(BudgetBand::Over50k));
        assert_eq!(lead.score(), 40);
        assert_eq!(
            lead.with_categories(&small).budget,
            Some(BudgetBand::Over50k)
        );
    }

    #[test]
    fn test_project_label_customer_is_not_custom() {
        assert_eq!(
            ProjectType::from_label("Customer Analytics"),
            Some(ProjectType::DataAnalytics)
        );
        assert_eq!(
            ProjectType::from_label("custom-built CRM"),
            Some(ProjectType::CustomSoftware)
        );
    }

    #[test]
    fn test_budget_band_from_amount() {
        assert_eq!(BudgetBand::from_amount(5_000.0), None);
        assert_eq!(BudgetBand::from_amount(8_000.0), Some(BudgetBand::From8kTo15k));
        assert_eq!(BudgetBand::from_amount(25_000.0), Some(BudgetBand::From25kTo50k));
        assert_eq!(BudgetBand::from_amount(120_000.0), Some(BudgetBand::Over50k));
        assert!(BudgetBand::From8kTo15k < BudgetBand::Over50k);
    }

    #[test]
    fn test_budget_band_from_label() {
        for band in BudgetBand::ALL {
            assert_eq!(BudgetBand::from_label(band.label()), Some(band));
        }
        assert_eq!(BudgetBand::from_label("budget mentioned"), None);
    }

    #[test]
    fn test_project_type_from_label() {
        assert_eq!(ProjectType::from_label("AI Integration"), Some(ProjectType::AiMl));
        assert_eq!(ProjectType::from_label("Custom Software"), Some(ProjectType::CustomSoftware));
        assert_eq!(
            ProjectType::from_label("Workflow automation"),
            Some(ProjectType::IntegrationAutomation)
        );
        assert_eq!(ProjectType::from_label("Data Analytics"), Some(ProjectType::DataAnalytics));
        // "maintain" must not read as "ai"
        assert_eq!(ProjectType::from_label("maintain legacy"), None);
    }

    #[test]
    fn test_score_tier() {
        assert_eq!(ScoreTier::from_score(0), ScoreTier::Cold);
        assert_eq!(ScoreTier::from_score(30), ScoreTier::Cold);
        assert_eq!(ScoreTier::from_score(31), ScoreTier::Warm);
        assert_eq!(ScoreTier::from_score(60), ScoreTier::Qualified);
    }

    #[test]
    fn test_update_serialization_skips_empty_fields() {
        let update = LeadUpdate::with_score(65);
        let json = serde_json::to_value(&update).unwrap();
        assert_eq!(json["score"], 65);
        assert_eq!(json["qualified"], true);
        assert!(json.get("budget").is_none());
        assert!(update.has_no_categories());
    }
}
