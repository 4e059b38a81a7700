//! Lead Score Model
//!
//! Additive, deterministic scoring of a lead record:
//! - Budget band: 10 / 20 / 30 / 40
//! - Project type: AI/ML 30, custom software 20, integration 15
//! - Timeline: ASAP 20, 1-2 months 15, 3-6 months 10
//! - Contact domain: +10 for a non-free e-mail domain
//!
//! Every category is capped at its own maximum and the total is clamped to
//! `0..=100`.

use serde::{Deserialize, Serialize};

use lead_agent_core::{
    clamp_score, is_qualified, BudgetBand, LeadRecord, ProjectType, Timeline,
};

/// Per-category maxima
pub const MAX_BUDGET_POINTS: u8 = 40;
pub const MAX_PROJECT_POINTS: u8 = 30;
pub const MAX_TIMELINE_POINTS: u8 = 20;
pub const MAX_CONTACT_POINTS: u8 = 10;

/// Consumer mail providers that earn no contact-domain points
const FREE_EMAIL_PROVIDERS: &[&str] = &[
    "gmail.com",
    "googlemail.com",
    "yahoo.com",
    "hotmail.com",
    "outlook.com",
    "live.com",
    "aol.com",
    "icloud.com",
    "me.com",
    "msn.com",
    "protonmail.com",
    "proton.me",
    "gmx.com",
    "mail.com",
    "yandex.com",
    "zoho.com",
];

/// Provider names that are free regardless of country TLD (`yahoo.co.uk`)
const FREE_EMAIL_BRANDS: &[&str] = &[
    "gmail", "yahoo", "hotmail", "outlook", "live", "aol", "icloud", "msn", "protonmail", "gmx",
    "yandex",
];

/// Score breakdown by category
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub budget: u8,
    pub project: u8,
    pub timeline: u8,
    pub contact: u8,
}

impl ScoreBreakdown {
    pub fn for_record(record: &LeadRecord) -> Self {
        Self {
            budget: budget_points(record.budget).min(MAX_BUDGET_POINTS),
            project: project_points(record.project_type).min(MAX_PROJECT_POINTS),
            timeline: timeline_points(record.timeline).min(MAX_TIMELINE_POINTS),
            contact: contact_points(record.email.as_deref()).min(MAX_CONTACT_POINTS),
        }
    }

    /// Sum clamped to `0..=100`
    pub fn total(&self) -> u8 {
        let sum = self.budget as i64 + self.project as i64 + self.timeline as i64 + self.contact as i64;
        clamp_score(sum)
    }
}

/// Score a lead record
pub fn score(record: &LeadRecord) -> u8 {
    ScoreBreakdown::for_record(record).total()
}

/// Whether a score qualifies the lead (fixed threshold 60)
pub fn qualification(score: u8) -> bool {
    is_qualified(score)
}

fn budget_points(band: Option<BudgetBand>) -> u8 {
    match band {
        Some(BudgetBand::From8kTo15k) => 10,
        Some(BudgetBand::From15kTo25k) => 20,
        Some(BudgetBand::From25kTo50k) => 30,
        Some(BudgetBand::Over50k) => 40,
        None => 0,
    }
}

fn project_points(project: Option<ProjectType>) -> u8 {
    match project {
        Some(ProjectType::AiMl) => 30,
        Some(ProjectType::CustomSoftware) => 20,
        Some(ProjectType::IntegrationAutomation) => 15,
        Some(ProjectType::DataAnalytics) | None => 0,
    }
}

fn timeline_points(timeline: Option<Timeline>) -> u8 {
    match timeline {
        Some(Timeline::Asap) => 20,
        Some(Timeline::OneToTwoMonths) => 15,
        Some(Timeline::ThreeToSixMonths) => 10,
        None => 0,
    }
}

fn contact_points(email: Option<&str>) -> u8 {
    match email {
        Some(email) if is_business_email(email) => MAX_CONTACT_POINTS,
        _ => 0,
    }
}

/// True when the address has a domain outside the free-provider set
pub fn is_business_email(email: &str) -> bool {
    let email = email.trim().to_lowercase();
    let Some((local, domain)) = email.rsplit_once('@') else {
        return false;
    };
    if local.is_empty() || !domain.contains('.') || domain.starts_with('.') {
        return false;
    }

    if FREE_EMAIL_PROVIDERS.contains(&domain) {
        return false;
    }

    let brand = domain.split('.').next().unwrap_or_default();
    !FREE_EMAIL_BRANDS.contains(&brand)
}
