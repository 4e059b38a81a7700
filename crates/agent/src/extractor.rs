//! Signal Extractor
//!
//! Rule-based extraction of lead categories from a single utterance. Each
//! category is independent and the first match in its priority order wins.
//! Matching is done on the lower-cased text; short keywords (`ai`, `ml`,
//! `app`, `api`) only count as whole words so "email" or "maintain" do not
//! look like AI projects.

use once_cell::sync::Lazy;
use regex::Regex;

use lead_agent_core::{contains_word, BudgetBand, LeadUpdate, ProjectType, Timeline, Urgency};

/// Amount with an optional magnitude suffix, e.g. `25k`, `1.5 million`, `25,000`
static AMOUNT_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\d[\d,]*(?:\.\d+)?)\s*(k|thousand|million|m)?\b").unwrap()
});

/// Explicit 3-6 month horizon
static MID_TERM_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"\b(?:[3-6]|three|four|five|six)(?:\s*(?:-|to|or)\s*(?:[3-6]|three|four|five|six))?\s*months?\b",
    )
    .unwrap()
});

/// Explicit 1-2 month horizon; longer or unspecified month counts stay unset
static NEAR_TERM_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"\b(?:(?:1|one)\s*(?:-|to|or)\s*(?:2|two)|(?:a\s+)?couple\s+(?:of\s+)?|a|one|two|next|1|2)\s*months?\b|\b(?:few|couple(?:\s+of)?)\s+weeks\b",
    )
    .unwrap()
});

static EMAIL_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[a-z0-9._%+-]+@[a-z0-9-]+(?:\.[a-z0-9-]+)*\.[a-z]{2,}").unwrap()
});

const BUDGET_CUES: &[&str] = &["$", "usd", "budget", "cost", "invest", "spend", "price"];

/// Keyword table per project type; words match whole tokens, phrases substrings
struct ProjectKeywords {
    project_type: ProjectType,
    words: &'static [&'static str],
    phrases: &'static [&'static str],
}

/// Fixed priority order: AI/ML, custom software, integration, data
const PROJECT_KEYWORDS: &[ProjectKeywords] = &[
    ProjectKeywords {
        project_type: ProjectType::AiMl,
        words: &["ai", "ml", "llm", "llms", "nlp", "gpt"],
        phrases: &[
            "machine learning",
            "artificial intelligence",
            "deep learning",
            "neural network",
            "computer vision",
            "chatbot",
        ],
    },
    ProjectKeywords {
        project_type: ProjectType::CustomSoftware,
        words: &["app", "apps", "saas"],
        phrases: &[
            "custom software",
            "custom app",
            "custom-built",
            "software",
            "platform",
            "application",
            "website",
            "full-stack",
        ],
    },
    ProjectKeywords {
        project_type: ProjectType::IntegrationAutomation,
        words: &["api", "apis"],
        phrases: &["integrat", "automat", "workflow", "zapier", "webhook"],
    },
    ProjectKeywords {
        project_type: ProjectType::DataAnalytics,
        words: &["bi", "etl"],
        phrases: &["data", "analytics", "dashboard", "reporting", "warehouse"],
    },
];

const ASAP_WORDS: &[&str] = &["asap", "rush"];
const ASAP_PHRASES: &[&str] = &["urgent", "immediately", "deadline", "right away"];

/// Extract lead categories from one utterance
///
/// The returned update carries categories only; its score is zero. Input
/// without recognised signals yields an empty update.
pub fn extract(utterance: &str) -> LeadUpdate {
    let text = utterance.to_lowercase();
    let mut update = LeadUpdate::default();

    if text.trim().is_empty() {
        return update;
    }

    update.budget = detect_budget(&text);
    update.project_type = detect_project_type(&text);

    if let Some(timeline) = detect_timeline(&text) {
        update.timeline = Some(timeline);
        if timeline == Timeline::Asap {
            update.urgency = Some(Urgency::High);
        }
    }

    update.email = detect_email(&text);

    update
}

fn detect_budget(text: &str) -> Option<BudgetBand> {
    let has_cue = BUDGET_CUES.iter().any(|cue| text.contains(cue));
    if !has_cue {
        return None;
    }

    AMOUNT_PATTERN.captures_iter(text).find_map(|caps| {
        let digits = caps.get(1)?.as_str().replace(',', "");
        let value: f64 = digits.trim_end_matches('.').parse().ok()?;

        let amount = match caps.get(2).map(|m| m.as_str()) {
            Some("k") | Some("thousand") => value * 1_000.0,
            Some("m") | Some("million") => value * 1_000_000.0,
            _ if value >= 1_000.0 => value,
            _ => return None,
        };

        BudgetBand::from_amount(amount)
    })
}

fn detect_project_type(text: &str) -> Option<ProjectType> {
    PROJECT_KEYWORDS
        .iter()
        .find(|entry| {
            entry.words.iter().any(|w| contains_word(text, w))
                || entry.phrases.iter().any(|p| text.contains(p))
        })
        .map(|entry| entry.project_type)
}

fn detect_timeline(text: &str) -> Option<Timeline> {
    if ASAP_WORDS.iter().any(|w| contains_word(text, w))
        || ASAP_PHRASES.iter().any(|p| text.contains(p))
    {
        return Some(Timeline::Asap);
    }

    if MID_TERM_PATTERN.is_match(text) || text.contains("quarter") {
        return Some(Timeline::ThreeToSixMonths);
    }

    if contains_word(text, "soon") || NEAR_TERM_PATTERN.is_match(text) {
        return Some(Timeline::OneToTwoMonths);
    }

    None
}

fn detect_email(text: &str) -> Option<String> {
    EMAIL_PATTERN.find(text).map(|m| m.as_str().to_string())
}
