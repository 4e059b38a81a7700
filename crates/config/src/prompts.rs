//! Prompt Template Configuration
//!
//! Persona, analysis and canned message templates. Placeholders use the
//! `{assistant_name}`, `{company_name}` and `{name}` form.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::ConfigError;

/// Prompts configuration, optionally loaded from a YAML file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptsConfig {
    /// Assistant persona name
    #[serde(default = "default_assistant_name")]
    pub assistant_name: String,
    /// Consultancy name used in prompts and greetings
    #[serde(default = "default_company_name")]
    pub company_name: String,
    /// First bot message, injected when a session opens
    #[serde(default = "default_greeting")]
    pub greeting: String,
    /// System instruction for the reply branch
    #[serde(default = "default_persona_prompt")]
    pub persona_prompt: String,
    /// System instruction for the strict-JSON analysis branch
    #[serde(default = "default_analysis_prompt")]
    pub analysis_prompt: String,
    /// Reply used when every fallback stage failed
    #[serde(default = "default_apology")]
    pub apology: String,
    /// Bot message after the contact form is submitted
    #[serde(default = "default_confirmation")]
    pub confirmation: String,
}

fn default_assistant_name() -> String {
    "Chip".to_string()
}

fn default_company_name() -> String {
    "CrucialCodeLabs".to_string()
}

fn default_greeting() -> String {
    "Hi! I'm the AI assistant for {company_name}. I help figure out how we can best \
     support your technical projects.\n\nWhat kind of software challenge are you looking to solve?"
        .to_string()
}

fn default_persona_prompt() -> String {
    r#"You are {assistant_name}, an AI technical consultant for {company_name}, a boutique software development and AI integration firm. You are chatting with a potential client who is visiting the website.

Be open about being an AI assistant. Introduce yourself by name only in your first reply.

Goals, in order:
1. Understand the technical challenge and the business problem behind it.
2. Gauge scope and complexity.
3. Learn the timeline and how urgent it is.
4. Get a sense of the investment range without asking for a number outright.
5. Offer a technical consultation to projects that fit.

Fit guide (never state it): budgets of $15K and up are strong, $8K-$15K are fine, below $8K should be redirected kindly. AI/ML work ranks above custom software, which ranks above basic integrations. Deadline-driven projects rank higher.

Style: two to four sentences, one thoughtful follow-up question per reply, curious and consultative rather than salesy. Show expertise through good questions and keep detailed solutions for the paid consultation.

Stay on software and AI consulting. If the visitor drifts into personal topics, acknowledge briefly and steer back to their technical goals."#
        .to_string()
}

fn default_analysis_prompt() -> String {
    r#"You analyse a sales chat for {company_name} and score the lead. Reply with ONE JSON object and nothing else, using exactly these keys:
{"projectType": string, "complexityScore": number 1-10, "budgetSignals": [string], "urgencyIndicators": [string], "technicalSophistication": number 1-10, "decisionAuthority": "high"|"medium"|"low", "leadScore": integer 0-100, "nextBestQuestion": string, "conversationPhase": "discovery"|"qualification"|"closing", "recommendedAction": "continue"|"qualify_budget"|"book_consultation"|"redirect"}
Scoring: budget up to 40 points, project complexity up to 30, timeline urgency up to 20, business e-mail domain 10."#
        .to_string()
}

fn default_apology() -> String {
    "Sorry about the technical hiccup. I'm here to talk about your software development \
     needs - what specific challenge are you trying to solve?"
        .to_string()
}

fn default_confirmation() -> String {
    "Thanks {name}! I've noted your details and our lead developer will reach out within \
     24 hours to schedule your technical consultation.\n\nIn the meantime, feel free to browse \
     our case studies. Looking forward to discussing your project!"
        .to_string()
}

impl Default for PromptsConfig {
    fn default() -> Self {
        Self {
            assistant_name: default_assistant_name(),
            company_name: default_company_name(),
            greeting: default_greeting(),
            persona_prompt: default_persona_prompt(),
            analysis_prompt: default_analysis_prompt(),
            apology: default_apology(),
            confirmation: default_confirmation(),
        }
    }
}

impl PromptsConfig {
    /// Load prompts from a YAML file; missing keys keep their defaults
    pub fn load_yaml(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|_| ConfigError::FileNotFound(path.display().to_string()))?;
        serde_yaml::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    fn render(&self, template: &str) -> String {
        template
            .replace("{assistant_name}", &self.assistant_name)
            .replace("{company_name}", &self.company_name)
    }

    pub fn greeting(&self) -> String {
        self.render(&self.greeting)
    }

    pub fn system_prompt(&self) -> String {
        self.render(&self.persona_prompt)
    }

    pub fn analysis_prompt(&self) -> String {
        self.render(&self.analysis_prompt)
    }

    pub fn apology(&self) -> String {
        self.render(&self.apology)
    }

    pub fn confirmation(&self, visitor_name: &str) -> String {
        self.render(&self.confirmation).replace("{name}", visitor_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_placeholders_are_rendered() {
        let prompts = PromptsConfig::default();
        assert!(prompts.greeting().contains("CrucialCodeLabs"));
        assert!(prompts.system_prompt().starts_with("You are Chip"));
        assert!(!prompts.analysis_prompt().contains("{company_name}"));
        assert!(prompts.confirmation("Dana").starts_with("Thanks Dana!"));
    }

    #[test]
    fn test_load_yaml_keeps_defaults_for_missing_keys() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "assistant_name: Nova\ncompany_name: Example Labs").unwrap();

        let prompts = PromptsConfig::load_yaml(file.path()).unwrap();
        assert_eq!(prompts.assistant_name, "Nova");
        assert!(prompts.system_prompt().starts_with("You are Nova"));
        assert!(prompts.greeting().contains("Example Labs"));
        assert_eq!(prompts.apology, default_apology());
    }

    #[test]
    fn test_load_yaml_missing_file() {
        let result = PromptsConfig::load_yaml("/nonexistent/prompts.yaml");
        assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
    }
}
