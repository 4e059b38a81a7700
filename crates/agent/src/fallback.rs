//! Fallback stages
//!
//! - `canned_reply`: keyword tree used when the remote reply fails
//! - `heuristic_update`: additive scoring when local analysis cannot run
//! - `apology_update`: last resort, current score + 5
//! - `ScriptedResponder`: turn-indexed replies for the non-LLM mode

use lead_agent_core::{contains_word, is_qualified, ConversationPhase, LeadRecord, LeadUpdate};

use crate::analysis::{apply_decision, insights_for};
use crate::policy::scripted_phase;

/// Points added by the apology stage
pub const APOLOGY_BONUS: u8 = 5;

/// Canned reply keyed on the last user utterance
///
/// Checked in order: AI/ML, web, mobile/app, budget, generic.
pub fn canned_reply(utterance: &str) -> &'static str {
    let text = utterance.to_lowercase();

    if contains_word(&text, "ai")
        || contains_word(&text, "ml")
        || text.contains("machine learning")
        || text.contains("artificial intelligence")
    {
        return "That's an exciting AI project! We specialize in AI integration and have helped many \
                companies implement intelligent solutions. What specific AI capabilities are you \
                looking to add to your platform?";
    }

    if contains_word(&text, "web") || text.contains("website") || text.contains("web app") {
        return "Web development is one of our core services. Are you looking for a complete \
                rebuild, specific functionality additions, or perhaps integrating modern features \
                like AI chatbots?";
    }

    if contains_word(&text, "app") || contains_word(&text, "apps") || text.contains("mobile") {
        return "Mobile applications are a great way to engage users. Are you thinking iOS, \
                Android, or a cross-platform solution? What's the main purpose of the app?";
    }

    if text.contains("budget") || text.contains("cost") || text.contains('$') {
        return "I appreciate you thinking about investment. Our projects typically range from $8K \
                for focused solutions up to $50K+ for comprehensive AI implementations. What scope \
                are you considering?";
    }

    "That sounds like an interesting challenge! Could you tell me more about the specific \
     technical requirements or business goals you're trying to achieve? This will help me \
     understand how we can best assist you."
}

/// Additive heuristic on the raw utterance, on top of the current score
///
/// AI +20, custom/software/platform +15, urgency +15, budget cue +10,
/// team/company/enterprise +10, capped at 100.
pub fn heuristic_update(utterance: &str, current_score: u8, user_turns: usize) -> LeadUpdate {
    let text = utterance.to_lowercase();
    let mut points: u32 = 0;

    if contains_word(&text, "ai")
        || text.contains("machine learning")
        || text.contains("artificial intelligence")
    {
        points += 20;
    }
    if ["custom", "software", "platform"].iter().any(|k| text.contains(k)) {
        points += 15;
    }
    if ["urgent", "asap", "deadline"].iter().any(|k| text.contains(k)) {
        points += 15;
    }
    if ["budget", "$", "investment"].iter().any(|k| text.contains(k)) {
        points += 10;
    }
    if ["team", "company", "enterprise"].iter().any(|k| text.contains(k)) {
        points += 10;
    }

    let score = (current_score as u32 + points).min(100) as u8;

    let mut update = LeadUpdate::default();
    apply_decision(&mut update, score, user_turns);
    update.insights = Some(insights_for(&text, score));
    update
}

/// Catch-all update: current score + 5, capped
pub fn apology_update(current_score: u8, user_turns: usize) -> LeadUpdate {
    let score = current_score.saturating_add(APOLOGY_BONUS).min(100);
    let mut update = LeadUpdate::default();
    apply_decision(&mut update, score, user_turns);
    update
}

/// Turn-indexed replies reproducing the scripted widget
#[derive(Debug, Clone, Copy, Default)]
pub struct ScriptedResponder;

impl ScriptedResponder {
    pub fn new() -> Self {
        Self
    }

    /// Reply for user turn `user_turns`, given this turn's update and the
    /// lead as it will be after merging it
    pub fn reply(&self, user_turns: usize, update: &LeadUpdate, lead: &LeadRecord) -> String {
        match scripted_phase(user_turns) {
            ConversationPhase::Discovery if user_turns <= 1 => Self::first_turn(update),
            ConversationPhase::Discovery => Self::second_turn(update),
            ConversationPhase::Qualification if user_turns == 3 => {
                Self::third_turn(is_qualified(lead.score()))
            }
            _ => Self::follow_up(is_qualified(lead.score())),
        }
    }

    fn first_turn(update: &LeadUpdate) -> String {
        match update.project_type {
            Some(project) => format!(
                "Great! {} is definitely within our expertise. We have delivered similar solutions \
                 for clients ranging from startups to enterprise companies.\n\nTo give you the most \
                 accurate guidance, what is your target timeline for this project?",
                project
            ),
            None => "That sounds interesting! To better understand how we can help, could you \
                     tell me more about:\n\n\
                     • What type of software or system you are looking to build\n\
                     • Any specific technical challenges you are facing\n\
                     • Whether this is a new project or enhancing existing systems"
                .to_string(),
        }
    }

    fn second_turn(update: &LeadUpdate) -> String {
        let mut reply = String::from("Perfect! ");
        if let Some(timeline) = update.timeline {
            reply.push_str(&format!("A {} timeline is definitely workable. ", timeline));
        }
        reply.push_str(
            "Understanding your budget range helps us recommend the right approach.\n\n\
             Our projects typically fall into these ranges:\n\n\
             • $8K-$15K: Focused solutions & integrations\n\
             • $15K-$25K: Custom applications & workflows\n\
             • $25K-$50K: Advanced AI & comprehensive systems\n\
             • $50K+: Enterprise-grade & complex implementations\n\n\
             What range aligns with your thinking?",
        );
        reply
    }

    fn third_turn(qualified: bool) -> String {
        if qualified {
            "Excellent! Based on our conversation, this sounds like a great fit for our expertise.\n\n\
             I would love to connect you with our lead developer for a detailed technical \
             consultation. This usually takes 15-30 minutes and you will get:\n\n\
             ✓ Specific approach recommendations\n\
             ✓ Accurate timeline estimates\n\
             ✓ Technology stack guidance\n\
             ✓ Clear next steps\n\n\
             Could you share your contact details so we can schedule a brief call?"
                .to_string()
        } else {
            "Thanks for sharing that information! While this project might be a bit outside our \
             typical engagement range, I would still be happy to provide some guidance.\n\n\
             Would you like me to:\n\
             • Recommend some resources for your project scope\n\
             • Suggest alternative approaches that might fit your budget\n\
             • Connect you with other service providers who specialize in smaller projects\n\n\
             What would be most helpful?"
                .to_string()
        }
    }

    fn follow_up(qualified: bool) -> String {
        if qualified {
            "I can see this is exactly the type of project where we excel. Let me get you \
             connected with our technical team for a proper consultation.\n\nWhat is the best way \
             to reach you for a quick 15-minute discussion?"
                .to_string()
        } else {
            "I appreciate you sharing more details. Let me know if you have any other questions \
             about our services or if there is anything else I can help clarify!"
                .to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lead_agent_core::{ProjectType, RecommendedAction, Timeline};

    #[test]
    fn test_canned_reply_tree_order() {
        assert!(canned_reply("We want AI on our website").contains("AI project"));
        assert!(canned_reply("a new website").starts_with("Web development"));
        assert!(canned_reply("a mobile app for drivers").starts_with("Mobile applications"));
        assert!(canned_reply("what does it cost?").contains("$8K"));
        assert!(canned_reply("hello").starts_with("That sounds like an interesting challenge"));
    }

    #[test]
    fn test_canned_reply_is_deterministic() {
        assert_eq!(canned_reply("budget $10k"), canned_reply("budget $10k"));
    }

    #[test]
    fn test_heuristic_points() {
        let update = heuristic_update(
            "Our enterprise team needs an AI platform urgently, budget approved",
            0,
            1,
        );
        // 20 + 15 + 15 + 10 + 10
        assert_eq!(update.score(), 70);
        assert!(update.qualified());
        assert_eq!(update.action, Some(RecommendedAction::BookConsultation));
    }

    #[test]
    fn test_heuristic_adds_to_current_and_caps() {
        assert_eq!(heuristic_update("custom software", 10, 1).score(), 25);
        assert_eq!(heuristic_update("AI platform asap", 90, 1).score(), 100);
        assert_eq!(heuristic_update("nothing to see", 33, 1).score(), 33);
    }

    #[test]
    fn test_apology_update() {
        assert_eq!(apology_update(0, 0).score(), 5);
        assert_eq!(apology_update(58, 2).score(), 63);
        assert_eq!(apology_update(98, 2).score(), 100);
        assert!(apology_update(0, 0).has_no_categories());
    }

    #[test]
    fn test_scripted_first_turn() {
        let responder = ScriptedResponder::new();
        let mut update = LeadUpdate::default();
        update.project_type = Some(ProjectType::AiMl);

        let reply = responder.reply(1, &update, &LeadRecord::new());
        assert!(reply.starts_with("Great! AI/ML Development is definitely within our expertise"));

        let reply = responder.reply(1, &LeadUpdate::default(), &LeadRecord::new());
        assert!(reply.starts_with("That sounds interesting!"));
    }

    #[test]
    fn test_scripted_second_turn_lists_budget_ranges() {
        let mut update = LeadUpdate::default();
        update.timeline = Some(Timeline::OneToTwoMonths);

        let reply = ScriptedResponder::new().reply(2, &update, &LeadRecord::new());
        assert!(reply.contains("A 1-2 months timeline is definitely workable."));
        assert!(reply.contains("$25K-$50K"));
    }

    #[test]
    fn test_scripted_third_turn_offer_or_redirect() {
        let mut qualified = LeadRecord::new();
        qualified.set_score(75);
        let responder = ScriptedResponder::new();

        let offer = responder.reply(3, &LeadUpdate::default(), &qualified);
        assert!(offer.contains("contact details"));

        let redirect = responder.reply(3, &LeadUpdate::default(), &LeadRecord::new());
        assert!(redirect.contains("outside our typical engagement range"));
    }

    #[test]
    fn test_scripted_follow_ups() {
        let mut qualified = LeadRecord::new();
        qualified.set_score(60);
        let responder = ScriptedResponder::new();

        assert!(responder
            .reply(4, &LeadUpdate::default(), &qualified)
            .contains("15-minute discussion"));
        assert!(responder
            .reply(7, &LeadUpdate::default(), &LeadRecord::new())
            .starts_with("I appreciate you sharing more details"));
    }
}
