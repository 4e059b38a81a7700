//! Multi-turn conversations through `SessionState` and `ConversationEngine`

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::http::StatusCode;
use axum::routing::post;
use axum::Router;

use lead_agent_agent::{
    AnalysisStage, ContactDetails, ConversationEngine, ReplySource, SessionState,
};
use lead_agent_config::{AnalysisStrategy, EngineMode, Settings};
use lead_agent_core::{
    BudgetBand, ClientProfile, ConversationPhase, ProjectType, RecommendedAction, Urgency,
};
use lead_agent_llm::{ChatCompletionsBackend, ChatCompletionsConfig};

/// Completion endpoint that always answers 500
async fn spawn_failing_service() -> (String, Arc<AtomicUsize>) {
    let hits = Arc::new(AtomicUsize::new(0));
    let counter = hits.clone();

    let app = Router::new().route(
        "/v1/chat/completions",
        post(move || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                (StatusCode::INTERNAL_SERVER_ERROR, "upstream unavailable")
            }
        }),
    );

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{}/v1", addr), hits)
}

fn engine_for(endpoint: &str, api_key: Option<&str>, settings: &Settings) -> ConversationEngine {
    let config = ChatCompletionsConfig {
        endpoint: endpoint.to_string(),
        model: "test-model".to_string(),
        api_key: api_key.map(str::to_string),
        max_retries: 0,
        initial_backoff: Duration::from_millis(1),
    };
    let backend = ChatCompletionsBackend::new(config).unwrap();
    ConversationEngine::new(Arc::new(backend), settings)
}

async fn take_turn(engine: &ConversationEngine, session: &mut SessionState, text: &str) {
    session.push_user_message(text).unwrap();
    let turn = engine
        .respond(session.transcript(), session.lead(), ClientProfile::Desktop)
        .await;
    session.apply_turn(&turn);
}

#[tokio::test]
async fn test_ten_server_errors_in_a_row_still_produce_replies() {
    let (endpoint, hits) = spawn_failing_service().await;
    let mut settings = Settings::default();
    settings.engine.analysis_strategy = AnalysisStrategy::Remote;
    let engine = engine_for(&endpoint, Some("secret"), &settings);

    let mut session = SessionState::new(settings.prompts.greeting());
    let mut previous_score = 0;

    for i in 0..10 {
        session
            .push_user_message(&format!("Turn {}: we need custom software for our team", i))
            .unwrap();
        let turn = engine
            .respond(session.transcript(), session.lead(), ClientProfile::Desktop)
            .await;

        assert_eq!(turn.outcome.reply, ReplySource::Canned);
        assert_eq!(turn.outcome.analysis, AnalysisStage::Local);
        assert!(!turn.bot_message.content.is_empty());
        assert!(turn.lead_update.score() >= previous_score);

        previous_score = turn.lead_update.score();
        session.apply_turn(&turn);
    }

    assert_eq!(session.transcript().len(), 21);
    assert_eq!(session.lead().score(), 20);
    assert_eq!(session.lead().project_type, Some(ProjectType::CustomSoftware));
    // reply + remote analysis per turn
    assert_eq!(hits.load(Ordering::SeqCst), 20);
}

#[tokio::test]
async fn test_missing_api_key_runs_whole_session_locally() {
    let (endpoint, hits) = spawn_failing_service().await;
    let settings = Settings::default();
    let engine = engine_for(&endpoint, None, &settings);

    let mut session = SessionState::new(settings.prompts.greeting());
    take_turn(&engine, &mut session, "We're looking at an AI assistant for support").await;
    take_turn(&engine, &mut session, "Budget is about $30k").await;
    take_turn(&engine, &mut session, "Ideally within a month").await;

    assert_eq!(hits.load(Ordering::SeqCst), 0);
    assert_eq!(session.lead().project_type, Some(ProjectType::AiMl));
    assert_eq!(session.lead().budget, Some(BudgetBand::From25kTo50k));
    // 30 + 30 + 15
    assert_eq!(session.lead().score(), 75);
    assert!(session.should_offer_contact_form());
}

#[tokio::test]
async fn test_enterprise_ai_scenario_end_to_end() {
    let (endpoint, _hits) = spawn_failing_service().await;
    let settings = Settings::default();
    let engine = engine_for(&endpoint, Some("secret"), &settings);

    let mut session = SessionState::new(settings.prompts.greeting());
    session
        .push_user_message(
            "We need an AI integration for our enterprise platform, budget is around $25K, and it's urgent",
        )
        .unwrap();
    let turn = engine
        .respond(session.transcript(), session.lead(), ClientProfile::Desktop)
        .await;

    let update = &turn.lead_update;
    assert_eq!(update.project_type, Some(ProjectType::AiMl));
    assert_eq!(update.budget, Some(BudgetBand::From25kTo50k));
    assert_eq!(update.urgency, Some(Urgency::High));
    assert_eq!(update.score(), 80);
    assert!(update.qualified());
    assert_eq!(update.phase, Some(ConversationPhase::Closing));
    assert_eq!(update.action, Some(RecommendedAction::BookConsultation));

    session.apply_turn(&turn);
    assert!(session.should_offer_contact_form());

    let captured = session
        .capture(
            &ContactDetails {
                name: "Dana".to_string(),
                email: "dana@acme-corp.io".to_string(),
                phone: None,
            },
            &settings.prompts,
        )
        .unwrap();
    assert_eq!(captured.lead.score(), 90);
    assert_eq!(captured.transcript.len(), 4);
}

#[tokio::test]
async fn test_scripted_conversation() {
    let (endpoint, hits) = spawn_failing_service().await;
    let mut settings = Settings::default();
    settings.engine.mode = EngineMode::Scripted;
    let engine = engine_for(&endpoint, Some("secret"), &settings);

    let mut session = SessionState::new(settings.prompts.greeting());

    take_turn(&engine, &mut session, "We want to automate our order workflow").await;
    assert!(session.transcript()[2]
        .content
        .starts_with("Great! Integration/Automation is definitely within our expertise"));

    take_turn(&engine, &mut session, "Next quarter would be fine").await;
    assert!(session.transcript()[4].content.contains("What range aligns with your thinking?"));

    take_turn(&engine, &mut session, "We could spend $60k").await;
    // 15 + 10 + 40
    assert_eq!(session.lead().score(), 65);
    assert!(session.transcript()[6].content.contains("contact details"));
    assert!(session.should_offer_contact_form());

    assert_eq!(hits.load(Ordering::SeqCst), 0);
}
