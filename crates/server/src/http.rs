//! HTTP Endpoints
//!
//! REST API for the lead qualification chat.

use axum::{
    extract::{Json, MatchedPath, Path, Request, State},
    http::{header::USER_AGENT, HeaderMap, HeaderValue, Method, StatusCode},
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
    Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use lead_agent_agent::{ContactDetails, SessionState, TurnOutcome};
use lead_agent_core::{ClientProfile, LeadRecord, Message, ScoreTier};

use crate::metrics::{metrics_handler, record_capture, record_request};
use crate::state::AppState;
use crate::ServerError;

const DEFAULT_CORS_ORIGIN: &str = "http://localhost:3000";

/// Create the application router
pub fn create_router(state: AppState) -> Router {
    let cors_layer = build_cors_layer(
        &state.config.server.cors_origins,
        state.config.server.cors_enabled,
    );

    Router::new()
        // Session lifecycle
        .route("/api/sessions", post(create_session))
        .route("/api/sessions/:id", get(get_session).delete(delete_session))
        .route("/api/sessions/:id/contact", post(submit_contact))
        // Chat turn
        .route("/api/chat/:session_id", post(chat))
        // Captured leads
        .route("/api/leads", get(list_leads))
        // Operational
        .route("/health", get(health_check))
        .route("/metrics", get(metrics_handler))
        .route_layer(middleware::from_fn(track_requests))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer)
        .with_state(state)
}

/// Build CORS layer from configured origins
///
/// - disabled: permissive (development only)
/// - no valid origins: localhost:3000
fn build_cors_layer(origins: &[String], enabled: bool) -> CorsLayer {
    if !enabled {
        tracing::warn!("CORS is disabled - allowing all origins (NOT FOR PRODUCTION)");
        return CorsLayer::permissive();
    }

    let parsed_origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| {
            origin.parse::<HeaderValue>().ok().or_else(|| {
                tracing::warn!("Invalid CORS origin: {}", origin);
                None
            })
        })
        .collect();

    let base = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers(Any);

    if parsed_origins.is_empty() {
        tracing::info!("No valid CORS origins configured, defaulting to {}", DEFAULT_CORS_ORIGIN);
        return base.allow_origin(HeaderValue::from_static(DEFAULT_CORS_ORIGIN));
    }

    tracing::info!("CORS configured with {} origins", parsed_origins.len());
    base.allow_origin(parsed_origins)
}

async fn track_requests(request: Request, next: Next) -> Response {
    let endpoint = request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string());

    let response = next.run(request).await;
    record_request(&endpoint, response.status().as_u16());
    response
}

/// Session snapshot returned to the widget
#[derive(Debug, Serialize)]
struct SessionView {
    session_id: String,
    created_at: DateTime<Utc>,
    transcript: Vec<Message>,
    lead: LeadRecord,
    tier: ScoreTier,
    show_contact_form: bool,
}

impl From<&SessionState> for SessionView {
    fn from(session: &SessionState) -> Self {
        Self {
            session_id: session.id.clone(),
            created_at: session.created_at,
            transcript: session.transcript().to_vec(),
            lead: session.lead().clone(),
            tier: session.lead().tier(),
            show_contact_form: session.should_offer_contact_form(),
        }
    }
}

/// POST /api/sessions
async fn create_session(
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<SessionView>), ServerError> {
    let session = state.sessions.create(&state.engine.prompts().greeting())?;
    let view = SessionView::from(&*session.lock().await);
    Ok((StatusCode::CREATED, Json(view)))
}

/// GET /api/sessions/:id
async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SessionView>, ServerError> {
    let session = state.sessions.get(&id)?;
    let view = SessionView::from(&*session.lock().await);
    Ok(Json(view))
}

/// DELETE /api/sessions/:id
///
/// Abandons the session; nothing is persisted.
async fn delete_session(State(state): State<AppState>, Path(id): Path<String>) -> StatusCode {
    if state.sessions.remove(&id) {
        StatusCode::NO_CONTENT
    } else {
        StatusCode::NOT_FOUND
    }
}

#[derive(Debug, Deserialize)]
struct ChatRequest {
    message: String,
}

#[derive(Debug, Serialize)]
struct ChatResponse {
    reply: String,
    lead: LeadRecord,
    tier: ScoreTier,
    show_contact_form: bool,
    outcome: TurnOutcome,
}

/// POST /api/chat/:session_id
async fn chat(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    headers: HeaderMap,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ServerError> {
    let session = state.sessions.get(&session_id)?;
    let mut guard = session.try_lock()?;
    session.touch();

    guard.push_user_message(&request.message)?;

    let client = headers
        .get(USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .map(ClientProfile::from_user_agent)
        .unwrap_or_default();

    let turn = state
        .engine
        .respond(guard.transcript(), guard.lead(), client)
        .await;
    guard.apply_turn(&turn);

    tracing::info!(
        session_id = %session_id,
        score = guard.lead().score(),
        phase = %guard.lead().phase,
        reply = turn.outcome.reply.as_str(),
        analysis = turn.outcome.analysis.as_str(),
        "Turn processed"
    );

    Ok(Json(ChatResponse {
        reply: turn.bot_message.content,
        lead: guard.lead().clone(),
        tier: guard.lead().tier(),
        show_contact_form: guard.should_offer_contact_form(),
        outcome: turn.outcome,
    }))
}

#[derive(Debug, Serialize)]
struct ContactResponse {
    message: String,
    lead: LeadRecord,
}

/// POST /api/sessions/:id/contact
///
/// Captures the lead to the store and ends the session. The session is left
/// untouched when the store write fails.
async fn submit_contact(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(details): Json<ContactDetails>,
) -> Result<Json<ContactResponse>, ServerError> {
    let session = state.sessions.get(&id)?;
    let guard = session.try_lock()?;

    let mut draft = SessionState::clone(&guard);
    let captured = draft.capture(&details, state.engine.prompts())?;
    state.leads.append(&captured).await?;
    drop(guard);

    state.sessions.remove(&id);
    record_capture(captured.lead.qualified());

    let message = captured
        .transcript
        .last()
        .map(|m| m.content.clone())
        .unwrap_or_default();

    Ok(Json(ContactResponse {
        message,
        lead: captured.lead,
    }))
}

/// GET /api/leads
async fn list_leads(State(state): State<AppState>) -> Result<Json<serde_json::Value>, ServerError> {
    let leads = state.leads.list().await?;
    Ok(Json(serde_json::json!({
        "count": leads.len(),
        "leads": leads,
    })))
}

/// GET /health
async fn health_check(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
        "sessions": state.sessions.count(),
        "mode": state.engine.mode(),
        "durable_capture": state.leads.is_durable(),
    }))
}
