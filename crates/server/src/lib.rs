//! Lead Agent Server
//!
//! HTTP session shell around the conversation engine: session lifecycle,
//! chat turns, lead capture and operational endpoints.

pub mod capture;
pub mod http;
pub mod metrics;
pub mod session;
pub mod state;

pub use capture::{create_lead_store, InMemoryLeadStore, JsonlLeadStore, LeadStore};
pub use http::create_router;
pub use metrics::{init_metrics, record_capture, record_error, record_request};
pub use session::{Session, SessionManager};
pub use state::AppState;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

use lead_agent_agent::AgentError;

/// Server errors
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Session not found: {0}")]
    Session(String),

    /// A turn is already running on this session
    #[error("Session busy: {0}")]
    SessionBusy(String),

    #[error("Max sessions reached")]
    Capacity,

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ServerError {
    pub fn kind(&self) -> &'static str {
        match self {
            ServerError::Session(_) => "session_not_found",
            ServerError::SessionBusy(_) => "session_busy",
            ServerError::Capacity => "capacity",
            ServerError::InvalidRequest(_) => "invalid_request",
            ServerError::Persistence(_) => "persistence",
            ServerError::Internal(_) => "internal",
        }
    }
}

impl From<AgentError> for ServerError {
    fn from(err: AgentError) -> Self {
        match err {
            AgentError::EmptyMessage | AgentError::InvalidContact(_) => {
                ServerError::InvalidRequest(err.to_string())
            }
        }
    }
}

impl From<&ServerError> for StatusCode {
    fn from(err: &ServerError) -> Self {
        match err {
            ServerError::Session(_) => StatusCode::NOT_FOUND,
            ServerError::SessionBusy(_) => StatusCode::CONFLICT,
            ServerError::Capacity => StatusCode::SERVICE_UNAVAILABLE,
            ServerError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            ServerError::Persistence(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ServerError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = StatusCode::from(&self);
        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        }
        record_error(self.kind());

        (
            status,
            Json(serde_json::json!({
                "error": self.kind(),
                "message": self.to_string(),
            })),
        )
            .into_response()
    }
}
