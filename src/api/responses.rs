//! API response structures

use std::collections::BTreeMap;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, warn};

use crate::{
    services::GeneratorError,
    session::{mode::UnknownMode, SessionError, TimerMode},
    state::{
        plans::{PianoClass, PlanError},
        SessionPhase, SessionState,
    },
};

/// Session state plus the derived display fields clients render
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionView {
    #[serde(flatten)]
    pub state: SessionState,
    pub phase: SessionPhase,
    pub display: String,
    pub progress_percent: f64,
    pub theme_color: String,
}

impl From<SessionState> for SessionView {
    fn from(state: SessionState) -> Self {
        Self {
            phase: state.phase(),
            display: state.display(),
            progress_percent: state.progress_percent(),
            theme_color: if state.is_alarming {
                "red".to_string()
            } else {
                state.mode.theme_color().to_string()
            },
            state,
        }
    }
}

/// API response structure for session endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse {
    pub status: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub session: SessionView,
}

impl ApiResponse {
    /// Create a response whose status is the session phase
    pub fn new(message: impl Into<String>, state: SessionState) -> Self {
        let status = match state.phase() {
            SessionPhase::Idle => "idle",
            SessionPhase::Running => "running",
            SessionPhase::Alarming => "alarming",
        };
        Self {
            status: status.to_string(),
            message: message.into(),
            timestamp: Utc::now(),
            session: state.into(),
        }
    }
}

/// Status response with session, counter and server information
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub session: SessionView,
    pub sessions_completed: u64,
    pub active_class: Option<PianoClass>,
    pub uptime: String,
    pub port: u16,
    pub host: String,
    pub last_action: Option<String>,
    pub last_action_time: Option<DateTime<Utc>>,
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub version: String,
}

impl HealthResponse {
    pub fn ok() -> Self {
        Self {
            status: "ok".to_string(),
            timestamp: Utc::now(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DurationsResponse {
    pub minutes: BTreeMap<TimerMode, u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuoteResponse {
    pub quote: String,
}

/// Step started from a class, with the session it produced
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepStartedResponse {
    pub class_id: String,
    pub step_index: usize,
    pub session: SessionView,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub status: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

/// Handler failure rendered as a status code plus an error body
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            error!("Request failed: {}", self.message);
        } else {
            warn!("Request rejected: {}", self.message);
        }
        let body = ErrorResponse {
            status: "error".to_string(),
            message: self.message,
            timestamp: Utc::now(),
        };
        (self.status, Json(body)).into_response()
    }
}

impl From<SessionError> for ApiError {
    fn from(e: SessionError) -> Self {
        let status = match e {
            SessionError::InvalidTask(_) => StatusCode::BAD_REQUEST,
            SessionError::ControllerGone => StatusCode::SERVICE_UNAVAILABLE,
        };
        Self::new(status, e.to_string())
    }
}

impl From<PlanError> for ApiError {
    fn from(e: PlanError) -> Self {
        let status = match e {
            PlanError::NotFound(_) | PlanError::StepOutOfRange { .. } => StatusCode::NOT_FOUND,
            PlanError::Poisoned => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self::new(status, e.to_string())
    }
}

impl From<GeneratorError> for ApiError {
    fn from(e: GeneratorError) -> Self {
        let status = match e {
            GeneratorError::EmptyGoal => StatusCode::BAD_REQUEST,
            _ => StatusCode::BAD_GATEWAY,
        };
        Self::new(status, e.to_string())
    }
}

impl From<UnknownMode> for ApiError {
    fn from(e: UnknownMode) -> Self {
        Self::bad_request(e.to_string())
    }
}
