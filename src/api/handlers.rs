//! HTTP endpoint handlers

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use serde::Deserialize;
use tracing::{info, warn};

use super::responses::{
    ApiError, ApiResponse, DurationsResponse, HealthResponse, QuoteResponse, SessionView, StatusResponse,
    StepStartedResponse,
};
use crate::{
    services::gemini::FAILED_QUOTE_FALLBACK,
    session::{ExternalTask, TimerMode},
    state::{
        plans::{PianoClass, StepPatch},
        AppState,
    },
};

type ApiResult<T> = Result<Json<T>, ApiError>;

fn parse_mode(raw: &str) -> Result<TimerMode, ApiError> {
    Ok(raw.parse::<TimerMode>()?)
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// Handle GET /session
pub async fn session_handler(State(state): State<Arc<AppState>>) -> Json<SessionView> {
    Json(state.session.snapshot().into())
}

/// Handle POST /session/mode/:mode - Switch mode and load its duration
pub async fn select_mode_handler(
    State(state): State<Arc<AppState>>,
    Path(mode): Path<String>,
) -> ApiResult<ApiResponse> {
    let mode = parse_mode(&mode)?;
    let session = state.session.select_mode(mode).await?;
    state.record_action(&format!("mode {}", mode));
    Ok(Json(ApiResponse::new(format!("Switched to {} mode", mode), session)))
}

/// Handle POST /session/toggle - Start or pause the countdown
pub async fn toggle_handler(State(state): State<Arc<AppState>>) -> ApiResult<ApiResponse> {
    let session = state.session.toggle_running().await?;
    let message = if session.is_running { "Timer started" } else { "Timer paused" };
    state.record_action(if session.is_running { "start" } else { "pause" });
    Ok(Json(ApiResponse::new(message, session)))
}

/// Handle POST /session/reset - Rewind to the initial duration
pub async fn reset_handler(State(state): State<Arc<AppState>>) -> ApiResult<ApiResponse> {
    let session = state.session.reset().await?;
    state.record_action("reset");
    Ok(Json(ApiResponse::new("Timer reset", session)))
}

/// Handle POST /session/alarm/stop - Silence the alarm
pub async fn stop_alarm_handler(State(state): State<Arc<AppState>>) -> ApiResult<ApiResponse> {
    let session = state.session.stop_alarm().await?;
    state.record_action("stop-alarm");
    Ok(Json(ApiResponse::new("Alarm stopped", session)))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskRequest {
    pub duration_seconds: u32,
    pub mode: TimerMode,
    #[serde(default)]
    pub label: String,
}

/// Handle POST /session/task - Apply an external task descriptor
pub async fn apply_task_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<TaskRequest>,
) -> ApiResult<ApiResponse> {
    let task = ExternalTask::new(request.duration_seconds, request.mode, request.label)?;
    let session = state.session.apply_external_task(task).await?;
    state.record_action("task");
    Ok(Json(ApiResponse::new("Task started", session)))
}

// ---------------------------------------------------------------------------
// Preferences
// ---------------------------------------------------------------------------

/// Handle GET /preferences/durations
pub async fn durations_handler(State(state): State<Arc<AppState>>) -> Json<DurationsResponse> {
    Json(DurationsResponse {
        minutes: state.durations.all_minutes(),
    })
}

#[derive(Debug, Deserialize)]
pub struct DurationRequest {
    pub minutes: u32,
}

/// Handle PUT /preferences/durations/:mode - Store a mode's duration
///
/// Takes effect the next time the mode is selected.
pub async fn set_duration_handler(
    State(state): State<Arc<AppState>>,
    Path(mode): Path<String>,
    Json(request): Json<DurationRequest>,
) -> ApiResult<DurationsResponse> {
    let mode = parse_mode(&mode)?;
    if request.minutes == 0 {
        return Err(ApiError::bad_request("minutes must be positive"));
    }
    if let Err(e) = state.durations.set_minutes(mode, request.minutes) {
        warn!("Duration preference for {} not saved: {}", mode, e);
    }
    state.record_action(&format!("duration {}", mode));
    Ok(Json(DurationsResponse {
        minutes: state.durations.all_minutes(),
    }))
}

// ---------------------------------------------------------------------------
// Practice classes
// ---------------------------------------------------------------------------

/// Handle GET /plans
pub async fn list_plans_handler(State(state): State<Arc<AppState>>) -> ApiResult<Vec<PianoClass>> {
    Ok(Json(state.plans.list()?))
}

/// Handle POST /plans - Create an editable class
pub async fn create_plan_handler(State(state): State<Arc<AppState>>) -> Result<(StatusCode, Json<PianoClass>), ApiError> {
    let class = state.plans.create_manual()?;
    state.record_action("create-class");
    Ok((StatusCode::CREATED, Json(class)))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    pub goal: String,
    #[serde(default = "default_plan_minutes")]
    pub duration_minutes: u32,
}

fn default_plan_minutes() -> u32 {
    30
}

/// Handle POST /plans/generate - Ask the AI coach for a class
pub async fn generate_plan_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<GenerateRequest>,
) -> Result<(StatusCode, Json<PianoClass>), ApiError> {
    let goal = request.goal.trim();
    if goal.is_empty() {
        return Err(ApiError::bad_request("goal must not be empty"));
    }
    if request.duration_minutes == 0 {
        return Err(ApiError::bad_request("durationMinutes must be positive"));
    }

    let plan = state.generator.practice_plan(goal, request.duration_minutes).await?;
    let class = state.plans.add_generated(goal, request.duration_minutes, plan)?;
    info!("Generated class {} ({} steps)", class.id, class.steps.len());
    state.record_action("generate-class");
    Ok((StatusCode::CREATED, Json(class)))
}

/// Handle GET /plans/:id
pub async fn get_plan_handler(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> ApiResult<PianoClass> {
    Ok(Json(state.plans.get(&id)?))
}

/// Handle DELETE /plans/:id
pub async fn delete_plan_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.plans.delete(&id)?;
    state.record_action("delete-class");
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
pub struct RenameRequest {
    pub name: String,
}

/// Handle PUT /plans/:id/name
pub async fn rename_plan_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(request): Json<RenameRequest>,
) -> ApiResult<PianoClass> {
    Ok(Json(state.plans.rename(&id, &request.name)?))
}

/// Handle POST /plans/:id/select - Make a class the active one
pub async fn select_plan_handler(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> ApiResult<PianoClass> {
    let class = state.plans.select(&id)?;
    state.record_action("select-class");
    Ok(Json(class))
}

/// Handle POST /plans/:id/steps - Append a default step
pub async fn add_step_handler(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> ApiResult<PianoClass> {
    Ok(Json(state.plans.add_step(&id)?))
}

/// Handle PATCH /plans/:id/steps/:index
pub async fn update_step_handler(
    State(state): State<Arc<AppState>>,
    Path((id, index)): Path<(String, usize)>,
    Json(patch): Json<StepPatch>,
) -> ApiResult<PianoClass> {
    Ok(Json(state.plans.update_step(&id, index, patch)?))
}

/// Handle DELETE /plans/:id/steps/:index
pub async fn remove_step_handler(
    State(state): State<Arc<AppState>>,
    Path((id, index)): Path<(String, usize)>,
) -> ApiResult<PianoClass> {
    Ok(Json(state.plans.remove_step(&id, index)?))
}

/// Handle POST /plans/:id/steps/:index/start - Hand a step to the timer
pub async fn start_step_handler(
    State(state): State<Arc<AppState>>,
    Path((id, index)): Path<(String, usize)>,
) -> ApiResult<StepStartedResponse> {
    let step = state.plans.step(&id, index)?;
    let task = ExternalTask::from_step(&step);
    let session = state.session.apply_external_task(task).await?;
    state.record_action(&format!("start-step {}", step.action));
    Ok(Json(StepStartedResponse {
        class_id: id,
        step_index: index,
        session: session.into(),
    }))
}

// ---------------------------------------------------------------------------
// Misc
// ---------------------------------------------------------------------------

/// Handle GET /quote - Short inspirational quote, never fails
pub async fn quote_handler(State(state): State<Arc<AppState>>) -> Json<QuoteResponse> {
    let quote = match state.generator.inspirational_quote().await {
        Ok(quote) => quote,
        Err(e) => {
            warn!("Quote request failed: {}", e);
            FAILED_QUOTE_FALLBACK.to_string()
        }
    };
    Json(QuoteResponse { quote })
}

/// Handle GET /status - Return current session and server status
pub async fn status_handler(State(state): State<Arc<AppState>>) -> ApiResult<StatusResponse> {
    let (last_action, last_action_time) = state.get_last_action();

    Ok(Json(StatusResponse {
        session: state.session.snapshot().into(),
        sessions_completed: state.sessions_completed(),
        active_class: state.plans.active()?,
        uptime: state.get_uptime(),
        port: state.port,
        host: state.host.clone(),
        last_action,
        last_action_time,
    }))
}

/// Handle GET /health - Health check endpoint
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::ok())
}
