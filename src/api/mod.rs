//! HTTP API module
//!
//! This module contains all HTTP endpoint handlers and response structures.

pub mod handlers;
pub mod responses;

use std::sync::Arc;

use axum::{
    routing::{get, patch, post, put},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::state::AppState;
use handlers::*;

/// Create the HTTP router with all endpoints
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        // Session clock
        .route("/session", get(session_handler))
        .route("/session/mode/:mode", post(select_mode_handler))
        .route("/session/toggle", post(toggle_handler))
        .route("/session/reset", post(reset_handler))
        .route("/session/alarm/stop", post(stop_alarm_handler))
        .route("/session/task", post(apply_task_handler))
        // Preferences
        .route("/preferences/durations", get(durations_handler))
        .route("/preferences/durations/:mode", put(set_duration_handler))
        // Practice classes
        .route("/plans", get(list_plans_handler).post(create_plan_handler))
        .route("/plans/generate", post(generate_plan_handler))
        .route("/plans/:id", get(get_plan_handler).delete(delete_plan_handler))
        .route("/plans/:id/name", put(rename_plan_handler))
        .route("/plans/:id/select", post(select_plan_handler))
        .route("/plans/:id/steps", post(add_step_handler))
        .route(
            "/plans/:id/steps/:index",
            patch(update_step_handler).delete(remove_step_handler),
        )
        .route("/plans/:id/steps/:index/start", post(start_step_handler))
        .route("/quote", get(quote_handler))
        .route("/status", get(status_handler))
        .route("/health", get(health_handler))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}
