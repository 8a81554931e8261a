//! Integration tests for the HTTP API
//!
//! The router runs against a live session controller with silent audio and
//! notifications switched off; the plan generator is a canned fake.

use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use melodyfocus::{
    api::create_router,
    services::{DesktopNotifier, GeneratorError, NullBackend, PlanGenerator},
    session::{SessionClock, TimerMode},
    state::{
        plans::{ActivityType, PracticePlan, PracticeStep},
        AppState, DurationPreferences, MemoryStore, PlanLibrary, PreferenceStore,
    },
    tasks::spawn_session_controller,
};
use serde_json::{json, Value};
use tower::ServiceExt;

// ============================================================================
// Test Helpers
// ============================================================================

struct CannedCoach;

fn step(duration: &str, action: &str, kind: ActivityType) -> PracticeStep {
    PracticeStep {
        duration: duration.to_string(),
        action: action.to_string(),
        description: String::new(),
        kind,
    }
}

#[async_trait]
impl PlanGenerator for CannedCoach {
    async fn practice_plan(&self, goal: &str, _minutes: u32) -> Result<PracticePlan, GeneratorError> {
        if goal == "offline" {
            return Err(GeneratorError::Api {
                status: 503,
                message: "model overloaded".to_string(),
            });
        }
        Ok(PracticePlan {
            title: goal.to_string(),
            steps: vec![
                step("10", "Scales", ActivityType::Study),
                step("abc", "", ActivityType::Break),
                step("15", "Nocturne", ActivityType::Practice),
            ],
            technique_tip: "Relax the wrist.".to_string(),
        })
    }

    async fn inspirational_quote(&self) -> Result<String, GeneratorError> {
        Err(GeneratorError::MissingApiKey)
    }
}

fn test_app() -> (Router, Arc<AppState>) {
    let store: Arc<dyn PreferenceStore> = Arc::new(MemoryStore::new());
    let durations = DurationPreferences::new(Arc::clone(&store));
    let clock = SessionClock::new(TimerMode::Study, durations.clone());
    let (session, _controller) =
        spawn_session_controller(clock, Arc::new(NullBackend), Arc::new(DesktopNotifier::new(false)));

    let state = Arc::new(AppState::new(
        session,
        durations,
        PlanLibrary::load(store),
        Arc::new(CannedCoach),
        20554,
        "127.0.0.1".to_string(),
    ));
    (create_router(Arc::clone(&state)), state)
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

// ============================================================================
// Session Endpoints
// ============================================================================

#[tokio::test]
async fn test_health() {
    let (app, _) = test_app();
    let (status, body) = send(&app, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_initial_session() {
    let (app, _) = test_app();
    let (status, body) = send(&app, "GET", "/session", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["mode"], "STUDY");
    assert_eq!(body["timeLeftSeconds"], 900);
    assert_eq!(body["initialDurationSeconds"], 900);
    assert_eq!(body["isRunning"], false);
    assert_eq!(body["phase"], "IDLE");
    assert_eq!(body["display"], "15:00");
}

#[tokio::test]
async fn test_toggle_starts_and_pauses() {
    let (app, state) = test_app();

    let (status, body) = send(&app, "POST", "/session/toggle", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "running");
    assert_eq!(body["session"]["isRunning"], true);

    let (_, body) = send(&app, "POST", "/session/toggle", None).await;
    assert_eq!(body["status"], "idle");
    assert_eq!(body["session"]["isRunning"], false);

    let (last_action, _) = state.get_last_action();
    assert_eq!(last_action.as_deref(), Some("pause"));
}

#[tokio::test]
async fn test_select_mode() {
    let (app, _) = test_app();

    let (status, body) = send(&app, "POST", "/session/mode/short_break", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["session"]["mode"], "SHORT_BREAK");
    assert_eq!(body["session"]["timeLeftSeconds"], 300);

    let (status, body) = send(&app, "POST", "/session/mode/nap", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status"], "error");
}

#[tokio::test]
async fn test_reset_after_start() {
    let (app, _) = test_app();
    send(&app, "POST", "/session/toggle", None).await;

    let (status, body) = send(&app, "POST", "/session/reset", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "idle");
    assert_eq!(body["session"]["timeLeftSeconds"], 900);
}

#[tokio::test]
async fn test_apply_task() {
    let (app, _) = test_app();

    let task = json!({ "durationSeconds": 120, "mode": "PRACTICE", "label": "Minuet" });
    let (status, body) = send(&app, "POST", "/session/task", Some(task)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["session"]["mode"], "PRACTICE");
    assert_eq!(body["session"]["timeLeftSeconds"], 120);
    assert_eq!(body["session"]["label"], "Minuet");
    assert_eq!(body["session"]["isRunning"], true);

    let zero = json!({ "durationSeconds": 0, "mode": "PRACTICE" });
    let (status, _) = send(&app, "POST", "/session/task", Some(zero)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_stop_alarm_when_idle_is_noop() {
    let (app, _) = test_app();
    let (status, body) = send(&app, "POST", "/session/alarm/stop", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["session"]["isAlarming"], false);
    assert_eq!(body["session"]["timeLeftSeconds"], 900);
}

// ============================================================================
// Preferences
// ============================================================================

#[tokio::test]
async fn test_duration_preferences() {
    let (app, _) = test_app();

    let (status, body) = send(&app, "GET", "/preferences/durations", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["minutes"]["STUDY"], 15);
    assert_eq!(body["minutes"]["SHORT_BREAK"], 5);

    let (status, body) = send(
        &app,
        "PUT",
        "/preferences/durations/practice",
        Some(json!({ "minutes": 20 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["minutes"]["PRACTICE"], 20);

    // Takes effect on the next mode selection
    let (_, body) = send(&app, "POST", "/session/mode/practice", None).await;
    assert_eq!(body["session"]["timeLeftSeconds"], 1200);

    let (status, _) = send(
        &app,
        "PUT",
        "/preferences/durations/practice",
        Some(json!({ "minutes": 0 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

// ============================================================================
// Practice Classes
// ============================================================================

#[tokio::test]
async fn test_generate_and_start_step() {
    let (app, state) = test_app();

    let (status, class) = send(
        &app,
        "POST",
        "/plans/generate",
        Some(json!({ "goal": "Chopin nocturne", "durationMinutes": 45 })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(class["name"], "Chopin nocturne");
    assert_eq!(class["totalDuration"], 45);
    assert_eq!(class["steps"].as_array().unwrap().len(), 3);
    assert_eq!(class["steps"][0]["type"], "ESTUDIO");

    let id = class["id"].as_str().unwrap().to_string();
    assert_eq!(state.plans.active().unwrap().map(|c| c.id), Some(id.clone()));

    // Malformed duration and empty action fall back to 5 minutes and "Block"
    let (status, body) = send(&app, "POST", &format!("/plans/{}/steps/1/start", id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["classId"], id.as_str());
    assert_eq!(body["stepIndex"], 1);
    assert_eq!(body["session"]["mode"], "SHORT_BREAK");
    assert_eq!(body["session"]["timeLeftSeconds"], 300);
    assert_eq!(body["session"]["label"], "Block");
    assert_eq!(body["session"]["isRunning"], true);

    let (_, body) = send(&app, "POST", &format!("/plans/{}/steps/2/start", id), None).await;
    assert_eq!(body["session"]["mode"], "PRACTICE");
    assert_eq!(body["session"]["timeLeftSeconds"], 900);
    assert_eq!(body["session"]["label"], "Nocturne");

    let (status, _) = send(&app, "POST", &format!("/plans/{}/steps/9/start", id), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_generate_failures() {
    let (app, state) = test_app();

    let (status, _) = send(&app, "POST", "/plans/generate", Some(json!({ "goal": "   " }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(&app, "POST", "/plans/generate", Some(json!({ "goal": "offline" }))).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["status"], "error");

    assert!(state.plans.list().unwrap().is_empty());
}

#[tokio::test]
async fn test_manual_class_editing() {
    let (app, _) = test_app();

    let (status, class) = send(&app, "POST", "/plans", None).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(class["steps"].as_array().unwrap().len(), 1);
    let id = class["id"].as_str().unwrap().to_string();

    let (status, class) = send(
        &app,
        "PUT",
        &format!("/plans/{}/name", id),
        Some(json!({ "name": "Monday" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(class["name"], "Monday");

    let (_, class) = send(&app, "POST", &format!("/plans/{}/steps", id), None).await;
    assert_eq!(class["steps"][1]["action"], "New block");
    assert_eq!(class["steps"][1]["type"], "PRÁCTICA");

    let (status, class) = send(
        &app,
        "PATCH",
        &format!("/plans/{}/steps/1", id),
        Some(json!({ "duration": "7", "type": "DESCANSO" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(class["steps"][1]["duration"], "7");
    assert_eq!(class["steps"][1]["type"], "DESCANSO");
    assert_eq!(class["steps"][1]["action"], "New block");

    let (status, class) = send(&app, "DELETE", &format!("/plans/{}/steps/0", id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(class["steps"].as_array().unwrap().len(), 1);

    let (status, _) = send(&app, "DELETE", &format!("/plans/{}/steps/5", id), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&app, "DELETE", &format!("/plans/{}", id), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(&app, "GET", &format!("/plans/{}", id), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_select_class() {
    let (app, _) = test_app();
    let (_, first) = send(&app, "POST", "/plans", None).await;
    let (_, second) = send(&app, "POST", "/plans", None).await;
    assert_ne!(first["id"], second["id"]);

    let first_id = first["id"].as_str().unwrap();
    let (status, _) = send(&app, "POST", &format!("/plans/{}/select", first_id), None).await;
    assert_eq!(status, StatusCode::OK);

    let (_, status_body) = send(&app, "GET", "/status", None).await;
    assert_eq!(status_body["activeClass"]["id"], first["id"]);

    let (_, list) = send(&app, "GET", "/plans", None).await;
    assert_eq!(list.as_array().unwrap().len(), 2);
}

// ============================================================================
// Misc
// ============================================================================

#[tokio::test]
async fn test_quote_falls_back_on_error() {
    let (app, _) = test_app();
    let (status, body) = send(&app, "GET", "/quote", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["quote"], melodyfocus::services::gemini::FAILED_QUOTE_FALLBACK);
}

#[tokio::test]
async fn test_status() {
    let (app, state) = test_app();
    state.record_completion();

    let (status, body) = send(&app, "GET", "/status", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["sessionsCompleted"], 1);
    assert_eq!(body["port"], 20554);
    assert_eq!(body["host"], "127.0.0.1");
    assert!(body["activeClass"].is_null());
    assert_eq!(body["session"]["mode"], "STUDY");
}
