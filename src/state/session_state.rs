//! Session state structure and derived views

use serde::{Deserialize, Serialize};

use crate::session::TimerMode;

/// Observable phase of the session clock
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionPhase {
    Idle,
    Running,
    Alarming,
}

/// The countdown owned by the session clock
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionState {
    pub mode: TimerMode,
    pub time_left_seconds: u32,
    pub initial_duration_seconds: u32,
    pub is_running: bool,
    pub is_alarming: bool,
    /// Label of the practice block driving the session, if any
    pub label: Option<String>,
}

impl SessionState {
    /// Create an idle session for `mode` with a full countdown
    pub fn new(mode: TimerMode, duration_seconds: u32) -> Self {
        let duration_seconds = duration_seconds.max(1);
        Self {
            mode,
            time_left_seconds: duration_seconds,
            initial_duration_seconds: duration_seconds,
            is_running: false,
            is_alarming: false,
            label: None,
        }
    }

    pub fn phase(&self) -> SessionPhase {
        if self.is_alarming {
            SessionPhase::Alarming
        } else if self.is_running {
            SessionPhase::Running
        } else {
            SessionPhase::Idle
        }
    }

    /// Remaining time as `m:ss`
    pub fn display(&self) -> String {
        format!("{}:{:02}", self.time_left_seconds / 60, self.time_left_seconds % 60)
    }

    /// Remaining share of the countdown, 0-100
    pub fn progress_percent(&self) -> f64 {
        if self.initial_duration_seconds == 0 {
            return 0.0;
        }
        f64::from(self.time_left_seconds) * 100.0 / f64::from(self.initial_duration_seconds)
    }

    /// Check the state machine invariants
    pub fn is_consistent(&self) -> bool {
        self.initial_duration_seconds > 0
            && self.time_left_seconds <= self.initial_duration_seconds
            && !(self.is_running && self.is_alarming)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_session_is_idle_and_full() {
        let state = SessionState::new(TimerMode::Study, 900);
        assert_eq!(state.phase(), SessionPhase::Idle);
        assert_eq!(state.time_left_seconds, 900);
        assert_eq!(state.progress_percent(), 100.0);
        assert!(state.is_consistent());
    }

    #[test]
    fn test_display_pads_seconds() {
        let mut state = SessionState::new(TimerMode::ShortBreak, 300);
        assert_eq!(state.display(), "5:00");
        state.time_left_seconds = 65;
        assert_eq!(state.display(), "1:05");
        state.time_left_seconds = 0;
        assert_eq!(state.display(), "0:00");
    }

    #[test]
    fn test_phase_prefers_alarming() {
        let mut state = SessionState::new(TimerMode::Study, 60);
        state.is_running = true;
        assert_eq!(state.phase(), SessionPhase::Running);
        state.is_running = false;
        state.is_alarming = true;
        assert_eq!(state.phase(), SessionPhase::Alarming);
    }

    #[test]
    fn test_serializes_camel_case() {
        let state = SessionState::new(TimerMode::Practice, 120);
        let value = serde_json::to_value(&state).unwrap();
        assert_eq!(value["timeLeftSeconds"], 120);
        assert_eq!(value["initialDurationSeconds"], 120);
        assert_eq!(value["mode"], "PRACTICE");
        assert_eq!(value["isAlarming"], false);
    }
}
