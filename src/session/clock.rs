//! Session clock state machine
//!
//! The clock is pure: every transition goes through [`SessionClock::update`],
//! which mutates the [`SessionState`] and returns the side effects the
//! runtime must perform (ticker, alarm, notification, completion signal).
//! Nothing here sleeps, spawns or does I/O beyond reading duration
//! preferences.

use serde::Serialize;
use tracing::{debug, info};

use super::{ExternalTask, TaskId, TimerMode};
use crate::state::{preferences::DurationPreferences, SessionState};

pub const NOTIFICATION_TITLE: &str = "MelodyFocus";

/// Inputs to the clock
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClockEvent {
    SelectMode(TimerMode),
    ApplyExternalTask(ExternalTask),
    ToggleRunning,
    Reset,
    /// One wall-clock second elapsed while running
    Tick,
    /// The user dismissed the alarm
    StopAlarm,
    /// The alarm reached its ceiling on its own
    AlarmExpired,
}

/// Emitted once per countdown that reaches zero
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionCompleted {
    pub mode: TimerMode,
    pub duration_seconds: u32,
    pub label: Option<String>,
}

/// Side effects requested by a transition, in execution order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClockEffect {
    /// (Re)start the 1 Hz ticker, superseding any previous one
    StartTicker,
    StopTicker,
    StartAlarm(TimerMode),
    StopAlarm,
    Notify { title: String, body: String },
    /// Ask for notification permission if the user has not decided yet
    EnsureNotificationPermission,
    SessionCompleted(SessionCompleted),
}

pub struct SessionClock {
    state: SessionState,
    durations: DurationPreferences,
    last_task: Option<TaskId>,
}

impl SessionClock {
    /// Create an idle clock in `mode` with its saved (or default) duration
    pub fn new(mode: TimerMode, durations: DurationPreferences) -> Self {
        let state = SessionState::new(mode, durations.duration_seconds(mode));
        Self {
            state,
            durations,
            last_task: None,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn update(&mut self, event: ClockEvent) -> Vec<ClockEffect> {
        let mut effects = Vec::new();
        match event {
            ClockEvent::SelectMode(mode) => self.select_mode(mode, &mut effects),
            ClockEvent::ApplyExternalTask(task) => self.apply_external_task(task, &mut effects),
            ClockEvent::ToggleRunning => self.toggle_running(&mut effects),
            ClockEvent::Reset => self.reset(&mut effects),
            ClockEvent::Tick => self.tick(&mut effects),
            ClockEvent::StopAlarm | ClockEvent::AlarmExpired => {
                self.state.is_alarming = false;
                effects.push(ClockEffect::StopAlarm);
            }
        }

        debug_assert!(self.state.is_consistent(), "inconsistent session state: {:?}", self.state);
        effects
    }

    fn select_mode(&mut self, mode: TimerMode, effects: &mut Vec<ClockEffect>) {
        info!("Switching to {} mode", mode);
        if self.state.is_running {
            effects.push(ClockEffect::StopTicker);
        }
        self.state = SessionState::new(mode, self.durations.duration_seconds(mode));
        effects.push(ClockEffect::StopAlarm);
    }

    fn apply_external_task(&mut self, task: ExternalTask, effects: &mut Vec<ClockEffect>) {
        if self.last_task == Some(task.id()) {
            debug!("Task {:?} already applied, ignoring", task.id());
            return;
        }
        info!(
            "Applying task '{}': {} for {}s",
            task.label(),
            task.mode(),
            task.duration_seconds()
        );

        self.last_task = Some(task.id());
        self.state = SessionState {
            mode: task.mode(),
            time_left_seconds: task.duration_seconds(),
            initial_duration_seconds: task.duration_seconds(),
            is_running: true,
            is_alarming: false,
            label: Some(task.label().to_string()),
        };
        effects.push(ClockEffect::StopAlarm);
        effects.push(ClockEffect::StartTicker);
    }

    fn toggle_running(&mut self, effects: &mut Vec<ClockEffect>) {
        if self.state.is_alarming {
            self.state.is_alarming = false;
            effects.push(ClockEffect::StopAlarm);
        }

        if self.state.is_running {
            debug!("Pausing at {}s", self.state.time_left_seconds);
            self.state.is_running = false;
            effects.push(ClockEffect::StopTicker);
        } else {
            if self.state.time_left_seconds == 0 {
                self.state.time_left_seconds = self.state.initial_duration_seconds;
            }
            debug!("Starting at {}s", self.state.time_left_seconds);
            self.state.is_running = true;
            effects.push(ClockEffect::EnsureNotificationPermission);
            effects.push(ClockEffect::StartTicker);
        }
    }

    fn reset(&mut self, effects: &mut Vec<ClockEffect>) {
        if self.state.is_running {
            effects.push(ClockEffect::StopTicker);
        }
        self.state.time_left_seconds = self.state.initial_duration_seconds;
        self.state.is_running = false;
        self.state.is_alarming = false;
        effects.push(ClockEffect::StopAlarm);
    }

    fn tick(&mut self, effects: &mut Vec<ClockEffect>) {
        if !self.state.is_running || self.state.time_left_seconds == 0 {
            return;
        }

        self.state.time_left_seconds -= 1;
        if self.state.time_left_seconds == 0 {
            self.complete(effects);
        }
    }

    fn complete(&mut self, effects: &mut Vec<ClockEffect>) {
        info!("{} session complete", self.state.mode);
        self.state.is_running = false;
        self.state.is_alarming = true;

        let body = match &self.state.label {
            Some(label) => format!("{} complete!", label),
            None => "Block complete!".to_string(),
        };
        effects.push(ClockEffect::StopTicker);
        effects.push(ClockEffect::StartAlarm(self.state.mode));
        effects.push(ClockEffect::Notify {
            title: NOTIFICATION_TITLE.to_string(),
            body,
        });
        effects.push(ClockEffect::SessionCompleted(SessionCompleted {
            mode: self.state.mode,
            duration_seconds: self.state.initial_duration_seconds,
            label: self.state.label.clone(),
        }));
    }
}
