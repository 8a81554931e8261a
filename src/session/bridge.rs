//! External task descriptors and the step-to-task mapping

use std::{
    num::IntErrorKind,
    sync::atomic::{AtomicU64, Ordering},
};

use serde::Serialize;

use super::{SessionError, TimerMode};
use crate::state::plans::{ActivityType, PracticeStep};

/// Minutes used when a step's duration cannot be read
pub const FALLBACK_STEP_MINUTES: u32 = 5;

/// Label used when a step has no action text
pub const FALLBACK_LABEL: &str = "Block";

static NEXT_TASK_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of a delivered task, unique within the process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct TaskId(u64);

impl TaskId {
    fn next() -> Self {
        Self(NEXT_TASK_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// A timer configuration handed to the session clock from outside
///
/// Two descriptors built from identical steps are still distinct tasks; the
/// clock deduplicates on `id`, never on the values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExternalTask {
    id: TaskId,
    duration_seconds: u32,
    mode: TimerMode,
    label: String,
}

impl ExternalTask {
    pub fn new(duration_seconds: u32, mode: TimerMode, label: impl Into<String>) -> Result<Self, SessionError> {
        if duration_seconds == 0 {
            return Err(SessionError::InvalidTask("duration must be positive".to_string()));
        }
        Ok(Self {
            id: TaskId::next(),
            duration_seconds,
            mode,
            label: label.into(),
        })
    }

    /// Build the task for a practice step; malformed data degrades to defaults
    pub fn from_step(step: &PracticeStep) -> Self {
        let label = if step.action.trim().is_empty() {
            FALLBACK_LABEL.to_string()
        } else {
            step.action.clone()
        };

        Self {
            id: TaskId::next(),
            duration_seconds: step_minutes(&step.duration) * 60,
            mode: mode_for_activity(&step.kind),
            label,
        }
    }

    pub fn id(&self) -> TaskId {
        self.id
    }

    pub fn duration_seconds(&self) -> u32 {
        self.duration_seconds
    }

    pub fn mode(&self) -> TimerMode {
        self.mode
    }

    pub fn label(&self) -> &str {
        &self.label
    }
}

pub fn mode_for_activity(kind: &ActivityType) -> TimerMode {
    match kind {
        ActivityType::Study => TimerMode::Study,
        ActivityType::Practice => TimerMode::Practice,
        ActivityType::Break => TimerMode::ShortBreak,
    }
}

/// Read a step duration as whole minutes
///
/// Accepts a leading integer with optional sign and ignores trailing text
/// (`"10 min"` is 10). Anything unparseable or not positive gives
/// [`FALLBACK_STEP_MINUTES`]. Values too large to time saturate.
pub fn step_minutes(raw: &str) -> u32 {
    let trimmed = raw.trim_start();
    let (negative, digits) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };
    let end = digits.find(|c: char| !c.is_ascii_digit()).unwrap_or(digits.len());

    let minutes = match digits[..end].parse::<u32>() {
        Ok(minutes) => minutes,
        Err(e) if *e.kind() == IntErrorKind::PosOverflow => u32::MAX,
        Err(_) => return FALLBACK_STEP_MINUTES,
    };

    if negative || minutes == 0 {
        FALLBACK_STEP_MINUTES
    } else {
        // Seconds must still fit in a u32
        minutes.min(u32::MAX / 60)
    }
}
