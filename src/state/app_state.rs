//! Main application state management

use std::{
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Mutex,
    },
    time::Instant,
};

use chrono::{DateTime, Utc};
use tracing::debug;

use super::{plans::PlanLibrary, preferences::DurationPreferences};
use crate::{services::PlanGenerator, session::SessionHandle};

/// Shared state behind every HTTP handler
pub struct AppState {
    /// Handle to the session controller task
    pub session: SessionHandle,
    /// Per-mode duration preferences
    pub durations: DurationPreferences,
    /// Saved practice classes
    pub plans: PlanLibrary,
    /// Remote plan generator
    pub generator: Arc<dyn PlanGenerator>,
    /// Countdowns completed since start-up
    sessions_completed: AtomicU64,
    /// Server metadata
    pub start_time: Instant,
    pub port: u16,
    pub host: String,
    /// Last action tracking
    last_action: Mutex<Option<(String, DateTime<Utc>)>>,
}

impl AppState {
    pub fn new(
        session: SessionHandle,
        durations: DurationPreferences,
        plans: PlanLibrary,
        generator: Arc<dyn PlanGenerator>,
        port: u16,
        host: String,
    ) -> Self {
        Self {
            session,
            durations,
            plans,
            generator,
            sessions_completed: AtomicU64::new(0),
            start_time: Instant::now(),
            port,
            host,
            last_action: Mutex::new(None),
        }
    }

    /// Remember the most recent user action for the status endpoint
    pub fn record_action(&self, action: &str) {
        debug!("Action: {}", action);
        if let Ok(mut last) = self.last_action.lock() {
            *last = Some((action.to_string(), Utc::now()));
        }
    }

    pub fn get_last_action(&self) -> (Option<String>, Option<DateTime<Utc>>) {
        match self.last_action.lock().ok().and_then(|last| last.clone()) {
            Some((action, at)) => (Some(action), Some(at)),
            None => (None, None),
        }
    }

    /// Count one completed countdown; returns the new total
    pub fn record_completion(&self) -> u64 {
        self.sessions_completed.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn sessions_completed(&self) -> u64 {
        self.sessions_completed.load(Ordering::SeqCst)
    }

    /// Calculate server uptime as a formatted string
    pub fn get_uptime(&self) -> String {
        format_uptime(self.start_time.elapsed().as_secs())
    }
}

fn format_uptime(total_seconds: u64) -> String {
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    if hours > 0 {
        format!("{}h {}m {}s", hours, minutes, seconds)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, seconds)
    } else {
        format!("{}s", seconds)
    }
}
