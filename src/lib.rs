//! MelodyFocus - a practice-timer server for piano students
//!
//! This library provides the session clock with its alarm and the bridge
//! from practice-plan steps, the persisted preferences and classes, and the
//! HTTP API that exposes them.

pub mod api;
pub mod config;
pub mod services;
pub mod session;
pub mod state;
pub mod tasks;
pub mod utils;

// Re-export commonly used types
pub use api::create_router;
pub use config::Config;
pub use session::{ExternalTask, SessionClock, SessionHandle, TimerMode};
pub use state::AppState;
pub use utils::signals::shutdown_signal;
