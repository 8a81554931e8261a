//! State management module
//!
//! This module contains the session state, the persisted preferences and
//! practice classes, and the shared application state.

pub mod app_state;
pub mod plans;
pub mod preferences;
pub mod session_state;

// Re-export main types
pub use app_state::AppState;
pub use plans::{PlanError, PlanLibrary};
pub use preferences::{DurationPreferences, JsonFileStore, MemoryStore, PreferenceStore};
pub use session_state::{SessionPhase, SessionState};
