//! Background tasks module
//!
//! This module contains background tasks that run alongside the HTTP server.

pub mod completion_counter;
pub mod session_controller;

// Re-export main functions
pub use completion_counter::completion_counter_task;
pub use session_controller::spawn_session_controller;
