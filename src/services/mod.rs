//! External capability module
//!
//! This module contains the adapters for capabilities the session core
//! invokes but does not implement: audio output, desktop notifications and
//! the remote plan generator.

pub mod audio;
pub mod gemini;
pub mod notifications;

// Re-export main types
pub use audio::{check_player_available, AudioBackend, NullBackend, PcmPipeBackend};
pub use gemini::{GeminiClient, GeneratorError, PlanGenerator};
pub use notifications::{DesktopNotifier, NotificationPermission, Notifier};
