//! Session clock, alarm and the external task bridge
//!
//! [`SessionClock`] is the pure state machine; [`Ticker`] and [`Alarm`] are
//! the timed resources its effects drive. The controller task in
//! [`crate::tasks`] owns all three and is reached through a [`SessionHandle`].

pub mod alarm;
pub mod bridge;
pub mod clock;
pub mod handle;
pub mod mode;
pub mod ticker;

use thiserror::Error;

pub use alarm::Alarm;
pub use bridge::{ExternalTask, TaskId};
pub use clock::{ClockEffect, ClockEvent, SessionClock, SessionCompleted};
pub use handle::{SessionCommand, SessionHandle};
pub use mode::TimerMode;
pub use ticker::Ticker;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Invalid task: {0}")]
    InvalidTask(String),

    #[error("Session controller is not running")]
    ControllerGone,
}
