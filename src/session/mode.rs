//! Timer modes and their built-in defaults

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

/// Built-in study duration when no preference is stored
pub const DEFAULT_STUDY_SECONDS: u32 = 15 * 60;
/// Built-in practice duration when no preference is stored
pub const DEFAULT_PRACTICE_SECONDS: u32 = 15 * 60;
/// Built-in break duration when no preference is stored
pub const DEFAULT_SHORT_BREAK_SECONDS: u32 = 5 * 60;

/// The category of activity being timed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TimerMode {
    Study,
    Practice,
    ShortBreak,
}

impl TimerMode {
    pub const ALL: [TimerMode; 3] = [TimerMode::Study, TimerMode::Practice, TimerMode::ShortBreak];

    /// Wire and storage name of the mode
    pub fn as_str(&self) -> &'static str {
        match self {
            TimerMode::Study => "STUDY",
            TimerMode::Practice => "PRACTICE",
            TimerMode::ShortBreak => "SHORT_BREAK",
        }
    }

    /// Countdown length used when the user has not configured one
    pub fn default_duration_seconds(&self) -> u32 {
        match self {
            TimerMode::Study => DEFAULT_STUDY_SECONDS,
            TimerMode::Practice => DEFAULT_PRACTICE_SECONDS,
            TimerMode::ShortBreak => DEFAULT_SHORT_BREAK_SECONDS,
        }
    }

    pub fn is_break(&self) -> bool {
        matches!(self, TimerMode::ShortBreak)
    }

    /// Alarm pitch: breaks ring lower than work blocks
    pub fn alarm_frequency_hz(&self) -> f32 {
        if self.is_break() {
            220.0
        } else {
            440.0
        }
    }

    /// Accent colour shown by clients for this mode
    pub fn theme_color(&self) -> &'static str {
        match self {
            TimerMode::Study => "amber",
            TimerMode::Practice => "emerald",
            TimerMode::ShortBreak => "blue",
        }
    }
}

impl fmt::Display for TimerMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown timer mode: {0}")]
pub struct UnknownMode(pub String);

impl FromStr for TimerMode {
    type Err = UnknownMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "study" | "pomodoro" => Ok(TimerMode::Study),
            "practice" => Ok(TimerMode::Practice),
            "short_break" | "break" => Ok(TimerMode::ShortBreak),
            _ => Err(UnknownMode(s.to_string())),
        }
    }
}
