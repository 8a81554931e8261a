//! Configuration and CLI argument handling

use std::path::PathBuf;

use clap::Parser;

use crate::{services::gemini::DEFAULT_MODEL, session::TimerMode};

/// CLI argument parsing structure
#[derive(Debug, Parser)]
#[command(name = "melodyfocus")]
#[command(about = "A practice-timer server for piano students")]
#[command(version)]
pub struct Config {
    /// Port to bind the server to
    #[arg(short, long, default_value = "20554")]
    pub port: u16,

    /// Host address to bind to
    #[arg(long, default_value = "127.0.0.1")]
    pub host: String,

    /// Timer mode at start-up (study, practice, short_break)
    #[arg(short, long, default_value = "study")]
    pub mode: TimerMode,

    /// Directory holding saved preferences and classes
    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    /// Program that plays raw S16LE mono PCM from stdin
    #[arg(long, default_value = "aplay")]
    pub audio_command: String,

    /// Ring the alarm silently
    #[arg(long)]
    pub no_sound: bool,

    /// Never show desktop notifications
    #[arg(long)]
    pub no_notifications: bool,

    /// API key for the AI practice-plan generator
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    pub gemini_api_key: Option<String>,

    /// Model used by the AI practice-plan generator
    #[arg(long, default_value = DEFAULT_MODEL)]
    pub gemini_model: String,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl Config {
    /// Parse configuration from command line arguments
    pub fn parse() -> Self {
        Parser::parse()
    }

    /// Get the server address as a formatted string
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Get the appropriate log level based on verbose flag
    pub fn log_level(&self) -> &'static str {
        if self.verbose {
            "debug"
        } else {
            "info"
        }
    }

    /// Where preferences live; `None` when no data directory can be found
    pub fn resolved_data_dir(&self) -> Option<PathBuf> {
        self.data_dir
            .clone()
            .or_else(|| dirs::data_dir().map(|dir| dir.join("melodyfocus")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::try_parse_from(["melodyfocus"]).unwrap();
        assert_eq!(config.address(), "127.0.0.1:20554");
        assert_eq!(config.mode, TimerMode::Study);
        assert_eq!(config.log_level(), "info");
        assert_eq!(config.audio_command, "aplay");
        assert!(!config.no_sound);
    }

    #[test]
    fn test_flags() {
        let config = Config::try_parse_from([
            "melodyfocus",
            "--port",
            "8080",
            "--mode",
            "short_break",
            "--data-dir",
            "/tmp/mf",
            "--no-sound",
            "-v",
        ])
        .unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.mode, TimerMode::ShortBreak);
        assert_eq!(config.resolved_data_dir(), Some(PathBuf::from("/tmp/mf")));
        assert!(config.no_sound);
        assert_eq!(config.log_level(), "debug");
    }

    #[test]
    fn test_unknown_mode_rejected() {
        assert!(Config::try_parse_from(["melodyfocus", "--mode", "nap"]).is_err());
    }
}
