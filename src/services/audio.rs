//! Audio output for the alarm
//!
//! The alarm holds one [`ToneSink`] for its whole lifetime. The default sink
//! is a child process (`aplay` unless configured otherwise) reading raw
//! signed 16-bit mono PCM on stdin. Draining closes the pipe and waits for
//! the player to finish; dropping the sink kills the process.

use std::{f32::consts::PI, process::Stdio, time::Duration};

use async_trait::async_trait;
use thiserror::Error;
use tokio::{
    io::AsyncWriteExt,
    process::{Child, ChildStdin, Command},
};
use tracing::{debug, info, warn};

pub const SAMPLE_RATE: u32 = 22_050;

/// Peak gain of a tone envelope
const TONE_GAIN: f32 = 0.05;
const ATTACK: f32 = 0.1;
const RELEASE_END: f32 = 0.5;

#[derive(Debug, Error)]
pub enum AudioError {
    #[error("Audio output unavailable: {0}")]
    Unavailable(String),

    #[error("Audio write failed: {0}")]
    Io(#[from] std::io::Error),
}

/// One alarm beep
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tone {
    pub frequency_hz: f32,
    /// Audible part of the beep
    pub length: Duration,
    /// Total slot including trailing silence
    pub slot: Duration,
}

impl Tone {
    pub fn beep(frequency_hz: f32) -> Self {
        Self {
            frequency_hz,
            length: Duration::from_millis(600),
            slot: Duration::from_secs(1),
        }
    }

    /// Render the tone slot as little-endian S16 mono samples
    pub fn render(&self) -> Vec<u8> {
        let total = (self.slot.as_secs_f32() * SAMPLE_RATE as f32) as usize;
        let audible = (self.length.as_secs_f32() * SAMPLE_RATE as f32) as usize;
        let mut pcm = Vec::with_capacity(total * 2);

        for n in 0..total {
            let t = n as f32 / SAMPLE_RATE as f32;
            let sample = if n < audible {
                envelope(t) * (2.0 * PI * self.frequency_hz * t).sin()
            } else {
                0.0
            };
            let value = (sample * i16::MAX as f32) as i16;
            pcm.extend_from_slice(&value.to_le_bytes());
        }
        pcm
    }
}

/// Linear ramp up to the peak, then down to silence
fn envelope(t: f32) -> f32 {
    if t < ATTACK {
        TONE_GAIN * t / ATTACK
    } else if t < RELEASE_END {
        TONE_GAIN * (RELEASE_END - t) / (RELEASE_END - ATTACK)
    } else {
        0.0
    }
}

/// An open audio output; released when dropped
#[async_trait]
pub trait ToneSink: Send {
    async fn play(&mut self, tone: &Tone) -> Result<(), AudioError>;

    /// Wait until everything already played has been heard
    async fn drain(&mut self) -> Result<(), AudioError> {
        Ok(())
    }
}

/// Factory for audio outputs
pub trait AudioBackend: Send + Sync {
    fn open(&self) -> Result<Box<dyn ToneSink>, AudioError>;
}

/// Pipes PCM into an external player process
#[derive(Debug, Clone)]
pub struct PcmPipeBackend {
    program: String,
}

impl PcmPipeBackend {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn args(&self) -> Vec<String> {
        vec![
            "-q".to_string(),
            "-t".to_string(),
            "raw".to_string(),
            "-f".to_string(),
            "S16_LE".to_string(),
            "-c".to_string(),
            "1".to_string(),
            "-r".to_string(),
            SAMPLE_RATE.to_string(),
        ]
    }
}

impl AudioBackend for PcmPipeBackend {
    fn open(&self) -> Result<Box<dyn ToneSink>, AudioError> {
        let mut child = Command::new(&self.program)
            .args(self.args())
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| AudioError::Unavailable(format!("{}: {}", self.program, e)))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| AudioError::Unavailable("player stdin not captured".to_string()))?;

        debug!("Opened audio output via {}", self.program);
        Ok(Box::new(PipeSink {
            child,
            stdin: Some(stdin),
        }))
    }
}

struct PipeSink {
    child: Child,
    stdin: Option<ChildStdin>,
}

#[async_trait]
impl ToneSink for PipeSink {
    async fn play(&mut self, tone: &Tone) -> Result<(), AudioError> {
        let stdin = self
            .stdin
            .as_mut()
            .ok_or_else(|| AudioError::Unavailable("player already drained".to_string()))?;
        stdin.write_all(&tone.render()).await?;
        stdin.flush().await?;
        Ok(())
    }

    /// Close the pipe and let the player finish its buffer
    async fn drain(&mut self) -> Result<(), AudioError> {
        drop(self.stdin.take());
        let status = self.child.wait().await?;
        debug!("Audio player exited with {}", status);
        Ok(())
    }
}

/// Used with `--no-sound`: the alarm runs silently
#[derive(Debug, Clone, Copy, Default)]
pub struct NullBackend;

struct NullSink;

#[async_trait]
impl ToneSink for NullSink {
    async fn play(&mut self, _tone: &Tone) -> Result<(), AudioError> {
        Ok(())
    }
}

impl AudioBackend for NullBackend {
    fn open(&self) -> Result<Box<dyn ToneSink>, AudioError> {
        Ok(Box::new(NullSink))
    }
}

/// Check that the player program can be started
pub async fn check_player_available(program: &str) -> bool {
    match Command::new(program).arg("--version").output().await {
        Ok(_) => {
            info!("Audio player {} is available", program);
            true
        }
        Err(e) => {
            warn!("Audio player {} not available ({}), alarms will be silent", program, e);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_length_matches_slot() {
        let pcm = Tone::beep(440.0).render();
        assert_eq!(pcm.len(), SAMPLE_RATE as usize * 2);
    }

    #[test]
    fn test_render_is_silent_after_release() {
        let pcm = Tone::beep(440.0).render();
        let tail_start = (SAMPLE_RATE as usize / 10) * 6 * 2;
        assert!(pcm[tail_start..].iter().all(|b| *b == 0));
        assert!(pcm[..tail_start].iter().any(|b| *b != 0));
    }

    #[test]
    fn test_envelope_peaks_at_attack() {
        assert_eq!(envelope(0.0), 0.0);
        assert!((envelope(ATTACK) - TONE_GAIN).abs() < 1e-6);
        assert_eq!(envelope(0.55), 0.0);
    }

    #[tokio::test]
    async fn test_missing_player_is_unavailable() {
        let backend = PcmPipeBackend::new("melodyfocus-no-such-player");
        assert!(matches!(backend.open(), Err(AudioError::Unavailable(_))));
        assert!(!check_player_available("melodyfocus-no-such-player").await);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_drain_waits_for_player_to_consume_everything() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("played.raw");
        let player = dir.path().join("slow-player");
        std::fs::write(
            &player,
            format!("#!/bin/sh\nsleep 0.2\ncat > '{}'\n", out.display()),
        )
        .unwrap();
        std::fs::set_permissions(&player, std::fs::Permissions::from_mode(0o755)).unwrap();

        let mut sink = PcmPipeBackend::new(player.to_string_lossy()).open().unwrap();
        let tone = Tone::beep(440.0);
        sink.play(&tone).await.unwrap();
        sink.play(&tone).await.unwrap();
        sink.drain().await.unwrap();

        let played = std::fs::metadata(&out).unwrap().len() as usize;
        assert_eq!(played, tone.render().len() * 2);
        assert!(sink.play(&tone).await.is_err());
    }

    #[tokio::test]
    async fn test_null_backend_plays() {
        let mut sink = NullBackend.open().unwrap();
        sink.play(&Tone::beep(220.0)).await.unwrap();
    }
}
