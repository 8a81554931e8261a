//! Bounded, stoppable completion alarm

use std::{sync::Arc, time::Duration};

use tokio::{
    task::JoinHandle,
    time::{interval, sleep_until, timeout, Instant, MissedTickBehavior},
};
use tracing::{debug, info, warn};

use super::TimerMode;
use crate::services::audio::{AudioBackend, Tone, ToneSink};

/// Beeps per alarm
pub const TONE_REPETITIONS: u32 = 10;
/// One beep per second
pub const TONE_CADENCE: Duration = Duration::from_secs(1);
/// The alarm ends on its own after this long
pub const ALARM_CEILING: Duration = Duration::from_secs(10);

struct Ringing {
    generation: u64,
    task: JoinHandle<()>,
}

/// Owns the audio resource of at most one ringing alarm
pub struct Alarm {
    audio: Arc<dyn AudioBackend>,
    ringing: Option<Ringing>,
    generation: u64,
}

impl Alarm {
    pub fn new(audio: Arc<dyn AudioBackend>) -> Self {
        Self {
            audio,
            ringing: None,
            generation: 0,
        }
    }

    pub fn is_active(&self) -> bool {
        self.ringing.is_some()
    }

    /// Start ringing for `mode`, tearing down any previous alarm first
    ///
    /// `on_expired` runs with the alarm's generation once the ceiling
    /// elapses, unless the alarm is stopped before that. Returns the
    /// generation of the new alarm.
    pub async fn start<F>(&mut self, mode: TimerMode, on_expired: F) -> u64
    where
        F: FnOnce(u64) + Send + 'static,
    {
        self.stop().await;

        self.generation += 1;
        let generation = self.generation;
        let tone = Tone::beep(mode.alarm_frequency_hz());

        let sink = match self.audio.open() {
            Ok(sink) => Some(sink),
            Err(e) => {
                warn!("Alarm will be silent: {}", e);
                None
            }
        };

        info!("Alarm {} ringing at {}Hz", generation, tone.frequency_hz);
        let task = tokio::spawn(async move {
            let started = Instant::now();
            if timeout(ALARM_CEILING, ring(sink, tone)).await.is_err() {
                debug!("Alarm {} hit the ceiling mid-pattern", generation);
            }
            sleep_until(started + ALARM_CEILING).await;
            on_expired(generation);
        });

        self.ringing = Some(Ringing { generation, task });
        generation
    }

    /// Silence the alarm and release its audio output; no-op when idle
    pub async fn stop(&mut self) {
        if let Some(ringing) = self.ringing.take() {
            debug!("Stopping alarm {}", ringing.generation);
            ringing.task.abort();
            // Awaiting the aborted task guarantees the sink has been dropped.
            let _ = ringing.task.await;
        }
    }

    /// Clear the alarm after it expired on its own
    ///
    /// Returns false when `generation` belongs to an alarm that was already
    /// stopped or superseded.
    pub fn finish(&mut self, generation: u64) -> bool {
        match &self.ringing {
            Some(ringing) if ringing.generation == generation => {
                self.ringing = None;
                true
            }
            _ => false,
        }
    }
}

/// Play the beep pattern, let the output drain, then release it
async fn ring(mut sink: Option<Box<dyn ToneSink>>, tone: Tone) {
    let mut cadence = interval(TONE_CADENCE);
    cadence.set_missed_tick_behavior(MissedTickBehavior::Delay);

    for _ in 0..TONE_REPETITIONS {
        cadence.tick().await;
        if let Some(out) = sink.as_mut() {
            if let Err(e) = out.play(&tone).await {
                warn!("Alarm audio failed, continuing silently: {}", e);
                sink = None;
            }
        }
    }

    if let Some(mut out) = sink {
        if let Err(e) = out.drain().await {
            warn!("Alarm audio did not drain: {}", e);
        }
    }
}
