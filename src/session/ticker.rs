//! The 1 Hz scheduler driving the countdown

use std::time::Duration;

use tokio::{
    task::JoinHandle,
    time::{interval_at, Instant, MissedTickBehavior},
};
use tracing::debug;

pub const TICK_PERIOD: Duration = Duration::from_secs(1);

/// Runs while the session is running; each start supersedes the previous run
///
/// Every run has its own epoch. Ticks already queued by a superseded run
/// carry an old epoch and are dropped by the receiver.
#[derive(Debug, Default)]
pub struct Ticker {
    task: Option<JoinHandle<()>>,
    epoch: u64,
}

impl Ticker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a fresh run; the first tick fires one period from now
    pub fn start<F>(&mut self, mut on_tick: F) -> u64
    where
        F: FnMut(u64) -> bool + Send + 'static,
    {
        self.stop();
        self.epoch += 1;
        let epoch = self.epoch;
        debug!("Ticker epoch {} started", epoch);

        self.task = Some(tokio::spawn(async move {
            let mut interval = interval_at(Instant::now() + TICK_PERIOD, TICK_PERIOD);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                if !on_tick(epoch) {
                    break;
                }
            }
        }));
        epoch
    }

    pub fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            debug!("Ticker epoch {} stopped", self.epoch);
            task.abort();
        }
    }

    pub fn is_running(&self) -> bool {
        self.task.is_some()
    }

    /// Whether a tick from `epoch` belongs to the live run
    pub fn is_current(&self, epoch: u64) -> bool {
        self.task.is_some() && epoch == self.epoch
    }
}

impl Drop for Ticker {
    fn drop(&mut self) {
        self.stop();
    }
}
