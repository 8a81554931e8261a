//! Session controller background task
//!
//! The only owner of the session clock. Commands, ticks and alarm expiry are
//! processed strictly one at a time, so the effects of one transition are in
//! place before the next message is looked at.

use std::sync::Arc;

use tokio::{
    sync::{broadcast, mpsc, watch},
    task::JoinHandle,
};
use tracing::{debug, info};

use crate::{
    services::{
        audio::AudioBackend,
        notifications::{NotificationPermission, Notifier},
    },
    session::{Alarm, ClockEffect, ClockEvent, SessionClock, SessionCommand, SessionCompleted, SessionHandle, Ticker},
    state::SessionState,
};

const COMMAND_BUFFER: usize = 32;
const COMPLETION_BUFFER: usize = 16;

/// Signals from the controller's own timed resources
#[derive(Debug)]
enum Internal {
    Tick(u64),
    AlarmExpired(u64),
}

struct SessionController {
    clock: SessionClock,
    ticker: Ticker,
    alarm: Alarm,
    notifier: Arc<dyn Notifier>,
    state_tx: watch::Sender<SessionState>,
    completed_tx: broadcast::Sender<SessionCompleted>,
    internal_tx: mpsc::UnboundedSender<Internal>,
}

/// Spawn the controller and return a handle to it
///
/// The task ends once every [`SessionHandle`] clone has been dropped.
pub fn spawn_session_controller(
    clock: SessionClock,
    audio: Arc<dyn AudioBackend>,
    notifier: Arc<dyn Notifier>,
) -> (SessionHandle, JoinHandle<()>) {
    let (command_tx, command_rx) = mpsc::channel(COMMAND_BUFFER);
    let (state_tx, state_rx) = watch::channel(clock.state().clone());
    let (completed_tx, _) = broadcast::channel(COMPLETION_BUFFER);
    let (internal_tx, internal_rx) = mpsc::unbounded_channel();

    let controller = SessionController {
        clock,
        ticker: Ticker::new(),
        alarm: Alarm::new(audio),
        notifier,
        state_tx,
        completed_tx: completed_tx.clone(),
        internal_tx,
    };
    let task = tokio::spawn(controller.run(command_rx, internal_rx));

    (SessionHandle::new(command_tx, state_rx, completed_tx), task)
}

impl SessionController {
    async fn run(
        mut self,
        mut commands: mpsc::Receiver<SessionCommand>,
        mut internal: mpsc::UnboundedReceiver<Internal>,
    ) {
        info!("Starting session controller");

        loop {
            tokio::select! {
                biased;

                command = commands.recv() => {
                    let Some(SessionCommand { event, reply }) = command else {
                        break;
                    };
                    self.handle(event).await;
                    let _ = reply.send(self.clock.state().clone());
                }

                Some(signal) = internal.recv() => match signal {
                    Internal::Tick(epoch) => {
                        if self.ticker.is_current(epoch) {
                            self.handle(ClockEvent::Tick).await;
                        } else {
                            debug!("Dropping stale tick from epoch {}", epoch);
                        }
                    }
                    Internal::AlarmExpired(generation) => {
                        if self.alarm.finish(generation) {
                            info!("Alarm {} expired", generation);
                            self.handle(ClockEvent::AlarmExpired).await;
                        } else {
                            debug!("Ignoring expiry of superseded alarm {}", generation);
                        }
                    }
                },
            }
        }

        self.ticker.stop();
        self.alarm.stop().await;
        info!("Session controller stopped");
    }

    async fn handle(&mut self, event: ClockEvent) {
        let effects = self.clock.update(event);
        for effect in effects {
            self.execute(effect).await;
        }
        self.state_tx.send_replace(self.clock.state().clone());
    }

    async fn execute(&mut self, effect: ClockEffect) {
        match effect {
            ClockEffect::StartTicker => {
                let tx = self.internal_tx.clone();
                self.ticker.start(move |epoch| tx.send(Internal::Tick(epoch)).is_ok());
            }
            ClockEffect::StopTicker => self.ticker.stop(),
            ClockEffect::StartAlarm(mode) => {
                let tx = self.internal_tx.clone();
                self.alarm
                    .start(mode, move |generation| {
                        let _ = tx.send(Internal::AlarmExpired(generation));
                    })
                    .await;
            }
            ClockEffect::StopAlarm => self.alarm.stop().await,
            ClockEffect::Notify { title, body } => {
                if self.notifier.permission() == NotificationPermission::Granted {
                    self.notifier.notify(&title, &body);
                } else {
                    debug!("Notification skipped, permission not granted");
                }
            }
            ClockEffect::EnsureNotificationPermission => {
                if self.notifier.permission() == NotificationPermission::Default {
                    self.notifier.request_permission();
                }
            }
            ClockEffect::SessionCompleted(done) => {
                if self.completed_tx.send(done).is_err() {
                    debug!("No completion listeners");
                }
            }
        }
    }
}
