//! Cloneable handle to the session controller task

use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tracing::debug;

use super::{ClockEvent, ExternalTask, SessionCompleted, SessionError, TimerMode};
use crate::state::SessionState;

/// A clock event plus the channel its resulting state is reported on
#[derive(Debug)]
pub struct SessionCommand {
    pub event: ClockEvent,
    pub reply: oneshot::Sender<SessionState>,
}

/// Sends commands to the controller and observes its state
#[derive(Debug, Clone)]
pub struct SessionHandle {
    commands: mpsc::Sender<SessionCommand>,
    state_rx: watch::Receiver<SessionState>,
    completed_tx: broadcast::Sender<SessionCompleted>,
}

impl SessionHandle {
    pub fn new(
        commands: mpsc::Sender<SessionCommand>,
        state_rx: watch::Receiver<SessionState>,
        completed_tx: broadcast::Sender<SessionCompleted>,
    ) -> Self {
        Self {
            commands,
            state_rx,
            completed_tx,
        }
    }

    async fn send(&self, event: ClockEvent) -> Result<SessionState, SessionError> {
        debug!("Sending {:?} to session controller", event);
        let (reply, reply_rx) = oneshot::channel();
        self.commands
            .send(SessionCommand { event, reply })
            .await
            .map_err(|_| SessionError::ControllerGone)?;
        reply_rx.await.map_err(|_| SessionError::ControllerGone)
    }

    pub async fn select_mode(&self, mode: TimerMode) -> Result<SessionState, SessionError> {
        self.send(ClockEvent::SelectMode(mode)).await
    }

    pub async fn apply_external_task(&self, task: ExternalTask) -> Result<SessionState, SessionError> {
        self.send(ClockEvent::ApplyExternalTask(task)).await
    }

    pub async fn toggle_running(&self) -> Result<SessionState, SessionError> {
        self.send(ClockEvent::ToggleRunning).await
    }

    pub async fn reset(&self) -> Result<SessionState, SessionError> {
        self.send(ClockEvent::Reset).await
    }

    pub async fn stop_alarm(&self) -> Result<SessionState, SessionError> {
        self.send(ClockEvent::StopAlarm).await
    }

    /// Latest published state
    pub fn snapshot(&self) -> SessionState {
        self.state_rx.borrow().clone()
    }

    /// Watch every published state change
    pub fn subscribe_state(&self) -> watch::Receiver<SessionState> {
        self.state_rx.clone()
    }

    /// Receive one message per countdown that reaches zero
    pub fn subscribe_completions(&self) -> broadcast::Receiver<SessionCompleted> {
        self.completed_tx.subscribe()
    }

    pub fn is_connected(&self) -> bool {
        !self.commands.is_closed()
    }
}
