//! Completed-session counter background task

use std::sync::Arc;

use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};

use crate::state::AppState;

/// Count every countdown that reaches zero
pub async fn completion_counter_task(state: Arc<AppState>) {
    info!("Starting completion counter task");

    let mut completions = state.session.subscribe_completions();

    loop {
        match completions.recv().await {
            Ok(done) => {
                let total = state.record_completion();
                info!(
                    "{} block '{}' completed ({}s), {} sessions today",
                    done.mode,
                    done.label.as_deref().unwrap_or("-"),
                    done.duration_seconds,
                    total
                );
            }
            Err(RecvError::Lagged(missed)) => {
                warn!("Completion counter lagged, {} completions missed", missed);
                for _ in 0..missed {
                    state.record_completion();
                }
            }
            Err(RecvError::Closed) => {
                info!("Session controller gone, completion counter exiting");
                break;
            }
        }
    }
}
