//! Desktop notifications
//!
//! Notifications are best-effort: they are only shown once permission is
//! granted, are delivered off the controller task, and any failure just marks
//! the capability unavailable.

use std::sync::{Arc, Mutex};

use notify_rust::Notification;
use serde::Serialize;
use tracing::{debug, info, warn};

/// Observable outcomes of the permission request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationPermission {
    /// The user has not decided yet
    Default,
    Granted,
    Denied,
    Unavailable,
}

pub trait Notifier: Send + Sync {
    fn permission(&self) -> NotificationPermission;

    /// Ask for permission; never blocks the caller
    fn request_permission(&self);

    /// Show a notification; never blocks the caller
    fn notify(&self, title: &str, body: &str);
}

/// Notifications through the desktop notification server
#[derive(Debug)]
pub struct DesktopNotifier {
    enabled: bool,
    permission: Arc<Mutex<NotificationPermission>>,
}

impl DesktopNotifier {
    pub fn new(enabled: bool) -> Self {
        let initial = if enabled {
            NotificationPermission::Default
        } else {
            NotificationPermission::Denied
        };
        Self {
            enabled,
            permission: Arc::new(Mutex::new(initial)),
        }
    }

    fn set_permission(&self, permission: NotificationPermission) {
        if let Ok(mut current) = self.permission.lock() {
            *current = permission;
        }
    }
}

impl Notifier for DesktopNotifier {
    fn permission(&self) -> NotificationPermission {
        self.permission
            .lock()
            .map(|p| *p)
            .unwrap_or(NotificationPermission::Unavailable)
    }

    fn request_permission(&self) {
        // Desktop notification servers have no consent prompt; the
        // command-line switch is the user's decision.
        let outcome = if self.enabled {
            NotificationPermission::Granted
        } else {
            NotificationPermission::Denied
        };
        info!("Notification permission: {:?}", outcome);
        self.set_permission(outcome);
    }

    fn notify(&self, title: &str, body: &str) {
        let title = title.to_string();
        let body = body.to_string();
        let permission = Arc::clone(&self.permission);

        tokio::task::spawn_blocking(move || {
            let result = Notification::new()
                .summary(&title)
                .body(&body)
                .appname("melodyfocus")
                .icon("alarm-clock")
                .show();

            match result {
                Ok(_) => debug!("Notification shown: {}", body),
                Err(e) => {
                    warn!("Failed to show notification: {}", e);
                    if let Ok(mut current) = permission.lock() {
                        *current = NotificationPermission::Unavailable;
                    }
                }
            }
        });
    }
}
