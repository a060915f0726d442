use std::sync::RwLock;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PermissionState {
    Granted,
    Denied,
    NotYetAsked,
}

/// Whether reminders may be shown to the user.
#[async_trait]
pub trait NotificationPermission: Send + Sync {
    fn state(&self) -> PermissionState;
    async fn request(&self) -> PermissionState;
}

/// Accepts `(title, body)` reminders for display.
#[async_trait]
pub trait ReminderSink: Send + Sync {
    async fn emit(&self, title: &str, body: &str) -> Result<(), AppError>;
}

/// Permission held in memory and updated by the client that owns the
/// actual prompt.
pub struct SharedPermission {
    state: RwLock<PermissionState>,
}

impl SharedPermission {
    pub fn new(initial: PermissionState) -> Self {
        Self {
            state: RwLock::new(initial),
        }
    }

    pub fn set(&self, state: PermissionState) {
        let mut guard = self
            .state
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if *guard != state {
            info!("Notification permission changed: {:?} -> {:?}", *guard, state);
        }
        *guard = state;
    }
}

impl Default for SharedPermission {
    fn default() -> Self {
        Self::new(PermissionState::NotYetAsked)
    }
}

#[async_trait]
impl NotificationPermission for SharedPermission {
    fn state(&self) -> PermissionState {
        *self
            .state
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    // The prompt itself lives in the client; the answer arrives through `set`.
    async fn request(&self) -> PermissionState {
        self.state()
    }
}

/// Emits reminders as structured log events.
pub struct LogSink;

#[async_trait]
impl ReminderSink for LogSink {
    async fn emit(&self, title: &str, body: &str) -> Result<(), AppError> {
        info!(title, body, "reminder");
        Ok(())
    }
}
