//! System-alert permission tracking.
//!
//! Mirrors the browser notification permission model the dashboard lives
//! with: an unprompted session may ask the user once, a denial sticks, and
//! only an explicit user action may ask again.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionState {
    Granted,
    Denied,
    /// Never prompted.
    Default,
}

/// The platform prompt itself.
#[async_trait]
pub trait PermissionProvider: Send + Sync {
    async fn request(&self) -> PermissionState;
}

/// Desktop daemons have no prompt dialog; showing notifications is allowed
/// outright and the OS-level do-not-disturb settings take it from there.
pub struct AlwaysGranted;

#[async_trait]
impl PermissionProvider for AlwaysGranted {
    async fn request(&self) -> PermissionState {
        PermissionState::Granted
    }
}

struct GateState {
    current: PermissionState,
    requested: bool,
}

pub struct PermissionGate {
    provider: Arc<dyn PermissionProvider>,
    state: Mutex<GateState>,
}

impl PermissionGate {
    pub fn new(provider: Arc<dyn PermissionProvider>) -> Self {
        Self {
            provider,
            state: Mutex::new(GateState {
                current: PermissionState::Default,
                requested: false,
            }),
        }
    }

    pub async fn current(&self) -> PermissionState {
        self.state.lock().await.current
    }

    /// Prompt if this session never has; otherwise return the known state.
    /// A denial is never re-prompted from here.
    pub async fn ensure_requested(&self) -> PermissionState {
        let mut state = self.state.lock().await;
        if state.requested || state.current != PermissionState::Default {
            return state.current;
        }

        state.requested = true;
        state.current = self.provider.request().await;
        tracing::info!("Notification permission resolved: {:?}", state.current);
        state.current
    }

    /// Explicit user-invoked re-prompt, e.g. a settings toggle.
    pub async fn request_again(&self) -> PermissionState {
        let mut state = self.state.lock().await;
        state.requested = true;
        state.current = self.provider.request().await;
        tracing::info!("Notification permission re-requested: {:?}", state.current);
        state.current
    }
}
