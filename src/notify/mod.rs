//! Alert delivery: in-app toasts, desktop notifications, and the unread
//! badge. The router decides which surfaces a fresh notification reaches;
//! every surface is a port so shells and tests can swap the real thing out.

pub mod badge;
pub mod permission;
pub mod system;

pub use badge::{BadgeSink, LogBadgeSink};
pub use permission::{AlwaysGranted, PermissionGate, PermissionProvider, PermissionState};
pub use system::{DesktopNotifier, SystemAlert, SystemNotifier};

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::store::schema::{Notification, NotificationStatus};

/// Visual weight of a toast.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastVariant {
    Default,
    Destructive,
}

/// Short-lived in-app message.
#[derive(Debug, Clone, PartialEq)]
pub struct Toast {
    pub judul: String,
    pub pesan: String,
    pub variant: ToastVariant,
}

impl Toast {
    pub fn error(judul: &str, pesan: &str) -> Self {
        Self {
            judul: judul.to_string(),
            pesan: pesan.to_string(),
            variant: ToastVariant::Destructive,
        }
    }
}

/// Output port for toasts.
pub trait ToastSink: Send + Sync {
    fn push(&self, toast: Toast);
}

/// Toast sink that only logs, for headless runs.
pub struct LogToastSink;

impl ToastSink for LogToastSink {
    fn push(&self, toast: Toast) {
        tracing::info!("Toast [{:?}] {}: {}", toast.variant, toast.judul, toast.pesan);
    }
}

/// Whether the dashboard is currently in the foreground. The embedding shell
/// flips this; system alerts only go out while hidden.
pub struct VisibilityState {
    visible: AtomicBool,
}

impl VisibilityState {
    pub fn new(visible: bool) -> Self {
        Self {
            visible: AtomicBool::new(visible),
        }
    }

    pub fn set_visible(&self, visible: bool) {
        self.visible.store(visible, Ordering::SeqCst);
    }

    pub fn is_visible(&self) -> bool {
        self.visible.load(Ordering::SeqCst)
    }
}

/// Routes one fresh notification to its delivery surfaces.
pub struct AlertRouter {
    toasts: Arc<dyn ToastSink>,
    system: Arc<dyn SystemNotifier>,
    permission: Arc<PermissionGate>,
    visibility: Arc<VisibilityState>,
}

impl AlertRouter {
    pub fn new(
        toasts: Arc<dyn ToastSink>,
        system: Arc<dyn SystemNotifier>,
        permission: Arc<PermissionGate>,
        visibility: Arc<VisibilityState>,
    ) -> Self {
        Self {
            toasts,
            system,
            permission,
            visibility,
        }
    }

    /// The toast always fires. The system alert fires only when permission
    /// is already granted and the dashboard is hidden; this path never
    /// prompts for permission.
    pub async fn deliver(&self, notification: &Notification) {
        // Rising prices are the alerts that cost money when missed.
        let variant = if notification.status == NotificationStatus::Naik {
            ToastVariant::Destructive
        } else {
            ToastVariant::Default
        };

        self.toasts.push(Toast {
            judul: notification.judul.clone(),
            pesan: notification.pesan.clone(),
            variant,
        });

        if self.visibility.is_visible() {
            return;
        }

        match self.permission.current().await {
            PermissionState::Granted => self.system.show(&SystemAlert::from(notification)),
            state => {
                tracing::debug!("Skipping system alert, permission is {:?}", state);
            }
        }
    }
}
