//! Native desktop notifications.

use crate::store::schema::Notification;

/// Payload for one system notification.
#[derive(Debug, Clone, PartialEq)]
pub struct SystemAlert {
    pub judul: String,
    pub pesan: String,
    pub icon: String,
    /// Dashboard route to open when the user clicks through.
    pub target_url: Option<String>,
}

impl From<&Notification> for SystemAlert {
    fn from(notification: &Notification) -> Self {
        Self {
            judul: notification.judul.clone(),
            pesan: notification.pesan.clone(),
            icon: notification.icon.clone(),
            target_url: notification.target_url.clone(),
        }
    }
}

/// Fire-and-forget system notification port.
pub trait SystemNotifier: Send + Sync {
    fn show(&self, alert: &SystemAlert);
}

/// notify-rust backed notifier. Showing happens on a blocking task so a
/// slow notification daemon never stalls the pipeline.
pub struct DesktopNotifier {
    app_name: String,
    base_url: String,
}

impl DesktopNotifier {
    pub fn new(app_name: &str, base_url: &str) -> Self {
        Self {
            app_name: app_name.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn click_url(&self, alert: &SystemAlert) -> Option<String> {
        alert
            .target_url
            .as_ref()
            .map(|path| format!("{}{}", self.base_url, path))
    }
}

impl SystemNotifier for DesktopNotifier {
    fn show(&self, alert: &SystemAlert) {
        let summary = alert.judul.clone();
        let body = alert.pesan.clone();
        let app_name = self.app_name.clone();
        let click_url = self.click_url(alert);

        tokio::task::spawn_blocking(move || {
            let mut notification = notify_rust::Notification::new();
            notification
                .summary(&summary)
                .body(&body)
                .appname(&app_name);

            // Click actions only exist on XDG platforms; elsewhere the
            // notification is display-only.
            #[cfg(all(unix, not(target_os = "macos")))]
            {
                if click_url.is_some() {
                    notification.action("default", "Buka dashboard");
                }
                match notification.show() {
                    Ok(handle) => handle.wait_for_action(|action| {
                        if action == "default" {
                            if let Some(url) = click_url {
                                if let Err(e) = open::that(&url) {
                                    tracing::warn!("Failed to open {}: {}", url, e);
                                }
                            }
                        }
                    }),
                    Err(e) => tracing::warn!("Failed to show system notification: {}", e),
                }
            }

            #[cfg(any(not(unix), target_os = "macos"))]
            {
                let _ = click_url;
                if let Err(e) = notification.show() {
                    tracing::warn!("Failed to show system notification: {}", e);
                }
            }
        });
    }
}
