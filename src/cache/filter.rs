//! Pure filtering over the cached notification list.
//!
//! Filters narrow, never reorder: the store's newest-first order survives
//! every combination, and an empty result is a legitimate outcome.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::store::schema::{Notification, NotificationCategory, NotificationStatus};

/// Tab of the dashboard's notification page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ActiveView {
    #[default]
    Semua,
    BelumDibaca,
    Penting,
}

/// Composable filter. `None` query and empty sets mean "no constraint".
#[derive(Debug, Clone, Default)]
pub struct NotificationFilter {
    pub query: Option<String>,
    pub statuses: HashSet<NotificationStatus>,
    pub categories: HashSet<NotificationCategory>,
    pub view: ActiveView,
}

impl NotificationFilter {
    pub fn matches(&self, notification: &Notification) -> bool {
        match self.view {
            ActiveView::Semua => {}
            ActiveView::BelumDibaca => {
                if notification.dibaca {
                    return false;
                }
            }
            ActiveView::Penting => {
                if notification.status != NotificationStatus::Penting {
                    return false;
                }
            }
        }

        if !self.statuses.is_empty() && !self.statuses.contains(&notification.status) {
            return false;
        }

        if !self.categories.is_empty() && !self.categories.contains(&notification.kategori) {
            return false;
        }

        if let Some(query) = &self.query {
            let needle = query.trim().to_lowercase();
            if !needle.is_empty()
                && !notification.judul.to_lowercase().contains(&needle)
                && !notification.pesan.to_lowercase().contains(&needle)
            {
                return false;
            }
        }

        true
    }

    /// Order-preserving filter pass over a snapshot list.
    pub fn apply(&self, items: &[Notification]) -> Vec<Notification> {
        items.iter().filter(|n| self.matches(n)).cloned().collect()
    }
}
