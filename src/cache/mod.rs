//! Session-scoped notification cache.
//!
//! `NotificationCenter` mirrors the bound user's notifications from the
//! store and keeps the UI-facing surfaces (list, counts, badge, alerts)
//! consistent with it. Mutations apply optimistically: the in-memory state
//! changes first, the store call follows, and a failure reverts exactly the
//! records the mutation touched. An authoritative snapshot always wins over
//! both the optimistic state and any pending revert.

pub mod filter;

pub use filter::{ActiveView, NotificationFilter};

use std::collections::HashSet;
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;

use crate::notify::{AlertRouter, BadgeSink, Toast, ToastSink};
use crate::store::notifications::{NotificationStore, Snapshot};
use crate::store::schema::Notification;
use crate::store::StoreError;

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NotificationCounts {
    pub total: usize,
    pub unread: usize,
}

struct CacheState {
    items: Vec<Notification>,
    /// Mutation sequence of the newest applied snapshot.
    last_seq: u64,
    /// False until the first snapshot lands; the priming snapshot never
    /// produces arrival alerts.
    primed: bool,
}

/// What a failed mutation needs to undo.
enum Revert {
    Replace(Notification),
    ReplaceAll(Vec<Notification>),
    Insert { pos: usize, item: Notification },
}

struct MutationTicket {
    /// `last_seq` at the moment the optimistic state was applied. If a
    /// snapshot has bumped it since, the revert is obsolete.
    seq: u64,
    revert: Revert,
}

pub struct NotificationCenter {
    store: Arc<dyn NotificationStore>,
    toasts: Arc<dyn ToastSink>,
    badge: Arc<dyn BadgeSink>,
    alerts: Option<Arc<AlertRouter>>,
    state: RwLock<CacheState>,
    feed_task: Mutex<Option<JoinHandle<()>>>,
}

impl NotificationCenter {
    pub fn new(
        store: Arc<dyn NotificationStore>,
        toasts: Arc<dyn ToastSink>,
        badge: Arc<dyn BadgeSink>,
    ) -> Self {
        Self {
            store,
            toasts,
            badge,
            alerts: None,
            state: RwLock::new(CacheState {
                items: Vec::new(),
                last_seq: 0,
                primed: false,
            }),
            feed_task: Mutex::new(None),
        }
    }

    /// Route fresh arrivals through an alert router as snapshots land.
    pub fn with_alerts(mut self, alerts: Arc<AlertRouter>) -> Self {
        self.alerts = Some(alerts);
        self
    }

    /// Subscribe to the store and start mirroring snapshots. Replaces any
    /// previous subscription.
    pub async fn attach(self: &Arc<Self>) {
        let mut subscription = self.store.subscribe().await;
        let center = Arc::clone(self);

        let task = tokio::spawn(async move {
            while let Some(snapshot) = subscription.recv().await {
                center.apply_snapshot(snapshot).await;
            }
            tracing::debug!("Notification snapshot feed ended");
        });

        let mut feed = self.feed_task.lock().await;
        if let Some(previous) = feed.replace(task) {
            previous.abort();
        }
    }

    /// Stop mirroring and clear the badge. Safe to call repeatedly and
    /// without an active subscription.
    pub async fn shutdown(&self) {
        let mut feed = self.feed_task.lock().await;
        if let Some(task) = feed.take() {
            task.abort();
        }
        drop(feed);

        self.badge.set_count(0);
    }

    /// Apply an authoritative snapshot wholesale. Snapshots older than the
    /// newest applied one are discarded, never merged.
    pub async fn apply_snapshot(&self, snapshot: Snapshot) {
        let fresh: Vec<Notification> = {
            let mut state = self.state.write().await;

            if state.primed && snapshot.seq < state.last_seq {
                tracing::debug!(
                    "Discarding stale snapshot (seq {} < {})",
                    snapshot.seq,
                    state.last_seq
                );
                return;
            }

            let fresh = if state.primed {
                let known: HashSet<&str> = state.items.iter().map(|n| n.id.as_str()).collect();
                snapshot
                    .items
                    .iter()
                    .filter(|n| !known.contains(n.id.as_str()))
                    .cloned()
                    .collect()
            } else {
                Vec::new()
            };

            state.items = snapshot.items;
            state.last_seq = snapshot.seq;
            state.primed = true;
            fresh
        };

        self.refresh_badge().await;

        if let Some(alerts) = &self.alerts {
            for notification in &fresh {
                alerts.deliver(notification).await;
            }
        }
    }

    /// The cached list narrowed by `filter`, in store order.
    pub async fn visible(&self, filter: &NotificationFilter) -> Vec<Notification> {
        let state = self.state.read().await;
        filter.apply(&state.items)
    }

    pub async fn counts(&self) -> NotificationCounts {
        let state = self.state.read().await;
        NotificationCounts {
            total: state.items.len(),
            unread: state.items.iter().filter(|n| !n.dibaca).count(),
        }
    }

    pub async fn mark_as_read(&self, id: &str) -> Result<(), CacheError> {
        let ticket = {
            let mut state = self.state.write().await;
            let Some(pos) = state.items.iter().position(|n| n.id == id) else {
                tracing::debug!("mark_as_read for unknown id {}", id);
                return Ok(());
            };
            if state.items[pos].dibaca {
                return Ok(());
            }

            let previous = state.items[pos].clone();
            state.items[pos].dibaca = true;
            MutationTicket {
                seq: state.last_seq,
                revert: Revert::Replace(previous),
            }
        };
        self.refresh_badge().await;

        if let Err(e) = self.store.mark_as_read(id).await {
            tracing::error!("mark_as_read failed for {}: {}", id, e);
            self.rollback(ticket).await;
            self.toasts.push(Toast::error(
                "Gagal",
                "Gagal menandai notifikasi sebagai dibaca",
            ));
            return Err(e.into());
        }

        Ok(())
    }

    /// Optimistically mark everything read, then confirm with the store.
    /// Returns how many rows the store reported changed.
    pub async fn mark_all_as_read(&self) -> Result<u64, CacheError> {
        let ticket = {
            let mut state = self.state.write().await;
            let previous = state.items.clone();
            for item in state.items.iter_mut() {
                item.dibaca = true;
            }
            MutationTicket {
                seq: state.last_seq,
                revert: Revert::ReplaceAll(previous),
            }
        };
        self.refresh_badge().await;

        match self.store.mark_all_as_read().await {
            Ok(changed) => Ok(changed),
            Err(e) => {
                tracing::error!("mark_all_as_read failed: {}", e);
                self.rollback(ticket).await;
                self.toasts.push(Toast::error(
                    "Gagal",
                    "Gagal menandai semua notifikasi sebagai dibaca",
                ));
                Err(e.into())
            }
        }
    }

    pub async fn delete(&self, id: &str) -> Result<(), CacheError> {
        let ticket = {
            let mut state = self.state.write().await;
            let Some(pos) = state.items.iter().position(|n| n.id == id) else {
                tracing::debug!("delete for unknown id {}", id);
                return Ok(());
            };

            let item = state.items.remove(pos);
            MutationTicket {
                seq: state.last_seq,
                revert: Revert::Insert { pos, item },
            }
        };
        self.refresh_badge().await;

        if let Err(e) = self.store.delete(id).await {
            tracing::error!("delete failed for {}: {}", id, e);
            self.rollback(ticket).await;
            self.toasts
                .push(Toast::error("Gagal", "Gagal menghapus notifikasi"));
            return Err(e.into());
        }

        Ok(())
    }

    async fn rollback(&self, ticket: MutationTicket) {
        {
            let mut state = self.state.write().await;

            // A snapshot that landed after the optimistic apply already
            // superseded whatever this mutation touched.
            if state.last_seq != ticket.seq {
                tracing::debug!("Skipping rollback, authoritative snapshot superseded it");
                return;
            }

            match ticket.revert {
                Revert::Replace(item) => {
                    if let Some(pos) = state.items.iter().position(|n| n.id == item.id) {
                        state.items[pos] = item;
                    }
                }
                Revert::ReplaceAll(items) => state.items = items,
                Revert::Insert { pos, item } => {
                    let pos = pos.min(state.items.len());
                    state.items.insert(pos, item);
                }
            }
        }
        self.refresh_badge().await;
    }

    async fn refresh_badge(&self) {
        let unread = {
            let state = self.state.read().await;
            state.items.iter().filter(|n| !n.dibaca).count()
        };
        self.badge.set_count(unread as u32);
    }
}
