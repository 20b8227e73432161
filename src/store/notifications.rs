//! Notification store adapter.
//!
//! `NotificationStore` is the persistence seam for the whole pipeline: the
//! cache reads through it, the generator writes through it, and subscriptions
//! deliver full snapshots whenever a bound user's notifications change.
//!
//! Read and mutate operations are scoped to a bound user. Calling them before
//! `bind_user` is a caller bug, but deliberately a soft one: the store logs an
//! error and degrades to an empty result instead of failing, matching how the
//! dashboard behaves before login resolves. Genuine database failures always
//! surface as `StoreError`.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{broadcast, mpsc, RwLock};
use tokio::task::JoinHandle;

use super::schema::{NewNotification, Notification};
use super::{Database, StoreError};

const CHANGE_CHANNEL_CAPACITY: usize = 64;
const SNAPSHOT_CHANNEL_CAPACITY: usize = 16;

/// Emitted on the change feed after every committed notification mutation.
#[derive(Debug, Clone)]
pub struct StoreChange {
    pub user_id: String,
    /// Monotonic mutation sequence, used to order snapshots.
    pub seq: u64,
}

/// Full view of a user's notifications at one point in the mutation sequence.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub seq: u64,
    pub items: Vec<Notification>,
}

/// Handle for a live snapshot feed. Dropping it or calling `unsubscribe`
/// stops the feed; both are safe to do more than once.
pub struct Subscription {
    rx: mpsc::Receiver<Snapshot>,
    task: Option<JoinHandle<()>>,
}

impl Subscription {
    /// Next snapshot, or `None` once the feed has ended.
    pub async fn recv(&mut self) -> Option<Snapshot> {
        self.rx.recv().await
    }

    pub fn unsubscribe(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
        self.rx.close();
    }

    /// A feed that never yields anything, for the unbound-user case and
    /// stores that have nothing to watch.
    pub fn inert() -> Self {
        let (tx, rx) = mpsc::channel(1);
        drop(tx);
        Self { rx, task: None }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

#[async_trait]
pub trait NotificationStore: Send + Sync {
    /// Bind all subsequent scoped operations to this user.
    async fn bind_user(&self, user_id: &str);

    async fn bound_user(&self) -> Option<String>;

    /// Persist a notification. The input carries its own user id, so this
    /// works without a binding; the store assigns id, timestamp, and the
    /// initial unread state. Returns the new id.
    async fn create(&self, input: NewNotification) -> Result<String, StoreError>;

    /// All notifications for the bound user, newest first.
    async fn list(&self) -> Result<Vec<Notification>, StoreError>;

    async fn count_unread(&self) -> Result<i64, StoreError>;

    /// Start a snapshot feed for the bound user. The feed yields the current
    /// snapshot immediately and again after every change to the user's rows.
    async fn subscribe(&self) -> Subscription;

    async fn mark_as_read(&self, id: &str) -> Result<(), StoreError>;

    /// Mark every unread notification read. Returns how many rows changed;
    /// running it again is a no-op.
    async fn mark_all_as_read(&self) -> Result<u64, StoreError>;

    async fn delete(&self, id: &str) -> Result<(), StoreError>;
}

pub struct SqliteNotificationStore {
    db: Arc<Database>,
    user_id: Arc<RwLock<Option<String>>>,
    seq: Arc<AtomicU64>,
    changes: broadcast::Sender<StoreChange>,
}

impl SqliteNotificationStore {
    pub fn new(db: Arc<Database>) -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self {
            db,
            user_id: Arc::new(RwLock::new(None)),
            seq: Arc::new(AtomicU64::new(0)),
            changes,
        }
    }

    async fn bound(&self) -> Option<String> {
        self.user_id.read().await.clone()
    }

    fn publish_change(&self, user_id: &str) {
        let seq = self.seq.fetch_add(1, Ordering::SeqCst) + 1;
        // Send only fails when nobody is subscribed, which is fine.
        let _ = self.changes.send(StoreChange {
            user_id: user_id.to_string(),
            seq,
        });
    }
}

/// Shared by `list` and the subscription pump so both see identical ordering:
/// newest first, insertion order breaking same-millisecond ties.
async fn list_for_user(db: &Database, user_id: &str) -> Result<Vec<Notification>, StoreError> {
    let items: Vec<Notification> = sqlx::query_as(
        "SELECT id, user_id, judul, pesan, status, kategori, icon, dibaca, waktu, target_url
         FROM notifications WHERE user_id = ?
         ORDER BY waktu DESC, rowid DESC",
    )
    .bind(user_id)
    .fetch_all(db.pool())
    .await?;

    Ok(items)
}

#[async_trait]
impl NotificationStore for SqliteNotificationStore {
    async fn bind_user(&self, user_id: &str) {
        let mut bound = self.user_id.write().await;
        tracing::info!("Notification store bound to user {}", user_id);
        *bound = Some(user_id.to_string());
    }

    async fn bound_user(&self) -> Option<String> {
        self.bound().await
    }

    async fn create(&self, input: NewNotification) -> Result<String, StoreError> {
        let id = uuid::Uuid::new_v4().to_string();
        let waktu = chrono::Utc::now().timestamp_millis();

        sqlx::query(
            "INSERT INTO notifications (id, user_id, judul, pesan, status, kategori, icon, dibaca, waktu, target_url)
             VALUES (?, ?, ?, ?, ?, ?, ?, 0, ?, ?)",
        )
        .bind(&id)
        .bind(&input.user_id)
        .bind(&input.judul)
        .bind(&input.pesan)
        .bind(input.status)
        .bind(input.kategori)
        .bind(&input.icon)
        .bind(waktu)
        .bind(&input.target_url)
        .execute(self.db.pool())
        .await?;

        tracing::debug!(
            "Created notification {} for user {}: {}",
            id,
            input.user_id,
            input.judul
        );
        self.publish_change(&input.user_id);

        Ok(id)
    }

    async fn list(&self) -> Result<Vec<Notification>, StoreError> {
        let Some(user_id) = self.bound().await else {
            tracing::error!("Notification store has no bound user; list returns empty");
            return Ok(Vec::new());
        };

        list_for_user(&self.db, &user_id).await
    }

    async fn count_unread(&self) -> Result<i64, StoreError> {
        let Some(user_id) = self.bound().await else {
            tracing::error!("Notification store has no bound user; unread count is 0");
            return Ok(0);
        };

        let row: (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM notifications WHERE user_id = ? AND dibaca = 0")
                .bind(&user_id)
                .fetch_one(self.db.pool())
                .await?;

        Ok(row.0)
    }

    async fn subscribe(&self) -> Subscription {
        let Some(user_id) = self.bound().await else {
            tracing::error!("Notification store has no bound user; subscription is inert");
            return Subscription::inert();
        };

        // Subscribe to the change feed before the initial query so no
        // mutation can slip between the two.
        let mut changes = self.changes.subscribe();
        let db = self.db.clone();
        let seq = self.seq.clone();
        let (tx, rx) = mpsc::channel(SNAPSHOT_CHANNEL_CAPACITY);

        let task = tokio::spawn(async move {
            let initial_seq = seq.load(Ordering::SeqCst);
            match list_for_user(&db, &user_id).await {
                Ok(items) => {
                    if tx
                        .send(Snapshot {
                            seq: initial_seq,
                            items,
                        })
                        .await
                        .is_err()
                    {
                        return;
                    }
                }
                Err(e) => tracing::error!("Initial snapshot query failed: {}", e),
            }

            loop {
                let change_seq = match changes.recv().await {
                    Ok(change) if change.user_id == user_id => change.seq,
                    Ok(_) => continue,
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        // Missed events collapse into one fresh re-query.
                        tracing::warn!("Snapshot feed lagged, skipped {} changes", skipped);
                        seq.load(Ordering::SeqCst)
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                };

                match list_for_user(&db, &user_id).await {
                    Ok(items) => {
                        if tx
                            .send(Snapshot {
                                seq: change_seq,
                                items,
                            })
                            .await
                            .is_err()
                        {
                            break;
                        }
                    }
                    Err(e) => tracing::error!("Snapshot query failed: {}", e),
                }
            }
        });

        Subscription {
            rx,
            task: Some(task),
        }
    }

    async fn mark_as_read(&self, id: &str) -> Result<(), StoreError> {
        let Some(user_id) = self.bound().await else {
            tracing::error!("Notification store has no bound user; ignoring mark_as_read");
            return Ok(());
        };

        let result = sqlx::query("UPDATE notifications SET dibaca = 1 WHERE id = ? AND user_id = ?")
            .bind(id)
            .bind(&user_id)
            .execute(self.db.pool())
            .await?;

        if result.rows_affected() > 0 {
            self.publish_change(&user_id);
        }

        Ok(())
    }

    async fn mark_all_as_read(&self) -> Result<u64, StoreError> {
        let Some(user_id) = self.bound().await else {
            tracing::error!("Notification store has no bound user; ignoring mark_all_as_read");
            return Ok(0);
        };

        let result =
            sqlx::query("UPDATE notifications SET dibaca = 1 WHERE user_id = ? AND dibaca = 0")
                .bind(&user_id)
                .execute(self.db.pool())
                .await?;

        let changed = result.rows_affected();
        if changed > 0 {
            self.publish_change(&user_id);
        }

        Ok(changed)
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        let Some(user_id) = self.bound().await else {
            tracing::error!("Notification store has no bound user; ignoring delete");
            return Ok(());
        };

        let result = sqlx::query("DELETE FROM notifications WHERE id = ? AND user_id = ?")
            .bind(id)
            .bind(&user_id)
            .execute(self.db.pool())
            .await?;

        if result.rows_affected() > 0 {
            self.publish_change(&user_id);
        }

        Ok(())
    }
}

/// Store used when the pipeline is composed in a context with no local
/// database, e.g. dry runs on a server. Every operation is a logged no-op.
pub struct NoopNotificationStore;

#[async_trait]
impl NotificationStore for NoopNotificationStore {
    async fn bind_user(&self, user_id: &str) {
        tracing::debug!("No-op store: bind_user({})", user_id);
    }

    async fn bound_user(&self) -> Option<String> {
        None
    }

    async fn create(&self, input: NewNotification) -> Result<String, StoreError> {
        tracing::debug!(
            "No-op store: dropping notification for {}: {}",
            input.user_id,
            input.judul
        );
        Ok(uuid::Uuid::new_v4().to_string())
    }

    async fn list(&self) -> Result<Vec<Notification>, StoreError> {
        Ok(Vec::new())
    }

    async fn count_unread(&self) -> Result<i64, StoreError> {
        Ok(0)
    }

    async fn subscribe(&self) -> Subscription {
        Subscription::inert()
    }

    async fn mark_as_read(&self, _id: &str) -> Result<(), StoreError> {
        Ok(())
    }

    async fn mark_all_as_read(&self) -> Result<u64, StoreError> {
        Ok(0)
    }

    async fn delete(&self, _id: &str) -> Result<(), StoreError> {
        Ok(())
    }
}
