//! Background notification worker.
//!
//! Each cycle loads the eligible users and the freshest prediction batch,
//! runs every prediction through the analysis endpoint (sequentially, with
//! pacing between calls and backoff on 429s), and hands the results to the
//! generator. A prediction whose analysis ultimately fails still gets a
//! locally evaluated notification, so a cycle never silently drops work.
//!
//! In remote mode the worker calls the dashboard's own generation routes
//! instead and only generates locally when those fail.

mod retry;
pub mod trigger;

pub use retry::RetryPolicy;
pub use trigger::{TriggerClient, TriggerError, TriggerResponse};

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Deserialize;
use thiserror::Error;
use tokio::sync::Mutex;
use tokio::time::sleep;

use crate::analysis::{AnalysisError, AnalysisProvider, AnalysisRequest, AnalysisResponse};
use crate::generator::NotificationGenerator;
use crate::store::catalog::Catalog;
use crate::store::schema::{PredictionRecord, UserRecord};
use crate::store::StoreError;

pub const DEFAULT_INTERVAL_MINUTES: u64 = 15;
pub const DEFAULT_BATCH_SIZE: i64 = 20;
pub const DEFAULT_PACING_MS: u64 = 1000;

#[derive(Error, Debug)]
pub enum WorkerError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

/// Whether generation happens in this process or on the dashboard's server
/// routes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkerMode {
    Local,
    Remote,
}

#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub interval_minutes: u64,
    /// Predictions analyzed per cycle, newest first.
    pub batch_size: i64,
    /// Pause between consecutive analysis calls.
    pub pacing: Duration,
    pub retry: RetryPolicy,
    pub mode: WorkerMode,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            interval_minutes: DEFAULT_INTERVAL_MINUTES,
            batch_size: DEFAULT_BATCH_SIZE,
            pacing: Duration::from_millis(DEFAULT_PACING_MS),
            retry: RetryPolicy::default(),
            mode: WorkerMode::Local,
        }
    }
}

/// Counters from one worker cycle, for the logs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleSummary {
    pub users: usize,
    pub analyzed: usize,
    pub fallbacks: usize,
    pub created: u32,
    pub duration_ms: u64,
    pub remote: bool,
}

pub struct WorkerScheduler {
    catalog: Arc<Catalog>,
    generator: Arc<NotificationGenerator>,
    analysis: Arc<dyn AnalysisProvider>,
    trigger: Option<Arc<TriggerClient>>,
    config: WorkerConfig,
    is_running: Arc<Mutex<bool>>,
    cancelled: Arc<AtomicBool>,
}

impl WorkerScheduler {
    pub fn new(
        catalog: Arc<Catalog>,
        generator: Arc<NotificationGenerator>,
        analysis: Arc<dyn AnalysisProvider>,
        config: WorkerConfig,
    ) -> Self {
        Self {
            catalog,
            generator,
            analysis,
            trigger: None,
            config,
            is_running: Arc::new(Mutex::new(false)),
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn with_trigger(mut self, trigger: Arc<TriggerClient>) -> Self {
        self.trigger = Some(trigger);
        self
    }

    pub async fn is_running(&self) -> bool {
        *self.is_running.lock().await
    }

    /// Starts the periodic cycle loop. Calling this while the worker is
    /// already running is a no-op.
    pub async fn start(self: &Arc<Self>) {
        {
            let mut is_running = self.is_running.lock().await;
            if *is_running {
                tracing::warn!("Notification worker already running");
                return;
            }
            *is_running = true;
        }
        self.cancelled.store(false, Ordering::SeqCst);

        // A zero interval would spin the loop.
        let interval = Duration::from_secs(self.config.interval_minutes.max(1) * 60);
        let worker = Arc::clone(self);
        tokio::spawn(async move {
            tracing::info!(
                "Notification worker started, interval {}m",
                worker.config.interval_minutes
            );
            loop {
                {
                    let is_running = worker.is_running.lock().await;
                    if !*is_running {
                        break;
                    }
                }

                match worker.run_cycle().await {
                    Ok(summary) => tracing::info!(
                        "Cycle finished: {} users, {} analyzed, {} fallbacks, {} created in {}ms",
                        summary.users,
                        summary.analyzed,
                        summary.fallbacks,
                        summary.created,
                        summary.duration_ms
                    ),
                    Err(e) => tracing::error!("Notification cycle failed: {}", e),
                }

                sleep(interval).await;
            }
            tracing::info!("Notification worker stopped");
        });
    }

    /// Stops the loop and cancels any in-flight backoff sleep.
    pub async fn stop(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
        let mut is_running = self.is_running.lock().await;
        *is_running = false;
    }

    /// Runs one full generation cycle and returns its counters.
    pub async fn run_cycle(&self) -> Result<CycleSummary, WorkerError> {
        let start = Instant::now();
        tracing::info!("Starting notification cycle");

        let users = self.catalog.eligible_users().await?;
        if users.is_empty() {
            tracing::info!("No eligible users, skipping cycle");
            return Ok(CycleSummary::default());
        }

        let recent = self.catalog.recent_predictions(self.config.batch_size).await?;

        if self.config.mode == WorkerMode::Remote {
            if let Some(summary) = self.try_remote_cycle(&users, &recent, start).await {
                return Ok(summary);
            }
            tracing::warn!("Remote trigger unavailable, generating locally");
        }

        self.run_local_cycle(&users, &recent, start).await
    }

    async fn run_local_cycle(
        &self,
        users: &[UserRecord],
        recent: &[PredictionRecord],
        start: Instant,
    ) -> Result<CycleSummary, WorkerError> {
        let mut summary = CycleSummary {
            users: users.len(),
            ..Default::default()
        };
        let mut pass = self.generator.begin_pass();
        let now_ms = chrono::Utc::now().timestamp_millis();

        for (i, prediction) in recent.iter().enumerate() {
            if i > 0 {
                sleep(self.config.pacing).await;
            }
            if self.cancelled.load(Ordering::SeqCst) {
                tracing::info!("Cycle cancelled mid-batch");
                break;
            }

            match self.analyze_with_retry(prediction).await {
                Ok(analysis) => {
                    summary.analyzed += 1;
                    pass.emit_price_from_analysis(users, prediction, &analysis, now_ms)
                        .await?;
                }
                Err(AnalysisError::Cancelled) => {
                    tracing::info!("Analysis cancelled, stopping batch");
                    break;
                }
                Err(e) => {
                    tracing::warn!(
                        "Analysis failed for '{}', evaluating locally: {}",
                        prediction.keyword,
                        e
                    );
                    summary.fallbacks += 1;
                    pass.emit_price_local(users, prediction, now_ms).await?;
                }
            }
        }

        // Product alerts compare against the full prediction universe, not
        // just the batch that was analyzed this cycle.
        let all_predictions = self.catalog.all_predictions().await?;
        for user in users {
            let products = self.catalog.products_for_user(&user.id).await?;
            pass.emit_product_alerts(user, &products, &all_predictions)
                .await?;
        }

        summary.created = pass.created();
        summary.duration_ms = start.elapsed().as_millis() as u64;
        Ok(summary)
    }

    /// Defers the cycle to the dashboard's generation routes. Returns `None`
    /// when nothing was handled remotely and the local path should run; once
    /// the user route has succeeded the cycle stays remote even if the batch
    /// route fails, so a prediction is never generated twice in one tick.
    async fn try_remote_cycle(
        &self,
        users: &[UserRecord],
        recent: &[PredictionRecord],
        start: Instant,
    ) -> Option<CycleSummary> {
        let trigger = self.trigger.as_ref()?;
        let user_ids: Vec<String> = users.iter().map(|u| u.id.clone()).collect();

        let auto = match trigger.run_auto_notification(&user_ids).await {
            Ok(response) if response.success => response,
            Ok(response) => {
                tracing::warn!(
                    "auto-notification reported failure: {}",
                    response.error.as_deref().unwrap_or("unknown")
                );
                return None;
            }
            Err(e) => {
                tracing::warn!("auto-notification call failed: {}", e);
                return None;
            }
        };

        let mut handled = auto.handled_count();
        match trigger.run_worker_batch(recent).await {
            Ok(response) if response.success => handled += response.handled_count(),
            Ok(response) => tracing::warn!(
                "notification-worker reported failure: {}",
                response.error.as_deref().unwrap_or("unknown")
            ),
            Err(e) => tracing::warn!("notification-worker call failed: {}", e),
        }

        Some(CycleSummary {
            users: users.len(),
            analyzed: recent.len(),
            fallbacks: 0,
            created: handled as u32,
            duration_ms: start.elapsed().as_millis() as u64,
            remote: true,
        })
    }

    async fn analyze_with_retry(
        &self,
        prediction: &PredictionRecord,
    ) -> Result<AnalysisResponse, AnalysisError> {
        let request = AnalysisRequest {
            keyword: prediction.keyword.clone(),
            timeline: prediction.timeline.clone(),
            kategori: prediction.kategori.clone(),
            konsumsi_mingguan: None,
        };

        let mut retries = 0;
        loop {
            match self.analysis.analyze(&request).await {
                Ok(response) => return Ok(response),
                Err(e) if e.is_retryable() && self.config.retry.allows(retries) => {
                    retries += 1;
                    let delay = self.config.retry.delay_for(retries);
                    tracing::warn!(
                        "Rate limited on '{}', retry {}/{} after {:?}",
                        prediction.keyword,
                        retries,
                        self.config.retry.max_retries,
                        delay
                    );
                    sleep(delay).await;
                    if self.cancelled.load(Ordering::SeqCst) {
                        return Err(AnalysisError::Cancelled);
                    }
                }
                Err(e) => return Err(e),
            }
        }
    }
}
