use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use umkm_notify::analysis::HttpAnalysisClient;
use umkm_notify::cache::NotificationCenter;
use umkm_notify::config::{Config, StoreBackend};
use umkm_notify::generator::NotificationGenerator;
use umkm_notify::notify::{
    AlertRouter, AlwaysGranted, DesktopNotifier, LogBadgeSink, LogToastSink, PermissionGate,
    VisibilityState,
};
use umkm_notify::store::catalog::Catalog;
use umkm_notify::store::notifications::{
    NoopNotificationStore, NotificationStore, SqliteNotificationStore,
};
use umkm_notify::store::Database;
use umkm_notify::worker::{TriggerClient, WorkerScheduler};

const APP_NAME: &str = "UMKM Predict";

#[derive(Parser, Debug)]
#[command(
    name = "umkm-notify",
    about = "Notification worker for the UMKM Predict dashboard"
)]
struct Args {
    /// Path to a TOML config file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Run a single generation cycle and exit.
    #[arg(long)]
    once: bool,

    /// User whose feed is mirrored into the local notification center.
    #[arg(long)]
    user: Option<String>,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("umkm_notify=info")),
        )
        .init();

    let args = Args::parse();

    let config = match Config::load(args.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    let db = match Database::open(&config.db_path).await {
        Ok(db) => Arc::new(db),
        Err(e) => {
            tracing::error!("Failed to open database at {:?}: {}", config.db_path, e);
            std::process::exit(1);
        }
    };

    let store: Arc<dyn NotificationStore> = match config.store {
        StoreBackend::Sqlite => Arc::new(SqliteNotificationStore::new(db.clone())),
        StoreBackend::Noop => {
            tracing::warn!("No-op notification store selected, nothing will persist");
            Arc::new(NoopNotificationStore)
        }
    };

    if let Some(user_id) = &args.user {
        store.bind_user(user_id).await;
        tracing::info!("Mirroring notification feed for user {}", user_id);
    }

    // Delivery surfaces. The daemon has no window, so visibility stays false
    // and alerts go out as desktop notifications once permission is granted.
    let toasts = Arc::new(LogToastSink);
    let badge = Arc::new(LogBadgeSink);
    let permission = Arc::new(PermissionGate::new(Arc::new(AlwaysGranted)));
    permission.ensure_requested().await;
    let router = Arc::new(AlertRouter::new(
        toasts.clone(),
        Arc::new(DesktopNotifier::new(APP_NAME, &config.dashboard_url)),
        permission,
        Arc::new(VisibilityState::new(false)),
    ));

    let center = Arc::new(NotificationCenter::new(store.clone(), toasts, badge).with_alerts(router));
    center.attach().await;

    let catalog = Arc::new(Catalog::new(db));
    let generator = Arc::new(NotificationGenerator::new(store));
    let analysis = Arc::new(HttpAnalysisClient::new(
        config.analysis_endpoint.clone(),
        config.analysis_token.clone(),
    ));

    let mut scheduler = WorkerScheduler::new(catalog, generator, analysis, config.worker.clone());
    if !config.trigger_token.is_empty() {
        scheduler = scheduler.with_trigger(Arc::new(TriggerClient::new(
            &config.dashboard_url,
            &config.trigger_token,
        )));
    }
    let scheduler = Arc::new(scheduler);

    if args.once {
        let failed = match scheduler.run_cycle().await {
            Ok(summary) => {
                tracing::info!(
                    "Cycle finished: {} users, {} analyzed, {} fallbacks, {} created in {}ms",
                    summary.users,
                    summary.analyzed,
                    summary.fallbacks,
                    summary.created,
                    summary.duration_ms
                );
                false
            }
            Err(e) => {
                tracing::error!("Notification cycle failed: {}", e);
                true
            }
        };
        center.shutdown().await;
        if failed {
            std::process::exit(1);
        }
        return;
    }

    scheduler.start().await;

    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
    tracing::info!("Shutting down");
    scheduler.stop().await;
    center.shutdown().await;
}
