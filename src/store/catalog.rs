//! Read access to the catalog the dashboard maintains: commodity predictions,
//! tracked products, and user rows. The upserts are the ingestion boundary
//! the dashboard's own jobs write through; the worker only reads.

use std::sync::Arc;

use super::schema::{PredictionRecord, ProductRecord, UserRecord, WeeklyConsumption};
use super::{Database, StoreError};
use crate::trend::TrendPoint;

type PredictionRow = (String, String, String, i64);
type ProductRow = (
    String,
    String,
    String,
    String,
    i64,
    f64,
    String,
    Option<f64>,
    Option<String>,
    i64,
);

pub struct Catalog {
    db: Arc<Database>,
}

impl Catalog {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// The most recently refreshed predictions, newest first.
    pub async fn recent_predictions(&self, limit: i64) -> Result<Vec<PredictionRecord>, StoreError> {
        let rows: Vec<PredictionRow> = sqlx::query_as(
            "SELECT keyword, kategori, timeline, updated_at
             FROM predictions ORDER BY updated_at DESC LIMIT ?",
        )
        .bind(limit)
        .fetch_all(self.db.pool())
        .await?;

        rows.into_iter().map(prediction_from_row).collect()
    }

    /// Every prediction currently known, used for category aggregates.
    pub async fn all_predictions(&self) -> Result<Vec<PredictionRecord>, StoreError> {
        let rows: Vec<PredictionRow> = sqlx::query_as(
            "SELECT keyword, kategori, timeline, updated_at
             FROM predictions ORDER BY updated_at DESC",
        )
        .fetch_all(self.db.pool())
        .await?;

        rows.into_iter().map(prediction_from_row).collect()
    }

    pub async fn products_for_user(&self, user_id: &str) -> Result<Vec<ProductRecord>, StoreError> {
        let rows: Vec<ProductRow> = sqlx::query_as(
            "SELECT id, user_id, nama, kategori, stok, konsumsi_jumlah, konsumsi_satuan,
                    popularitas, trend_data, updated_at
             FROM products WHERE user_id = ? ORDER BY nama",
        )
        .bind(user_id)
        .fetch_all(self.db.pool())
        .await?;

        rows.into_iter().map(product_from_row).collect()
    }

    /// Users the worker may notify. The frequency preference itself belongs
    /// to the dashboard settings page; here it only gates eligibility.
    pub async fn eligible_users(&self) -> Result<Vec<UserRecord>, StoreError> {
        let users: Vec<UserRecord> = sqlx::query_as(
            "SELECT id, nama, notif_enabled, frekuensi
             FROM users WHERE notif_enabled = 1 ORDER BY id",
        )
        .fetch_all(self.db.pool())
        .await?;

        Ok(users)
    }

    pub async fn upsert_prediction(&self, prediction: &PredictionRecord) -> Result<(), StoreError> {
        let timeline = serde_json::to_string(&prediction.timeline)
            .map_err(|e| StoreError::Parse(e.to_string()))?;

        sqlx::query(
            "INSERT INTO predictions (keyword, kategori, timeline, updated_at)
             VALUES (?, ?, ?, ?)
             ON CONFLICT(keyword) DO UPDATE SET
                kategori = excluded.kategori,
                timeline = excluded.timeline,
                updated_at = excluded.updated_at",
        )
        .bind(&prediction.keyword)
        .bind(&prediction.kategori)
        .bind(&timeline)
        .bind(prediction.updated_at)
        .execute(self.db.pool())
        .await?;

        Ok(())
    }

    pub async fn upsert_product(&self, product: &ProductRecord) -> Result<(), StoreError> {
        let trend_data = match &product.trend_data {
            Some(points) => {
                Some(serde_json::to_string(points).map_err(|e| StoreError::Parse(e.to_string()))?)
            }
            None => None,
        };

        sqlx::query(
            "INSERT INTO products (id, user_id, nama, kategori, stok, konsumsi_jumlah,
                                   konsumsi_satuan, popularitas, trend_data, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                nama = excluded.nama,
                kategori = excluded.kategori,
                stok = excluded.stok,
                konsumsi_jumlah = excluded.konsumsi_jumlah,
                konsumsi_satuan = excluded.konsumsi_satuan,
                popularitas = excluded.popularitas,
                trend_data = excluded.trend_data,
                updated_at = excluded.updated_at",
        )
        .bind(&product.id)
        .bind(&product.user_id)
        .bind(&product.nama)
        .bind(&product.kategori)
        .bind(product.stok)
        .bind(product.konsumsi_mingguan.jumlah)
        .bind(&product.konsumsi_mingguan.satuan)
        .bind(product.popularitas)
        .bind(&trend_data)
        .bind(product.updated_at)
        .execute(self.db.pool())
        .await?;

        Ok(())
    }

    pub async fn upsert_user(&self, user: &UserRecord) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO users (id, nama, notif_enabled, frekuensi)
             VALUES (?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                nama = excluded.nama,
                notif_enabled = excluded.notif_enabled,
                frekuensi = excluded.frekuensi",
        )
        .bind(&user.id)
        .bind(&user.nama)
        .bind(user.notif_enabled)
        .bind(&user.frekuensi)
        .execute(self.db.pool())
        .await?;

        Ok(())
    }
}

fn prediction_from_row(row: PredictionRow) -> Result<PredictionRecord, StoreError> {
    let timeline: Vec<TrendPoint> = serde_json::from_str(&row.2)
        .map_err(|e| StoreError::Parse(format!("timeline for '{}': {}", row.0, e)))?;

    Ok(PredictionRecord {
        keyword: row.0,
        kategori: row.1,
        timeline,
        updated_at: row.3,
    })
}

fn product_from_row(row: ProductRow) -> Result<ProductRecord, StoreError> {
    let trend_data = match row.8 {
        Some(json) => Some(
            serde_json::from_str(&json)
                .map_err(|e| StoreError::Parse(format!("trend data for '{}': {}", row.2, e)))?,
        ),
        None => None,
    };

    Ok(ProductRecord {
        id: row.0,
        user_id: row.1,
        nama: row.2,
        kategori: row.3,
        stok: row.4,
        konsumsi_mingguan: WeeklyConsumption {
            jumlah: row.5,
            satuan: row.6,
        },
        popularitas: row.7,
        trend_data,
        updated_at: row.9,
    })
}
