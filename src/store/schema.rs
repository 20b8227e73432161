//! Domain types shared by the store, cache, generator, and worker.
//!
//! Field names keep the dashboard's Indonesian vocabulary and serialize with
//! camelCase so records match what the web dashboard reads and writes.

use serde::{Deserialize, Serialize};

use crate::trend::{TrendDirection, TrendPoint};

/// Trend classification carried on a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum NotificationStatus {
    Naik,
    Turun,
    Stabil,
    Penting,
}

impl NotificationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationStatus::Naik => "naik",
            NotificationStatus::Turun => "turun",
            NotificationStatus::Stabil => "stabil",
            NotificationStatus::Penting => "penting",
        }
    }
}

impl From<TrendDirection> for NotificationStatus {
    fn from(direction: TrendDirection) -> Self {
        match direction {
            TrendDirection::Naik => NotificationStatus::Naik,
            TrendDirection::Turun => NotificationStatus::Turun,
            TrendDirection::Stabil => NotificationStatus::Stabil,
        }
    }
}

/// Subject area of a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum NotificationCategory {
    Harga,
    Produk,
    Sistem,
    Lainnya,
}

impl NotificationCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationCategory::Harga => "harga",
            NotificationCategory::Produk => "produk",
            NotificationCategory::Sistem => "sistem",
            NotificationCategory::Lainnya => "lainnya",
        }
    }
}

/// A stored notification. `dibaca` is the only mutable field; everything else
/// is fixed at creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: String,
    pub user_id: String,
    pub judul: String,
    pub pesan: String,
    pub status: NotificationStatus,
    pub kategori: NotificationCategory,
    pub icon: String,
    pub dibaca: bool,
    /// Creation time in unix epoch milliseconds, assigned by the store.
    pub waktu: i64,
    pub target_url: Option<String>,
}

/// Input for creating a notification. The store assigns `id`, `waktu`, and
/// the initial unread state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewNotification {
    pub user_id: String,
    pub judul: String,
    pub pesan: String,
    pub status: NotificationStatus,
    pub kategori: NotificationCategory,
    pub icon: String,
    pub target_url: Option<String>,
}

/// A commodity keyword's interest-over-time series as ingested from the
/// dashboard's prediction pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictionRecord {
    pub keyword: String,
    pub kategori: String,
    pub timeline: Vec<TrendPoint>,
    /// Last refresh in unix epoch milliseconds.
    pub updated_at: i64,
}

/// Weekly consumption a user entered for a tracked product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeeklyConsumption {
    pub jumlah: f64,
    pub satuan: String,
}

/// A product a user tracks on the dashboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductRecord {
    pub id: String,
    pub user_id: String,
    pub nama: String,
    pub kategori: String,
    pub stok: i64,
    pub konsumsi_mingguan: WeeklyConsumption,
    pub popularitas: Option<f64>,
    pub trend_data: Option<Vec<TrendPoint>>,
    pub updated_at: i64,
}

/// Dashboard user row as read for worker eligibility.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    pub id: String,
    pub nama: Option<String>,
    pub notif_enabled: bool,
    /// Notification frequency preference owned by the dashboard settings page.
    pub frekuensi: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notification_serializes_camel_case() {
        let notification = Notification {
            id: "n-1".to_string(),
            user_id: "u-1".to_string(),
            judul: "Harga Cabai Naik".to_string(),
            pesan: "Tren cabai naik 12.5% dalam 24 jam terakhir.".to_string(),
            status: NotificationStatus::Naik,
            kategori: NotificationCategory::Harga,
            icon: "chili".to_string(),
            dibaca: false,
            waktu: 1_756_000_000_000,
            target_url: Some("/dashboard/prediksi?keyword=cabai".to_string()),
        };

        let json = serde_json::to_value(&notification).unwrap();
        assert_eq!(json["userId"], "u-1");
        assert_eq!(json["targetUrl"], "/dashboard/prediksi?keyword=cabai");
        assert_eq!(json["status"], "naik");
        assert_eq!(json["kategori"], "harga");
        assert_eq!(json["dibaca"], false);
    }

    #[test]
    fn test_status_penting_round_trips() {
        let json = serde_json::to_string(&NotificationStatus::Penting).unwrap();
        assert_eq!(json, "\"penting\"");
        let parsed: NotificationStatus = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, NotificationStatus::Penting);
    }

    #[test]
    fn test_status_from_direction() {
        assert_eq!(
            NotificationStatus::from(TrendDirection::Naik),
            NotificationStatus::Naik
        );
        assert_eq!(
            NotificationStatus::from(TrendDirection::Turun),
            NotificationStatus::Turun
        );
        assert_eq!(
            NotificationStatus::from(TrendDirection::Stabil),
            NotificationStatus::Stabil
        );
    }

    #[test]
    fn test_product_record_wire_shape() {
        let product = ProductRecord {
            id: "p-1".to_string(),
            user_id: "u-1".to_string(),
            nama: "Ayam Geprek".to_string(),
            kategori: "protein".to_string(),
            stok: 4,
            konsumsi_mingguan: WeeklyConsumption {
                jumlah: 10.0,
                satuan: "kg".to_string(),
            },
            popularitas: Some(87.0),
            trend_data: None,
            updated_at: 1_756_000_000_000,
        };

        let json = serde_json::to_value(&product).unwrap();
        assert_eq!(json["konsumsiMingguan"]["jumlah"], 10.0);
        assert_eq!(json["konsumsiMingguan"]["satuan"], "kg");
        assert_eq!(json["userId"], "u-1");
    }

    #[test]
    fn test_prediction_record_parses_dashboard_json() {
        let json = r#"{
            "keyword": "bawang merah",
            "kategori": "bumbu",
            "timeline": [
                {"time": "2026-08-24", "value": 55.0},
                {"time": "2026-08-25", "value": 62.0}
            ],
            "updatedAt": 1756000000000
        }"#;

        let record: PredictionRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.keyword, "bawang merah");
        assert_eq!(record.timeline.len(), 2);
        assert_eq!(record.updated_at, 1_756_000_000_000);
    }
}
