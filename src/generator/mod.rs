//! Notification synthesis.
//!
//! Turns significant prediction movements and product conditions into
//! persisted notification records. One `GenerationPass` covers one worker
//! cycle; its dedup set keeps the same (user, subject, status) alert from
//! repeating within that pass. Passes are independent, so a later cycle may
//! legitimately repeat an alert for a trend that is still moving.

pub mod icons;

pub use icons::icon_for_keyword;

use std::collections::HashSet;
use std::sync::Arc;

use crate::analysis::AnalysisResponse;
use crate::store::notifications::NotificationStore;
use crate::store::schema::{
    NewNotification, NotificationCategory, NotificationStatus, PredictionRecord, ProductRecord,
    UserRecord,
};
use crate::store::StoreError;
use crate::trend::{self, TrendDirection, TrendEvaluation};

/// Products at or below this stock level get an urgent restock notification.
pub const LOW_STOCK_THRESHOLD: i64 = 5;

/// How far back a prediction refresh still counts as news.
pub const PRICE_LOOKBACK_MS: i64 = 24 * 60 * 60 * 1000;

pub struct NotificationGenerator {
    store: Arc<dyn NotificationStore>,
}

impl NotificationGenerator {
    pub fn new(store: Arc<dyn NotificationStore>) -> Self {
        Self { store }
    }

    pub fn begin_pass(&self) -> GenerationPass {
        GenerationPass {
            store: self.store.clone(),
            seen: HashSet::new(),
            created: 0,
        }
    }
}

/// One generation invocation and its dedup scope.
pub struct GenerationPass {
    store: Arc<dyn NotificationStore>,
    seen: HashSet<(String, String, NotificationStatus)>,
    created: u32,
}

impl GenerationPass {
    /// Notifications persisted by this pass so far.
    pub fn created(&self) -> u32 {
        self.created
    }

    /// Price notifications for one prediction, classified by the remote
    /// analysis. The endpoint's recommendation rides along in the message.
    pub async fn emit_price_from_analysis(
        &mut self,
        users: &[UserRecord],
        prediction: &PredictionRecord,
        analysis: &AnalysisResponse,
        now_ms: i64,
    ) -> Result<u32, StoreError> {
        if !within_lookback(prediction, now_ms) {
            return Ok(0);
        }

        let percent = analysis.perubahan.abs();
        if percent < trend::PRICE_SIGNIFICANT_PERCENT {
            return Ok(0);
        }

        self.emit_price(
            users,
            prediction,
            analysis.status,
            percent,
            Some(&analysis.rekomendasi),
        )
        .await
    }

    /// Price notifications synthesized from the timeline alone, for when the
    /// analysis endpoint is unavailable.
    pub async fn emit_price_local(
        &mut self,
        users: &[UserRecord],
        prediction: &PredictionRecord,
        now_ms: i64,
    ) -> Result<u32, StoreError> {
        if !within_lookback(prediction, now_ms) {
            return Ok(0);
        }

        let evaluation = trend::evaluate(&prediction.timeline);
        if !evaluation.is_significant() {
            return Ok(0);
        }

        self.emit_price(
            users,
            prediction,
            evaluation.direction,
            evaluation.percent_change,
            None,
        )
        .await
    }

    async fn emit_price(
        &mut self,
        users: &[UserRecord],
        prediction: &PredictionRecord,
        direction: TrendDirection,
        percent: f64,
        rekomendasi: Option<&str>,
    ) -> Result<u32, StoreError> {
        if direction == TrendDirection::Stabil {
            return Ok(0);
        }

        let status = NotificationStatus::from(direction);
        let (judul, pesan) = price_copy(&prediction.keyword, direction, percent, rekomendasi);
        let target_url = format!(
            "/dashboard/prediksi?keyword={}",
            urlencoding::encode(&prediction.keyword)
        );

        let mut created = 0;
        for user in users {
            if !self.claim(&user.id, &prediction.keyword, status) {
                continue;
            }

            self.store
                .create(NewNotification {
                    user_id: user.id.clone(),
                    judul: judul.clone(),
                    pesan: pesan.clone(),
                    status,
                    kategori: NotificationCategory::Harga,
                    icon: icon_for_keyword(&prediction.keyword).to_string(),
                    target_url: Some(target_url.clone()),
                })
                .await?;
            created += 1;
        }

        self.created += created;
        Ok(created)
    }

    /// Product notifications for one user: low stock, plus category-wide
    /// swings across the whole prediction universe.
    pub async fn emit_product_alerts(
        &mut self,
        user: &UserRecord,
        products: &[ProductRecord],
        predictions: &[PredictionRecord],
    ) -> Result<u32, StoreError> {
        let mut created = 0;

        for product in products {
            if product.stok <= LOW_STOCK_THRESHOLD
                && self.claim(&user.id, &product.nama, NotificationStatus::Penting)
            {
                self.store
                    .create(NewNotification {
                        user_id: user.id.clone(),
                        judul: format!("Stok {} Menipis", title_case(&product.nama)),
                        pesan: format!(
                            "Stok {} tersisa {} {}. Segera lakukan restock sebelum kehabisan.",
                            product.nama, product.stok, product.konsumsi_mingguan.satuan
                        ),
                        status: NotificationStatus::Penting,
                        kategori: NotificationCategory::Produk,
                        icon: icon_for_keyword(&product.nama).to_string(),
                        target_url: Some("/dashboard/produk".to_string()),
                    })
                    .await?;
                created += 1;
            }

            let evaluations: Vec<TrendEvaluation> = predictions
                .iter()
                .filter(|p| p.kategori == product.kategori)
                .map(|p| trend::evaluate(&p.timeline))
                .collect();

            let Some(aggregate) = trend::aggregate(&evaluations) else {
                continue;
            };
            if !aggregate.is_significant() || aggregate.direction == TrendDirection::Stabil {
                continue;
            }

            let status = NotificationStatus::from(aggregate.direction);
            if !self.claim(&user.id, &product.nama, status) {
                continue;
            }

            let magnitude = aggregate.mean_percent.abs();
            let (judul, pesan) = match aggregate.direction {
                TrendDirection::Naik => (
                    format!("Permintaan {} Meningkat", title_case(&product.kategori)),
                    format!(
                        "Tren kategori {} naik {:.1}%. Tambah stok {} untuk mengantisipasi permintaan.",
                        product.kategori, magnitude, product.nama
                    ),
                ),
                _ => (
                    format!("Peluang Promo {}", title_case(&product.nama)),
                    format!(
                        "Tren kategori {} turun {:.1}%. Saat yang tepat membuat promo {} untuk menarik pelanggan.",
                        product.kategori, magnitude, product.nama
                    ),
                ),
            };

            self.store
                .create(NewNotification {
                    user_id: user.id.clone(),
                    judul,
                    pesan,
                    status,
                    kategori: NotificationCategory::Produk,
                    icon: icon_for_keyword(&product.nama).to_string(),
                    target_url: Some("/dashboard/produk".to_string()),
                })
                .await?;
            created += 1;
        }

        self.created += created;
        Ok(created)
    }

    /// True the first time this (user, subject, status) combination shows up
    /// in the pass.
    fn claim(&mut self, user_id: &str, subject: &str, status: NotificationStatus) -> bool {
        self.seen
            .insert((user_id.to_string(), subject.to_lowercase(), status))
    }
}

fn within_lookback(prediction: &PredictionRecord, now_ms: i64) -> bool {
    now_ms - prediction.updated_at <= PRICE_LOOKBACK_MS
}

fn price_copy(
    keyword: &str,
    direction: TrendDirection,
    percent: f64,
    rekomendasi: Option<&str>,
) -> (String, String) {
    let (judul, advice) = match direction {
        TrendDirection::Naik => (
            format!("Harga {} Naik", title_case(keyword)),
            "Pertimbangkan menyesuaikan harga jual.",
        ),
        _ => (
            format!("Harga {} Turun", title_case(keyword)),
            "Saat yang tepat menambah stok selagi murah.",
        ),
    };

    let pesan = format!(
        "Tren {} {} {:.1}% dalam 24 jam terakhir. {}",
        keyword,
        direction.as_str(),
        percent,
        rekomendasi.unwrap_or(advice)
    );

    (judul, pesan)
}

fn title_case(text: &str) -> String {
    text.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::notifications::Subscription;
    use crate::store::schema::{Notification, WeeklyConsumption};
    use crate::trend::TrendPoint;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct RecordingStore {
        created: Mutex<Vec<NewNotification>>,
    }

    impl RecordingStore {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                created: Mutex::new(Vec::new()),
            })
        }

        fn all(&self) -> Vec<NewNotification> {
            self.created.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl NotificationStore for RecordingStore {
        async fn bind_user(&self, _user_id: &str) {}

        async fn bound_user(&self) -> Option<String> {
            None
        }

        async fn create(&self, input: NewNotification) -> Result<String, StoreError> {
            self.created.lock().unwrap().push(input);
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

    const NOW_MS: i64 = 1_756_000_000_000;

    fn user(id: &str) -> UserRecord {
        UserRecord {
            id: id.to_string(),
            nama: None,
            notif_enabled: true,
            frekuensi: "realtime".to_string(),
        }
    }

    fn prediction(keyword: &str, kategori: &str, values: &[f64], updated_at: i64) -> PredictionRecord {
        PredictionRecord {
            keyword: keyword.to_string(),
            kategori: kategori.to_string(),
            timeline: values
                .iter()
                .enumerate()
                .map(|(i, v)| TrendPoint {
                    time: format!("t{}", i),
                    value: *v,
                })
                .collect(),
            updated_at,
        }
    }

    fn product(nama: &str, kategori: &str, stok: i64) -> ProductRecord {
        ProductRecord {
            id: format!("p-{}", nama),
            user_id: "u-1".to_string(),
            nama: nama.to_string(),
            kategori: kategori.to_string(),
            stok,
            konsumsi_mingguan: WeeklyConsumption {
                jumlah: 10.0,
                satuan: "kg".to_string(),
            },
            popularitas: None,
            trend_data: None,
            updated_at: NOW_MS,
        }
    }

    fn analysis(direction: TrendDirection, perubahan: f64) -> AnalysisResponse {
        AnalysisResponse {
            status: direction,
            perubahan,
            analisis: "analisis".to_string(),
            prediksi: "prediksi".to_string(),
            rekomendasi: "Amankan stok dari pemasok langganan.".to_string(),
            faktor: vec![],
        }
    }

    #[tokio::test]
    async fn test_analysis_result_becomes_price_notification() {
        let store = RecordingStore::new();
        let generator = NotificationGenerator::new(store.clone());
        let mut pass = generator.begin_pass();

        let users = vec![user("u-1"), user("u-2")];
        let p = prediction("cabai", "bumbu", &[50.0, 60.0], NOW_MS);
        let created = pass
            .emit_price_from_analysis(&users, &p, &analysis(TrendDirection::Naik, 12.5), NOW_MS)
            .await
            .unwrap();

        assert_eq!(created, 2);
        let all = store.all();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].user_id, "u-1");
        assert_eq!(all[1].user_id, "u-2");
        assert_eq!(all[0].judul, "Harga Cabai Naik");
        assert_eq!(all[0].status, NotificationStatus::Naik);
        assert_eq!(all[0].kategori, NotificationCategory::Harga);
        assert_eq!(all[0].icon, "chili");
        assert!(all[0].pesan.contains("12.5%"));
        assert!(all[0].pesan.contains("Amankan stok"));
        assert_eq!(
            all[0].target_url.as_deref(),
            Some("/dashboard/prediksi?keyword=cabai")
        );
    }

    #[tokio::test]
    async fn test_keyword_with_spaces_is_encoded_in_target_url() {
        let store = RecordingStore::new();
        let generator = NotificationGenerator::new(store.clone());
        let mut pass = generator.begin_pass();

        let p = prediction("bawang merah", "bumbu", &[50.0, 60.0], NOW_MS);
        pass.emit_price_local(&[user("u-1")], &p, NOW_MS)
            .await
            .unwrap();

        let all = store.all();
        assert_eq!(
            all[0].target_url.as_deref(),
            Some("/dashboard/prediksi?keyword=bawang%20merah")
        );
    }

    #[tokio::test]
    async fn test_insignificant_analysis_is_silent() {
        let store = RecordingStore::new();
        let generator = NotificationGenerator::new(store.clone());
        let mut pass = generator.begin_pass();

        let p = prediction("beras", "pokok", &[50.0, 52.0], NOW_MS);
        let created = pass
            .emit_price_from_analysis(
                &[user("u-1")],
                &p,
                &analysis(TrendDirection::Naik, 4.0),
                NOW_MS,
            )
            .await
            .unwrap();

        assert_eq!(created, 0);
        assert!(store.all().is_empty());
    }

    #[tokio::test]
    async fn test_stale_prediction_outside_lookback_is_skipped() {
        let store = RecordingStore::new();
        let generator = NotificationGenerator::new(store.clone());
        let mut pass = generator.begin_pass();

        let stale = NOW_MS - PRICE_LOOKBACK_MS - 1;
        let p = prediction("cabai", "bumbu", &[50.0, 60.0], stale);
        let created = pass
            .emit_price_from_analysis(&[user("u-1")], &p, &analysis(TrendDirection::Naik, 20.0), NOW_MS)
            .await
            .unwrap();

        assert_eq!(created, 0);
    }

    #[tokio::test]
    async fn test_local_fallback_uses_evaluator() {
        let store = RecordingStore::new();
        let generator = NotificationGenerator::new(store.clone());
        let mut pass = generator.begin_pass();

        // 100 -> 89 is an 11% drop, significant.
        let p = prediction("telur", "protein", &[100.0, 89.0], NOW_MS);
        let created = pass
            .emit_price_local(&[user("u-1")], &p, NOW_MS)
            .await
            .unwrap();

        assert_eq!(created, 1);
        let all = store.all();
        assert_eq!(all[0].judul, "Harga Telur Turun");
        assert_eq!(all[0].status, NotificationStatus::Turun);
        assert!(all[0].pesan.contains("11.0%"));
        assert!(all[0].pesan.contains("menambah stok"));
    }

    #[tokio::test]
    async fn test_local_fallback_below_threshold_is_silent() {
        let store = RecordingStore::new();
        let generator = NotificationGenerator::new(store.clone());
        let mut pass = generator.begin_pass();

        // 100 -> 92 is 8%, under the 10% bar.
        let p = prediction("telur", "protein", &[100.0, 92.0], NOW_MS);
        let created = pass
            .emit_price_local(&[user("u-1")], &p, NOW_MS)
            .await
            .unwrap();

        assert_eq!(created, 0);
    }

    #[tokio::test]
    async fn test_zero_previous_value_never_reaches_a_message() {
        let store = RecordingStore::new();
        let generator = NotificationGenerator::new(store.clone());
        let mut pass = generator.begin_pass();

        let p = prediction("gula", "pokok", &[0.0, 10.0], NOW_MS);
        let created = pass
            .emit_price_local(&[user("u-1")], &p, NOW_MS)
            .await
            .unwrap();

        assert_eq!(created, 0);
        assert!(store.all().is_empty());
    }

    #[tokio::test]
    async fn test_dedup_within_one_pass_only() {
        let store = RecordingStore::new();
        let generator = NotificationGenerator::new(store.clone());
        let users = vec![user("u-1")];
        let p = prediction("cabai", "bumbu", &[50.0, 60.0], NOW_MS);

        let mut pass = generator.begin_pass();
        pass.emit_price_local(&users, &p, NOW_MS).await.unwrap();
        let repeat = pass.emit_price_local(&users, &p, NOW_MS).await.unwrap();
        assert_eq!(repeat, 0, "same pass must not repeat the alert");
        assert_eq!(pass.created(), 1);

        // A fresh pass is a fresh scope: the alert may fire again.
        let mut next_pass = generator.begin_pass();
        let again = next_pass.emit_price_local(&users, &p, NOW_MS).await.unwrap();
        assert_eq!(again, 1);
        assert_eq!(store.all().len(), 2);
    }

    #[tokio::test]
    async fn test_low_stock_boundary_at_threshold() {
        let store = RecordingStore::new();
        let generator = NotificationGenerator::new(store.clone());
        let mut pass = generator.begin_pass();

        let products = vec![
            product("beras", "pokok", 5),
            product("telur", "protein", 6),
            product("gula", "pokok", 0),
        ];
        let created = pass
            .emit_product_alerts(&user("u-1"), &products, &[])
            .await
            .unwrap();

        assert_eq!(created, 2);
        let all = store.all();
        assert!(all.iter().all(|n| n.status == NotificationStatus::Penting));
        assert!(all.iter().all(|n| n.kategori == NotificationCategory::Produk));
        assert!(all[0].judul.contains("Beras"));
        assert!(all[0].pesan.contains("tersisa 5 kg"));
        assert!(all[1].judul.contains("Gula"));
    }

    #[tokio::test]
    async fn test_rising_category_suggests_restock() {
        let store = RecordingStore::new();
        let generator = NotificationGenerator::new(store.clone());
        let mut pass = generator.begin_pass();

        let predictions = vec![
            prediction("cabai", "bumbu", &[100.0, 120.0], NOW_MS), // +20%
            prediction("bawang", "bumbu", &[100.0, 116.0], NOW_MS), // +16%
            prediction("beras", "pokok", &[100.0, 100.0], NOW_MS),
        ];
        let products = vec![product("sambal", "bumbu", 50)];

        let created = pass
            .emit_product_alerts(&user("u-1"), &products, &predictions)
            .await
            .unwrap();

        assert_eq!(created, 1);
        let all = store.all();
        assert_eq!(all[0].status, NotificationStatus::Naik);
        assert!(all[0].pesan.contains("naik 18.0%"));
        assert!(all[0].pesan.contains("Tambah stok"));
    }

    #[tokio::test]
    async fn test_falling_category_suggests_promo() {
        let store = RecordingStore::new();
        let generator = NotificationGenerator::new(store.clone());
        let mut pass = generator.begin_pass();

        let predictions = vec![
            prediction("cabai", "bumbu", &[100.0, 80.0], NOW_MS), // -20%
            prediction("bawang", "bumbu", &[100.0, 84.0], NOW_MS), // -16%
        ];
        let products = vec![product("sambal", "bumbu", 50)];

        let created = pass
            .emit_product_alerts(&user("u-1"), &products, &predictions)
            .await
            .unwrap();

        assert_eq!(created, 1);
        let all = store.all();
        assert_eq!(all[0].status, NotificationStatus::Turun);
        assert!(all[0].judul.contains("Promo"));
        assert!(all[0].pesan.contains("turun 18.0%"));
    }

    #[tokio::test]
    async fn test_mixed_category_movement_is_silent() {
        let store = RecordingStore::new();
        let generator = NotificationGenerator::new(store.clone());
        let mut pass = generator.begin_pass();

        // +20 and -20 average to zero.
        let predictions = vec![
            prediction("cabai", "bumbu", &[100.0, 120.0], NOW_MS),
            prediction("bawang", "bumbu", &[100.0, 80.0], NOW_MS),
        ];
        let products = vec![product("sambal", "bumbu", 50)];

        let created = pass
            .emit_product_alerts(&user("u-1"), &products, &predictions)
            .await
            .unwrap();

        assert_eq!(created, 0);
    }

    #[test]
    fn test_title_case() {
        assert_eq!(title_case("cabai merah"), "Cabai Merah");
        assert_eq!(title_case("beras"), "Beras");
        assert_eq!(title_case(""), "");
    }
}
