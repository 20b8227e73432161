use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::store::schema::WeeklyConsumption;
use crate::trend::{TrendDirection, TrendPoint};

/// Errors from the commodity analysis endpoint.
#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Rate limited")]
    RateLimited,
    #[error("API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("Cancelled")]
    Cancelled,
}

impl AnalysisError {
    /// Only rate limiting is worth retrying; everything else is terminal.
    pub fn is_retryable(&self) -> bool {
        matches!(self, AnalysisError::RateLimited)
    }
}

/// Request body for one keyword analysis.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisRequest {
    pub keyword: String,
    pub timeline: Vec<TrendPoint>,
    pub kategori: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub konsumsi_mingguan: Option<WeeklyConsumption>,
}

/// Analysis endpoint response: trend classification plus the narrative
/// fields the dashboard shows verbatim.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResponse {
    pub status: TrendDirection,
    /// Percent change the endpoint computed for the timeline.
    pub perubahan: f64,
    pub analisis: String,
    pub prediksi: String,
    pub rekomendasi: String,
    #[serde(default)]
    pub faktor: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_analysis_error_display() {
        let err = AnalysisError::Api {
            status: 500,
            message: "internal".into(),
        };
        assert_eq!(err.to_string(), "API error (HTTP 500): internal");

        let err = AnalysisError::RateLimited;
        assert_eq!(err.to_string(), "Rate limited");
    }

    #[test]
    fn test_only_rate_limited_is_retryable() {
        assert!(AnalysisError::RateLimited.is_retryable());
        assert!(!AnalysisError::Parse("bad json".into()).is_retryable());
        assert!(!AnalysisError::Api {
            status: 500,
            message: "boom".into()
        }
        .is_retryable());
        assert!(!AnalysisError::Cancelled.is_retryable());
    }

    #[test]
    fn test_request_serializes_camel_case() {
        let request = AnalysisRequest {
            keyword: "cabai".to_string(),
            timeline: vec![TrendPoint {
                time: "2026-08-25".to_string(),
                value: 62.0,
            }],
            kategori: "bumbu".to_string(),
            konsumsi_mingguan: Some(WeeklyConsumption {
                jumlah: 5.0,
                satuan: "kg".to_string(),
            }),
        };

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["konsumsiMingguan"]["jumlah"], 5.0);
        assert_eq!(json["timeline"][0]["value"], 62.0);
    }

    #[test]
    fn test_request_omits_missing_consumption() {
        let request = AnalysisRequest {
            keyword: "beras".to_string(),
            timeline: vec![],
            kategori: "pokok".to_string(),
            konsumsi_mingguan: None,
        };

        let json = serde_json::to_value(&request).unwrap();
        assert!(json.get("konsumsiMingguan").is_none());
    }

    #[test]
    fn test_response_parses_endpoint_json() {
        let json = r#"{
            "status": "naik",
            "perubahan": 12.5,
            "analisis": "Permintaan cabai meningkat menjelang akhir bulan.",
            "prediksi": "Kenaikan berlanjut 3-5 hari ke depan.",
            "rekomendasi": "Amankan stok dari pemasok langganan.",
            "faktor": ["musim hujan", "permintaan hajatan"]
        }"#;

        let response: AnalysisResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.status, TrendDirection::Naik);
        assert!((response.perubahan - 12.5).abs() < 1e-9);
        assert_eq!(response.faktor.len(), 2);
    }

    #[test]
    fn test_response_tolerates_missing_faktor() {
        let json = r#"{
            "status": "stabil",
            "perubahan": 0.0,
            "analisis": "Tidak ada pergerakan berarti.",
            "prediksi": "Harga bertahan.",
            "rekomendasi": "Tidak perlu tindakan."
        }"#;

        let response: AnalysisResponse = serde_json::from_str(json).unwrap();
        assert!(response.faktor.is_empty());
    }
}
