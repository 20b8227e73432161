//! Clients for the dashboard's server-side generation routes.
//!
//! The hosted dashboard exposes `/api/auto-notification` (generation for a
//! set of users) and `/api/notification-worker` (analysis of a prediction
//! batch). In remote mode the scheduler calls these instead of generating
//! locally, and falls back to the local path when they fail.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::store::schema::PredictionRecord;

#[derive(Error, Debug)]
pub enum TriggerError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Trigger endpoint error ({status}): {message}")]
    Api { status: u16, message: String },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AutoNotificationRequest<'a> {
    users: &'a [String],
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WorkerBatchRequest<'a> {
    predictions: &'a [PredictionRecord],
}

/// Response envelope shared by both trigger routes. `notifikasi` comes back
/// from the worker route, `processedUsers` from the auto-notification route.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TriggerResponse {
    pub success: bool,
    #[serde(default)]
    pub notifikasi: Option<Vec<serde_json::Value>>,
    #[serde(default)]
    pub processed_users: Option<Vec<String>>,
    #[serde(default)]
    pub error: Option<String>,
}

impl TriggerResponse {
    /// How many items the remote side reports having handled.
    pub fn handled_count(&self) -> usize {
        self.notifikasi
            .as_ref()
            .map(|n| n.len())
            .or_else(|| self.processed_users.as_ref().map(|u| u.len()))
            .unwrap_or(0)
    }
}

pub struct TriggerClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
}

impl TriggerClient {
    pub fn new(base_url: &str, token: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        }
    }

    pub async fn run_auto_notification(
        &self,
        user_ids: &[String],
    ) -> Result<TriggerResponse, TriggerError> {
        self.post(
            "/api/auto-notification",
            &AutoNotificationRequest { users: user_ids },
        )
        .await
    }

    pub async fn run_worker_batch(
        &self,
        predictions: &[PredictionRecord],
    ) -> Result<TriggerResponse, TriggerError> {
        self.post("/api/notification-worker", &WorkerBatchRequest { predictions })
            .await
    }

    async fn post<T: Serialize>(
        &self,
        path: &str,
        body: &T,
    ) -> Result<TriggerResponse, TriggerError> {
        let url = format!("{}{}", self.base_url, path);
        tracing::debug!("Calling trigger endpoint {}", url);

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.token)
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            tracing::error!("Trigger endpoint {} returned {}: {}", url, status, message);
            return Err(TriggerError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(response.json().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_trims_trailing_slash() {
        let client = TriggerClient::new("https://umkm.example.com/", "tok");
        assert_eq!(client.base_url, "https://umkm.example.com");
    }

    #[test]
    fn test_worker_response_counts_notifications() {
        let json = r#"{
            "success": true,
            "notifikasi": [
                {"judul": "Harga Beras Naik"},
                {"judul": "Harga Cabai Turun"}
            ]
        }"#;
        let response: TriggerResponse = serde_json::from_str(json).unwrap();
        assert!(response.success);
        assert_eq!(response.handled_count(), 2);
        assert!(response.error.is_none());
    }

    #[test]
    fn test_auto_notification_response_counts_users() {
        let json = r#"{"success": true, "processedUsers": ["u-1", "u-2", "u-3"]}"#;
        let response: TriggerResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.handled_count(), 3);
    }

    #[test]
    fn test_failure_envelope_carries_error() {
        let json = r#"{"success": false, "error": "cron disabled"}"#;
        let response: TriggerResponse = serde_json::from_str(json).unwrap();
        assert!(!response.success);
        assert_eq!(response.handled_count(), 0);
        assert_eq!(response.error.as_deref(), Some("cron disabled"));
    }

    #[test]
    fn test_request_payloads_use_camel_case() {
        let users = vec!["u-1".to_string()];
        let body = serde_json::to_value(AutoNotificationRequest { users: &users }).unwrap();
        assert_eq!(body["users"][0], "u-1");

        let predictions: Vec<PredictionRecord> = Vec::new();
        let body = serde_json::to_value(WorkerBatchRequest {
            predictions: &predictions,
        })
        .unwrap();
        assert!(body["predictions"].as_array().unwrap().is_empty());
    }
}
