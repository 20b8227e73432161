use async_trait::async_trait;
use reqwest::{Client, StatusCode};

use super::types::{AnalysisError, AnalysisRequest, AnalysisResponse};

/// Seam the worker talks through, so cycles can run against a scripted
/// provider in tests.
#[async_trait]
pub trait AnalysisProvider: Send + Sync {
    async fn analyze(&self, request: &AnalysisRequest) -> Result<AnalysisResponse, AnalysisError>;
}

/// Client for the dashboard's commodity analysis endpoint.
pub struct HttpAnalysisClient {
    http: Client,
    endpoint: String,
    token: String,
}

impl HttpAnalysisClient {
    pub fn new(endpoint: String, token: String) -> Self {
        Self {
            http: Client::new(),
            endpoint,
            token,
        }
    }
}

#[async_trait]
impl AnalysisProvider for HttpAnalysisClient {
    async fn analyze(&self, request: &AnalysisRequest) -> Result<AnalysisResponse, AnalysisError> {
        tracing::debug!("Requesting analysis for keyword: {}", request.keyword);

        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.token)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            tracing::warn!("Analysis endpoint rate limited: {}", request.keyword);
            return Err(AnalysisError::RateLimited);
        }

        if !status.is_success() {
            let error_text = response.text().await?;
            tracing::error!("Analysis API error ({}): {}", status, error_text);
            return Err(AnalysisError::Api {
                status: status.as_u16(),
                message: error_text,
            });
        }

        let body = response.text().await?;
        serde_json::from_str(&body)
            .map_err(|e| AnalysisError::Parse(format!("{} (keyword: {})", e, request.keyword)))
    }
}
