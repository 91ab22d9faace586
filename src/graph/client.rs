//! HTTP transport for Microsoft Graph.

use std::time::Duration;

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use tracing::{debug, error};
use uuid::Uuid;

use crate::config::Config;
use crate::error::ApiError;

/// HTTP request timeout.
const HTTP_TIMEOUT: Duration = Duration::from_secs(30);
/// HTTP connection timeout.
const HTTP_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Microsoft Graph API client.
pub struct GraphClient {
    base_url: String,
    http_client: reqwest::Client,
}

impl GraphClient {
    /// Create a new Graph client from configuration.
    pub fn new(config: &Config) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .connect_timeout(HTTP_CONNECT_TIMEOUT)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            base_url: config.api.graph_base_url.trim_end_matches('/').to_string(),
            http_client,
        })
    }

    /// Authenticated GET returning a typed payload.
    ///
    /// Every request carries a fresh `client-request-id` so failures can be
    /// correlated with the service side.
    pub(crate) async fn get<T: DeserializeOwned>(
        &self,
        access_token: &str,
        path: &str,
        query: &[(&str, String)],
        headers: &[(&str, String)],
    ) -> Result<T, ApiError> {
        let url = format!("{}{}", self.base_url, path);
        let request_id = Uuid::new_v4().to_string();

        let mut request = self
            .http_client
            .get(&url)
            .bearer_auth(access_token)
            .header("client-request-id", &request_id);
        for (name, value) in headers {
            request = request.header(*name, value.as_str());
        }
        if !query.is_empty() {
            request = request.query(query);
        }

        debug!("GET {} [{}]", path, request_id);

        let response = request
            .send()
            .await
            .map_err(|e| ApiError::RequestFailed(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            response
                .json()
                .await
                .map_err(|e| ApiError::ParseFailed(e.to_string()))
        } else {
            let body = response.text().await.unwrap_or_default();
            error!(
                "Graph request {} failed: HTTP {} - {}",
                request_id, status, body
            );
            Err(ApiError::Status {
                status: status.as_u16(),
                body,
            })
        }
    }
}
