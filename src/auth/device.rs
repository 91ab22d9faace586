//! Device code flow client for the Microsoft identity platform.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::Deserialize;
use tokio::time;

use crate::auth::{DeviceAuthorization, TokenResponse, TokenSource};
use crate::config::Config;
use crate::error::AuthError;

/// HTTP request timeout.
const HTTP_TIMEOUT: Duration = Duration::from_secs(30);
/// HTTP connection timeout.
const HTTP_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
/// Extra poll delay demanded by a `slow_down` response, per RFC 8628.
const SLOW_DOWN_BACKOFF_SECS: i64 = 5;

/// OAuth2 client for the device code and refresh token grants.
pub struct DeviceCodeClient {
    config: Config,
    http_client: reqwest::Client,
}

/// Error body returned by the token endpoint while sign-in is unfinished.
#[derive(Debug, Deserialize)]
struct TokenErrorBody {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

/// What a token poll error means for the poll loop.
#[derive(Debug, PartialEq)]
enum PollStep {
    /// Keep polling; `slow_down` asks for a longer interval.
    Retry { slow_down: bool },
    /// Stop polling with a terminal error.
    Fatal,
}

fn classify_poll_error(error_code: &str) -> PollStep {
    match error_code {
        "authorization_pending" => PollStep::Retry { slow_down: false },
        "slow_down" => PollStep::Retry { slow_down: true },
        _ => PollStep::Fatal,
    }
}

fn fatal_poll_error(body: TokenErrorBody) -> AuthError {
    match body.error.as_str() {
        "expired_token" => AuthError::DeviceCodeExpired,
        "access_denied" => {
            AuthError::DeviceCodeDeclined(body.error_description.unwrap_or(body.error))
        }
        _ => AuthError::DeviceCodeRequestFailed(format!(
            "{}: {}",
            body.error,
            body.error_description.unwrap_or_default()
        )),
    }
}

impl DeviceCodeClient {
    /// Create a new client from configuration.
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        use anyhow::Context;

        let http_client = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .connect_timeout(HTTP_CONNECT_TIMEOUT)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            config: config.clone(),
            http_client,
        })
    }

    async fn post_token_form(
        &self,
        tenant: &str,
        params: &[(&str, &str)],
    ) -> Result<reqwest::Response, reqwest::Error> {
        self.http_client
            .post(self.config.token_url(tenant))
            .form(params)
            .send()
            .await
    }
}

#[async_trait]
impl TokenSource for DeviceCodeClient {
    async fn begin_device_authorization(
        &self,
        client_id: &str,
        tenant: &str,
        scopes: &[String],
    ) -> Result<DeviceAuthorization, AuthError> {
        let scope = scopes.join(" ");
        let params = [("client_id", client_id), ("scope", scope.as_str())];

        let response = self
            .http_client
            .post(self.config.devicecode_url(tenant))
            .form(&params)
            .send()
            .await
            .map_err(|e| AuthError::DeviceCodeRequestFailed(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_body = response.text().await.unwrap_or_default();
            tracing::error!(
                "Device authorization request failed: HTTP {} - {}",
                status,
                error_body
            );
            return Err(AuthError::DeviceCodeRequestFailed(format!(
                "HTTP {}",
                status.as_u16()
            )));
        }

        let authorization: DeviceAuthorization = response
            .json()
            .await
            .map_err(|e| AuthError::MalformedTokenResponse(e.to_string()))?;

        tracing::debug!(
            "Device authorization started, code valid for {}s",
            authorization.expires_in
        );
        Ok(authorization)
    }

    async fn wait_for_device_token(
        &self,
        client_id: &str,
        tenant: &str,
        authorization: &DeviceAuthorization,
    ) -> Result<TokenResponse, AuthError> {
        let mut interval = authorization.interval.max(1);
        // Stop a little before the authority would reject the code anyway.
        let deadline = Instant::now()
            + Duration::from_secs((authorization.expires_in.max(0) as u64).saturating_sub(5));

        loop {
            if Instant::now() >= deadline {
                return Err(AuthError::DeviceCodeExpired);
            }

            let params = [
                ("grant_type", "urn:ietf:params:oauth:grant-type:device_code"),
                ("client_id", client_id),
                ("device_code", authorization.device_code.as_str()),
            ];

            let response = self
                .post_token_form(tenant, &params)
                .await
                .map_err(|e| AuthError::DeviceCodeRequestFailed(e.to_string()))?;

            if response.status().is_success() {
                return response
                    .json()
                    .await
                    .map_err(|e| AuthError::MalformedTokenResponse(e.to_string()));
            }

            let body: TokenErrorBody = response.json().await.unwrap_or(TokenErrorBody {
                error: "unknown_error".into(),
                error_description: None,
            });

            match classify_poll_error(&body.error) {
                PollStep::Retry { slow_down } => {
                    if slow_down {
                        interval += SLOW_DOWN_BACKOFF_SECS;
                    }
                    tracing::debug!("Sign-in not finished yet, polling again in {}s", interval);
                    time::sleep(Duration::from_secs(interval as u64)).await;
                }
                PollStep::Fatal => return Err(fatal_poll_error(body)),
            }
        }
    }

    async fn acquire_by_refresh(
        &self,
        client_id: &str,
        tenant: &str,
        refresh_token: &str,
        scopes: &[String],
    ) -> Result<TokenResponse, AuthError> {
        let scope = scopes.join(" ");
        let params = [
            ("client_id", client_id),
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
            ("scope", scope.as_str()),
        ];

        let response = self
            .post_token_form(tenant, &params)
            .await
            .map_err(|e| AuthError::TokenRefreshFailed(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_body = response.text().await.unwrap_or_default();
            tracing::error!("Token refresh failed: HTTP {} - {}", status, error_body);

            // Surface the OAuth error code (e.g. invalid_grant) when present.
            let reason = serde_json::from_str::<TokenErrorBody>(&error_body)
                .map(|b| b.error)
                .unwrap_or_else(|_| format!("HTTP {}", status.as_u16()));
            return Err(AuthError::TokenRefreshFailed(reason));
        }

        response
            .json()
            .await
            .map_err(|e| AuthError::MalformedTokenResponse(e.to_string()))
    }
}
