//! Microsoft identity platform authentication.
//!
//! Sign-in uses the OAuth2 device code flow, so the CLI never handles the
//! user's password and works over SSH. Renewals go through the refresh
//! token grant. [`AuthHandler`] decides which of the two applies and
//! reports the result as a discriminated [`AuthOutcome`] instead of
//! treating "not signed in" as a failure.

pub mod claims;
pub mod device;
pub mod handler;

pub use device::DeviceCodeClient;
pub use handler::{AuthHandler, AuthOutcome, ReadyCredential};

use async_trait::async_trait;
use serde::Deserialize;

use crate::error::AuthError;

/// Device authorization response from the identity platform.
#[derive(Debug, Clone, Deserialize)]
pub struct DeviceAuthorization {
    pub device_code: String,
    pub user_code: String,
    pub verification_uri: String,
    #[serde(default)]
    pub verification_uri_complete: Option<String>,
    /// Seconds until the device code stops being redeemable.
    pub expires_in: i64,
    /// Seconds to wait between token polls.
    #[serde(default = "default_poll_interval")]
    pub interval: i64,
    /// Ready-made sign-in instructions from the authority.
    #[serde(default)]
    pub message: Option<String>,
}

fn default_poll_interval() -> i64 {
    5
}

/// Token response from the identity platform.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[allow(dead_code)]
    pub token_type: String,
    pub expires_in: u64,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub scope: String,
}

/// Capability interface over the identity platform.
///
/// The handler and commands depend on this trait rather than on HTTP, so
/// tests can drive the auth state machine with canned responses.
#[async_trait]
pub trait TokenSource: Send + Sync {
    /// Start a device authorization flow for the given scopes.
    async fn begin_device_authorization(
        &self,
        client_id: &str,
        tenant: &str,
        scopes: &[String],
    ) -> Result<DeviceAuthorization, AuthError>;

    /// Poll the token endpoint until the user finishes sign-in, the code
    /// expires, or the request is declined.
    async fn wait_for_device_token(
        &self,
        client_id: &str,
        tenant: &str,
        authorization: &DeviceAuthorization,
    ) -> Result<TokenResponse, AuthError>;

    /// Redeem a refresh token for a new access token.
    async fn acquire_by_refresh(
        &self,
        client_id: &str,
        tenant: &str,
        refresh_token: &str,
        scopes: &[String],
    ) -> Result<TokenResponse, AuthError>;
}
