//! Authentication decision logic.
//!
//! Every command that talks to Graph funnels through [`AuthHandler`]: it
//! reads the stored credential, refreshes it when expired, and reports the
//! result as an [`AuthOutcome`]. "Not signed in" is data, not an error, so
//! commands can print instructions and exit cleanly instead of unwinding.

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info, warn};

use crate::auth::{claims, DeviceAuthorization, TokenResponse, TokenSource};
use crate::config::Config;
use crate::error::AppError;
use crate::store::{Credential, CredentialStore};

/// Account label used when the token carries no identity claim.
const UNKNOWN_ACCOUNT: &str = "unknown";

/// Outcome of an authentication check.
#[derive(Debug)]
pub enum AuthOutcome {
    /// A valid access token is available.
    Ok(ReadyCredential),
    /// No usable credential; interactive sign-in is required.
    AuthRequired { reason: String },
    /// A device sign-in was started and is still waiting on the user.
    AuthPending,
}

impl AuthOutcome {
    /// Unwrap into a usable credential, or the reason there is none.
    pub fn ready(self) -> Result<ReadyCredential, String> {
        match self {
            AuthOutcome::Ok(ready) => Ok(ready),
            AuthOutcome::AuthRequired { reason } => Err(reason),
            AuthOutcome::AuthPending => Err("sign-in has not completed yet".into()),
        }
    }
}

/// A credential that is ready to authenticate Graph requests.
#[derive(Debug, Clone)]
pub struct ReadyCredential {
    pub access_token: String,
    pub account: String,
    pub expires_at: DateTime<Utc>,
}

impl ReadyCredential {
    /// Whole seconds until expiry, never negative.
    pub fn expires_in(&self) -> i64 {
        (self.expires_at - Utc::now()).num_seconds().max(0)
    }
}

impl From<&Credential> for ReadyCredential {
    fn from(credential: &Credential) -> Self {
        Self {
            access_token: credential.access_token.clone(),
            account: credential.account.clone(),
            expires_at: credential.expires_at,
        }
    }
}

/// Drives the stored-credential / refresh / device-flow state machine.
pub struct AuthHandler<'a> {
    config: &'a Config,
    store: &'a CredentialStore,
    source: &'a dyn TokenSource,
    client_id_override: Option<String>,
    tenant_id_override: Option<String>,
}

impl<'a> AuthHandler<'a> {
    pub fn new(config: &'a Config, store: &'a CredentialStore, source: &'a dyn TokenSource) -> Self {
        Self {
            config,
            store,
            source,
            client_id_override: None,
            tenant_id_override: None,
        }
    }

    /// Override the app registration used for new sign-ins.
    ///
    /// Overrides are persisted with the resulting credential so later
    /// refreshes keep using the same registration.
    pub fn with_overrides(
        mut self,
        client_id: Option<String>,
        tenant_id: Option<String>,
    ) -> Self {
        self.client_id_override = client_id;
        self.tenant_id_override = tenant_id;
        self
    }

    /// Get a usable access token without user interaction.
    ///
    /// Tries the stored token first, then a silent refresh. Never starts a
    /// device flow; when neither works the outcome says why.
    pub async fn ensure(&self, profile: &str, scopes: &[String]) -> Result<AuthOutcome, AppError> {
        let service = self.config.store.service.as_str();

        let Some(credential) = self.store.get(service, profile)? else {
            return Ok(AuthOutcome::AuthRequired {
                reason: format!("no credential stored for profile '{profile}'"),
            });
        };

        if !credential.is_expired() {
            debug!(
                "Access token for {} valid for another {}s",
                credential.account,
                credential.expires_in()
            );
            return Ok(AuthOutcome::Ok(ReadyCredential::from(&credential)));
        }

        let Some(refresh_token) = credential.refresh_token.clone() else {
            return Ok(AuthOutcome::AuthRequired {
                reason: "access token expired and no refresh token is stored".into(),
            });
        };

        info!("Access token expired, trying a silent refresh");
        let (client_id, tenant) = self.effective_ids(Some(&credential));
        let scopes = scopes_with_offline_access(scopes);

        match self
            .source
            .acquire_by_refresh(&client_id, &tenant, &refresh_token, &scopes)
            .await
        {
            Ok(grant) => {
                let renewed = credential_from_grant(&grant, Some(&credential), Utc::now());
                self.store.set(service, profile, &renewed)?;
                info!(
                    "Refreshed token for {}, expires at {}",
                    renewed.account, renewed.expires_at
                );
                Ok(AuthOutcome::Ok(ReadyCredential::from(&renewed)))
            }
            Err(e) => {
                warn!("Token refresh failed: {}", e);
                Ok(AuthOutcome::AuthRequired {
                    reason: format!("token refresh failed: {e}"),
                })
            }
        }
    }

    /// Outcome of a sign-in started earlier, e.g. with `auth --no-wait`.
    ///
    /// No stored credential means the device flow has not produced one
    /// yet, so the sign-in is still pending. A stored credential goes
    /// through the usual freshness check.
    pub async fn completion(&self, profile: &str, scopes: &[String]) -> Result<AuthOutcome, AppError> {
        let service = self.config.store.service.as_str();
        if self.store.get(service, profile)?.is_none() {
            return Ok(AuthOutcome::AuthPending);
        }
        self.ensure(profile, scopes).await
    }

    /// Start a device sign-in flow and return the user instructions.
    ///
    /// The stored credential, if any, only contributes its client/tenant
    /// overrides; its tokens are ignored.
    pub async fn begin_interactive(
        &self,
        profile: &str,
        scopes: &[String],
    ) -> Result<DeviceAuthorization, AppError> {
        let service = self.config.store.service.as_str();
        let previous = self.store.get(service, profile)?;
        let (client_id, tenant) = self.effective_ids(previous.as_ref());
        let scopes = scopes_with_offline_access(scopes);

        let authorization = self
            .source
            .begin_device_authorization(&client_id, &tenant, &scopes)
            .await?;
        Ok(authorization)
    }

    /// Wait for a started device sign-in to finish and persist the result.
    pub async fn complete_interactive(
        &self,
        profile: &str,
        authorization: &DeviceAuthorization,
    ) -> Result<ReadyCredential, AppError> {
        let service = self.config.store.service.as_str();
        let previous = self.store.get(service, profile)?;
        let (client_id, tenant) = self.effective_ids(previous.as_ref());

        let grant = self
            .source
            .wait_for_device_token(&client_id, &tenant, authorization)
            .await?;

        let mut credential = credential_from_grant(&grant, previous.as_ref(), Utc::now());
        if let Some(id) = &self.client_id_override {
            credential.client_id = Some(id.clone());
        }
        if let Some(id) = &self.tenant_id_override {
            credential.tenant_id = Some(id.clone());
        }
        self.store.set(service, profile, &credential)?;
        info!("Signed in as {}", credential.account);

        Ok(ReadyCredential::from(&credential))
    }

    /// Client id and tenant for a profile.
    ///
    /// Precedence: explicit override, then what the stored credential was
    /// issued with, then the configured defaults.
    fn effective_ids(&self, credential: Option<&Credential>) -> (String, String) {
        let client_id = self
            .client_id_override
            .clone()
            .or_else(|| credential.and_then(|c| c.client_id.clone()))
            .unwrap_or_else(|| self.config.oauth.client_id.clone());
        let tenant = self
            .tenant_id_override
            .clone()
            .or_else(|| credential.and_then(|c| c.tenant_id.clone()))
            .unwrap_or_else(|| self.config.oauth.tenant.clone());
        (client_id, tenant)
    }
}

/// Requested scopes plus `offline_access`, so every grant can be renewed.
pub fn scopes_with_offline_access(scopes: &[String]) -> Vec<String> {
    let mut merged: Vec<String> = Vec::with_capacity(scopes.len() + 1);
    if !scopes.iter().any(|s| s == "offline_access") {
        merged.push("offline_access".into());
    }
    for scope in scopes {
        if !merged.contains(scope) {
            merged.push(scope.clone());
        }
    }
    merged
}

/// Build the credential to persist from a token grant.
///
/// Carries forward whatever the grant omits: the refresh token when the
/// authority did not rotate it, the account and scopes when the new token
/// does not name them, and the per-profile overrides always.
fn credential_from_grant(
    grant: &TokenResponse,
    previous: Option<&Credential>,
    now: DateTime<Utc>,
) -> Credential {
    let account = claims::account_from_token(&grant.access_token)
        .or_else(|| previous.map(|c| c.account.clone()))
        .unwrap_or_else(|| UNKNOWN_ACCOUNT.into());

    let scopes = if grant.scope.is_empty() {
        previous.map(|c| c.scopes.clone()).unwrap_or_default()
    } else {
        grant.scope.split_whitespace().map(str::to_string).collect()
    };

    Credential {
        access_token: grant.access_token.clone(),
        refresh_token: grant
            .refresh_token
            .clone()
            .or_else(|| previous.and_then(|c| c.refresh_token.clone())),
        expires_at: now + Duration::seconds(grant.expires_in as i64),
        account,
        scopes,
        client_id: previous.and_then(|c| c.client_id.clone()),
        tenant_id: previous.and_then(|c| c.tenant_id.clone()),
    }
}
