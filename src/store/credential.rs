//! Credential record stored per service/profile.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop};

/// A cached OAuth credential for one account profile.
///
/// Serialized with camelCase keys so the credential file reads like the
/// token responses it is derived from. Token material is wiped from memory
/// on drop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
#[serde(rename_all = "camelCase")]
pub struct Credential {
    /// Bearer token sent on Graph requests.
    pub access_token: String,

    /// Long-lived token used to renew the access token. Absent when the
    /// authority did not grant `offline_access`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,

    /// Instant at which the access token stops being valid.
    #[zeroize(skip)]
    pub expires_at: DateTime<Utc>,

    /// Account identity (UPN or email) the credential belongs to.
    pub account: String,

    /// Scopes the access token was granted for.
    #[serde(default)]
    pub scopes: Vec<String>,

    /// Per-profile application (client) id override.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,

    /// Per-profile tenant override.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<String>,
}

impl Credential {
    /// Whether the access token is expired at the given instant.
    ///
    /// The boundary counts as expired: a token whose `expires_at` equals
    /// `now` must not be sent to the API.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// Whether the access token is expired right now.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    /// Seconds until expiry at the given instant, floored at zero.
    pub fn expires_in_at(&self, now: DateTime<Utc>) -> i64 {
        (self.expires_at - now).num_seconds().max(0)
    }

    /// Seconds until expiry from now, floored at zero.
    pub fn expires_in(&self) -> i64 {
        self.expires_in_at(Utc::now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn credential_expiring_at(expires_at: DateTime<Utc>) -> Credential {
        Credential {
            access_token: "at".into(),
            refresh_token: Some("rt".into()),
            expires_at,
            account: "user@example.com".into(),
            scopes: vec!["Mail.Read".into()],
            client_id: None,
            tenant_id: None,
        }
    }

    #[test]
    fn test_expiry_boundary() {
        let now = Utc::now();

        // One second in the future: still valid.
        let cred = credential_expiring_at(now + Duration::seconds(1));
        assert!(!cred.is_expired_at(now));

        // Exactly now: expired.
        let cred = credential_expiring_at(now);
        assert!(cred.is_expired_at(now));

        // In the past: expired.
        let cred = credential_expiring_at(now - Duration::seconds(1));
        assert!(cred.is_expired_at(now));
    }

    #[test]
    fn test_expires_in_floors_at_zero() {
        let now = Utc::now();

        let cred = credential_expiring_at(now + Duration::seconds(90));
        assert_eq!(cred.expires_in_at(now), 90);

        let cred = credential_expiring_at(now - Duration::seconds(90));
        assert_eq!(cred.expires_in_at(now), 0);
    }

    #[test]
    fn test_serde_camel_case_keys() {
        let now = Utc::now();
        let cred = credential_expiring_at(now);
        let json = serde_json::to_string(&cred).unwrap();

        assert!(json.contains("\"accessToken\""));
        assert!(json.contains("\"refreshToken\""));
        assert!(json.contains("\"expiresAt\""));
        assert!(!json.contains("\"clientId\""), "None fields are omitted");

        let back: Credential = serde_json::from_str(&json).unwrap();
        assert_eq!(back, cred);
    }

    #[test]
    fn test_missing_optional_fields_deserialize() {
        let json = r#"{
            "accessToken": "at",
            "expiresAt": "2026-01-01T00:00:00Z",
            "account": "user@example.com"
        }"#;
        let cred: Credential = serde_json::from_str(json).unwrap();
        assert_eq!(cred.refresh_token, None);
        assert!(cred.scopes.is_empty());
        assert_eq!(cred.tenant_id, None);
    }
}
