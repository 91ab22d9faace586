//! Best-effort claim extraction from access tokens.
//!
//! Graph access tokens are JWTs whose payload names the signed-in account.
//! The payload is decoded without any signature validation; the token is
//! only inspected locally to label the credential, never trusted for
//! authorization decisions.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};

/// Claims that can carry the account identity, in preference order.
const ACCOUNT_CLAIMS: [&str; 3] = ["preferred_username", "upn", "email"];

/// Extract the account identity (UPN or email) from an access token.
///
/// Returns `None` for opaque tokens or payloads without an identity claim.
pub fn account_from_token(access_token: &str) -> Option<String> {
    let payload = decode_payload(access_token)?;
    ACCOUNT_CLAIMS.iter().find_map(|claim| {
        payload
            .get(claim)
            .and_then(|value| value.as_str())
            .map(str::to_string)
    })
}

fn decode_payload(token: &str) -> Option<serde_json::Value> {
    let mut parts = token.split('.');
    let _header = parts.next()?;
    let payload_b64 = parts.next()?;
    let payload_bytes = URL_SAFE_NO_PAD.decode(payload_b64).ok()?;
    serde_json::from_slice(&payload_bytes).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fake_jwt(payload: serde_json::Value) -> String {
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"none"}"#);
        let body = URL_SAFE_NO_PAD.encode(payload.to_string());
        format!("{header}.{body}.sig")
    }

    #[test]
    fn test_preferred_username_wins() {
        let token = fake_jwt(serde_json::json!({
            "preferred_username": "pref@example.com",
            "upn": "upn@example.com",
            "email": "mail@example.com",
        }));
        assert_eq!(
            account_from_token(&token).as_deref(),
            Some("pref@example.com")
        );
    }

    #[test]
    fn test_upn_fallback() {
        let token = fake_jwt(serde_json::json!({ "upn": "upn@example.com" }));
        assert_eq!(account_from_token(&token).as_deref(), Some("upn@example.com"));
    }

    #[test]
    fn test_email_fallback() {
        let token = fake_jwt(serde_json::json!({ "email": "mail@example.com" }));
        assert_eq!(
            account_from_token(&token).as_deref(),
            Some("mail@example.com")
        );
    }

    #[test]
    fn test_no_identity_claims() {
        let token = fake_jwt(serde_json::json!({ "aud": "graph" }));
        assert_eq!(account_from_token(&token), None);
    }

    #[test]
    fn test_opaque_token() {
        assert_eq!(account_from_token("not-a-jwt"), None);
        assert_eq!(account_from_token("two.parts-but-not-base64!"), None);
    }
}
