//! Interactive sign-in and profile management.

use std::process::ExitCode;

use chrono::Duration;
use clap::Args;
use serde::Serialize;
use tracing::debug;

use crate::auth::{AuthHandler, DeviceAuthorization};
use crate::error::AppError;
use crate::store::CredentialStore;

use super::{format_duration, print_json, CommandContext};

#[derive(Args, Debug)]
pub struct AuthArgs {
    /// Application (client) id to sign in with.
    #[arg(long)]
    pub client_id: Option<String>,

    /// Directory (tenant) id to sign in against.
    #[arg(long)]
    pub tenant_id: Option<String>,

    /// Comma-separated scopes to request instead of the configured set.
    #[arg(long, value_delimiter = ',')]
    pub scopes: Option<Vec<String>>,

    /// List stored profiles and exit.
    #[arg(long)]
    pub list: bool,

    /// Delete the selected profile and exit.
    #[arg(long, conflicts_with = "list")]
    pub delete: bool,

    /// Print results as JSON.
    #[arg(long)]
    pub json: bool,

    /// Print the sign-in instructions and exit without waiting.
    #[arg(long)]
    pub no_wait: bool,
}

/// One line of `auth --list` output.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ProfileRow {
    profile: String,
    account: String,
    status: &'static str,
    expires_in: i64,
}

/// Sign-in instructions, printed as JSON for `--no-wait --json`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PendingSignIn<'a> {
    status: &'static str,
    user_code: &'a str,
    verification_uri: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    verification_uri_complete: Option<&'a str>,
    expires_in: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<&'a str>,
}

impl<'a> From<&'a DeviceAuthorization> for PendingSignIn<'a> {
    fn from(authorization: &'a DeviceAuthorization) -> Self {
        Self {
            status: "pending",
            user_code: &authorization.user_code,
            verification_uri: &authorization.verification_uri,
            verification_uri_complete: authorization.verification_uri_complete.as_deref(),
            expires_in: authorization.expires_in,
            message: authorization.message.as_deref(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SignedIn<'a> {
    status: &'static str,
    account: &'a str,
    expires_in: i64,
}

pub async fn run(ctx: &CommandContext, args: AuthArgs) -> Result<ExitCode, AppError> {
    if args.list {
        return list_profiles(ctx, args.json);
    }
    if args.delete {
        return delete_profile(ctx, args.json);
    }
    sign_in(ctx, args).await
}

async fn sign_in(ctx: &CommandContext, args: AuthArgs) -> Result<ExitCode, AppError> {
    let scopes = args
        .scopes
        .unwrap_or_else(|| ctx.config.oauth.scopes.scopes.clone());
    let handler = AuthHandler::new(&ctx.config, &ctx.store, &ctx.identity)
        .with_overrides(args.client_id, args.tenant_id);

    let authorization = handler.begin_interactive(&ctx.profile, &scopes).await?;

    if args.no_wait {
        if args.json {
            print_json(&PendingSignIn::from(&authorization))?;
        } else {
            print_instructions(&authorization, false);
            println!();
            println!("Run `mgraph check-auth-complete` after approving the request.");
        }
        return Ok(ExitCode::SUCCESS);
    }

    // In JSON mode stdout must stay a single document, so the human-facing
    // instructions go to stderr.
    print_instructions(&authorization, args.json);
    open_verification_page(&authorization);

    let ready = handler
        .complete_interactive(&ctx.profile, &authorization)
        .await?;

    if args.json {
        print_json(&SignedIn {
            status: "valid",
            account: &ready.account,
            expires_in: ready.expires_in(),
        })?;
    } else {
        println!("Signed in as {}", ready.account);
    }
    Ok(ExitCode::SUCCESS)
}

fn print_instructions(authorization: &DeviceAuthorization, to_stderr: bool) {
    let text = match &authorization.message {
        Some(message) => message.clone(),
        None => format!(
            "To sign in, open {} in a browser and enter the code {}",
            authorization.verification_uri, authorization.user_code
        ),
    };
    if to_stderr {
        eprintln!("{text}");
    } else {
        println!("{text}");
    }
}

fn open_verification_page(authorization: &DeviceAuthorization) {
    // Prefer the direct link, which fills in the user code.
    let url = authorization
        .verification_uri_complete
        .as_deref()
        .unwrap_or(&authorization.verification_uri);
    if let Err(e) = open::that(url) {
        debug!("Could not open browser: {}", e);
    }
}

fn list_profiles(ctx: &CommandContext, json: bool) -> Result<ExitCode, AppError> {
    let rows = profile_rows(&ctx.store, ctx.service())?;

    if json {
        print_json(&rows)?;
        return Ok(ExitCode::SUCCESS);
    }

    if rows.is_empty() {
        println!("No profiles stored. Run `mgraph auth` to sign in.");
        return Ok(ExitCode::SUCCESS);
    }
    for row in &rows {
        let state = if row.status == "expired" {
            "expired".to_string()
        } else {
            format!(
                "valid for {}",
                format_duration(Duration::seconds(row.expires_in))
            )
        };
        println!("{}: {} [{}]", row.profile, row.account, state);
    }
    Ok(ExitCode::SUCCESS)
}

fn profile_rows(store: &CredentialStore, service: &str) -> Result<Vec<ProfileRow>, AppError> {
    let names = store.list_profiles(service)?;

    let mut rows = Vec::with_capacity(names.len());
    for name in names {
        let Some(credential) = store.get(service, &name)? else {
            continue;
        };
        rows.push(ProfileRow {
            profile: name,
            account: credential.account.clone(),
            status: if credential.is_expired() {
                "expired"
            } else {
                "valid"
            },
            expires_in: credential.expires_in(),
        });
    }
    Ok(rows)
}

fn delete_profile(ctx: &CommandContext, json: bool) -> Result<ExitCode, AppError> {
    let removed = ctx.store.delete(ctx.service(), &ctx.profile)?;

    if json {
        print_json(&serde_json::json!({
            "profile": ctx.profile,
            "deleted": removed,
        }))?;
    } else if removed {
        println!("Deleted profile '{}'.", ctx.profile);
    } else {
        println!("Profile '{}' not found.", ctx.profile);
    }
    Ok(ExitCode::SUCCESS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Credential;
    use chrono::Utc;
    use tempfile::TempDir;

    fn test_store() -> (TempDir, CredentialStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = CredentialStore::with_path(dir.path().join("credentials.json"));
        (dir, store)
    }

    fn credential(account: &str, expires_in_secs: i64) -> Credential {
        Credential {
            access_token: "at".into(),
            refresh_token: None,
            expires_at: Utc::now() + Duration::seconds(expires_in_secs),
            account: account.into(),
            scopes: vec![],
            client_id: None,
            tenant_id: None,
        }
    }

    #[test]
    fn test_profile_rows_reports_expiry_state() {
        let (_dir, store) = test_store();
        store
            .set("msgraph", "fresh", &credential("a@example.com", 3600))
            .unwrap();
        store
            .set("msgraph", "stale", &credential("b@example.com", -60))
            .unwrap();

        let rows = profile_rows(&store, "msgraph").unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].profile, "fresh");
        assert_eq!(rows[0].status, "valid");
        assert!(rows[0].expires_in > 0);
        assert_eq!(rows[1].profile, "stale");
        assert_eq!(rows[1].status, "expired");
        assert_eq!(rows[1].expires_in, 0);
    }

    #[test]
    fn test_pending_sign_in_shape() {
        let authorization = DeviceAuthorization {
            device_code: "secret".into(),
            user_code: "ABCD-1234".into(),
            verification_uri: "https://microsoft.com/devicelogin".into(),
            verification_uri_complete: None,
            expires_in: 900,
            interval: 5,
            message: None,
        };

        let value = serde_json::to_value(PendingSignIn::from(&authorization)).unwrap();
        assert_eq!(value["status"], "pending");
        assert_eq!(value["userCode"], "ABCD-1234");
        assert_eq!(value["expiresIn"], 900);
        // The device code is a secret; it must never appear in output.
        assert!(value.get("deviceCode").is_none());
    }
}
