//! Token freshness reporting for scripts and shells.
//!
//! Both commands answer on the exit code (0 usable, 1 not) so prompts and
//! scripts can branch without parsing output; `--json` adds a structured
//! answer on stdout.

use std::process::ExitCode;

use chrono::Duration;
use serde::Serialize;

use crate::auth::{AuthHandler, AuthOutcome};
use crate::error::AppError;

use super::{auth_required, format_duration, print_json, CommandContext};

/// Machine-readable auth state, one document per invocation.
#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "kebab-case")]
enum AuthStatus {
    Valid {
        account: String,
        #[serde(rename = "expiresIn")]
        expires_in: i64,
    },
    NeedsAuth {
        reason: String,
    },
    Pending,
    Failed {
        reason: String,
    },
}

/// `check-auth`: is a usable access token available, refreshing if needed?
pub async fn run_check(ctx: &CommandContext, json: bool) -> Result<ExitCode, AppError> {
    let handler = AuthHandler::new(&ctx.config, &ctx.store, &ctx.identity);
    let scopes = ctx.config.oauth.scopes.scopes.clone();

    match handler.ensure(&ctx.profile, &scopes).await?.ready() {
        Ok(ready) => {
            let expires_in = ready.expires_in();
            if json {
                print_json(&AuthStatus::Valid {
                    account: ready.account,
                    expires_in,
                })?;
            } else {
                println!(
                    "Signed in as {} (token valid for {})",
                    ready.account,
                    format_duration(Duration::seconds(expires_in))
                );
            }
            Ok(ExitCode::SUCCESS)
        }
        Err(reason) => {
            if json {
                print_json(&AuthStatus::NeedsAuth { reason })?;
                Ok(ExitCode::FAILURE)
            } else {
                Ok(auth_required(&reason))
            }
        }
    }
}

/// `check-auth-complete`: has a pending device sign-in finished?
///
/// Pending and failed both exit nonzero; the status in the output tells
/// a polling caller whether to keep waiting or give up.
pub async fn run_complete(ctx: &CommandContext, json: bool) -> Result<ExitCode, AppError> {
    let handler = AuthHandler::new(&ctx.config, &ctx.store, &ctx.identity);
    let scopes = ctx.config.oauth.scopes.scopes.clone();

    match handler.completion(&ctx.profile, &scopes).await? {
        AuthOutcome::Ok(ready) => {
            if json {
                print_json(&AuthStatus::Valid {
                    expires_in: ready.expires_in(),
                    account: ready.account,
                })?;
            } else {
                println!("Signed in as {}", ready.account);
            }
            Ok(ExitCode::SUCCESS)
        }
        AuthOutcome::AuthPending => {
            if json {
                print_json(&AuthStatus::Pending)?;
            } else {
                println!("Sign-in has not completed yet.");
            }
            Ok(ExitCode::FAILURE)
        }
        AuthOutcome::AuthRequired { reason } => {
            if json {
                print_json(&AuthStatus::Failed { reason })?;
            } else {
                eprintln!("Sign-in failed: {reason}");
            }
            Ok(ExitCode::FAILURE)
        }
    }
}
