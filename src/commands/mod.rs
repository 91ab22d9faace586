//! CLI subcommand implementations.
//!
//! Each submodule owns one subcommand: its argument struct, its output
//! shaping, and its exit code. "Not signed in" and "profile not found" are
//! expected outcomes, so commands report them on the exit code instead of
//! unwinding through the error printer.

pub mod auth;
pub mod calendar;
pub mod check_auth;
pub mod emails;

use std::process::ExitCode;

use chrono::Duration;
use clap::ValueEnum;
use serde::Serialize;

use crate::auth::DeviceCodeClient;
use crate::config::Config;
use crate::error::AppError;
use crate::graph::GraphClient;
use crate::store::CredentialStore;

/// Delegated scope the mail commands request.
const MAIL_SCOPE: &str = "Mail.Read";
/// Delegated scope the calendar commands request.
const CALENDAR_SCOPE: &str = "Calendars.Read";

/// Shared handles threaded through every command.
pub struct CommandContext {
    pub config: Config,
    pub store: CredentialStore,
    pub identity: DeviceCodeClient,
    pub graph: GraphClient,
    pub profile: String,
}

impl CommandContext {
    pub fn new(config: Config, profile: String) -> anyhow::Result<Self> {
        let store = CredentialStore::new()?;
        let identity = DeviceCodeClient::new(&config)?;
        let graph = GraphClient::new(&config)?;
        Ok(Self {
            config,
            store,
            identity,
            graph,
            profile,
        })
    }

    /// Service key the credentials of this tool are stored under.
    pub fn service(&self) -> &str {
        &self.config.store.service
    }
}

/// Output format for command results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

/// Print a value as pretty-printed JSON on stdout.
fn print_json<T: Serialize>(value: &T) -> Result<(), AppError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Print the standard not-signed-in hint and fail.
fn auth_required(reason: &str) -> ExitCode {
    eprintln!("Not signed in: {reason}");
    eprintln!("Run `mgraph auth` to sign in.");
    ExitCode::FAILURE
}

/// Format a duration in a human-readable way.
fn format_duration(duration: Duration) -> String {
    let total_minutes = duration.num_minutes();

    if total_minutes < 1 {
        "< 1 min".to_string()
    } else if total_minutes < 60 {
        format!("{} min", total_minutes)
    } else {
        let hours = total_minutes / 60;
        let mins = total_minutes % 60;
        if mins == 0 {
            format!("{} hour{}", hours, if hours == 1 { "" } else { "s" })
        } else {
            format!("{}h {}m", hours, mins)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::seconds(30)), "< 1 min");
        assert_eq!(format_duration(Duration::minutes(5)), "5 min");
        assert_eq!(format_duration(Duration::minutes(45)), "45 min");
        assert_eq!(format_duration(Duration::hours(1)), "1 hour");
        assert_eq!(format_duration(Duration::hours(2)), "2 hours");
        assert_eq!(format_duration(Duration::minutes(90)), "1h 30m");
    }
}
