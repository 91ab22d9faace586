//! mgraph - Microsoft Graph mail and calendar from the command line.

#![deny(clippy::all)]

mod auth;
mod commands;
mod config;
mod dates;
mod error;
mod graph;
mod store;

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing::{debug, error};
use tracing_subscriber::EnvFilter;

use commands::CommandContext;
use config::Config;
use error::AppError;

#[derive(Parser)]
#[command(
    name = "mgraph",
    version,
    about = "Microsoft Graph mail and calendar from the command line"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Credential profile to operate on [default: from config].
    #[arg(long, global = true)]
    profile: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in with a device code, or manage stored profiles.
    Auth(commands::auth::AuthArgs),
    /// Check whether a usable access token is available.
    CheckAuth {
        /// Print the result as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Check whether a pending device sign-in has finished.
    CheckAuthComplete {
        /// Print the result as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Read and search mail.
    Emails {
        #[command(subcommand)]
        action: commands::emails::EmailsAction,
    },
    /// Read and search the calendar.
    Calendar {
        #[command(subcommand)]
        action: commands::calendar::CalendarAction,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    // Load .env file (if present) before anything else
    if let Err(e) = dotenvy::dotenv() {
        // .env file is optional - only log if it's not a "file not found" error
        if !e.to_string().contains("not found") {
            eprintln!("Warning: Failed to load .env file: {}", e);
        }
    }

    let cli = Cli::parse();

    let config = match Config::load() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            eprintln!("\nCheck the MGRAPH_CLIENT_ID and MGRAPH_TENANT_ID environment variables.");
            return ExitCode::FAILURE;
        }
    };

    init_logging(&config);
    debug!("Starting mgraph v{}", env!("CARGO_PKG_VERSION"));

    let profile = cli
        .profile
        .unwrap_or_else(|| config.store.default_profile.clone());
    let ctx = match CommandContext::new(config, profile) {
        Ok(ctx) => ctx,
        Err(e) => {
            eprintln!("Error: {e:#}");
            return ExitCode::FAILURE;
        }
    };

    match run(cli.command, &ctx).await {
        Ok(code) => code,
        Err(e) => {
            error!("{}", e);
            eprintln!("Error: {}", e.user_message());
            ExitCode::FAILURE
        }
    }
}

async fn run(command: Commands, ctx: &CommandContext) -> Result<ExitCode, AppError> {
    match command {
        Commands::Auth(args) => commands::auth::run(ctx, args).await,
        Commands::CheckAuth { json } => commands::check_auth::run_check(ctx, json).await,
        Commands::CheckAuthComplete { json } => commands::check_auth::run_complete(ctx, json).await,
        Commands::Emails { action } => commands::emails::run(ctx, action).await,
        Commands::Calendar { action } => commands::calendar::run(ctx, action).await,
    }
}

/// Initialize tracing/logging.
fn init_logging(config: &Config) {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.logging.level)),
        )
        .with_target(false)
        .with_thread_ids(false)
        .with_writer(std::io::stderr)
        .init();
}
