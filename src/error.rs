//! Error types for the mgraph CLI.
//!
//! Uses `thiserror` for library-style errors with automatic `Display` and `Error` implementations.

use std::path::PathBuf;

use thiserror::Error;

/// Top-level application error type.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Authentication error: {0}")]
    Auth(#[from] AuthError),

    #[error("Credential store error: {0}")]
    Store(#[from] StoreError),

    #[error("API error: {0}")]
    Api(#[from] ApiError),

    #[error("Invalid date '{0}': expected today, tomorrow, +Nd, +Nm, +Ny, YYYY-MM-DD, or RFC 3339")]
    InvalidDate(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Authentication-related errors.
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Device authorization request failed: {0}")]
    DeviceCodeRequestFailed(String),

    #[error("Device code expired before sign-in was completed")]
    DeviceCodeExpired,

    #[error("Sign-in was declined: {0}")]
    DeviceCodeDeclined(String),

    #[error("Token refresh failed: {0}")]
    TokenRefreshFailed(String),

    #[error("Malformed token response: {0}")]
    MalformedTokenResponse(String),
}

/// Credential store errors.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Failed to read credential file {path}: {source}")]
    ReadFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to write credential file {path}: {source}")]
    WriteFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Credential file {path} is malformed: {source}")]
    Malformed {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Failed to lock credential file {path}: {source}")]
    LockFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Could not determine a config directory for the credential file")]
    NoConfigDir,
}

/// Graph API errors.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Graph request failed: {0}")]
    RequestFailed(String),

    /// Non-2xx response with the HTTP status and the response body text.
    #[error("Graph API error {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Failed to parse API response: {0}")]
    ParseFailed(String),

    #[error("Not found: {0}")]
    NotFound(String),
}

impl AppError {
    /// Returns a user-friendly message for display on stderr.
    pub fn user_message(&self) -> String {
        match self {
            Self::Auth(AuthError::DeviceCodeExpired) => {
                "Sign-in timed out. Run `mgraph auth` to try again.".into()
            }
            Self::Auth(AuthError::DeviceCodeDeclined(_)) => {
                "Sign-in was declined. Run `mgraph auth` to try again.".into()
            }
            Self::Auth(AuthError::TokenRefreshFailed(_)) => {
                "Session expired. Run `mgraph auth` to sign in again.".into()
            }
            Self::Api(ApiError::Status { status: 401, .. }) => {
                "Authentication expired. Run `mgraph auth` to sign in again.".into()
            }
            Self::Api(ApiError::Status { status: 403, .. }) => {
                "Insufficient permissions for this operation.".into()
            }
            Self::Api(ApiError::Status { status: 429, .. }) => {
                "Too many requests. Please wait a moment and retry.".into()
            }
            Self::Network(_) => "Network error. Check your connection.".into(),
            other => other.to_string(),
        }
    }
}
