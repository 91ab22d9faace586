//! Microsoft Graph API access.
//!
//! [`client::GraphClient`] carries the HTTP transport; the mail and
//! calendar modules add typed queries on top of it.

pub mod calendar;
pub mod client;
pub mod mail;

pub use client::GraphClient;

use serde::Deserialize;

/// Graph collection response wrapper.
#[derive(Debug, Deserialize)]
pub struct ListResponse<T> {
    #[serde(default = "Vec::new")]
    pub value: Vec<T>,
}

/// Message sender or event organizer.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recipient {
    pub email_address: Option<EmailAddress>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailAddress {
    pub name: Option<String>,
    pub address: Option<String>,
}

impl Recipient {
    /// Display name if present, else the address.
    pub fn label(&self) -> Option<&str> {
        let email = self.email_address.as_ref()?;
        email
            .name
            .as_deref()
            .filter(|n| !n.is_empty())
            .or_else(|| email.address.as_deref())
    }
}
