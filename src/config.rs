//! Configuration loading and management.
//!
//! Loads configuration from embedded config.toml with environment variable overrides.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::env;

/// Embedded configuration file content.
const CONFIG_TOML: &str = include_str!("../config.toml");

/// Root configuration structure.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub app: AppConfig,
    pub oauth: OAuthConfig,
    pub api: ApiConfig,
    pub store: StoreConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[allow(dead_code)]
pub struct AppConfig {
    pub name: String,
    pub version: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OAuthConfig {
    pub client_id: String,
    pub tenant: String,
    pub authority: String,
    pub scopes: ScopesConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScopesConfig {
    pub scopes: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    pub graph_base_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    pub service: String,
    pub default_profile: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

impl Config {
    /// Load configuration from embedded config.toml with environment variable overrides.
    pub fn load() -> Result<Self> {
        // Parse embedded config
        let mut config: Config =
            toml::from_str(CONFIG_TOML).context("Failed to parse embedded config.toml")?;

        // Apply environment variable overrides
        if let Ok(client_id) = env::var("MGRAPH_CLIENT_ID") {
            config.oauth.client_id = client_id;
        }

        if let Ok(tenant) = env::var("MGRAPH_TENANT_ID") {
            config.oauth.tenant = tenant;
        }

        if let Ok(authority) = env::var("MGRAPH_AUTHORITY") {
            config.oauth.authority = authority;
        }

        if let Ok(graph_base_url) = env::var("MGRAPH_GRAPH_BASE_URL") {
            config.api.graph_base_url = graph_base_url;
        }

        if let Ok(log_level) = env::var("RUST_LOG") {
            config.logging.level = log_level;
        }

        // Validate required fields
        config.validate()?;

        Ok(config)
    }

    /// Validate that required configuration is present.
    fn validate(&self) -> Result<()> {
        if self.oauth.client_id.is_empty() {
            anyhow::bail!(
                "OAuth client_id not configured. Set MGRAPH_CLIENT_ID environment variable \
                 or update config.toml"
            );
        }

        if self.oauth.tenant.is_empty() {
            anyhow::bail!(
                "OAuth tenant not configured. Set MGRAPH_TENANT_ID environment variable \
                 or update config.toml"
            );
        }

        if self.oauth.scopes.scopes.is_empty() {
            anyhow::bail!("OAuth scopes not configured. Update config.toml");
        }

        Ok(())
    }

    /// Get the device authorization URL for the given tenant.
    pub fn devicecode_url(&self, tenant: &str) -> String {
        format!(
            "{}/{}/oauth2/v2.0/devicecode",
            self.oauth.authority.trim_end_matches('/'),
            tenant
        )
    }

    /// Get the token URL for the given tenant.
    pub fn token_url(&self, tenant: &str) -> String {
        format!(
            "{}/{}/oauth2/v2.0/token",
            self.oauth.authority.trim_end_matches('/'),
            tenant
        )
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn test_config() -> Config {
        Config {
            app: AppConfig {
                name: "mgraph".into(),
                version: "0.1.0".into(),
            },
            oauth: OAuthConfig {
                client_id: "test-client".into(),
                tenant: "test-tenant".into(),
                authority: "https://login.microsoftonline.com".into(),
                scopes: ScopesConfig {
                    scopes: vec!["offline_access".into(), "User.Read".into()],
                },
            },
            api: ApiConfig {
                graph_base_url: "https://graph.microsoft.com/v1.0".into(),
            },
            store: StoreConfig {
                service: "msgraph".into(),
                default_profile: "default".into(),
            },
            logging: LoggingConfig {
                level: "info".into(),
            },
        }
    }

    #[test]
    fn test_config_parsing() {
        let result = toml::from_str::<Config>(CONFIG_TOML);
        assert!(result.is_ok(), "Config parsing failed: {:?}", result.err());
    }

    #[test]
    fn test_embedded_defaults_validate() {
        let config: Config = toml::from_str(CONFIG_TOML).unwrap();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_urls() {
        let config = test_config();

        assert_eq!(
            config.devicecode_url("test-tenant"),
            "https://login.microsoftonline.com/test-tenant/oauth2/v2.0/devicecode"
        );
        assert_eq!(
            config.token_url("common"),
            "https://login.microsoftonline.com/common/oauth2/v2.0/token"
        );
    }

    #[test]
    fn test_trailing_slash_authority() {
        let mut config = test_config();
        config.oauth.authority = "http://127.0.0.1:9999/".into();
        assert_eq!(
            config.token_url("common"),
            "http://127.0.0.1:9999/common/oauth2/v2.0/token"
        );
    }
}
