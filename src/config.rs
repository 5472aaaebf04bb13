//! Configuration loading and management.
//!
//! Loads configuration from embedded config.toml with environment variable overrides.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::env;
use url::Url;

use crate::auth::options::AzureAdOptions;
use crate::directory::DirectoryConfig;
use crate::secure::SecureString;

/// Embedded configuration file content.
const CONFIG_TOML: &str = include_str!("../config.toml");

/// Placeholder shipped in config.toml.
const PLACEHOLDER_CLIENT_ID: &str = "YOUR_AZURE_AD_CLIENT_ID";

/// Root configuration structure.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub app: AppConfig,
    pub server: ServerConfig,
    pub azure_ad: AzureAdOptions,
    pub session: SessionConfig,
    pub token_cache: TokenCacheConfig,
    pub logging: LoggingConfig,
    #[serde(default)]
    pub directory: DirectoryConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub bind_addr: String,
    pub landing_path: String,
    pub home_path: String,
    pub error_path: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    pub cookie_name: String,
    pub secure_cookies: bool,
    /// Idle time after which a stored ticket is dropped.
    pub sliding_expiration_minutes: i64,
    /// Ticket lifetime when the provider's token lifetime is not used.
    pub default_lifetime_minutes: i64,
    pub sweep_interval_seconds: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TokenCacheConfig {
    pub sweep_interval_seconds: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

impl Config {
    /// Load configuration from embedded config.toml with environment variable overrides.
    pub fn load() -> Result<Self> {
        let mut config = Self::embedded()?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Parse the embedded config.toml without overrides or validation.
    pub fn embedded() -> Result<Self> {
        toml::from_str(CONFIG_TOML).context("Failed to parse embedded config.toml")
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(client_id) = env::var("AZUREAD_CLIENT_ID") {
            self.azure_ad.client_id = client_id;
        }

        if let Ok(secret) = env::var("AZUREAD_CLIENT_SECRET") {
            self.azure_ad.client_secret = SecureString::new(secret);
        }

        if let Ok(instance) = env::var("AZUREAD_INSTANCE") {
            self.azure_ad.instance = instance;
        }

        if let Ok(callback_path) = env::var("AZUREAD_CALLBACK_PATH") {
            self.azure_ad.callback_path = callback_path;
        }

        if let Ok(graph_api_uri) = env::var("AZUREAD_GRAPH_API_URI") {
            self.azure_ad.graph_api_uri = graph_api_uri;
        }

        if let Ok(bind_addr) = env::var("AZUREAD_BIND_ADDR") {
            self.server.bind_addr = bind_addr;
        }

        if let Ok(log_level) = env::var("RUST_LOG") {
            self.logging.level = log_level;
        }
    }

    /// Validate that required configuration is present and consistent.
    pub fn validate(&self) -> Result<()> {
        let ad = &self.azure_ad;

        if ad.client_id.is_empty() || ad.client_id == PLACEHOLDER_CLIENT_ID {
            anyhow::bail!(
                "Azure AD client_id not configured. Set AZUREAD_CLIENT_ID environment variable \
                 or update config.toml"
            );
        }

        if ad.client_secret.as_str().is_empty() {
            anyhow::bail!(
                "Azure AD client_secret not configured. Set AZUREAD_CLIENT_SECRET environment variable"
            );
        }

        let instance = Url::parse(&ad.instance)
            .with_context(|| format!("Azure AD instance is not a valid URL: {}", ad.instance))?;

        if ad.require_https_metadata && instance.scheme() != "https" {
            anyhow::bail!(
                "require_https_metadata is set but the authority {} is not HTTPS",
                ad.instance
            );
        }

        if !ad.callback_path.starts_with('/') {
            anyhow::bail!("callback_path must start with '/': {}", ad.callback_path);
        }

        if ad.validate_issuer && ad.allowed_issuers.is_empty() {
            anyhow::bail!("validate_issuer is set but allowed_issuers is empty");
        }

        if self.session.sliding_expiration_minutes <= 0 {
            anyhow::bail!("session.sliding_expiration_minutes must be positive");
        }

        Ok(())
    }
}
