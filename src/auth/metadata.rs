//! OpenID provider metadata discovery.

use serde::{Deserialize, Serialize};
use tokio::sync::OnceCell;
use tracing::{info, warn};
use url::Url;

use crate::error::AuthError;

/// Endpoints published in the provider's discovery document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderMetadata {
    pub issuer: String,
    pub authorization_endpoint: String,
    pub token_endpoint: String,
    pub jwks_uri: String,
    #[serde(default)]
    pub end_session_endpoint: Option<String>,
}

/// Fetches the discovery document once and keeps it for the process lifetime.
pub struct MetadataManager {
    address: String,
    require_https: bool,
    http_client: reqwest::Client,
    cached: OnceCell<ProviderMetadata>,
}

impl MetadataManager {
    pub fn new(address: String, require_https: bool, http_client: reqwest::Client) -> Self {
        Self {
            address,
            require_https,
            http_client,
            cached: OnceCell::new(),
        }
    }

    /// Get the provider metadata, fetching it on first use.
    pub async fn get(&self) -> Result<&ProviderMetadata, AuthError> {
        self.cached.get_or_try_init(|| self.fetch()).await
    }

    async fn fetch(&self) -> Result<ProviderMetadata, AuthError> {
        let url = Url::parse(&self.address)
            .map_err(|e| AuthError::MetadataFailed(format!("invalid address: {}", e)))?;

        if self.require_https && url.scheme() != "https" {
            return Err(AuthError::MetadataFailed(format!(
                "metadata address must use HTTPS: {}",
                self.address
            )));
        }

        if url.scheme() != "https" {
            warn!(address = %self.address, "Fetching provider metadata over plain HTTP");
        }

        let response = self
            .http_client
            .get(url)
            .send()
            .await
            .map_err(|e| AuthError::MetadataFailed(e.to_string()))?;

        if !response.status().is_success() {
            return Err(AuthError::MetadataFailed(format!(
                "HTTP {}",
                response.status().as_u16()
            )));
        }

        let metadata: ProviderMetadata = response
            .json()
            .await
            .map_err(|e| AuthError::MetadataFailed(e.to_string()))?;

        info!(
            issuer = %metadata.issuer,
            authorization_endpoint = %metadata.authorization_endpoint,
            "Provider metadata loaded"
        );

        Ok(metadata)
    }
}
