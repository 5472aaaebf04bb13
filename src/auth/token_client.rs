//! Authorization code redemption against the Azure AD token endpoint.

use async_trait::async_trait;
use serde::{Deserialize, Deserializer};
use std::time::Duration;

use crate::error::AuthError;
use crate::secure::SecureString;

/// HTTP request timeout.
pub const HTTP_TIMEOUT: Duration = Duration::from_secs(30);
/// HTTP connection timeout.
pub const HTTP_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Build the outbound HTTP client shared by the authentication components.
pub fn build_http_client() -> Result<reqwest::Client, reqwest::Error> {
    reqwest::Client::builder()
        .timeout(HTTP_TIMEOUT)
        .connect_timeout(HTTP_CONNECT_TIMEOUT)
        .redirect(reqwest::redirect::Policy::none())
        .build()
}

/// Parameters of a confidential-client code redemption.
#[derive(Debug, Clone)]
pub struct CodeRedemptionRequest {
    pub code: String,
    pub redirect_uri: String,
    /// Resource the access token is requested for. `None` redeems for the client itself.
    pub resource: Option<String>,
}

/// Token response from Azure AD.
#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
    #[serde(deserialize_with = "number_or_string")]
    pub expires_in: u64,
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub resource: Option<String>,
    #[serde(default)]
    pub id_token: Option<String>,
}

/// The v1 endpoint sends numeric fields as strings.
fn number_or_string<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(u64),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Number(n) => Ok(n),
        Raw::Text(s) => s.parse().map_err(serde::de::Error::custom),
    }
}

/// Exchanges authorization codes for tokens.
#[async_trait]
pub trait CodeRedeemer: Send + Sync {
    async fn redeem(&self, request: CodeRedemptionRequest) -> Result<TokenResponse, AuthError>;
}

/// Client-credential code redemption at `{authority}oauth2/token`.
pub struct AzureTokenClient {
    client_id: String,
    client_secret: SecureString,
    token_endpoint: String,
    http_client: reqwest::Client,
}

impl AzureTokenClient {
    pub fn new(
        client_id: String,
        client_secret: SecureString,
        authority: &str,
        http_client: reqwest::Client,
    ) -> Self {
        Self {
            client_id,
            client_secret,
            token_endpoint: token_endpoint(authority),
            http_client,
        }
    }
}

/// Token endpoint of an authority, e.g. `https://login.microsoftonline.com/common/oauth2/token`.
pub fn token_endpoint(authority: &str) -> String {
    format!("{}/oauth2/token", authority.trim_end_matches('/'))
}

#[async_trait]
impl CodeRedeemer for AzureTokenClient {
    async fn redeem(&self, request: CodeRedemptionRequest) -> Result<TokenResponse, AuthError> {
        let mut params = vec![
            ("grant_type", "authorization_code"),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("code", request.code.as_str()),
            ("redirect_uri", request.redirect_uri.as_str()),
        ];
        if let Some(resource) = request.resource.as_deref() {
            params.push(("resource", resource));
        }

        let response = self
            .http_client
            .post(&self.token_endpoint)
            .form(&params)
            .send()
            .await
            .map_err(|e| AuthError::TokenExchangeFailed(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            // Log error details for debugging (doesn't expose to user)
            let error_body = response.text().await.unwrap_or_default();
            tracing::error!("Token exchange failed: HTTP {} - {}", status, error_body);
            return Err(AuthError::TokenExchangeFailed(format!(
                "HTTP {}",
                status.as_u16()
            )));
        }

        response
            .json()
            .await
            .map_err(|e| AuthError::TokenExchangeFailed(e.to_string()))
    }
}
