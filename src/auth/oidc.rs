//! OpenID Connect client for the Azure AD hybrid flow.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use rand::Rng;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use url::Url;

use super::id_token::{IdTokenValidator, ValidatedIdToken};
use super::jwks::{JwksCache, DEFAULT_JWKS_CACHE_TTL};
use super::metadata::MetadataManager;
use super::options::OpenIdConnectOptions;
use super::token_client::{CodeRedeemer, CodeRedemptionRequest};
use crate::error::AuthError;

/// Properties carried through the `state` parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthProperties {
    /// Local path to return to after sign-in.
    pub return_url: String,
    /// Must equal the correlation cookie set when the flow started.
    pub correlation: String,
}

impl AuthProperties {
    pub fn encode(&self) -> Result<String, AuthError> {
        let json = serde_json::to_vec(self)
            .map_err(|e| AuthError::InvalidIdToken(format!("state encoding failed: {}", e)))?;
        Ok(URL_SAFE_NO_PAD.encode(json))
    }

    pub fn decode(state: &str) -> Result<Self, AuthError> {
        let bytes = URL_SAFE_NO_PAD
            .decode(state.as_bytes())
            .map_err(|_| AuthError::CorrelationFailed)?;
        serde_json::from_slice(&bytes).map_err(|_| AuthError::CorrelationFailed)
    }
}

/// A started sign-in: where to send the browser and what to remember.
#[derive(Debug, Clone)]
pub struct Challenge {
    pub authorize_url: Url,
    pub correlation: String,
}

/// Random URL-safe secret for correlating the callback with the browser.
pub fn generate_correlation() -> String {
    let mut rng = rand::thread_rng();
    let bytes: [u8; 32] = rng.gen();
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Nonce sent to the provider, derived from the correlation secret.
pub fn correlation_nonce(correlation: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(correlation.as_bytes());
    URL_SAFE_NO_PAD.encode(hasher.finalize())
}

/// Accept only local paths as return URLs.
///
/// Browsers read `/\host` like `//host`, so a backslash in second position is
/// rejected along with any control character.
pub fn sanitize_return_url(url: Option<&str>) -> String {
    match url {
        Some(u) if is_local_path(u) => u.to_string(),
        _ => "/".to_string(),
    }
}

fn is_local_path(url: &str) -> bool {
    let mut chars = url.chars();
    chars.next() == Some('/')
        && !matches!(chars.next(), Some('/') | Some('\\'))
        && !url.contains("://")
        && !url.chars().any(char::is_control)
}

pub struct OidcClient {
    options: OpenIdConnectOptions,
    metadata: MetadataManager,
    validator: IdTokenValidator,
    redeemer: Arc<dyn CodeRedeemer>,
}

impl OidcClient {
    pub fn new(
        options: OpenIdConnectOptions,
        redeemer: Arc<dyn CodeRedeemer>,
        http_client: reqwest::Client,
    ) -> Self {
        let metadata = MetadataManager::new(
            options.metadata_address(),
            options.require_https_metadata,
            http_client.clone(),
        );
        let validator = IdTokenValidator::new(
            options.client_id.clone(),
            options.issuer_validation.clone(),
            JwksCache::new(DEFAULT_JWKS_CACHE_TTL, http_client),
        );

        Self {
            options,
            metadata,
            validator,
            redeemer,
        }
    }

    pub fn options(&self) -> &OpenIdConnectOptions {
        &self.options
    }

    /// Build the authorization request for a new sign-in.
    pub async fn challenge(
        &self,
        redirect_uri: &str,
        return_url: &str,
    ) -> Result<Challenge, AuthError> {
        let metadata = self.metadata.get().await?;

        let correlation = generate_correlation();
        let state = AuthProperties {
            return_url: return_url.to_string(),
            correlation: correlation.clone(),
        }
        .encode()?;

        let mut url = Url::parse(&metadata.authorization_endpoint)
            .map_err(|e| AuthError::MetadataFailed(format!("invalid authorize endpoint: {}", e)))?;

        url.query_pairs_mut()
            .append_pair("client_id", &self.options.client_id)
            .append_pair("response_type", self.options.response_type.as_str())
            .append_pair("response_mode", self.options.response_mode)
            .append_pair("redirect_uri", redirect_uri)
            .append_pair("scope", &self.options.scopes.join(" "))
            .append_pair("state", &state)
            .append_pair("nonce", &correlation_nonce(&correlation));

        Ok(Challenge {
            authorize_url: url,
            correlation,
        })
    }

    /// Validate the id token from the callback against the correlation secret
    /// and, in the hybrid flow, the code it was issued with.
    pub async fn validate_id_token(
        &self,
        id_token: &str,
        correlation: &str,
        code: Option<&str>,
    ) -> Result<ValidatedIdToken, AuthError> {
        let metadata = self.metadata.get().await?;
        self.validator
            .validate(
                id_token,
                &metadata.jwks_uri,
                &correlation_nonce(correlation),
                code,
            )
            .await
    }

    /// Redeem the code for the client itself when no hook has done it.
    pub async fn redeem_code(&self, code: &str, redirect_uri: &str) -> Result<(), AuthError> {
        self.redeemer
            .redeem(CodeRedemptionRequest {
                code: code.to_string(),
                redirect_uri: redirect_uri.to_string(),
                resource: None,
            })
            .await
            .map(|_| ())
    }
}
