//! JWKS caching for id token signature verification.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::error::AuthError;

/// Signing keys are refreshed at least once a day.
pub const DEFAULT_JWKS_CACHE_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Unknown key ids trigger at most one refresh per interval.
pub const MIN_JWKS_REFRESH_INTERVAL: Duration = Duration::from_secs(5 * 60);

/// A JSON Web Key as published by Azure AD.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Jwk {
    pub kty: String,
    #[serde(default)]
    pub kid: Option<String>,
    #[serde(default, rename = "use")]
    pub key_use: Option<String>,
    #[serde(default)]
    pub n: Option<String>,
    #[serde(default)]
    pub e: Option<String>,
}

impl Jwk {
    fn is_rsa_signing_key(&self) -> bool {
        self.kty == "RSA"
            && self.n.is_some()
            && self.e.is_some()
            && self.key_use.as_deref().map_or(true, |u| u == "sig")
    }
}

/// A JSON Web Key Set.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JwkSet {
    pub keys: Vec<Jwk>,
}

impl JwkSet {
    /// Find the RSA signing key with the given key id.
    pub fn find_signing_key(&self, kid: &str) -> Option<&Jwk> {
        self.keys
            .iter()
            .find(|k| k.kid.as_deref() == Some(kid) && k.is_rsa_signing_key())
    }
}

#[derive(Debug, Clone)]
struct CachedJwks {
    keys: JwkSet,
    fetched_at: Instant,
}

/// Caches key sets by JWKS URI.
#[derive(Clone)]
pub struct JwksCache {
    cache: Arc<RwLock<HashMap<String, CachedJwks>>>,
    ttl: Duration,
    refresh_interval: Duration,
    http_client: reqwest::Client,
}

impl JwksCache {
    pub fn new(ttl: Duration, http_client: reqwest::Client) -> Self {
        Self {
            cache: Arc::new(RwLock::new(HashMap::new())),
            ttl,
            refresh_interval: MIN_JWKS_REFRESH_INTERVAL,
            http_client,
        }
    }

    pub fn with_refresh_interval(mut self, refresh_interval: Duration) -> Self {
        self.refresh_interval = refresh_interval;
        self
    }

    /// Get keys from cache or fetch them from the JWKS URI.
    pub async fn get_keys(&self, jwks_uri: &str) -> Result<JwkSet, AuthError> {
        {
            let cache = self.cache.read().await;
            if let Some(cached) = cache.get(jwks_uri) {
                if cached.fetched_at.elapsed() < self.ttl {
                    debug!(jwks_uri = %jwks_uri, "JWKS cache hit");
                    return Ok(cached.keys.clone());
                }
            }
        }

        debug!(jwks_uri = %jwks_uri, "JWKS cache miss, fetching");
        self.fetch_and_cache(jwks_uri).await
    }

    /// Find a signing key by kid. An unknown kid forces a refresh to pick up
    /// rotated keys, unless the set was fetched within the refresh interval.
    pub async fn find_signing_key(&self, jwks_uri: &str, kid: &str) -> Result<Jwk, AuthError> {
        if let Some(key) = self.get_keys(jwks_uri).await?.find_signing_key(kid) {
            return Ok(key.clone());
        }

        if self.refreshed_recently(jwks_uri).await {
            debug!(jwks_uri = %jwks_uri, kid = %kid, "Unknown kid, JWKS refreshed recently");
            return Err(unknown_kid(kid));
        }

        info!(jwks_uri = %jwks_uri, kid = %kid, "Signing key not cached, refreshing JWKS");
        self.fetch_and_cache(jwks_uri)
            .await?
            .find_signing_key(kid)
            .cloned()
            .ok_or_else(|| unknown_kid(kid))
    }

    async fn refreshed_recently(&self, jwks_uri: &str) -> bool {
        self.cache
            .read()
            .await
            .get(jwks_uri)
            .is_some_and(|c| c.fetched_at.elapsed() < self.refresh_interval)
    }

    async fn fetch_and_cache(&self, jwks_uri: &str) -> Result<JwkSet, AuthError> {
        let response = self
            .http_client
            .get(jwks_uri)
            .send()
            .await
            .map_err(|e| AuthError::MetadataFailed(format!("JWKS fetch failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(AuthError::MetadataFailed(format!(
                "JWKS fetch failed: HTTP {}",
                response.status().as_u16()
            )));
        }

        let keys: JwkSet = response
            .json()
            .await
            .map_err(|e| AuthError::MetadataFailed(format!("invalid JWKS: {}", e)))?;

        info!(jwks_uri = %jwks_uri, key_count = keys.keys.len(), "JWKS fetched");

        self.cache.write().await.insert(
            jwks_uri.to_string(),
            CachedJwks {
                keys: keys.clone(),
                fetched_at: Instant::now(),
            },
        );

        Ok(keys)
    }
}

fn unknown_kid(kid: &str) -> AuthError {
    AuthError::InvalidIdToken(format!("no signing key for kid {}", kid))
}
