//! Per-user token cache keyed by the user's object id.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio::time;
use tracing::{debug, info};

use super::token_client::TokenResponse;
use crate::error::StoreError;
use crate::secure::SecureString;

/// Tokens redeemed for one user.
#[derive(Debug, Clone)]
pub struct CachedToken {
    pub access_token: SecureString,
    pub refresh_token: Option<SecureString>,
    pub resource: Option<String>,
    pub expires_at: DateTime<Utc>,
}

impl CachedToken {
    pub fn from_response(response: TokenResponse) -> Self {
        let expires_at = Utc::now() + Duration::seconds(response.expires_in as i64);
        Self {
            access_token: SecureString::new(response.access_token),
            refresh_token: response.refresh_token.map(SecureString::new),
            resource: response.resource,
            expires_at,
        }
    }

    pub fn is_expired(&self) -> bool {
        self.expires_at <= Utc::now()
    }
}

/// Token storage keyed by an opaque string (the user object id).
#[async_trait]
pub trait TokenCache: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<CachedToken>, StoreError>;
    async fn set(&self, key: &str, token: CachedToken) -> Result<(), StoreError>;
    async fn remove(&self, key: &str) -> Result<(), StoreError>;
}

/// In-process token cache. Entries expire with their access token.
#[derive(Debug, Default)]
pub struct MemoryTokenCache {
    entries: RwLock<HashMap<String, CachedToken>>,
}

impl MemoryTokenCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop every expired entry. Returns how many were removed.
    pub async fn purge_expired(&self) -> usize {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, token| !token.is_expired());
        before - entries.len()
    }

    /// Periodically purge expired entries in the background.
    pub fn spawn_sweeper(self: Arc<Self>, interval: std::time::Duration) {
        tokio::spawn(async move {
            let mut ticker = time::interval(interval);
            // First tick fires immediately
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let removed = self.purge_expired().await;
                if removed > 0 {
                    info!(removed, "Purged expired cached tokens");
                }
            }
        });
    }
}

#[async_trait]
impl TokenCache for MemoryTokenCache {
    async fn get(&self, key: &str) -> Result<Option<CachedToken>, StoreError> {
        {
            let entries = self.entries.read().await;
            match entries.get(key) {
                Some(token) if !token.is_expired() => return Ok(Some(token.clone())),
                Some(_) => {}
                None => return Ok(None),
            }
        }

        // A concurrent set may have replaced the entry since the read lock was released
        let mut entries = self.entries.write().await;
        match entries.get(key) {
            Some(token) if !token.is_expired() => Ok(Some(token.clone())),
            Some(_) => {
                debug!("Cached token expired, removing");
                entries.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, token: CachedToken) -> Result<(), StoreError> {
        self.entries.write().await.insert(key.to_string(), token);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.entries.write().await.remove(key);
        Ok(())
    }
}

/// Calculate the remaining time until token expiry.
pub fn time_until_expiry(expires_at: DateTime<Utc>) -> Option<Duration> {
    let now = Utc::now();

    if expires_at > now {
        Some(expires_at - now)
    } else {
        None
    }
}

/// Format duration as human-readable string (e.g., "45 min", "1 hour").
pub fn format_duration(duration: Duration) -> String {
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
