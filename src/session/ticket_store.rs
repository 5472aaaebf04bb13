//! Ticket storage keyed by session id.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio::time;
use tracing::{debug, info};
use uuid::Uuid;

use super::AuthenticationTicket;
use crate::error::StoreError;

/// Server-side store for authentication tickets.
///
/// Reading an unknown key yields `None`. Writes create or replace.
#[async_trait]
pub trait TicketStore: Send + Sync {
    /// Store a new ticket and return its session id.
    async fn store(&self, ticket: AuthenticationTicket) -> Result<String, StoreError>;
    async fn renew(&self, key: &str, ticket: AuthenticationTicket) -> Result<(), StoreError>;
    async fn retrieve(&self, key: &str) -> Result<Option<AuthenticationTicket>, StoreError>;
    async fn remove(&self, key: &str) -> Result<(), StoreError>;
}

#[derive(Debug, Clone)]
struct Entry {
    ticket: AuthenticationTicket,
    last_access: DateTime<Utc>,
}

impl Entry {
    fn is_expired(&self, sliding: Duration, now: DateTime<Utc>) -> bool {
        self.ticket.expires_at <= now || self.last_access + sliding <= now
    }
}

/// In-process ticket store with absolute and sliding expiry.
#[derive(Debug)]
pub struct MemoryTicketStore {
    entries: RwLock<HashMap<String, Entry>>,
    sliding_expiration: Duration,
}

impl MemoryTicketStore {
    pub fn new(sliding_expiration: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            sliding_expiration,
        }
    }

    pub async fn session_count(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Drop every expired entry. Returns how many were removed.
    pub async fn purge_expired(&self) -> usize {
        let now = Utc::now();
        let sliding = self.sliding_expiration;
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired(sliding, now));
        before - entries.len()
    }

    /// Periodically purge expired tickets in the background.
    pub fn spawn_sweeper(self: Arc<Self>, interval: std::time::Duration) {
        tokio::spawn(async move {
            let mut ticker = time::interval(interval);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let removed = self.purge_expired().await;
                if removed > 0 {
                    info!(removed, "Purged expired sessions");
                }
            }
        });
    }

    async fn insert(&self, key: String, ticket: AuthenticationTicket) {
        let entry = Entry {
            ticket,
            last_access: Utc::now(),
        };
        self.entries.write().await.insert(key, entry);
    }
}

#[async_trait]
impl TicketStore for MemoryTicketStore {
    async fn store(&self, ticket: AuthenticationTicket) -> Result<String, StoreError> {
        let key = Uuid::new_v4().to_string();
        self.insert(key.clone(), ticket).await;
        debug!("Session ticket stored");
        Ok(key)
    }

    async fn renew(&self, key: &str, ticket: AuthenticationTicket) -> Result<(), StoreError> {
        self.insert(key.to_string(), ticket).await;
        Ok(())
    }

    async fn retrieve(&self, key: &str) -> Result<Option<AuthenticationTicket>, StoreError> {
        let now = Utc::now();
        let mut entries = self.entries.write().await;

        let Some(entry) = entries.get_mut(key) else {
            return Ok(None);
        };

        if entry.is_expired(self.sliding_expiration, now) {
            debug!("Session ticket expired, removing");
            entries.remove(key);
            return Ok(None);
        }

        entry.last_access = now;
        Ok(Some(entry.ticket.clone()))
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.entries.write().await.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::claims::Principal;

    fn ticket(expires_in: Duration) -> AuthenticationTicket {
        AuthenticationTicket {
            principal: Principal::anonymous(),
            issued_at: Utc::now(),
            expires_at: Utc::now() + expires_in,
            return_url: "/".into(),
        }
    }

    #[tokio::test]
    async fn test_store_and_retrieve() {
        let store = MemoryTicketStore::new(Duration::minutes(60));
        let key = store.store(ticket(Duration::hours(1))).await.unwrap();

        assert!(store.retrieve(&key).await.unwrap().is_some());
        assert!(store.retrieve("unknown").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_keys_are_unique() {
        let store = MemoryTicketStore::new(Duration::minutes(60));
        let a = store.store(ticket(Duration::hours(1))).await.unwrap();
        let b = store.store(ticket(Duration::hours(1))).await.unwrap();
        assert_ne!(a, b);
        assert_eq!(store.session_count().await, 2);
    }

    #[tokio::test]
    async fn test_renew_replaces_ticket() {
        let store = MemoryTicketStore::new(Duration::minutes(60));
        let key = store.store(ticket(Duration::hours(1))).await.unwrap();

        let mut renewed = ticket(Duration::hours(2));
        renewed.return_url = "/Index".into();
        store.renew(&key, renewed).await.unwrap();

        let got = store.retrieve(&key).await.unwrap().unwrap();
        assert_eq!(got.return_url, "/Index");
    }

    #[tokio::test]
    async fn test_absolute_expiry() {
        let store = MemoryTicketStore::new(Duration::minutes(60));
        let key = store.store(ticket(Duration::seconds(-1))).await.unwrap();

        assert!(store.retrieve(&key).await.unwrap().is_none());
        assert_eq!(store.session_count().await, 0);
    }

    #[tokio::test]
    async fn test_sliding_expiry() {
        let store = MemoryTicketStore::new(Duration::zero());
        let key = store.store(ticket(Duration::hours(1))).await.unwrap();

        assert!(store.retrieve(&key).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_remove_and_purge() {
        let store = MemoryTicketStore::new(Duration::minutes(60));
        let live = store.store(ticket(Duration::hours(1))).await.unwrap();
        let gone = store.store(ticket(Duration::hours(1))).await.unwrap();
        store.store(ticket(Duration::seconds(-1))).await.unwrap();

        store.remove(&gone).await.unwrap();
        assert_eq!(store.purge_expired().await, 1);
        assert_eq!(store.session_count().await, 1);
        assert!(store.retrieve(&live).await.unwrap().is_some());
    }
}
