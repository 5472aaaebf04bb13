//! In-memory directory seeded from configuration.

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use super::{DirectoryConfig, Tenant, TenantRepository, User, UserRepository};
use crate::error::DirectoryError;

/// Tenant and user repository backed by process memory.
#[derive(Debug, Default)]
pub struct InMemoryDirectory {
    tenants: RwLock<HashMap<Uuid, Tenant>>,
    users: RwLock<Vec<User>>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a directory holding the configured tenants and users.
    pub fn from_config(config: &DirectoryConfig) -> Self {
        let tenants = config
            .tenants
            .iter()
            .map(|t| (t.tenant_id, t.clone()))
            .collect();

        Self {
            tenants: RwLock::new(tenants),
            users: RwLock::new(config.users.clone()),
        }
    }

    pub async fn add_tenant(&self, tenant: Tenant) {
        self.tenants.write().await.insert(tenant.tenant_id, tenant);
    }

    pub async fn add_user(&self, user: User) {
        self.users.write().await.push(user);
    }

    pub async fn tenant_count(&self) -> usize {
        self.tenants.read().await.len()
    }

    pub async fn user_count(&self) -> usize {
        self.users.read().await.len()
    }
}

#[async_trait]
impl TenantRepository for InMemoryDirectory {
    async fn get_by_tenant_id(&self, tenant_id: Uuid) -> Result<Option<Tenant>, DirectoryError> {
        let tenant = self.tenants.read().await.get(&tenant_id).cloned();
        debug!(%tenant_id, found = tenant.is_some(), "Tenant lookup");
        Ok(tenant)
    }
}

#[async_trait]
impl UserRepository for InMemoryDirectory {
    async fn get_by_upn_and_tenant_id(
        &self,
        upn: &str,
        tenant_id: Uuid,
    ) -> Result<Option<User>, DirectoryError> {
        let user = self
            .users
            .read()
            .await
            .iter()
            .find(|u| u.matches(upn, tenant_id))
            .cloned();
        debug!(%tenant_id, found = user.is_some(), "User lookup");
        Ok(user)
    }
}
