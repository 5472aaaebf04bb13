//! Tenant and user directory.
//!
//! The sign-in gate only reads from the directory: a session is allowed when the
//! principal's tenant has been onboarded or the user has been provisioned
//! individually. Persistence sits behind the repository traits.

pub mod memory;
pub mod models;

use async_trait::async_trait;
use serde::Deserialize;
use uuid::Uuid;

use crate::error::DirectoryError;

pub use memory::InMemoryDirectory;
pub use models::{Tenant, User};

/// Lookup of onboarded tenants.
#[async_trait]
pub trait TenantRepository: Send + Sync {
    async fn get_by_tenant_id(&self, tenant_id: Uuid) -> Result<Option<Tenant>, DirectoryError>;
}

/// Lookup of individually provisioned users.
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn get_by_upn_and_tenant_id(
        &self,
        upn: &str,
        tenant_id: Uuid,
    ) -> Result<Option<User>, DirectoryError>;
}

/// Seed data for the in-memory directory, read from the `[directory]` table.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DirectoryConfig {
    #[serde(default)]
    pub tenants: Vec<Tenant>,
    #[serde(default)]
    pub users: Vec<User>,
}
