//! Directory records.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An onboarded Azure AD tenant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tenant {
    pub tenant_id: Uuid,
    pub name: String,
}

/// A user provisioned in a tenant that is not onboarded as a whole.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// User Principal Name, the login identifier.
    pub upn: String,
    pub tenant_id: Uuid,
    #[serde(default)]
    pub display_name: Option<String>,
}

impl User {
    /// UPNs compare case-insensitively in Azure AD.
    pub fn matches(&self, upn: &str, tenant_id: Uuid) -> bool {
        self.tenant_id == tenant_id && self.upn.eq_ignore_ascii_case(upn)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_matches_case_insensitive_upn() {
        let tenant_id = Uuid::new_v4();
        let user = User {
            upn: "Alice@Example.com".into(),
            tenant_id,
            display_name: None,
        };

        assert!(user.matches("alice@example.com", tenant_id));
        assert!(!user.matches("alice@example.com", Uuid::new_v4()));
        assert!(!user.matches("bob@example.com", tenant_id));
    }

    #[test]
    fn test_directory_seed_parsing() {
        let seed: crate::directory::DirectoryConfig = toml::from_str(
            r#"
            [[tenants]]
            tenant_id = "11111111-1111-1111-1111-111111111111"
            name = "Contoso"

            [[users]]
            upn = "alice@example.com"
            tenant_id = "22222222-2222-2222-2222-222222222222"
            "#,
        )
        .unwrap();

        assert_eq!(seed.tenants.len(), 1);
        assert_eq!(seed.tenants[0].name, "Contoso");
        assert_eq!(seed.users[0].display_name, None);
    }
}
