//! Claims principal built from a validated id token.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::error::AuthError;

/// Object identifier of the user in its home tenant.
pub const OBJECT_ID: &str = "oid";
/// Tenant the user signed in from.
pub const TENANT_ID: &str = "tid";
/// Display name.
pub const NAME: &str = "name";

/// Claims that can carry the user principal name, in order of preference.
const UPN_CLAIMS: [&str; 4] = ["unique_name", "upn", "preferred_username", NAME];

/// Authentication type recorded for principals signed in through Azure AD.
pub const AUTHENTICATION_TYPE: &str = "AzureAD";

/// A single claim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claim {
    pub claim_type: String,
    pub value: String,
}

/// The caller's identity.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Principal {
    authentication_type: Option<String>,
    claims: Vec<Claim>,
}

impl Principal {
    /// A caller that has not signed in.
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// Flatten the payload of an id token into claims.
    ///
    /// Array values become one claim per element. Nested objects are kept as JSON text.
    pub fn from_token_claims(authentication_type: &str, payload: &Map<String, Value>) -> Self {
        let mut claims = Vec::with_capacity(payload.len());

        for (claim_type, value) in payload {
            match value {
                Value::Array(items) => {
                    for item in items {
                        claims.push(Claim {
                            claim_type: claim_type.clone(),
                            value: claim_value(item),
                        });
                    }
                }
                Value::Null => {}
                other => claims.push(Claim {
                    claim_type: claim_type.clone(),
                    value: claim_value(other),
                }),
            }
        }

        Self {
            authentication_type: Some(authentication_type.to_string()),
            claims,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.authentication_type.is_some()
    }

    pub fn authentication_type(&self) -> Option<&str> {
        self.authentication_type.as_deref()
    }

    pub fn claims(&self) -> &[Claim] {
        &self.claims
    }

    /// Value of the first claim of the given type.
    pub fn find_first(&self, claim_type: &str) -> Option<&str> {
        self.claims
            .iter()
            .find(|c| c.claim_type == claim_type)
            .map(|c| c.value.as_str())
    }

    /// The user's object identifier, the key of the per-user token cache.
    pub fn object_id(&self) -> Result<&str, AuthError> {
        self.find_first(OBJECT_ID)
            .filter(|v| !v.is_empty())
            .ok_or(AuthError::MissingClaim(OBJECT_ID))
    }

    /// The user principal name.
    pub fn upn(&self) -> Result<&str, AuthError> {
        UPN_CLAIMS
            .iter()
            .find_map(|claim| self.find_first(claim).filter(|v| !v.is_empty()))
            .ok_or(AuthError::MissingClaim("upn"))
    }

    /// The tenant id claim parsed as a UUID.
    pub fn tenant_id(&self) -> Result<Uuid, AuthError> {
        let raw = self
            .find_first(TENANT_ID)
            .ok_or(AuthError::MissingClaim(TENANT_ID))?;

        Uuid::parse_str(raw).map_err(|_| AuthError::MalformedClaim {
            claim: TENANT_ID,
            value: raw.to_string(),
        })
    }

    /// Best available name for display.
    pub fn display_name(&self) -> String {
        self.find_first(NAME)
            .map(str::to_string)
            .or_else(|| self.upn().ok().map(str::to_string))
            .unwrap_or_else(|| "Unknown User".to_string())
    }
}

fn claim_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
