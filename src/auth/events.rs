//! Sign-in transition hooks.
//!
//! The callback handler drives the OpenID Connect response through fixed points
//! and calls into [`OidcEvents`] at each one:
//!
//! 1. the id token has been validated → [`OidcEvents::on_code_received`]
//! 2. the code is redeemed → [`OidcEvents::on_validated`]
//! 3. any protocol failure along the way → [`OidcEvents::on_failure`]

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{info, warn};

use super::claims::Principal;
use super::options::AzureAdOptions;
use super::token_cache::{CachedToken, TokenCache};
use super::token_client::{CodeRedeemer, CodeRedemptionRequest};
use crate::directory::{TenantRepository, UserRepository};
use crate::error::AuthError;

/// What the handler does after a failed sign-in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureOutcome {
    /// Send the browser here. The failure is considered handled.
    Redirect(String),
    /// Let the error propagate.
    Unhandled,
}

/// Whether the hook already redeemed the authorization code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodeRedemption {
    Handled,
    NotHandled,
}

/// Scheme and host of the inbound callback request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestOrigin {
    pub scheme: String,
    pub host: String,
}

impl RequestOrigin {
    pub fn url(&self, path: &str) -> String {
        format!("{}://{}{}", self.scheme, self.host, path)
    }
}

/// Data available when the authorization code arrives.
pub struct CodeReceivedContext<'a> {
    pub principal: &'a Principal,
    pub code: &'a str,
    pub origin: &'a RequestOrigin,
}

#[async_trait]
pub trait OidcEvents: Send + Sync {
    fn on_failure(&self, error: &AuthError) -> FailureOutcome;

    async fn on_code_received(
        &self,
        context: CodeReceivedContext<'_>,
    ) -> Result<CodeRedemption, AuthError>;

    async fn on_validated(&self, principal: &Principal) -> Result<(), AuthError>;
}

/// Multitenant Azure AD sign-in policy.
pub struct AzureAdEvents {
    options: Arc<AzureAdOptions>,
    tenants: Arc<dyn TenantRepository>,
    users: Arc<dyn UserRepository>,
    redeemer: Arc<dyn CodeRedeemer>,
    token_cache: Arc<dyn TokenCache>,
    error_path: String,
}

impl AzureAdEvents {
    pub fn new(
        options: Arc<AzureAdOptions>,
        tenants: Arc<dyn TenantRepository>,
        users: Arc<dyn UserRepository>,
        redeemer: Arc<dyn CodeRedeemer>,
        token_cache: Arc<dyn TokenCache>,
        error_path: String,
    ) -> Self {
        Self {
            options,
            tenants,
            users,
            redeemer,
            token_cache,
            error_path,
        }
    }
}

#[async_trait]
impl OidcEvents for AzureAdEvents {
    fn on_failure(&self, error: &AuthError) -> FailureOutcome {
        warn!(error = %error, "Authentication failed, redirecting to error page");
        FailureOutcome::Redirect(self.error_path.clone())
    }

    async fn on_code_received(
        &self,
        context: CodeReceivedContext<'_>,
    ) -> Result<CodeRedemption, AuthError> {
        let object_id = context.principal.object_id()?;

        let response = self
            .redeemer
            .redeem(CodeRedemptionRequest {
                code: context.code.to_string(),
                redirect_uri: context.origin.url(&self.options.callback_path),
                resource: Some(self.options.graph_api_uri.clone()),
            })
            .await?;

        let token = CachedToken::from_response(response);
        info!(expires_at = %token.expires_at, "Graph token acquired and cached");
        self.token_cache.set(object_id, token).await?;

        Ok(CodeRedemption::Handled)
    }

    async fn on_validated(&self, principal: &Principal) -> Result<(), AuthError> {
        let upn = principal.upn()?;
        let tenant_id = principal.tenant_id()?;

        let (tenant, user) = tokio::join!(
            self.tenants.get_by_tenant_id(tenant_id),
            self.users.get_by_upn_and_tenant_id(upn, tenant_id),
        );
        let (tenant, user) = (tenant?, user?);

        // Neither the tenant nor the user has been onboarded
        if tenant.is_none() && user.is_none() {
            warn!(%tenant_id, "Sign-in denied: tenant not onboarded and user unknown");
            return Err(AuthError::SecurityTokenValidation(format!(
                "tenant {} is not onboarded",
                tenant_id
            )));
        }

        info!(
            %tenant_id,
            tenant_onboarded = tenant.is_some(),
            user_provisioned = user.is_some(),
            "Sign-in authorized"
        );
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::auth::options::tests::azure_options;
    use crate::auth::testing::{TEST_OID, TEST_TENANT, TEST_UPN};
    use crate::auth::token_cache::MemoryTokenCache;
    use crate::auth::token_client::TokenResponse;
    use crate::directory::{InMemoryDirectory, Tenant, User};
    use crate::error::DirectoryError;
    use serde_json::json;
    use std::sync::Mutex;
    use uuid::Uuid;

    /// Records redemption requests and answers with a fixed token.
    #[derive(Default)]
    pub(crate) struct RecordingRedeemer {
        pub requests: Mutex<Vec<CodeRedemptionRequest>>,
    }

    #[async_trait]
    impl CodeRedeemer for RecordingRedeemer {
        async fn redeem(
            &self,
            request: CodeRedemptionRequest,
        ) -> Result<TokenResponse, AuthError> {
            self.requests.lock().unwrap().push(request);
            Ok(TokenResponse {
                access_token: "graph-token".into(),
                token_type: "Bearer".into(),
                expires_in: 3600,
                refresh_token: None,
                resource: Some("https://graph.microsoft.com".into()),
                id_token: None,
            })
        }
    }

    struct FailingDirectory;

    #[async_trait]
    impl TenantRepository for FailingDirectory {
        async fn get_by_tenant_id(&self, _: Uuid) -> Result<Option<Tenant>, DirectoryError> {
            Err(DirectoryError::Unavailable("connection refused".into()))
        }
    }

    #[async_trait]
    impl UserRepository for FailingDirectory {
        async fn get_by_upn_and_tenant_id(
            &self,
            _: &str,
            _: Uuid,
        ) -> Result<Option<User>, DirectoryError> {
            Ok(None)
        }
    }

    fn principal(payload: serde_json::Value) -> Principal {
        Principal::from_token_claims("AzureAD", payload.as_object().unwrap())
    }

    fn alice() -> Principal {
        principal(json!({ "oid": TEST_OID, "tid": TEST_TENANT, "unique_name": TEST_UPN }))
    }

    fn events_with(
        tenants: Arc<dyn TenantRepository>,
        users: Arc<dyn UserRepository>,
    ) -> Fixture {
        let redeemer = Arc::new(RecordingRedeemer::default());
        let cache = Arc::new(MemoryTokenCache::new());
        let events = AzureAdEvents::new(
            Arc::new(azure_options()),
            tenants,
            users,
            redeemer.clone(),
            cache.clone(),
            "/Error".into(),
        );
        (events, redeemer, cache)
    }

    type Fixture = (AzureAdEvents, Arc<RecordingRedeemer>, Arc<MemoryTokenCache>);

    fn events(directory: Arc<InMemoryDirectory>) -> Fixture {
        events_with(directory.clone(), directory)
    }

    #[test]
    fn test_on_failure_redirects_to_error_page() {
        let (events, _, _) = events(Arc::new(InMemoryDirectory::new()));
        let outcome = events.on_failure(&AuthError::CorrelationFailed);
        assert_eq!(outcome, FailureOutcome::Redirect("/Error".into()));
    }

    #[tokio::test]
    async fn test_denied_when_tenant_and_user_unknown() {
        let (events, _, _) = events(Arc::new(InMemoryDirectory::new()));

        let result = events.on_validated(&alice()).await;
        assert!(matches!(result, Err(AuthError::SecurityTokenValidation(_))));
    }

    #[tokio::test]
    async fn test_allowed_when_tenant_onboarded() {
        let directory = Arc::new(InMemoryDirectory::new());
        directory
            .add_tenant(Tenant {
                tenant_id: TEST_TENANT.parse().unwrap(),
                name: "Contoso".into(),
            })
            .await;
        let (events, _, _) = events(directory);

        assert!(events.on_validated(&alice()).await.is_ok());
    }

    #[tokio::test]
    async fn test_allowed_when_only_user_provisioned() {
        let directory = Arc::new(InMemoryDirectory::new());
        directory
            .add_user(User {
                upn: TEST_UPN.into(),
                tenant_id: TEST_TENANT.parse().unwrap(),
                display_name: None,
            })
            .await;
        let (events, _, _) = events(directory);

        assert!(events.on_validated(&alice()).await.is_ok());
    }

    #[tokio::test]
    async fn test_malformed_tenant_claim_propagates() {
        let (events, _, _) = events(Arc::new(InMemoryDirectory::new()));
        let p = principal(json!({ "tid": "nope", "unique_name": TEST_UPN }));

        let result = events.on_validated(&p).await;
        assert!(matches!(result, Err(AuthError::MalformedClaim { .. })));
    }

    #[tokio::test]
    async fn test_lookup_failure_propagates() {
        let failing = Arc::new(FailingDirectory);
        let (events, _, _) = events_with(failing.clone(), failing);

        let result = events.on_validated(&alice()).await;
        assert!(matches!(result, Err(AuthError::Lookup(ref m)) if m.contains("connection refused")));
    }

    #[tokio::test]
    async fn test_code_redeemed_and_cached_by_object_id() {
        let (events, redeemer, cache) = events(Arc::new(InMemoryDirectory::new()));
        let origin = RequestOrigin {
            scheme: "https".into(),
            host: "app.example.com".into(),
        };

        let outcome = events
            .on_code_received(CodeReceivedContext {
                principal: &alice(),
                code: "auth-code",
                origin: &origin,
            })
            .await
            .unwrap();

        assert_eq!(outcome, CodeRedemption::Handled);

        let requests = redeemer.requests.lock().unwrap().clone();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].code, "auth-code");
        assert_eq!(requests[0].redirect_uri, "https://app.example.com/signin-oidc");
        assert_eq!(requests[0].resource.as_deref(), Some("https://graph.microsoft.com"));

        let cached = cache.get(TEST_OID).await.unwrap().unwrap();
        assert_eq!(cached.access_token.as_str(), "graph-token");
        assert!(cache.get("someone-else").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_code_received_requires_object_id() {
        let (events, redeemer, _) = events(Arc::new(InMemoryDirectory::new()));
        let origin = RequestOrigin {
            scheme: "http".into(),
            host: "localhost".into(),
        };
        let p = principal(json!({ "tid": TEST_TENANT }));

        let result = events
            .on_code_received(CodeReceivedContext {
                principal: &p,
                code: "auth-code",
                origin: &origin,
            })
            .await;

        assert!(matches!(result, Err(AuthError::MissingClaim("oid"))));
        assert!(redeemer.requests.lock().unwrap().is_empty());
    }
}
