//! Azure AD options and the OpenID Connect handler configuration built from them.

use serde::Deserialize;

use crate::secure::SecureString;

/// Literal replaced by the token's tenant id in an allowed issuer.
pub const TENANT_ID_PLACEHOLDER: &str = "{tenantid}";

/// Scopes requested in the authorization request.
pub const DEFAULT_SCOPES: [&str; 2] = ["openid", "profile"];

fn default_token_endpoint_authority() -> String {
    "https://login.microsoftonline.com/common/".to_string()
}

fn default_true() -> bool {
    true
}

/// Application registration settings for Azure AD, bound once at startup.
#[derive(Debug, Clone, Deserialize)]
pub struct AzureAdOptions {
    pub client_id: String,
    pub client_secret: SecureString,
    /// Authority URL, e.g. `https://login.microsoftonline.com/common`.
    pub instance: String,
    pub callback_path: String,
    /// Resource the redeemed access token is issued for.
    pub graph_api_uri: String,
    /// Authority whose token endpoint redeems authorization codes.
    #[serde(default = "default_token_endpoint_authority")]
    pub token_endpoint_authority: String,
    /// Session lifetime follows the id token's `exp`.
    #[serde(default = "default_true")]
    pub use_token_lifetime: bool,
    #[serde(default)]
    pub require_https_metadata: bool,
    #[serde(default)]
    pub validate_issuer: bool,
    #[serde(default)]
    pub allowed_issuers: Vec<String>,
}

/// Response types the handler can request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseType {
    Code,
    IdToken,
    /// Hybrid flow: code and id token in one round trip.
    CodeIdToken,
}

impl ResponseType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Code => "code",
            Self::IdToken => "id_token",
            Self::CodeIdToken => "code id_token",
        }
    }

    pub fn includes_code(&self) -> bool {
        matches!(self, Self::Code | Self::CodeIdToken)
    }
}

/// How the token issuer is checked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IssuerValidation {
    /// Any issuer is accepted. Tenant onboarding is checked after validation instead.
    Disabled,
    /// The issuer must match one of these, with `{tenantid}` substituted.
    AllowList(Vec<String>),
}

impl IssuerValidation {
    /// Check an issuer against the policy for the token's tenant id.
    pub fn accepts(&self, issuer: &str, tenant_id: Option<&str>) -> bool {
        match self {
            Self::Disabled => true,
            Self::AllowList(allowed) => allowed.iter().any(|candidate| {
                match (candidate.contains(TENANT_ID_PLACEHOLDER), tenant_id) {
                    (true, Some(tid)) => candidate.replace(TENANT_ID_PLACEHOLDER, tid) == issuer,
                    (true, None) => false,
                    (false, _) => candidate == issuer,
                }
            }),
        }
    }
}

/// Configuration of the OpenID Connect handler.
#[derive(Debug, Clone)]
pub struct OpenIdConnectOptions {
    pub client_id: String,
    pub authority: String,
    pub callback_path: String,
    pub use_token_lifetime: bool,
    pub require_https_metadata: bool,
    pub response_type: ResponseType,
    pub response_mode: &'static str,
    pub scopes: Vec<String>,
    pub issuer_validation: IssuerValidation,
}

impl OpenIdConnectOptions {
    /// Configure the handler from the Azure AD options.
    pub fn configure(options: &AzureAdOptions) -> Self {
        let issuer_validation = if options.validate_issuer {
            IssuerValidation::AllowList(options.allowed_issuers.clone())
        } else {
            IssuerValidation::Disabled
        };

        Self {
            client_id: options.client_id.clone(),
            authority: options.instance.clone(),
            callback_path: options.callback_path.clone(),
            use_token_lifetime: options.use_token_lifetime,
            require_https_metadata: options.require_https_metadata,
            response_type: ResponseType::CodeIdToken,
            response_mode: "form_post",
            scopes: DEFAULT_SCOPES.iter().map(|s| s.to_string()).collect(),
            issuer_validation,
        }
    }

    /// Address of the provider's discovery document.
    pub fn metadata_address(&self) -> String {
        format!(
            "{}/.well-known/openid-configuration",
            self.authority.trim_end_matches('/')
        )
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn azure_options() -> AzureAdOptions {
        AzureAdOptions {
            client_id: "client-123".into(),
            client_secret: SecureString::new("secret".into()),
            instance: "https://login.microsoftonline.com/common/".into(),
            callback_path: "/signin-oidc".into(),
            graph_api_uri: "https://graph.microsoft.com".into(),
            token_endpoint_authority: default_token_endpoint_authority(),
            use_token_lifetime: true,
            require_https_metadata: false,
            validate_issuer: false,
            allowed_issuers: vec![],
        }
    }

    #[test]
    fn test_configure_copies_options() {
        let oidc = OpenIdConnectOptions::configure(&azure_options());

        assert_eq!(oidc.client_id, "client-123");
        assert_eq!(oidc.authority, "https://login.microsoftonline.com/common/");
        assert_eq!(oidc.callback_path, "/signin-oidc");
        assert!(oidc.use_token_lifetime);
        assert!(!oidc.require_https_metadata);
        assert_eq!(oidc.response_type, ResponseType::CodeIdToken);
        assert_eq!(oidc.response_type.as_str(), "code id_token");
        assert_eq!(oidc.issuer_validation, IssuerValidation::Disabled);
    }

    #[test]
    fn test_metadata_address() {
        let oidc = OpenIdConnectOptions::configure(&azure_options());
        assert_eq!(
            oidc.metadata_address(),
            "https://login.microsoftonline.com/common/.well-known/openid-configuration"
        );
    }

    #[test]
    fn test_issuer_allow_list() {
        let policy = IssuerValidation::AllowList(vec![
            "https://sts.windows.net/{tenantid}/".into(),
            "https://issuer.example.com".into(),
        ]);
        let tid = "11111111-1111-1111-1111-111111111111";

        assert!(policy.accepts(
            "https://sts.windows.net/11111111-1111-1111-1111-111111111111/",
            Some(tid)
        ));
        assert!(policy.accepts("https://issuer.example.com", None));
        assert!(!policy.accepts(
            "https://sts.windows.net/22222222-2222-2222-2222-222222222222/",
            Some(tid)
        ));
        assert!(!policy.accepts("https://sts.windows.net/{tenantid}/", None));
    }

    #[test]
    fn test_disabled_issuer_validation_accepts_any() {
        assert!(IssuerValidation::Disabled.accepts("https://anything", None));
    }

    #[test]
    fn test_validate_issuer_builds_allow_list() {
        let mut options = azure_options();
        options.validate_issuer = true;
        options.allowed_issuers = vec!["https://sts.windows.net/{tenantid}/".into()];

        let oidc = OpenIdConnectOptions::configure(&options);
        assert!(matches!(oidc.issuer_validation, IssuerValidation::AllowList(ref l) if l.len() == 1));
    }
}
