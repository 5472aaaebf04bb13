//! Test fixtures: a signing key and a mock Azure AD endpoint.

use chrono::Utc;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde_json::{json, Value};
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use super::id_token::code_hash;

pub const TEST_KID: &str = "test-signing-key";
pub const TEST_NONCE: &str = "test-nonce";
pub const TEST_TENANT: &str = "11111111-1111-1111-1111-111111111111";
pub const TEST_OID: &str = "oid-alice";
pub const TEST_UPN: &str = "alice@example.com";
pub const TEST_CODE: &str = "auth-code";

const TEST_KEY_PEM: &[u8] = include_bytes!("testdata/rsa_test_key.pem");

/// Modulus of the test key, base64url encoded.
const TEST_KEY_N: &str = "_L99zCg099T2pAaF6PtO8BkBj43amy67Gpgxj4Im26NQKA2dVSRGK9Jm-TU814pJr9OBgsidpZj_M4K0Puk-n9RKVmLCZJ-x9pEf8Ibyuql88cgaF4plCAbDreQc4rybxz3KUfVizGp1j4MbYAriDb6JABu0J6DNUkhnNWNu4jnub0YbUK_R1AYT34WRbvUy_BdrQGQPKgXLrx1I-WYWv2osmvAkInlm8A7AHns2NLCGGv4OLLJ0goFkJVPdnownbxGAxtsv1kswMRN3mtv9qJVwNTX1MXLiacB6zQfrn0p_UfUQdqeY9kGJATjiQPFtKAmpZqikMTVIqvBlirxKuw";

/// Claims of an Azure AD v1 id token for alice in the test tenant, bound to
/// [`TEST_CODE`].
pub fn id_token_claims(audience: &str, nonce: &str) -> Value {
    let now = Utc::now().timestamp();
    json!({
        "aud": audience,
        "iss": format!("https://sts.windows.net/{}/", TEST_TENANT),
        "iat": now - 60,
        "nbf": now - 60,
        "exp": now + 3600,
        "nonce": nonce,
        "c_hash": code_hash(TEST_CODE),
        "oid": TEST_OID,
        "tid": TEST_TENANT,
        "unique_name": TEST_UPN,
        "upn": TEST_UPN,
        "name": "Alice"
    })
}

/// Sign claims with the test key.
pub fn sign_id_token(claims: &Value) -> String {
    let mut header = Header::new(Algorithm::RS256);
    header.kid = Some(TEST_KID.to_string());
    let key = EncodingKey::from_rsa_pem(TEST_KEY_PEM).expect("test key parses");
    encode(&header, claims, &key).expect("token signs")
}

/// Wiremock stand-in for the Azure AD authority.
pub struct MockIdentityProvider {
    pub server: MockServer,
}

impl MockIdentityProvider {
    /// Start the server with discovery and key endpoints mounted.
    pub async fn start() -> Self {
        let server = MockServer::start().await;
        let base = server.uri();

        Mock::given(method("GET"))
            .and(path("/common/.well-known/openid-configuration"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "issuer": "https://sts.windows.net/{tenantid}/",
                "authorization_endpoint": format!("{}/common/oauth2/authorize", base),
                "token_endpoint": format!("{}/common/oauth2/token", base),
                "jwks_uri": format!("{}/common/discovery/keys", base),
                "end_session_endpoint": format!("{}/common/oauth2/logout", base)
            })))
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/common/discovery/keys"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "keys": [{
                    "kty": "RSA",
                    "use": "sig",
                    "kid": TEST_KID,
                    "n": TEST_KEY_N,
                    "e": "AQAB"
                }]
            })))
            .mount(&server)
            .await;

        Self { server }
    }

    pub fn uri(&self) -> String {
        self.server.uri()
    }

    pub fn jwks_uri(&self) -> String {
        format!("{}/common/discovery/keys", self.server.uri())
    }

    /// Token endpoint that redeems `code` for a Graph token.
    pub async fn mount_token_endpoint(&self, code: &str) {
        Mock::given(method("POST"))
            .and(path("/common/oauth2/token"))
            .and(body_string_contains(format!("code={}", code)))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "token_type": "Bearer",
                "access_token": "graph-access-token",
                "refresh_token": "graph-refresh-token",
                "expires_in": "3599",
                "resource": "https://graph.microsoft.com"
            })))
            .mount(&self.server)
            .await;
    }

    /// Token endpoint that rejects every code.
    pub async fn mount_token_endpoint_error(&self) {
        Mock::given(method("POST"))
            .and(path("/common/oauth2/token"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": "invalid_grant",
                "error_description": "AADSTS70008: The provided authorization code has expired."
            })))
            .mount(&self.server)
            .await;
    }
}
