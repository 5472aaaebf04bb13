//! Id token validation.
//!
//! Checks signature (RS256 against the provider JWKS), audience, lifetime, nonce,
//! the `c_hash` binding to the authorization code and, when configured, the
//! issuer allow-list.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::{DateTime, Utc};
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use super::claims::{Principal, AUTHENTICATION_TYPE};
use super::jwks::JwksCache;
use super::options::IssuerValidation;
use crate::error::AuthError;

/// Clock skew tolerated on `exp` and `nbf`.
pub const CLOCK_SKEW_SECS: u64 = 300;

/// A structurally valid id token.
#[derive(Debug, Clone)]
pub struct ValidatedIdToken {
    pub principal: Principal,
    pub issuer: String,
    pub expires_at: Option<DateTime<Utc>>,
}

/// `c_hash` of an authorization code: the left half of its SHA-256, base64url.
pub fn code_hash(code: &str) -> String {
    let digest = Sha256::digest(code.as_bytes());
    URL_SAFE_NO_PAD.encode(&digest[..digest.len() / 2])
}

pub struct IdTokenValidator {
    client_id: String,
    issuer_validation: IssuerValidation,
    jwks: JwksCache,
}

impl IdTokenValidator {
    pub fn new(client_id: String, issuer_validation: IssuerValidation, jwks: JwksCache) -> Self {
        Self {
            client_id,
            issuer_validation,
            jwks,
        }
    }

    /// Validate `token`. When `code` is given, the token must carry its `c_hash`.
    pub async fn validate(
        &self,
        token: &str,
        jwks_uri: &str,
        expected_nonce: &str,
        code: Option<&str>,
    ) -> Result<ValidatedIdToken, AuthError> {
        let header = decode_header(token).map_err(map_jwt_error)?;

        if header.alg != Algorithm::RS256 {
            return Err(AuthError::InvalidIdToken(format!(
                "unsupported algorithm {:?}",
                header.alg
            )));
        }

        let kid = header
            .kid
            .ok_or_else(|| AuthError::InvalidIdToken("token header has no kid".into()))?;

        let jwk = self.jwks.find_signing_key(jwks_uri, &kid).await?;
        let (n, e) = jwk
            .n
            .as_deref()
            .zip(jwk.e.as_deref())
            .ok_or_else(|| AuthError::InvalidIdToken("signing key has no modulus".into()))?;
        let key = DecodingKey::from_rsa_components(n, e).map_err(map_jwt_error)?;

        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_audience(&[self.client_id.as_str()]);
        validation.leeway = CLOCK_SKEW_SECS;
        validation.validate_nbf = true;

        let claims = decode::<Map<String, Value>>(token, &key, &validation)
            .map_err(map_jwt_error)?
            .claims;

        let nonce = claims.get("nonce").and_then(Value::as_str);
        if nonce != Some(expected_nonce) {
            warn!("Id token nonce does not match the correlation nonce");
            return Err(AuthError::InvalidIdToken("nonce mismatch".into()));
        }

        if let Some(code) = code {
            let c_hash = claims.get("c_hash").and_then(Value::as_str);
            if c_hash != Some(code_hash(code).as_str()) {
                warn!("Id token c_hash does not match the authorization code");
                return Err(AuthError::InvalidIdToken("c_hash mismatch".into()));
            }
        }

        let issuer = claims
            .get("iss")
            .and_then(Value::as_str)
            .ok_or_else(|| AuthError::InvalidIdToken("token has no issuer".into()))?
            .to_string();
        let tenant_id = claims.get("tid").and_then(Value::as_str);

        if !self.issuer_validation.accepts(&issuer, tenant_id) {
            warn!(issuer = %issuer, "Id token issuer not allowed");
            return Err(AuthError::InvalidIdToken(format!(
                "issuer {} is not allowed",
                issuer
            )));
        }

        let expires_at = claims
            .get("exp")
            .and_then(Value::as_i64)
            .and_then(|exp| DateTime::from_timestamp(exp, 0));

        debug!(issuer = %issuer, kid = %kid, "Id token validated");

        Ok(ValidatedIdToken {
            principal: Principal::from_token_claims(AUTHENTICATION_TYPE, &claims),
            issuer,
            expires_at,
        })
    }
}

fn map_jwt_error(err: jsonwebtoken::errors::Error) -> AuthError {
    use jsonwebtoken::errors::ErrorKind;

    let reason = match err.kind() {
        ErrorKind::ExpiredSignature => "token expired".to_string(),
        ErrorKind::ImmatureSignature => "token not yet valid".to_string(),
        ErrorKind::InvalidAudience => "audience mismatch".to_string(),
        ErrorKind::InvalidSignature => "invalid signature".to_string(),
        _ => err.to_string(),
    };
    AuthError::InvalidIdToken(reason)
}
