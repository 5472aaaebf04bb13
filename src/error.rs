//! Error types for the azuread-gate service.
//!
//! Uses `thiserror` for library-style errors with automatic `Display` and `Error` implementations.

use thiserror::Error;

/// Top-level application error type.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Authentication error: {0}")]
    Auth(#[from] AuthError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("API error: {0}")]
    Api(#[from] ApiError),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
}

/// Sign-in and authorization errors.
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Identity provider returned an error: {error}: {description}")]
    ProviderError { error: String, description: String },

    #[error("Missing parameter in authentication response: {0}")]
    MissingParameter(&'static str),

    #[error("Correlation failed (state does not match this browser)")]
    CorrelationFailed,

    #[error("Id token rejected: {0}")]
    InvalidIdToken(String),

    #[error("Failed to load provider metadata: {0}")]
    MetadataFailed(String),

    #[error("Token exchange failed: {0}")]
    TokenExchangeFailed(String),

    #[error("Required claim missing: {0}")]
    MissingClaim(&'static str),

    #[error("Claim {claim} has an invalid value: {value}")]
    MalformedClaim { claim: &'static str, value: String },

    #[error("Security token validation failed: {0}")]
    SecurityTokenValidation(String),

    #[error("Directory lookup failed: {0}")]
    Lookup(String),

    #[error("Session store failed: {0}")]
    Store(#[from] StoreError),
}

impl AuthError {
    /// Returns true for failures raised by the protocol exchange itself.
    ///
    /// These go through the `on_failure` hook. Authorization denials, claim errors
    /// and collaborator failures do not and propagate to the caller.
    pub fn is_protocol_failure(&self) -> bool {
        matches!(
            self,
            Self::ProviderError { .. }
                | Self::MissingParameter(_)
                | Self::CorrelationFailed
                | Self::InvalidIdToken(_)
                | Self::MetadataFailed(_)
                | Self::TokenExchangeFailed(_)
        )
    }
}

/// Ticket store and token cache errors.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Store backend unavailable: {0}")]
    Unavailable(String),

    #[error("Failed to encode stored value: {0}")]
    Encoding(String),
}

/// Directory (tenant and user repository) errors.
#[derive(Error, Debug)]
pub enum DirectoryError {
    #[error("Directory backend unavailable: {0}")]
    Unavailable(String),
}

impl From<DirectoryError> for AuthError {
    fn from(err: DirectoryError) -> Self {
        AuthError::Lookup(err.to_string())
    }
}

/// Graph API errors.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Graph API request failed: {0}")]
    GraphRequestFailed(String),

    #[error("Failed to parse API response: {0}")]
    ParseFailed(String),

    #[error("Unauthorized (401): Token may be expired")]
    Unauthorized,

    #[error("Forbidden (403): Insufficient permissions")]
    Forbidden,

    #[error("Rate limited (429): Too many requests")]
    RateLimited,
}

impl AppError {
    /// Returns a user-friendly message for display on the error page.
    pub fn user_message(&self) -> &str {
        match self {
            Self::Auth(AuthError::SecurityTokenValidation(_)) => {
                "Your organization has not been onboarded to this application."
            }
            Self::Auth(AuthError::MissingClaim(_) | AuthError::MalformedClaim { .. }) => {
                "Your sign-in token is missing required information."
            }
            Self::Auth(AuthError::Lookup(_)) => {
                "We could not verify your organization. Please try again later."
            }
            Self::Auth(e) if e.is_protocol_failure() => "Sign-in failed. Please try again.",
            Self::Api(ApiError::Unauthorized) => "Authentication expired. Sign in again.",
            Self::Api(ApiError::RateLimited) => "Too many requests. Please wait a moment.",
            Self::Network(_) => "Network error. Please try again.",
            _ => "An error occurred. Please try again.",
        }
    }

    /// Returns true if this error should end the current session.
    pub fn requires_sign_out(&self) -> bool {
        matches!(self, Self::Api(ApiError::Unauthorized))
    }
}
