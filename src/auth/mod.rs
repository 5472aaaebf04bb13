//! Azure AD authentication.
//!
//! OpenID Connect hybrid flow against the multitenant authority, code redemption
//! for a Microsoft Graph token, and the sign-in policy hooks.

pub mod claims;
pub mod events;
pub mod graph;
pub mod handlers;
pub mod id_token;
pub mod jwks;
pub mod metadata;
pub mod oidc;
pub mod options;
pub mod token_cache;
pub mod token_client;

#[cfg(test)]
pub(crate) mod testing;
