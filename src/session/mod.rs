//! Server-side sessions.
//!
//! The browser only ever holds an opaque session id. The authenticated principal
//! lives in a [`TicketStore`] keyed by that id.

pub mod cookie;
pub mod current_user;
pub mod ticket_store;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::auth::claims::Principal;

pub use cookie::SessionCookies;
pub use current_user::CurrentUser;
pub use ticket_store::{MemoryTicketStore, TicketStore};

/// The outcome of a successful sign-in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthenticationTicket {
    pub principal: Principal,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub return_url: String,
}

impl AuthenticationTicket {
    /// Create a ticket that expires at `expires_at`, or after `default_lifetime`.
    pub fn new(
        principal: Principal,
        expires_at: Option<DateTime<Utc>>,
        default_lifetime: Duration,
        return_url: String,
    ) -> Self {
        let issued_at = Utc::now();
        Self {
            principal,
            issued_at,
            expires_at: expires_at.unwrap_or(issued_at + default_lifetime),
            return_url,
        }
    }

    pub fn is_expired(&self) -> bool {
        self.expires_at <= Utc::now()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_lifetime_wins_over_default() {
        let exp = Utc::now() + Duration::minutes(10);
        let lifetime = Duration::hours(8);

        let ticket = AuthenticationTicket::new(Principal::anonymous(), Some(exp), lifetime, "/".into());
        assert_eq!(ticket.expires_at, exp);

        let ticket = AuthenticationTicket::new(Principal::anonymous(), None, lifetime, "/".into());
        assert!(ticket.expires_at > Utc::now() + Duration::hours(7));
        assert!(!ticket.is_expired());
    }
}
