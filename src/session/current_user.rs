//! Resolve the caller's principal from the session cookie.

use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum_extra::extract::cookie::CookieJar;

use crate::app::AppState;
use crate::auth::claims::Principal;
use crate::error::AppError;

/// The principal behind the request. Anonymous when there is no live session.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub session_id: Option<String>,
    pub principal: Principal,
}

impl CurrentUser {
    pub fn anonymous() -> Self {
        Self {
            session_id: None,
            principal: Principal::anonymous(),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.principal.is_authenticated()
    }
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_headers(&parts.headers);
        let Some(session_id) = state.cookies.session_id(&jar) else {
            return Ok(Self::anonymous());
        };

        match state.tickets.retrieve(&session_id).await? {
            Some(ticket) => Ok(Self {
                session_id: Some(session_id),
                principal: ticket.principal,
            }),
            None => Ok(Self::anonymous()),
        }
    }
}
