//! Sign-in, callback and sign-out endpoints.

use axum::extract::{Form, Query, State};
use axum::http::{header, HeaderMap};
use axum::response::{IntoResponse, Response};
use axum_extra::extract::cookie::CookieJar;
use chrono::Duration;
use serde::Deserialize;
use tracing::{info, warn};

use super::events::{CodeReceivedContext, CodeRedemption, FailureOutcome, RequestOrigin};
use super::oidc::{sanitize_return_url, AuthProperties};
use crate::app::AppState;
use crate::error::{AppError, AuthError};
use crate::pages::found;
use crate::session::{AuthenticationTicket, CurrentUser};

#[derive(Debug, Default, Deserialize)]
pub struct SignInQuery {
    #[serde(rename = "returnUrl")]
    pub return_url: Option<String>,
}

/// Parameters the provider sends to the callback path.
#[derive(Debug, Default, Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub id_token: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

/// Scheme and host the browser used to reach us.
pub fn request_origin(headers: &HeaderMap) -> RequestOrigin {
    let scheme = headers
        .get("x-forwarded-proto")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("http");
    let host = headers
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("localhost");

    RequestOrigin {
        scheme: scheme.to_string(),
        host: host.to_string(),
    }
}

/// GET /Account/SignIn - start the hybrid flow.
pub async fn sign_in(
    State(state): State<AppState>,
    Query(query): Query<SignInQuery>,
    headers: HeaderMap,
    jar: CookieJar,
) -> Result<Response, AppError> {
    let return_url = sanitize_return_url(query.return_url.as_deref());
    let redirect_uri = request_origin(&headers).url(&state.oidc.options().callback_path);

    match state.oidc.challenge(&redirect_uri, &return_url).await {
        Ok(challenge) => {
            info!(%return_url, "Redirecting to identity provider");
            let jar = state.cookies.set_correlation(jar, challenge.correlation);
            Ok((jar, found(challenge.authorize_url.as_str())).into_response())
        }
        Err(err) => fail(&state, jar, err),
    }
}

/// GET /signin-oidc
pub async fn callback_query(
    State(state): State<AppState>,
    headers: HeaderMap,
    jar: CookieJar,
    Query(params): Query<CallbackParams>,
) -> Result<Response, AppError> {
    handle_callback(&state, &headers, jar, params).await
}

/// POST /signin-oidc (`response_mode=form_post`)
pub async fn callback_form(
    State(state): State<AppState>,
    headers: HeaderMap,
    jar: CookieJar,
    Form(params): Form<CallbackParams>,
) -> Result<Response, AppError> {
    handle_callback(&state, &headers, jar, params).await
}

async fn handle_callback(
    state: &AppState,
    headers: &HeaderMap,
    jar: CookieJar,
    params: CallbackParams,
) -> Result<Response, AppError> {
    let origin = request_origin(headers);

    let ticket = match authenticate(state, &origin, &jar, params).await {
        Ok(ticket) => ticket,
        Err(err) => return fail(state, jar, err),
    };

    let return_url = ticket.return_url.clone();
    let session_id = state.tickets.store(ticket).await?;
    let jar = state.cookies.clear_correlation(jar);
    let jar = state.cookies.issue(jar, session_id);

    info!(%return_url, "Sign-in completed");
    Ok((jar, found(&return_url)).into_response())
}

/// Protocol failures go through `on_failure`. Everything else propagates.
fn fail(state: &AppState, jar: CookieJar, err: AuthError) -> Result<Response, AppError> {
    if !err.is_protocol_failure() {
        warn!(error = %err, "Sign-in rejected");
        return Err(err.into());
    }

    match state.events.on_failure(&err) {
        FailureOutcome::Redirect(location) => {
            let jar = state.cookies.clear_correlation(jar);
            Ok((jar, found(&location)).into_response())
        }
        FailureOutcome::Unhandled => Err(err.into()),
    }
}

async fn authenticate(
    state: &AppState,
    origin: &RequestOrigin,
    jar: &CookieJar,
    params: CallbackParams,
) -> Result<AuthenticationTicket, AuthError> {
    if let Some(error) = params.error {
        return Err(AuthError::ProviderError {
            error,
            description: params.error_description.unwrap_or_default(),
        });
    }

    let raw_state = params.state.ok_or(AuthError::MissingParameter("state"))?;
    let properties = AuthProperties::decode(&raw_state)?;

    let correlation = state
        .cookies
        .correlation(jar)
        .ok_or(AuthError::CorrelationFailed)?;
    if properties.correlation != correlation {
        return Err(AuthError::CorrelationFailed);
    }

    let options = state.oidc.options();
    let code = if options.response_type.includes_code() {
        Some(params.code.ok_or(AuthError::MissingParameter("code"))?)
    } else {
        None
    };

    let id_token = params.id_token.ok_or(AuthError::MissingParameter("id_token"))?;
    let validated = state
        .oidc
        .validate_id_token(&id_token, &correlation, code.as_deref())
        .await?;
    info!(issuer = %validated.issuer, "Id token accepted");

    if let Some(code) = code {
        let redemption = state
            .events
            .on_code_received(CodeReceivedContext {
                principal: &validated.principal,
                code: &code,
                origin,
            })
            .await?;

        if redemption == CodeRedemption::NotHandled {
            let redirect_uri = origin.url(&options.callback_path);
            state.oidc.redeem_code(&code, &redirect_uri).await?;
        }
    }

    state.events.on_validated(&validated.principal).await?;

    let expires_at = if options.use_token_lifetime {
        validated.expires_at
    } else {
        None
    };

    Ok(AuthenticationTicket::new(
        validated.principal,
        expires_at,
        Duration::minutes(state.config.session.default_lifetime_minutes),
        sanitize_return_url(Some(&properties.return_url)),
    ))
}

/// GET /Account/SignOut
pub async fn sign_out(
    State(state): State<AppState>,
    user: CurrentUser,
    jar: CookieJar,
) -> Result<Response, AppError> {
    if let Some(session_id) = &user.session_id {
        state.tickets.remove(session_id).await?;
    }
    if let Ok(object_id) = user.principal.object_id() {
        state.token_cache.remove(object_id).await?;
    }

    info!("Signed out");
    let jar = state.cookies.clear(jar);
    Ok((jar, found(&state.config.server.landing_path)).into_response())
}
