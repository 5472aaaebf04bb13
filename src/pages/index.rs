//! Home page for signed-in users.

use axum::extract::State;
use axum::response::{IntoResponse, Response};
use tracing::warn;
use url::form_urlencoded;

use super::{escape_html, found, layout, Icon};
use crate::app::AppState;
use crate::auth::claims::Principal;
use crate::auth::token_cache::{format_duration, time_until_expiry};
use crate::error::AppError;
use crate::session::CurrentUser;

/// Sign-in URL that returns to `path` afterwards.
pub fn challenge_location(path: &str) -> String {
    let return_url: String = form_urlencoded::byte_serialize(path.as_bytes()).collect();
    format!("/Account/SignIn?returnUrl={}", return_url)
}

/// GET /Index
pub async fn index(State(state): State<AppState>, user: CurrentUser) -> Result<Response, AppError> {
    if !user.is_authenticated() {
        return Ok(found(&challenge_location(&state.config.server.home_path)));
    }

    let principal = &user.principal;
    let (display_name, token_note) = profile_name(&state, principal)
        .await?
        .unwrap_or_else(|| (principal.display_name(), "No Graph token cached".to_string()));
    let tenant = principal
        .tenant_id()
        .map(|t| t.to_string())
        .unwrap_or_else(|_| "unknown".to_string());

    let claims: String = principal
        .claims()
        .iter()
        .map(|c| {
            format!(
                "<li><code>{}</code>: {}</li>",
                escape_html(&c.claim_type),
                escape_html(&c.value)
            )
        })
        .collect();

    let body = format!(
        r#"<p>Signed in as <strong>{name}</strong></p>
        <p class="hint">Tenant {tenant} via {auth_type}</p>
        <p class="hint">{note}</p>
        <details><summary class="hint">Claims</summary><ul class="hint">{claims}</ul></details>
        <a class="button" href="/Account/SignOut">Sign out</a>"#,
        name = escape_html(&display_name),
        tenant = escape_html(&tenant),
        auth_type = escape_html(principal.authentication_type().unwrap_or("unknown")),
        note = escape_html(&token_note),
        claims = claims,
    );

    Ok(layout("Welcome back", Icon::Check, &body).into_response())
}

/// Display name from Graph when a token for the user is cached.
async fn profile_name(
    state: &AppState,
    principal: &Principal,
) -> Result<Option<(String, String)>, AppError> {
    let Ok(object_id) = principal.object_id() else {
        return Ok(None);
    };
    let Some(token) = state.token_cache.get(object_id).await? else {
        return Ok(None);
    };

    match state.graph.get_user_profile(token.access_token.as_str()).await {
        Ok(profile) => {
            let note = time_until_expiry(token.expires_at)
                .map(|d| format!("Graph token expires in {}", format_duration(d)))
                .unwrap_or_else(|| "Graph token expired".to_string());
            Ok(Some((profile.display_name_or_upn(), note)))
        }
        Err(e) => {
            let err = AppError::from(e);
            warn!(error = %err, "Graph profile lookup failed, using token claims");
            if err.requires_sign_out() {
                state.token_cache.remove(object_id).await?;
            }
            Ok(None)
        }
    }
}
