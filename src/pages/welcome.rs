//! Landing page. The only page anonymous callers can see.

use axum::extract::State;
use axum::response::{IntoResponse, Response};
use tracing::debug;

use super::index::challenge_location;
use super::{escape_html, found, layout, Icon};
use crate::app::AppState;
use crate::session::CurrentUser;

/// GET /Account/Welcome
///
/// Authenticated callers go straight to the home page. Nothing else happens
/// on either branch.
pub async fn welcome(State(state): State<AppState>, user: CurrentUser) -> Response {
    if user.is_authenticated() {
        debug!("Authenticated caller on landing page, redirecting home");
        return found(&state.config.server.home_path);
    }

    let body = format!(
        r#"<p>Sign in with your work or school account to continue.</p>
        <a class="button" href="{sign_in}">Sign in</a>
        <p class="hint">Your organization must be onboarded to use {app}.</p>"#,
        sign_in = escape_html(&challenge_location(&state.config.server.home_path)),
        app = escape_html(&state.config.app.name),
    );

    layout(&format!("Welcome to {}", state.config.app.name), Icon::Key, &body).into_response()
}
