//! Error page and the HTTP mapping of [`AppError`].

use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use tracing::error;

use super::{escape_html, layout, Icon};
use crate::error::{AppError, AuthError};

fn error_page(message: &str) -> Html<String> {
    let body = format!(
        r#"<p>{}</p>
        <a class="button" href="/Account/Welcome">Back to start</a>"#,
        escape_html(message)
    );
    layout("Something went wrong", Icon::Cross, &body)
}

/// GET /Error
pub async fn error() -> Html<String> {
    error_page("An error occurred while processing your request.")
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Auth(AuthError::SecurityTokenValidation(_)) => StatusCode::FORBIDDEN,
            Self::Auth(AuthError::MissingClaim(_) | AuthError::MalformedClaim { .. }) => {
                StatusCode::UNAUTHORIZED
            }
            Self::Auth(e) if e.is_protocol_failure() => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!(error = %self, "Request failed");
        }
        (status, error_page(self.user_message())).into_response()
    }
}
