//! Microsoft Graph API client for the signed-in user's profile.

use serde::{Deserialize, Serialize};

use crate::error::ApiError;

/// API version appended to the configured Graph resource.
const GRAPH_API_VERSION: &str = "v1.0";

/// Microsoft Graph API client.
pub struct GraphClient {
    base_url: String,
    http_client: reqwest::Client,
}

impl GraphClient {
    /// Create a client for the Graph resource, e.g. `https://graph.microsoft.com`.
    pub fn new(graph_api_uri: &str, http_client: reqwest::Client) -> Self {
        Self {
            base_url: format!(
                "{}/{}",
                graph_api_uri.trim_end_matches('/'),
                GRAPH_API_VERSION
            ),
            http_client,
        }
    }

    /// Fetch the current user's profile.
    pub async fn get_user_profile(&self, access_token: &str) -> Result<UserProfile, ApiError> {
        let url = format!("{}/me", self.base_url);

        let response = self
            .http_client
            .get(&url)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| ApiError::GraphRequestFailed(e.to_string()))?;

        match response.status().as_u16() {
            200 => response
                .json()
                .await
                .map_err(|e| ApiError::ParseFailed(e.to_string())),
            401 => Err(ApiError::Unauthorized),
            403 => Err(ApiError::Forbidden),
            429 => Err(ApiError::RateLimited),
            // Don't expose raw API error details - just log status code
            status => Err(ApiError::GraphRequestFailed(format!("HTTP {}", status))),
        }
    }
}

/// User profile from Microsoft Graph /me endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    /// Directory object id. Matches the `oid` claim of the id token.
    pub id: String,

    /// Name shown on the home page.
    pub display_name: Option<String>,

    /// Primary SMTP address, when the user has a mailbox.
    pub mail: Option<String>,

    /// Sign-in name, used when no display name is set.
    pub user_principal_name: Option<String>,

    /// Job title from the user's directory entry.
    pub job_title: Option<String>,
}

impl UserProfile {
    /// Get the best available display name.
    pub fn display_name_or_upn(&self) -> String {
        self.display_name
            .clone()
            .or_else(|| self.user_principal_name.clone())
            .unwrap_or_else(|| "Unknown User".to_string())
    }
}
