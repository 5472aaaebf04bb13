//! Shared application state and the HTTP router.

use axum::extract::State;
use axum::response::Response;
use axum::routing::get;
use axum::Router;
use std::sync::Arc;

use crate::auth::events::{AzureAdEvents, OidcEvents};
use crate::auth::graph::GraphClient;
use crate::auth::handlers::{callback_form, callback_query, sign_in, sign_out};
use crate::auth::oidc::OidcClient;
use crate::auth::options::OpenIdConnectOptions;
use crate::auth::token_cache::TokenCache;
use crate::auth::token_client::AzureTokenClient;
use crate::config::Config;
use crate::directory::{TenantRepository, UserRepository};
use crate::pages::{error::error, found, health::health, index::index, welcome::welcome};
use crate::session::{SessionCookies, TicketStore};

/// State shared by every request handler.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub oidc: Arc<OidcClient>,
    pub events: Arc<dyn OidcEvents>,
    pub tickets: Arc<dyn TicketStore>,
    pub token_cache: Arc<dyn TokenCache>,
    pub graph: Arc<GraphClient>,
    pub cookies: SessionCookies,
}

impl AppState {
    /// Wire the authentication pipeline around the given stores.
    pub fn new(
        config: Config,
        tenants: Arc<dyn TenantRepository>,
        users: Arc<dyn UserRepository>,
        tickets: Arc<dyn TicketStore>,
        token_cache: Arc<dyn TokenCache>,
        http_client: reqwest::Client,
    ) -> Self {
        let options = Arc::new(config.azure_ad.clone());

        let redeemer = Arc::new(AzureTokenClient::new(
            options.client_id.clone(),
            options.client_secret.clone(),
            &options.token_endpoint_authority,
            http_client.clone(),
        ));

        let oidc = OidcClient::new(
            OpenIdConnectOptions::configure(&options),
            redeemer.clone(),
            http_client.clone(),
        );

        let graph = GraphClient::new(&options.graph_api_uri, http_client);

        let events = AzureAdEvents::new(
            options,
            tenants,
            users,
            redeemer,
            token_cache.clone(),
            config.server.error_path.clone(),
        );

        Self {
            cookies: SessionCookies::new(&config.session),
            config: Arc::new(config),
            oidc: Arc::new(oidc),
            events: Arc::new(events),
            tickets,
            token_cache,
            graph: Arc::new(graph),
        }
    }
}

async fn root(State(state): State<AppState>) -> Response {
    found(&state.config.server.landing_path)
}

pub fn build_router(state: AppState) -> Router {
    let config = state.config.clone();
    let server = &config.server;

    Router::new()
        .route("/", get(root))
        .route(&server.landing_path, get(welcome))
        .route(&server.home_path, get(index))
        .route(&server.error_path, get(error))
        .route("/Account/SignIn", get(sign_in))
        .route("/Account/SignOut", get(sign_out))
        .route(&config.azure_ad.callback_path, get(callback_query).post(callback_form))
        .route("/health", get(health))
        .with_state(state)
}
