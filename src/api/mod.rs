use axum::{
    Router,
    http::HeaderValue,
    middleware,
    routing::{delete, get, post, put},
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tower_sessions::{Expiry, MemoryStore, SessionManagerLayer};

use crate::config::Config;
use crate::state::SharedState;

mod admin;
pub mod auth;
mod bets;
mod error;
mod matches;
mod observability;
mod ranking;
mod types;
mod validation;

pub use error::ApiError;
pub use types::*;

use tokio::sync::RwLock;

use metrics_exporter_prometheus::PrometheusHandle;

#[derive(Clone)]
pub struct AppState {
    pub shared: Arc<SharedState>,

    pub start_time: std::time::Instant,

    pub prometheus_handle: Option<PrometheusHandle>,
}

impl AppState {
    #[must_use]
    pub fn config(&self) -> &Arc<RwLock<Config>> {
        &self.shared.config
    }

    #[must_use]
    pub fn store(&self) -> &crate::db::Store {
        &self.shared.store
    }
}

#[must_use]
pub fn create_app_state(
    shared: Arc<SharedState>,
    prometheus_handle: Option<PrometheusHandle>,
) -> Arc<AppState> {
    Arc::new(AppState {
        shared,
        start_time: std::time::Instant::now(),
        prometheus_handle,
    })
}

pub async fn create_app_state_from_config(
    config: Config,
    prometheus_handle: Option<PrometheusHandle>,
) -> anyhow::Result<Arc<AppState>> {
    let shared = Arc::new(SharedState::new(config).await?);
    Ok(create_app_state(shared, prometheus_handle))
}

pub async fn router(state: Arc<AppState>) -> Router {
    let (cors_origins, secure_cookies) = {
        let config = state.config().read().await;
        (
            config.server.cors_allowed_origins.clone(),
            config.server.secure_cookies,
        )
    };

    let protected_routes = create_protected_router(state.clone());

    let session_store = MemoryStore::default();
    let session_layer = SessionManagerLayer::new(session_store)
        .with_secure(secure_cookies)
        .with_same_site(tower_sessions::cookie::SameSite::Lax)
        .with_expiry(Expiry::OnInactivity(time::Duration::minutes(60)));

    let api_router = Router::new()
        .merge(protected_routes)
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/logout", post(auth::logout))
        .route("/ranking", get(ranking::get_ranking))
        .route("/health", get(health))
        .layer(session_layer)
        .with_state(state);

    let cors_layer = if cors_origins.iter().any(|o| o == "*") {
        CorsLayer::new().allow_origin(Any)
    } else {
        let origins: Vec<HeaderValue> =
            cors_origins.iter().filter_map(|s| s.parse().ok()).collect();
        CorsLayer::new().allow_origin(origins)
    };

    Router::new()
        .nest("/api", api_router)
        .layer(cors_layer.allow_methods(Any).allow_headers(Any))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(observability::track_metrics))
}

/// GET /health
async fn health(
    axum::extract::State(state): axum::extract::State<Arc<AppState>>,
) -> axum::Json<ApiResponse<HealthResponse>> {
    let database = state.store().ping().await.is_ok();
    axum::Json(ApiResponse::success(HealthResponse {
        database,
        uptime_seconds: state.start_time.elapsed().as_secs(),
        version: env!("CARGO_PKG_VERSION"),
    }))
}

#[derive(Debug, serde::Serialize)]
pub struct HealthResponse {
    pub database: bool,
    pub uptime_seconds: u64,
    pub version: &'static str,
}

fn create_protected_router(state: Arc<AppState>) -> Router<Arc<AppState>> {
    let admin_routes = Router::new()
        .route("/admin/matches", get(admin::list_matches))
        .route("/admin/matches", post(admin::create_match))
        .route("/admin/matches/{id}", delete(admin::delete_match))
        .route("/admin/matches/{id}/result", put(admin::record_result))
        .route("/admin/matches/{id}/settle", post(admin::resettle_match))
        .route("/admin/rounds/{n}", delete(admin::delete_round))
        .route("/admin/import/matches", post(admin::import_matches))
        .route("/admin/import/results", post(admin::import_results))
        .route("/admin/export/results/{n}", get(admin::export_results))
        .route("/admin/users", get(admin::list_users))
        .route("/admin/users", post(admin::create_user))
        .route("/admin/users/{id}/active", put(admin::set_user_active))
        .route("/metrics", get(observability::get_metrics))
        .route_layer(middleware::from_fn(auth::require_admin));

    Router::new()
        .route("/auth/me", get(auth::get_current_user))
        .route("/auth/me", put(auth::update_current_user))
        .route("/auth/password", put(auth::change_password))
        .route("/auth/api-key/regenerate", post(auth::regenerate_api_key))
        .route("/matches", get(matches::list_matches))
        .route("/matches/round/{n}", get(matches::list_round))
        .route("/bets", post(bets::submit_bets))
        .route("/bets", get(bets::list_bets))
        .route("/bets/round/{n}", get(bets::list_round_bets))
        .route("/bets/match/{id}", get(bets::get_match_bet))
        .merge(admin_routes)
        .route_layer(middleware::from_fn_with_state(state, auth::auth_middleware))
}
