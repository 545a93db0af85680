pub mod auth;
pub mod config;
pub mod dtos;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;

use axum::{
    http::{header, HeaderValue, Method},
    middleware::{from_fn, from_fn_with_state},
    routing::{delete, get, patch, post},
    Router,
};
use service_core::error::AppError;
use service_core::middleware::{
    metrics_middleware, request_id_middleware, security_headers_middleware, REQUEST_ID_HEADER,
};
use std::sync::Arc;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

use crate::auth::{permissions, KeyStore, TokenVerifier};
use crate::config::DrinksConfig;
use crate::middleware::{permission_guard, PermissionGuard};
use crate::services::DrinkRepository;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<DrinksConfig>,
    pub repo: Arc<dyn DrinkRepository>,
    pub verifier: Arc<TokenVerifier>,
    pub keys: Arc<KeyStore>,
}

impl AppState {
    pub fn new(config: DrinksConfig, repo: Arc<dyn DrinkRepository>, keys: Arc<KeyStore>) -> Self {
        let verifier = Arc::new(TokenVerifier::new(keys.clone(), &config.auth));
        Self {
            config: Arc::new(config),
            repo,
            verifier,
            keys,
        }
    }
}

pub fn build_router(state: AppState) -> Result<Router, AppError> {
    let guard = |permission: &'static str| PermissionGuard::new(state.verifier.clone(), permission);

    let app = Router::new()
        .route(
            "/drinks",
            get(handlers::list_drinks)
                .merge(post(handlers::create_drink).route_layer(from_fn_with_state(
                    guard(permissions::POST_DRINKS),
                    permission_guard,
                )))
                .fallback(handlers::method_not_allowed),
        )
        .route(
            "/drinks-detail",
            get(handlers::list_drinks_detail)
                .route_layer(from_fn_with_state(
                    guard(permissions::GET_DRINKS_DETAIL),
                    permission_guard,
                ))
                .fallback(handlers::method_not_allowed),
        )
        .route(
            "/drinks/:id",
            patch(handlers::update_drink)
                .route_layer(from_fn_with_state(
                    guard(permissions::PATCH_DRINKS),
                    permission_guard,
                ))
                .merge(delete(handlers::delete_drink).route_layer(from_fn_with_state(
                    guard(permissions::DELETE_DRINKS),
                    permission_guard,
                )))
                .fallback(handlers::method_not_allowed),
        )
        .route(
            "/health",
            get(handlers::health_check).fallback(handlers::method_not_allowed),
        )
        .route(
            "/metrics",
            get(handlers::metrics::metrics).fallback(handlers::method_not_allowed),
        )
        .route_layer(from_fn(metrics_middleware))
        .fallback(handlers::not_found)
        .with_state(state.clone())
        .layer(TraceLayer::new_for_http().make_span_with(
            |request: &axum::http::Request<_>| {
                let request_id = request
                    .headers()
                    .get(REQUEST_ID_HEADER)
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("-");

                tracing::info_span!(
                    "http_request",
                    request_id = %request_id,
                    method = %request.method(),
                    uri = %request.uri(),
                    version = ?request.version(),
                )
            },
        ))
        .layer(from_fn(request_id_middleware))
        .layer(from_fn(security_headers_middleware))
        .layer(cors_layer(&state.config.security.allowed_origins)?);

    Ok(app)
}

fn cors_layer(allowed_origins: &[String]) -> Result<CorsLayer, AppError> {
    let origin = if allowed_origins.iter().any(|o| o == "*") {
        AllowOrigin::any()
    } else {
        let origins = allowed_origins
            .iter()
            .map(|o| {
                o.parse::<HeaderValue>().map_err(|e| {
                    AppError::ConfigError(anyhow::anyhow!("Invalid CORS origin '{}': {}", o, e))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        AllowOrigin::list(origins)
    };

    Ok(CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]))
}
