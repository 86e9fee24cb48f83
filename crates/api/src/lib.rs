//! HTTP API server for the bookstore checkout service.
//!
//! Exposes checkout, order lookups, and administrative order management
//! behind bearer-token authentication, with structured logging (tracing)
//! and Prometheus metrics.

pub mod auth;
pub mod config;
pub mod error;
pub mod routes;
pub mod state;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, patch};
use metrics_exporter_prometheus::PrometheusHandle;
use store::Storage;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use auth::JwtKeys;
use config::Config;
use state::AppState;

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S: Storage>(state: Arc<AppState<S>>, metrics_handle: PrometheusHandle) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::system::metrics))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::system::health))
        .route(
            "/orders",
            get(routes::orders::list::<S>).post(routes::orders::checkout::<S>),
        )
        .route("/orders/{id}", get(routes::orders::get::<S>))
        .route("/admin/orders", get(routes::admin::list::<S>))
        .route(
            "/admin/orders/{id}/status",
            patch(routes::admin::set_status::<S>),
        )
        .with_state(state)
        .merge(metrics_router)
        .layer(
            ServiceBuilder::new().layer(TraceLayer::new_for_http()).layer(
                CorsLayer::new()
                    .allow_origin(Any)
                    .allow_methods(Any)
                    .allow_headers(Any),
            ),
        )
}

/// Creates the application state over `store` using the given configuration.
pub fn create_state<S: Storage>(store: S, config: &Config) -> Arc<AppState<S>> {
    Arc::new(AppState::new(
        store,
        JwtKeys::from_secret(config.jwt_secret.as_bytes()),
        config.request_timeout,
    ))
}
