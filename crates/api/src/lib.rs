//! HTTP API for the checkout core.
//!
//! Exposes checkout and order history over REST, with structured logging
//! (tracing) and Prometheus metrics.

pub mod config;
pub mod error;
pub mod extract;
pub mod response;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::get;
use checkout::{CheckoutConfig, CheckoutService, OrderHistory};
use metrics_exporter_prometheus::PrometheusHandle;
use store::{AddressDirectory, OrderReader, UnitOfWork};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use routes::orders::AppState;

/// Everything a store must offer to back the HTTP surface.
pub trait CheckoutStore: UnitOfWork + AddressDirectory + OrderReader + Clone + 'static {}

impl<T> CheckoutStore for T where T: UnitOfWork + AddressDirectory + OrderReader + Clone + 'static {}

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S: CheckoutStore>(
    state: Arc<AppState<S>>,
    metrics_handle: PrometheusHandle,
) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route(
            "/orders",
            get(routes::orders::list::<S>).post(routes::orders::create::<S>),
        )
        .route("/orders/{id}", get(routes::orders::get::<S>))
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Builds the shared state over one store.
pub fn create_state<S: CheckoutStore>(store: S, config: CheckoutConfig) -> Arc<AppState<S>> {
    Arc::new(AppState {
        checkout: CheckoutService::with_config(store.clone(), config),
        history: OrderHistory::new(store),
    })
}
