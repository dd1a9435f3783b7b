//! Storefront API Library
//!
//! Product catalog, shipping quotes and checkout with payment-provider
//! fallback for a small online store.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

// Core modules
pub mod auth;
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod handlers;
pub mod middleware_helpers;
pub mod migrator;
pub mod openapi;
pub mod services;
pub mod tracing;

use axum::{Extension, Router};
use std::sync::Arc;

// App state definition
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<db::DbPool>,
    pub config: Arc<config::AppConfig>,
    pub services: handlers::AppServices,
}

/// Every route mounted under `/api`, with admin groups gated by permission.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .merge(handlers::products::products_routes())
        .merge(handlers::checkout::checkout_routes())
        .merge(handlers::shipping::shipping_routes())
        .merge(handlers::orders::orders_routes())
}

/// Full application router: health, `/api`, and Swagger UI.
///
/// Transport concerns (CORS, compression, timeouts) are layered by the binary.
pub fn build_router(state: AppState) -> Router {
    let auth_service = state.services.auth.clone();

    Router::new()
        .merge(handlers::health::health_routes())
        .nest(
            "/api",
            api_routes().merge(auth::auth_routes().with_state(auth_service.clone())),
        )
        .merge(openapi::swagger_ui(&state.config.backend_url))
        // HTTP tracing layer for consistent request/response telemetry
        .layer(crate::tracing::configure_http_tracing())
        // Auth middleware looks the service up in request extensions
        .layer(Extension(auth_service))
        .layer(axum::middleware::from_fn(
            middleware_helpers::request_id::request_id_middleware,
        ))
        .with_state(state)
}
