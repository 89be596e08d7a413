//! HTTP API application wiring (Axum router + service wiring).
//!
//! This folder is structured like:
//! - `services.rs`: the user service (validation, hashing, store access)
//! - `routes/`: HTTP routes + handlers (one file per resource)
//! - `dto.rs`: request DTOs and response envelopes
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{routing::get, Extension, Router};
use tower::ServiceBuilder;

use crate::config::ApiConfig;
use crate::middleware;
use crate::store::{InMemoryUserStore, UserStore};

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

/// Build the full HTTP router over a fresh in-memory store (used by `main.rs`).
pub fn build_app(config: &ApiConfig) -> Router {
    build_app_with_store(config, Arc::new(InMemoryUserStore::new()))
}

/// Build the router over a caller-provided store (seeded stores in tests).
pub fn build_app_with_store(config: &ApiConfig, store: Arc<dyn UserStore>) -> Router {
    let services = Arc::new(services::AppServices::new(store, config.list_defaults.clone()));

    Router::new()
        .route("/health", get(routes::system::health))
        .merge(routes::router())
        .layer(Extension(services))
        .layer(ServiceBuilder::new().layer(axum::middleware::from_fn(middleware::request_logging)))
}
