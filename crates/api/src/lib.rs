//! HTTP API: the `users` resource over axum, backed by a pluggable store.

pub mod app;
pub mod config;
pub mod middleware;
pub mod store;
