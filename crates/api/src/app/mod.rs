//! HTTP application wiring (Axum router + service wiring).
//!
//! Layout:
//! - `services.rs`: runtime wiring (store/queue/renderer/transport, worker
//!   pool, dispatcher registration)
//! - `routes/`: HTTP routes + handlers, one file per resource
//! - `dto.rs`: request/response DTOs and JSON mapping
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{routing::get, Extension, Router};
use tower::ServiceBuilder;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

pub use services::{AppContext, Runtime};

/// Build the full HTTP router (public entrypoint used by `main.rs`).
pub fn build_app(ctx: Arc<AppContext>) -> Router {
    Router::new()
        .route("/health", get(routes::system::health))
        .merge(routes::router())
        .layer(ServiceBuilder::new().layer(Extension(ctx)))
}
