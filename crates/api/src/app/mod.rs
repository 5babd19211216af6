//! HTTP API application wiring (Axum router + service wiring).
//!
//! - `services.rs`: infrastructure wiring (store, tenant directory, limiter,
//!   dispatcher, scheduler)
//! - `routes/`: HTTP routes + handlers
//! - `dto.rs`: request/response DTOs and JSON mapping helpers
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{Extension, Router, routing::get, routing::post};
use tower::ServiceBuilder;

use crate::middleware::{self, JwtKeys};

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

/// Build the full HTTP router (public entrypoint used by `main.rs`).
pub fn build_app(jwt_secret: String) -> Router {
    let keys = Arc::new(JwtKeys::from_secret(jwt_secret.as_bytes()));
    let auth_state = middleware::AuthState { keys: keys.clone() };

    let services = Arc::new(services::build_services(keys));

    // Tenant routes: require a bearer JWT + tenant context.
    let protected = routes::router().layer(axum::middleware::from_fn_with_state(
        auth_state,
        middleware::auth_middleware,
    ));

    // The callback sits outside the tenant middleware; the bridge
    // authenticates with its service token, verified in the handler.
    Router::new()
        .route("/health", get(routes::system::health))
        .route("/outbound/callback", post(routes::callback::report_outcome))
        .merge(protected)
        .layer(Extension(services))
        .layer(ServiceBuilder::new())
}
