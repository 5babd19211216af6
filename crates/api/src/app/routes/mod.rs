use axum::{
    Router,
    routing::{delete, get, post, put},
};

pub mod callback;
pub mod outbound;
pub mod rate_limits;
pub mod system;

/// Router for all authenticated (tenant-scoped) endpoints.
///
/// Full paths rather than a nest: the callback route lives under
/// `/outbound` too but outside the auth middleware, and axum will not allow
/// a root-level route inside a nested subtree.
pub fn router() -> Router {
    Router::new()
        .route("/outbound/trigger", post(outbound::trigger_call))
        .route("/outbound/schedule", post(outbound::schedule_call))
        .route("/outbound/scheduled", get(outbound::list_scheduled))
        .route("/outbound/:id", delete(outbound::cancel_call))
        .route("/outbound/config", put(outbound::update_config))
        .route("/outbound/service-token", post(outbound::issue_service_token))
        .route("/outbound/rate-limits/:caller_id", get(rate_limits::get_caller))
        .route(
            "/outbound/block/:caller_id",
            post(rate_limits::block_caller).delete(rate_limits::unblock_caller),
        )
        .route("/outbound/blocked", get(rate_limits::list_blocked))
}
