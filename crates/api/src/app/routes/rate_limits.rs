use std::sync::Arc;

use axum::{
    Json,
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
};

use crate::app::dto;
use crate::app::services::AppServices;

pub async fn get_caller(
    Extension(services): Extension<Arc<AppServices>>,
    Path(caller_id): Path<String>,
) -> axum::response::Response {
    let record = services.rate_limiter.get(&caller_id);
    (StatusCode::OK, Json(record)).into_response()
}

pub async fn block_caller(
    Extension(services): Extension<Arc<AppServices>>,
    Path(caller_id): Path<String>,
    Json(body): Json<dto::BlockCallerRequest>,
) -> axum::response::Response {
    let reason = body.reason.unwrap_or_else(|| "blocked by operator".to_string());
    services.rate_limiter.block(&caller_id, reason, body.hours);
    let record = services.rate_limiter.get(&caller_id);
    (StatusCode::OK, Json(record)).into_response()
}

pub async fn unblock_caller(
    Extension(services): Extension<Arc<AppServices>>,
    Path(caller_id): Path<String>,
) -> axum::response::Response {
    services.rate_limiter.unblock(&caller_id);
    let record = services.rate_limiter.get(&caller_id);
    (StatusCode::OK, Json(record)).into_response()
}

pub async fn list_blocked(
    Extension(services): Extension<Arc<AppServices>>,
) -> axum::response::Response {
    let items = services.rate_limiter.list_blocked();
    (StatusCode::OK, Json(serde_json::json!({ "items": items }))).into_response()
}
