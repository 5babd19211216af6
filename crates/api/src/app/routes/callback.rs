//! Bridge outcome ingestion.

use std::sync::Arc;

use axum::{
    Json,
    extract::Extension,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};
use chrono::Utc;
use tracing::{info, warn};

use dialout_calls::{CallOutcome, CallPatch, CallStatus, RetryDecision, RetryPolicy};
use dialout_core::CallId;

use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::middleware;

const ACTIVE: &[CallStatus] = &[
    CallStatus::Calling,
    CallStatus::Pending,
    CallStatus::RetryScheduled,
];

/// `POST /outbound/callback` — the bridge reports how a call ended.
///
/// Authenticated with the tenant's service token; a token superseded by a
/// newer one is treated the same as a bad signature.
pub async fn report_outcome(
    Extension(services): Extension<Arc<AppServices>>,
    headers: HeaderMap,
    Json(body): Json<dto::CallbackRequest>,
) -> axum::response::Response {
    let (claims, token) = match middleware::decode_service_token(&services.keys, &headers) {
        Ok(v) => v,
        Err(status) => return errors::json_error(status, "unauthorized", "invalid service token"),
    };
    if !services.tenants.is_token_current(claims.tenant_id, &token) {
        return errors::json_error(StatusCode::UNAUTHORIZED, "unauthorized", "token revoked");
    }

    let call_id: CallId = match body.call_id.parse() {
        Ok(v) => v,
        Err(_) => return errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid call id"),
    };

    let call = match services.store.get(call_id) {
        Ok(Some(call)) => call,
        Ok(None) => return errors::json_error(StatusCode::NOT_FOUND, "not_found", "call not found"),
        Err(e) => return errors::store_error_to_response(e),
    };
    if call.tenant_id != claims.tenant_id {
        warn!(
            call_id = %call_id,
            token_tenant = %claims.tenant_id,
            "callback token does not own the call"
        );
        return errors::json_error(StatusCode::FORBIDDEN, "forbidden", "call belongs to another tenant");
    }

    let outcome = CallOutcome::from_report(&body.status);
    let policy = RetryPolicy::outcome(services.tenants.retry_settings(call.tenant_id));

    match policy.decide(&call, &outcome) {
        RetryDecision::Retry { delay } => {
            let next = Utc::now() + delay;
            let patch = CallPatch::new()
                .expect_status(ACTIVE)
                .status(CallStatus::RetryScheduled)
                .retry_reason(outcome.as_str().to_string())
                .next_retry_at(next)
                .scheduled_at(next);
            match services.store.update(call_id, patch) {
                Ok(updated) => {
                    services.scheduler.schedule(call_id, next);
                    info!(
                        call_id = %call_id,
                        outcome = outcome.as_str(),
                        attempt = updated.attempts,
                        next_retry_at = %next,
                        "retry scheduled"
                    );
                    (
                        StatusCode::OK,
                        Json(serde_json::json!({
                            "callId": call_id.to_string(),
                            "status": updated.status.as_str(),
                            "nextRetryAt": next,
                        })),
                    )
                        .into_response()
                }
                // The call reached a terminal state in the meantime; the
                // report is acknowledged without a second mutation.
                Err(_) => already_settled(&services, call_id),
            }
        }
        RetryDecision::Finalize { status } => {
            let mut patch = CallPatch::new().expect_status(ACTIVE).status(status);
            if let Some(seconds) = body.duration_seconds {
                patch = patch.duration_seconds(seconds);
            }
            if let Some(cause) = &body.hangup_cause {
                patch = patch.hangup_cause(cause.clone());
            }
            if status == CallStatus::Failed {
                patch = if outcome.is_retryable() {
                    patch
                        .retry_reason(outcome.as_str().to_string())
                        .error_message("retry attempts exhausted")
                } else {
                    patch.error_message(format!("bridge reported outcome: {}", outcome.as_str()))
                };
            }

            match services.store.update(call_id, patch) {
                Ok(updated) => {
                    // A late report can settle a call whose retry timer is
                    // still armed; disarm it.
                    services.scheduler.cancel(call_id);
                    if updated.status == CallStatus::Completed {
                        if let Some(seconds) = body.duration_seconds {
                            services
                                .rate_limiter
                                .record_minutes(updated.target_phone.as_str(), seconds.div_ceil(60));
                        }
                    }
                    info!(
                        call_id = %call_id,
                        outcome = outcome.as_str(),
                        status = updated.status.as_str(),
                        "call settled"
                    );
                    (
                        StatusCode::OK,
                        Json(serde_json::json!({
                            "callId": call_id.to_string(),
                            "status": updated.status.as_str(),
                        })),
                    )
                        .into_response()
                }
                Err(_) => already_settled(&services, call_id),
            }
        }
    }
}

fn already_settled(services: &AppServices, call_id: CallId) -> axum::response::Response {
    match services.store.get(call_id) {
        Ok(Some(call)) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "callId": call_id.to_string(),
                "status": call.status.as_str(),
            })),
        )
            .into_response(),
        _ => errors::json_error(StatusCode::NOT_FOUND, "not_found", "call not found"),
    }
}
