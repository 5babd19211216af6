use std::sync::Arc;

use axum::{
    Json,
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;

use dialout_calls::{BridgePayload, CallPatch, CallStatus, RetrySettings, ScheduledCall};
use dialout_core::{CallId, PhoneNumber};
use dialout_infra::RateDecision;

use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context::TenantContext;

fn validate_request(
    body: &dto::TriggerCallRequest,
) -> Result<(PhoneNumber, BridgePayload), axum::response::Response> {
    let phone = PhoneNumber::parse(&body.target_phone).map_err(|e| {
        errors::json_error(StatusCode::BAD_REQUEST, "invalid_phone", e.to_string())
    })?;

    let instruction_type = match body.instruction_type.as_deref() {
        Some(s) => Some(errors::parse_instruction_type(s)?),
        None => None,
    };

    Ok((
        phone,
        BridgePayload {
            ai_mode: body.ai_mode.clone(),
            custom_prompt: body.custom_prompt.clone(),
            call_instruction: body.call_instruction.clone(),
            instruction_type,
            use_default_template: body.use_default_template,
        },
    ))
}

pub async fn trigger_call(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Json(body): Json<dto::TriggerCallRequest>,
) -> axum::response::Response {
    let (phone, payload) = match validate_request(&body) {
        Ok(v) => v,
        Err(e) => return e,
    };

    if let RateDecision::Denied { reason, retry_after } =
        services.rate_limiter.check_and_record(phone.as_str())
    {
        return (
            StatusCode::TOO_MANY_REQUESTS,
            Json(serde_json::json!({
                "error": "rate_limited",
                "message": reason,
                "retryAfter": retry_after,
            })),
        )
            .into_response();
    }

    let settings = services.tenants.retry_settings(tenant.tenant_id());
    let mut call = ScheduledCall::immediate(tenant.tenant_id(), phone, payload)
        .with_max_attempts(settings.max_attempts);
    if let Some(priority) = body.priority {
        call = call.with_priority(priority);
    }

    let call_id = match services.store.create(call.clone()) {
        Ok(id) => id,
        Err(e) => return errors::store_error_to_response(e),
    };
    services.scheduler.schedule(call_id, Utc::now());

    (
        StatusCode::CREATED,
        Json(serde_json::json!({
            "callId": call_id.to_string(),
            "targetPhone": call.target_phone.as_str(),
        })),
    )
        .into_response()
}

pub async fn schedule_call(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Json(body): Json<dto::ScheduleCallRequest>,
) -> axum::response::Response {
    let (phone, payload) = match validate_request(&body.call) {
        Ok(v) => v,
        Err(e) => return e,
    };

    let scheduled_at = match DateTime::parse_from_rfc3339(&body.scheduled_at) {
        Ok(t) => t.with_timezone(&Utc),
        Err(_) => {
            return errors::json_error(
                StatusCode::BAD_REQUEST,
                "invalid_scheduled_at",
                "scheduledAt must be an RFC3339 timestamp",
            );
        }
    };
    if scheduled_at <= Utc::now() {
        return errors::json_error(
            StatusCode::BAD_REQUEST,
            "invalid_scheduled_at",
            "scheduledAt must be in the future",
        );
    }

    let settings = services.tenants.retry_settings(tenant.tenant_id());
    let mut call = ScheduledCall::scheduled(tenant.tenant_id(), phone, payload, scheduled_at)
        .with_max_attempts(settings.max_attempts);
    if let Some(priority) = body.call.priority {
        call = call.with_priority(priority);
    }

    let call_id = match services.store.create(call) {
        Ok(id) => id,
        Err(e) => return errors::store_error_to_response(e),
    };
    services.scheduler.schedule(call_id, scheduled_at);

    (
        StatusCode::CREATED,
        Json(serde_json::json!({
            "callId": call_id.to_string(),
            "scheduledAt": scheduled_at,
        })),
    )
        .into_response()
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub status: Option<String>,
}

pub async fn list_scheduled(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Query(query): Query<ListQuery>,
) -> axum::response::Response {
    let status = match query.status.as_deref() {
        Some(s) => match errors::parse_status_filter(s) {
            Ok(status) => Some(status),
            Err(e) => return e,
        },
        None => None,
    };

    match services.store.list(tenant.tenant_id(), status) {
        Ok(calls) => {
            let items: Vec<_> = calls.iter().map(dto::call_to_json).collect();
            (StatusCode::OK, Json(serde_json::json!({ "items": items }))).into_response()
        }
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn cancel_call(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let call_id: CallId = match id.parse() {
        Ok(v) => v,
        Err(_) => return errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid call id"),
    };

    // Wrong tenant and absent look identical from outside.
    let call = match services.store.get(call_id) {
        Ok(Some(call)) if call.tenant_id == tenant.tenant_id() => call,
        Ok(_) => return errors::json_error(StatusCode::NOT_FOUND, "not_found", "call not found"),
        Err(e) => return errors::store_error_to_response(e),
    };

    if call.status == CallStatus::Calling {
        return errors::json_error(
            StatusCode::BAD_REQUEST,
            "call_in_progress",
            "a call that is already in progress cannot be cancelled",
        );
    }

    // Idempotent: a second cancel (or a cancel of any terminal call) reports
    // the current state without touching the record.
    if call.status.is_terminal() {
        return (
            StatusCode::OK,
            Json(serde_json::json!({
                "callId": call_id.to_string(),
                "status": call.status.as_str(),
            })),
        )
            .into_response();
    }

    services.scheduler.cancel(call_id);
    let patch = CallPatch::new()
        .expect_status(&[CallStatus::Pending, CallStatus::RetryScheduled])
        .status(CallStatus::Cancelled);
    match services.store.update(call_id, patch) {
        Ok(updated) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "callId": call_id.to_string(),
                "status": updated.status.as_str(),
            })),
        )
            .into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn update_config(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Json(body): Json<dto::TenantConfigRequest>,
) -> axum::response::Response {
    let current = services.tenants.retry_settings(tenant.tenant_id());
    let settings = RetrySettings::clamped(
        body.base_interval_minutes.unwrap_or(current.base_interval_minutes),
        body.max_attempts.unwrap_or(current.max_attempts),
    );
    services.tenants.set_retry_settings(tenant.tenant_id(), settings);

    if let Some(url) = body.bridge_base_url {
        services.tenants.set_bridge_base_url(tenant.tenant_id(), url);
    }

    (
        StatusCode::OK,
        Json(serde_json::json!({
            "bridgeBaseUrl": services.tenants.bridge_base_url(tenant.tenant_id()),
            "baseIntervalMinutes": settings.base_interval_minutes,
            "maxAttempts": settings.max_attempts,
        })),
    )
        .into_response()
}

pub async fn issue_service_token(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
) -> axum::response::Response {
    match services.issue_service_token(tenant.tenant_id()) {
        Ok((token, claims)) => (
            StatusCode::CREATED,
            Json(serde_json::json!({
                "token": token,
                "createdAt": claims.created_at,
            })),
        )
            .into_response(),
        Err(e) => errors::json_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "token_error",
            e.to_string(),
        ),
    }
}
