//! Request/response DTOs and JSON mapping helpers.

use serde::Deserialize;
use serde_json::json;

use dialout_calls::ScheduledCall;

/// Body for `POST /outbound/trigger`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TriggerCallRequest {
    pub target_phone: String,
    pub ai_mode: Option<String>,
    pub custom_prompt: Option<String>,
    pub call_instruction: Option<String>,
    pub instruction_type: Option<String>,
    #[serde(default)]
    pub use_default_template: bool,
    pub priority: Option<i32>,
}

/// Body for `POST /outbound/schedule`: a trigger plus the fire instant.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleCallRequest {
    #[serde(flatten)]
    pub call: TriggerCallRequest,
    /// RFC3339; must be strictly in the future.
    pub scheduled_at: String,
}

/// Body for `POST /outbound/callback` (bridge outcome report).
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallbackRequest {
    pub call_id: String,
    pub status: String,
    pub duration_seconds: Option<u32>,
    pub hangup_cause: Option<String>,
}

/// Body for `POST /outbound/block/:callerId`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockCallerRequest {
    pub reason: Option<String>,
    pub hours: Option<u32>,
}

/// Body for `PUT /outbound/config`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TenantConfigRequest {
    pub bridge_base_url: Option<String>,
    pub base_interval_minutes: Option<u32>,
    pub max_attempts: Option<u32>,
}

pub fn call_to_json(call: &ScheduledCall) -> serde_json::Value {
    json!({
        "callId": call.id.to_string(),
        "tenantId": call.tenant_id.to_string(),
        "targetPhone": call.target_phone.as_str(),
        "scheduledAt": call.scheduled_at,
        "status": call.status.as_str(),
        "priority": call.priority,
        "attempts": call.attempts,
        "maxAttempts": call.max_attempts,
        "lastAttemptAt": call.last_attempt_at,
        "nextRetryAt": call.next_retry_at,
        "durationSeconds": call.duration_seconds,
        "hangupCause": call.hangup_cause,
        "retryReason": call.retry_reason,
        "errorMessage": call.error_message,
        "attemptsLog": call.attempts_log.iter().map(|a| json!({
            "attempt": a.attempt,
            "at": a.at,
            "note": a.note,
        })).collect::<Vec<_>>(),
        "createdAt": call.created_at,
        "updatedAt": call.updated_at,
    })
}
