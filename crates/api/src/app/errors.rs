use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use dialout_calls::{CallStatus, InstructionType};
use dialout_infra::CallStoreError;

pub fn store_error_to_response(err: CallStoreError) -> axum::response::Response {
    match err {
        CallStoreError::NotFound(_) => json_error(StatusCode::NOT_FOUND, "not_found", "call not found"),
        CallStoreError::AlreadyExists(id) => {
            json_error(StatusCode::CONFLICT, "conflict", format!("call already exists: {id}"))
        }
        CallStoreError::Conflict(msg) => json_error(StatusCode::CONFLICT, "conflict", msg),
        CallStoreError::Invariant(msg) => {
            json_error(StatusCode::UNPROCESSABLE_ENTITY, "invariant_violation", msg)
        }
        CallStoreError::Storage(msg) => {
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "store_error", msg)
        }
    }
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

pub fn parse_instruction_type(s: &str) -> Result<InstructionType, axum::response::Response> {
    match s {
        "task" => Ok(InstructionType::Task),
        "reminder" => Ok(InstructionType::Reminder),
        _ => Err(json_error(
            StatusCode::BAD_REQUEST,
            "invalid_instruction_type",
            "instructionType must be one of: task, reminder",
        )),
    }
}

pub fn parse_status_filter(s: &str) -> Result<CallStatus, axum::response::Response> {
    s.parse().map_err(|_| {
        json_error(
            StatusCode::BAD_REQUEST,
            "invalid_status",
            "status must be one of: pending, calling, retry_scheduled, completed, failed, cancelled",
        )
    })
}
