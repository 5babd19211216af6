//! Scheduled call record, status state machine, and atomic patches.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use dialout_core::{CallId, DomainError, PhoneNumber, TenantId};

/// Lifecycle status of a scheduled call.
///
/// Transitions only move forward:
/// `pending -> calling -> retry_scheduled -> calling -> ... -> completed/failed`,
/// with `cancelled` reachable from `pending`/`retry_scheduled` only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallStatus {
    /// Armed, waiting for its scheduled instant
    Pending,
    /// Dispatched to the bridge; outcome not yet reported
    Calling,
    /// A retryable outcome was reported; waiting out the backoff delay
    RetryScheduled,
    /// Terminal: the bridge reported success
    Completed,
    /// Terminal: exhausted retries, configuration error, or reported failure
    Failed,
    /// Terminal: cancelled before dispatch
    Cancelled,
}

impl CallStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            CallStatus::Completed | CallStatus::Failed | CallStatus::Cancelled
        )
    }

    /// True while the call can still be cancelled (not yet in flight).
    pub fn is_cancellable(&self) -> bool {
        matches!(self, CallStatus::Pending | CallStatus::RetryScheduled)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CallStatus::Pending => "pending",
            CallStatus::Calling => "calling",
            CallStatus::RetryScheduled => "retry_scheduled",
            CallStatus::Completed => "completed",
            CallStatus::Failed => "failed",
            CallStatus::Cancelled => "cancelled",
        }
    }
}

impl core::str::FromStr for CallStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(CallStatus::Pending),
            "calling" => Ok(CallStatus::Calling),
            "retry_scheduled" => Ok(CallStatus::RetryScheduled),
            "completed" => Ok(CallStatus::Completed),
            "failed" => Ok(CallStatus::Failed),
            "cancelled" => Ok(CallStatus::Cancelled),
            other => Err(DomainError::validation(format!(
                "unknown call status: {other:?}"
            ))),
        }
    }
}

/// Kind of instruction the bridge should follow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstructionType {
    Task,
    Reminder,
}

/// Opaque payload passed through to the bridge untouched.
///
/// The scheduler does not interpret any of this; it only validates
/// `instruction_type` at the API boundary.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgePayload {
    pub ai_mode: Option<String>,
    pub custom_prompt: Option<String>,
    pub call_instruction: Option<String>,
    pub instruction_type: Option<InstructionType>,
    pub use_default_template: bool,
}

/// Record of one dispatch attempt, kept for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallAttemptRecord {
    pub attempt: u32,
    pub at: DateTime<Utc>,
    pub note: Option<String>,
}

/// One outbound call intent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduledCall {
    /// Stable unique identifier, generated at creation
    pub id: CallId,
    /// Owning tenant; all access and token checks are scoped to this
    pub tenant_id: TenantId,
    /// Normalized destination
    pub target_phone: PhoneNumber,
    /// Instant the next attempt should fire; only moves forward
    pub scheduled_at: DateTime<Utc>,
    pub status: CallStatus,
    /// Pass-through payload for the bridge
    pub payload: BridgePayload,
    /// Advisory ordering hint; does not preempt in-flight calls
    pub priority: i32,
    /// Dispatch attempts made so far
    pub attempts: u32,
    /// Tenant-configured ceiling; never decreases
    pub max_attempts: u32,
    pub last_attempt_at: Option<DateTime<Utc>>,
    pub next_retry_at: Option<DateTime<Utc>>,
    pub duration_seconds: Option<u32>,
    pub hangup_cause: Option<String>,
    pub retry_reason: Option<String>,
    pub error_message: Option<String>,
    /// Append-only per-attempt history
    pub attempts_log: Vec<CallAttemptRecord>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

impl ScheduledCall {
    fn base(tenant_id: TenantId, target_phone: PhoneNumber, payload: BridgePayload) -> Self {
        let now = Utc::now();
        Self {
            id: CallId::new(),
            tenant_id,
            target_phone,
            scheduled_at: now,
            status: CallStatus::Pending,
            payload,
            priority: 1,
            attempts: 0,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            last_attempt_at: None,
            next_retry_at: None,
            duration_seconds: None,
            hangup_cause: None,
            retry_reason: None,
            error_message: None,
            attempts_log: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Immediate trigger: dispatch fires right after persistence, so the
    /// record starts out `calling`.
    pub fn immediate(tenant_id: TenantId, target_phone: PhoneNumber, payload: BridgePayload) -> Self {
        let mut call = Self::base(tenant_id, target_phone, payload);
        call.status = CallStatus::Calling;
        call
    }

    /// Future schedule: the record starts `pending` with a timer armed for
    /// `at`. Callers validate that `at` is strictly in the future.
    pub fn scheduled(
        tenant_id: TenantId,
        target_phone: PhoneNumber,
        payload: BridgePayload,
        at: DateTime<Utc>,
    ) -> Self {
        let mut call = Self::base(tenant_id, target_phone, payload);
        call.scheduled_at = at;
        call
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }
}

/// Atomic partial update to a call record.
///
/// Patches are applied under the store's write lock, optionally guarded by
/// an expected-status set, so a callback racing a local scheduling decision
/// never turns into a lost read-modify-write.
#[derive(Debug, Clone, Default)]
pub struct CallPatch {
    expect_status: Option<Vec<CallStatus>>,
    status: Option<CallStatus>,
    scheduled_at: Option<DateTime<Utc>>,
    next_retry_at: Option<DateTime<Utc>>,
    retry_reason: Option<String>,
    error_message: Option<String>,
    duration_seconds: Option<u32>,
    hangup_cause: Option<String>,
    begin_attempt: bool,
    attempt_note: Option<String>,
}

impl CallPatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Guard: fail with a conflict unless the record's current status is one
    /// of `statuses` at apply time.
    pub fn expect_status(mut self, statuses: &[CallStatus]) -> Self {
        self.expect_status = Some(statuses.to_vec());
        self
    }

    pub fn status(mut self, status: CallStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn scheduled_at(mut self, at: DateTime<Utc>) -> Self {
        self.scheduled_at = Some(at);
        self
    }

    pub fn next_retry_at(mut self, at: DateTime<Utc>) -> Self {
        self.next_retry_at = Some(at);
        self
    }

    pub fn retry_reason(mut self, reason: impl Into<String>) -> Self {
        self.retry_reason = Some(reason.into());
        self
    }

    pub fn error_message(mut self, message: impl Into<String>) -> Self {
        self.error_message = Some(message.into());
        self
    }

    pub fn duration_seconds(mut self, seconds: u32) -> Self {
        self.duration_seconds = Some(seconds);
        self
    }

    pub fn hangup_cause(mut self, cause: impl Into<String>) -> Self {
        self.hangup_cause = Some(cause.into());
        self
    }

    /// Consume one attempt: increments the counter, stamps
    /// `last_attempt_at`, and appends to the attempts log.
    pub fn begin_attempt(mut self, note: Option<String>) -> Self {
        self.begin_attempt = true;
        self.attempt_note = note;
        self
    }

    pub fn expected(&self) -> Option<&[CallStatus]> {
        self.expect_status.as_deref()
    }

    /// Apply the patch in place. The caller holds the store lock.
    pub fn apply(self, call: &mut ScheduledCall) -> Result<(), DomainError> {
        if let Some(expected) = &self.expect_status {
            if !expected.contains(&call.status) {
                return Err(DomainError::conflict(format!(
                    "call {} is {}, expected one of {:?}",
                    call.id,
                    call.status.as_str(),
                    expected.iter().map(|s| s.as_str()).collect::<Vec<_>>(),
                )));
            }
        }

        if call.status.is_terminal() && self.status.is_some() {
            return Err(DomainError::invariant(format!(
                "call {} already terminal ({})",
                call.id,
                call.status.as_str()
            )));
        }

        let now = Utc::now();

        if self.begin_attempt {
            if call.attempts >= call.max_attempts {
                return Err(DomainError::invariant(format!(
                    "call {} exhausted its attempts ({}/{})",
                    call.id, call.attempts, call.max_attempts
                )));
            }
            call.attempts += 1;
            call.last_attempt_at = Some(now);
            call.attempts_log.push(CallAttemptRecord {
                attempt: call.attempts,
                at: now,
                note: self.attempt_note,
            });
        }

        if let Some(status) = self.status {
            call.status = status;
        }
        if let Some(at) = self.scheduled_at {
            // scheduled_at never moves backward
            if at > call.scheduled_at {
                call.scheduled_at = at;
            }
        }
        if let Some(at) = self.next_retry_at {
            call.next_retry_at = Some(at);
        }
        if let Some(reason) = self.retry_reason {
            call.retry_reason = Some(reason);
        }
        if let Some(message) = self.error_message {
            call.error_message = Some(message);
        }
        if let Some(seconds) = self.duration_seconds {
            call.duration_seconds = Some(seconds);
        }
        if let Some(cause) = self.hangup_cause {
            call.hangup_cause = Some(cause);
        }

        call.updated_at = now;
        Ok(())
    }
}
