//! `dialout-calls` — pure domain of outbound call scheduling.
//!
//! ## Design
//!
//! - One [`ScheduledCall`] per outbound call intent, tenant-scoped
//! - A closed status state machine: forward-only, terminal states final
//! - Outcome classification (retryable vs. terminal) reported by the bridge
//! - [`RetryPolicy`]: a pure backoff function with two ladders — one for
//!   reported call outcomes, a shorter one for local dispatch failures
//!
//! No I/O lives here; persistence and timers belong to `dialout-infra`.

pub mod call;
pub mod outcome;
pub mod retry;

pub use call::{
    BridgePayload, CallAttemptRecord, CallPatch, CallStatus, InstructionType, ScheduledCall,
};
pub use outcome::CallOutcome;
pub use retry::{RetryDecision, RetryPolicy, RetrySettings};
