//! Retry backoff policy.
//!
//! Two exponential ladders share one formula,
//! `delay = base * 2^(attempt - 1)` capped at a ceiling:
//!
//! - outcome retries: tenant-configurable base (default 5 min), cap 30 min
//! - dispatch failures (bridge unreachable / non-2xx): base 1 min, cap 15 min
//!
//! The policy is a pure function of attempt number and settings. It never
//! looks at the clock; callers add the delay to their own `now`.

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::call::{CallStatus, ScheduledCall};
use crate::outcome::CallOutcome;

/// Tenant-level retry configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetrySettings {
    /// Base delay in minutes for the first outcome retry, clamped to 1..=30.
    pub base_interval_minutes: u32,
    /// Attempt ceiling per call.
    pub max_attempts: u32,
}

pub const MIN_BASE_INTERVAL_MINUTES: u32 = 1;
pub const MAX_BASE_INTERVAL_MINUTES: u32 = 30;
pub const DEFAULT_BASE_INTERVAL_MINUTES: u32 = 5;
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

impl RetrySettings {
    /// Clamp out-of-range values rather than rejecting them.
    pub fn clamped(base_interval_minutes: u32, max_attempts: u32) -> Self {
        Self {
            base_interval_minutes: base_interval_minutes
                .clamp(MIN_BASE_INTERVAL_MINUTES, MAX_BASE_INTERVAL_MINUTES),
            max_attempts: max_attempts.max(1),
        }
    }
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            base_interval_minutes: DEFAULT_BASE_INTERVAL_MINUTES,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

/// What to do with a call after an attempt concluded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryDecision {
    /// Arm another attempt after `delay`.
    Retry { delay: Duration },
    /// No further attempts; move to `status`.
    Finalize { status: CallStatus },
}

/// Exponential backoff ladder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    base: Duration,
    cap: Duration,
}

impl RetryPolicy {
    /// Ladder for outcomes reported by the bridge.
    pub fn outcome(settings: RetrySettings) -> Self {
        let base = settings
            .base_interval_minutes
            .clamp(MIN_BASE_INTERVAL_MINUTES, MAX_BASE_INTERVAL_MINUTES);
        Self {
            base: Duration::minutes(i64::from(base)),
            cap: Duration::minutes(30),
        }
    }

    /// Tighter ladder for local dispatch failures, where the problem is the
    /// bridge rather than the callee.
    pub fn dispatch() -> Self {
        Self {
            base: Duration::minutes(1),
            cap: Duration::minutes(15),
        }
    }

    /// Delay before attempt number `attempt` (1-based: the delay applied
    /// after the first failed attempt is `delay_for_attempt(1)`).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let shift = attempt.saturating_sub(1).min(16);
        let delay = self.base * 2_i32.pow(shift);
        delay.min(self.cap)
    }

    /// Decide the follow-up for `call` after an attempt ended with `outcome`.
    pub fn decide(&self, call: &ScheduledCall, outcome: &CallOutcome) -> RetryDecision {
        if !outcome.is_retryable() || call.attempts >= call.max_attempts {
            return RetryDecision::Finalize {
                status: outcome.final_status(),
            };
        }
        RetryDecision::Retry {
            delay: self.delay_for_attempt(call.attempts),
        }
    }
}
