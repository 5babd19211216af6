//! Per-caller rate limiting and blocklist.
//!
//! Counters are rolling windows over recorded call timestamps; daily counts
//! roll over at UTC midnight. Records are created lazily on first contact,
//! and an expired block clears lazily on the next check instead of via a
//! background sweep.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

/// Limiter thresholds. Any exceeded threshold denies the call.
#[derive(Debug, Clone, Copy)]
pub struct RateLimitConfig {
    pub max_calls_per_minute: u32,
    pub max_calls_per_hour: u32,
    pub max_calls_per_day: u32,
    pub max_minutes_per_day: u32,
    /// Applied when a block request does not specify a duration.
    pub default_block_hours: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_calls_per_minute: 3,
            max_calls_per_hour: 10,
            max_calls_per_day: 30,
            max_minutes_per_day: 120,
            default_block_hours: 24,
        }
    }
}

/// Outcome of a limiter check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RateDecision {
    Allowed,
    Denied {
        reason: String,
        /// When the caller may try again, if known.
        retry_after: Option<DateTime<Utc>>,
    },
}

impl RateDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, RateDecision::Allowed)
    }
}

/// Snapshot of one caller's counters, for the admin surface.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitRecord {
    pub caller_id: String,
    pub calls_last_minute: u32,
    pub calls_last_hour: u32,
    pub calls_today: u32,
    pub minutes_today: u32,
    pub is_blocked: bool,
    pub blocked_reason: Option<String>,
    pub blocked_until: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
struct Block {
    reason: String,
    /// None blocks indefinitely (until unblocked).
    until: Option<DateTime<Utc>>,
}

#[derive(Debug, Default)]
struct CallerState {
    call_times: Vec<DateTime<Utc>>,
    minutes_today: u32,
    minutes_day: Option<chrono::NaiveDate>,
    block: Option<Block>,
}

impl CallerState {
    /// Drop timestamps that no window can see anymore, roll the daily
    /// minute counter, and clear an expired block.
    fn refresh(&mut self, now: DateTime<Utc>) {
        let horizon = now - Duration::hours(24);
        self.call_times.retain(|t| *t > horizon);

        if self.minutes_day != Some(now.date_naive()) {
            self.minutes_day = Some(now.date_naive());
            self.minutes_today = 0;
        }

        if let Some(block) = &self.block {
            if block.until.is_some_and(|until| until <= now) {
                self.block = None;
            }
        }
    }

    fn calls_since(&self, since: DateTime<Utc>) -> u32 {
        self.call_times.iter().filter(|t| **t > since).count() as u32
    }

    fn calls_today(&self, now: DateTime<Utc>) -> u32 {
        let today = now.date_naive();
        self.call_times
            .iter()
            .filter(|t| t.date_naive() == today)
            .count() as u32
    }
}

/// Caller-keyed limiter. All checks and mutations happen under one lock, so
/// a check-then-record can never interleave with another caller's record.
#[derive(Debug)]
pub struct RateLimiter {
    config: RateLimitConfig,
    callers: Mutex<HashMap<String, CallerState>>,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            callers: Mutex::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    /// Check the caller against every threshold and, if allowed, record the
    /// call in the same critical section.
    pub fn check_and_record(&self, caller_id: &str) -> RateDecision {
        let now = Utc::now();
        let mut callers = self.callers.lock().unwrap();
        let state = callers.entry(caller_id.to_string()).or_default();
        state.refresh(now);

        if let Some(block) = &state.block {
            return RateDecision::Denied {
                reason: block.reason.clone(),
                retry_after: block.until,
            };
        }

        if state.calls_since(now - Duration::minutes(1)) >= self.config.max_calls_per_minute {
            return RateDecision::Denied {
                reason: "per-minute call limit reached".to_string(),
                retry_after: Some(now + Duration::minutes(1)),
            };
        }
        if state.calls_since(now - Duration::hours(1)) >= self.config.max_calls_per_hour {
            return RateDecision::Denied {
                reason: "per-hour call limit reached".to_string(),
                retry_after: Some(now + Duration::hours(1)),
            };
        }
        if state.calls_today(now) >= self.config.max_calls_per_day {
            return RateDecision::Denied {
                reason: "daily call limit reached".to_string(),
                retry_after: None,
            };
        }
        if state.minutes_today >= self.config.max_minutes_per_day {
            return RateDecision::Denied {
                reason: "daily minute budget exhausted".to_string(),
                retry_after: None,
            };
        }

        state.call_times.push(now);
        RateDecision::Allowed
    }

    /// Add completed call minutes to the caller's daily budget.
    pub fn record_minutes(&self, caller_id: &str, minutes: u32) {
        let now = Utc::now();
        let mut callers = self.callers.lock().unwrap();
        let state = callers.entry(caller_id.to_string()).or_default();
        state.refresh(now);
        state.minutes_today = state.minutes_today.saturating_add(minutes);
    }

    /// Block a caller. Overwrites any existing block (idempotent). `None`
    /// uses the configured default duration; zero hours blocks until
    /// explicitly unblocked.
    pub fn block(&self, caller_id: &str, reason: impl Into<String>, duration_hours: Option<u32>) {
        let hours = duration_hours.unwrap_or(self.config.default_block_hours);
        let until = (hours > 0).then(|| Utc::now() + Duration::hours(i64::from(hours)));
        let mut callers = self.callers.lock().unwrap();
        let state = callers.entry(caller_id.to_string()).or_default();
        state.block = Some(Block {
            reason: reason.into(),
            until,
        });
    }

    /// Remove any block on the caller. Succeeds whether or not one existed.
    pub fn unblock(&self, caller_id: &str) {
        let mut callers = self.callers.lock().unwrap();
        if let Some(state) = callers.get_mut(caller_id) {
            state.block = None;
        }
    }

    /// Current counters for one caller. Returns a zeroed record for callers
    /// never seen, so the admin surface always has something to show.
    pub fn get(&self, caller_id: &str) -> RateLimitRecord {
        let now = Utc::now();
        let mut callers = self.callers.lock().unwrap();
        let state = callers.entry(caller_id.to_string()).or_default();
        state.refresh(now);
        snapshot(caller_id, state, now)
    }

    /// All callers with an active block.
    pub fn list_blocked(&self) -> Vec<RateLimitRecord> {
        let now = Utc::now();
        let mut callers = self.callers.lock().unwrap();
        let mut result: Vec<_> = callers
            .iter_mut()
            .filter_map(|(caller_id, state)| {
                state.refresh(now);
                state.block.is_some().then(|| snapshot(caller_id, state, now))
            })
            .collect();
        result.sort_by(|a, b| a.caller_id.cmp(&b.caller_id));
        result
    }
}

fn snapshot(caller_id: &str, state: &CallerState, now: DateTime<Utc>) -> RateLimitRecord {
    RateLimitRecord {
        caller_id: caller_id.to_string(),
        calls_last_minute: state.calls_since(now - Duration::minutes(1)),
        calls_last_hour: state.calls_since(now - Duration::hours(1)),
        calls_today: state.calls_today(now),
        minutes_today: state.minutes_today,
        is_blocked: state.block.is_some(),
        blocked_reason: state.block.as_ref().map(|b| b.reason.clone()),
        blocked_until: state.block.as_ref().and_then(|b| b.until),
    }
}
