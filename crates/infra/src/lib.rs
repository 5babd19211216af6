//! `dialout-infra` — runtime infrastructure for the call scheduler.
//!
//! Everything here does I/O or holds mutable process state:
//!
//! - [`store`]: the [`CallStore`] trait and its in-memory implementation
//! - [`rate_limit`]: per-caller rolling counters and the blocklist
//! - [`tenants`]: per-tenant runtime configuration (bridge URL, retry
//!   settings, current service token)
//! - [`bridge`]: the HTTP client for the telephony bridge
//! - [`dispatcher`]: one dispatch attempt, start to follow-up
//! - [`scheduler`]: the timer map that fires dispatches at the right time

pub mod bridge;
pub mod dispatcher;
pub mod rate_limit;
pub mod scheduler;
pub mod store;
pub mod tenants;

pub use bridge::{BridgeClient, BridgeError, HttpBridgeClient, OutboundCallRequest};
pub use dispatcher::{CallDispatcher, DispatchFollowUp};
pub use rate_limit::{RateDecision, RateLimitConfig, RateLimitRecord, RateLimiter};
pub use scheduler::CallScheduler;
pub use store::{CallStore, CallStoreError, InMemoryCallStore};
pub use tenants::{TenantConfig, TenantDirectory};
