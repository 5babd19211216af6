//! Call record storage.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};

use dialout_calls::{CallPatch, CallStatus, ScheduledCall};
use dialout_core::{CallId, DomainError, TenantId};

/// Call store abstraction.
///
/// `update` applies a [`CallPatch`] while holding the store's write lock, so
/// a callback racing a local scheduling decision is serialized rather than
/// becoming a lost read-modify-write.
pub trait CallStore: Send + Sync {
    /// Persist a new call record.
    fn create(&self, call: ScheduledCall) -> Result<CallId, CallStoreError>;

    /// Fetch a call by id.
    fn get(&self, call_id: CallId) -> Result<Option<ScheduledCall>, CallStoreError>;

    /// Apply an atomic partial update, returning the updated record.
    fn update(&self, call_id: CallId, patch: CallPatch) -> Result<ScheduledCall, CallStoreError>;

    /// All `pending` records across tenants. Startup reload only.
    fn list_pending(&self) -> Result<Vec<ScheduledCall>, CallStoreError>;

    /// All `calling` records whose last attempt (or creation, if never
    /// attempted) predates `cutoff`, across tenants. Reconciliation only.
    fn list_stuck(&self, cutoff: DateTime<Utc>) -> Result<Vec<ScheduledCall>, CallStoreError>;

    /// A tenant's records, optionally filtered by status, ordered
    /// pending-first then by `scheduled_at`.
    fn list(
        &self,
        tenant_id: TenantId,
        status: Option<CallStatus>,
    ) -> Result<Vec<ScheduledCall>, CallStoreError>;
}

/// Call store error.
#[derive(Debug, Clone, thiserror::Error)]
pub enum CallStoreError {
    #[error("call not found: {0}")]
    NotFound(CallId),
    #[error("call already exists: {0}")]
    AlreadyExists(CallId),
    /// Expected-status guard failed (the record moved underneath the caller).
    #[error("stale update: {0}")]
    Conflict(String),
    /// The patch would break a record invariant.
    #[error("invariant violated: {0}")]
    Invariant(String),
    #[error("storage error: {0}")]
    Storage(String),
}

impl From<DomainError> for CallStoreError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::Conflict(msg) => CallStoreError::Conflict(msg),
            DomainError::InvariantViolation(msg) => CallStoreError::Invariant(msg),
            other => CallStoreError::Storage(other.to_string()),
        }
    }
}

/// In-memory call store.
#[derive(Debug, Default)]
pub struct InMemoryCallStore {
    calls: RwLock<HashMap<CallId, ScheduledCall>>,
}

impl InMemoryCallStore {
    pub fn new() -> Self {
        Self {
            calls: RwLock::new(HashMap::new()),
        }
    }

    pub fn arc() -> Arc<Self> {
        Arc::new(Self::new())
    }
}

impl CallStore for InMemoryCallStore {
    fn create(&self, call: ScheduledCall) -> Result<CallId, CallStoreError> {
        let mut calls = self.calls.write().unwrap();
        if calls.contains_key(&call.id) {
            return Err(CallStoreError::AlreadyExists(call.id));
        }
        let id = call.id;
        calls.insert(id, call);
        Ok(id)
    }

    fn get(&self, call_id: CallId) -> Result<Option<ScheduledCall>, CallStoreError> {
        let calls = self.calls.read().unwrap();
        Ok(calls.get(&call_id).cloned())
    }

    fn update(&self, call_id: CallId, patch: CallPatch) -> Result<ScheduledCall, CallStoreError> {
        let mut calls = self.calls.write().unwrap();
        let call = calls
            .get_mut(&call_id)
            .ok_or(CallStoreError::NotFound(call_id))?;
        patch.apply(call)?;
        Ok(call.clone())
    }

    fn list_pending(&self) -> Result<Vec<ScheduledCall>, CallStoreError> {
        let calls = self.calls.read().unwrap();
        let mut result: Vec<_> = calls
            .values()
            .filter(|c| c.status == CallStatus::Pending)
            .cloned()
            .collect();
        result.sort_by_key(|c| c.scheduled_at);
        Ok(result)
    }

    fn list_stuck(&self, cutoff: DateTime<Utc>) -> Result<Vec<ScheduledCall>, CallStoreError> {
        let calls = self.calls.read().unwrap();
        let mut result: Vec<_> = calls
            .values()
            .filter(|c| {
                c.status == CallStatus::Calling
                    && c.last_attempt_at.unwrap_or(c.created_at) < cutoff
            })
            .cloned()
            .collect();
        result.sort_by_key(|c| c.scheduled_at);
        Ok(result)
    }

    fn list(
        &self,
        tenant_id: TenantId,
        status: Option<CallStatus>,
    ) -> Result<Vec<ScheduledCall>, CallStoreError> {
        let calls = self.calls.read().unwrap();
        let mut result: Vec<_> = calls
            .values()
            .filter(|c| c.tenant_id == tenant_id && status.map_or(true, |s| c.status == s))
            .cloned()
            .collect();
        result.sort_by_key(|c| (c.status != CallStatus::Pending, c.scheduled_at));
        Ok(result)
    }
}

impl CallStore for Arc<InMemoryCallStore> {
    fn create(&self, call: ScheduledCall) -> Result<CallId, CallStoreError> {
        (**self).create(call)
    }

    fn get(&self, call_id: CallId) -> Result<Option<ScheduledCall>, CallStoreError> {
        (**self).get(call_id)
    }

    fn update(&self, call_id: CallId, patch: CallPatch) -> Result<ScheduledCall, CallStoreError> {
        (**self).update(call_id, patch)
    }

    fn list_pending(&self) -> Result<Vec<ScheduledCall>, CallStoreError> {
        (**self).list_pending()
    }

    fn list_stuck(&self, cutoff: DateTime<Utc>) -> Result<Vec<ScheduledCall>, CallStoreError> {
        (**self).list_stuck(cutoff)
    }

    fn list(
        &self,
        tenant_id: TenantId,
        status: Option<CallStatus>,
    ) -> Result<Vec<ScheduledCall>, CallStoreError> {
        (**self).list(tenant_id, status)
    }
}
