//! Single-attempt call dispatch.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use dialout_calls::{CallPatch, CallStatus, RetryPolicy};
use dialout_core::CallId;

use crate::bridge::{BridgeClient, OutboundCallRequest};
use crate::store::{CallStore, CallStoreError};
use crate::tenants::TenantDirectory;

/// What the timer task should do after one dispatch attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchFollowUp {
    /// Nothing more to do locally; either the call is in flight (the bridge
    /// will report back) or it reached a terminal state.
    Done,
    /// Local dispatch failed with attempts remaining; re-arm at this instant.
    RetryAt(DateTime<Utc>),
}

/// Executes exactly one dispatch attempt per invocation.
///
/// A failed transport still consumes an attempt; the caller (the scheduler's
/// timer task) re-arms on [`DispatchFollowUp::RetryAt`].
pub struct CallDispatcher {
    store: Arc<dyn CallStore>,
    tenants: Arc<TenantDirectory>,
    bridge: Arc<dyn BridgeClient>,
}

impl CallDispatcher {
    pub fn new(
        store: Arc<dyn CallStore>,
        tenants: Arc<TenantDirectory>,
        bridge: Arc<dyn BridgeClient>,
    ) -> Self {
        Self {
            store,
            tenants,
            bridge,
        }
    }

    pub async fn execute_outbound_call(&self, call_id: CallId) -> DispatchFollowUp {
        // Idempotent guard: a cancelled or otherwise terminal call whose
        // timer still fired is a no-op.
        let call = match self.store.get(call_id) {
            Ok(Some(call)) => call,
            Ok(None) => {
                warn!(call_id = %call_id, "dispatch fired for unknown call");
                return DispatchFollowUp::Done;
            }
            Err(e) => {
                warn!(call_id = %call_id, error = %e, "store read failed before dispatch");
                return DispatchFollowUp::Done;
            }
        };
        if call.status.is_terminal() {
            debug!(call_id = %call_id, status = call.status.as_str(), "skipping terminal call");
            return DispatchFollowUp::Done;
        }

        // Consume one attempt atomically before touching the network.
        let call = match self.store.update(
            call_id,
            CallPatch::new()
                .expect_status(&[
                    CallStatus::Pending,
                    CallStatus::Calling,
                    CallStatus::RetryScheduled,
                ])
                .status(CallStatus::Calling)
                .begin_attempt(None),
        ) {
            Ok(call) => call,
            Err(CallStoreError::Conflict(msg)) => {
                debug!(call_id = %call_id, reason = %msg, "call moved before dispatch");
                return DispatchFollowUp::Done;
            }
            Err(CallStoreError::Invariant(msg)) => {
                warn!(call_id = %call_id, reason = %msg, "attempts exhausted before dispatch");
                self.finalize_failed(call_id, "attempts exhausted before dispatch");
                return DispatchFollowUp::Done;
            }
            Err(e) => {
                warn!(call_id = %call_id, error = %e, "failed to begin attempt");
                return DispatchFollowUp::Done;
            }
        };

        // A missing bridge URL or service token is a configuration error,
        // not a transient one; no retry ladder applies.
        let Some(base_url) = self.tenants.bridge_base_url(call.tenant_id) else {
            self.finalize_failed(call_id, "no bridge URL configured for tenant");
            return DispatchFollowUp::Done;
        };
        let Some(token) = self.tenants.service_token(call.tenant_id) else {
            self.finalize_failed(call_id, "no service token issued for tenant");
            return DispatchFollowUp::Done;
        };

        let request = OutboundCallRequest::from_call(&call);
        match self.bridge.start_call(&base_url, &token, &request).await {
            Ok(()) => {
                info!(
                    call_id = %call_id,
                    tenant_id = %call.tenant_id,
                    attempt = call.attempts,
                    "call handed to bridge"
                );
                // Stays `calling`; the bridge reports the outcome via callback.
                DispatchFollowUp::Done
            }
            Err(e) => {
                if call.attempts < call.max_attempts {
                    let delay = RetryPolicy::dispatch().delay_for_attempt(call.attempts);
                    let next = Utc::now() + delay;
                    let patch = CallPatch::new()
                        .expect_status(&[CallStatus::Calling])
                        .status(CallStatus::Pending)
                        .scheduled_at(next)
                        .retry_reason(format!("dispatch failed: {e}"));
                    match self.store.update(call_id, patch) {
                        Ok(_) => {
                            warn!(
                                call_id = %call_id,
                                attempt = call.attempts,
                                next_attempt_at = %next,
                                error = %e,
                                "dispatch failed, retry armed"
                            );
                            DispatchFollowUp::RetryAt(next)
                        }
                        Err(update_err) => {
                            debug!(
                                call_id = %call_id,
                                error = %update_err,
                                "call moved while recording dispatch failure"
                            );
                            DispatchFollowUp::Done
                        }
                    }
                } else {
                    self.finalize_failed(call_id, &format!("dispatch failed: {e}"));
                    DispatchFollowUp::Done
                }
            }
        }
    }

    fn finalize_failed(&self, call_id: CallId, message: &str) {
        let patch = CallPatch::new()
            .status(CallStatus::Failed)
            .error_message(message);
        if let Err(e) = self.store.update(call_id, patch) {
            warn!(call_id = %call_id, error = %e, "failed to finalize call as failed");
        } else {
            warn!(call_id = %call_id, reason = message, "call finalized as failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use dialout_calls::{BridgePayload, ScheduledCall};
    use dialout_core::{PhoneNumber, TenantId};

    use crate::bridge::BridgeError;
    use crate::store::InMemoryCallStore;

    struct FakeBridge {
        requests: Mutex<Vec<OutboundCallRequest>>,
        fail_with: Option<BridgeError>,
    }

    impl FakeBridge {
        fn succeeding() -> Arc<Self> {
            Arc::new(Self {
                requests: Mutex::new(Vec::new()),
                fail_with: None,
            })
        }

        fn failing(err: BridgeError) -> Arc<Self> {
            Arc::new(Self {
                requests: Mutex::new(Vec::new()),
                fail_with: Some(err),
            })
        }

        fn request_count(&self) -> usize {
            self.requests.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl BridgeClient for FakeBridge {
        async fn start_call(
            &self,
            _base_url: &str,
            _service_token: &str,
            request: &OutboundCallRequest,
        ) -> Result<(), BridgeError> {
            self.requests.lock().unwrap().push(request.clone());
            match &self.fail_with {
                Some(e) => Err(e.clone()),
                None => Ok(()),
            }
        }
    }

    fn setup(bridge: Arc<FakeBridge>) -> (Arc<InMemoryCallStore>, Arc<TenantDirectory>, CallDispatcher) {
        let store = InMemoryCallStore::arc();
        let tenants = Arc::new(TenantDirectory::new());
        let dispatcher = CallDispatcher::new(store.clone(), tenants.clone(), bridge);
        (store, tenants, dispatcher)
    }

    fn configured_tenant(tenants: &TenantDirectory) -> TenantId {
        let tenant = TenantId::new();
        tenants.set_bridge_base_url(tenant, "http://bridge.local");
        tenants.set_service_token(tenant, "svc-token");
        tenant
    }

    fn immediate_call(tenant: TenantId) -> ScheduledCall {
        ScheduledCall::immediate(
            tenant,
            PhoneNumber::parse("+393331234567").unwrap(),
            BridgePayload::default(),
        )
    }

    #[tokio::test]
    async fn successful_dispatch_leaves_call_in_flight() {
        let bridge = FakeBridge::succeeding();
        let (store, tenants, dispatcher) = setup(bridge.clone());
        let tenant = configured_tenant(&tenants);
        let id = store.create(immediate_call(tenant)).unwrap();

        let follow_up = dispatcher.execute_outbound_call(id).await;
        assert_eq!(follow_up, DispatchFollowUp::Done);
        assert_eq!(bridge.request_count(), 1);

        let call = store.get(id).unwrap().unwrap();
        assert_eq!(call.status, CallStatus::Calling);
        assert_eq!(call.attempts, 1);
        assert_eq!(call.attempts_log.len(), 1);
    }

    #[tokio::test]
    async fn missing_bridge_config_finalizes_failed() {
        let bridge = FakeBridge::succeeding();
        let (store, _tenants, dispatcher) = setup(bridge.clone());
        let id = store.create(immediate_call(TenantId::new())).unwrap();

        let follow_up = dispatcher.execute_outbound_call(id).await;
        assert_eq!(follow_up, DispatchFollowUp::Done);
        assert_eq!(bridge.request_count(), 0);

        let call = store.get(id).unwrap().unwrap();
        assert_eq!(call.status, CallStatus::Failed);
        assert!(call.error_message.unwrap().contains("bridge URL"));
        // The failed attempt was still consumed
        assert_eq!(call.attempts, 1);
    }

    #[tokio::test]
    async fn transport_failure_arms_dispatch_retry() {
        let bridge = FakeBridge::failing(BridgeError::Transport("connection refused".to_string()));
        let (store, tenants, dispatcher) = setup(bridge);
        let tenant = configured_tenant(&tenants);
        let id = store.create(immediate_call(tenant)).unwrap();

        let before = Utc::now();
        let follow_up = dispatcher.execute_outbound_call(id).await;
        let DispatchFollowUp::RetryAt(at) = follow_up else {
            panic!("expected a retry follow-up");
        };
        // First rung of the dispatch ladder is one minute
        assert!(at >= before + chrono::Duration::seconds(59));
        assert!(at <= Utc::now() + chrono::Duration::seconds(61));

        let call = store.get(id).unwrap().unwrap();
        assert_eq!(call.status, CallStatus::Pending);
        assert_eq!(call.attempts, 1);
        assert!(call.retry_reason.unwrap().contains("connection refused"));
    }

    #[tokio::test]
    async fn transport_failure_on_last_attempt_finalizes() {
        let bridge = FakeBridge::failing(BridgeError::Status(503));
        let (store, tenants, dispatcher) = setup(bridge);
        let tenant = configured_tenant(&tenants);
        let id = store
            .create(immediate_call(tenant).with_max_attempts(1))
            .unwrap();

        let follow_up = dispatcher.execute_outbound_call(id).await;
        assert_eq!(follow_up, DispatchFollowUp::Done);

        let call = store.get(id).unwrap().unwrap();
        assert_eq!(call.status, CallStatus::Failed);
        assert!(call.error_message.unwrap().contains("503"));
    }

    #[tokio::test]
    async fn cancelled_call_is_not_dispatched() {
        let bridge = FakeBridge::succeeding();
        let (store, tenants, dispatcher) = setup(bridge.clone());
        let tenant = configured_tenant(&tenants);
        let id = store.create(immediate_call(tenant)).unwrap();
        store
            .update(id, CallPatch::new().status(CallStatus::Cancelled))
            .unwrap();

        let follow_up = dispatcher.execute_outbound_call(id).await;
        assert_eq!(follow_up, DispatchFollowUp::Done);
        assert_eq!(bridge.request_count(), 0);

        let call = store.get(id).unwrap().unwrap();
        assert_eq!(call.status, CallStatus::Cancelled);
        assert_eq!(call.attempts, 0);
    }
}
