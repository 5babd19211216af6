//! Service wiring: store, tenant directory, rate limiter, dispatcher and
//! scheduler, shared by every handler through an `Extension`.

use std::sync::Arc;

use chrono::Utc;
use tracing::info;

use dialout_auth::ServiceTokenClaims;
use dialout_core::TenantId;
use dialout_infra::{
    CallDispatcher, CallScheduler, CallStore, HttpBridgeClient, InMemoryCallStore, RateLimitConfig,
    RateLimiter, TenantDirectory,
};

use crate::middleware::JwtKeys;

/// How often the stuck-call sweep runs, and how long a call may sit in
/// `calling` without a callback before the sweep picks it up.
const STUCK_SWEEP_SECS: u64 = 300;
const STUCK_AFTER_MINUTES: i64 = 10;

pub struct AppServices {
    pub store: Arc<dyn CallStore>,
    pub tenants: Arc<TenantDirectory>,
    pub rate_limiter: RateLimiter,
    pub scheduler: CallScheduler,
    pub keys: Arc<JwtKeys>,
}

impl AppServices {
    /// Issue a fresh bridge service token for the tenant and record it as
    /// current, revoking any previously issued one.
    pub fn issue_service_token(
        &self,
        tenant_id: TenantId,
    ) -> Result<(String, ServiceTokenClaims), jsonwebtoken::errors::Error> {
        let claims = ServiceTokenClaims::new(tenant_id, Utc::now());
        let token = self.keys.encode(&claims)?;
        self.tenants.set_service_token(tenant_id, token.clone());
        info!(tenant_id = %tenant_id, "service token issued");
        Ok((token, claims))
    }
}

pub fn build_services(keys: Arc<JwtKeys>) -> AppServices {
    let store: Arc<dyn CallStore> = InMemoryCallStore::arc();
    let tenants = Arc::new(TenantDirectory::new());
    let bridge = Arc::new(HttpBridgeClient::new());

    let dispatcher = CallDispatcher::new(store.clone(), tenants.clone(), bridge);
    let scheduler = CallScheduler::new(dispatcher, store.clone());
    let rearmed = scheduler.reload_pending();
    if rearmed > 0 {
        info!(rearmed, "pending calls re-armed at startup");
    }

    // Sweep for calls whose callback never arrived.
    let sweeper = scheduler.clone();
    tokio::spawn(async move {
        let mut tick = tokio::time::interval(std::time::Duration::from_secs(STUCK_SWEEP_SECS));
        loop {
            tick.tick().await;
            let handled = sweeper.reconcile_stuck(chrono::Duration::minutes(STUCK_AFTER_MINUTES));
            if handled > 0 {
                info!(handled, "stuck calls reconciled");
            }
        }
    });

    AppServices {
        store,
        tenants,
        rate_limiter: RateLimiter::new(RateLimitConfig::default()),
        scheduler,
        keys,
    }
}
