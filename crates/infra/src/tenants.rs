//! Per-tenant runtime configuration.
//!
//! Resolved at dispatch and callback time: where the tenant's telephony
//! bridge lives, how aggressively to retry, and which service token the
//! bridge currently holds. Issuing a new service token supersedes the
//! previous one, so a presented token is live iff it equals the current one.

use std::collections::HashMap;
use std::sync::RwLock;

use dialout_calls::RetrySettings;
use dialout_core::TenantId;

#[derive(Debug, Clone, Default)]
pub struct TenantConfig {
    pub bridge_base_url: Option<String>,
    pub retry: Option<RetrySettings>,
    /// The one live bridge credential for this tenant.
    service_token: Option<String>,
}

/// Tenant-keyed configuration registry.
#[derive(Debug, Default)]
pub struct TenantDirectory {
    tenants: RwLock<HashMap<TenantId, TenantConfig>>,
}

impl TenantDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bridge_base_url(&self, tenant_id: TenantId) -> Option<String> {
        let tenants = self.tenants.read().unwrap();
        tenants.get(&tenant_id)?.bridge_base_url.clone()
    }

    /// Tenant's retry settings, falling back to the defaults.
    pub fn retry_settings(&self, tenant_id: TenantId) -> RetrySettings {
        let tenants = self.tenants.read().unwrap();
        tenants
            .get(&tenant_id)
            .and_then(|c| c.retry)
            .unwrap_or_default()
    }

    pub fn set_bridge_base_url(&self, tenant_id: TenantId, url: impl Into<String>) {
        let mut tenants = self.tenants.write().unwrap();
        tenants.entry(tenant_id).or_default().bridge_base_url = Some(url.into());
    }

    pub fn set_retry_settings(&self, tenant_id: TenantId, settings: RetrySettings) {
        let mut tenants = self.tenants.write().unwrap();
        tenants.entry(tenant_id).or_default().retry = Some(settings);
    }

    /// Record a freshly issued service token as the tenant's current one,
    /// revoking whatever came before.
    pub fn set_service_token(&self, tenant_id: TenantId, token: impl Into<String>) {
        let mut tenants = self.tenants.write().unwrap();
        tenants.entry(tenant_id).or_default().service_token = Some(token.into());
    }

    pub fn service_token(&self, tenant_id: TenantId) -> Option<String> {
        let tenants = self.tenants.read().unwrap();
        tenants.get(&tenant_id)?.service_token.clone()
    }

    /// True when `token` is the tenant's current (non-revoked) credential.
    pub fn is_token_current(&self, tenant_id: TenantId, token: &str) -> bool {
        let tenants = self.tenants.read().unwrap();
        tenants
            .get(&tenant_id)
            .and_then(|c| c.service_token.as_deref())
            == Some(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retry_settings_default_when_unset() {
        let directory = TenantDirectory::new();
        assert_eq!(
            directory.retry_settings(TenantId::new()),
            RetrySettings::default()
        );
    }

    #[test]
    fn newer_token_supersedes_older() {
        let directory = TenantDirectory::new();
        let tenant = TenantId::new();

        directory.set_service_token(tenant, "token-one");
        assert!(directory.is_token_current(tenant, "token-one"));

        directory.set_service_token(tenant, "token-two");
        assert!(!directory.is_token_current(tenant, "token-one"));
        assert!(directory.is_token_current(tenant, "token-two"));
    }

    #[test]
    fn tokens_are_tenant_scoped() {
        let directory = TenantDirectory::new();
        let tenant_a = TenantId::new();
        let tenant_b = TenantId::new();

        directory.set_service_token(tenant_a, "shared-looking-token");
        assert!(!directory.is_token_current(tenant_b, "shared-looking-token"));
    }
}
