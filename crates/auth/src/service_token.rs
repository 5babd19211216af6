//! Bridge service-token claims.
//!
//! The telephony bridge authenticates callbacks with a long-lived,
//! tenant-scoped bearer credential. The token carries no expiry; revocation
//! is tracked separately (issuing a new token supersedes the previous one),
//! so claim validation here is limited to the token type.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use dialout_core::TenantId;

/// The only token type accepted on the callback surface.
pub const PHONE_SERVICE_TOKEN_TYPE: &str = "phone_service";

/// Claims carried by a bridge service token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceTokenClaims {
    /// Token discriminator; must be [`PHONE_SERVICE_TOKEN_TYPE`].
    #[serde(rename = "type")]
    pub token_type: String,

    /// Tenant whose calls this token may report on.
    pub tenant_id: TenantId,

    /// When the token was issued (informational; no expiry).
    pub created_at: DateTime<Utc>,
}

impl ServiceTokenClaims {
    pub fn new(tenant_id: TenantId, created_at: DateTime<Utc>) -> Self {
        Self {
            token_type: PHONE_SERVICE_TOKEN_TYPE.to_string(),
            tenant_id,
            created_at,
        }
    }

    /// Deterministic claim validation (type check only; signature and
    /// revocation are the transport layer's job).
    pub fn validate(&self) -> Result<(), ServiceTokenError> {
        if self.token_type != PHONE_SERVICE_TOKEN_TYPE {
            return Err(ServiceTokenError::WrongType(self.token_type.clone()));
        }
        Ok(())
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ServiceTokenError {
    #[error("wrong token type: {0:?}")]
    WrongType(String),

    #[error("token has been revoked")]
    Revoked,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phone_service_type_accepted() {
        let claims = ServiceTokenClaims::new(TenantId::new(), Utc::now());
        assert!(claims.validate().is_ok());
    }

    #[test]
    fn other_types_rejected() {
        let mut claims = ServiceTokenClaims::new(TenantId::new(), Utc::now());
        claims.token_type = "session".to_string();
        assert_eq!(
            claims.validate(),
            Err(ServiceTokenError::WrongType("session".to_string()))
        );
    }
}
