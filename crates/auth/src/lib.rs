//! `dialout-auth` — pure authentication boundary (zero-trust).
//!
//! This crate is intentionally decoupled from HTTP and storage: it models
//! the two credential shapes the system accepts (tenant session JWTs and
//! bridge service tokens) and validates their *claims* deterministically.
//! Signature verification lives with the transport layer.

pub mod claims;
pub mod principal;
pub mod service_token;

pub use claims::{JwtClaims, TokenValidationError, validate_claims};
pub use principal::PrincipalId;
pub use service_token::{PHONE_SERVICE_TOKEN_TYPE, ServiceTokenClaims, ServiceTokenError};
