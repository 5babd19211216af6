use std::sync::Arc;

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
};
use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::Serialize;
use serde::de::DeserializeOwned;

use dialout_auth::{JwtClaims, ServiceTokenClaims, validate_claims};

use crate::context::{PrincipalContext, TenantContext};

/// HS256 key pair derived from the shared secret. Claim time windows are
/// tracked as chrono timestamps rather than `exp`/`nbf`, so the decoder
/// checks the signature only and claim validation stays in `dialout-auth`.
pub struct JwtKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl JwtKeys {
    pub fn from_secret(secret: &[u8]) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
        }
    }

    pub fn encode<T: Serialize>(&self, claims: &T) -> Result<String, jsonwebtoken::errors::Error> {
        jsonwebtoken::encode(&Header::new(Algorithm::HS256), claims, &self.encoding)
    }

    /// Verify the signature and deserialize the claims.
    pub fn decode<T: DeserializeOwned>(&self, token: &str) -> Result<T, jsonwebtoken::errors::Error> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.required_spec_claims.clear();
        validation.validate_exp = false;
        Ok(jsonwebtoken::decode::<T>(token, &self.decoding, &validation)?.claims)
    }
}

#[derive(Clone)]
pub struct AuthState {
    pub keys: Arc<JwtKeys>,
}

pub async fn auth_middleware(
    State(state): State<AuthState>,
    mut req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Result<Response, StatusCode> {
    let token = extract_bearer(req.headers())?;

    let claims: JwtClaims = state
        .keys
        .decode(token)
        .map_err(|_e| StatusCode::UNAUTHORIZED)?;
    validate_claims(&claims, Utc::now()).map_err(|_e| StatusCode::UNAUTHORIZED)?;

    req.extensions_mut()
        .insert(TenantContext::new(claims.tenant_id));
    req.extensions_mut()
        .insert(PrincipalContext::new(claims.sub));

    Ok(next.run(req).await)
}

/// Verify a bridge service token: signature, token type, and revocation are
/// all the caller's responsibility beyond this point; this returns the
/// decoded claims plus the raw token for the registry comparison.
pub fn decode_service_token(
    keys: &JwtKeys,
    headers: &HeaderMap,
) -> Result<(ServiceTokenClaims, String), StatusCode> {
    let token = extract_bearer(headers)?;
    let claims: ServiceTokenClaims = keys.decode(token).map_err(|_e| StatusCode::UNAUTHORIZED)?;
    claims.validate().map_err(|_e| StatusCode::UNAUTHORIZED)?;
    Ok((claims, token.to_string()))
}

fn extract_bearer(headers: &HeaderMap) -> Result<&str, StatusCode> {
    let header = headers
        .get(axum::http::header::AUTHORIZATION)
        .ok_or(StatusCode::UNAUTHORIZED)?;

    let header = header.to_str().map_err(|_| StatusCode::UNAUTHORIZED)?;

    let header = header
        .strip_prefix("Bearer ")
        .ok_or(StatusCode::UNAUTHORIZED)?;

    let token = header.trim();
    if token.is_empty() {
        return Err(StatusCode::UNAUTHORIZED);
    }

    Ok(token)
}
