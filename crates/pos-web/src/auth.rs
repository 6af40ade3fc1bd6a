//! Token verification extractors: tenant-scoped bearer JWT, per-terminal API
//! key, and the core's own short-TTL service-to-service JWT.
//!
//! This module only *verifies* tokens the core receives — issuing end-user
//! credentials is out of scope. Minting is in scope for exactly one case:
//! the service-to-service token the core hands itself for inter-service
//! calls (delivery-status callbacks, report -> journal), via
//! [`mint_service_token`].

use axum::{async_trait, extract::FromRequestParts, http::request::Parts, http::StatusCode, response::{IntoResponse, Response}};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use pos_domain::ids::{StoreCode, TenantId, TerminalNo};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while verifying or minting a token.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("missing or malformed Authorization header")]
    MissingBearer,
    #[error("missing X-API-Key header")]
    MissingApiKey,
    #[error("token verification failed: {0}")]
    InvalidToken(#[from] jsonwebtoken::errors::Error),
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        tracing::warn!(error = %self, "authentication rejected");
        (StatusCode::UNAUTHORIZED, self.to_string()).into_response()
    }
}

/// Supplies the decoding/encoding keys a service's app state holds, so the
/// extractors below can verify tokens without owning secret material
/// themselves.
pub trait JwtKeys: Send + Sync {
    /// Secret backing tenant-scoped admin JWTs.
    fn tenant_secret(&self) -> &str;
    /// Secret backing the core's own service-to-service JWTs.
    fn service_secret(&self) -> &str;
}

/// Claims carried by a tenant-scoped admin bearer JWT. `tenant_id` is
/// authoritative: handlers must scope every datastore lookup to it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TenantClaims {
    pub tenant_id: TenantId,
    pub staff_id: Option<String>,
    pub exp: i64,
}

#[async_trait]
impl<S> FromRequestParts<S> for TenantClaims
where
    S: JwtKeys + Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts).ok_or(AuthError::MissingBearer)?;
        let data = decode::<TenantClaims>(
            token,
            &DecodingKey::from_secret(state.tenant_secret().as_bytes()),
            &Validation::default(),
        )?;
        Ok(data.claims)
    }
}

/// Per-terminal API key, resolved from the `X-API-Key` header. Resolution to
/// terminal identity/session state is the owning service's job (it has the
/// terminal repository this crate does not); this extractor only surfaces
/// the raw key.
#[derive(Debug, Clone)]
pub struct TerminalApiKey(pub String);

#[async_trait]
impl<S> FromRequestParts<S> for TerminalApiKey
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let key = parts
            .headers
            .get("X-API-Key")
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned)
            .ok_or(AuthError::MissingApiKey)?;
        Ok(Self(key))
    }
}

/// Claims carried by the core's own service-to-service JWT.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceClaims {
    pub service: String,
    pub tenant_id: Option<TenantId>,
    pub exp: i64,
}

#[async_trait]
impl<S> FromRequestParts<S> for ServiceClaims
where
    S: JwtKeys + Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts).ok_or(AuthError::MissingBearer)?;
        let data = decode::<ServiceClaims>(
            token,
            &DecodingKey::from_secret(state.service_secret().as_bytes()),
            &Validation::default(),
        )?;
        Ok(data.claims)
    }
}

fn bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
}

/// Mints a short-TTL service-to-service JWT, signed with `secret`, naming the
/// calling service and (when the call is tenant-scoped) the tenant it acts on
/// behalf of.
///
/// # Errors
///
/// Returns [`AuthError::InvalidToken`] if encoding fails.
pub fn mint_service_token(
    secret: &str,
    service: &str,
    tenant_id: Option<TenantId>,
    ttl: Duration,
) -> Result<String, AuthError> {
    let claims = ServiceClaims {
        service: service.to_string(),
        tenant_id,
        exp: (Utc::now() + ttl).timestamp(),
    };
    let token = encode(&Header::default(), &claims, &EncodingKey::from_secret(secret.as_bytes()))?;
    Ok(token)
}

/// Identifies the terminal a terminal-initiated request claims to act as,
/// once the owning service has resolved [`TerminalApiKey`] against its
/// terminal repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTerminal {
    pub tenant_id: TenantId,
    pub store_code: StoreCode,
    pub terminal_no: TerminalNo,
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    struct FakeState;

    impl JwtKeys for FakeState {
        fn tenant_secret(&self) -> &str {
            "tenant-secret"
        }
        fn service_secret(&self) -> &str {
            "service-secret"
        }
    }

    #[tokio::test]
    async fn tenant_claims_round_trip_through_bearer_header() {
        let claims = TenantClaims {
            tenant_id: TenantId::new("tenant-1"),
            staff_id: Some("staff-7".to_string()),
            exp: (Utc::now() + Duration::minutes(5)).timestamp(),
        };
        let token = encode(&Header::default(), &claims, &EncodingKey::from_secret(b"tenant-secret")).expect("encode");

        let req = Request::builder()
            .header("Authorization", format!("Bearer {token}"))
            .body(())
            .expect("valid request");
        let (mut parts, _) = req.into_parts();

        let extracted = TenantClaims::from_request_parts(&mut parts, &FakeState)
            .await
            .expect("should extract");
        assert_eq!(extracted.tenant_id, claims.tenant_id);
    }

    #[tokio::test]
    async fn missing_bearer_header_rejected() {
        let req = Request::builder().body(()).expect("valid request");
        let (mut parts, _) = req.into_parts();

        let result = TenantClaims::from_request_parts(&mut parts, &FakeState).await;
        assert!(matches!(result, Err(AuthError::MissingBearer)));
    }

    #[tokio::test]
    async fn terminal_api_key_extracted_from_header() {
        let req = Request::builder()
            .header("X-API-Key", "key-123")
            .body(())
            .expect("valid request");
        let (mut parts, _) = req.into_parts();

        let TerminalApiKey(key) = TerminalApiKey::from_request_parts(&mut parts, &FakeState)
            .await
            .expect("should extract");
        assert_eq!(key, "key-123");
    }

    #[test]
    fn mint_service_token_produces_verifiable_jwt() {
        let token = mint_service_token("service-secret", "pos-report", None, Duration::minutes(1))
            .expect("should mint");
        let data = decode::<ServiceClaims>(
            &token,
            &DecodingKey::from_secret(b"service-secret"),
            &Validation::default(),
        )
        .expect("should decode");
        assert_eq!(data.claims.service, "pos-report");
    }
}
