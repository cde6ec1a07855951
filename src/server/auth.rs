//! Bearer-token identity resolution
//!
//! Authentication itself is an external collaborator's job; the service only
//! needs a resolved user id per request. The bundled resolver accepts tokens
//! that are user UUIDs, which is what a reverse proxy terminating a real IdP
//! session would inject.

use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use uuid::Uuid;

use crate::error::{Error, Result};

use super::state::AppState;

/// Resolves a bearer token to a user id
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn resolve(&self, token: &str) -> Result<Uuid>;
}

/// Token-is-the-user-id resolver
pub struct BearerIdentity;

#[async_trait]
impl IdentityProvider for BearerIdentity {
    async fn resolve(&self, token: &str) -> Result<Uuid> {
        Uuid::parse_str(token).map_err(|_| Error::Unauthorized("invalid token".into()))
    }
}

/// Extractor for the authenticated user
///
/// Rejects the request with 401 before any handler logic runs when the
/// Authorization header is missing or the token does not resolve.
#[derive(Debug, Clone, Copy)]
pub struct AuthUser(pub Uuid);

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self> {
        let header = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| Error::Unauthorized("missing authorization header".into()))?;

        let token = header
            .strip_prefix("Bearer ")
            .ok_or_else(|| Error::Unauthorized("invalid authorization header".into()))?;

        let user_id = state.identity().resolve(token).await?;
        Ok(AuthUser(user_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn bearer_identity_accepts_uuids_only() {
        let id = Uuid::new_v4();
        let resolved = BearerIdentity.resolve(&id.to_string()).await.unwrap();
        assert_eq!(resolved, id);

        let err = BearerIdentity.resolve("not-a-uuid").await.unwrap_err();
        assert!(matches!(err, Error::Unauthorized(_)));
    }
}
