//! Authentication extractors.
//!
//! [`AuthUser`] validates the bearer token and yields the profile ID it
//! names. [`CurrentViewer`] goes one step further and resolves that profile
//! into a role-tagged [`Viewer`], so handlers never see an unsynced caller.

use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::{FromRequestParts, Query};
use axum::http::request::Parts;
use serde::Deserialize;

use dairylink_auth::{JwtValidator, ValidatedClaims};
use dairylink_control::{Coordinator, ProfileId, Viewer};

use crate::error::ApiError;
use crate::state::GatewayState;

/// An authenticated caller extracted from a JWT token.
///
/// The token comes from `Authorization: Bearer <token>`. Browsers cannot set
/// headers on WebSocket upgrades, so an `access_token` query parameter is
/// accepted as a fallback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthUser {
    /// The profile the token was issued for.
    pub profile_id: ProfileId,
}

impl AuthUser {
    /// Create an `AuthUser` from validated claims.
    #[must_use]
    pub const fn from_claims(claims: &ValidatedClaims) -> Self {
        Self {
            profile_id: claims.profile_id,
        }
    }
}

#[derive(Debug, Deserialize)]
struct TokenQuery {
    access_token: Option<String>,
}

fn bearer_token(parts: &Parts) -> Option<String> {
    let header = parts
        .headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(ToString::to_string);

    header.or_else(|| {
        Query::<TokenQuery>::try_from_uri(&parts.uri)
            .ok()
            .and_then(|Query(q)| q.access_token)
    })
}

#[async_trait]
impl<C, V> FromRequestParts<Arc<GatewayState<C, V>>> for AuthUser
where
    C: Coordinator + 'static,
    V: JwtValidator + 'static,
{
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<GatewayState<C, V>>,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts).ok_or(ApiError::Unauthorized)?;
        let claims = state.jwt_validator.validate(&token).await?;
        Ok(Self::from_claims(&claims))
    }
}

/// The authenticated caller's resolved profile.
///
/// Rejects with 404 if the caller has a valid token but has not synced a
/// profile yet.
#[derive(Debug, Clone)]
pub struct CurrentViewer(pub Viewer);

#[async_trait]
impl<C, V> FromRequestParts<Arc<GatewayState<C, V>>> for CurrentViewer
where
    C: Coordinator + 'static,
    V: JwtValidator + 'static,
{
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<GatewayState<C, V>>,
    ) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        let viewer = state.coordinator.resolve_viewer(&user.profile_id).await?;
        Ok(Self(viewer))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;
    use chrono::{Duration, Utc};
    use std::str::FromStr;

    fn parts(builder: axum::http::request::Builder) -> Parts {
        builder.body(()).unwrap().into_parts().0
    }

    #[test]
    fn auth_user_from_claims() {
        let profile_id = ProfileId::from_str("550e8400-e29b-41d4-a716-446655440000").unwrap();
        let claims = ValidatedClaims {
            profile_id,
            expires_at: Utc::now() + Duration::hours(1),
        };

        let user = AuthUser::from_claims(&claims);
        assert_eq!(user.profile_id, profile_id);
    }

    #[test]
    fn token_from_header() {
        let parts = parts(Request::get("/v1/me").header("authorization", "Bearer abc"));
        assert_eq!(bearer_token(&parts).as_deref(), Some("abc"));
    }

    #[test]
    fn token_from_query() {
        let parts = parts(Request::get("/v1/changes/ws?access_token=xyz"));
        assert_eq!(bearer_token(&parts).as_deref(), Some("xyz"));
    }

    #[test]
    fn missing_or_malformed_token() {
        assert!(bearer_token(&parts(Request::get("/v1/me"))).is_none());
        let basic = parts(Request::get("/v1/me").header("authorization", "Basic abc"));
        assert!(bearer_token(&basic).is_none());
    }
}
