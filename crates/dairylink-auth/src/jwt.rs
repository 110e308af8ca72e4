//! JWT validation and claims extraction.
//!
//! This module provides the core JWT validation logic, including signature
//! verification and claims validation.

use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::Deserialize;

use dairylink_core::ProfileId;

use crate::error::{AuthError, Result};
use crate::AuthConfig;

/// Validated claims extracted from a JWT.
#[derive(Debug, Clone)]
pub struct ValidatedClaims {
    /// The profile ID extracted from the `sub` claim.
    pub profile_id: ProfileId,
    /// When the token expires.
    pub expires_at: DateTime<Utc>,
}

/// Trait for validating JWTs.
#[async_trait]
pub trait JwtValidator: Send + Sync {
    /// Validate a JWT and extract claims.
    ///
    /// # Errors
    ///
    /// Returns an error if the token is invalid, expired, or cannot be validated.
    async fn validate(&self, token: &str) -> Result<ValidatedClaims>;
}

/// Raw claims from a JWT before validation.
#[derive(Debug, Deserialize)]
struct RawClaims {
    /// Subject (`profile_id` as UUID string). Absent on anonymous tokens.
    #[serde(default)]
    sub: Option<String>,
    /// Expiration timestamp
    exp: u64,
}

/// Shared-secret (HS256) JWT validator.
pub struct SecretValidator {
    key: DecodingKey,
    validation: Validation,
}

impl SecretValidator {
    /// Create a validator from the identity provider settings.
    #[must_use]
    pub fn new(config: &AuthConfig) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_audience(&[config.audience.as_str()]);
        if let Some(issuer) = &config.issuer {
            validation.set_issuer(&[issuer.as_str()]);
        }
        validation.validate_exp = true;

        Self {
            key: DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            validation,
        }
    }
}

#[async_trait]
impl JwtValidator for SecretValidator {
    async fn validate(&self, token: &str) -> Result<ValidatedClaims> {
        use jsonwebtoken::errors::ErrorKind;

        let token_data =
            decode::<RawClaims>(token, &self.key, &self.validation).map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                ErrorKind::InvalidIssuer => AuthError::InvalidIssuer,
                ErrorKind::InvalidAudience => AuthError::InvalidAudience,
                ErrorKind::InvalidSignature => AuthError::InvalidSignature,
                ErrorKind::MissingRequiredClaim(claim) => AuthError::MissingClaim(claim.clone()),
                _ => AuthError::InvalidToken(e.to_string()),
            })?;

        let claims = token_data.claims;

        let sub = claims
            .sub
            .ok_or_else(|| AuthError::MissingClaim("sub".to_string()))?;
        let profile_id = ProfileId::from_str(&sub).map_err(|_| AuthError::InvalidProfileId)?;

        let exp_secs = i64::try_from(claims.exp).unwrap_or(i64::MAX);
        let expires_at = DateTime::from_timestamp(exp_secs, 0)
            .ok_or_else(|| AuthError::InvalidToken("invalid exp timestamp".to_string()))?;

        tracing::trace!(%profile_id, "Validated token");

        Ok(ValidatedClaims {
            profile_id,
            expires_at,
        })
    }
}

/// A mock JWT validator for testing.
///
/// This validator accepts any token in the format `test-token:<profile_uuid>`
/// and extracts the ID from it.
#[cfg(any(test, feature = "test-utils"))]
#[derive(Debug, Default)]
pub struct MockJwtValidator;

#[cfg(any(test, feature = "test-utils"))]
#[async_trait]
impl JwtValidator for MockJwtValidator {
    async fn validate(&self, token: &str) -> Result<ValidatedClaims> {
        let rest = token
            .strip_prefix("test-token:")
            .ok_or_else(|| AuthError::InvalidToken("expected test-token:<profile>".to_string()))?;

        let profile_id = ProfileId::from_str(rest).map_err(|_| AuthError::InvalidProfileId)?;

        Ok(ValidatedClaims {
            profile_id,
            expires_at: Utc::now() + chrono::Duration::hours(1),
        })
    }
}
