//! Bearer token authentication for dairylink.
//!
//! Sign-up and sign-in are handled by an external identity provider. This
//! crate only validates the access tokens it issues:
//!
//! - HS256 signature check against a shared secret
//! - Expiry, audience and (optionally) issuer validation
//! - Extraction of the profile ID from the `sub` claim
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐     ┌──────────────────┐
//! │   Gateway        │────▶│   JwtValidator   │
//! │   (HTTP/WS)      │     │   (trait)        │
//! └──────────────────┘     └────────┬─────────┘
//!                                   │
//!                     ┌─────────────┴─────────────┐
//!            ┌────────▼─────────┐       ┌─────────▼────────┐
//!            │ SecretValidator  │       │ MockJwtValidator │
//!            │ (HS256)          │       │ (tests, dev)     │
//!            └──────────────────┘       └──────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use dairylink_auth::{AuthConfig, JwtValidator, SecretValidator};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = AuthConfig {
//!     jwt_secret: "super-secret".to_string(),
//!     audience: "authenticated".to_string(),
//!     issuer: None,
//! };
//!
//! let validator = SecretValidator::new(&config);
//!
//! // In a request handler:
//! let token = "eyJhbGciOiJIUzI1NiIsInR5cCI6IkpXVCJ9...";
//! let claims = validator.validate(token).await?;
//!
//! println!("Profile ID: {}", claims.profile_id);
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod jwt;

pub use error::{AuthError, Result};
pub use jwt::{JwtValidator, SecretValidator, ValidatedClaims};

#[cfg(any(test, feature = "test-utils"))]
pub use jwt::MockJwtValidator;

/// Configuration for validating identity provider tokens.
#[derive(Clone)]
pub struct AuthConfig {
    /// Shared HS256 signing secret.
    pub jwt_secret: String,
    /// Expected JWT audience (`aud` claim).
    pub audience: String,
    /// Expected JWT issuer (`iss` claim). Not checked when `None`.
    pub issuer: Option<String>,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("jwt_secret", &"<redacted>")
            .field("audience", &self.audience)
            .field("issuer", &self.issuer)
            .finish()
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: String::new(),
            audience: "authenticated".to_string(),
            issuer: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = AuthConfig::default();
        assert_eq!(config.audience, "authenticated");
        assert!(config.issuer.is_none());
    }

    #[test]
    fn debug_hides_secret() {
        let config = AuthConfig {
            jwt_secret: "hunter2".to_string(),
            ..AuthConfig::default()
        };
        let debug = format!("{config:?}");
        assert!(!debug.contains("hunter2"));
        assert!(debug.contains("<redacted>"));
    }

    #[test]
    fn auth_error_status_codes() {
        assert_eq!(AuthError::TokenExpired.http_status_code(), 401);
        assert_eq!(AuthError::InvalidSignature.http_status_code(), 401);
        assert_eq!(AuthError::InvalidProfileId.http_status_code(), 401);
        assert_eq!(
            AuthError::Internal("test".into()).http_status_code(),
            500
        );
    }

    #[test]
    fn auth_error_retriable() {
        assert!(AuthError::TokenExpired.is_retriable());
        assert!(!AuthError::InvalidSignature.is_retriable());
        assert!(!AuthError::InvalidAudience.is_retriable());
    }
}
