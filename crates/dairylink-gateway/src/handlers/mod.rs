//! HTTP request handlers.
//!
//! This module contains all the endpoint handlers for the gateway API.

pub mod announcements;
pub mod collections;
pub mod farmers;
pub mod health;
pub mod messages;
pub mod profile;
pub mod ws;

use std::str::FromStr;

use axum::extract::FromRequest;

use crate::error::ApiError;

/// JSON request body whose rejections use the API error shape.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

/// Parse a path segment into an ID.
fn parse_id<T: FromStr>(s: &str, what: &str) -> Result<T, ApiError> {
    s.parse()
        .map_err(|_| ApiError::BadRequest(format!("invalid {what} ID: {s}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use dairylink_control::ProfileId;

    #[test]
    fn parse_valid_and_invalid_ids() {
        let id: ProfileId = parse_id("550e8400-e29b-41d4-a716-446655440000", "farmer").unwrap();
        assert_eq!(id.to_string(), "550e8400-e29b-41d4-a716-446655440000");

        let err = parse_id::<ProfileId>("nope", "farmer").unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(ref m) if m.contains("farmer")));
    }
}
