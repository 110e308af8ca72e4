//! Gateway application state.

use std::sync::Arc;

use dairylink_auth::JwtValidator;
use dairylink_control::Coordinator;

use crate::config::GatewayConfig;

/// Shared application state for the gateway.
pub struct GatewayState<C, V>
where
    C: Coordinator,
    V: JwtValidator,
{
    /// The coordination service.
    pub coordinator: Arc<C>,
    /// The JWT validator for authentication.
    pub jwt_validator: Arc<V>,
    /// Gateway configuration.
    pub config: GatewayConfig,
}

impl<C, V> GatewayState<C, V>
where
    C: Coordinator,
    V: JwtValidator,
{
    /// Create a new gateway state.
    #[must_use]
    pub fn new(coordinator: Arc<C>, jwt_validator: Arc<V>, config: GatewayConfig) -> Self {
        Self {
            coordinator,
            jwt_validator,
            config,
        }
    }
}

impl<C, V> Clone for GatewayState<C, V>
where
    C: Coordinator,
    V: JwtValidator,
{
    fn clone(&self) -> Self {
        Self {
            coordinator: Arc::clone(&self.coordinator),
            jwt_validator: Arc::clone(&self.jwt_validator),
            config: self.config.clone(),
        }
    }
}
