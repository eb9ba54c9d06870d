//! Port for resolving identity-provider access tokens to users.

use async_trait::async_trait;

use crate::domain::UserId;

use super::define_port_error;

define_port_error! {
    /// Errors raised by identity provider adapters.
    pub enum IdentityProviderError {
        /// The token is unknown, expired or revoked.
        InvalidToken => "access token rejected",
        /// The provider could not be reached or timed out.
        Transport { message: String } =>
            "identity provider transport failed: {message}",
        /// The provider answered with an unexpected payload.
        Decode { message: String } =>
            "identity provider response invalid: {message}",
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Resolve a bearer token to the user it was issued for.
    async fn resolve(&self, access_token: &str) -> Result<UserId, IdentityProviderError>;
}

/// Treats the token itself as the user id. Non-UUID tokens are rejected.
///
/// Only suitable for local development and tests.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixtureIdentityProvider;

#[async_trait]
impl IdentityProvider for FixtureIdentityProvider {
    async fn resolve(&self, access_token: &str) -> Result<UserId, IdentityProviderError> {
        UserId::new(access_token).map_err(|_| IdentityProviderError::invalid_token())
    }
}
