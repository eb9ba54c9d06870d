//! Reqwest-backed identity provider adapter.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use serde::Deserialize;
use zeroize::Zeroizing;

use crate::domain::UserId;
use crate::domain::ports::{IdentityProvider, IdentityProviderError};

#[derive(Debug, Deserialize)]
struct IdentityUserDto {
    id: String,
}

/// Resolves tokens through `GET {api_base}/user`.
pub struct IdentityHttpProvider {
    client: Client,
    user_endpoint: Url,
    api_key: Zeroizing<String>,
}

impl IdentityHttpProvider {
    /// Build the adapter with requests bounded by `timeout`.
    ///
    /// # Errors
    ///
    /// Returns an error when the client cannot be built or the user endpoint
    /// cannot be derived from `api_base`.
    pub fn new(
        api_base: &Url,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, IdentityProviderError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| IdentityProviderError::transport(err.to_string()))?;
        let user_endpoint = api_base
            .join("user")
            .map_err(|err| IdentityProviderError::transport(format!("invalid api base: {err}")))?;
        Ok(Self {
            client,
            user_endpoint,
            api_key: Zeroizing::new(api_key.into()),
        })
    }
}

#[async_trait]
impl IdentityProvider for IdentityHttpProvider {
    async fn resolve(&self, access_token: &str) -> Result<UserId, IdentityProviderError> {
        if access_token.trim().is_empty() {
            return Err(IdentityProviderError::invalid_token());
        }

        let response = self
            .client
            .get(self.user_endpoint.clone())
            .bearer_auth(access_token)
            .header("apikey", self.api_key.as_str())
            .send()
            .await
            .map_err(|err| IdentityProviderError::transport(err.to_string()))?;

        let status = response.status();
        if matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) {
            return Err(IdentityProviderError::invalid_token());
        }
        if !status.is_success() {
            return Err(IdentityProviderError::transport(format!(
                "identity provider returned status {}",
                status.as_u16()
            )));
        }

        let body = response
            .bytes()
            .await
            .map_err(|err| IdentityProviderError::transport(err.to_string()))?;
        parse_user(body.as_ref())
    }
}

fn parse_user(body: &[u8]) -> Result<UserId, IdentityProviderError> {
    let user: IdentityUserDto = serde_json::from_slice(body)
        .map_err(|err| IdentityProviderError::decode(format!("invalid user payload: {err}")))?;
    UserId::new(&user.id)
        .map_err(|err| IdentityProviderError::decode(format!("invalid user id: {err}")))
}
