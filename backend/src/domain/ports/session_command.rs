//! Driving port for establishing an authenticated session.
//!
//! Inbound adapters exchange an identity-provider token for a user id
//! without importing the provider adapter, mirroring how handlers reach
//! every other use-case.

use async_trait::async_trait;

use crate::domain::{Error, UserId};

/// Result of a session exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EstablishedSession {
    pub user_id: UserId,
    /// Credits granted on this call; `None` once the signup grant exists.
    pub signup_credits_granted: Option<u32>,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SessionCommand: Send + Sync {
    async fn establish(&self, access_token: &str) -> Result<EstablishedSession, Error>;
}
