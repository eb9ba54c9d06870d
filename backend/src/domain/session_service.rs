//! Session exchange: identity-provider token → user id + signup grant.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::domain::ports::{
    CreditLedgerRepository, EstablishedSession, IdentityProvider, IdentityProviderError,
    SessionCommand,
};
use crate::domain::{CreditLedgerService, Error};

fn map_identity_error(error: IdentityProviderError) -> Error {
    match error {
        IdentityProviderError::InvalidToken => Error::unauthorized("access token rejected"),
        IdentityProviderError::Transport { message } => {
            warn!(error = %message, "identity provider unreachable");
            Error::external_service("identity provider request failed")
        }
        IdentityProviderError::Decode { message } => {
            warn!(error = %message, "identity provider sent an invalid response");
            Error::external_service("identity provider request failed")
        }
    }
}

/// Resolves tokens and issues the one-time signup credits.
pub struct SessionService<I: ?Sized, L> {
    identity: Arc<I>,
    ledger: CreditLedgerService<L>,
}

impl<I: ?Sized, L> SessionService<I, L> {
    pub fn new(identity: Arc<I>, ledger: CreditLedgerService<L>) -> Self {
        Self { identity, ledger }
    }
}

#[async_trait]
impl<I, L> SessionCommand for SessionService<I, L>
where
    I: IdentityProvider + ?Sized,
    L: CreditLedgerRepository,
{
    async fn establish(&self, access_token: &str) -> Result<EstablishedSession, Error> {
        let user_id = self
            .identity
            .resolve(access_token)
            .await
            .map_err(map_identity_error)?;
        let signup_credits_granted = self.ledger.grant_signup_credits(&user_id).await?;
        debug!(user_id = %user_id, ?signup_credits_granted, "session established");
        Ok(EstablishedSession {
            user_id,
            signup_credits_granted,
        })
    }
}
