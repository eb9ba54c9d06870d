//! Shared HTTP adapter state.
//!
//! HTTP handlers accept this state via `actix_web::web::Data` so they only
//! depend on domain ports (use-cases) and remain testable without I/O.

use std::fmt;
use std::sync::Arc;

use sha2::{Digest, Sha256};
use zeroize::Zeroizing;

use crate::domain::ports::{
    CreditsQuery, PaymentOrderCommand, PaymentVerificationCommand, PostCommand, PostQuery,
    SessionCommand, SweepCommand,
};

/// Shared secret presented by the cron caller on internal sweep endpoints.
#[derive(Clone)]
pub struct CronSecret(Arc<Zeroizing<String>>);

impl CronSecret {
    pub fn new(secret: impl Into<String>) -> Self {
        Self(Arc::new(Zeroizing::new(secret.into())))
    }

    /// Compare a presented value against the secret.
    ///
    /// Digests are compared rather than the raw strings so timing reveals
    /// nothing about the secret's prefix. An empty secret never matches.
    pub fn matches(&self, presented: &str) -> bool {
        !self.0.is_empty() && Sha256::digest(self.0.as_bytes()) == Sha256::digest(presented.as_bytes())
    }
}

impl fmt::Debug for CronSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CronSecret(**redacted**)")
    }
}

/// Parameter object bundling all port implementations for HTTP handlers.
#[derive(Clone)]
pub struct HttpStatePorts {
    pub session: Arc<dyn SessionCommand>,
    pub credits: Arc<dyn CreditsQuery>,
    pub payment_orders: Arc<dyn PaymentOrderCommand>,
    pub payment_verification: Arc<dyn PaymentVerificationCommand>,
    pub posts: Arc<dyn PostCommand>,
    pub posts_query: Arc<dyn PostQuery>,
    pub sweeps: Arc<dyn SweepCommand>,
}

/// Dependency bundle for HTTP handlers.
#[derive(Clone)]
pub struct HttpState {
    pub session: Arc<dyn SessionCommand>,
    pub credits: Arc<dyn CreditsQuery>,
    pub payment_orders: Arc<dyn PaymentOrderCommand>,
    pub payment_verification: Arc<dyn PaymentVerificationCommand>,
    pub posts: Arc<dyn PostCommand>,
    pub posts_query: Arc<dyn PostQuery>,
    pub sweeps: Arc<dyn SweepCommand>,
    pub cron_secret: CronSecret,
}

impl HttpState {
    /// Construct state from a ports bundle and the sweep secret.
    pub fn new(ports: HttpStatePorts, cron_secret: CronSecret) -> Self {
        let HttpStatePorts {
            session,
            credits,
            payment_orders,
            payment_verification,
            posts,
            posts_query,
            sweeps,
        } = ports;
        Self {
            session,
            credits,
            payment_orders,
            payment_verification,
            posts,
            posts_query,
            sweeps,
            cron_secret,
        }
    }
}
