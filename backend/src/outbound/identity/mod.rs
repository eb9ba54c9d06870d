//! Identity provider outbound adapter.
//!
//! Resolves bearer access tokens by asking the hosted auth service who the
//! token belongs to. The service owns sign-in, refresh and revocation; this
//! crate only consumes the resulting user id.

mod http_provider;

pub use http_provider::IdentityHttpProvider;
