//! Domain primitives, aggregates and services.
//!
//! Purpose: define the credit ledger, payment and post lifecycle types and
//! the services enforcing their invariants. Services depend only on the
//! traits in [`ports`]; adapters live under `inbound` and `outbound`.
//!
//! Public surface:
//! - Error (alias to `error::Error`): API error response payload.
//! - ErrorCode (alias to `error::ErrorCode`): stable error identifier.
//! - CreditLedgerService / CreditConsumptionGate: balance and publish gate.
//! - PaymentOrderService / PaymentVerificationService: credit purchase.
//! - PostLifecycleService: post state machine and sweeps.
//! - SessionService: token exchange and signup credits.

pub mod credit_gate;
pub mod credit_ledger;
pub mod credits;
pub mod error;
pub mod payments;
pub mod ports;
pub mod posts;
pub mod session_service;
pub mod trace_id;
pub mod user;

pub use self::credit_gate::CreditConsumptionGate;
pub use self::credit_ledger::{CreditLedgerService, CreditOverviewService};
pub use self::credits::{
    CreditBalance, CreditGrant, CreditGrantValidationError, CreditSource, NewCreditGrant,
    UnknownCreditSource, available_credits,
};
pub use self::error::{Error, ErrorCode, ErrorValidationError};
pub use self::payments::{
    GatewaySecret, PaymentOrderService, PaymentRecord, PaymentSignatureVerifier, PaymentStatus,
    PaymentVerificationService, PricePlan, PricePlanTable, TransactionId, UnknownPaymentStatus,
};
pub use self::posts::{
    GeneratedDraft, Post, PostImage, PostLifecycleConfig, PostLifecycleService, PostPatch,
    PostStatus, PostTransition, PublishReceipt, UnknownPostStatus,
};
pub use self::session_service::SessionService;
pub use self::trace_id::{TRACE_ID_HEADER, TraceId};
pub use self::user::{UserId, UserValidationError};

/// Convenient API result alias.
///
/// # Examples
/// ```
/// use actix_web::HttpResponse;
/// use voicepost_backend::domain::{ApiResult, Error};
///
/// fn handler() -> ApiResult<HttpResponse> {
///     Err(Error::forbidden("nope"))
/// }
/// ```
pub type ApiResult<T> = Result<T, Error>;
