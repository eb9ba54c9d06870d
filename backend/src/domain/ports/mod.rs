//! Domain ports and supporting types for the hexagonal boundary.
//!
//! Driven ports (repositories, gateway, webhooks, identity) are implemented
//! by outbound adapters. Driving ports (`*Command`, `*Query`) are
//! implemented by domain services and consumed by inbound adapters.

mod macros;
pub(crate) use macros::define_port_error;

mod automation_webhooks;
mod credit_ledger_repository;
mod credits_query;
mod identity_provider;
mod payment_commands;
mod payment_gateway;
mod payment_repository;
mod post_commands;
mod post_repository;
mod session_command;

#[cfg(test)]
pub use automation_webhooks::{MockContentGenerationWebhook, MockPublishWebhook};
pub use automation_webhooks::{
    ContentGenerationWebhook, FixtureWebhooks, GenerationRequest, PublishRequest, PublishWebhook,
    WebhookError,
};
#[cfg(test)]
pub use credit_ledger_repository::MockCreditLedgerRepository;
pub use credit_ledger_repository::{CreditLedgerRepository, CreditLedgerRepositoryError};
#[cfg(test)]
pub use credits_query::MockCreditsQuery;
pub use credits_query::{CreditSummary, CreditsQuery};
#[cfg(test)]
pub use identity_provider::MockIdentityProvider;
pub use identity_provider::{FixtureIdentityProvider, IdentityProvider, IdentityProviderError};
#[cfg(test)]
pub use payment_commands::{MockPaymentOrderCommand, MockPaymentVerificationCommand};
pub use payment_commands::{
    CreatedPaymentOrder, PaymentOrderCommand, PaymentVerificationCommand,
    PaymentVerificationRequest, VerifiedPayment,
};
#[cfg(test)]
pub use payment_gateway::MockPaymentGateway;
pub use payment_gateway::{
    FixturePaymentGateway, GatewayOrder, GatewayOrderRequest, PaymentGateway, PaymentGatewayError,
};
#[cfg(test)]
pub use payment_repository::MockPaymentRepository;
pub use payment_repository::{
    PaymentRepository, PaymentRepositoryError, SettlementOutcome, SettlementRequest,
    ensure_settleable,
};
#[cfg(test)]
pub use post_commands::{MockPostCommand, MockPostQuery, MockSweepCommand};
pub use post_commands::{
    CreateDraftRequest, PostCommand, PostQuery, PublishPostRequest, PublishedPost,
    ScheduledSweepSummary, SchedulePostRequest, StaleSweepSummary, SweepCommand,
    SweepItemResult, VoiceMemoRequest,
};
#[cfg(test)]
pub use post_repository::MockPostRepository;
pub use post_repository::{PostRepository, PostRepositoryError};
#[cfg(test)]
pub use session_command::MockSessionCommand;
pub use session_command::{EstablishedSession, SessionCommand};
