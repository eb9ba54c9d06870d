//! Automation webhook outbound adapters.
//!
//! HTTP implementations of the `ContentGenerationWebhook` and
//! `PublishWebhook` ports. Responses from the automation service are loosely
//! shaped, so the DTOs accept every known field spelling and normalise into
//! the canonical domain types before anything else sees them.

mod dto;
mod http_webhooks;

pub use http_webhooks::AutomationHttpWebhooks;
