//! Ports for the external automation webhooks.
//!
//! One webhook turns a voice memo into a draft, the other publishes a post to
//! the user's social profile. Both are opaque collaborators reached over
//! HTTP; adapters normalise their loosely shaped responses into
//! [`GeneratedDraft`] and [`PublishReceipt`].

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::{GeneratedDraft, PostImage, PublishReceipt, UserId};

use super::define_port_error;

define_port_error! {
    /// Errors raised by webhook adapters.
    pub enum WebhookError {
        /// The webhook could not be reached or timed out.
        Transport { message: String } =>
            "webhook transport failed: {message}",
        /// The webhook answered with a non-success status.
        Status { status: u16, message: String } =>
            "webhook returned status {status}: {message}",
        /// The webhook answered successfully but reported a failure or sent
        /// an unrecognised payload.
        Rejected { message: String } =>
            "webhook rejected request: {message}",
    }
}

/// Input for content generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    pub post_id: Uuid,
    pub user_id: UserId,
    pub audio_file_name: String,
}

/// Input for publishing a post.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishRequest {
    pub post_id: Uuid,
    pub user_id: UserId,
    pub content: String,
    pub image: Option<PostImage>,
}

/// Port for the content generation webhook.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ContentGenerationWebhook: Send + Sync {
    async fn generate(&self, request: &GenerationRequest) -> Result<GeneratedDraft, WebhookError>;
}

/// Port for the publish webhook.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PublishWebhook: Send + Sync {
    async fn publish(&self, request: &PublishRequest) -> Result<PublishReceipt, WebhookError>;
}

/// Webhooks that succeed deterministically, for local runs without the
/// automation service.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixtureWebhooks;

#[async_trait]
impl ContentGenerationWebhook for FixtureWebhooks {
    async fn generate(&self, request: &GenerationRequest) -> Result<GeneratedDraft, WebhookError> {
        Ok(GeneratedDraft {
            content: format!("Draft generated from {}", request.audio_file_name),
            image: None,
        })
    }
}

#[async_trait]
impl PublishWebhook for FixtureWebhooks {
    async fn publish(&self, request: &PublishRequest) -> Result<PublishReceipt, WebhookError> {
        Ok(PublishReceipt {
            external_post_id: format!("urn:li:share:{}", request.post_id.simple()),
            post_url: None,
        })
    }
}
