//! Reqwest-backed automation webhook adapter.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use super::dto::{
    Envelope, GenerationRequestDto, GenerationResponseDto, PublishRequestDto, PublishResponseDto,
};
use crate::domain::ports::{
    ContentGenerationWebhook, GenerationRequest, PublishRequest, PublishWebhook, WebhookError,
};
use crate::domain::{GeneratedDraft, PublishReceipt};

const BODY_PREVIEW_CHAR_LIMIT: usize = 160;

/// Client for the content generation and publish webhooks.
pub struct AutomationHttpWebhooks {
    client: Client,
    generation_endpoint: Url,
    publish_endpoint: Url,
}

impl AutomationHttpWebhooks {
    /// Build the adapter with a shared client bounded by `timeout`.
    ///
    /// # Errors
    ///
    /// Returns an error when the reqwest client cannot be constructed.
    pub fn new(
        generation_endpoint: Url,
        publish_endpoint: Url,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            generation_endpoint,
            publish_endpoint,
        })
    }

    async fn call<B, R>(&self, endpoint: &Url, body: &B) -> Result<R, WebhookError>
    where
        B: Serialize + Sync,
        R: DeserializeOwned + Send,
    {
        let response = self
            .client
            .post(endpoint.clone())
            .header(reqwest::header::ACCEPT, "application/json")
            .json(body)
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        let bytes = response.bytes().await.map_err(map_transport_error)?;
        if !status.is_success() {
            return Err(map_status_error(status, bytes.as_ref()));
        }

        let envelope: Envelope<R> = serde_json::from_slice(bytes.as_ref()).map_err(|error| {
            WebhookError::rejected(format!("unrecognised webhook payload: {error}"))
        })?;
        envelope
            .into_first()
            .ok_or_else(|| WebhookError::rejected("webhook returned an empty batch"))
    }
}

#[async_trait]
impl ContentGenerationWebhook for AutomationHttpWebhooks {
    async fn generate(&self, request: &GenerationRequest) -> Result<GeneratedDraft, WebhookError> {
        let response: GenerationResponseDto = self
            .call(&self.generation_endpoint, &GenerationRequestDto::from(request))
            .await?;
        let draft = response.into_domain().map_err(WebhookError::rejected)?;
        debug!(post_id = %request.post_id, has_image = draft.image.is_some(), "draft generated");
        Ok(draft)
    }
}

#[async_trait]
impl PublishWebhook for AutomationHttpWebhooks {
    async fn publish(&self, request: &PublishRequest) -> Result<PublishReceipt, WebhookError> {
        let response: PublishResponseDto = self
            .call(&self.publish_endpoint, &PublishRequestDto::from(request))
            .await?;
        let receipt = response.into_domain().map_err(WebhookError::rejected)?;
        debug!(
            post_id = %request.post_id,
            external_post_id = %receipt.external_post_id,
            "post published"
        );
        Ok(receipt)
    }
}

fn map_transport_error(error: reqwest::Error) -> WebhookError {
    if error.is_timeout() {
        WebhookError::transport(format!("request timed out: {error}"))
    } else {
        WebhookError::transport(error.to_string())
    }
}

fn map_status_error(status: StatusCode, body: &[u8]) -> WebhookError {
    WebhookError::status(status.as_u16(), body_preview(body))
}

fn body_preview(body: &[u8]) -> String {
    let compact = String::from_utf8_lossy(body)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    let preview = compact
        .chars()
        .take(BODY_PREVIEW_CHAR_LIMIT)
        .collect::<String>();
    if compact.chars().count() > BODY_PREVIEW_CHAR_LIMIT {
        format!("{preview}...")
    } else {
        preview
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn status_errors_carry_a_compact_preview() {
        let error = map_status_error(StatusCode::BAD_GATEWAY, b"upstream\n   unavailable");
        assert_eq!(error, WebhookError::status(502_u16, "upstream unavailable"));
    }

    #[rstest]
    fn long_bodies_are_truncated() {
        let body = "x".repeat(BODY_PREVIEW_CHAR_LIMIT + 40);
        let preview = body_preview(body.as_bytes());
        assert!(preview.ends_with("..."));
        assert_eq!(preview.chars().count(), BODY_PREVIEW_CHAR_LIMIT + 3);
    }
}
