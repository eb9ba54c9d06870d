//! Wire shapes for the automation webhooks.

use serde::{Deserialize, Serialize};

use crate::domain::ports::{GenerationRequest, PublishRequest};
use crate::domain::{GeneratedDraft, PostImage, PublishReceipt};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct GenerationRequestDto<'a> {
    pub(super) post_id: String,
    pub(super) user_id: &'a str,
    pub(super) audio_file_name: &'a str,
}

impl<'a> From<&'a GenerationRequest> for GenerationRequestDto<'a> {
    fn from(request: &'a GenerationRequest) -> Self {
        Self {
            post_id: request.post_id.to_string(),
            user_id: request.user_id.as_ref(),
            audio_file_name: &request.audio_file_name,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct PublishRequestDto<'a> {
    pub(super) post_id: String,
    pub(super) user_id: &'a str,
    pub(super) content: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(super) image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(super) image_source_type: Option<&'static str>,
}

impl<'a> From<&'a PublishRequest> for PublishRequestDto<'a> {
    fn from(request: &'a PublishRequest) -> Self {
        Self {
            post_id: request.post_id.to_string(),
            user_id: request.user_id.as_ref(),
            content: &request.content,
            image_url: request.image.clone().map(PostImage::into_reference),
            image_source_type: request.image.as_ref().map(PostImage::source_type),
        }
    }
}

/// Automation flows answer with either a bare object or a one-element
/// array wrapping it. `Batch` is tried first so an empty array is not
/// mistaken for an object with every field missing.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(super) enum Envelope<T> {
    Batch(Vec<T>),
    Single(T),
}

impl<T> Envelope<T> {
    pub(super) fn into_first(self) -> Option<T> {
        match self {
            Self::Batch(items) => items.into_iter().next(),
            Self::Single(item) => Some(item),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct GenerationResponseDto {
    #[serde(default)]
    success: Option<bool>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    post_draft: Option<String>,
    #[serde(default)]
    output: Option<String>,
    #[serde(default)]
    image_url: Option<String>,
    #[serde(default)]
    image_data: Option<String>,
}

impl GenerationResponseDto {
    pub(super) fn into_domain(self) -> Result<GeneratedDraft, String> {
        if self.success == Some(false) {
            return Err(self
                .error
                .unwrap_or_else(|| "generation reported failure".to_owned()));
        }
        let content = first_non_blank([self.content, self.post_draft, self.output])
            .ok_or("response carried no content")?;
        let image = non_blank(self.image_url)
            .map(PostImage::Remote)
            .or_else(|| non_blank(self.image_data).map(PostImage::Inline));
        Ok(GeneratedDraft { content, image })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct PublishResponseDto {
    #[serde(default)]
    success: Option<bool>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    post_id: Option<String>,
    #[serde(default)]
    linkedin_post_id: Option<String>,
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    post_url: Option<String>,
    #[serde(default)]
    url: Option<String>,
}

impl PublishResponseDto {
    pub(super) fn into_domain(self) -> Result<PublishReceipt, String> {
        if self.success == Some(false) {
            return Err(self
                .error
                .unwrap_or_else(|| "publish reported failure".to_owned()));
        }
        let external_post_id = first_non_blank([self.post_id, self.linkedin_post_id, self.id])
            .ok_or("response carried no post identifier")?;
        Ok(PublishReceipt {
            external_post_id,
            post_url: first_non_blank([self.post_url, self.url]),
        })
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|text| !text.trim().is_empty())
}

/// First usable value among the spellings of one field, in priority order.
fn first_non_blank<const N: usize>(candidates: [Option<String>; N]) -> Option<String> {
    candidates.into_iter().find_map(non_blank)
}
