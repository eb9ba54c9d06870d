//! Canonical shapes for content exchanged with the automation webhooks.
//!
//! Upstream payloads vary in field naming; adapters normalise them into
//! these types at the boundary so the lifecycle only ever sees one shape.

use serde::{Deserialize, Serialize};

const REMOTE: &str = "url";
const INLINE: &str = "data";

/// Image attached to a post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum PostImage {
    /// Publicly reachable image URL.
    Remote(String),
    /// Inline image payload, typically a base64 data URI.
    Inline(String),
}

impl PostImage {
    /// Value persisted in `image_source_type`.
    pub fn source_type(&self) -> &'static str {
        match self {
            Self::Remote(_) => REMOTE,
            Self::Inline(_) => INLINE,
        }
    }

    /// Value persisted in `image_url`.
    pub fn into_reference(self) -> String {
        match self {
            Self::Remote(reference) | Self::Inline(reference) => reference,
        }
    }

    /// Rebuild an image from its persisted columns. Unknown source types
    /// are treated as remote URLs.
    pub fn from_parts(source_type: Option<&str>, reference: String) -> Self {
        match source_type {
            Some(INLINE) => Self::Inline(reference),
            _ => Self::Remote(reference),
        }
    }
}

/// Output of the content generation webhook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedDraft {
    pub content: String,
    pub image: Option<PostImage>,
}

/// Acknowledgement from the publish webhook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishReceipt {
    /// Identifier of the post on the social network.
    pub external_post_id: String,
    pub post_url: Option<String>,
}
