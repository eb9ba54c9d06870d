//! Post lifecycle: entities, state machine and the services driving them.
//!
//! ```text
//! draft ──► scheduled ──► publishing ──► published
//!   │           │            ▲   │
//!   └───────────┼────────────┤   └──► failed
//!               └──► failed  │        (scheduled with no credits left)
//! generating ──► generated ──┘
//!     └──► failed (webhook error or stale watchdog, which also fails
//!                  posts stuck in publishing)
//! ```
//!
//! A publish attempt first claims the post into `publishing` and only then
//! charges a credit. A refused charge hands the post back to the status it
//! was claimed from, or to `failed` for scheduled posts.

mod content;
mod lifecycle;
mod sweeps;

#[cfg(test)]
mod tests;

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::UserId;

pub use content::{GeneratedDraft, PostImage, PublishReceipt};
pub use lifecycle::{PostLifecycleConfig, PostLifecycleService};

/// Status of a post as it moves through generation and publication.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PostStatus {
    Generating,
    Generated,
    Publishing,
    Published,
    Failed,
    Draft,
    Scheduled,
}

impl PostStatus {
    /// Statuses from which a publish attempt may start.
    pub const PUBLISHABLE: [Self; 4] = [Self::Draft, Self::Generated, Self::Scheduled, Self::Failed];

    /// Statuses from which a post may be scheduled.
    pub const SCHEDULABLE: [Self; 3] = [Self::Draft, Self::Generated, Self::Scheduled];

    /// Persisted string form.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Generating => "generating",
            Self::Generated => "generated",
            Self::Publishing => "publishing",
            Self::Published => "published",
            Self::Failed => "failed",
            Self::Draft => "draft",
            Self::Scheduled => "scheduled",
        }
    }

    /// Whether `self → next` is an edge of the lifecycle graph.
    ///
    /// # Examples
    /// ```
    /// use voicepost_backend::domain::PostStatus;
    ///
    /// assert!(PostStatus::Generating.can_transition_to(PostStatus::Failed));
    /// assert!(!PostStatus::Failed.can_transition_to(PostStatus::Generated));
    /// assert!(!PostStatus::Published.can_transition_to(PostStatus::Publishing));
    /// ```
    pub fn can_transition_to(self, next: Self) -> bool {
        match next {
            Self::Publishing => Self::PUBLISHABLE.contains(&self),
            Self::Scheduled => Self::SCHEDULABLE.contains(&self),
            Self::Generated => self == Self::Generating,
            Self::Published => self == Self::Publishing,
            Self::Failed => matches!(self, Self::Generating | Self::Publishing | Self::Scheduled),
            Self::Generating | Self::Draft => false,
        }
    }
}

impl fmt::Display for PostStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raised when a persisted post status string is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown post status: {0}")]
pub struct UnknownPostStatus(pub String);

impl FromStr for PostStatus {
    type Err = UnknownPostStatus;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "generating" => Ok(Self::Generating),
            "generated" => Ok(Self::Generated),
            "publishing" => Ok(Self::Publishing),
            "published" => Ok(Self::Published),
            "failed" => Ok(Self::Failed),
            "draft" => Ok(Self::Draft),
            "scheduled" => Ok(Self::Scheduled),
            other => Err(UnknownPostStatus(other.to_owned())),
        }
    }
}

/// A user-submitted post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: Uuid,
    pub user_id: UserId,
    pub content: String,
    pub status: PostStatus,
    pub audio_file_name: Option<String>,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub linkedin_post_id: Option<String>,
    pub image_url: Option<String>,
    pub image_source_type: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Post {
    fn blank(user_id: UserId, status: PostStatus, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            content: String::new(),
            status,
            audio_file_name: None,
            scheduled_at: None,
            linkedin_post_id: None,
            image_url: None,
            image_source_type: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// A draft written directly by the user.
    pub fn draft(
        user_id: UserId,
        content: impl Into<String>,
        image: Option<PostImage>,
        now: DateTime<Utc>,
    ) -> Self {
        let mut post = Self::blank(user_id, PostStatus::Draft, now);
        post.content = content.into();
        if let Some(image) = image {
            post.image_source_type = Some(image.source_type().to_owned());
            post.image_url = Some(image.into_reference());
        }
        post
    }

    /// A post awaiting content generation from a voice memo.
    pub fn generating(user_id: UserId, audio_file_name: impl Into<String>, now: DateTime<Utc>) -> Self {
        let mut post = Self::blank(user_id, PostStatus::Generating, now);
        post.audio_file_name = Some(audio_file_name.into());
        post
    }

    /// Image attached to the post, if any.
    pub fn image(&self) -> Option<PostImage> {
        let reference = self.image_url.clone()?;
        Some(PostImage::from_parts(self.image_source_type.as_deref(), reference))
    }
}

/// Field updates applied together with a status transition.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostPatch {
    pub content: Option<String>,
    pub image: Option<PostImage>,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub linkedin_post_id: Option<String>,
}

impl PostPatch {
    /// Apply the patch to an in-memory post.
    pub fn apply_to(&self, post: &mut Post) {
        if let Some(content) = &self.content {
            post.content.clone_from(content);
        }
        if let Some(image) = &self.image {
            post.image_source_type = Some(image.source_type().to_owned());
            post.image_url = Some(image.clone().into_reference());
        }
        if let Some(scheduled_at) = self.scheduled_at {
            post.scheduled_at = Some(scheduled_at);
        }
        if let Some(linkedin_post_id) = &self.linkedin_post_id {
            post.linkedin_post_id = Some(linkedin_post_id.clone());
        }
    }
}

/// A compare-and-swap status change.
///
/// Repositories apply it only when the stored status is one of `from`;
/// otherwise the post is left untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostTransition {
    pub post_id: Uuid,
    pub user_id: UserId,
    pub from: Vec<PostStatus>,
    pub to: PostStatus,
    pub patch: PostPatch,
    pub at: DateTime<Utc>,
}
