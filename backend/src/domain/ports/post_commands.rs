//! Driving ports for the post lifecycle.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::domain::{Error, Post, PostImage, UserId};

/// A user-authored draft.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateDraftRequest {
    pub user_id: UserId,
    pub content: String,
    pub image: Option<PostImage>,
}

/// A voice memo to turn into a draft.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoiceMemoRequest {
    pub user_id: UserId,
    pub audio_file_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchedulePostRequest {
    pub user_id: UserId,
    pub post_id: Uuid,
    pub scheduled_at: DateTime<Utc>,
}

/// Publish a post now.
///
/// `content` and `image` override the stored values when present, letting
/// the user publish an edited preview.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishPostRequest {
    pub user_id: UserId,
    pub post_id: Uuid,
    pub content: Option<String>,
    pub image: Option<PostImage>,
}

/// A successfully published post.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedPost {
    pub post: Post,
    pub post_url: Option<String>,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PostCommand: Send + Sync {
    async fn create_draft(&self, request: CreateDraftRequest) -> Result<Post, Error>;

    /// Create a post in `generating` and run content generation.
    ///
    /// Returns the post in its resulting state: `generated` on success, or
    /// an `ExternalService` error after the post has been marked `failed`.
    async fn submit_voice_memo(&self, request: VoiceMemoRequest) -> Result<Post, Error>;

    async fn schedule(&self, request: SchedulePostRequest) -> Result<Post, Error>;

    /// Charge one credit and publish through the webhook.
    async fn publish(&self, request: PublishPostRequest) -> Result<PublishedPost, Error>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PostQuery: Send + Sync {
    async fn get_post(&self, user_id: &UserId, post_id: Uuid) -> Result<Post, Error>;
}

/// Per-post outcome of a scheduled sweep.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase", tag = "outcome")]
pub enum SweepItemResult {
    Published {
        post_id: Uuid,
        linkedin_post_id: String,
    },
    Failed {
        post_id: Uuid,
        reason: String,
    },
}

/// Summary of a scheduled sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduledSweepSummary {
    pub processed: usize,
    pub results: Vec<SweepItemResult>,
}

/// Summary of a stale generation sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StaleSweepSummary {
    pub failed_post_ids: Vec<Uuid>,
}

/// Periodic reconciliation jobs, invoked by cron rather than users.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SweepCommand: Send + Sync {
    /// Publish due scheduled posts, bounded by the configured batch limit.
    async fn sweep_scheduled(&self) -> Result<ScheduledSweepSummary, Error>;

    /// Fail posts stuck in `generating` or `publishing` beyond the
    /// staleness window.
    async fn sweep_stale_generations(&self) -> Result<StaleSweepSummary, Error>;
}
