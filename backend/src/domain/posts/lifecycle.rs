//! Post lifecycle service: drafting, generation, scheduling and publishing.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Duration;
use mockable::Clock;
use serde_json::json;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::domain::ports::{
    ContentGenerationWebhook, CreateDraftRequest, CreditLedgerRepository, GenerationRequest,
    PostCommand, PostQuery, PostRepository, PostRepositoryError, PublishPostRequest,
    PublishRequest, PublishWebhook, PublishedPost, SchedulePostRequest, VoiceMemoRequest,
};
use crate::domain::{CreditConsumptionGate, Error, UserId};

use super::{Post, PostPatch, PostStatus, PostTransition};

pub(super) fn map_post_repository_error(error: PostRepositoryError) -> Error {
    match error {
        PostRepositoryError::Connection { message } => {
            Error::service_unavailable(format!("post repository unavailable: {message}"))
        }
        PostRepositoryError::Query { message } => {
            Error::internal(format!("post repository error: {message}"))
        }
    }
}

fn require_text(value: &str, field: &str) -> Result<(), Error> {
    if value.trim().is_empty() {
        return Err(
            Error::invalid_request(format!("{field} must not be empty")).with_details(json!({
                "field": field,
                "code": "empty_field",
            })),
        );
    }
    Ok(())
}

fn status_conflict(post_id: Uuid, status: PostStatus, action: &str) -> Error {
    Error::conflict(format!("post cannot be {action} from status {status}")).with_details(json!({
        "postId": post_id,
        "status": status,
        "code": "invalid_post_status",
    }))
}

/// Tunables for the lifecycle and its sweeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PostLifecycleConfig {
    /// Posts left in `generating` or `publishing` longer than this are
    /// failed by the stale sweep.
    pub stale_generation_after: Duration,
    /// Maximum due scheduled posts processed per sweep.
    pub scheduled_batch_limit: u32,
}

impl Default for PostLifecycleConfig {
    fn default() -> Self {
        Self {
            stale_generation_after: Duration::minutes(15),
            scheduled_batch_limit: 10,
        }
    }
}

/// Drives posts through the lifecycle and owns every status write.
pub struct PostLifecycleService<R, L> {
    pub(super) posts: Arc<R>,
    pub(super) gate: CreditConsumptionGate<L>,
    generator: Arc<dyn ContentGenerationWebhook>,
    publisher: Arc<dyn PublishWebhook>,
    pub(super) clock: Arc<dyn Clock>,
    pub(super) config: PostLifecycleConfig,
}

impl<R, L> PostLifecycleService<R, L> {
    pub fn new(
        posts: Arc<R>,
        gate: CreditConsumptionGate<L>,
        generator: Arc<dyn ContentGenerationWebhook>,
        publisher: Arc<dyn PublishWebhook>,
        clock: Arc<dyn Clock>,
        config: PostLifecycleConfig,
    ) -> Self {
        Self {
            posts,
            gate,
            generator,
            publisher,
            clock,
            config,
        }
    }
}

impl<R, L> PostLifecycleService<R, L>
where
    R: PostRepository,
    L: CreditLedgerRepository,
{
    async fn load(&self, user_id: &UserId, post_id: Uuid) -> Result<Post, Error> {
        self.posts
            .find(post_id, user_id)
            .await
            .map_err(map_post_repository_error)?
            .ok_or_else(|| Error::not_found("post not found"))
    }

    /// Compare-and-swap `post` into `to`. Source statuses that are not
    /// lifecycle edges into `to` are dropped.
    pub(super) async fn transition(
        &self,
        post: &Post,
        from: &[PostStatus],
        to: PostStatus,
        patch: PostPatch,
    ) -> Result<Option<Post>, Error> {
        let from: Vec<_> = from
            .iter()
            .copied()
            .filter(|status| status.can_transition_to(to))
            .collect();
        let transition = PostTransition {
            post_id: post.id,
            user_id: post.user_id.clone(),
            from,
            to,
            patch,
            at: self.clock.utc(),
        };
        self.posts
            .transition(&transition)
            .await
            .map_err(map_post_repository_error)
    }

    /// Hand a claimed post back to `restore` after its charge was refused.
    ///
    /// `restore` may be the status the post was claimed from, which is not a
    /// lifecycle edge out of `publishing`, so the filter in
    /// [`Self::transition`] is bypassed.
    async fn release(&self, claimed: &Post, restore: PostStatus) -> Result<(), Error> {
        let transition = PostTransition {
            post_id: claimed.id,
            user_id: claimed.user_id.clone(),
            from: vec![PostStatus::Publishing],
            to: restore,
            patch: PostPatch::default(),
            at: self.clock.utc(),
        };
        if self
            .posts
            .transition(&transition)
            .await
            .map_err(map_post_repository_error)?
            .is_none()
        {
            warn!(post_id = %claimed.id, %restore, "claimed post changed state before release");
        }
        Ok(())
    }

    /// Charge a credit for a post already claimed into `publishing` and call
    /// the webhook.
    ///
    /// Only the caller that won the claim reaches this point, so a post is
    /// charged at most once per attempt. When no credit is available the post
    /// moves to `restore` and the webhook is never called. Shared by
    /// user-initiated and scheduled publishing.
    pub(super) async fn publish_claimed(
        &self,
        publishing: Post,
        restore: PostStatus,
    ) -> Result<PublishedPost, Error> {
        if let Err(refused) = self.gate.admit(&publishing.user_id, publishing.id).await {
            self.release(&publishing, restore).await?;
            return Err(refused);
        }

        let request = PublishRequest {
            post_id: publishing.id,
            user_id: publishing.user_id.clone(),
            content: publishing.content.clone(),
            image: publishing.image(),
        };
        match self.publisher.publish(&request).await {
            Ok(receipt) => {
                let patch = PostPatch {
                    linkedin_post_id: Some(receipt.external_post_id.clone()),
                    ..PostPatch::default()
                };
                let published = self
                    .transition(&publishing, &[PostStatus::Publishing], PostStatus::Published, patch)
                    .await
                    .inspect_err(|error| {
                        // The stale sweep fails the post once it outlives the cutoff.
                        error!(
                            post_id = %publishing.id,
                            linkedin_post_id = %receipt.external_post_id,
                            error = %error,
                            "published post could not be recorded"
                        );
                    })?
                    .ok_or_else(|| Error::internal("publishing post changed state unexpectedly"))?;
                info!(
                    user_id = %published.user_id,
                    post_id = %published.id,
                    linkedin_post_id = %receipt.external_post_id,
                    "post published"
                );
                Ok(PublishedPost {
                    post: published,
                    post_url: receipt.post_url,
                })
            }
            Err(error) => {
                warn!(post_id = %publishing.id, error = %error, "publish webhook failed");
                self.transition(
                    &publishing,
                    &[PostStatus::Publishing],
                    PostStatus::Failed,
                    PostPatch::default(),
                )
                .await?;
                self.gate
                    .record_lost_credit(&publishing.user_id, publishing.id, "publish webhook failed");
                Err(Error::external_service("publishing failed").with_details(json!({
                    "postId": publishing.id,
                    "status": PostStatus::Failed,
                })))
            }
        }
    }
}

#[async_trait]
impl<R, L> PostCommand for PostLifecycleService<R, L>
where
    R: PostRepository,
    L: CreditLedgerRepository,
{
    async fn create_draft(&self, request: CreateDraftRequest) -> Result<Post, Error> {
        require_text(&request.content, "content")?;
        let post = Post::draft(request.user_id, request.content, request.image, self.clock.utc());
        self.posts
            .insert(&post)
            .await
            .map_err(map_post_repository_error)?;
        Ok(post)
    }

    async fn submit_voice_memo(&self, request: VoiceMemoRequest) -> Result<Post, Error> {
        require_text(&request.audio_file_name, "audioFileName")?;
        let post = Post::generating(request.user_id, request.audio_file_name, self.clock.utc());
        self.posts
            .insert(&post)
            .await
            .map_err(map_post_repository_error)?;

        let generation = GenerationRequest {
            post_id: post.id,
            user_id: post.user_id.clone(),
            audio_file_name: post.audio_file_name.clone().unwrap_or_default(),
        };
        let draft = match self.generator.generate(&generation).await {
            Ok(draft) if !draft.content.trim().is_empty() => draft,
            Ok(_) => {
                self.transition(&post, &[PostStatus::Generating], PostStatus::Failed, PostPatch::default())
                    .await?;
                return Err(Error::external_service("content generation returned no content"));
            }
            Err(error) => {
                warn!(post_id = %post.id, error = %error, "content generation failed");
                self.transition(&post, &[PostStatus::Generating], PostStatus::Failed, PostPatch::default())
                    .await?;
                return Err(Error::external_service("content generation failed").with_details(
                    json!({ "postId": post.id, "status": PostStatus::Failed }),
                ));
            }
        };

        let patch = PostPatch {
            content: Some(draft.content),
            image: draft.image,
            ..PostPatch::default()
        };
        // A post swept to failed while generation ran stays failed.
        self.transition(&post, &[PostStatus::Generating], PostStatus::Generated, patch)
            .await?
            .ok_or_else(|| {
                warn!(post_id = %post.id, "generation finished after the post expired");
                Error::conflict("post generation expired")
            })
    }

    async fn schedule(&self, request: SchedulePostRequest) -> Result<Post, Error> {
        if request.scheduled_at <= self.clock.utc() {
            return Err(
                Error::invalid_request("scheduledAt must be in the future").with_details(json!({
                    "field": "scheduledAt",
                    "code": "schedule_in_past",
                })),
            );
        }
        let post = self.load(&request.user_id, request.post_id).await?;
        if !post.status.can_transition_to(PostStatus::Scheduled) {
            return Err(status_conflict(post.id, post.status, "scheduled"));
        }
        require_text(&post.content, "content")?;

        let patch = PostPatch {
            scheduled_at: Some(request.scheduled_at),
            ..PostPatch::default()
        };
        self.transition(&post, &PostStatus::SCHEDULABLE, PostStatus::Scheduled, patch)
            .await?
            .ok_or_else(|| Error::conflict("post changed state while scheduling"))
    }

    async fn publish(&self, request: PublishPostRequest) -> Result<PublishedPost, Error> {
        let post = self.load(&request.user_id, request.post_id).await?;
        if !post.status.can_transition_to(PostStatus::Publishing) {
            return Err(status_conflict(post.id, post.status, "published"));
        }
        let content = request.content.unwrap_or_else(|| post.content.clone());
        require_text(&content, "content")?;
        let patch = PostPatch {
            content: Some(content),
            image: request.image.or_else(|| post.image()),
            ..PostPatch::default()
        };

        let publishing = self
            .transition(&post, &PostStatus::PUBLISHABLE, PostStatus::Publishing, patch)
            .await?
            .ok_or_else(|| status_conflict(post.id, PostStatus::Publishing, "published"))?;
        self.publish_claimed(publishing, post.status).await
    }
}

#[async_trait]
impl<R, L> PostQuery for PostLifecycleService<R, L>
where
    R: PostRepository,
    L: CreditLedgerRepository,
{
    async fn get_post(&self, user_id: &UserId, post_id: Uuid) -> Result<Post, Error> {
        self.load(user_id, post_id).await
    }
}
