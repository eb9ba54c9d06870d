//! Port for post persistence.
//!
//! Every status change goes through [`PostRepository::transition`], a
//! compare-and-swap keyed on the expected source statuses. Callers that
//! lose the race observe `None` and must not perform side effects.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::{Post, PostTransition, UserId};

use super::define_port_error;

define_port_error! {
    /// Errors raised by post repository adapters.
    pub enum PostRepositoryError {
        /// Repository connection could not be established.
        Connection { message: String } =>
            "post repository connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } =>
            "post repository query failed: {message}",
    }
}

/// Port for post storage.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PostRepository: Send + Sync {
    /// Persist a new post.
    async fn insert(&self, post: &Post) -> Result<(), PostRepositoryError>;

    /// Fetch a post owned by `user_id`.
    async fn find(
        &self,
        post_id: Uuid,
        user_id: &UserId,
    ) -> Result<Option<Post>, PostRepositoryError>;

    /// Apply a status change when the stored status is one of
    /// `transition.from`.
    ///
    /// Returns the updated post, or `None` when the post is missing or its
    /// status no longer matches.
    async fn transition(
        &self,
        transition: &PostTransition,
    ) -> Result<Option<Post>, PostRepositoryError>;

    /// Claim up to `limit` scheduled posts whose `scheduled_at` is at or
    /// before `now`, oldest schedule first, by moving them to `publishing`
    /// with `updated_at = now`.
    ///
    /// Concurrent callers never claim the same post.
    async fn claim_due_scheduled(
        &self,
        now: DateTime<Utc>,
        limit: u32,
    ) -> Result<Vec<Post>, PostRepositoryError>;

    /// Move every `generating` or `publishing` post last updated before
    /// `cutoff` to `failed`, stamping `updated_at = now`. Returns the
    /// affected ids.
    async fn fail_stale_in_flight(
        &self,
        cutoff: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<Vec<Uuid>, PostRepositoryError>;
}
