//! PostgreSQL-backed `PostRepository` implementation using Diesel ORM.
//!
//! Status transitions compile to a single
//! `UPDATE posts ... WHERE id = $1 AND user_id = $2 AND status = ANY($3)`,
//! so the database arbitrates between concurrent publish attempts and
//! sweeps. The row is returned only to the caller that won. Scheduled sweeps
//! claim due rows with `FOR UPDATE SKIP LOCKED`, so overlapping sweeps split
//! the batch instead of sharing it.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use diesel_async::scoped_futures::ScopedFutureExt as _;
use diesel_async::AsyncConnection as _;
use uuid::Uuid;

use crate::domain::ports::{PostRepository, PostRepositoryError};
use crate::domain::{Post, PostStatus, PostTransition, UserId};

use super::diesel_error_mapping::{DbFailure, classify_diesel_error, pool_error_message};
use super::models::{NewPostRow, PostRow, PostTransitionChangeset};
use super::pool::{DbPool, PoolError};
use super::schema::posts;

/// Diesel-backed implementation of the `PostRepository` port.
#[derive(Clone)]
pub struct DieselPostRepository {
    pool: DbPool,
}

impl DieselPostRepository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn map_pool_error(error: PoolError) -> PostRepositoryError {
    PostRepositoryError::connection(pool_error_message(error))
}

fn map_diesel_error(error: diesel::result::Error) -> PostRepositoryError {
    match classify_diesel_error(error) {
        DbFailure::Connection(message) => PostRepositoryError::connection(message),
        DbFailure::UniqueViolation(constraint) => {
            PostRepositoryError::query(format!("unique constraint violated: {constraint}"))
        }
        DbFailure::Query(message) => PostRepositoryError::query(message),
    }
}

fn row_to_post(row: PostRow) -> Result<Post, PostRepositoryError> {
    row.into_domain().map_err(PostRepositoryError::query)
}

fn changeset_for(transition: &PostTransition) -> PostTransitionChangeset {
    let patch = &transition.patch;
    PostTransitionChangeset {
        status: transition.to.as_str().to_owned(),
        content: patch.content.clone(),
        image_url: patch.image.clone().map(|image| image.into_reference()),
        image_source_type: patch
            .image
            .as_ref()
            .map(|image| image.source_type().to_owned()),
        scheduled_at: patch.scheduled_at,
        linkedin_post_id: patch.linkedin_post_id.clone(),
        updated_at: transition.at,
    }
}

#[async_trait]
impl PostRepository for DieselPostRepository {
    async fn insert(&self, post: &Post) -> Result<(), PostRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let row = NewPostRow {
            id: post.id,
            user_id: *post.user_id.as_uuid(),
            content: &post.content,
            status: post.status.as_str(),
            audio_file_name: post.audio_file_name.as_deref(),
            scheduled_at: post.scheduled_at,
            linkedin_post_id: post.linkedin_post_id.as_deref(),
            image_url: post.image_url.as_deref(),
            image_source_type: post.image_source_type.as_deref(),
            created_at: post.created_at,
            updated_at: post.updated_at,
        };

        diesel::insert_into(posts::table)
            .values(&row)
            .execute(&mut conn)
            .await
            .map(|_| ())
            .map_err(map_diesel_error)
    }

    async fn find(
        &self,
        post_id: Uuid,
        user_id: &UserId,
    ) -> Result<Option<Post>, PostRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let row: Option<PostRow> = posts::table
            .filter(posts::id.eq(post_id))
            .filter(posts::user_id.eq(user_id.as_uuid()))
            .select(PostRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;

        row.map(row_to_post).transpose()
    }

    async fn transition(
        &self,
        transition: &PostTransition,
    ) -> Result<Option<Post>, PostRepositoryError> {
        if transition.from.is_empty() {
            return Ok(None);
        }
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let expected: Vec<&str> = transition.from.iter().map(|status| status.as_str()).collect();

        let row: Option<PostRow> = diesel::update(
            posts::table
                .filter(posts::id.eq(transition.post_id))
                .filter(posts::user_id.eq(transition.user_id.as_uuid()))
                .filter(posts::status.eq_any(expected)),
        )
        .set(&changeset_for(transition))
        .returning(PostRow::as_returning())
        .get_result(&mut conn)
        .await
        .optional()
        .map_err(map_diesel_error)?;

        row.map(row_to_post).transpose()
    }

    async fn claim_due_scheduled(
        &self,
        now: DateTime<Utc>,
        limit: u32,
    ) -> Result<Vec<Post>, PostRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let rows = conn
            .transaction::<_, diesel::result::Error, _>(|conn| {
                async move {
                    // Rows locked by an overlapping sweep are skipped, not awaited.
                    let due: Vec<Uuid> = posts::table
                        .filter(posts::status.eq(PostStatus::Scheduled.as_str()))
                        .filter(posts::scheduled_at.le(now))
                        .order((posts::scheduled_at.asc(), posts::id.asc()))
                        .limit(i64::from(limit))
                        .select(posts::id)
                        .for_update()
                        .skip_locked()
                        .load(conn)
                        .await?;
                    if due.is_empty() {
                        return Ok(Vec::new());
                    }

                    let mut claimed: Vec<PostRow> = diesel::update(
                        posts::table
                            .filter(posts::id.eq_any(due))
                            .filter(posts::status.eq(PostStatus::Scheduled.as_str())),
                    )
                    .set((
                        posts::status.eq(PostStatus::Publishing.as_str()),
                        posts::updated_at.eq(now),
                    ))
                    .returning(PostRow::as_returning())
                    .get_results(conn)
                    .await?;
                    claimed.sort_by_key(|row| (row.scheduled_at, row.id));
                    Ok(claimed)
                }
                .scope_boxed()
            })
            .await
            .map_err(map_diesel_error)?;

        rows.into_iter().map(row_to_post).collect()
    }

    async fn fail_stale_in_flight(
        &self,
        cutoff: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<Vec<Uuid>, PostRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let in_flight = [
            PostStatus::Generating.as_str(),
            PostStatus::Publishing.as_str(),
        ];

        diesel::update(
            posts::table
                .filter(posts::status.eq_any(in_flight))
                .filter(posts::updated_at.lt(cutoff)),
        )
        .set((
            posts::status.eq(PostStatus::Failed.as_str()),
            posts::updated_at.eq(now),
        ))
        .returning(posts::id)
        .get_results(&mut conn)
        .await
        .map_err(map_diesel_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{PostImage, PostPatch};
    use rstest::rstest;

    fn transition(patch: PostPatch) -> PostTransition {
        PostTransition {
            post_id: Uuid::new_v4(),
            user_id: UserId::random(),
            from: vec![PostStatus::Draft],
            to: PostStatus::Publishing,
            patch,
            at: Utc::now(),
        }
    }

    #[rstest]
    fn empty_patch_only_touches_status_and_timestamp() {
        let changes = changeset_for(&transition(PostPatch::default()));
        assert_eq!(changes.status, "publishing");
        assert!(changes.content.is_none());
        assert!(changes.image_url.is_none());
        assert!(changes.scheduled_at.is_none());
        assert!(changes.linkedin_post_id.is_none());
    }

    #[rstest]
    fn image_patch_sets_reference_and_source_type() {
        let changes = changeset_for(&transition(PostPatch {
            image: Some(PostImage::Remote("https://cdn.example/a.png".into())),
            ..PostPatch::default()
        }));
        assert_eq!(changes.image_url.as_deref(), Some("https://cdn.example/a.png"));
        assert_eq!(changes.image_source_type.as_deref(), Some("url"));
    }

    #[rstest]
    fn unknown_status_rows_are_query_errors() {
        let now = Utc::now();
        let row = PostRow {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            content: String::new(),
            status: "archived".to_owned(),
            audio_file_name: None,
            scheduled_at: None,
            linkedin_post_id: None,
            image_url: None,
            image_source_type: None,
            created_at: now,
            updated_at: now,
        };
        let error = row_to_post(row).expect_err("unknown status");
        assert!(matches!(error, PostRepositoryError::Query { .. }));
    }
}
