//! Post lifecycle handlers.
//!
//! ```text
//! POST /api/v1/posts/drafts {"content":"..","imageUrl":".."}
//! POST /api/v1/posts/generate {"audioFileName":"memo.webm"}
//! POST /api/v1/posts/{id}/schedule {"scheduledAt":"2026-03-01T09:30:00Z"}
//! POST /api/v1/posts/{id}/publish {"content":".."}
//! GET /api/v1/posts/{id}
//! ```

use actix_web::{HttpResponse, get, post, web};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::ports::{
    CreateDraftRequest, PublishPostRequest, PublishedPost, SchedulePostRequest, VoiceMemoRequest,
};
use crate::domain::{Post, PostImage};
use crate::inbound::http::ApiResult;
use crate::inbound::http::schemas::ErrorSchema;
use crate::inbound::http::session::SessionContext;
use crate::inbound::http::state::HttpState;
use crate::inbound::http::validation::{
    FieldName, parse_rfc3339_timestamp, parse_uuid, require_text,
};

const POST_ID: FieldName = FieldName::new("postId");

/// A post as returned to its owner.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PostBody {
    pub id: String,
    /// `draft`, `generating`, `generated`, `scheduled`, `publishing`,
    /// `published` or `failed`.
    pub status: String,
    pub content: String,
    pub audio_file_name: Option<String>,
    pub scheduled_at: Option<String>,
    pub linkedin_post_id: Option<String>,
    pub image_url: Option<String>,
    pub image_source_type: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Post> for PostBody {
    fn from(post: Post) -> Self {
        Self {
            id: post.id.to_string(),
            status: post.status.to_string(),
            content: post.content,
            audio_file_name: post.audio_file_name,
            scheduled_at: post.scheduled_at.map(|at| at.to_rfc3339()),
            linkedin_post_id: post.linkedin_post_id,
            image_url: post.image_url,
            image_source_type: post.image_source_type,
            created_at: post.created_at.to_rfc3339(),
            updated_at: post.updated_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateDraftBody {
    pub content: Option<String>,
    /// Public image URL. Takes precedence over `imageData`.
    pub image_url: Option<String>,
    /// Inline image, typically a data URI.
    pub image_data: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GeneratePostBody {
    /// Name of the uploaded voice memo in storage.
    pub audio_file_name: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SchedulePostBody {
    #[schema(example = "2026-03-01T09:30:00Z")]
    pub scheduled_at: Option<String>,
}

/// Optional overrides applied to the stored post before publishing.
#[derive(Debug, Default, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PublishPostBody {
    pub content: Option<String>,
    pub image_url: Option<String>,
    pub image_data: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PublishPostResponse {
    pub success: bool,
    pub post: PostBody,
    pub linkedin_post_id: Option<String>,
    pub post_url: Option<String>,
}

impl From<PublishedPost> for PublishPostResponse {
    fn from(published: PublishedPost) -> Self {
        let linkedin_post_id = published.post.linkedin_post_id.clone();
        Self {
            success: true,
            post: PostBody::from(published.post),
            linkedin_post_id,
            post_url: published.post_url,
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|text| !text.trim().is_empty())
}

fn image_from_body(image_url: Option<String>, image_data: Option<String>) -> Option<PostImage> {
    non_blank(image_url)
        .map(PostImage::Remote)
        .or_else(|| non_blank(image_data).map(PostImage::Inline))
}

/// Save a user-written draft.
#[utoipa::path(
    post,
    path = "/api/v1/posts/drafts",
    request_body = CreateDraftBody,
    responses(
        (status = 201, description = "Draft created", body = PostBody),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 401, description = "Unauthorised", body = ErrorSchema)
    ),
    tags = ["posts"],
    operation_id = "createDraft",
    security(("SessionCookie" = []))
)]
#[post("/posts/drafts")]
pub async fn create_draft(
    state: web::Data<HttpState>,
    session: SessionContext,
    payload: web::Json<CreateDraftBody>,
) -> ApiResult<HttpResponse> {
    let user_id = session.require_user_id()?;
    let CreateDraftBody {
        content,
        image_url,
        image_data,
    } = payload.into_inner();
    let content = require_text(content, FieldName::new("content"))?;
    let post = state
        .posts
        .create_draft(CreateDraftRequest {
            user_id,
            content,
            image: image_from_body(image_url, image_data),
        })
        .await?;
    Ok(HttpResponse::Created().json(PostBody::from(post)))
}

/// Turn an uploaded voice memo into a draft through the generation webhook.
#[utoipa::path(
    post,
    path = "/api/v1/posts/generate",
    request_body = GeneratePostBody,
    responses(
        (status = 201, description = "Content generated", body = PostBody),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 401, description = "Unauthorised", body = ErrorSchema),
        (status = 502, description = "Generation failed; the post is marked failed", body = ErrorSchema)
    ),
    tags = ["posts"],
    operation_id = "generatePost",
    security(("SessionCookie" = []))
)]
#[post("/posts/generate")]
pub async fn generate_post(
    state: web::Data<HttpState>,
    session: SessionContext,
    payload: web::Json<GeneratePostBody>,
) -> ApiResult<HttpResponse> {
    let user_id = session.require_user_id()?;
    let audio_file_name = require_text(
        payload.into_inner().audio_file_name,
        FieldName::new("audioFileName"),
    )?;
    let post = state
        .posts
        .submit_voice_memo(VoiceMemoRequest {
            user_id,
            audio_file_name,
        })
        .await?;
    Ok(HttpResponse::Created().json(PostBody::from(post)))
}

/// Schedule a post for publication by the scheduled sweep.
#[utoipa::path(
    post,
    path = "/api/v1/posts/{id}/schedule",
    params(("id" = String, Path, description = "Post identifier")),
    request_body = SchedulePostBody,
    responses(
        (status = 200, description = "Post scheduled", body = PostBody),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 401, description = "Unauthorised", body = ErrorSchema),
        (status = 404, description = "Unknown post", body = ErrorSchema),
        (status = 409, description = "Post cannot be scheduled from its status", body = ErrorSchema)
    ),
    tags = ["posts"],
    operation_id = "schedulePost",
    security(("SessionCookie" = []))
)]
#[post("/posts/{id}/schedule")]
pub async fn schedule_post(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<String>,
    payload: web::Json<SchedulePostBody>,
) -> ApiResult<web::Json<PostBody>> {
    let user_id = session.require_user_id()?;
    let post_id = parse_uuid(&path.into_inner(), POST_ID)?;
    let field = FieldName::new("scheduledAt");
    let raw = require_text(payload.into_inner().scheduled_at, field)?;
    let scheduled_at = parse_rfc3339_timestamp(&raw, field)?;
    let post = state
        .posts
        .schedule(SchedulePostRequest {
            user_id,
            post_id,
            scheduled_at,
        })
        .await?;
    Ok(web::Json(PostBody::from(post)))
}

/// Spend one credit and publish a post now.
#[utoipa::path(
    post,
    path = "/api/v1/posts/{id}/publish",
    params(("id" = String, Path, description = "Post identifier")),
    request_body = PublishPostBody,
    responses(
        (status = 200, description = "Post published", body = PublishPostResponse),
        (status = 401, description = "Unauthorised", body = ErrorSchema),
        (status = 402, description = "No credits left", body = ErrorSchema),
        (status = 404, description = "Unknown post", body = ErrorSchema),
        (status = 409, description = "Post cannot be published from its status", body = ErrorSchema),
        (status = 502, description = "Publishing failed; the post is marked failed", body = ErrorSchema)
    ),
    tags = ["posts"],
    operation_id = "publishPost",
    security(("SessionCookie" = []))
)]
#[post("/posts/{id}/publish")]
pub async fn publish_post(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<String>,
    payload: Option<web::Json<PublishPostBody>>,
) -> ApiResult<web::Json<PublishPostResponse>> {
    let user_id = session.require_user_id()?;
    let post_id = parse_uuid(&path.into_inner(), POST_ID)?;
    let PublishPostBody {
        content,
        image_url,
        image_data,
    } = payload.map(web::Json::into_inner).unwrap_or_default();
    let published = state
        .posts
        .publish(PublishPostRequest {
            user_id,
            post_id,
            content: non_blank(content),
            image: image_from_body(image_url, image_data),
        })
        .await?;
    Ok(web::Json(PublishPostResponse::from(published)))
}

/// Fetch one of the caller's posts.
#[utoipa::path(
    get,
    path = "/api/v1/posts/{id}",
    params(("id" = String, Path, description = "Post identifier")),
    responses(
        (status = 200, description = "Post", body = PostBody),
        (status = 400, description = "Invalid post id", body = ErrorSchema),
        (status = 401, description = "Unauthorised", body = ErrorSchema),
        (status = 404, description = "Unknown post", body = ErrorSchema)
    ),
    tags = ["posts"],
    operation_id = "getPost",
    security(("SessionCookie" = []))
)]
#[get("/posts/{id}")]
pub async fn get_post(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<String>,
) -> ApiResult<web::Json<PostBody>> {
    let user_id = session.require_user_id()?;
    let post_id = parse_uuid(&path.into_inner(), POST_ID)?;
    let post = state.posts_query.get_post(&user_id, post_id).await?;
    Ok(web::Json(PostBody::from(post)))
}

#[cfg(test)]
#[path = "posts_tests.rs"]
mod tests;
