//! Internal reconciliation endpoints invoked by cron.
//!
//! ```text
//! POST /internal/sweeps/scheduled          (x-cron-secret: ..)
//! POST /internal/sweeps/stale-generations  (x-cron-secret: ..)
//! ```

use actix_web::{HttpRequest, post, web};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use utoipa::ToSchema;

use crate::domain::Error;
use crate::domain::ports::{ScheduledSweepSummary, StaleSweepSummary, SweepItemResult};
use crate::inbound::http::ApiResult;
use crate::inbound::http::schemas::ErrorSchema;
use crate::inbound::http::state::HttpState;

/// Header carrying the shared cron secret.
pub const CRON_SECRET_HEADER: &str = "x-cron-secret";

/// Outcome for one due post.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SweepResultBody {
    pub post_id: String,
    /// `published` or `failed`.
    pub outcome: String,
    pub linkedin_post_id: Option<String>,
    pub reason: Option<String>,
}

impl From<SweepItemResult> for SweepResultBody {
    fn from(result: SweepItemResult) -> Self {
        match result {
            SweepItemResult::Published {
                post_id,
                linkedin_post_id,
            } => Self {
                post_id: post_id.to_string(),
                outcome: "published".to_owned(),
                linkedin_post_id: Some(linkedin_post_id),
                reason: None,
            },
            SweepItemResult::Failed { post_id, reason } => Self {
                post_id: post_id.to_string(),
                outcome: "failed".to_owned(),
                linkedin_post_id: None,
                reason: Some(reason),
            },
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ScheduledSweepResponse {
    pub processed: usize,
    pub results: Vec<SweepResultBody>,
}

impl From<ScheduledSweepSummary> for ScheduledSweepResponse {
    fn from(summary: ScheduledSweepSummary) -> Self {
        Self {
            processed: summary.processed,
            results: summary
                .results
                .into_iter()
                .map(SweepResultBody::from)
                .collect(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StaleSweepResponse {
    pub failed: usize,
    pub failed_post_ids: Vec<String>,
}

impl From<StaleSweepSummary> for StaleSweepResponse {
    fn from(summary: StaleSweepSummary) -> Self {
        Self {
            failed: summary.failed_post_ids.len(),
            failed_post_ids: summary
                .failed_post_ids
                .iter()
                .map(ToString::to_string)
                .collect(),
        }
    }
}

fn authorise_cron(req: &HttpRequest, state: &HttpState) -> Result<(), Error> {
    let presented = req
        .headers()
        .get(CRON_SECRET_HEADER)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();
    if state.cron_secret.matches(presented) {
        Ok(())
    } else {
        warn!(path = %req.path(), "sweep request rejected: bad cron secret");
        Err(Error::unauthorized("invalid cron secret"))
    }
}

/// Publish scheduled posts that have fallen due.
#[utoipa::path(
    post,
    path = "/internal/sweeps/scheduled",
    params(("x-cron-secret" = String, Header, description = "Shared cron secret")),
    responses(
        (status = 200, description = "Sweep summary", body = ScheduledSweepResponse),
        (status = 401, description = "Bad cron secret", body = ErrorSchema)
    ),
    tags = ["internal"],
    operation_id = "sweepScheduledPosts",
    security([])
)]
#[post("/internal/sweeps/scheduled")]
pub async fn sweep_scheduled(
    req: HttpRequest,
    state: web::Data<HttpState>,
) -> ApiResult<web::Json<ScheduledSweepResponse>> {
    authorise_cron(&req, &state)?;
    let summary = state.sweeps.sweep_scheduled().await?;
    info!(processed = summary.processed, "scheduled sweep finished");
    Ok(web::Json(ScheduledSweepResponse::from(summary)))
}

/// Fail posts stuck in generation or publishing.
#[utoipa::path(
    post,
    path = "/internal/sweeps/stale-generations",
    params(("x-cron-secret" = String, Header, description = "Shared cron secret")),
    responses(
        (status = 200, description = "Sweep summary", body = StaleSweepResponse),
        (status = 401, description = "Bad cron secret", body = ErrorSchema)
    ),
    tags = ["internal"],
    operation_id = "sweepStaleGenerations",
    security([])
)]
#[post("/internal/sweeps/stale-generations")]
pub async fn sweep_stale_generations(
    req: HttpRequest,
    state: web::Data<HttpState>,
) -> ApiResult<web::Json<StaleSweepResponse>> {
    authorise_cron(&req, &state)?;
    let summary = state.sweeps.sweep_stale_generations().await?;
    info!(failed = summary.failed_post_ids.len(), "stale generation sweep finished");
    Ok(web::Json(StaleSweepResponse::from(summary)))
}
