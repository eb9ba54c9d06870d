//! Reconciliation sweeps run from cron.

use async_trait::async_trait;
use tracing::{info, warn};

use crate::domain::ports::{
    CreditLedgerRepository, PostRepository, ScheduledSweepSummary, StaleSweepSummary,
    SweepCommand, SweepItemResult,
};
use crate::domain::Error;

use super::lifecycle::map_post_repository_error;
use super::{Post, PostLifecycleService, PostStatus};

impl<R, L> PostLifecycleService<R, L>
where
    R: PostRepository,
    L: CreditLedgerRepository,
{
    async fn publish_scheduled(&self, claimed: Post) -> SweepItemResult {
        let post_id = claimed.id;
        // Leaving an unfunded post scheduled would re-select it on every sweep.
        match self.publish_claimed(claimed, PostStatus::Failed).await {
            Ok(published) => SweepItemResult::Published {
                post_id,
                linkedin_post_id: published.post.linkedin_post_id.unwrap_or_default(),
            },
            Err(error) => SweepItemResult::Failed {
                post_id,
                reason: error.message().to_owned(),
            },
        }
    }
}

#[async_trait]
impl<R, L> SweepCommand for PostLifecycleService<R, L>
where
    R: PostRepository,
    L: CreditLedgerRepository,
{
    async fn sweep_scheduled(&self) -> Result<ScheduledSweepSummary, Error> {
        let claimed = self
            .posts
            .claim_due_scheduled(self.clock.utc(), self.config.scheduled_batch_limit)
            .await
            .map_err(map_post_repository_error)?;

        let mut summary = ScheduledSweepSummary::default();
        for post in claimed {
            summary.results.push(self.publish_scheduled(post).await);
            summary.processed += 1;
        }
        info!(processed = summary.processed, "scheduled sweep finished");
        Ok(summary)
    }

    async fn sweep_stale_generations(&self) -> Result<StaleSweepSummary, Error> {
        let now = self.clock.utc();
        let cutoff = now - self.config.stale_generation_after;
        let failed_post_ids = self
            .posts
            .fail_stale_in_flight(cutoff, now)
            .await
            .map_err(map_post_repository_error)?;
        if !failed_post_ids.is_empty() {
            warn!(count = failed_post_ids.len(), %cutoff, "failed stale in-flight posts");
        }
        Ok(StaleSweepSummary { failed_post_ids })
    }
}
