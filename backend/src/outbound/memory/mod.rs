//! In-process store implementing the persistence ports.
//!
//! Used when no database is configured and by tests. A single async mutex
//! guards all tables, so every port operation is atomic and settlement can
//! flip a payment and append its grant as one unit, matching the
//! transactional guarantees of the Diesel adapters.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::domain::ports::{
    CreditLedgerRepository, CreditLedgerRepositoryError, PaymentRepository,
    PaymentRepositoryError, PostRepository, PostRepositoryError, SettlementOutcome,
    SettlementRequest,
};
use crate::domain::{
    CreditGrant, CreditSource, NewCreditGrant, PaymentRecord, PaymentStatus, Post, PostStatus,
    PostTransition, UserId,
};

#[derive(Default)]
struct Tables {
    /// Insertion order doubles as creation order.
    grants: Vec<CreditGrant>,
    admins: HashSet<Uuid>,
    payments: Vec<PaymentRecord>,
    posts: HashMap<Uuid, Post>,
}

impl Tables {
    fn owned_by<'a>(user_id: &'a UserId) -> impl Fn(&&CreditGrant) -> bool + 'a {
        move |grant| grant.user_id.as_uuid() == user_id.as_uuid()
    }

    fn append_grant(&mut self, grant: NewCreditGrant) -> CreditGrant {
        let stored = grant.into_grant(Uuid::new_v4(), Utc::now());
        self.grants.push(stored.clone());
        stored
    }
}

/// Shared in-memory tables. Clones share state.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    tables: Arc<Mutex<Tables>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Give `user_id` the administrator role.
    pub async fn grant_admin(&self, user_id: &UserId) {
        self.tables.lock().await.admins.insert(*user_id.as_uuid());
    }
}

#[async_trait]
impl CreditLedgerRepository for InMemoryStore {
    async fn list_grants(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<CreditGrant>, CreditLedgerRepositoryError> {
        let tables = self.tables.lock().await;
        Ok(tables
            .grants
            .iter()
            .filter(Tables::owned_by(user_id))
            .cloned()
            .collect())
    }

    async fn insert_grant(
        &self,
        grant: NewCreditGrant,
    ) -> Result<CreditGrant, CreditLedgerRepositoryError> {
        Ok(self.tables.lock().await.append_grant(grant))
    }

    async fn insert_free_grant_once(
        &self,
        grant: NewCreditGrant,
    ) -> Result<Option<CreditGrant>, CreditLedgerRepositoryError> {
        let mut tables = self.tables.lock().await;
        let already_granted = tables
            .grants
            .iter()
            .filter(Tables::owned_by(grant.user_id()))
            .any(|existing| existing.source == CreditSource::Free);
        if already_granted {
            return Ok(None);
        }
        Ok(Some(tables.append_grant(grant)))
    }

    async fn consume_one(
        &self,
        user_id: &UserId,
    ) -> Result<Option<Uuid>, CreditLedgerRepositoryError> {
        let mut tables = self.tables.lock().await;
        let target = tables
            .grants
            .iter_mut()
            .find(|grant| grant.user_id.as_uuid() == user_id.as_uuid() && grant.has_capacity());
        Ok(target.map(|grant| {
            grant.used_credits += 1;
            grant.id
        }))
    }

    async fn is_admin(&self, user_id: &UserId) -> Result<bool, CreditLedgerRepositoryError> {
        Ok(self.tables.lock().await.admins.contains(user_id.as_uuid()))
    }
}

#[async_trait]
impl PaymentRepository for InMemoryStore {
    async fn insert_pending(&self, record: &PaymentRecord) -> Result<(), PaymentRepositoryError> {
        let mut tables = self.tables.lock().await;
        if let Some(existing) = tables.payments.iter().find(|existing| {
            existing.transaction_id == record.transaction_id
                || existing.gateway_order_id == record.gateway_order_id
        }) {
            let key = if existing.transaction_id == record.transaction_id {
                "transaction_id"
            } else {
                "gateway_order_id"
            };
            return Err(PaymentRepositoryError::duplicate(key));
        }
        tables.payments.push(record.clone());
        Ok(())
    }

    async fn find_by_order(
        &self,
        gateway_order_id: &str,
        user_id: &UserId,
    ) -> Result<Option<PaymentRecord>, PaymentRepositoryError> {
        let tables = self.tables.lock().await;
        Ok(tables
            .payments
            .iter()
            .find(|record| {
                record.gateway_order_id == gateway_order_id
                    && record.user_id.as_uuid() == user_id.as_uuid()
            })
            .cloned())
    }

    async fn settle(
        &self,
        request: SettlementRequest,
    ) -> Result<SettlementOutcome, PaymentRepositoryError> {
        let mut tables = self.tables.lock().await;
        let record = tables
            .payments
            .iter_mut()
            .find(|record| record.id == request.record_id)
            .ok_or_else(|| PaymentRepositoryError::not_found(request.gateway_order_id.clone()))?;

        match record.status {
            PaymentStatus::Success => return Ok(SettlementOutcome::AlreadySettled(record.clone())),
            PaymentStatus::Failed => {
                return Err(PaymentRepositoryError::invalid_state(record.status.as_str()));
            }
            PaymentStatus::Pending => {}
        }
        record.status = PaymentStatus::Success;
        record.gateway_payment_id = Some(request.gateway_payment_id);
        record.updated_at = request.settled_at;
        let record = record.clone();

        let grant = request
            .grant
            .into_grant(Uuid::new_v4(), request.settled_at);
        tables.grants.push(grant.clone());
        Ok(SettlementOutcome::Settled { record, grant })
    }

    async fn list_recent(
        &self,
        user_id: &UserId,
        limit: u32,
    ) -> Result<Vec<PaymentRecord>, PaymentRepositoryError> {
        let tables = self.tables.lock().await;
        let mut records: Vec<_> = tables
            .payments
            .iter()
            .filter(|record| record.user_id.as_uuid() == user_id.as_uuid())
            .cloned()
            .collect();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        records.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
        Ok(records)
    }
}

#[async_trait]
impl PostRepository for InMemoryStore {
    async fn insert(&self, post: &Post) -> Result<(), PostRepositoryError> {
        self.tables
            .lock()
            .await
            .posts
            .insert(post.id, post.clone());
        Ok(())
    }

    async fn find(
        &self,
        post_id: Uuid,
        user_id: &UserId,
    ) -> Result<Option<Post>, PostRepositoryError> {
        let tables = self.tables.lock().await;
        Ok(tables
            .posts
            .get(&post_id)
            .filter(|post| post.user_id.as_uuid() == user_id.as_uuid())
            .cloned())
    }

    async fn transition(
        &self,
        transition: &PostTransition,
    ) -> Result<Option<Post>, PostRepositoryError> {
        let mut tables = self.tables.lock().await;
        let Some(post) = tables.posts.get_mut(&transition.post_id) else {
            return Ok(None);
        };
        if post.user_id.as_uuid() != transition.user_id.as_uuid()
            || !transition.from.contains(&post.status)
        {
            return Ok(None);
        }
        post.status = transition.to;
        transition.patch.apply_to(post);
        post.updated_at = transition.at;
        Ok(Some(post.clone()))
    }

    async fn claim_due_scheduled(
        &self,
        now: DateTime<Utc>,
        limit: u32,
    ) -> Result<Vec<Post>, PostRepositoryError> {
        let mut tables = self.tables.lock().await;
        let mut due: Vec<_> = tables
            .posts
            .values_mut()
            .filter(|post| {
                post.status == PostStatus::Scheduled
                    && post.scheduled_at.is_some_and(|at| at <= now)
            })
            .collect();
        due.sort_by_key(|post| post.scheduled_at);
        due.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
        Ok(due
            .into_iter()
            .map(|post| {
                post.status = PostStatus::Publishing;
                post.updated_at = now;
                post.clone()
            })
            .collect())
    }

    async fn fail_stale_in_flight(
        &self,
        cutoff: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<Vec<Uuid>, PostRepositoryError> {
        let mut tables = self.tables.lock().await;
        let mut failed = Vec::new();
        for post in tables.posts.values_mut() {
            let in_flight = matches!(post.status, PostStatus::Generating | PostStatus::Publishing);
            if in_flight && post.updated_at < cutoff {
                post.status = PostStatus::Failed;
                post.updated_at = now;
                failed.push(post.id);
            }
        }
        Ok(failed)
    }
}
