//! Integration tests for `DieselCreditLedgerRepository` against embedded
//! PostgreSQL.
//!
//! The row locks taken by `consume_one` only matter against a real database,
//! so these suites race two consumers over the same grant.

use rstest::{fixture, rstest};
use voicepost_backend::domain::ports::CreditLedgerRepository;
use voicepost_backend::domain::{CreditSource, NewCreditGrant, UserId};
use voicepost_backend::outbound::persistence::DieselCreditLedgerRepository;

#[path = "support/embedded_postgres.rs"]
mod embedded_postgres;

use embedded_postgres::{MigratedDatabase, handle_cluster_setup_failure, migrated_database};

struct LedgerContext {
    repository: DieselCreditLedgerRepository,
    user: UserId,
    database: MigratedDatabase,
}

impl LedgerContext {
    fn grant(&self, credits: u32, source: CreditSource) -> NewCreditGrant {
        NewCreditGrant::try_new(self.user.clone(), credits, source).expect("positive grant")
    }
}

#[fixture]
fn ledger_context() -> Option<LedgerContext> {
    match migrated_database() {
        Ok(database) => Some(LedgerContext {
            repository: DieselCreditLedgerRepository::new(database.pool.clone()),
            user: UserId::random(),
            database,
        }),
        Err(reason) => handle_cluster_setup_failure(reason),
    }
}

#[rstest]
fn concurrent_consumers_share_a_single_credit(ledger_context: Option<LedgerContext>) {
    let Some(context) = ledger_context else {
        eprintln!("SKIP-TEST-CLUSTER: concurrent_consumers_share_a_single_credit skipped");
        return;
    };
    let repository = &context.repository;

    let grant = context.database.runtime.block_on(async {
        repository
            .insert_grant(context.grant(1, CreditSource::Purchase))
            .await
            .expect("insert grant")
    });

    let (left, right) = context.database.runtime.block_on(async {
        tokio::join!(
            repository.consume_one(&context.user),
            repository.consume_one(&context.user)
        )
    });
    let charged: Vec<_> = [left.expect("consume"), right.expect("consume")]
        .into_iter()
        .flatten()
        .collect();
    assert_eq!(charged, vec![grant.id], "exactly one consumer is charged");

    let grants = context
        .database
        .runtime
        .block_on(repository.list_grants(&context.user))
        .expect("list grants");
    assert_eq!(grants.len(), 1);
    assert_eq!(grants.first().map(|grant| grant.used_credits), Some(1));
}

#[rstest]
fn exhausted_ledger_charges_nothing(ledger_context: Option<LedgerContext>) {
    let Some(context) = ledger_context else {
        eprintln!("SKIP-TEST-CLUSTER: exhausted_ledger_charges_nothing skipped");
        return;
    };
    let repository = &context.repository;

    let (first, second) = context.database.runtime.block_on(async {
        repository
            .insert_grant(context.grant(1, CreditSource::Free))
            .await
            .expect("insert grant");
        let first = repository.consume_one(&context.user).await;
        let second = repository.consume_one(&context.user).await;
        (first, second)
    });

    assert!(first.expect("first consume").is_some());
    assert_eq!(second.expect("second consume"), None);
}

#[rstest]
fn free_grant_is_inserted_once(ledger_context: Option<LedgerContext>) {
    let Some(context) = ledger_context else {
        eprintln!("SKIP-TEST-CLUSTER: free_grant_is_inserted_once skipped");
        return;
    };
    let repository = &context.repository;

    let (first, second) = context.database.runtime.block_on(async {
        let first = repository
            .insert_free_grant_once(context.grant(3, CreditSource::Free))
            .await
            .expect("first free grant");
        let second = repository
            .insert_free_grant_once(context.grant(3, CreditSource::Free))
            .await
            .expect("second free grant");
        (first, second)
    });

    assert!(first.is_some());
    assert!(second.is_none(), "a user holds at most one free grant");
}
