//! Embedded PostgreSQL for the Diesel adapter suites.
//!
//! Every test gets its own temporary database on the shared cluster with the
//! production migrations applied through [`run_migrations`]. Set
//! `SKIP_TEST_CLUSTER=1` where the cluster cannot start; otherwise a setup
//! failure fails the test.

use std::time::Duration;

use pg_embedded_setup_unpriv::{ClusterHandle, TemporaryDatabase};
use tokio::runtime::Runtime;
use voicepost_backend::outbound::persistence::{DbPool, PoolConfig, run_migrations};

const SHARED_CLUSTER_RETRIES: usize = 5;
const SHARED_CLUSTER_RETRY_DELAY: Duration = Duration::from_millis(500);

/// A migrated temporary database and the runtime its pool lives on.
///
/// Fields drop in order, so the pool closes before the database goes.
pub struct MigratedDatabase {
    pub pool: DbPool,
    _database: TemporaryDatabase,
    pub runtime: Runtime,
}

/// True when `SKIP_TEST_CLUSTER` is "1", "true" or "yes" (any case).
pub fn should_skip_test_cluster() -> bool {
    std::env::var("SKIP_TEST_CLUSTER")
        .map(|value| matches!(value.to_lowercase().as_str(), "1" | "true" | "yes"))
        .unwrap_or(false)
}

/// Skip the test when allowed, otherwise fail loudly.
pub fn handle_cluster_setup_failure<T>(reason: impl std::fmt::Display) -> Option<T> {
    if should_skip_test_cluster() {
        eprintln!("SKIP-TEST-CLUSTER: {reason}");
        None
    } else {
        panic!("Test cluster setup failed: {reason}. Set SKIP_TEST_CLUSTER=1 to skip.");
    }
}

/// Keep the cluster password stable across test binaries that reuse one
/// data directory; `initdb` only runs for the first of them.
fn ensure_stable_password() {
    if std::env::var_os("PG_PASSWORD").is_none() {
        // SAFETY: runs before the cluster bootstrap spawns any threads.
        unsafe {
            std::env::set_var("PG_PASSWORD", "voicepost_embedded_test");
        }
    }
}

fn shared_cluster() -> Result<&'static ClusterHandle, String> {
    ensure_stable_password();
    let mut attempt = 1;
    loop {
        match pg_embedded_setup_unpriv::test_support::shared_cluster_handle() {
            Ok(handle) => return Ok(handle),
            Err(error) if attempt >= SHARED_CLUSTER_RETRIES => return Err(format!("{error:?}")),
            Err(_) => {
                std::thread::sleep(SHARED_CLUSTER_RETRY_DELAY);
                attempt += 1;
            }
        }
    }
}

/// Create a fresh database on the shared cluster and migrate it.
pub fn migrated_database() -> Result<MigratedDatabase, String> {
    let runtime = Runtime::new().map_err(|err| err.to_string())?;
    let cluster = shared_cluster()?;
    let name = format!("voicepost_test_{}", uuid::Uuid::new_v4().simple());
    let database = cluster
        .temporary_database(name.as_str())
        .map_err(|err| format!("create temporary database: {err:?}"))?;
    let url = database.url().to_owned();

    let pool = runtime
        .block_on(async {
            run_migrations(&url).await?;
            DbPool::new(
                PoolConfig::new(url.as_str())
                    .with_max_size(4)
                    .with_min_idle(Some(1)),
            )
            .await
        })
        .map_err(|err| err.to_string())?;

    Ok(MigratedDatabase {
        pool,
        _database: database,
        runtime,
    })
}
