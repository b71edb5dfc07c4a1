//! Database readiness gate.
//!
//! Polls until the database accepts connections. Retries are unbounded with
//! a fixed delay; only configuration errors (a malformed URL, for example)
//! end the wait early, since retrying cannot fix them.

use std::{future::Future, time::Duration};

use sqlx::{Connection, PgConnection};

use crate::{StoreError, StoreResult};

/// Default delay between readiness probes.
pub const DEFAULT_WAIT_INTERVAL: Duration = Duration::from_secs(1);

/// Waits until a connection to `database_url` succeeds.
///
/// Returns the number of attempts it took.
pub async fn wait_for_database(database_url: &str, interval: Duration) -> StoreResult<u32> {
    wait_until_ready(interval, || async {
        let conn = PgConnection::connect(database_url).await?;
        conn.close().await?;
        Ok::<_, sqlx::Error>(())
    })
    .await
}

/// Runs `probe` until it succeeds, sleeping `interval` between attempts.
///
/// Returns the number of attempts it took. A [`sqlx::Error::Configuration`]
/// from the probe is returned immediately.
pub async fn wait_until_ready<F, Fut>(interval: Duration, mut probe: F) -> StoreResult<u32>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<(), sqlx::Error>>,
{
    tracing::info!("Waiting for database...");

    let mut attempts = 0;
    loop {
        attempts += 1;
        match probe().await {
            Ok(()) => {
                tracing::info!(attempts, "Database available");
                return Ok(attempts);
            }
            Err(e @ sqlx::Error::Configuration(_)) => {
                return Err(StoreError::Database(e));
            }
            Err(e) => {
                tracing::warn!(
                    attempts,
                    error = %e,
                    "Database unavailable, waiting {}ms...",
                    interval.as_millis()
                );
                tokio::time::sleep(interval).await;
            }
        }
    }
}
