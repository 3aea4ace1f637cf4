//! Scheduled background tasks using tokio-cron-scheduler.
//!
//! One periodic task: the listing expiry sweep.
//!
//! # Architecture
//!
//! ```text
//! Scheduler (cron, daily at midnight by default)
//!     │
//!     └─► run_sweep_tick()
//!             ├─► mark_expired()   active listings past expiry → expired
//!             └─► purge_expired()  expired listings past retention → deleted
//! ```
//!
//! The two phases are fault-isolated: a failure in one is logged and does
//! not stop the other. Nothing is retried within a tick; the next tick is
//! the retry mechanism. A non-blocking in-progress flag skips a tick that
//! fires while the previous sweep is still running, so the idempotence of
//! the phases is never exercised concurrently.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::Result;
use chrono::Utc;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{error, info, warn};

use crate::domains::listings::sweep;
use crate::kernel::ServerDeps;

/// Start all scheduled tasks
pub async fn start_scheduler(deps: Arc<ServerDeps>, schedule: &str) -> Result<JobScheduler> {
    let scheduler = JobScheduler::new().await?;

    let sweep_running = Arc::new(AtomicBool::new(false));
    let sweep_deps = deps.clone();
    let sweep_job = Job::new_async(schedule, move |_uuid, _lock| {
        let deps = sweep_deps.clone();
        let running = sweep_running.clone();
        Box::pin(async move {
            run_guarded_sweep(&deps, &running).await;
        })
    })?;

    scheduler.add(sweep_job).await?;
    scheduler.start().await?;

    info!(schedule, "Scheduled tasks started (listing expiry sweep)");
    Ok(scheduler)
}

/// Run one tick unless the previous one is still in flight.
async fn run_guarded_sweep(deps: &ServerDeps, running: &AtomicBool) -> bool {
    if running.swap(true, Ordering::SeqCst) {
        warn!("Previous sweep still running, skipping this tick");
        return false;
    }

    run_sweep_tick(deps).await;
    running.store(false, Ordering::SeqCst);
    true
}

/// One sweep tick: expire overdue active listings, then purge expired
/// listings older than the retention window.
pub async fn run_sweep_tick(deps: &ServerDeps) {
    info!("Checking for expired listings");
    let now_ms = Utc::now().timestamp_millis();

    if let Err(e) = sweep::mark_expired(deps.listing_store.as_ref(), now_ms).await {
        error!(error = %e, "Expire phase failed");
    }

    if let Err(e) =
        sweep::purge_expired(deps.listing_store.as_ref(), now_ms, deps.retention_window).await
    {
        error!(error = %e, "Purge phase failed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domains::listings::models::ListingStatus::{Active, Expired};
    use crate::kernel::TestDependencies;
    use serde_json::json;

    #[tokio::test]
    async fn expire_failure_does_not_block_purge() {
        let test_deps = TestDependencies::new();
        // Expired decades past any retention window.
        test_deps
            .store
            .insert("stale", Expired, json!({"expiryDate": {"seconds": 0}}));
        test_deps.store.fail_queries_for(Active);

        run_sweep_tick(&test_deps.server_deps()).await;

        assert!(!test_deps.store.contains("stale"));
        assert_eq!(test_deps.store.commit_count(), 1);
    }

    #[tokio::test]
    async fn tick_runs_both_phases() {
        let test_deps = TestDependencies::new();
        test_deps
            .store
            .insert("overdue", Active, json!({"expiryDate": {"seconds": 1}}));
        test_deps
            .store
            .insert("stale", Expired, json!({"expiryDate": {"seconds": 0}}));

        run_sweep_tick(&test_deps.server_deps()).await;

        assert_eq!(test_deps.store.status_of("overdue"), Some(Expired));
        assert!(!test_deps.store.contains("stale"));
    }

    #[tokio::test]
    async fn overlapping_tick_is_skipped() {
        let test_deps = TestDependencies::new();
        let running = AtomicBool::new(true);

        let ran = run_guarded_sweep(&test_deps.server_deps(), &running).await;

        assert!(!ran);
        assert_eq!(test_deps.store.find_count(), 0);
        // The flag belongs to the in-flight sweep; the skipped tick must
        // leave it set.
        assert!(running.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn guard_is_released_after_a_tick() {
        let test_deps = TestDependencies::new();
        let running = AtomicBool::new(false);

        let ran = run_guarded_sweep(&test_deps.server_deps(), &running).await;

        assert!(ran);
        assert!(!running.load(Ordering::SeqCst));
    }
}
