//! The expiry sweep: advances listing lifecycle state based on elapsed time.
//!
//! Two independent phases, run on every scheduled tick:
//!
//! ```text
//! Phase A (expire): query status == active
//!     └─► expirySeconds * 1000 < now        → status := expired
//! Phase B (purge):  query status == expired
//!     └─► expirySeconds * 1000 < now − retention → delete
//! ```
//!
//! Each phase reads one snapshot, evaluates the time predicate per document
//! and applies every qualifying write as a single atomic batch. A phase
//! with nothing to do commits nothing, so re-running with no newly-eligible
//! documents is a no-op.

use anyhow::Result;
use chrono::Duration;
use tracing::{info, warn};

use crate::domains::listings::models::{expiry_seconds, ListingStatus};
use crate::kernel::{BaseListingStore, ListingBatch};

/// Counts from one phase run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepOutcome {
    /// Documents returned by the status query.
    pub scanned: usize,
    /// Writes applied in the batch commit.
    pub written: usize,
}

/// Phase A: flip overdue `active` listings to `expired`.
///
/// Listings whose `expiryDate` cannot be read are logged and skipped; one
/// bad document must not stall the rest of the sweep.
pub async fn mark_expired(store: &dyn BaseListingStore, now_ms: i64) -> Result<SweepOutcome> {
    let listings = store.find_by_status(ListingStatus::Active).await?;
    if listings.is_empty() {
        info!("No active listings to check");
        return Ok(SweepOutcome::default());
    }

    let mut batch = ListingBatch::new();
    for listing in &listings {
        let seconds = match expiry_seconds(&listing.fields) {
            Ok(seconds) => seconds,
            Err(e) => {
                warn!(listing = %listing.id, error = %e, "Skipping listing with unreadable expiry");
                continue;
            }
        };
        if seconds * 1000 < now_ms {
            batch.update_status(listing.id.clone(), ListingStatus::Expired);
        }
    }

    let outcome = SweepOutcome {
        scanned: listings.len(),
        written: batch.len(),
    };

    if batch.is_empty() {
        info!(scanned = outcome.scanned, "No listings newly expired");
        return Ok(outcome);
    }

    store.commit(batch).await?;
    info!(
        scanned = outcome.scanned,
        marked = outcome.written,
        "Marked listings as expired"
    );
    Ok(outcome)
}

/// Phase B: permanently delete `expired` listings older than the retention
/// window.
///
/// Only `expired` listings are queried, so an `active` listing can never be
/// deleted out of order, however old its expiry is.
pub async fn purge_expired(
    store: &dyn BaseListingStore,
    now_ms: i64,
    retention: Duration,
) -> Result<SweepOutcome> {
    let listings = store.find_by_status(ListingStatus::Expired).await?;
    if listings.is_empty() {
        info!("No expired listings to check");
        return Ok(SweepOutcome::default());
    }

    let cutoff_ms = now_ms - retention.num_milliseconds();
    let mut batch = ListingBatch::new();
    for listing in &listings {
        let seconds = match expiry_seconds(&listing.fields) {
            Ok(seconds) => seconds,
            Err(e) => {
                warn!(listing = %listing.id, error = %e, "Skipping listing with unreadable expiry");
                continue;
            }
        };
        if seconds * 1000 < cutoff_ms {
            batch.delete(listing.id.clone());
        }
    }

    let outcome = SweepOutcome {
        scanned: listings.len(),
        written: batch.len(),
    };

    if batch.is_empty() {
        info!(scanned = outcome.scanned, "No expired listings past retention");
        return Ok(outcome);
    }

    store.commit(batch).await?;
    info!(
        scanned = outcome.scanned,
        purged = outcome.written,
        "Purged long-expired listings"
    );
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domains::listings::models::ListingStatus::{Active, Expired};
    use crate::kernel::test_dependencies::InMemoryListingStore;
    use serde_json::json;

    const DAY_MS: i64 = 24 * 60 * 60 * 1000;

    fn expiry(seconds: i64) -> serde_json::Value {
        json!({"expiryDate": {"seconds": seconds}, "title": "Sea-view flat"})
    }

    #[tokio::test]
    async fn marks_only_overdue_active_listings() {
        let now_ms = 10 * DAY_MS;
        let store = InMemoryListingStore::new()
            .with_listing("overdue", Active, expiry(8 * 24 * 60 * 60))
            .with_listing("current", Active, expiry(12 * 24 * 60 * 60));

        let outcome = mark_expired(&store, now_ms).await.unwrap();

        assert_eq!(outcome, SweepOutcome { scanned: 2, written: 1 });
        assert_eq!(store.status_of("overdue"), Some(Expired));
        assert_eq!(store.status_of("current"), Some(Active));
    }

    #[tokio::test]
    async fn status_flip_leaves_other_fields_untouched() {
        let fields = json!({
            "expiryDate": {"seconds": 1},
            "title": "Downtown studio",
            "price": 950
        });
        let store = InMemoryListingStore::new().with_listing("a", Active, fields.clone());

        mark_expired(&store, 2 * DAY_MS).await.unwrap();

        assert_eq!(store.status_of("a"), Some(Expired));
        assert_eq!(store.fields_of("a").unwrap(), fields);
    }

    #[tokio::test]
    async fn accepts_both_timestamp_shapes() {
        let store = InMemoryListingStore::new()
            .with_listing("server-shape", Active, json!({"expiryDate": {"seconds": 1}}))
            .with_listing("client-shape", Active, json!({"expiryDate": {"_seconds": 1}}));

        let outcome = mark_expired(&store, DAY_MS).await.unwrap();

        assert_eq!(outcome.written, 2);
        assert_eq!(store.status_of("server-shape"), Some(Expired));
        assert_eq!(store.status_of("client-shape"), Some(Expired));
    }

    #[tokio::test]
    async fn unreadable_expiry_is_skipped_not_fatal() {
        let store = InMemoryListingStore::new()
            .with_listing("broken", Active, json!({"title": "No expiry"}))
            .with_listing("overdue", Active, expiry(1));

        let outcome = mark_expired(&store, DAY_MS).await.unwrap();

        assert_eq!(outcome, SweepOutcome { scanned: 2, written: 1 });
        assert_eq!(store.status_of("broken"), Some(Active));
        assert_eq!(store.status_of("overdue"), Some(Expired));
    }

    #[tokio::test]
    async fn empty_candidate_set_commits_nothing() {
        let store = InMemoryListingStore::new();

        let outcome = mark_expired(&store, DAY_MS).await.unwrap();

        assert_eq!(outcome, SweepOutcome::default());
        assert_eq!(store.commit_count(), 0);
    }

    #[tokio::test]
    async fn nothing_due_commits_nothing() {
        let store =
            InMemoryListingStore::new().with_listing("current", Active, expiry(5 * 24 * 60 * 60));

        let outcome = mark_expired(&store, DAY_MS).await.unwrap();

        assert_eq!(outcome, SweepOutcome { scanned: 1, written: 0 });
        assert_eq!(store.commit_count(), 0);
    }

    #[tokio::test]
    async fn expire_phase_is_idempotent() {
        let store = InMemoryListingStore::new().with_listing("overdue", Active, expiry(1));

        mark_expired(&store, DAY_MS).await.unwrap();
        let second = mark_expired(&store, DAY_MS).await.unwrap();

        assert_eq!(second.written, 0);
        assert_eq!(store.commit_count(), 1);
    }

    #[tokio::test]
    async fn purges_only_past_the_retention_window() {
        let now_ms = 10 * DAY_MS;
        let store = InMemoryListingStore::new()
            // Expired 5 days before now: past the 3-day window.
            .with_listing("old", Expired, expiry(5 * 24 * 60 * 60))
            // Expired 1 day before now: still inside the window.
            .with_listing("recent", Expired, expiry(9 * 24 * 60 * 60));

        let outcome = purge_expired(&store, now_ms, Duration::days(3)).await.unwrap();

        assert_eq!(outcome, SweepOutcome { scanned: 2, written: 1 });
        assert!(!store.contains("old"));
        assert_eq!(store.status_of("recent"), Some(Expired));
        assert_eq!(store.fields_of("recent").unwrap(), expiry(9 * 24 * 60 * 60));
    }

    #[tokio::test]
    async fn never_deletes_active_listings_regardless_of_age() {
        let store = InMemoryListingStore::new().with_listing("ancient", Active, expiry(0));

        let outcome = purge_expired(&store, 100 * DAY_MS, Duration::days(3))
            .await
            .unwrap();

        assert_eq!(outcome, SweepOutcome::default());
        assert!(store.contains("ancient"));
        assert_eq!(store.commit_count(), 0);
    }

    #[tokio::test]
    async fn purge_phase_is_idempotent() {
        let store = InMemoryListingStore::new().with_listing("old", Expired, expiry(0));

        purge_expired(&store, 10 * DAY_MS, Duration::days(3)).await.unwrap();
        let second = purge_expired(&store, 10 * DAY_MS, Duration::days(3)).await.unwrap();

        assert_eq!(second, SweepOutcome::default());
        assert_eq!(store.commit_count(), 1);
    }

    #[tokio::test]
    async fn marks_listing_expired_at_observed_instant() {
        // expiryDate.seconds = 1000 evaluated at now = 2,000,000 ms.
        let store =
            InMemoryListingStore::new().with_listing("L1", Active, json!({"expiryDate": {"seconds": 1000}}));

        mark_expired(&store, 2_000_000).await.unwrap();

        assert_eq!(store.status_of("L1"), Some(Expired));
    }

    #[tokio::test]
    async fn purges_listing_expired_five_days_ago() {
        let now_ms = 30 * DAY_MS;
        let five_days_ago_secs = (now_ms - 5 * DAY_MS) / 1000;
        let store =
            InMemoryListingStore::new().with_listing("L2", Expired, expiry(five_days_ago_secs));

        purge_expired(&store, now_ms, Duration::days(3)).await.unwrap();

        assert!(!store.contains("L2"));
    }

    #[tokio::test]
    async fn query_failure_surfaces_as_error() {
        let store = InMemoryListingStore::new();
        store.fail_queries_for(ListingStatus::Active);

        assert!(mark_expired(&store, DAY_MS).await.is_err());
        assert_eq!(store.commit_count(), 0);
    }
}
