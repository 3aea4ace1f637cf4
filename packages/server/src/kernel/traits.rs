// Trait definitions for dependency injection
//
// These are INFRASTRUCTURE traits only - no business logic. The sweep and
// the notification handlers are domain functions that use these traits.
//
// Naming convention: Base* for trait names (e.g., BaseListingStore)

use std::collections::HashMap;

use anyhow::Result;
use async_trait::async_trait;

use crate::domains::listings::models::{ListingDoc, ListingStatus};

// =============================================================================
// Listing Store Trait (Infrastructure - document queries and batched writes)
// =============================================================================

/// A staged write set against the listing collection.
///
/// Implementations of [`BaseListingStore::commit`] must apply the whole
/// batch atomically: either every staged write lands or none does.
#[derive(Debug, Default)]
pub struct ListingBatch {
    pub status_updates: Vec<(String, ListingStatus)>,
    pub deletes: Vec<String>,
}

impl ListingBatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stage a status flip. Only the status field may change.
    pub fn update_status(&mut self, id: impl Into<String>, status: ListingStatus) {
        self.status_updates.push((id.into(), status));
    }

    /// Stage a permanent deletion.
    pub fn delete(&mut self, id: impl Into<String>) {
        self.deletes.push(id.into());
    }

    pub fn len(&self) -> usize {
        self.status_updates.len() + self.deletes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.status_updates.is_empty() && self.deletes.is_empty()
    }
}

#[async_trait]
pub trait BaseListingStore: Send + Sync {
    /// One consistent snapshot of all listings currently in `status`.
    async fn find_by_status(&self, status: ListingStatus) -> Result<Vec<ListingDoc>>;

    /// Commit a write batch atomically.
    async fn commit(&self, batch: ListingBatch) -> Result<()>;
}

// =============================================================================
// Push Service Trait (Infrastructure - notification delivery)
// =============================================================================

#[async_trait]
pub trait BasePushService: Send + Sync {
    /// Broadcast a notification to every subscriber of a topic. Returns
    /// the delivery identifier.
    async fn send_to_topic(
        &self,
        topic: &str,
        title: &str,
        body: &str,
        data: HashMap<String, String>,
    ) -> Result<String>;

    /// Send a notification to a single device token. Returns the delivery
    /// identifier.
    async fn send_to_token(
        &self,
        token: &str,
        title: &str,
        body: &str,
        data: HashMap<String, String>,
    ) -> Result<String>;
}
