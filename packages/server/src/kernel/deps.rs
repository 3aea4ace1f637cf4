//! Server dependencies (using traits for testability)
//!
//! Central dependency container injected into the HTTP handlers and the
//! scheduled sweep, plus the production adapters that put the Firestore
//! and FCM clients behind the kernel traits.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use chrono::Duration;
use fcm::{FcmClient, Message};
use firestore::{FirestoreClient, WriteBatch};

use crate::domains::listings::models::{ListingDoc, ListingStatus};
use crate::kernel::{BaseListingStore, BasePushService, ListingBatch};

// =============================================================================
// FirestoreClient Adapter (implements BaseListingStore trait)
// =============================================================================

/// Listing store backed by one Firestore collection.
pub struct FirestoreListingStore {
    client: Arc<FirestoreClient>,
    collection: String,
}

impl FirestoreListingStore {
    pub fn new(client: Arc<FirestoreClient>, collection: String) -> Self {
        Self { client, collection }
    }
}

#[async_trait]
impl BaseListingStore for FirestoreListingStore {
    async fn find_by_status(&self, status: ListingStatus) -> Result<Vec<ListingDoc>> {
        let documents = self
            .client
            .run_query(&self.collection, "status", "EQUAL", status.as_str())
            .await?;

        Ok(documents
            .into_iter()
            .map(|doc| ListingDoc::new(doc.name, doc.fields))
            .collect())
    }

    async fn commit(&self, batch: ListingBatch) -> Result<()> {
        let mut writes = WriteBatch::new();
        for (id, status) in &batch.status_updates {
            writes.update_string(id, "status", status.as_str());
        }
        for id in &batch.deletes {
            writes.delete(id);
        }

        if writes.is_empty() {
            return Ok(());
        }
        self.client.commit(writes).await
    }
}

// =============================================================================
// FcmClient Adapter (implements BasePushService trait)
// =============================================================================

pub struct FcmPushService(pub Arc<FcmClient>);

impl FcmPushService {
    pub fn new(client: Arc<FcmClient>) -> Self {
        Self(client)
    }
}

#[async_trait]
impl BasePushService for FcmPushService {
    async fn send_to_topic(
        &self,
        topic: &str,
        title: &str,
        body: &str,
        data: HashMap<String, String>,
    ) -> Result<String> {
        self.0.send(Message::to_topic(topic, title, body, data)).await
    }

    async fn send_to_token(
        &self,
        token: &str,
        title: &str,
        body: &str,
        data: HashMap<String, String>,
    ) -> Result<String> {
        self.0.send(Message::to_token(token, title, body, data)).await
    }
}

// =============================================================================
// ServerDeps
// =============================================================================

/// Server dependencies accessible to handlers and scheduled tasks
#[derive(Clone)]
pub struct ServerDeps {
    pub listing_store: Arc<dyn BaseListingStore>,
    pub push_service: Arc<dyn BasePushService>,
    /// Topic every app install subscribes to.
    pub broadcast_topic: String,
    /// How long an expired listing survives before the purge phase deletes it.
    pub retention_window: Duration,
}

impl ServerDeps {
    pub fn new(
        listing_store: Arc<dyn BaseListingStore>,
        push_service: Arc<dyn BasePushService>,
        broadcast_topic: String,
        retention_window: Duration,
    ) -> Self {
        Self {
            listing_store,
            push_service,
            broadcast_topic,
            retention_window,
        }
    }
}
