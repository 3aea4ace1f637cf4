// TestDependencies - mock implementations for testing
//
// Provides mock services that can be injected into ServerDeps for tests.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::Result;
use async_trait::async_trait;
use chrono::Duration;
use serde_json::Value;

use crate::domains::listings::models::{ListingDoc, ListingStatus};
use crate::kernel::{BaseListingStore, BasePushService, ListingBatch, ServerDeps};

// =============================================================================
// In-memory Listing Store
// =============================================================================

#[derive(Debug, Clone)]
struct StoredListing {
    status: ListingStatus,
    fields: Value,
}

/// In-memory stand-in for the Firestore-backed listing store. Applies each
/// batch under one lock, mirroring the real store's atomic commit, and
/// counts queries/commits for idempotence and short-circuit assertions.
pub struct InMemoryListingStore {
    docs: Mutex<BTreeMap<String, StoredListing>>,
    commits: AtomicUsize,
    finds: AtomicUsize,
    failing_queries: Mutex<Vec<ListingStatus>>,
}

impl InMemoryListingStore {
    pub fn new() -> Self {
        Self {
            docs: Mutex::new(BTreeMap::new()),
            commits: AtomicUsize::new(0),
            finds: AtomicUsize::new(0),
            failing_queries: Mutex::new(Vec::new()),
        }
    }

    pub fn with_listing(self, id: &str, status: ListingStatus, fields: Value) -> Self {
        self.insert(id, status, fields);
        self
    }

    pub fn insert(&self, id: &str, status: ListingStatus, fields: Value) {
        self.docs
            .lock()
            .unwrap()
            .insert(id.to_string(), StoredListing { status, fields });
    }

    /// Make queries for one status fail, leaving the other status intact.
    pub fn fail_queries_for(&self, status: ListingStatus) {
        self.failing_queries.lock().unwrap().push(status);
    }

    pub fn commit_count(&self) -> usize {
        self.commits.load(Ordering::SeqCst)
    }

    pub fn find_count(&self) -> usize {
        self.finds.load(Ordering::SeqCst)
    }

    pub fn status_of(&self, id: &str) -> Option<ListingStatus> {
        self.docs.lock().unwrap().get(id).map(|l| l.status)
    }

    pub fn fields_of(&self, id: &str) -> Option<Value> {
        self.docs.lock().unwrap().get(id).map(|l| l.fields.clone())
    }

    pub fn contains(&self, id: &str) -> bool {
        self.docs.lock().unwrap().contains_key(id)
    }
}

#[async_trait]
impl BaseListingStore for InMemoryListingStore {
    async fn find_by_status(&self, status: ListingStatus) -> Result<Vec<ListingDoc>> {
        self.finds.fetch_add(1, Ordering::SeqCst);

        if self.failing_queries.lock().unwrap().contains(&status) {
            anyhow::bail!("listing query failed");
        }

        let docs = self.docs.lock().unwrap();
        Ok(docs
            .iter()
            .filter(|(_, listing)| listing.status == status)
            .map(|(id, listing)| ListingDoc::new(id.clone(), listing.fields.clone()))
            .collect())
    }

    async fn commit(&self, batch: ListingBatch) -> Result<()> {
        // One lock for the whole batch: all writes land together.
        let mut docs = self.docs.lock().unwrap();
        for (id, status) in &batch.status_updates {
            if let Some(listing) = docs.get_mut(id) {
                listing.status = *status;
            }
        }
        for id in &batch.deletes {
            docs.remove(id);
        }
        self.commits.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

// =============================================================================
// Mock Push Service
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushRoute {
    Topic(String),
    Token(String),
}

/// Arguments captured from a send call
#[derive(Debug, Clone)]
pub struct SentPush {
    pub route: PushRoute,
    pub title: String,
    pub body: String,
    pub data: HashMap<String, String>,
}

pub struct MockPushService {
    sent: Mutex<Vec<SentPush>>,
    fail: AtomicBool,
}

impl MockPushService {
    pub fn new() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail: AtomicBool::new(false),
        }
    }

    /// Make every subsequent send fail.
    pub fn fail_sends(&self) {
        self.fail.store(true, Ordering::SeqCst);
    }

    /// Get all notifications that were sent
    pub fn sent(&self) -> Vec<SentPush> {
        self.sent.lock().unwrap().clone()
    }

    fn record(
        &self,
        route: PushRoute,
        title: &str,
        body: &str,
        data: HashMap<String, String>,
    ) -> Result<String> {
        if self.fail.load(Ordering::SeqCst) {
            anyhow::bail!("push service unavailable");
        }

        let mut sent = self.sent.lock().unwrap();
        sent.push(SentPush {
            route,
            title: title.to_string(),
            body: body.to_string(),
            data,
        });
        Ok(format!("projects/demo-project/messages/{}", sent.len()))
    }
}

#[async_trait]
impl BasePushService for MockPushService {
    async fn send_to_topic(
        &self,
        topic: &str,
        title: &str,
        body: &str,
        data: HashMap<String, String>,
    ) -> Result<String> {
        self.record(PushRoute::Topic(topic.to_string()), title, body, data)
    }

    async fn send_to_token(
        &self,
        token: &str,
        title: &str,
        body: &str,
        data: HashMap<String, String>,
    ) -> Result<String> {
        self.record(PushRoute::Token(token.to_string()), title, body, data)
    }
}

// =============================================================================
// TestDependencies
// =============================================================================

/// Mock dependency bundle for handler and sweep tests.
pub struct TestDependencies {
    pub store: Arc<InMemoryListingStore>,
    pub push: Arc<MockPushService>,
}

impl TestDependencies {
    pub fn new() -> Self {
        Self {
            store: Arc::new(InMemoryListingStore::new()),
            push: Arc::new(MockPushService::new()),
        }
    }

    /// ServerDeps wired to the mocks, with the default broadcast topic and
    /// the default three-day retention window.
    pub fn server_deps(&self) -> Arc<ServerDeps> {
        Arc::new(ServerDeps::new(
            self.store.clone(),
            self.push.clone(),
            "all_users".to_string(),
            Duration::days(3),
        ))
    }
}

impl Default for TestDependencies {
    fn default() -> Self {
        Self::new()
    }
}
