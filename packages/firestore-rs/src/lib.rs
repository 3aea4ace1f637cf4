// Minimal Firestore REST client.
//
// Covers exactly what the listing sweeper needs: a single-field query over
// one collection and an atomic batched commit (masked field updates and
// deletes). Everything else in the Firestore surface is out of scope.

use std::sync::Arc;

use anyhow::{Context, Result};
use gcp_auth::TokenProvider;
use reqwest::Client;
use serde_json::{json, Value};
use tracing::debug;

pub mod value;

pub use value::{decode_fields, decode_value};

const FIRESTORE_BASE: &str = "https://firestore.googleapis.com/v1";

/// A document returned from a query, with its fields already decoded from
/// the typed wire encoding into plain JSON.
#[derive(Debug, Clone)]
pub struct Document {
    /// Full resource name, e.g.
    /// `projects/p/databases/(default)/documents/properties/abc`.
    pub name: String,
    pub fields: Value,
}

/// A batched write set. Committed atomically: either every write in the
/// batch is applied or none is.
#[derive(Debug, Default)]
pub struct WriteBatch {
    writes: Vec<Value>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stage an update of a single string field, masked so no other field
    /// of the document is touched.
    pub fn update_string(&mut self, doc_name: &str, field: &str, value: &str) {
        self.writes.push(json!({
            "update": {
                "name": doc_name,
                "fields": { field: { "stringValue": value } },
            },
            "updateMask": { "fieldPaths": [field] },
        }));
    }

    /// Stage a document deletion.
    pub fn delete(&mut self, doc_name: &str) {
        self.writes.push(json!({ "delete": doc_name }));
    }

    pub fn len(&self) -> usize {
        self.writes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.writes.is_empty()
    }
}

pub struct FirestoreClient {
    http: Client,
    auth: Arc<TokenProvider>,
}

impl FirestoreClient {
    pub fn new(auth: Arc<TokenProvider>) -> Result<Self> {
        let http = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self { http, auth })
    }

    fn documents_root(&self) -> String {
        format!(
            "{}/projects/{}/databases/(default)/documents",
            FIRESTORE_BASE,
            self.auth.project_id()
        )
    }

    /// Run a single-field query against one collection.
    ///
    /// `op` is a Firestore operator name (`EQUAL`, `LESS_THAN`, ...); the
    /// filter value is a string field value.
    pub async fn run_query(
        &self,
        collection: &str,
        field: &str,
        op: &str,
        value: &str,
    ) -> Result<Vec<Document>> {
        let body = build_query(collection, field, op, value);
        let token = self.auth.access_token().await?;

        let response = self
            .http
            .post(format!("{}:runQuery", self.documents_root()))
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .context("Firestore query request failed")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Firestore query returned {}: {}", status, body);
        }

        // runQuery streams one JSON object per result row; rows without a
        // `document` key (readTime-only progress entries) are skipped.
        let rows: Vec<Value> = response
            .json()
            .await
            .context("Failed to parse Firestore query response")?;

        let documents = rows
            .iter()
            .filter_map(|row| row.get("document"))
            .filter_map(|doc| {
                let name = doc.get("name")?.as_str()?.to_string();
                let fields = decode_fields(doc.get("fields").unwrap_or(&Value::Null));
                Some(Document { name, fields })
            })
            .collect::<Vec<_>>();

        debug!(
            collection,
            field, op, value, count = documents.len(), "Firestore query complete"
        );

        Ok(documents)
    }

    /// Commit a write batch atomically.
    pub async fn commit(&self, batch: WriteBatch) -> Result<()> {
        let count = batch.len();
        let token = self.auth.access_token().await?;

        let response = self
            .http
            .post(format!("{}:commit", self.documents_root()))
            .bearer_auth(token)
            .json(&json!({ "writes": batch.writes }))
            .send()
            .await
            .context("Firestore commit request failed")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Firestore commit returned {}: {}", status, body);
        }

        debug!(writes = count, "Firestore batch committed");
        Ok(())
    }
}

fn build_query(collection: &str, field: &str, op: &str, value: &str) -> Value {
    json!({
        "structuredQuery": {
            "from": [{ "collectionId": collection }],
            "where": {
                "fieldFilter": {
                    "field": { "fieldPath": field },
                    "op": op,
                    "value": { "stringValue": value },
                }
            },
        }
    })
}
