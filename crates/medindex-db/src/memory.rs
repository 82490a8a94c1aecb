//! In-memory document store.
//!
//! Understands the `term` queries the gateway issues. A `.keyword` sub-field
//! maps back to its parent field, compared by exact equality.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::Mutex;

use crate::client::DocumentStore;
use crate::error::{Result, StoreError};

#[derive(Default)]
pub struct InMemoryStore {
    collections: Mutex<HashMap<String, Vec<Value>>>,
    index_calls: AtomicUsize,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// All documents of a collection, in insertion order.
    pub async fn documents(&self, collection: &str) -> Vec<Value> {
        self.collections
            .lock()
            .await
            .get(collection)
            .cloned()
            .unwrap_or_default()
    }

    pub async fn count(&self, collection: &str) -> usize {
        self.collections
            .lock()
            .await
            .get(collection)
            .map(Vec::len)
            .unwrap_or(0)
    }

    /// Number of `index` calls served so far.
    pub fn index_calls(&self) -> usize {
        self.index_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DocumentStore for InMemoryStore {
    async fn index(&self, collection: &str, document: &Value) -> Result<()> {
        if !document.is_object() {
            return Err(StoreError::Rejected("document body must be a JSON object".into()));
        }
        self.index_calls.fetch_add(1, Ordering::SeqCst);
        self.collections
            .lock()
            .await
            .entry(collection.to_string())
            .or_default()
            .push(document.clone());
        Ok(())
    }

    async fn search(&self, collection: &str, query: &Value) -> Result<Vec<Value>> {
        let (field, wanted) = query["query"]["term"]
            .as_object()
            .and_then(|m| m.iter().next())
            .ok_or_else(|| StoreError::Rejected(format!("unsupported query: {query}")))?;
        let field = field.strip_suffix(".keyword").unwrap_or(field);
        let limit = query["size"].as_u64().map(|n| n as usize).unwrap_or(10);

        let collections = self.collections.lock().await;
        let hits = collections
            .get(collection)
            .map(|docs| {
                docs.iter()
                    .filter(|d| &d[field] == wanted)
                    .take(limit)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        Ok(hits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::provenance_query;
    use serde_json::json;

    #[tokio::test]
    async fn test_search_matches_exact_provenance_only() {
        let store = InMemoryStore::new();
        store.index("literature", &json!({ "PMID": "1", "FilePath": "/a.xml" })).await.unwrap();
        store.index("literature", &json!({ "PMID": "2", "FilePath": "/a.xml.bak" })).await.unwrap();

        let hits = store.search("literature", &provenance_query("/a.xml")).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0]["PMID"], "1");
        assert_eq!(store.index_calls(), 2);
    }

    #[tokio::test]
    async fn test_collections_are_isolated() {
        let store = InMemoryStore::new();
        store.index("literature", &json!({ "FilePath": "/a.xml" })).await.unwrap();
        let hits = store.search("clinical-trials", &provenance_query("/a.xml")).await.unwrap();
        assert!(hits.is_empty());
    }

    #[tokio::test]
    async fn test_unsupported_query_is_rejected() {
        let store = InMemoryStore::new();
        let err = store.search("literature", &json!({ "query": { "match_all": {} } })).await.unwrap_err();
        assert!(matches!(err, StoreError::Rejected(_)));
    }
}
