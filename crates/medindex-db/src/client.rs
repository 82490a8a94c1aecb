//! Store client interface.

use async_trait::async_trait;
use medindex_common::PROVENANCE_FIELD;
use serde_json::{json, Map, Value};

use crate::error::Result;

/// The operations the ingestion pipeline needs from a document store.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Create `collection` with the mapping provenance lookups rely on, if it
    /// does not exist yet. Schemaless stores have nothing to do.
    async fn prepare(&self, _collection: &str) -> Result<()> {
        Ok(())
    }

    /// Add one document to a collection.
    async fn index(&self, collection: &str, document: &Value) -> Result<()>;

    /// Run a query against a collection and return the matching document bodies.
    /// A missing collection yields no hits.
    async fn search(&self, collection: &str, query: &Value) -> Result<Vec<Value>>;
}

/// Un-analysed sub-field holding the full provenance path.
pub fn provenance_keyword_field() -> String {
    format!("{PROVENANCE_FIELD}.keyword")
}

/// Exact `term` match on the provenance keyword; one hit is enough.
pub fn provenance_query(path: &str) -> Value {
    let mut term = Map::new();
    term.insert(provenance_keyword_field(), Value::String(path.to_string()));
    json!({
        "query": { "term": term },
        "size": 1
    })
}

/// Collection mapping: provenance is full text plus a keyword sub-field with
/// no `ignore_above`, so long paths stay exactly searchable.
pub fn collection_mapping() -> Value {
    let mut properties = Map::new();
    properties.insert(
        PROVENANCE_FIELD.to_string(),
        json!({
            "type": "text",
            "fields": { "keyword": { "type": "keyword" } }
        }),
    );
    json!({ "mappings": { "properties": properties } })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provenance_query_is_exact_term() {
        let q = provenance_query("/data/A.xml");
        assert_eq!(q["query"]["term"]["FilePath.keyword"], "/data/A.xml");
        assert_eq!(q["size"], 1);
    }

    #[test]
    fn test_mapping_keeps_full_keyword() {
        let m = collection_mapping();
        let keyword = &m["mappings"]["properties"]["FilePath"]["fields"]["keyword"];
        assert_eq!(keyword["type"], "keyword");
        assert!(keyword.get("ignore_above").is_none());
    }
}
