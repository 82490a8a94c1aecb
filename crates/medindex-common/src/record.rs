//! Extracted record model.

use serde::ser::{Serialize, SerializeMap, Serializer};
use std::path::Path;

/// Field holding the source file path of every stored document.
/// Used for resumable re-runs (skip files already indexed).
pub const PROVENANCE_FIELD: &str = "FilePath";

/// Ordered mapping from field name to value, produced by one extractor
/// from one source file.
///
/// Absent optional fields are simply not inserted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Record {
    fields: Vec<(String, String)>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a field. Replacing an existing field keeps its original position.
    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<String>) {
        let field = field.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(k, _)| *k == field) {
            Some(slot) => slot.1 = value,
            None => self.fields.push((field, value)),
        }
    }

    /// Set a field only when a value is present.
    pub fn insert_opt(&mut self, field: impl Into<String>, value: Option<String>) {
        if let Some(v) = value {
            self.insert(field, v);
        }
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == field)
            .map(|(_, v)| v.as_str())
    }

    pub fn contains(&self, field: &str) -> bool {
        self.get(field).is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Attach the provenance field for the file this record came from.
    pub fn attach_provenance(&mut self, path: &Path) {
        self.insert(PROVENANCE_FIELD, path.to_string_lossy());
    }

    /// JSON body sent to the document store.
    pub fn to_document(&self) -> serde_json::Value {
        let map = self
            .fields
            .iter()
            .map(|(k, v)| (k.clone(), serde_json::Value::String(v.clone())))
            .collect::<serde_json::Map<_, _>>();
        serde_json::Value::Object(map)
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (k, v) in &self.fields {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_replaces_in_place() {
        let mut r = Record::new();
        r.insert("PMID", "1");
        r.insert("ArticleTitle", "t");
        r.insert("PMID", "2");
        let keys: Vec<_> = r.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["PMID", "ArticleTitle"]);
        assert_eq!(r.get("PMID"), Some("2"));
    }

    #[test]
    fn test_insert_opt_skips_absent_values() {
        let mut r = Record::new();
        r.insert_opt("Keywords", None);
        assert!(r.is_empty());
    }

    #[test]
    fn test_provenance_is_appended_last() {
        let mut r = Record::new();
        r.insert("nct_id", "NCT0001");
        r.attach_provenance(Path::new("/data/trials/NCT0001.xml"));
        assert_eq!(r.iter().last(), Some((PROVENANCE_FIELD, "/data/trials/NCT0001.xml")));
        assert_eq!(r.to_document()["FilePath"], "/data/trials/NCT0001.xml");
    }

    #[test]
    fn test_serialize_keeps_field_order() {
        let mut r = Record::new();
        r.insert("b", "2");
        r.insert("a", "1");
        assert_eq!(serde_json::to_string(&r).unwrap(), r#"{"b":"2","a":"1"}"#);
    }
}
