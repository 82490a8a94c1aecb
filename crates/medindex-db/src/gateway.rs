//! Document store gateway.
//!
//! Wraps a `DocumentStore` with:
//! - bounded retry of timeout-class write failures (fixed delay between attempts)
//! - provenance lookups used to skip files that were already ingested
//!
//! Retry state lives on the stack of each `write` call; nothing is shared
//! between concurrent writers.

use medindex_common::Record;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

use crate::client::{provenance_query, DocumentStore};
use crate::error::{Result, StoreError};

/// How often and how patiently a write is retried.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first one.
    pub max_attempts: u32,
    /// Fixed pause between attempts.
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self { max_attempts: max_attempts.max(1), delay }
    }

    /// Same attempt bound, no sleeping. Used by tests.
    pub fn immediate(max_attempts: u32) -> Self {
        Self::new(max_attempts, Duration::ZERO)
    }
}

#[derive(Debug, Error)]
pub enum WriteError {
    #[error("write abandoned after {attempts} attempts: {last}")]
    Exhausted { attempts: u32, last: StoreError },

    #[error("write rejected: {0}")]
    Rejected(StoreError),
}

#[derive(Clone)]
pub struct DocumentGateway {
    store: Arc<dyn DocumentStore>,
    retry: RetryPolicy,
}

impl DocumentGateway {
    pub fn new(store: Arc<dyn DocumentStore>, retry: RetryPolicy) -> Self {
        Self { store, retry }
    }

    /// Make sure the target collection exists with the provenance mapping.
    pub async fn prepare(&self, collection: &str) -> Result<()> {
        self.store.prepare(collection).await
    }

    /// Index one record. Returns the number of attempts it took.
    pub async fn write(&self, collection: &str, record: &Record) -> std::result::Result<u32, WriteError> {
        let body = record.to_document();
        self.write_document(collection, &body).await
    }

    pub async fn write_document(
        &self,
        collection: &str,
        body: &Value,
    ) -> std::result::Result<u32, WriteError> {
        let max_attempts = self.retry.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            attempt += 1;
            match self.store.index(collection, body).await {
                Ok(()) => {
                    debug!(collection, attempt, "Record stored");
                    return Ok(attempt);
                }
                Err(e) if e.is_transient() => {
                    if attempt >= max_attempts {
                        warn!(collection, attempts = attempt, error = %e, "Giving up on record");
                        return Err(WriteError::Exhausted { attempts: attempt, last: e });
                    }
                    warn!(collection, attempt, error = %e, "Transient store failure, retrying");
                    if !self.retry.delay.is_zero() {
                        tokio::time::sleep(self.retry.delay).await;
                    }
                }
                Err(e) => return Err(WriteError::Rejected(e)),
            }
        }
    }

    /// True iff at least one document in `collection` carries `path` as its provenance.
    pub async fn exists(&self, collection: &str, path: &str) -> Result<bool> {
        let hits = self.store.search(collection, &provenance_query(path)).await?;
        Ok(hits
            .iter()
            .any(|doc| doc[medindex_common::PROVENANCE_FIELD].as_str() == Some(path)))
    }
}
