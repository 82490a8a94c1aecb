//! medindex document-store layer
//!
//! This crate wraps the search engine that holds the indexed documents.
//!
//! # Features
//!
//! - `DocumentStore` trait with the two operations the pipeline consumes
//!   (`index` and `search`)
//! - Elasticsearch HTTP client with connection-level retry
//! - In-memory store for tests and dry runs
//! - `DocumentGateway`: bounded write retry and provenance lookups
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use medindex_db::{DocumentGateway, ElasticClient, ElasticConfig, RetryPolicy};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = ElasticClient::new(&ElasticConfig::default())?;
//!     let gateway = DocumentGateway::new(Arc::new(client), RetryPolicy::default());
//!     let seen = gateway.exists("literature", "/data/pubmed/a.xml").await?;
//!     println!("already indexed: {seen}");
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod elastic;
pub mod error;
pub mod gateway;
pub mod memory;

pub use client::{provenance_query, DocumentStore};
pub use elastic::{ElasticClient, ElasticConfig};
pub use error::{Result, StoreError};
pub use gateway::{DocumentGateway, RetryPolicy, WriteError};
pub use memory::InMemoryStore;
