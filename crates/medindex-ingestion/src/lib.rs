//! medindex-ingestion: Batch ingestion of biomedical source files.
//! Covers:
//! - Text normalisation (tokenise + stop-word filter)
//! - Record extraction (MEDLINE articles, clinical trials, meeting abstracts)
//! - File discovery under a root path
//! - Concurrent ingestion scheduler with resumable re-runs

pub mod discovery;
pub mod normalise;
pub mod pipeline;
pub mod queue;
pub mod sources;

pub use discovery::{discover_files, Discovery};
pub use normalise::TextNormaliser;
pub use pipeline::{run_ingestion, IngestionJob, IngestionProgress, IngestionReport, IngestionScheduler};
pub use sources::{extractor_for, RecordExtractor};
