//! Record extractors, one per source format.

pub mod abstracts;
pub mod clinicaltrials;
pub mod medline;
pub mod xml;

use std::sync::Arc;
use thiserror::Error;

use medindex_common::{Record, SourceFormat};

use crate::normalise::TextNormaliser;

pub use abstracts::SupplementaryAbstractExtractor;
pub use clinicaltrials::ClinicalTrialExtractor;
pub use medline::MedlineArticleExtractor;

/// Common interface for all record extractors.
///
/// `parse` is pure and CPU-bound; the scheduler runs it on the blocking pool.
pub trait RecordExtractor: Send + Sync {
    fn format(&self) -> SourceFormat;

    /// Substring a file name must contain to be picked up by discovery.
    fn extension(&self) -> &'static str;

    /// Turn one file's content into zero or more records.
    /// Candidates missing a mandatory field are skipped, not reported.
    fn parse(&self, content: &str) -> anyhow::Result<Vec<Record>>;
}

/// Raised by an extractor to stop the whole batch rather than just the current file.
#[derive(Debug, Error)]
#[error("extraction cancelled")]
pub struct Cancelled;

/// Build the extractor for a format, sharing one normaliser.
pub fn extractor_for(format: SourceFormat, normaliser: Arc<TextNormaliser>) -> Arc<dyn RecordExtractor> {
    match format {
        SourceFormat::Literature => Arc::new(MedlineArticleExtractor::new(normaliser)),
        SourceFormat::ClinicalTrials => Arc::new(ClinicalTrialExtractor::new(normaliser)),
        SourceFormat::SupplementaryAbstracts => Arc::new(SupplementaryAbstractExtractor::new(normaliser)),
    }
}

/// Join list items the way multi-valued fields are stored ("a. b. c").
pub(crate) fn join_terms(terms: Vec<String>) -> Option<String> {
    if terms.is_empty() {
        None
    } else {
        Some(terms.join(". "))
    }
}
