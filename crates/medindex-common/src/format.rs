//! Source formats understood by the ingestion pipeline.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::MedindexError;

/// One variant per record extractor. Each format is stored in its own collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SourceFormat {
    /// MEDLINE/PubMed article sets (`<PubmedArticleSet>`).
    Literature,
    /// ClinicalTrials.gov study records (`<clinical_study>`).
    ClinicalTrials,
    /// Plain-text meeting abstracts.
    SupplementaryAbstracts,
}

impl SourceFormat {
    pub const ALL: [SourceFormat; 3] = [
        SourceFormat::Literature,
        SourceFormat::ClinicalTrials,
        SourceFormat::SupplementaryAbstracts,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SourceFormat::Literature             => "literature",
            SourceFormat::ClinicalTrials         => "clinical-trials",
            SourceFormat::SupplementaryAbstracts => "supplementary-abstracts",
        }
    }

    /// Name of the document-store collection this format is indexed into.
    pub fn collection(&self) -> &'static str {
        self.as_str()
    }
}

impl fmt::Display for SourceFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceFormat {
    type Err = MedindexError;

    /// Accepts the collection name or the legacy numeric selector (1, 2, 3).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "1" | "literature" | "medline"              => Ok(SourceFormat::Literature),
            "2" | "clinical-trials" | "clinicaltrials"  => Ok(SourceFormat::ClinicalTrials),
            "3" | "supplementary-abstracts" | "abstracts" => Ok(SourceFormat::SupplementaryAbstracts),
            other => Err(MedindexError::UnknownFormat(other.to_string())),
        }
    }
}
