//! Supplementary meeting-abstract extractor (plain text).
//!
//! Line rules:
//!   - blank lines and lines containing `Meeting:` are ignored
//!   - a line starting with `Title:` sets the title (text after the marker)
//!   - every other line is body text; body lines are concatenated
//!
//! The body (`Text`) is mandatory and normalised; `Title` is kept verbatim.

use anyhow::Result;
use std::sync::Arc;

use medindex_common::{Record, SourceFormat};

use super::RecordExtractor;
use crate::normalise::TextNormaliser;

const TITLE_MARKER: &str = "Title:";
const MEETING_MARKER: &str = "Meeting:";

pub struct SupplementaryAbstractExtractor {
    normaliser: Arc<TextNormaliser>,
}

impl SupplementaryAbstractExtractor {
    pub fn new(normaliser: Arc<TextNormaliser>) -> Self {
        Self { normaliser }
    }
}

impl RecordExtractor for SupplementaryAbstractExtractor {
    fn format(&self) -> SourceFormat {
        SourceFormat::SupplementaryAbstracts
    }

    fn extension(&self) -> &'static str {
        ".txt"
    }

    fn parse(&self, content: &str) -> Result<Vec<Record>> {
        let mut title: Option<String> = None;
        let mut body: Vec<&str> = Vec::new();

        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.contains(MEETING_MARKER) {
                continue;
            }
            match line.strip_prefix(TITLE_MARKER) {
                Some(rest) => title = Some(rest.trim().to_string()).filter(|t| !t.is_empty()),
                None => body.push(line),
            }
        }

        if body.is_empty() {
            return Ok(vec![]);
        }

        let mut record = Record::new();
        record.insert_opt("Title", title);
        record.insert("Text", self.normaliser.normalise(&body.join(" ")));
        Ok(vec![record])
    }
}
