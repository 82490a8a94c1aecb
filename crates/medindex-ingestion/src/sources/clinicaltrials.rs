//! ClinicalTrials.gov study record extractor.
//!
//! One `<clinical_study>` document per file, at most one record.
//!   - nct_id               = first `<nct_id>` anywhere (normally id_info/nct_id)
//!   - brief_summary        = brief_summary/textblock, normalised
//!   - detailed_description = detailed_description/textblock, normalised
//!   - criteria             = eligibility/criteria/textblock, normalised
//!   - gender, minimum_age, maximum_age copied verbatim from eligibility
//!   - mesh_term            = condition_browse/mesh_term, ". "-joined

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::debug;

use medindex_common::{Record, SourceFormat};

use super::xml::parse_document;
use super::{join_terms, RecordExtractor};
use crate::normalise::TextNormaliser;

pub struct ClinicalTrialExtractor {
    normaliser: Arc<TextNormaliser>,
}

impl ClinicalTrialExtractor {
    pub fn new(normaliser: Arc<TextNormaliser>) -> Self {
        Self { normaliser }
    }
}

impl RecordExtractor for ClinicalTrialExtractor {
    fn format(&self) -> SourceFormat {
        SourceFormat::ClinicalTrials
    }

    fn extension(&self) -> &'static str {
        ".xml"
    }

    fn parse(&self, content: &str) -> Result<Vec<Record>> {
        let root = parse_document(content).context("invalid clinical trial XML")?;

        let nct_id = root.descendant("nct_id").map(|e| e.text()).filter(|t| !t.is_empty());
        let brief_summary = root.text_at("brief_summary/textblock");
        let (Some(nct_id), Some(brief_summary)) = (nct_id, brief_summary) else {
            debug!(root = %root.name, "Skipping study without nct_id or brief summary");
            return Ok(vec![]);
        };

        let normalise = |t: String| self.normaliser.normalise(&t);

        let mut record = Record::new();
        record.insert("nct_id", nct_id);
        record.insert("brief_summary", normalise(brief_summary));
        record.insert_opt(
            "detailed_description",
            root.text_at("detailed_description/textblock").map(normalise),
        );
        record.insert_opt("criteria", root.text_at("eligibility/criteria/textblock").map(normalise));
        record.insert_opt("gender", root.text_at("eligibility/gender"));
        record.insert_opt("minimum_age", root.text_at("eligibility/minimum_age"));
        record.insert_opt("maximum_age", root.text_at("eligibility/maximum_age"));
        record.insert_opt("mesh_term", join_terms(root.texts_at("condition_browse/mesh_term")));

        Ok(vec![record])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extractor() -> ClinicalTrialExtractor {
        ClinicalTrialExtractor::new(Arc::new(TextNormaliser::english()))
    }

    const STUDY: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<clinical_study rank="1">
  <id_info>
    <org_study_id>ABC-1</org_study_id>
    <nct_id>NCT04956640</nct_id>
  </id_info>
  <brief_title>A Study of a KRAS Inhibitor</brief_title>
  <brief_summary>
    <textblock>
      This is a study of the safety of the drug in patients with tumours.
    </textblock>
  </brief_summary>
  <detailed_description>
    <textblock>Participants will receive the drug daily.</textblock>
  </detailed_description>
  <eligibility>
    <criteria>
      <textblock>Inclusion Criteria: - Age over 18</textblock>
    </criteria>
    <gender>All</gender>
    <minimum_age>18 Years</minimum_age>
    <maximum_age>N/A</maximum_age>
  </eligibility>
  <condition_browse>
    <mesh_term>Pancreatic Neoplasms</mesh_term>
    <mesh_term>Carcinoma</mesh_term>
  </condition_browse>
</clinical_study>"#;

    #[test]
    fn test_full_study() {
        let records = extractor().parse(STUDY).unwrap();
        assert_eq!(records.len(), 1);
        let r = &records[0];
        assert_eq!(r.get("nct_id"), Some("NCT04956640"));
        assert_eq!(r.get("brief_summary"), Some("study safety drug patients tumours"));
        assert_eq!(r.get("detailed_description"), Some("participants receive drug daily"));
        assert_eq!(r.get("criteria"), Some("inclusion criteria age 18"));
        assert_eq!(r.get("gender"), Some("All"));
        assert_eq!(r.get("minimum_age"), Some("18 Years"));
        assert_eq!(r.get("maximum_age"), Some("N/A"));
        assert_eq!(r.get("mesh_term"), Some("Pancreatic Neoplasms. Carcinoma"));
    }

    #[test]
    fn test_missing_brief_summary_yields_nothing() {
        let xml = r#"<clinical_study><id_info><nct_id>NCT1</nct_id></id_info>
            <detailed_description><textblock>Only details</textblock></detailed_description>
        </clinical_study>"#;
        assert!(extractor().parse(xml).unwrap().is_empty());
    }

    #[test]
    fn test_missing_nct_id_yields_nothing() {
        let xml = r#"<clinical_study><brief_summary><textblock>Summary</textblock></brief_summary></clinical_study>"#;
        assert!(extractor().parse(xml).unwrap().is_empty());
    }

    #[test]
    fn test_optional_fields_absent() {
        let xml = r#"<clinical_study><id_info><nct_id>NCT2</nct_id></id_info>
            <brief_summary><textblock>Summary text</textblock></brief_summary>
        </clinical_study>"#;
        let records = extractor().parse(xml).unwrap();
        assert_eq!(records.len(), 1);
        let keys: Vec<_> = records[0].iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["nct_id", "brief_summary"]);
    }
}
