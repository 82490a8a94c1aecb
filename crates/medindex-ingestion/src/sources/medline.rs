//! MEDLINE / PubMed article-set extractor.
//!
//! Handles the `<PubmedArticleSet><PubmedArticle>` structure produced by
//! PubMed baseline/update files and efetch. One record per article.
//!
//! Mandatory: `PMID`, `ArticleTitle`, `AbstractText`.
//! Optional:  `Keywords`, `Chemicals`, `MeshHeadings` (". "-joined).

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::debug;

use medindex_common::{Record, SourceFormat};

use super::xml::{parse_document, XmlElement};
use super::{join_terms, RecordExtractor};
use crate::normalise::TextNormaliser;

pub struct MedlineArticleExtractor {
    normaliser: Arc<TextNormaliser>,
}

impl MedlineArticleExtractor {
    pub fn new(normaliser: Arc<TextNormaliser>) -> Self {
        Self { normaliser }
    }

    fn extract_article(&self, article: &XmlElement) -> Option<Record> {
        let pmid = article.text_at("MedlineCitation/PMID")?;
        let title = article.text_at("MedlineCitation/Article/ArticleTitle")?;
        // Structured abstracts carry several labelled sections.
        let abstract_text = article
            .texts_at("MedlineCitation/Article/Abstract/AbstractText")
            .join(" ");
        if abstract_text.is_empty() {
            return None;
        }

        let mut record = Record::new();
        record.insert("PMID", pmid);
        record.insert("ArticleTitle", self.normaliser.normalise(&title));
        record.insert("AbstractText", self.normaliser.normalise(&abstract_text));
        record.insert_opt("Keywords", join_terms(article.texts_at("MedlineCitation/KeywordList/Keyword")));
        record.insert_opt(
            "Chemicals",
            join_terms(article.texts_at("MedlineCitation/ChemicalList/Chemical/NameOfSubstance")),
        );
        record.insert_opt(
            "MeshHeadings",
            join_terms(article.texts_at("MedlineCitation/MeshHeadingList/MeshHeading/DescriptorName")),
        );
        Some(record)
    }
}

impl RecordExtractor for MedlineArticleExtractor {
    fn format(&self) -> SourceFormat {
        SourceFormat::Literature
    }

    fn extension(&self) -> &'static str {
        ".xml"
    }

    fn parse(&self, content: &str) -> Result<Vec<Record>> {
        let root = parse_document(content).context("invalid PubMed XML")?;

        let articles = if root.name == "PubmedArticle" {
            vec![&root]
        } else {
            root.find_all("PubmedArticle")
        };

        let mut records = Vec::with_capacity(articles.len());
        for article in articles {
            match self.extract_article(article) {
                Some(r) => records.push(r),
                None => debug!("Skipping article with missing PMID, title or abstract"),
            }
        }
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extractor() -> MedlineArticleExtractor {
        MedlineArticleExtractor::new(Arc::new(TextNormaliser::english()))
    }

    const FULL: &str = r#"<?xml version="1.0"?>
<PubmedArticleSet>
  <PubmedArticle>
    <MedlineCitation Status="MEDLINE">
      <PMID Version="1">12345678</PMID>
      <Article>
        <ArticleTitle>KRAS G12D in <i>pancreatic</i> cancer.</ArticleTitle>
        <Abstract>
          <AbstractText Label="BACKGROUND">The mutation is common.</AbstractText>
          <AbstractText Label="RESULTS">Inhibitors were effective.</AbstractText>
        </Abstract>
      </Article>
      <ChemicalList>
        <Chemical><RegistryNumber>0</RegistryNumber><NameOfSubstance>Proto-Oncogene Proteins p21(ras)</NameOfSubstance></Chemical>
      </ChemicalList>
      <MeshHeadingList>
        <MeshHeading><DescriptorName>Humans</DescriptorName></MeshHeading>
        <MeshHeading><DescriptorName>Pancreatic Neoplasms</DescriptorName><QualifierName>genetics</QualifierName></MeshHeading>
      </MeshHeadingList>
      <KeywordList Owner="NOTNLM"><Keyword>KRAS</Keyword><Keyword>PDAC</Keyword></KeywordList>
    </MedlineCitation>
  </PubmedArticle>
</PubmedArticleSet>"#;

    #[test]
    fn test_full_article() {
        let records = extractor().parse(FULL).unwrap();
        assert_eq!(records.len(), 1);
        let r = &records[0];
        assert_eq!(r.get("PMID"), Some("12345678"));
        assert_eq!(r.get("ArticleTitle"), Some("kras g12d pancreatic cancer"));
        assert_eq!(r.get("AbstractText"), Some("mutation common inhibitors effective"));
        assert_eq!(r.get("Keywords"), Some("KRAS. PDAC"));
        assert_eq!(r.get("Chemicals"), Some("Proto-Oncogene Proteins p21(ras)"));
        assert_eq!(r.get("MeshHeadings"), Some("Humans. Pancreatic Neoplasms"));
    }

    #[test]
    fn test_optional_lists_absent() {
        let xml = r#"<PubmedArticleSet><PubmedArticle><MedlineCitation>
            <PMID>1</PMID>
            <Article><ArticleTitle>Title</ArticleTitle>
            <Abstract><AbstractText>Body text</AbstractText></Abstract></Article>
        </MedlineCitation></PubmedArticle></PubmedArticleSet>"#;
        let records = extractor().parse(xml).unwrap();
        assert_eq!(records.len(), 1);
        assert!(!records[0].contains("Keywords"));
        assert!(!records[0].contains("Chemicals"));
        assert!(!records[0].contains("MeshHeadings"));
    }

    #[test]
    fn test_articles_missing_mandatory_fields_are_skipped() {
        let xml = r#"<PubmedArticleSet>
          <PubmedArticle><MedlineCitation><PMID>123</PMID>
            <Article><ArticleTitle></ArticleTitle>
            <Abstract><AbstractText>Has abstract</AbstractText></Abstract></Article>
          </MedlineCitation></PubmedArticle>
          <PubmedArticle><MedlineCitation><PMID>124</PMID>
            <Article><ArticleTitle>No abstract here</ArticleTitle></Article>
          </MedlineCitation></PubmedArticle>
          <PubmedArticle><MedlineCitation>
            <Article><ArticleTitle>No PMID</ArticleTitle>
            <Abstract><AbstractText>Text</AbstractText></Abstract></Article>
          </MedlineCitation></PubmedArticle>
          <PubmedArticle><MedlineCitation><PMID>125</PMID>
            <Article><ArticleTitle>Complete</ArticleTitle>
            <Abstract><AbstractText>Complete abstract</AbstractText></Abstract></Article>
          </MedlineCitation></PubmedArticle>
        </PubmedArticleSet>"#;
        let records = extractor().parse(xml).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].get("PMID"), Some("125"));
    }

    #[test]
    fn test_empty_set_yields_no_records() {
        assert!(extractor().parse("<PubmedArticleSet/>").unwrap().is_empty());
    }

    #[test]
    fn test_malformed_xml_is_an_error() {
        let err = extractor().parse("<PubmedArticleSet><PubmedArticle>").unwrap_err();
        assert!(format!("{err:#}").contains("invalid PubMed XML"));
    }
}
