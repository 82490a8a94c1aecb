//! Minimal element tree over quick-xml events.
//!
//! Supports the handful of queries the extractors need: child paths
//! (`MedlineCitation/Article/ArticleTitle`), all matches of a path, and the
//! first descendant with a given name.

use anyhow::Result;
use quick_xml::events::Event;
use quick_xml::Reader;

use medindex_common::MedindexError;

#[derive(Debug, Clone, PartialEq)]
pub enum XmlNode {
    Element(XmlElement),
    Text(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct XmlElement {
    pub name: String,
    pub children: Vec<XmlNode>,
}

impl XmlElement {
    fn new(name: String) -> Self {
        Self { name, children: Vec::new() }
    }

    pub fn elements(&self) -> impl Iterator<Item = &XmlElement> {
        self.children.iter().filter_map(|c| match c {
            XmlNode::Element(e) => Some(e),
            XmlNode::Text(_) => None,
        })
    }

    /// All elements reached by following `path` from this element's children.
    pub fn find_all<'a>(&'a self, path: &str) -> Vec<&'a XmlElement> {
        let mut current = vec![self];
        for segment in path.trim_start_matches("./").split('/').filter(|s| !s.is_empty()) {
            current = current
                .into_iter()
                .flat_map(|el| el.elements().filter(move |c| c.name == segment))
                .collect();
        }
        current
    }

    pub fn find(&self, path: &str) -> Option<&XmlElement> {
        self.find_all(path).into_iter().next()
    }

    /// First element named `name` in document order, this element included.
    pub fn descendant(&self, name: &str) -> Option<&XmlElement> {
        if self.name == name {
            return Some(self);
        }
        self.elements().find_map(|c| c.descendant(name))
    }

    /// All text under this element, inline markup flattened, trimmed.
    pub fn text(&self) -> String {
        let mut buf = String::new();
        self.collect_text(&mut buf);
        buf.trim().to_string()
    }

    fn collect_text(&self, buf: &mut String) {
        for child in &self.children {
            match child {
                XmlNode::Text(t) => buf.push_str(t),
                XmlNode::Element(e) => e.collect_text(buf),
            }
        }
    }

    /// `text()` of the first match of `path`, if present and non-blank.
    pub fn text_at(&self, path: &str) -> Option<String> {
        self.find(path).map(XmlElement::text).filter(|t| !t.is_empty())
    }

    /// Non-blank texts of every match of `path`.
    pub fn texts_at(&self, path: &str) -> Vec<String> {
        self.find_all(path)
            .into_iter()
            .map(XmlElement::text)
            .filter(|t| !t.is_empty())
            .collect()
    }
}

/// Parse a whole document into its root element.
pub fn parse_document(xml: &str) -> Result<XmlElement> {
    let mut reader = Reader::from_str(xml);
    let mut stack: Vec<XmlElement> = Vec::new();
    let mut root: Option<XmlElement> = None;

    loop {
        let position = reader.buffer_position();
        let event = reader
            .read_event()
            .map_err(|e| MedindexError::Xml(format!("syntax error near byte {position}: {e}")))?;
        match event {
            Event::Start(e) => {
                stack.push(XmlElement::new(String::from_utf8_lossy(e.name().as_ref()).into_owned()));
            }
            Event::Empty(e) => {
                let el = XmlElement::new(String::from_utf8_lossy(e.name().as_ref()).into_owned());
                attach(&mut stack, &mut root, el)?;
            }
            Event::End(_) => {
                let el = stack
                    .pop()
                    .ok_or_else(|| MedindexError::Xml("closing tag without matching opening tag".into()))?;
                attach(&mut stack, &mut root, el)?;
            }
            Event::Text(t) => {
                if let Some(top) = stack.last_mut() {
                    let text = t
                        .unescape()
                        .map(|s| s.into_owned())
                        .unwrap_or_else(|_| String::from_utf8_lossy(&t).into_owned());
                    top.children.push(XmlNode::Text(text));
                }
            }
            Event::CData(c) => {
                if let Some(top) = stack.last_mut() {
                    top.children.push(XmlNode::Text(String::from_utf8_lossy(&c).into_owned()));
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if let Some(open) = stack.last() {
        return Err(MedindexError::Xml(format!("unexpected end of document inside <{}>", open.name)).into());
    }
    Ok(root.ok_or_else(|| MedindexError::Xml("document has no root element".into()))?)
}

fn attach(stack: &mut [XmlElement], root: &mut Option<XmlElement>, el: XmlElement) -> Result<()> {
    match stack.last_mut() {
        Some(parent) => parent.children.push(XmlNode::Element(el)),
        None if root.is_none() => *root = Some(el),
        None => {
            return Err(
                MedindexError::Xml(format!("multiple root elements (<{}> after document end)", el.name)).into(),
            )
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = r#"<?xml version="1.0"?>
<!DOCTYPE set>
<set>
  <item><id>1</id><name>Alpha <i>beta</i> gamma</name></item>
  <item><id>2</id><name/></item>
  <meta><deep><id>99</id></deep></meta>
  <note><![CDATA[a < b]]> &amp; more</note>
</set>"#;

    #[test]
    fn test_paths_and_text() {
        let root = parse_document(DOC).unwrap();
        assert_eq!(root.name, "set");
        let items = root.find_all("item");
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].text_at("./id").as_deref(), Some("1"));
        assert_eq!(items[0].text_at("name").as_deref(), Some("Alpha beta gamma"));
        assert_eq!(items[1].text_at("name"), None);
        assert_eq!(root.texts_at("item/id"), vec!["1", "2"]);
        assert_eq!(root.text_at("note").as_deref(), Some("a < b & more"));
    }

    #[test]
    fn test_descendant_search() {
        let root = parse_document(DOC).unwrap();
        assert_eq!(root.descendant("id").map(|e| e.text()).as_deref(), Some("1"));
        assert!(root.find("meta/id").is_none());
        assert_eq!(root.find("meta/deep/id").map(|e| e.text()).as_deref(), Some("99"));
    }

    #[test]
    fn test_malformed_documents_are_errors() {
        assert!(parse_document("<a><b></a>").is_err());
        assert!(parse_document("<a>").is_err());
        assert!(parse_document("").is_err());
        assert!(parse_document("<a/><b/>").is_err());
    }

    #[test]
    fn test_errors_carry_xml_kind() {
        for doc in ["<a><b></a>", "<a>", "", "<a/><b/>", "</a>"] {
            let err = parse_document(doc).unwrap_err();
            assert!(
                matches!(err.downcast_ref::<MedindexError>(), Some(MedindexError::Xml(_))),
                "{doc:?}: {err}"
            );
        }
    }
}
