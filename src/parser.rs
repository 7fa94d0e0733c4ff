//! MEI parser — loads MEI markup into the editable [`Document`] tree.

use roxmltree::Node as XmlNode;

use crate::document::{Document, NodeId};
use crate::error::{EditError, Result};

const XML_NS: &str = "http://www.w3.org/XML/1998/namespace";

/// Parse an MEI XML string into a Document.
///
/// `xml:id` attributes become node identifiers; elements without one are
/// given a freshly generated identifier.
pub fn parse_mei(xml: &str) -> Result<Document> {
    let options = roxmltree::ParsingOptions {
        allow_dtd: true,
        ..Default::default()
    };
    let xml_doc = roxmltree::Document::parse_with_options(xml, options)?;
    let xml_root = xml_doc.root_element();

    if xml_root.tag_name().name() != "mei" {
        return Err(EditError::Parse(format!(
            "Unsupported root element: '{}'. Only 'mei' documents are supported.",
            xml_root.tag_name().name()
        )));
    }

    let mut doc = match xml_id(&xml_root) {
        Some(id) => Document::with_root_id("mei", &id),
        None => Document::new("mei"),
    };
    let root = doc.root();

    copy_element(&xml_root, None, root, &mut doc)?;
    for child in xml_root.children().filter(|n| n.is_element()) {
        load_element(&child, &xml_root, root, &mut doc)?;
    }

    Ok(doc)
}

// ─── Elements ────────────────────────────────────────────────────────

impl Document {
    /// Parse MEI markup. See [`parse_mei`].
    pub fn parse_mei(xml: &str) -> Result<Self> {
        parse_mei(xml)
    }
}

fn load_element(
    node: &XmlNode,
    xml_parent: &XmlNode,
    parent: NodeId,
    doc: &mut Document,
) -> Result<()> {
    let tag = qualified_tag(node);
    let key = match xml_id(node) {
        Some(id) => doc.create_with_id(&tag, &id)?,
        None => doc.create(&tag),
    };
    copy_element(node, Some(xml_parent), key, doc)?;
    doc.append_child(parent, key)?;

    for child in node.children().filter(|n| n.is_element()) {
        load_element(&child, node, key, doc)?;
    }
    Ok(())
}

/// Copy namespace declarations, attributes and text onto `key`.
fn copy_element(
    node: &XmlNode,
    xml_parent: Option<&XmlNode>,
    key: NodeId,
    doc: &mut Document,
) -> Result<()> {
    let element = doc.node_mut(key);

    for ns in node.namespaces() {
        if ns.uri() == XML_NS {
            continue;
        }
        let inherited = xml_parent.is_some_and(|p| {
            p.namespaces()
                .any(|pns| pns.name() == ns.name() && pns.uri() == ns.uri())
        });
        if inherited {
            continue;
        }
        match ns.name() {
            Some(prefix) => element.set_attribute(&format!("xmlns:{prefix}"), ns.uri()),
            None => element.set_attribute("xmlns", ns.uri()),
        }
    }

    for attr in node.attributes() {
        let name = match attr.namespace() {
            Some(XML_NS) if attr.name() == "id" => continue,
            Some(XML_NS) => format!("xml:{}", attr.name()),
            Some(uri) => match node.lookup_prefix(uri) {
                Some(prefix) if !prefix.is_empty() => format!("{prefix}:{}", attr.name()),
                _ => attr.name().to_string(),
            },
            None => attr.name().to_string(),
        };
        element.set_attribute(&name, attr.value());
    }

    let text: String = node
        .children()
        .filter(|n| n.is_text())
        .filter_map(|n| n.text())
        .collect();
    let text = text.trim();
    if !text.is_empty() {
        element.set_text(Some(text.to_string()));
    }

    Ok(())
}

fn xml_id(node: &XmlNode) -> Option<String> {
    node.attribute((XML_NS, "id")).map(String::from)
}

fn qualified_tag(node: &XmlNode) -> String {
    let tag = node.tag_name();
    match tag.namespace().and_then(|uri| node.lookup_prefix(uri)) {
        Some(prefix) if !prefix.is_empty() => format!("{prefix}:{}", tag.name()),
        _ => tag.name().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SMALL: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<mei xmlns="http://www.music-encoding.org/ns/mei" xmlns:xlink="http://www.w3.org/1999/xlink" xml:id="m-root" meiversion="2013">
  <meiHead><fileDesc><titleStmt><title>Salve</title></titleStmt></fileDesc></meiHead>
  <music>
    <facsimile><surface xml:id="s1"><graphic xlink:href="page.jpg"/></surface></facsimile>
    <body><mdiv><score><section>
      <staff n="1"><layer n="1"><neume name="punctum"><nc><note pname="c" oct="4"/></nc></neume></layer></staff>
    </section></score></mdiv></body>
  </music>
</mei>"#;

    #[test]
    fn parses_ids_attributes_and_text() {
        let doc = parse_mei(SMALL).unwrap();
        let root = doc.root();
        assert_eq!(doc.id_of(root), "m-root");
        assert_eq!(doc.node(root).attribute("meiversion"), Some("2013"));
        assert_eq!(
            doc.node(root).attribute("xmlns"),
            Some("http://www.music-encoding.org/ns/mei")
        );

        let surface = doc.lookup("s1").unwrap();
        let graphic = doc.children(surface)[0];
        assert_eq!(doc.node(graphic).attribute("xlink:href"), Some("page.jpg"));

        let title = doc.elements_by_tag("title")[0];
        assert_eq!(doc.node(title).text(), Some("Salve"));

        let notes = doc.elements_by_tag("note");
        assert_eq!(notes.len(), 1);
        assert!(doc.id_of(notes[0]).starts_with("m-"));
    }

    #[test]
    fn rejects_non_mei_root() {
        let err = parse_mei("<score-partwise/>").unwrap_err();
        assert!(matches!(err, EditError::Parse(_)));
    }

    #[test]
    fn rejects_duplicate_ids() {
        let err = parse_mei(r#"<mei><a xml:id="x"/><b xml:id="x"/></mei>"#).unwrap_err();
        assert!(matches!(err, EditError::InvalidState(_)));
    }
}
