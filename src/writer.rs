//! MEI writer — serializes a [`Document`] back to markup.

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;

use crate::document::{Document, NodeId};
use crate::error::{EditError, Result};

/// Serialize the document to an indented MEI XML string.
pub fn write_mei(doc: &Document) -> Result<String> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
    write_element(&mut writer, doc, doc.root())?;

    let bytes = writer.into_inner();
    String::from_utf8(bytes).map_err(|e| EditError::Parse(format!("Invalid UTF-8 output: {e}")))
}

impl Document {
    /// Serialize back to MEI markup. See [`write_mei`].
    pub fn to_mei_string(&self) -> Result<String> {
        write_mei(self)
    }
}

fn write_element(writer: &mut Writer<Vec<u8>>, doc: &Document, key: NodeId) -> Result<()> {
    let node = doc.node(key);
    let mut start = BytesStart::new(node.tag());

    // Namespace declarations first, then the identifier, then the rest.
    for (name, value) in node.attributes().iter().filter(|(k, _)| is_xmlns(k)) {
        start.push_attribute((name.as_str(), value.as_str()));
    }
    start.push_attribute(("xml:id", node.id()));
    for (name, value) in node.attributes().iter().filter(|(k, _)| !is_xmlns(k)) {
        start.push_attribute((name.as_str(), value.as_str()));
    }

    if node.children().is_empty() && node.text().is_none() {
        writer.write_event(Event::Empty(start))?;
        return Ok(());
    }

    writer.write_event(Event::Start(start))?;
    if let Some(text) = node.text() {
        writer.write_event(Event::Text(BytesText::new(text)))?;
    }
    for &child in node.children() {
        write_element(writer, doc, child)?;
    }
    writer.write_event(Event::End(BytesEnd::new(node.tag())))?;
    Ok(())
}

fn is_xmlns(name: &str) -> bool {
    name == "xmlns" || name.starts_with("xmlns:")
}
