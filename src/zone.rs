//! Zone manager — bounding boxes linking elements to the facsimile.
//!
//! An element references at most one `zone` through its `facs` attribute.
//! Zones live under the first `surface` of the document.

use crate::document::{Document, NodeId};
use crate::error::{EditError, Result};
use crate::model::{BoundingBox, ElementKind};

/// Attribute holding the referenced zone's identifier.
pub const FACS: &str = "facs";

/// The surface container new zones are appended to.
pub fn surface(doc: &Document) -> Result<NodeId> {
    doc.elements_by_kind(ElementKind::Surface)
        .first()
        .copied()
        .ok_or_else(|| {
            EditError::InvalidState("document has no facsimile surface".to_string())
        })
}

/// The zone referenced by `key`, if its `facs` attribute resolves to one.
pub fn zone_of(doc: &Document, key: NodeId) -> Option<NodeId> {
    let facs = doc.node(key).attribute(FACS)?;
    let zone = doc.lookup(facs.trim_start_matches('#')).ok()?;
    (doc.kind(zone) == ElementKind::Zone).then_some(zone)
}

/// Whether attaching a box to `key` needs a new zone (and so a surface).
pub fn needs_surface(doc: &Document, key: NodeId) -> bool {
    zone_of(doc, key).is_none()
}

/// Update the zone of `key` in place, or create one under the surface and
/// point `facs` at it as a `#id` reference. Returns the zone's handle.
pub fn attach_or_update(doc: &mut Document, key: NodeId, bbox: &BoundingBox) -> Result<NodeId> {
    let zone = match zone_of(doc, key) {
        Some(zone) => zone,
        None => {
            if let Some(stale) = doc.node(key).attribute(FACS) {
                log::warn!(
                    "'{}' references missing zone '{stale}', creating a new one",
                    doc.id_of(key)
                );
            }
            let surface = surface(doc)?;
            let zone = doc.create("zone");
            doc.append_child(surface, zone)?;
            let reference = format!("#{}", doc.id_of(zone));
            doc.node_mut(key).set_attribute(FACS, reference);
            zone
        }
    };

    let element = doc.node_mut(zone);
    for (edge, value) in bbox.edges() {
        element.set_attribute(edge, value.to_string());
    }
    Ok(zone)
}

/// Remove the zone of `key` and clear the reference. No-op when there is
/// none.
pub fn detach(doc: &mut Document, key: NodeId) -> Result<()> {
    if let Some(zone) = zone_of(doc, key) {
        doc.delete(zone)?;
    }
    doc.node_mut(key).remove_attribute(FACS);
    Ok(())
}

/// Detach the zones of `key` and of every node below it.
pub fn detach_subtree(doc: &mut Document, key: NodeId) -> Result<()> {
    detach(doc, key)?;
    for d in doc.descendants(key) {
        detach(doc, d)?;
    }
    Ok(())
}

/// Read a zone's four edges back.
pub fn bounding_box(doc: &Document, zone: NodeId) -> Option<BoundingBox> {
    let node = doc.node(zone);
    let edge = |name: &str| node.attribute(name)?.trim().parse::<f64>().ok();
    Some(BoundingBox::new(
        edge("ulx")?,
        edge("uly")?,
        edge("lrx")?,
        edge("lry")?,
    ))
}
