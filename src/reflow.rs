//! Staff/layer reflow driven by final divisions.
//!
//! A final division closes its staff: everything after it lives in a new
//! staff inserted right after the current one. Staves are numbered 1..N
//! within their section and the staff definitions of the first `staffGrp`
//! mirror them one to one.
//!
//! Callers validate the [`StaffContext`] before mutating anything; once a
//! context is valid every step below only touches handles it vouches for.

use crate::document::{Document, NodeId};
use crate::error::{EditError, Result};
use crate::model::ElementKind;
use crate::zone;

/// A layer together with the staff holding it and the staff's container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StaffContext {
    pub layer: NodeId,
    pub staff: NodeId,
    pub section: NodeId,
}

/// Resolve the staff context of `layer`.
pub fn staff_context(doc: &Document, layer: NodeId) -> Result<StaffContext> {
    if doc.kind(layer) != ElementKind::Layer {
        return Err(EditError::InvalidState(format!(
            "'{}' is a <{}>, not a layer",
            doc.id_of(layer),
            doc.node(layer).tag()
        )));
    }
    let staff = doc
        .parent(layer)
        .filter(|&s| doc.kind(s) == ElementKind::Staff)
        .ok_or_else(|| {
            EditError::InvalidState(format!("layer '{}' is not inside a staff", doc.id_of(layer)))
        })?;
    let section = doc.parent(staff).ok_or_else(|| {
        EditError::InvalidState(format!("staff '{}' has no container", doc.id_of(staff)))
    })?;
    Ok(StaffContext {
        layer,
        staff,
        section,
    })
}

/// Staves of the context's section, in document order.
pub fn staves(doc: &Document, ctx: &StaffContext) -> Vec<NodeId> {
    doc.children_by_kind(ctx.section, ElementKind::Staff)
}

/// The first staff group and its staff definitions.
pub fn staff_defs(doc: &Document) -> Option<(NodeId, Vec<NodeId>)> {
    let group = *doc.elements_by_kind(ElementKind::StaffGroup).first()?;
    Some((group, doc.children_by_kind(group, ElementKind::StaffDef)))
}

fn staff_index(doc: &Document, ctx: &StaffContext) -> Result<(Vec<NodeId>, usize)> {
    let staves = staves(doc, ctx);
    let index = staves.iter().position(|&s| s == ctx.staff).ok_or_else(|| {
        EditError::InvalidState(format!(
            "staff '{}' is not a child of its section",
            doc.id_of(ctx.staff)
        ))
    })?;
    Ok((staves, index))
}

fn warn_out_of_step(staves: usize, defs: usize) {
    let violation = EditError::InvariantViolation(format!(
        "{staves} staves but {defs} staff definitions"
    ));
    log::warn!("{violation}; staff definitions left untouched");
}

// ─── Split ───────────────────────────────────────────────────────────

/// Move `at` and every later sibling in the context's layer into a new
/// staff placed right after the current one. Returns the new staff.
pub fn split_staff(
    doc: &mut Document,
    ctx: &StaffContext,
    at: NodeId,
) -> Result<NodeId> {
    let split_pos = doc
        .children(ctx.layer)
        .iter()
        .position(|&c| c == at)
        .ok_or_else(|| {
            EditError::InvalidState(format!(
                "'{}' is not in layer '{}'",
                doc.id_of(at),
                doc.id_of(ctx.layer)
            ))
        })?;
    let (staves, s_ind) = staff_index(doc, ctx)?;
    let defs = staff_defs(doc);

    // Build the new staff off-tree, then splice it in.
    let new_staff = doc.create("staff");
    let new_layer = doc.create("layer");
    doc.node_mut(new_layer).set_attribute("n", "1");
    doc.append_child(new_staff, new_layer)?;

    let moving: Vec<NodeId> = doc.children(ctx.layer)[split_pos..].to_vec();
    for element in moving {
        doc.remove_child(ctx.layer, element)?;
        doc.append_child(new_layer, element)?;
    }
    doc.insert_after(ctx.section, ctx.staff, new_staff)?;

    match defs {
        Some((group, defs)) if defs.len() == staves.len() => {
            // The new definition inherits its neighbour's line count and
            // notation type.
            let new_def = doc.create("staffDef");
            let template: Vec<(String, String)> = doc
                .node(defs[s_ind])
                .attributes()
                .iter()
                .filter(|(k, _)| k != "n" && k != zone::FACS)
                .cloned()
                .collect();
            for (name, value) in template {
                doc.node_mut(new_def).set_attribute(&name, value);
            }
            doc.insert_after(group, defs[s_ind], new_def)?;
        }
        Some((_, defs)) => warn_out_of_step(staves.len(), defs.len()),
        None => {}
    }

    renumber(doc, ctx.section);
    log::debug!(
        "split staff {} at '{}' into new staff '{}'",
        s_ind + 1,
        doc.id_of(at),
        doc.id_of(new_staff)
    );
    Ok(new_staff)
}

// ─── Merge ───────────────────────────────────────────────────────────

/// Pull the content of the staff following the context's staff back into
/// the context's layer and remove that staff (and its staff definition).
/// Returns whether a staff was merged.
pub fn merge_following_staff(doc: &mut Document, ctx: &StaffContext) -> Result<bool> {
    let (staves, s_ind) = staff_index(doc, ctx)?;
    let Some(&next) = staves.get(s_ind + 1) else {
        return Ok(false);
    };
    let Some(&next_layer) = doc.children_by_kind(next, ElementKind::Layer).first() else {
        log::warn!("staff '{}' has no layer to merge", doc.id_of(next));
        return Ok(false);
    };

    match staff_defs(doc) {
        Some((_, defs)) if defs.len() == staves.len() => {
            doc.delete(defs[s_ind + 1])?;
        }
        Some((_, defs)) => warn_out_of_step(staves.len(), defs.len()),
        None => {}
    }

    let moving: Vec<NodeId> = doc.children(next_layer).to_vec();
    for element in moving {
        doc.remove_child(next_layer, element)?;
        doc.append_child(ctx.layer, element)?;
    }
    zone::detach_subtree(doc, next)?;
    doc.delete(next)?;

    renumber(doc, ctx.section);
    log::debug!("merged staff {} into staff {}", s_ind + 2, s_ind + 1);
    Ok(true)
}

// ─── Numbering ───────────────────────────────────────────────────────

/// Number the staves of `section` 1..N, and the staff definitions too
/// when they are in step with the staves.
pub fn renumber(doc: &mut Document, section: NodeId) {
    let staves = doc.children_by_kind(section, ElementKind::Staff);
    for (i, &staff) in staves.iter().enumerate() {
        doc.node_mut(staff).set_attribute("n", (i + 1).to_string());
    }

    if let Some((_, defs)) = staff_defs(doc) {
        if defs.len() == staves.len() {
            for (i, &def) in defs.iter().enumerate() {
                doc.node_mut(def).set_attribute("n", (i + 1).to_string());
            }
        } else {
            warn_out_of_step(staves.len(), defs.len());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixture {
        doc: Document,
        section: NodeId,
        group: NodeId,
        layer: NodeId,
        staff: NodeId,
        content: Vec<NodeId>,
    }

    fn fixture(items: usize) -> Fixture {
        let mut doc = Document::new("mei");
        let root = doc.root();
        let group = doc.create("staffGrp");
        doc.append_child(root, group).unwrap();
        let def = doc.create("staffDef");
        doc.node_mut(def).set_attribute("n", "1");
        doc.node_mut(def).set_attribute("lines", "4");
        doc.append_child(group, def).unwrap();

        let section = doc.create("section");
        doc.append_child(root, section).unwrap();
        let staff = doc.create("staff");
        doc.node_mut(staff).set_attribute("n", "1");
        doc.append_child(section, staff).unwrap();
        let layer = doc.create("layer");
        doc.append_child(staff, layer).unwrap();
        let content = (0..items)
            .map(|_| {
                let n = doc.create("neume");
                doc.append_child(layer, n).unwrap();
                n
            })
            .collect();
        Fixture {
            doc,
            section,
            group,
            layer,
            staff,
            content,
        }
    }

    fn numbers(doc: &Document, keys: &[NodeId]) -> Vec<String> {
        keys.iter()
            .map(|&k| doc.node(k).attribute("n").unwrap_or("").to_string())
            .collect()
    }

    #[test]
    fn split_then_merge_restores_layout() {
        let mut f = fixture(5);
        let ctx = staff_context(&f.doc, f.layer).unwrap();

        let new_staff = split_staff(&mut f.doc, &ctx, f.content[2]).unwrap();
        let staves = f.doc.children_by_kind(f.section, ElementKind::Staff);
        assert_eq!(staves, vec![f.staff, new_staff]);
        assert_eq!(numbers(&f.doc, &staves), vec!["1", "2"]);
        assert_eq!(f.doc.children(f.layer), &f.content[..2]);
        let new_layer = f.doc.children(new_staff)[0];
        assert_eq!(f.doc.children(new_layer), &f.content[2..]);

        let defs = f.doc.children(f.group).to_vec();
        assert_eq!(numbers(&f.doc, &defs), vec!["1", "2"]);
        assert_eq!(f.doc.node(defs[1]).attribute("lines"), Some("4"));

        assert!(merge_following_staff(&mut f.doc, &ctx).unwrap());
        assert_eq!(f.doc.children(f.layer), &f.content[..]);
        assert_eq!(f.doc.children_by_kind(f.section, ElementKind::Staff), vec![f.staff]);
        assert_eq!(f.doc.children(f.group).len(), 1);
    }

    #[test]
    fn merge_without_following_staff_is_noop() {
        let mut f = fixture(2);
        let ctx = staff_context(&f.doc, f.layer).unwrap();
        assert!(!merge_following_staff(&mut f.doc, &ctx).unwrap());
        assert_eq!(f.doc.children(f.layer), &f.content[..]);
    }

    #[test]
    fn out_of_step_defs_are_left_alone() {
        let mut f = fixture(3);
        let extra: Vec<NodeId> = (0..2)
            .map(|_| {
                let def = f.doc.create("staffDef");
                f.doc.append_child(f.group, def).unwrap();
                def
            })
            .collect();
        let ctx = staff_context(&f.doc, f.layer).unwrap();

        split_staff(&mut f.doc, &ctx, f.content[1]).unwrap();
        assert_eq!(f.doc.children(f.group).len(), 3);
        assert_eq!(f.doc.node(extra[0]).attribute("n"), None);
        assert_eq!(f.doc.children_by_kind(f.section, ElementKind::Staff).len(), 2);
    }

    #[test]
    fn context_requires_layer_in_staff() {
        let f = fixture(1);
        let err = staff_context(&f.doc, f.content[0]).unwrap_err();
        assert!(matches!(err, EditError::InvalidState(_)));
    }
}
