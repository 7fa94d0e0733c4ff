//! Neume grouping: merging neumes into one (neumify) and splitting a
//! neume into puncta (ungroup).

use super::Editor;
use crate::document::NodeId;
use crate::error::{EditError, Result};
use crate::model::{BoundingBox, ElementKind, HeadShape, NeumeType};
use crate::zone;

fn is_neume(kind: ElementKind) -> bool {
    kind == ElementKind::Neume
}

impl Editor {
    /// Merge the given neumes into one neume of type `type_id`.
    ///
    /// The notes of the referenced neumes are regrouped in order into note
    /// components, opening a new component whenever the head shape changes.
    /// `head_shapes` gives one shape per note. The new neume takes the
    /// place of the first referenced one. Returns its ID.
    pub fn neumify<S: AsRef<str>>(
        &mut self,
        ids: &[S],
        type_id: &str,
        head_shapes: &[HeadShape],
        bbox: &BoundingBox,
    ) -> Result<String> {
        let neume_type: NeumeType = type_id.parse()?;
        let sources = self.resolve_batch_as(ids, is_neume, "neume")?;
        let Some(&first) = sources.first() else {
            return Err(EditError::InvalidState("no neumes to group".to_string()));
        };
        let parent = self.doc.parent(first).ok_or_else(|| {
            EditError::InvalidState(format!("neume '{}' has no parent", self.doc.id_of(first)))
        })?;

        let notes: Vec<NodeId> = sources.iter().flat_map(|&n| self.notes_of(n)).collect();
        if head_shapes.len() < notes.len() {
            return Err(EditError::InvalidState(format!(
                "{} notes to group but only {} head shapes",
                notes.len(),
                head_shapes.len()
            )));
        }
        self.check_zone(None)?;

        let neume = self.doc.create("neume");
        let node = self.doc.node_mut(neume);
        node.set_attribute("name", neume_type.name.as_str());
        if let Some(variant) = &neume_type.variant {
            node.set_attribute("variant", variant.as_str());
        }

        let mut open: Option<(HeadShape, NodeId)> = None;
        for (&note, &head) in notes.iter().zip(head_shapes) {
            let nc = match open {
                Some((shape, nc)) if shape == head => nc,
                _ => {
                    let nc = self.doc.create("nc");
                    self.set_nc_classifier(nc, head);
                    self.doc.append_child(neume, nc)?;
                    open = Some((head, nc));
                    nc
                }
            };
            self.doc.detach(note)?;
            self.doc.append_child(nc, note)?;
        }

        self.doc.insert_before(parent, first, neume)?;
        for source in sources {
            self.remove_element(source)?;
        }
        zone::attach_or_update(&mut self.doc, neume, bbox)?;

        let id = self.doc.id_of(neume).to_string();
        log::debug!("neumified {} notes into {} '{id}'", notes.len(), neume_type.name);
        Ok(id)
    }

    /// Split each referenced neume into one punctum per note, each with
    /// its own box from `boxes` (one list per ID, one box per note).
    ///
    /// Returns the new IDs per input ID, in input order. IDs skipped under
    /// the skip policy get an empty list.
    pub fn ungroup<S: AsRef<str>>(
        &mut self,
        ids: &[S],
        boxes: &[Vec<BoundingBox>],
    ) -> Result<Vec<Vec<String>>> {
        if ids.len() != boxes.len() {
            return Err(EditError::InvalidState(format!(
                "{} neumes to ungroup but {} box lists",
                ids.len(),
                boxes.len()
            )));
        }

        let slots = self.resolve_batch(ids)?;
        let mut work = Vec::with_capacity(slots.len());
        for (slot, bboxes) in slots.into_iter().zip(boxes) {
            let Some(neume) = slot else {
                work.push(None);
                continue;
            };
            self.expect_kind(neume, is_neume, "neume")?;
            if self.doc.parent(neume).is_none() {
                return Err(EditError::InvalidState(format!(
                    "neume '{}' has no parent",
                    self.doc.id_of(neume)
                )));
            }
            let notes = self.notes_of(neume);
            if notes.len() != bboxes.len() {
                return Err(EditError::InvalidState(format!(
                    "neume '{}' has {} notes but {} boxes were given",
                    self.doc.id_of(neume),
                    notes.len(),
                    bboxes.len()
                )));
            }
            work.push(Some((neume, notes, bboxes)));
        }
        if work.iter().flatten().any(|(_, notes, _)| !notes.is_empty()) {
            self.check_zone(None)?;
        }

        let mut new_ids = Vec::with_capacity(work.len());
        for item in work {
            let Some((neume, notes, bboxes)) = item else {
                new_ids.push(Vec::new());
                continue;
            };
            let mut nids = Vec::with_capacity(notes.len());
            for (note, bbox) in notes.into_iter().zip(bboxes) {
                let (punctum, _) = self.new_punctum(Some(note))?;
                let parent = self.doc.parent(neume).ok_or_else(|| {
                    EditError::InvalidState(format!("neume '{}' has no parent", self.doc.id_of(neume)))
                })?;
                self.doc.insert_before(parent, neume, punctum)?;
                zone::attach_or_update(&mut self.doc, punctum, bbox)?;
                nids.push(self.doc.id_of(punctum).to_string());
            }
            self.remove_element(neume)?;
            new_ids.push(nids);
        }
        Ok(new_ids)
    }
}
