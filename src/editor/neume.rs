//! Neume and dot operations.

use super::Editor;
use crate::document::NodeId;
use crate::error::{EditError, Result};
use crate::model::{BoundingBox, ElementKind, HeadShape, NeumeShape, Pitch};
use crate::zone;

const NC_CLASSIFIERS: [&str; 3] = ["inclinatum", "deminutus", "quilisma"];

fn is_neume(kind: ElementKind) -> bool {
    kind == ElementKind::Neume
}

impl Editor {
    /// Build a detached `neume name="punctum"` holding one component. When
    /// `note` is given it is moved in; otherwise a new note is created.
    pub(super) fn new_punctum(&mut self, note: Option<NodeId>) -> Result<(NodeId, NodeId)> {
        let punctum = self.doc.create("neume");
        self.doc.node_mut(punctum).set_attribute("name", "punctum");
        let nc = self.doc.create("nc");
        self.doc.append_child(punctum, nc)?;

        let note = match note {
            Some(note) => {
                self.doc.detach(note)?;
                note
            }
            None => self.doc.create("note"),
        };
        self.doc.append_child(nc, note)?;
        Ok((punctum, note))
    }

    /// Reset the head-shape classifier attributes of a note component.
    pub(super) fn set_nc_classifier(&mut self, nc: NodeId, head: HeadShape) {
        let node = self.doc.node_mut(nc);
        for name in NC_CLASSIFIERS {
            node.remove_attribute(name);
        }
        for &(name, value) in head.nc_attributes() {
            node.set_attribute(name, value);
        }
    }

    /// Insert a punctum before `before` (or at the end of the last layer)
    /// and give it a bounding box. Returns the new neume's ID.
    pub fn insert_punctum(
        &mut self,
        before: Option<&str>,
        pitch: Option<&Pitch>,
        dot_form: Option<&str>,
        bbox: &BoundingBox,
    ) -> Result<String> {
        let target = self.target(before)?;
        self.check_zone(None)?;

        let (punctum, note) = self.new_punctum(None)?;
        if let Some(pitch) = pitch {
            self.set_pitch(note, pitch);
        }
        if let Some(form) = dot_form {
            let dot = self.doc.create("dot");
            self.doc.node_mut(dot).set_attribute("form", form);
            self.doc.append_child(note, dot)?;
        }

        self.place(punctum, target)?;
        zone::attach_or_update(&mut self.doc, punctum, bbox)?;

        let id = self.doc.id_of(punctum).to_string();
        log::debug!("inserted punctum '{id}'");
        Ok(id)
    }

    /// Move a neume before `before` (or to the end of the last layer),
    /// optionally re-pitching its notes in order, and update its box.
    pub fn move_neume(
        &mut self,
        id: &str,
        before: Option<&str>,
        pitches: Option<&[Pitch]>,
        bbox: &BoundingBox,
    ) -> Result<()> {
        let neume = self.resolve_as(id, is_neume, "neume")?;
        let target = self.move_target(neume, before)?;
        self.check_zone(Some(neume))?;

        if let Some(pitches) = pitches {
            for (note, pitch) in self.notes_of(neume).into_iter().zip(pitches) {
                self.set_pitch(note, pitch);
            }
        }

        self.doc.detach(neume)?;
        self.place(neume, target)?;
        zone::attach_or_update(&mut self.doc, neume, bbox)?;
        log::debug!("moved neume '{id}'");
        Ok(())
    }

    /// Delete neumes and their bounding boxes.
    pub fn delete_neume<S: AsRef<str>>(&mut self, ids: &[S]) -> Result<()> {
        let neumes = self.resolve_batch_as(ids, is_neume, "neume")?;
        for neume in neumes {
            self.remove_element(neume)?;
        }
        Ok(())
    }

    /// Change the head shape of a neume: renames it and resets the
    /// classifier of its first note component.
    pub fn update_neume_head_shape(
        &mut self,
        id: &str,
        shape: NeumeShape,
        bbox: &BoundingBox,
    ) -> Result<()> {
        let neume = self.resolve_as(id, is_neume, "neume")?;
        let nc = self
            .doc
            .children_by_kind(neume, ElementKind::NoteComponent)
            .first()
            .copied()
            .ok_or_else(|| {
                EditError::InvalidState(format!("neume '{id}' has no note component"))
            })?;
        self.check_zone(Some(neume))?;

        self.set_nc_classifier(nc, shape.head());
        self.doc
            .node_mut(neume)
            .set_attribute("name", shape.neume_name());
        zone::attach_or_update(&mut self.doc, neume, bbox)?;
        Ok(())
    }

    /// The note of a one-note neume.
    fn single_note(&self, id: &str) -> Result<(NodeId, NodeId)> {
        let neume = self.resolve_as(id, is_neume, "neume")?;
        match self.notes_of(neume).as_slice() {
            &[note] => Ok((neume, note)),
            notes => Err(EditError::InvalidState(format!(
                "neume '{id}' has {} notes, dots need exactly one",
                notes.len()
            ))),
        }
    }

    /// Add a dot to the single note of a one-note neume, unless it
    /// already has one.
    pub fn add_dot(&mut self, id: &str, form: &str, bbox: &BoundingBox) -> Result<()> {
        let (neume, note) = self.single_note(id)?;
        self.check_zone(Some(neume))?;

        if self.doc.children_by_kind(note, ElementKind::Dot).is_empty() {
            let dot = self.doc.create("dot");
            self.doc.node_mut(dot).set_attribute("form", form);
            self.doc.append_child(note, dot)?;
        }
        zone::attach_or_update(&mut self.doc, neume, bbox)?;
        Ok(())
    }

    /// Remove the dot of a one-note neume, if it has exactly one.
    pub fn delete_dot(&mut self, id: &str, bbox: &BoundingBox) -> Result<()> {
        let (neume, note) = self.single_note(id)?;
        self.check_zone(Some(neume))?;

        if let &[dot] = self.doc.children_by_kind(note, ElementKind::Dot).as_slice() {
            self.remove_element(dot)?;
        }
        zone::attach_or_update(&mut self.doc, neume, bbox)?;
        Ok(())
    }
}
