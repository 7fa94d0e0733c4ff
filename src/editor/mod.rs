//! Editing operations on an in-memory MEI document.
//!
//! Every public operation resolves and validates all the IDs it is given
//! before it changes anything, so a failed call leaves the document as it
//! was. Operations are applied one at a time by a single owner; callers
//! that receive concurrent requests must serialize them.

mod clef;
mod custos;
mod division;
mod grouping;
mod neume;
mod system;

use std::collections::HashSet;

use crate::document::{Document, NodeId};
use crate::error::{EditError, Result};
use crate::model::{ElementKind, Pitch, PitchUpdate};
use crate::options::{EditOptions, MissingIdPolicy};
use crate::zone;

/// Where a new or moved element goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Target {
    /// Immediately before this element, in its current parent.
    Before(NodeId),
    /// At the end of the last layer of the document.
    End,
}

/// Applies structural edits to a document it owns.
#[derive(Debug)]
pub struct Editor {
    doc: Document,
    options: EditOptions,
}

impl Editor {
    pub fn new(doc: Document) -> Self {
        Self::with_options(doc, EditOptions::default())
    }

    pub fn with_options(doc: Document, options: EditOptions) -> Self {
        Self { doc, options }
    }

    pub fn document(&self) -> &Document {
        &self.doc
    }

    pub fn options(&self) -> &EditOptions {
        &self.options
    }

    /// Give the document back, e.g. to persist it.
    pub fn into_document(self) -> Document {
        self.doc
    }

    // ─── Resolution ──────────────────────────────────────────────────

    fn resolve(&self, id: &str) -> Result<NodeId> {
        self.doc.lookup(id)
    }

    /// Resolve `id` and check it names an element of the expected kind.
    fn resolve_as(&self, id: &str, accept: fn(ElementKind) -> bool, what: &str) -> Result<NodeId> {
        let key = self.resolve(id)?;
        self.expect_kind(key, accept, what)?;
        Ok(key)
    }

    fn expect_kind(&self, key: NodeId, accept: fn(ElementKind) -> bool, what: &str) -> Result<()> {
        if accept(self.doc.kind(key)) {
            Ok(())
        } else {
            Err(EditError::InvalidState(format!(
                "'{}' is a <{}>, expected a {what}",
                self.doc.id_of(key),
                self.doc.node(key).tag()
            )))
        }
    }

    /// Resolve IDs one for one under the configured missing-ID policy.
    /// Slots are `None` for IDs skipped under [`MissingIdPolicy::Skip`].
    fn resolve_rows<S: AsRef<str>>(&self, ids: &[S]) -> Result<Vec<Option<NodeId>>> {
        let mut resolved = Vec::with_capacity(ids.len());
        for id in ids {
            let id = id.as_ref();
            match self.doc.lookup(id) {
                Ok(key) => resolved.push(Some(key)),
                Err(e) => match self.options.missing_ids {
                    MissingIdPolicy::Abort => return Err(e),
                    MissingIdPolicy::Skip => {
                        log::warn!("skipping unresolved id '{id}'");
                        resolved.push(None);
                    }
                },
            }
        }
        Ok(resolved)
    }

    /// Like [`Editor::resolve_rows`], but repeated IDs resolve only once.
    fn resolve_batch<S: AsRef<str>>(&self, ids: &[S]) -> Result<Vec<Option<NodeId>>> {
        let mut seen = HashSet::new();
        Ok(self
            .resolve_rows(ids)?
            .into_iter()
            .map(|slot| slot.filter(|&key| seen.insert(key)))
            .collect())
    }

    /// Resolve a batch and check every resolved element's kind.
    fn resolve_batch_as<S: AsRef<str>>(
        &self,
        ids: &[S],
        accept: fn(ElementKind) -> bool,
        what: &str,
    ) -> Result<Vec<NodeId>> {
        let keys: Vec<NodeId> = self.resolve_batch(ids)?.into_iter().flatten().collect();
        for &key in &keys {
            self.expect_kind(key, accept, what)?;
        }
        Ok(keys)
    }

    // ─── Placement ───────────────────────────────────────────────────

    /// Validate where an element goes: before `before`, or at the end of
    /// the last layer when no reference is given.
    fn target(&self, before: Option<&str>) -> Result<Target> {
        self.target_for(before, None)
    }

    /// Like [`Editor::target`], for relocating `moving`: the reference may
    /// not be the moving element or lie inside it.
    fn move_target(&self, moving: NodeId, before: Option<&str>) -> Result<Target> {
        let target = self.target_for(before, Some(moving))?;
        if let Target::Before(reference) = target {
            if self.doc.contains(moving, reference) {
                return Err(EditError::InvalidState(format!(
                    "cannot move '{}' before itself or its own content",
                    self.doc.id_of(moving)
                )));
            }
        }
        Ok(target)
    }

    fn target_for(&self, before: Option<&str>, moving: Option<NodeId>) -> Result<Target> {
        let target = match before {
            Some(id) => {
                let reference = self.resolve(id)?;
                if self.doc.parent(reference).is_none() {
                    return Err(EditError::InvalidState(format!(
                        "'{id}' has no parent to insert into"
                    )));
                }
                if moving == Some(reference) {
                    return Err(EditError::InvalidState(format!(
                        "cannot move '{id}' before itself"
                    )));
                }
                Target::Before(reference)
            }
            None => {
                self.last_layer()?;
                Target::End
            }
        };
        Ok(self.ahead_of_final(target, moving))
    }

    /// A final division stays the last content of its layer: a target
    /// at or past one is pulled in front of it.
    fn ahead_of_final(&self, target: Target, moving: Option<NodeId>) -> Target {
        let (layer, limit) = match target {
            Target::Before(reference) => match self.doc.parent(reference) {
                Some(parent) if self.doc.kind(parent) == ElementKind::Layer => {
                    (parent, Some(reference))
                }
                _ => return target,
            },
            Target::End => match self.last_layer() {
                Ok(layer) => (layer, None),
                Err(_) => return target,
            },
        };
        self.doc
            .children(layer)
            .iter()
            .copied()
            .take_while(|&c| Some(c) != limit)
            .find(|&c| Some(c) != moving && self.doc.kind(c).is_final_division())
            .map_or(target, Target::Before)
    }

    fn last_layer(&self) -> Result<NodeId> {
        self.doc
            .elements_by_kind(ElementKind::Layer)
            .last()
            .copied()
            .ok_or_else(|| EditError::InvalidState("document has no layer".to_string()))
    }

    /// Attach a detached element at `target`, resolving the parent now.
    fn place(&mut self, key: NodeId, target: Target) -> Result<()> {
        match target {
            Target::Before(reference) => {
                let parent = self.doc.parent(reference).ok_or_else(|| {
                    EditError::InvalidState(format!(
                        "'{}' has no parent to insert into",
                        self.doc.id_of(reference)
                    ))
                })?;
                self.doc.insert_before(parent, reference, key)
            }
            Target::End => {
                let layer = self.last_layer()?;
                self.doc.append_child(layer, key)
            }
        }
    }

    /// Fail early when attaching a box to `key` would need a surface the
    /// document does not have.
    fn check_zone(&self, key: Option<NodeId>) -> Result<()> {
        let needs = key.map_or(true, |k| zone::needs_surface(&self.doc, k));
        if needs {
            zone::surface(&self.doc)?;
        }
        Ok(())
    }

    /// Detach every zone in the subtree, then delete it.
    fn remove_element(&mut self, key: NodeId) -> Result<()> {
        zone::detach_subtree(&mut self.doc, key)?;
        self.doc.delete(key)
    }

    fn notes_of(&self, key: NodeId) -> Vec<NodeId> {
        self.doc
            .descendants(key)
            .into_iter()
            .filter(|&d| self.doc.kind(d) == ElementKind::Note)
            .collect()
    }

    fn set_pitch(&mut self, key: NodeId, pitch: &Pitch) {
        let node = self.doc.node_mut(key);
        node.set_attribute("pname", pitch.pname.as_str());
        node.set_attribute("oct", pitch.oct.to_string());
    }

    // ─── Pitch tables ────────────────────────────────────────────────

    /// Apply a client-computed pitch table verbatim. Entries may name a
    /// custos, a neume (pitches zipped onto its notes) or a single note.
    pub fn update_pitched_elements(&mut self, table: &[PitchUpdate]) -> Result<()> {
        let plan = self.plan_pitch_updates(table)?;
        self.apply_pitch_updates(&plan);
        Ok(())
    }

    fn plan_pitch_updates<'t>(
        &self,
        table: &'t [PitchUpdate],
    ) -> Result<Vec<(NodeId, &'t [Pitch])>> {
        let ids: Vec<&str> = table.iter().map(|u| u.id.as_str()).collect();
        let mut plan = Vec::with_capacity(table.len());
        for (slot, update) in self.resolve_rows(&ids)?.into_iter().zip(table) {
            let Some(key) = slot else { continue };
            self.expect_kind(
                key,
                |k| matches!(k, ElementKind::Custos | ElementKind::Neume | ElementKind::Note),
                "pitched element",
            )?;
            let pitches = update.note_info.pitches();
            if pitches.is_empty() {
                return Err(EditError::InvalidState(format!(
                    "no pitch given for '{}'",
                    update.id
                )));
            }
            plan.push((key, pitches));
        }
        Ok(plan)
    }

    fn apply_pitch_updates(&mut self, plan: &[(NodeId, &[Pitch])]) {
        for &(key, pitches) in plan {
            match self.doc.kind(key) {
                ElementKind::Neume => {
                    let notes = self.notes_of(key);
                    if notes.len() != pitches.len() {
                        log::debug!(
                            "'{}' has {} notes, pitch table gives {}",
                            self.doc.id_of(key),
                            notes.len(),
                            pitches.len()
                        );
                    }
                    for (note, pitch) in notes.into_iter().zip(pitches) {
                        self.set_pitch(note, pitch);
                    }
                }
                _ => self.set_pitch(key, &pitches[0]),
            }
        }
    }
}
