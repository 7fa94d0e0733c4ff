//! Clef operations.
//!
//! Changing a clef changes the pitch of what follows it on the staff. The
//! client works out the new pitches; these operations apply the table they
//! are given after the clef itself has been changed.

use super::Editor;
use crate::error::Result;
use crate::model::{BoundingBox, ClefDeletion, ClefShape, ElementKind, PitchUpdate};
use crate::zone;

fn is_clef(kind: ElementKind) -> bool {
    kind == ElementKind::Clef
}

impl Editor {
    /// Insert a clef on `line` and apply the resulting pitch table.
    /// Returns the new clef's ID.
    pub fn insert_clef(
        &mut self,
        before: Option<&str>,
        shape: ClefShape,
        line: u32,
        pitch_table: &[PitchUpdate],
        bbox: &BoundingBox,
    ) -> Result<String> {
        let target = self.target(before)?;
        let plan = self.plan_pitch_updates(pitch_table)?;
        self.check_zone(None)?;

        let clef = self.doc.create("clef");
        let node = self.doc.node_mut(clef);
        node.set_attribute("shape", shape.as_str());
        node.set_attribute("line", line.to_string());
        self.place(clef, target)?;
        zone::attach_or_update(&mut self.doc, clef, bbox)?;
        self.apply_pitch_updates(&plan);

        let id = self.doc.id_of(clef).to_string();
        log::debug!("inserted {shape} clef '{id}' on line {line}");
        Ok(id)
    }

    /// Move a clef to another staff line. The clef keeps its place in the
    /// layer.
    pub fn move_clef(
        &mut self,
        id: &str,
        line: u32,
        pitch_table: &[PitchUpdate],
        bbox: &BoundingBox,
    ) -> Result<()> {
        let clef = self.resolve_as(id, is_clef, "clef")?;
        let plan = self.plan_pitch_updates(pitch_table)?;
        self.check_zone(Some(clef))?;

        self.doc.node_mut(clef).set_attribute("line", line.to_string());
        zone::attach_or_update(&mut self.doc, clef, bbox)?;
        self.apply_pitch_updates(&plan);
        Ok(())
    }

    /// Switch a clef between doh and fah. The glyphs differ, so the box
    /// changes too.
    pub fn update_clef_shape(
        &mut self,
        id: &str,
        shape: ClefShape,
        pitch_table: &[PitchUpdate],
        bbox: &BoundingBox,
    ) -> Result<()> {
        let clef = self.resolve_as(id, is_clef, "clef")?;
        let plan = self.plan_pitch_updates(pitch_table)?;
        self.check_zone(Some(clef))?;

        self.doc.node_mut(clef).set_attribute("shape", shape.as_str());
        zone::attach_or_update(&mut self.doc, clef, bbox)?;
        self.apply_pitch_updates(&plan);
        Ok(())
    }

    /// Delete clefs, applying each one's pitch table once it is gone.
    pub fn delete_clef(&mut self, entries: &[ClefDeletion]) -> Result<()> {
        let ids: Vec<&str> = entries.iter().map(|e| e.id.as_str()).collect();
        let slots = self.resolve_batch(&ids)?;

        let mut work = Vec::new();
        for (slot, entry) in slots.into_iter().zip(entries) {
            let Some(clef) = slot else { continue };
            self.expect_kind(clef, is_clef, "clef")?;
            let plan = match &entry.pitch_info {
                Some(table) => self.plan_pitch_updates(table)?,
                None => Vec::new(),
            };
            work.push((clef, plan));
        }

        for (clef, plan) in work {
            self.remove_element(clef)?;
            self.apply_pitch_updates(&plan);
        }
        Ok(())
    }
}
