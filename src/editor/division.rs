//! Division (phrase marker) operations.
//!
//! Non-final divisions are placed like any other symbol. A final division
//! also closes its staff, so inserting, moving or deleting one reflows the
//! staves around it (see [`crate::reflow`]).

use super::{Editor, Target};
use crate::document::NodeId;
use crate::error::{EditError, Result};
use crate::model::{BoundingBox, ElementKind};
use crate::reflow::{self, StaffContext};
use crate::zone;

fn is_division(kind: ElementKind) -> bool {
    matches!(kind, ElementKind::Division(_))
}

impl Editor {
    /// Staff context of the layer holding `target`'s reference element.
    fn target_context(&self, target: Target) -> Result<Option<StaffContext>> {
        match target {
            Target::Before(reference) => {
                let layer = self.doc.parent(reference).ok_or_else(|| {
                    EditError::InvalidState(format!(
                        "'{}' has no parent",
                        self.doc.id_of(reference)
                    ))
                })?;
                reflow::staff_context(&self.doc, layer).map(Some)
            }
            Target::End => Ok(None),
        }
    }

    /// Staff context of the layer currently holding `key`.
    fn own_context(&self, key: NodeId) -> Result<StaffContext> {
        let layer = self.doc.parent(key).ok_or_else(|| {
            EditError::InvalidState(format!("'{}' has no parent", self.doc.id_of(key)))
        })?;
        reflow::staff_context(&self.doc, layer)
    }

    /// Insert a division of the given form. A final division inserted
    /// before an element splits the staff there. Returns the new ID.
    pub fn insert_division(
        &mut self,
        before: Option<&str>,
        form: &str,
        bbox: &BoundingBox,
    ) -> Result<String> {
        let target = self.target(before)?;
        let is_final = ElementKind::classify("division", Some(form)).is_final_division();
        let split = if is_final {
            self.target_context(target)?
        } else {
            None
        };
        self.check_zone(None)?;

        let division = self.doc.create("division");
        self.doc.node_mut(division).set_attribute("form", form);
        self.place(division, target)?;
        zone::attach_or_update(&mut self.doc, division, bbox)?;

        if let (Some(ctx), Target::Before(at)) = (split, target) {
            reflow::split_staff(&mut self.doc, &ctx, at)?;
        }

        let id = self.doc.id_of(division).to_string();
        log::debug!("inserted {form} division '{id}'");
        Ok(id)
    }

    /// Move a division. A final division first takes back the staff it
    /// closed, then splits again at its destination.
    pub fn move_division(
        &mut self,
        id: &str,
        before: Option<&str>,
        bbox: &BoundingBox,
    ) -> Result<()> {
        let division = self.resolve_as(id, is_division, "division")?;
        let target = self.move_target(division, before)?;
        let is_final = self.doc.kind(division).is_final_division();
        let source = if is_final {
            self.target_context(target)?;
            Some(self.own_context(division)?)
        } else {
            None
        };
        self.check_zone(Some(division))?;

        zone::attach_or_update(&mut self.doc, division, bbox)?;
        if let Some(ctx) = source {
            reflow::merge_following_staff(&mut self.doc, &ctx)?;
        }

        self.doc.detach(division)?;
        self.place(division, target)?;

        if let (true, Target::Before(at)) = (is_final, target) {
            // The reference may have been merged into another layer.
            if let Some(ctx) = self.target_context(target)? {
                reflow::split_staff(&mut self.doc, &ctx, at)?;
            }
        }
        log::debug!("moved division '{id}'");
        Ok(())
    }

    /// Delete divisions. Deleting a final division merges the staff it
    /// closed back into its own.
    pub fn delete_division<S: AsRef<str>>(&mut self, ids: &[S]) -> Result<()> {
        let divisions = self.resolve_batch_as(ids, is_division, "division")?;
        for &division in &divisions {
            if self.doc.kind(division).is_final_division() {
                self.own_context(division)?;
            }
        }

        for division in divisions {
            zone::detach_subtree(&mut self.doc, division)?;
            if self.doc.kind(division).is_final_division() {
                // Earlier deletions may have merged this division's layer.
                let ctx = self.own_context(division)?;
                reflow::merge_following_staff(&mut self.doc, &ctx)?;
            }
            self.doc.delete(division)?;
        }
        Ok(())
    }
}
