//! System and system-break operations.
//!
//! A system break (`sb`) is ordered by its `n` attribute and points at the
//! system it starts through `systemref`; it is not nested inside it.

use super::{Editor, Target};
use crate::error::{EditError, Result};
use crate::model::{BoundingBox, ElementKind};
use crate::zone;

fn is_system(kind: ElementKind) -> bool {
    kind == ElementKind::System
}

fn is_system_break(kind: ElementKind) -> bool {
    kind == ElementKind::SystemBreak
}

impl Editor {
    /// Append a new system to a page. Returns the system's ID.
    pub fn insert_system(&mut self, page_id: &str, bbox: &BoundingBox) -> Result<String> {
        let page = self.resolve_as(page_id, |k| k == ElementKind::Page, "page")?;
        self.check_zone(None)?;

        let system = self.doc.create("system");
        self.doc.append_child(page, system)?;
        zone::attach_or_update(&mut self.doc, system, bbox)?;

        let id = self.doc.id_of(system).to_string();
        log::debug!("inserted system '{id}' on page '{page_id}'");
        Ok(id)
    }

    pub fn update_system_zone(&mut self, id: &str, bbox: &BoundingBox) -> Result<()> {
        let system = self.resolve_as(id, is_system, "system")?;
        self.check_zone(Some(system))?;
        zone::attach_or_update(&mut self.doc, system, bbox)?;
        Ok(())
    }

    /// Delete systems and their zones. A system still named by a break's
    /// `systemref` is rejected; delete the break first.
    pub fn delete_system<S: AsRef<str>>(&mut self, ids: &[S]) -> Result<()> {
        let systems = self.resolve_batch_as(ids, is_system, "system")?;
        for &system in &systems {
            let id = self.doc.id_of(system);
            let referenced_by = self
                .doc
                .elements_by_kind(ElementKind::SystemBreak)
                .into_iter()
                .find(|&sb| self.doc.node(sb).attribute("systemref") == Some(id));
            if let Some(sb) = referenced_by {
                return Err(EditError::InvalidState(format!(
                    "system '{id}' is still referenced by system break '{}'",
                    self.doc.id_of(sb)
                )));
            }
        }
        for system in systems {
            self.remove_element(system)?;
        }
        Ok(())
    }

    /// Insert a system break for `system_id` with order number `order`,
    /// before the break `next_sb` (or at the end of the last layer).
    /// Returns the new break's ID.
    pub fn insert_system_break(
        &mut self,
        system_id: &str,
        order: u32,
        next_sb: Option<&str>,
    ) -> Result<String> {
        self.resolve_as(system_id, is_system, "system")?;
        let target: Target = self.target(next_sb)?;

        let sb = self.doc.create("sb");
        let node = self.doc.node_mut(sb);
        node.set_attribute("n", order.to_string());
        node.set_attribute("systemref", system_id);
        self.place(sb, target)?;

        let id = self.doc.id_of(sb).to_string();
        log::debug!("inserted system break '{id}' for system '{system_id}'");
        Ok(id)
    }

    /// Change a system break's order number.
    pub fn modify_system_break(&mut self, id: &str, order: u32) -> Result<()> {
        let sb = self.resolve_as(id, is_system_break, "system break")?;
        self.doc.node_mut(sb).set_attribute("n", order.to_string());
        Ok(())
    }

    pub fn delete_system_break<S: AsRef<str>>(&mut self, ids: &[S]) -> Result<()> {
        let breaks = self.resolve_batch_as(ids, is_system_break, "system break")?;
        for sb in breaks {
            self.remove_element(sb)?;
        }
        Ok(())
    }
}
