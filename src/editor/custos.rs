//! Custos operations.

use super::Editor;
use crate::error::Result;
use crate::model::{BoundingBox, ElementKind, Pitch};
use crate::zone;

fn is_custos(kind: ElementKind) -> bool {
    kind == ElementKind::Custos
}

impl Editor {
    /// Insert a custos. Returns the new custos' ID.
    pub fn insert_custos(
        &mut self,
        before: Option<&str>,
        pitch: Option<&Pitch>,
        bbox: &BoundingBox,
    ) -> Result<String> {
        let target = self.target(before)?;
        self.check_zone(None)?;

        let custos = self.doc.create("custos");
        if let Some(pitch) = pitch {
            self.set_pitch(custos, pitch);
        }
        self.place(custos, target)?;
        zone::attach_or_update(&mut self.doc, custos, bbox)?;

        let id = self.doc.id_of(custos).to_string();
        log::debug!("inserted custos '{id}'");
        Ok(id)
    }

    /// Re-pitch a custos and update its box. It keeps its place.
    pub fn move_custos(
        &mut self,
        id: &str,
        pitch: Option<&Pitch>,
        bbox: &BoundingBox,
    ) -> Result<()> {
        let custos = self.resolve_as(id, is_custos, "custos")?;
        self.check_zone(Some(custos))?;

        if let Some(pitch) = pitch {
            self.set_pitch(custos, pitch);
        }
        zone::attach_or_update(&mut self.doc, custos, bbox)?;
        Ok(())
    }

    pub fn delete_custos<S: AsRef<str>>(&mut self, ids: &[S]) -> Result<()> {
        let custodes = self.resolve_batch_as(ids, is_custos, "custos")?;
        for custos in custodes {
            self.remove_element(custos)?;
        }
        Ok(())
    }
}
