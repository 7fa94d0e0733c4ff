//! Document invariant checks.

use std::collections::HashMap;

use crate::document::{Document, NodeId};
use crate::error::{EditError, Result};
use crate::model::ElementKind;
use crate::reflow;
use crate::zone::{self, FACS};

fn violation(msg: String) -> Result<()> {
    Err(EditError::InvariantViolation(msg))
}

impl Document {
    /// Check the structural invariants every edit preserves:
    ///
    /// 1. every indexed ID resolves to a live node attached to the tree;
    /// 2. every `facs` reference resolves to a zone and every zone is
    ///    referenced by exactly one element;
    /// 3. staves are numbered 1..N within their section and the staff
    ///    definitions match them in count and numbering;
    /// 4. a final division is the last content element of its layer.
    pub fn verify(&self) -> Result<()> {
        self.verify_index()?;
        self.verify_zones()?;
        self.verify_staves()?;
        self.verify_final_divisions()
    }

    fn verify_index(&self) -> Result<()> {
        let mut indexed = 0;
        for (id, key) in self.ids() {
            indexed += 1;
            match self.get(key) {
                Some(node) if node.id() == id => {}
                _ => return violation(format!("index entry '{id}' is stale")),
            }
        }
        if indexed != self.len() {
            return violation(format!("{} nodes but {indexed} indexed ids", self.len()));
        }
        for key in self.keys() {
            if !self.contains(self.root(), key) {
                return violation(format!("'{}' is detached from the tree", self.id_of(key)));
            }
        }
        Ok(())
    }

    fn verify_zones(&self) -> Result<()> {
        let mut references: HashMap<NodeId, usize> = HashMap::new();
        for key in self.keys() {
            let Some(facs) = self.node(key).attribute(FACS) else {
                continue;
            };
            match zone::zone_of(self, key) {
                Some(z) => *references.entry(z).or_default() += 1,
                None => {
                    return violation(format!(
                        "'{}' references missing zone '{facs}'",
                        self.id_of(key)
                    ))
                }
            }
        }
        for z in self.elements_by_kind(ElementKind::Zone) {
            match references.get(&z).copied().unwrap_or(0) {
                1 => {}
                0 => return violation(format!("zone '{}' is orphaned", self.id_of(z))),
                n => return violation(format!("zone '{}' is shared by {n} elements", self.id_of(z))),
            }
        }
        Ok(())
    }

    fn verify_staves(&self) -> Result<()> {
        let mut sections: Vec<NodeId> = Vec::new();
        for staff in self.elements_by_kind(ElementKind::Staff) {
            if let Some(section) = self.parent(staff) {
                if !sections.contains(&section) {
                    sections.push(section);
                }
            }
        }

        for &section in &sections {
            let staves = self.children_by_kind(section, ElementKind::Staff);
            check_numbering(self, &staves, "staff")?;
        }

        if let (Some((_, defs)), Some(&section)) = (reflow::staff_defs(self), sections.first()) {
            let staves = self.children_by_kind(section, ElementKind::Staff);
            if defs.len() != staves.len() {
                return violation(format!(
                    "{} staves but {} staff definitions",
                    staves.len(),
                    defs.len()
                ));
            }
            check_numbering(self, &defs, "staffDef")?;
        }
        Ok(())
    }

    fn verify_final_divisions(&self) -> Result<()> {
        for layer in self.elements_by_kind(ElementKind::Layer) {
            let content: Vec<NodeId> = self
                .children(layer)
                .iter()
                .copied()
                .filter(|&c| is_content(self.kind(c)))
                .collect();
            if let Some(pos) = content.iter().position(|&c| self.kind(c).is_final_division()) {
                if pos + 1 != content.len() {
                    return violation(format!(
                        "final division '{}' is followed by content in layer '{}'",
                        self.id_of(content[pos]),
                        self.id_of(layer)
                    ));
                }
            }
        }
        Ok(())
    }
}

fn is_content(kind: ElementKind) -> bool {
    matches!(
        kind,
        ElementKind::Neume | ElementKind::Clef | ElementKind::Custos | ElementKind::Division(_)
    )
}

fn check_numbering(doc: &Document, keys: &[NodeId], what: &str) -> Result<()> {
    for (i, &key) in keys.iter().enumerate() {
        let expected = (i + 1).to_string();
        if doc.node(key).attribute("n") != Some(expected.as_str()) {
            return violation(format!(
                "{what} '{}' is numbered {:?}, expected {expected}",
                doc.id_of(key),
                doc.node(key).attribute("n")
            ));
        }
    }
    Ok(())
}
