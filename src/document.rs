//! Node store — the in-memory MEI tree.
//!
//! Nodes live in a slab and refer to each other by key: each node owns the
//! ordered list of its children's keys and keeps a non-owning `parent` key.
//! Every node also has an immutable string identifier (`xml:id` in the
//! serialized form) indexed for lookup by the editing operations.

use std::collections::HashMap;

use slab::Slab;
use uuid::Uuid;

use crate::error::{EditError, Result};
use crate::model::ElementKind;

/// Handle of a node inside a [`Document`].
pub type NodeId = usize;

/// A generic MEI element.
#[derive(Debug, Clone)]
pub struct Node {
    tag: String,
    kind: ElementKind,
    xml_id: String,
    attrs: Vec<(String, String)>,
    text: Option<String>,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl Node {
    fn new(tag: &str, xml_id: String) -> Self {
        Self {
            tag: tag.to_string(),
            kind: ElementKind::classify(tag, None),
            xml_id,
            attrs: Vec::new(),
            text: None,
            parent: None,
            children: Vec::new(),
        }
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn kind(&self) -> ElementKind {
        self.kind
    }

    /// The node's immutable identifier.
    pub fn id(&self) -> &str {
        &self.xml_id
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    pub fn set_text(&mut self, text: Option<String>) {
        self.text = text;
    }

    /// Attributes in insertion order, excluding the identifier.
    pub fn attributes(&self) -> &[(String, String)] {
        &self.attrs
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Set an attribute, replacing an existing value in place.
    pub fn set_attribute(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        match self.attrs.iter_mut().find(|(k, _)| k == name) {
            Some((_, v)) => *v = value,
            None => self.attrs.push((name.to_string(), value)),
        }
        if name == "form" {
            self.reclassify();
        }
    }

    pub fn remove_attribute(&mut self, name: &str) -> Option<String> {
        let pos = self.attrs.iter().position(|(k, _)| k == name)?;
        let (_, value) = self.attrs.remove(pos);
        if name == "form" {
            self.reclassify();
        }
        Some(value)
    }

    /// Drop every attribute (the identifier is kept).
    pub fn clear_attributes(&mut self) {
        self.attrs.clear();
        self.reclassify();
    }

    fn reclassify(&mut self) {
        self.kind = ElementKind::classify(&self.tag, self.attribute("form"));
    }
}

/// An MEI document held in memory.
#[derive(Debug, Clone)]
pub struct Document {
    nodes: Slab<Node>,
    index: HashMap<String, NodeId>,
    root: NodeId,
}

/// Generate a fresh element identifier.
pub fn generate_id() -> String {
    format!("m-{}", Uuid::new_v4())
}

impl Document {
    /// Create a document holding only a root element.
    pub fn new(root_tag: &str) -> Self {
        let mut doc = Self {
            nodes: Slab::new(),
            index: HashMap::new(),
            root: 0,
        };
        doc.root = doc.create(root_tag);
        doc
    }

    /// Create a document whose root element carries a known identifier.
    pub fn with_root_id(root_tag: &str, xml_id: &str) -> Self {
        let mut doc = Self {
            nodes: Slab::new(),
            index: HashMap::new(),
            root: 0,
        };
        doc.root = doc.insert_node(Node::new(root_tag, xml_id.to_string()));
        doc
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Number of live nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    // ─── Creation and lookup ─────────────────────────────────────────

    /// Create a detached node with a fresh identifier.
    pub fn create(&mut self, tag: &str) -> NodeId {
        let mut xml_id = generate_id();
        while self.index.contains_key(&xml_id) {
            xml_id = generate_id();
        }
        self.insert_node(Node::new(tag, xml_id))
    }

    /// Create a detached node with a caller-chosen identifier.
    pub fn create_with_id(&mut self, tag: &str, xml_id: &str) -> Result<NodeId> {
        if self.index.contains_key(xml_id) {
            return Err(EditError::InvalidState(format!(
                "duplicate element id '{xml_id}'"
            )));
        }
        Ok(self.insert_node(Node::new(tag, xml_id.to_string())))
    }

    fn insert_node(&mut self, node: Node) -> NodeId {
        let xml_id = node.xml_id.clone();
        let key = self.nodes.insert(node);
        self.index.insert(xml_id, key);
        key
    }

    /// Resolve an identifier to a live node.
    pub fn lookup(&self, xml_id: &str) -> Result<NodeId> {
        self.index
            .get(xml_id)
            .copied()
            .ok_or_else(|| EditError::NotFound(xml_id.to_string()))
    }

    pub fn get(&self, key: NodeId) -> Option<&Node> {
        self.nodes.get(key)
    }

    /// Borrow a node by handle. Handles come from this document, so a
    /// stale one is a programming error.
    pub fn node(&self, key: NodeId) -> &Node {
        &self.nodes[key]
    }

    pub fn node_mut(&mut self, key: NodeId) -> &mut Node {
        &mut self.nodes[key]
    }

    pub fn id_of(&self, key: NodeId) -> &str {
        self.node(key).id()
    }

    pub fn kind(&self, key: NodeId) -> ElementKind {
        self.node(key).kind
    }

    pub fn parent(&self, key: NodeId) -> Option<NodeId> {
        self.node(key).parent
    }

    pub fn children(&self, key: NodeId) -> &[NodeId] {
        &self.node(key).children
    }

    // ─── Structure ───────────────────────────────────────────────────

    /// Append a detached node as the last child of `parent`.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<()> {
        self.check_attachable(parent, child)?;
        self.nodes[parent].children.push(child);
        self.nodes[child].parent = Some(parent);
        Ok(())
    }

    /// Insert a detached node immediately before `reference`, which must be
    /// a child of `parent`.
    pub fn insert_before(
        &mut self,
        parent: NodeId,
        reference: NodeId,
        child: NodeId,
    ) -> Result<()> {
        self.check_attachable(parent, child)?;
        let pos = self.child_position(parent, reference)?;
        self.nodes[parent].children.insert(pos, child);
        self.nodes[child].parent = Some(parent);
        Ok(())
    }

    /// Insert a detached node immediately after `reference`, which must be
    /// a child of `parent`.
    pub fn insert_after(
        &mut self,
        parent: NodeId,
        reference: NodeId,
        child: NodeId,
    ) -> Result<()> {
        self.check_attachable(parent, child)?;
        let pos = self.child_position(parent, reference)?;
        self.nodes[parent].children.insert(pos + 1, child);
        self.nodes[child].parent = Some(parent);
        Ok(())
    }

    /// Detach `child` from `parent`. The child stays alive and indexed.
    pub fn remove_child(&mut self, parent: NodeId, child: NodeId) -> Result<()> {
        let pos = self.child_position(parent, child)?;
        self.nodes[parent].children.remove(pos);
        self.nodes[child].parent = None;
        Ok(())
    }

    /// Detach a node from whatever parent it has.
    pub fn detach(&mut self, key: NodeId) -> Result<()> {
        match self.parent(key) {
            Some(parent) => self.remove_child(parent, key),
            None => Ok(()),
        }
    }

    /// Delete a node and its whole subtree, dropping every deleted
    /// identifier from the index.
    pub fn delete(&mut self, key: NodeId) -> Result<()> {
        if key == self.root {
            return Err(EditError::InvalidState(
                "the document root cannot be deleted".to_string(),
            ));
        }
        self.detach(key)?;

        let mut stack = vec![key];
        while let Some(current) = stack.pop() {
            if let Some(node) = self.nodes.try_remove(current) {
                self.index.remove(&node.xml_id);
                stack.extend(node.children);
            }
        }
        Ok(())
    }

    fn child_position(&self, parent: NodeId, child: NodeId) -> Result<usize> {
        self.children(parent)
            .iter()
            .position(|&c| c == child)
            .ok_or_else(|| {
                EditError::InvalidState(format!(
                    "'{}' is not a child of '{}'",
                    self.id_of(child),
                    self.id_of(parent)
                ))
            })
    }

    fn check_attachable(&self, parent: NodeId, child: NodeId) -> Result<()> {
        if self.node(child).parent.is_some() {
            return Err(EditError::InvalidState(format!(
                "'{}' already has a parent",
                self.id_of(child)
            )));
        }
        if child == self.root || self.contains(child, parent) {
            return Err(EditError::InvalidState(format!(
                "attaching '{}' under '{}' would create a cycle",
                self.id_of(child),
                self.id_of(parent)
            )));
        }
        Ok(())
    }

    // ─── Queries ─────────────────────────────────────────────────────

    /// Whether `descendant` is `ancestor` or lies inside its subtree.
    pub fn contains(&self, ancestor: NodeId, descendant: NodeId) -> bool {
        let mut current = Some(descendant);
        while let Some(key) = current {
            if key == ancestor {
                return true;
            }
            current = self.parent(key);
        }
        false
    }

    pub fn children_by_tag(&self, parent: NodeId, tag: &str) -> Vec<NodeId> {
        self.children(parent)
            .iter()
            .copied()
            .filter(|&c| self.node(c).tag == tag)
            .collect()
    }

    pub fn children_by_kind(&self, parent: NodeId, kind: ElementKind) -> Vec<NodeId> {
        self.children(parent)
            .iter()
            .copied()
            .filter(|&c| self.node(c).kind == kind)
            .collect()
    }

    /// Descendants of `key` (excluding itself) with the given tag, in
    /// document order.
    pub fn descendants_by_tag(&self, key: NodeId, tag: &str) -> Vec<NodeId> {
        self.descendants(key)
            .into_iter()
            .filter(|&d| self.node(d).tag == tag)
            .collect()
    }

    /// Every element in the document with the given tag, in document order.
    pub fn elements_by_tag(&self, tag: &str) -> Vec<NodeId> {
        let mut found = self.descendants_by_tag(self.root, tag);
        if self.node(self.root).tag == tag {
            found.insert(0, self.root);
        }
        found
    }

    pub fn elements_by_kind(&self, kind: ElementKind) -> Vec<NodeId> {
        let mut all = vec![self.root];
        all.extend(self.descendants(self.root));
        all.into_iter().filter(|&k| self.node(k).kind == kind).collect()
    }

    /// The node's parent's children, the node itself included.
    pub fn siblings(&self, key: NodeId) -> Vec<NodeId> {
        match self.parent(key) {
            Some(parent) => self.children(parent).to_vec(),
            None => vec![key],
        }
    }

    /// Pre-order traversal of the subtree below `key`.
    pub fn descendants(&self, key: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(key).iter().rev().copied().collect();
        while let Some(current) = stack.pop() {
            out.push(current);
            stack.extend(self.children(current).iter().rev().copied());
        }
        out
    }

    /// Nearest ancestor (not counting `key` itself) of the given kind.
    pub fn ancestor_of_kind(&self, key: NodeId, kind: ElementKind) -> Option<NodeId> {
        let mut current = self.parent(key);
        while let Some(k) = current {
            if self.node(k).kind == kind {
                return Some(k);
            }
            current = self.parent(k);
        }
        None
    }

    /// All live identifiers paired with their handles.
    pub fn ids(&self) -> impl Iterator<Item = (&str, NodeId)> {
        self.index.iter().map(|(id, &key)| (id.as_str(), key))
    }

    /// Handles of every node currently stored, attached or not.
    pub(crate) fn keys(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes.iter().map(|(key, _)| key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layer_with(doc: &mut Document, n: usize) -> (NodeId, Vec<NodeId>) {
        let layer = doc.create("layer");
        doc.append_child(doc.root(), layer).unwrap();
        let kids: Vec<NodeId> = (0..n)
            .map(|_| {
                let k = doc.create("neume");
                doc.append_child(layer, k).unwrap();
                k
            })
            .collect();
        (layer, kids)
    }

    #[test]
    fn create_indexes_fresh_ids() {
        let mut doc = Document::new("mei");
        let a = doc.create("neume");
        let b = doc.create("neume");
        assert_ne!(doc.id_of(a), doc.id_of(b));
        assert!(doc.id_of(a).starts_with("m-"));
        assert_eq!(doc.lookup(doc.id_of(a)).unwrap(), a);
    }

    #[test]
    fn insert_before_preserves_order() {
        let mut doc = Document::new("mei");
        let (layer, kids) = layer_with(&mut doc, 3);
        let new = doc.create("clef");
        doc.insert_before(layer, kids[1], new).unwrap();
        assert_eq!(doc.children(layer), &[kids[0], new, kids[1], kids[2]]);
        assert_eq!(doc.parent(new), Some(layer));
    }

    #[test]
    fn remove_child_rejects_non_child() {
        let mut doc = Document::new("mei");
        let (layer, _) = layer_with(&mut doc, 1);
        let stray = doc.create("neume");
        let err = doc.remove_child(layer, stray).unwrap_err();
        assert!(matches!(err, EditError::InvalidState(_)));
    }

    #[test]
    fn delete_removes_subtree_from_index() {
        let mut doc = Document::new("mei");
        let (layer, kids) = layer_with(&mut doc, 2);
        let nc = doc.create("nc");
        doc.append_child(kids[0], nc).unwrap();
        let nc_id = doc.id_of(nc).to_string();
        let neume_id = doc.id_of(kids[0]).to_string();

        doc.delete(kids[0]).unwrap();
        assert!(matches!(doc.lookup(&neume_id), Err(EditError::NotFound(_))));
        assert!(matches!(doc.lookup(&nc_id), Err(EditError::NotFound(_))));
        assert_eq!(doc.children(layer), &[kids[1]]);
    }

    #[test]
    fn attaching_an_ancestor_is_rejected() {
        let mut doc = Document::new("mei");
        let (layer, kids) = layer_with(&mut doc, 1);
        doc.detach(layer).unwrap();
        let err = doc.append_child(kids[0], layer).unwrap_err();
        assert!(matches!(err, EditError::InvalidState(_)));
    }

    #[test]
    fn descendants_are_in_document_order() {
        let mut doc = Document::new("mei");
        let (_, kids) = layer_with(&mut doc, 2);
        let n1 = doc.create("note");
        let n2 = doc.create("note");
        doc.append_child(kids[0], n1).unwrap();
        doc.append_child(kids[1], n2).unwrap();
        assert_eq!(doc.elements_by_tag("note"), vec![n1, n2]);
        assert_eq!(doc.siblings(kids[1]), kids);
    }

    #[test]
    fn form_attribute_reclassifies_divisions() {
        let mut doc = Document::new("mei");
        let d = doc.create("division");
        assert!(!doc.kind(d).is_final_division());
        doc.node_mut(d).set_attribute("form", "final");
        assert!(doc.kind(d).is_final_division());
        doc.node_mut(d).remove_attribute("form");
        assert!(!doc.kind(d).is_final_division());
    }
}
