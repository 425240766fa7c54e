use generational_arena::{Arena, Index};
use std::fmt;
use tracing::instrument;

/// Handle to a node in a [`DocTree`]. Generational, so handles to removed
/// nodes simply dangle instead of aliasing a reused slot.
pub type NodeId = Index;

/// Element node of a documentation tree.
///
/// Attributes keep their document order. Mixed content is flattened into a
/// single text value per element, which is sufficient for reflection and
/// table-of-contents documents.
#[derive(Debug, Clone)]
pub struct Element {
    /// Element (tag) name
    pub name: String,
    /// Ordered attribute list
    pub attributes: Vec<(String, String)>,
    /// Character content of this element
    pub text: String,
    /// Index of the parent element, None for the document root
    pub parent: Option<NodeId>,
    /// Indices of child elements, in document order
    pub children: Vec<NodeId>,
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}>", self.name)
    }
}

/// Arena-based document tree.
///
/// The arena owns every node; parent back-references are plain indices and
/// never imply ownership. Detaching a node drops its whole subtree from the
/// arena, so stale handles held elsewhere resolve to `None` rather than to
/// recycled nodes.
#[derive(Debug, Default)]
pub struct DocTree {
    arena: Arena<Element>,
    root: Option<NodeId>,
}

impl DocTree {
    pub fn new() -> Self {
        Self {
            arena: Arena::new(),
            root: None,
        }
    }

    /// Inserts a new element under `parent`, or as the document root when
    /// `parent` is None.
    #[instrument(level = "trace", skip(self, name))]
    pub fn insert_node(&mut self, name: impl Into<String>, parent: Option<NodeId>) -> NodeId {
        let node = Element {
            name: name.into(),
            attributes: Vec::new(),
            text: String::new(),
            parent,
            children: Vec::new(),
        };
        let node_idx = self.arena.insert(node);

        if let Some(parent_idx) = parent {
            if let Some(parent) = self.arena.get_mut(parent_idx) {
                parent.children.push(node_idx);
            }
        } else {
            self.root = Some(node_idx);
        }

        node_idx
    }

    pub fn node(&self, idx: NodeId) -> Option<&Element> {
        self.arena.get(idx)
    }

    pub fn node_mut(&mut self, idx: NodeId) -> Option<&mut Element> {
        self.arena.get_mut(idx)
    }

    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    pub fn len(&self) -> usize {
        self.arena.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arena.is_empty()
    }

    /// Value of the named attribute, if present.
    pub fn attribute(&self, idx: NodeId, name: &str) -> Option<&str> {
        self.node(idx)?
            .attributes
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Replaces the value of an existing attribute. Returns false when the
    /// node is gone or carries no such attribute.
    #[instrument(level = "trace", skip(self, value))]
    pub fn set_attribute(&mut self, idx: NodeId, name: &str, value: &str) -> bool {
        if let Some(node) = self.arena.get_mut(idx) {
            if let Some(slot) = node.attributes.iter_mut().find(|(k, _)| k == name) {
                slot.1 = value.to_string();
                return true;
            }
        }
        false
    }

    /// Adds an attribute (or replaces it when already present).
    pub fn push_attribute(&mut self, idx: NodeId, name: &str, value: &str) {
        if self.set_attribute(idx, name, value) {
            return;
        }
        if let Some(node) = self.arena.get_mut(idx) {
            node.attributes.push((name.to_string(), value.to_string()));
        }
    }

    /// Removes the named attribute. Returns false when absent.
    #[instrument(level = "trace", skip(self))]
    pub fn remove_attribute(&mut self, idx: NodeId, name: &str) -> bool {
        if let Some(node) = self.arena.get_mut(idx) {
            if let Some(pos) = node.attributes.iter().position(|(k, _)| k == name) {
                node.attributes.remove(pos);
                return true;
            }
        }
        false
    }

    /// Replaces the element's text content. Returns false for stale handles.
    pub fn set_text(&mut self, idx: NodeId, text: &str) -> bool {
        if let Some(node) = self.arena.get_mut(idx) {
            node.text = text.to_string();
            true
        } else {
            false
        }
    }

    /// Detaches a node from its parent and removes the whole subtree from
    /// the arena. Returns false when the handle is already stale, which makes
    /// repeated deletes of the same target harmless.
    #[instrument(level = "debug", skip(self))]
    pub fn detach(&mut self, idx: NodeId) -> bool {
        let Some(parent) = self.arena.get(idx).map(|n| n.parent) else {
            return false;
        };

        if let Some(parent_idx) = parent {
            if let Some(parent) = self.arena.get_mut(parent_idx) {
                parent.children.retain(|&c| c != idx);
            }
        } else if self.root == Some(idx) {
            self.root = None;
        }

        for node_idx in self.subtree(idx) {
            self.arena.remove(node_idx);
        }
        true
    }

    /// Preorder indices of the subtree rooted at `idx`, inclusive.
    pub fn subtree(&self, idx: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![idx];
        while let Some(current) = stack.pop() {
            if let Some(node) = self.arena.get(current) {
                out.push(current);
                // Reverse push for left-to-right traversal
                for &child in node.children.iter().rev() {
                    stack.push(child);
                }
            }
        }
        out
    }

    /// Preorder iterator over the whole tree.
    pub fn iter(&self) -> TreeIterator {
        TreeIterator::new(self)
    }

    /// XPath string-value of an element: its own text plus the text of all
    /// descendants, in document order.
    pub fn string_value(&self, idx: NodeId) -> String {
        let mut value = String::new();
        for node_idx in self.subtree(idx) {
            if let Some(node) = self.arena.get(node_idx) {
                value.push_str(&node.text);
            }
        }
        value
    }
}

pub struct TreeIterator<'a> {
    tree: &'a DocTree,
    stack: Vec<NodeId>,
}

impl<'a> TreeIterator<'a> {
    fn new(tree: &'a DocTree) -> Self {
        let mut stack = Vec::new();
        if let Some(root) = tree.root() {
            stack.push(root);
        }
        Self { tree, stack }
    }
}

impl<'a> Iterator for TreeIterator<'a> {
    type Item = (NodeId, &'a Element);

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(current_idx) = self.stack.pop() {
            if let Some(node) = self.tree.node(current_idx) {
                for &child in node.children.iter().rev() {
                    self.stack.push(child);
                }
                return Some((current_idx, node));
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_tree() -> (DocTree, NodeId, NodeId, NodeId) {
        let mut tree = DocTree::new();
        let root = tree.insert_node("topics", None);
        let a = tree.insert_node("topic", Some(root));
        let b = tree.insert_node("topic", Some(a));
        tree.push_attribute(a, "id", "N:Alpha");
        tree.push_attribute(b, "id", "T:Alpha.Beta");
        (tree, root, a, b)
    }

    #[test]
    fn detach_removes_whole_subtree() {
        let (mut tree, root, a, b) = sample_tree();

        assert!(tree.detach(a));

        assert!(tree.node(a).is_none());
        assert!(tree.node(b).is_none());
        assert!(tree.node(root).unwrap().children.is_empty());
    }

    #[test]
    fn detach_of_stale_handle_is_harmless() {
        let (mut tree, _, a, _) = sample_tree();

        assert!(tree.detach(a));
        assert!(!tree.detach(a));
    }

    #[test]
    fn string_value_concatenates_descendant_text() {
        let mut tree = DocTree::new();
        let root = tree.insert_node("summary", None);
        tree.set_text(root, "outer ");
        let inner = tree.insert_node("see", Some(root));
        tree.set_text(inner, "inner");

        assert_eq!(tree.string_value(root), "outer inner");
    }

    #[test]
    fn push_attribute_replaces_existing() {
        let (mut tree, _, a, _) = sample_tree();

        tree.push_attribute(a, "id", "N:Gamma");

        assert_eq!(tree.attribute(a, "id"), Some("N:Gamma"));
        assert_eq!(tree.node(a).unwrap().attributes.len(), 1);
    }
}
