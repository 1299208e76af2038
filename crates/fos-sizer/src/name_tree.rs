//! Interned component names.
//!
//! Every `(parent, name)` pair that is ever pushed gets one node. Nodes are
//! only appended, so a parent always sits at a lower index than its
//! children. That ordering is what lets [`NameTree::accumulate_totals`]
//! roll sizes up in one reverse sweep.

use serde::Serialize;

/// Index of a node inside a [`NameTree`].
pub type NameIndex = usize;

/// Name of the implicit root node.
pub const ROOT_NAME: &str = "TOTAL";

/// One named scope in the memory report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NameNode {
    /// Component label as pushed, without the ancestor path
    pub name: String,
    /// Parent node; the root points at itself
    pub parent: NameIndex,
    /// Objects attributed directly to this scope
    pub object_count: usize,
    /// Bytes of objects attributed directly to this scope
    pub direct_bytes: u64,
    /// Direct bytes plus all descendants, valid after `accumulate_totals`
    pub total_bytes: u64,
    /// Direct children, in discovery order
    pub children: Vec<NameIndex>,
}

impl NameNode {
    fn new(name: &str, parent: NameIndex) -> Self {
        Self {
            name: name.to_string(),
            parent,
            object_count: 0,
            direct_bytes: 0,
            total_bytes: 0,
            children: Vec::new(),
        }
    }
}

/// Append-only array of [`NameNode`]s rooted at [`ROOT_NAME`].
#[derive(Debug, Clone)]
pub struct NameTree {
    nodes: Vec<NameNode>,
}

impl NameTree {
    /// Create a tree holding only the root.
    pub fn new() -> Self {
        Self {
            nodes: vec![NameNode::new(ROOT_NAME, 0)],
        }
    }

    /// Drop every node except the root, and zero the root's counters.
    pub fn reset(&mut self) {
        self.nodes.clear();
        self.nodes.push(NameNode::new(ROOT_NAME, 0));
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Always false: the root cannot be removed.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get(&self, index: NameIndex) -> Option<&NameNode> {
        self.nodes.get(index)
    }

    pub(crate) fn get_mut(&mut self, index: NameIndex) -> Option<&mut NameNode> {
        self.nodes.get_mut(index)
    }

    pub fn nodes(&self) -> &[NameNode] {
        &self.nodes
    }

    /// Find the child of `parent` called `name`, creating it if needed.
    pub fn find_or_insert(
        &mut self,
        parent: NameIndex,
        name: &str,
        case_sensitive: bool,
    ) -> NameIndex {
        let parent = if parent < self.nodes.len() { parent } else { 0 };

        let existing = self.nodes[parent].children.iter().copied().find(|&child| {
            let node = &self.nodes[child];
            if case_sensitive {
                node.name == name
            } else {
                node.name.eq_ignore_ascii_case(name)
            }
        });
        if let Some(index) = existing {
            return index;
        }

        let index = self.nodes.len();
        self.nodes.push(NameNode::new(name, parent));
        self.nodes[parent].children.push(index);
        index
    }

    /// Number of parent hops from `index` to the root.
    pub fn depth_level(&self, index: NameIndex) -> usize {
        let mut depth = 0;
        let mut current = index;
        while current != 0 && current < self.nodes.len() {
            current = self.nodes[current].parent;
            depth += 1;
        }
        depth
    }

    /// Compute `total_bytes` for every node.
    ///
    /// Children always have higher indices than their parents, so walking
    /// backwards finishes each subtree before its parent is read.
    pub fn accumulate_totals(&mut self) {
        for node in &mut self.nodes {
            node.total_bytes = node.direct_bytes;
        }
        for index in (1..self.nodes.len()).rev() {
            let parent = self.nodes[index].parent;
            let total = self.nodes[index].total_bytes;
            self.nodes[parent].total_bytes += total;
        }
    }

    /// `name` of `index` prefixed with its ancestors, e.g. `Render/Textures`.
    pub fn path(&self, index: NameIndex) -> String {
        let mut parts = Vec::new();
        let mut current = index;
        while current != 0 && current < self.nodes.len() {
            parts.push(self.nodes[current].name.as_str());
            current = self.nodes[current].parent;
        }
        parts.reverse();
        parts.join("/")
    }
}

impl Default for NameTree {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_only() {
        let tree = NameTree::new();
        assert_eq!(tree.len(), 1);
        assert_eq!(tree.get(0).map(|n| n.name.as_str()), Some(ROOT_NAME));
    }

    #[test]
    fn test_find_or_insert_reuses_nodes() {
        let mut tree = NameTree::new();
        let render = tree.find_or_insert(0, "Render", true);
        let textures = tree.find_or_insert(render, "Textures", true);

        assert_eq!(tree.find_or_insert(0, "Render", true), render);
        assert_eq!(tree.find_or_insert(render, "Textures", true), textures);
        assert_eq!(tree.len(), 3);

        // Same name under a different parent is a different node
        let other = tree.find_or_insert(0, "Textures", true);
        assert_ne!(other, textures);
    }

    #[test]
    fn test_children_record_new_index() {
        let mut tree = NameTree::new();
        let a = tree.find_or_insert(0, "A", true);
        let b = tree.find_or_insert(a, "B", true);
        let c = tree.find_or_insert(a, "C", true);

        assert_eq!(tree.get(0).unwrap().children, vec![a]);
        assert_eq!(tree.get(a).unwrap().children, vec![b, c]);
        assert!(tree.get(b).unwrap().children.is_empty());
    }

    #[test]
    fn test_case_insensitive_lookup() {
        let mut tree = NameTree::new();
        let lower = tree.find_or_insert(0, "textures", false);
        assert_eq!(tree.find_or_insert(0, "TEXTURES", false), lower);
        assert_ne!(tree.find_or_insert(0, "TEXTURES", true), lower);
    }

    #[test]
    fn test_parent_precedes_child() {
        let mut tree = NameTree::new();
        let a = tree.find_or_insert(0, "A", true);
        let b = tree.find_or_insert(a, "B", true);
        tree.find_or_insert(b, "C", true);
        tree.find_or_insert(0, "D", true);

        for (index, node) in tree.nodes().iter().enumerate().skip(1) {
            assert!(node.parent < index);
        }
    }

    #[test]
    fn test_accumulate_totals() {
        let mut tree = NameTree::new();
        let a = tree.find_or_insert(0, "A", true);
        let b = tree.find_or_insert(a, "B", true);
        tree.get_mut(a).unwrap().direct_bytes = 50;
        tree.get_mut(b).unwrap().direct_bytes = 100;

        tree.accumulate_totals();
        assert_eq!(tree.get(b).unwrap().total_bytes, 100);
        assert_eq!(tree.get(a).unwrap().total_bytes, 150);
        assert_eq!(tree.get(0).unwrap().total_bytes, 150);

        // Idempotent
        tree.accumulate_totals();
        assert_eq!(tree.get(0).unwrap().total_bytes, 150);
    }

    #[test]
    fn test_depth_and_path() {
        let mut tree = NameTree::new();
        let render = tree.find_or_insert(0, "Render", true);
        let textures = tree.find_or_insert(render, "Textures", true);

        assert_eq!(tree.depth_level(0), 0);
        assert_eq!(tree.depth_level(textures), 2);
        assert_eq!(tree.path(textures), "Render/Textures");
    }

    #[test]
    fn test_reset() {
        let mut tree = NameTree::new();
        tree.find_or_insert(0, "A", true);
        tree.get_mut(0).unwrap().direct_bytes = 10;
        tree.reset();

        assert_eq!(tree.len(), 1);
        assert_eq!(tree.get(0).unwrap().direct_bytes, 0);
        assert!(tree.get(0).unwrap().children.is_empty());
    }
}
