//! Drill-down Navigation
//!
//! Tracks the chain of nodes from the root to the level currently shown on
//! the canvas. The chain is split into the root id and the path below it, so
//! the stack can never be empty.

use super::node::{Node, NodeId};
use super::tree::NodeTree;

/// One entry of the breadcrumb trail
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Breadcrumb {
    /// Position in the navigation stack
    pub index: usize,
    pub id: NodeId,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Navigation {
    /// Stack bottom
    root: NodeId,

    /// Nodes below the root, each a child of the previous entry
    path: Vec<NodeId>,

    /// Selected node on the current level
    selected: Option<NodeId>,
}

impl Navigation {
    pub fn new(root_id: impl Into<NodeId>) -> Self {
        Self {
            root: root_id.into(),
            path: Vec::new(),
            selected: None,
        }
    }

    /// Return to a fresh stack rooted at `root_id`
    pub fn reset(&mut self, root_id: impl Into<NodeId>) {
        *self = Self::new(root_id);
    }

    pub fn root_id(&self) -> &str {
        &self.root
    }

    /// Stack top
    pub fn current_id(&self) -> &str {
        self.path.last().unwrap_or(&self.root)
    }

    pub fn depth(&self) -> usize {
        self.path.len() + 1
    }

    /// Ids from root to current
    pub fn stack(&self) -> Vec<&str> {
        std::iter::once(self.root.as_str())
            .chain(self.path.iter().map(String::as_str))
            .collect()
    }

    /// Resolve the current node by walking the chain from the root
    pub fn current_node<'t>(&self, tree: &'t NodeTree) -> Option<&'t Node> {
        let root = tree.root();
        if root.id != self.root {
            return None;
        }
        self.path
            .iter()
            .try_fold(root, |node, id| node.find_child_by_id(id))
    }

    /// Drill into a child of the current node. Leaves are refused.
    pub fn navigate_to_node(&mut self, tree: &NodeTree, node_id: &str) -> bool {
        let Some(current) = self.current_node(tree) else {
            return false;
        };
        match current.find_child_by_id(node_id) {
            Some(child) if child.has_children() => {
                log::debug!("Navigating into {} ({})", child.name, child.id);
                self.path.push(child.id.clone());
                self.selected = None;
                true
            }
            _ => false,
        }
    }

    /// Pop one level. No-op at the root.
    pub fn navigate_back(&mut self) -> bool {
        if self.path.pop().is_some() {
            self.selected = None;
            true
        } else {
            false
        }
    }

    /// Jump to an ancestor in the breadcrumb trail
    pub fn navigate_to_stack_index(&mut self, index: usize) -> bool {
        if index >= self.depth() {
            return false;
        }
        self.path.truncate(index);
        self.selected = None;
        true
    }

    pub fn breadcrumbs(&self, tree: &NodeTree) -> Vec<Breadcrumb> {
        let mut crumbs = Vec::with_capacity(self.depth());
        let mut node = tree.root();
        crumbs.push(Breadcrumb {
            index: 0,
            id: node.id.clone(),
            name: node.name.clone(),
        });
        for (i, id) in self.path.iter().enumerate() {
            match node.find_child_by_id(id) {
                Some(child) => {
                    crumbs.push(Breadcrumb {
                        index: i + 1,
                        id: child.id.clone(),
                        name: child.name.clone(),
                    });
                    node = child;
                }
                None => break,
            }
        }
        crumbs
    }

    /// Cut the stack back to its longest valid prefix after the tree changed.
    ///
    /// A level whose node lost all children is also left, since only nodes
    /// with children can be drilled into. Returns whether anything changed.
    pub fn repair(&mut self, tree: &NodeTree) -> bool {
        if tree.root_id() != self.root {
            self.reset(tree.root_id());
            return true;
        }
        let mut node = tree.root();
        let mut valid = 0;
        for id in &self.path {
            match node.find_child_by_id(id) {
                Some(child) if child.has_children() => {
                    node = child;
                    valid += 1;
                }
                _ => break,
            }
        }
        let mut changed = valid < self.path.len();
        self.path.truncate(valid);

        if let Some(selected) = &self.selected {
            if node.find_child_by_id(selected).is_none() {
                self.selected = None;
                changed = true;
            }
        }
        changed
    }

    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    pub fn select(&mut self, id: impl Into<NodeId>) {
        self.selected = Some(id.into());
    }

    pub fn clear_selection(&mut self) {
        self.selected = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::editor::node::NodeType;
    use eframe::egui::Pos2;

    fn node(id: &str) -> Node {
        Node::new(id, id.to_uppercase(), NodeType::Domain, 0.0, 0.0, 0)
    }

    /// root -> a -> a1 -> a1x, root -> b (leaf)
    fn sample() -> NodeTree {
        let mut tree = NodeTree::new(node("root"));
        tree.add_child("root", node("a"), 0).unwrap();
        tree.add_child("root", node("b"), 0).unwrap();
        tree.add_child("a", node("a1"), 0).unwrap();
        tree.add_child("a1", node("a1x"), 0).unwrap();
        tree
    }

    #[test]
    fn test_drill_down_and_back() {
        let tree = sample();
        let mut nav = Navigation::new("root");
        nav.select("a");
        assert!(nav.navigate_to_node(&tree, "a"));
        assert_eq!(nav.current_id(), "a");
        assert_eq!(nav.selected(), None);
        assert!(nav.navigate_to_node(&tree, "a1"));
        assert_eq!(nav.stack(), ["root", "a", "a1"]);

        assert!(nav.navigate_back());
        assert_eq!(nav.current_id(), "a");
        assert_eq!(nav.current_node(&tree).map(|n| n.name.as_str()), Some("A"));
    }

    #[test]
    fn test_leaf_drill_down_is_rejected() {
        let tree = sample();
        let mut nav = Navigation::new("root");
        nav.select("b");
        let before = nav.clone();
        assert!(!nav.navigate_to_node(&tree, "b"));
        assert_eq!(nav, before);
    }

    #[test]
    fn test_only_current_level_is_reachable() {
        let tree = sample();
        let mut nav = Navigation::new("root");
        assert!(!nav.navigate_to_node(&tree, "a1"));
        assert_eq!(nav.depth(), 1);
    }

    #[test]
    fn test_back_at_root_is_noop() {
        let mut nav = Navigation::new("root");
        nav.select("a");
        assert!(!nav.navigate_back());
        assert_eq!(nav.depth(), 1);
        assert_eq!(nav.selected(), Some("a"));
    }

    #[test]
    fn test_stack_index_jump() {
        let tree = sample();
        let mut nav = Navigation::new("root");
        nav.navigate_to_node(&tree, "a");
        nav.navigate_to_node(&tree, "a1");

        assert!(!nav.navigate_to_stack_index(3));
        assert_eq!(nav.depth(), 3);

        assert!(nav.navigate_to_stack_index(0));
        assert_eq!(nav.current_id(), "root");
        assert_eq!(nav.depth(), 1);
    }

    #[test]
    fn test_breadcrumbs() {
        let tree = sample();
        let mut nav = Navigation::new("root");
        nav.navigate_to_node(&tree, "a");
        let names: Vec<_> = nav.breadcrumbs(&tree).into_iter().map(|c| c.name).collect();
        assert_eq!(names, ["ROOT", "A"]);
    }

    #[test]
    fn test_repair_after_delete() {
        let mut tree = sample();
        let mut nav = Navigation::new("root");
        nav.navigate_to_node(&tree, "a");
        nav.navigate_to_node(&tree, "a1");
        nav.select("a1x");

        tree.remove_child("a1", "a1x", 1);
        assert!(nav.repair(&tree));
        assert_eq!(nav.stack(), ["root", "a"]);
        assert_eq!(nav.selected(), None);
        assert!(!nav.repair(&tree));
    }
}
