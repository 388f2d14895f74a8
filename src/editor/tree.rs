//! Node Tree Model
//!
//! Owns the root node and enforces the tree invariant: every node id appears
//! exactly once, so no node can sit under two parents and cycles are impossible.

use super::node::{Node, NodeId};
use crate::error::TreeError;
use std::collections::HashSet;

#[derive(Debug, Clone, PartialEq)]
pub struct NodeTree {
    root: Node,
}

impl NodeTree {
    pub fn new(root: Node) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Node {
        &self.root
    }

    pub fn root_id(&self) -> &str {
        &self.root.id
    }

    pub fn contains(&self, id: &str) -> bool {
        self.find(id).is_some()
    }

    /// Depth-first lookup anywhere in the tree
    pub fn find(&self, id: &str) -> Option<&Node> {
        fn search<'a>(node: &'a Node, id: &str) -> Option<&'a Node> {
            if node.id == id {
                return Some(node);
            }
            node.children.iter().find_map(|c| search(c, id))
        }
        search(&self.root, id)
    }

    pub fn find_mut(&mut self, id: &str) -> Option<&mut Node> {
        fn search<'a>(node: &'a mut Node, id: &str) -> Option<&'a mut Node> {
            if node.id == id {
                return Some(node);
            }
            node.children.iter_mut().find_map(|c| search(c, id))
        }
        search(&mut self.root, id)
    }

    /// Parent of a node; `None` for the root or unknown ids
    pub fn parent_of(&self, id: &str) -> Option<&Node> {
        fn search<'a>(node: &'a Node, id: &str) -> Option<&'a Node> {
            if node.children.iter().any(|c| c.id == id) {
                return Some(node);
            }
            node.children.iter().find_map(|c| search(c, id))
        }
        search(&self.root, id)
    }

    /// Ids from the root down to `id`, inclusive
    pub fn path_to(&self, id: &str) -> Option<Vec<NodeId>> {
        fn search(node: &Node, id: &str, path: &mut Vec<NodeId>) -> bool {
            path.push(node.id.clone());
            if node.id == id || node.children.iter().any(|c| search(c, id, path)) {
                return true;
            }
            path.pop();
            false
        }
        let mut path = Vec::new();
        search(&self.root, id, &mut path).then_some(path)
    }

    /// Whether two distinct nodes share the same parent
    pub fn are_siblings(&self, a: &str, b: &str) -> bool {
        a != b
            && self
                .parent_of(a)
                .is_some_and(|parent| parent.find_child_by_id(b).is_some())
    }

    /// Append `node` (with its subtree) to the children of `parent_id`.
    ///
    /// Rejected when an id repeats inside the incoming subtree or already
    /// exists in the tree.
    pub fn add_child(&mut self, parent_id: &str, node: Node, now: i64) -> Result<(), TreeError> {
        let mut incoming = HashSet::new();
        for id in node.subtree_ids() {
            if !incoming.insert(id.clone()) {
                return Err(TreeError::AlreadyAttached(id));
            }
        }
        let existing = self.all_ids();
        if let Some(clash) = incoming.into_iter().find(|id| existing.contains(id)) {
            return Err(TreeError::AlreadyAttached(clash));
        }
        let parent = self
            .find_mut(parent_id)
            .ok_or_else(|| TreeError::NotFound(parent_id.to_string()))?;
        parent.push_child(node, now);
        Ok(())
    }

    /// Detach a direct child of `parent_id`, returning the removed subtree
    pub fn remove_child(&mut self, parent_id: &str, node_id: &str, now: i64) -> Option<Node> {
        self.find_mut(parent_id)?.take_child(node_id, now)
    }

    /// Ids of `id` and all its descendants (empty when unknown)
    pub fn descendant_ids(&self, id: &str) -> Vec<NodeId> {
        self.find(id).map(Node::subtree_ids).unwrap_or_default()
    }

    pub fn all_ids(&self) -> HashSet<NodeId> {
        self.root.subtree_ids().into_iter().collect()
    }

    pub fn node_count(&self) -> usize {
        self.root.subtree_size()
    }

    /// Apply an edit to a node and refresh its modification time
    pub fn update(&mut self, id: &str, now: i64, edit: impl FnOnce(&mut Node)) -> bool {
        match self.find_mut(id) {
            Some(node) => {
                edit(node);
                node.touch(now);
                true
            }
            None => false,
        }
    }
}
