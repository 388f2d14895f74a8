//! Structure Tree Nodes
//!
//! Core data structures for the node hierarchy. Every node exclusively owns
//! its children; connection membership lives in the connection graph.

use eframe::egui::Pos2;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Globally unique node identifier
pub type NodeId = String;

/// Node kinds, ordered from the broadest to the most concrete
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeType {
    #[default]
    Domain,
    Process,
    Logic,
    Code,
}

impl NodeType {
    pub const ALL: [NodeType; 4] = [
        NodeType::Domain,
        NodeType::Process,
        NodeType::Logic,
        NodeType::Code,
    ];

    /// Parse from the serialized tag
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "domain" => Some(NodeType::Domain),
            "process" => Some(NodeType::Process),
            "logic" => Some(NodeType::Logic),
            "code" => Some(NodeType::Code),
            _ => None,
        }
    }

    /// Serialized tag
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeType::Domain => "domain",
            NodeType::Process => "process",
            NodeType::Logic => "logic",
            NodeType::Code => "code",
        }
    }

    /// Display label
    pub fn label(&self) -> &'static str {
        match self {
            NodeType::Domain => "Domain",
            NodeType::Process => "Process",
            NodeType::Logic => "Logic",
            NodeType::Code => "Code",
        }
    }

    pub fn icon(&self) -> &'static str {
        match self {
            NodeType::Domain => "🏛",
            NodeType::Process => "⚙",
            NodeType::Logic => "🔀",
            NodeType::Code => "📝",
        }
    }

    /// The type one level down the hierarchy, if any
    pub fn child_type(&self) -> Option<NodeType> {
        match self {
            NodeType::Domain => Some(NodeType::Process),
            NodeType::Process => Some(NodeType::Logic),
            NodeType::Logic => Some(NodeType::Code),
            NodeType::Code => None,
        }
    }
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Descriptive data attached to every node
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeMetadata {
    /// Free-form description
    #[serde(default)]
    pub description: String,

    /// Script text (meaningful for leaves)
    #[serde(default)]
    pub code: String,

    /// Creation time, epoch milliseconds
    #[serde(default)]
    pub created_at: i64,

    /// Last modification time, epoch milliseconds
    #[serde(default)]
    pub modified_at: i64,
}

impl NodeMetadata {
    pub fn new(now: i64) -> Self {
        Self {
            description: String::new(),
            code: String::new(),
            created_at: now,
            modified_at: now,
        }
    }
}

/// A node in the structure tree
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    /// Unique identifier
    pub id: NodeId,

    /// Display name
    pub name: String,

    pub node_type: NodeType,

    /// World position of the node center, kept at document precision
    pub x: f64,

    pub y: f64,

    /// Owned children, in insertion order
    pub children: Vec<Node>,

    pub metadata: NodeMetadata,
}

impl Node {
    /// Create a childless node with fresh timestamps
    pub fn new(
        id: impl Into<NodeId>,
        name: impl Into<String>,
        node_type: NodeType,
        x: f64,
        y: f64,
        now: i64,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            node_type,
            x,
            y,
            children: Vec::new(),
            metadata: NodeMetadata::new(now),
        }
    }

    pub fn has_children(&self) -> bool {
        !self.children.is_empty()
    }

    /// Find a direct child (not a full subtree search)
    pub fn find_child_by_id(&self, id: &str) -> Option<&Node> {
        self.children.iter().find(|c| c.id == id)
    }

    pub fn find_child_by_id_mut(&mut self, id: &str) -> Option<&mut Node> {
        self.children.iter_mut().find(|c| c.id == id)
    }

    /// Append a child without any tree-wide checks.
    ///
    /// Callers that hold a whole tree should go through `NodeTree::add_child`,
    /// which rejects ids already present elsewhere.
    pub(crate) fn push_child(&mut self, child: Node, now: i64) {
        self.children.push(child);
        self.touch(now);
    }

    /// Detach a direct child by id
    pub(crate) fn take_child(&mut self, id: &str, now: i64) -> Option<Node> {
        let index = self.children.iter().position(|c| c.id == id)?;
        let removed = self.children.remove(index);
        self.touch(now);
        Some(removed)
    }

    /// Center in canvas coordinates
    pub fn position(&self) -> Pos2 {
        Pos2::new(self.x as f32, self.y as f32)
    }

    pub fn set_position(&mut self, position: Pos2) {
        self.x = f64::from(position.x);
        self.y = f64::from(position.y);
    }

    pub fn touch(&mut self, now: i64) {
        self.metadata.modified_at = now;
    }

    /// Exact circle containment: Euclidean distance ≤ radius
    pub fn contains_point(&self, point: Pos2, radius: f32) -> bool {
        self.position().distance(point) <= radius
    }

    /// Visit this node and all descendants, parents before children
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a Node)) {
        visit(self);
        for child in &self.children {
            child.walk(visit);
        }
    }

    /// Ids of this node and every descendant
    pub fn subtree_ids(&self) -> Vec<NodeId> {
        let mut ids = Vec::new();
        self.walk(&mut |n| ids.push(n.id.clone()));
        ids
    }

    /// Number of nodes in this subtree, including self
    pub fn subtree_size(&self) -> usize {
        1 + self.children.iter().map(Node::subtree_size).sum::<usize>()
    }

    /// Number of levels in this subtree (a leaf has depth 1)
    pub fn depth(&self) -> usize {
        1 + self.children.iter().map(Node::depth).max().unwrap_or(0)
    }
}
