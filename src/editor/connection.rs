//! Connection Graph
//!
//! Directed, typed pathways between sibling nodes. The graph is the only
//! place connections are stored: a node's connection list is always computed
//! from here, never written separately.

use eframe::egui::Pos2;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

use super::node::{Node, NodeId};
use super::services::IdGenerator;
use super::tree::NodeTree;
use crate::error::ConnectRejection;

/// Connection kinds. Only `Normal` is created by the interactive tool; the
/// others are reserved and carried through documents unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionType {
    #[default]
    Normal,
    Conditional,
    Loop,
    Llm,
}

impl ConnectionType {
    pub const ALL: [ConnectionType; 4] = [
        ConnectionType::Normal,
        ConnectionType::Conditional,
        ConnectionType::Loop,
        ConnectionType::Llm,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            ConnectionType::Normal => "Normal",
            ConnectionType::Conditional => "Conditional",
            ConnectionType::Loop => "Loop",
            ConnectionType::Llm => "LLM",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionMetadata {
    /// Creation time, epoch milliseconds
    #[serde(default)]
    pub created_at: i64,
}

/// A directed edge between two nodes, referenced by id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Connection {
    pub id: String,

    pub source_id: NodeId,

    pub target_id: NodeId,

    #[serde(rename = "type", default)]
    pub connection_type: ConnectionType,

    #[serde(default)]
    pub label: Option<String>,

    /// Reserved payload for non-normal types; kept opaque
    #[serde(default)]
    pub condition: Option<serde_json::Value>,

    #[serde(default)]
    pub metadata: ConnectionMetadata,
}

impl Connection {
    pub fn new(
        id: impl Into<String>,
        source_id: impl Into<NodeId>,
        target_id: impl Into<NodeId>,
        now: i64,
    ) -> Self {
        Self {
            id: id.into(),
            source_id: source_id.into(),
            target_id: target_id.into(),
            connection_type: ConnectionType::Normal,
            label: None,
            condition: None,
            metadata: ConnectionMetadata { created_at: now },
        }
    }

    pub fn with_label(mut self, label: Option<String>) -> Self {
        self.label = label.filter(|l| !l.trim().is_empty());
        self
    }

    pub fn touches(&self, node_id: &str) -> bool {
        self.source_id == node_id || self.target_id == node_id
    }
}

/// A stored connection with its creation sequence number
#[derive(Debug, Clone)]
struct Slot {
    seq: u64,
    connection: Connection,
}

/// Authoritative connection store: one ordered bucket per source node.
///
/// Buckets are never left empty. Each connection carries a sequence number
/// so whole-graph iteration can reproduce creation order.
#[derive(Debug, Clone, Default)]
pub struct ConnectionGraph {
    buckets: BTreeMap<NodeId, Vec<Slot>>,
    next_seq: u64,
}

impl PartialEq for ConnectionGraph {
    fn eq(&self, other: &Self) -> bool {
        self.iter().eq(other.iter())
    }
}

impl ConnectionGraph {
    pub fn new() -> Self {
        Self::default()
    }

    fn slots(&self) -> impl Iterator<Item = &Slot> {
        self.buckets.values().flatten()
    }

    /// Store a connection after checking the graph-level invariants:
    /// no self-loops, unique ids, one connection per ordered pair.
    pub fn insert(&mut self, connection: Connection) -> Result<(), ConnectRejection> {
        if connection.source_id == connection.target_id {
            return Err(ConnectRejection::SelfConnection);
        }
        if self.get(&connection.id).is_some() {
            return Err(ConnectRejection::DuplicateId(connection.id));
        }
        if self.contains_pair(&connection.source_id, &connection.target_id) {
            return Err(ConnectRejection::Duplicate {
                source_id: connection.source_id,
                target_id: connection.target_id,
            });
        }
        let seq = self.next_seq;
        self.next_seq += 1;
        self.buckets
            .entry(connection.source_id.clone())
            .or_default()
            .push(Slot { seq, connection });
        Ok(())
    }

    pub fn contains_pair(&self, source_id: &str, target_id: &str) -> bool {
        self.outgoing(source_id).any(|c| c.target_id == target_id)
    }

    pub fn get(&self, id: &str) -> Option<&Connection> {
        self.slots().map(|s| &s.connection).find(|c| c.id == id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut Connection> {
        self.buckets
            .values_mut()
            .flatten()
            .map(|s| &mut s.connection)
            .find(|c| c.id == id)
    }

    /// Remove a connection by id, dropping its bucket when it empties
    pub fn delete_connection(&mut self, id: &str) -> bool {
        let Some(source_id) = self.get(id).map(|c| c.source_id.clone()) else {
            return false;
        };
        if let Some(bucket) = self.buckets.get_mut(&source_id) {
            bucket.retain(|s| s.connection.id != id);
            if bucket.is_empty() {
                self.buckets.remove(&source_id);
            }
        }
        true
    }

    /// Connections leaving `source_id`, in creation order
    pub fn outgoing<'a>(&'a self, source_id: &str) -> impl Iterator<Item = &'a Connection> + 'a {
        self.buckets
            .get(source_id)
            .into_iter()
            .flatten()
            .map(|s| &s.connection)
    }

    /// Every connection where the node is source or target
    pub fn connections_for_node(&self, node_id: &str) -> Vec<&Connection> {
        self.iter().filter(|c| c.touches(node_id)).collect()
    }

    pub fn connection_ids_for_node(&self, node_id: &str) -> Vec<String> {
        self.iter()
            .filter(|c| c.touches(node_id))
            .map(|c| c.id.clone())
            .collect()
    }

    /// Connections whose endpoints are both direct children of `current`
    pub fn connections_for_level(&self, current: &Node) -> Vec<&Connection> {
        let level: HashSet<&str> = current.children.iter().map(|c| c.id.as_str()).collect();
        let mut slots: Vec<&Slot> = current
            .children
            .iter()
            .filter_map(|child| self.buckets.get(&child.id))
            .flatten()
            .filter(|s| level.contains(s.connection.target_id.as_str()))
            .collect();
        slots.sort_by_key(|s| s.seq);
        slots.into_iter().map(|s| &s.connection).collect()
    }

    /// Drop every connection touching any of `node_ids`. Returns how many went.
    pub fn purge_nodes(&mut self, node_ids: &HashSet<NodeId>) -> usize {
        let before = self.len();
        self.buckets.retain(|source_id, bucket| {
            if node_ids.contains(source_id) {
                return false;
            }
            bucket.retain(|s| !node_ids.contains(&s.connection.target_id));
            !bucket.is_empty()
        });
        before - self.len()
    }

    /// All connections in creation order
    pub fn iter(&self) -> impl Iterator<Item = &Connection> {
        let mut slots: Vec<&Slot> = self.slots().collect();
        slots.sort_by_key(|s| s.seq);
        slots.into_iter().map(|s| &s.connection)
    }

    pub fn len(&self) -> usize {
        self.buckets.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }
}

/// Interactive connection creation: `Idle → Pending → Idle`
#[derive(Debug, Clone, Default, PartialEq)]
pub enum ConnectionTool {
    #[default]
    Idle,
    Pending {
        source_id: NodeId,
        /// Rubber-band endpoint in world space
        preview: Option<Pos2>,
    },
}

impl ConnectionTool {
    pub fn is_pending(&self) -> bool {
        matches!(self, ConnectionTool::Pending { .. })
    }

    pub fn source_id(&self) -> Option<&str> {
        match self {
            ConnectionTool::Pending { source_id, .. } => Some(source_id),
            ConnectionTool::Idle => None,
        }
    }

    pub fn preview(&self) -> Option<Pos2> {
        match self {
            ConnectionTool::Pending { preview, .. } => *preview,
            ConnectionTool::Idle => None,
        }
    }

    /// Begin a connection from `source_id`, replacing any pending one
    pub fn start(&mut self, source_id: impl Into<NodeId>) {
        *self = ConnectionTool::Pending {
            source_id: source_id.into(),
            preview: None,
        };
    }

    /// Move the rubber-band endpoint. Ignored while idle.
    pub fn update_preview(&mut self, world: Pos2) {
        if let ConnectionTool::Pending { preview, .. } = self {
            *preview = Some(world);
        }
    }

    pub fn cancel(&mut self) {
        *self = ConnectionTool::Idle;
    }

    /// Complete the pending connection at `target_id`.
    ///
    /// Every outcome, accepted or rejected, returns the tool to idle.
    pub fn finish(
        &mut self,
        graph: &mut ConnectionGraph,
        tree: &NodeTree,
        target_id: &str,
        label: Option<String>,
        ids: &mut dyn IdGenerator,
        now: i64,
    ) -> Result<Connection, ConnectRejection> {
        let source_id = match std::mem::take(self) {
            ConnectionTool::Pending { source_id, .. } => source_id,
            ConnectionTool::Idle => return Err(ConnectRejection::NotPending),
        };

        if source_id == target_id {
            return Err(ConnectRejection::SelfConnection);
        }
        if graph.contains_pair(&source_id, target_id) {
            return Err(ConnectRejection::Duplicate {
                source_id,
                target_id: target_id.to_string(),
            });
        }
        if !tree.contains(&source_id) {
            return Err(ConnectRejection::UnknownNode(source_id));
        }
        if !tree.contains(target_id) {
            return Err(ConnectRejection::UnknownNode(target_id.to_string()));
        }
        if !tree.are_siblings(&source_id, target_id) {
            return Err(ConnectRejection::NotSiblings);
        }

        let connection =
            Connection::new(ids.next_id("conn"), source_id, target_id, now).with_label(label);
        graph.insert(connection.clone())?;
        log::debug!(
            "Connected {} -> {} ({})",
            connection.source_id,
            connection.target_id,
            connection.id
        );
        Ok(connection)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::editor::node::NodeType;
    use crate::editor::services::SequentialIds;

    fn tree() -> NodeTree {
        let mut tree = NodeTree::new(Node::new("root", "Root", NodeType::Domain, 0.0, 0.0, 0));
        for id in ["b", "c"] {
            tree.add_child("root", Node::new(id, id, NodeType::Process, 0.0, 0.0, 0), 0)
                .unwrap();
        }
        tree.add_child("b", Node::new("b1", "b1", NodeType::Logic, 0.0, 0.0, 0), 0)
            .unwrap();
        tree
    }

    fn connect(
        tool: &mut ConnectionTool,
        graph: &mut ConnectionGraph,
        tree: &NodeTree,
        ids: &mut SequentialIds,
        from: &str,
        to: &str,
    ) -> Result<Connection, ConnectRejection> {
        tool.start(from);
        tool.finish(graph, tree, to, None, ids, 5)
    }

    #[test]
    fn test_state_machine() {
        let mut tool = ConnectionTool::default();
        tool.update_preview(Pos2::new(1.0, 1.0));
        assert_eq!(tool, ConnectionTool::Idle);

        tool.start("b");
        tool.update_preview(Pos2::new(3.0, 4.0));
        assert_eq!(tool.preview(), Some(Pos2::new(3.0, 4.0)));

        tool.start("c");
        assert_eq!(tool.source_id(), Some("c"));
        assert_eq!(tool.preview(), None);

        tool.cancel();
        assert!(!tool.is_pending());
    }

    #[test]
    fn test_finish_creates_connection() {
        let tree = tree();
        let mut graph = ConnectionGraph::new();
        let mut ids = SequentialIds::default();
        let mut tool = ConnectionTool::default();
        tool.start("b");
        let conn = tool
            .finish(&mut graph, &tree, "c", Some("flow".into()), &mut ids, 7)
            .unwrap();
        assert_eq!(conn.label.as_deref(), Some("flow"));
        assert_eq!(conn.metadata.created_at, 7);
        assert_eq!(graph.len(), 1);
        assert!(!tool.is_pending());
        assert_eq!(graph.connection_ids_for_node("b"), vec![conn.id.clone()]);
        assert_eq!(graph.connection_ids_for_node("c"), vec![conn.id]);
    }

    #[test]
    fn test_self_connection_rejected() {
        let tree = tree();
        let mut graph = ConnectionGraph::new();
        let mut ids = SequentialIds::default();
        let mut tool = ConnectionTool::default();
        let err = connect(&mut tool, &mut graph, &tree, &mut ids, "b", "b").unwrap_err();
        assert_eq!(err, ConnectRejection::SelfConnection);
        assert!(graph.is_empty());
        assert!(!tool.is_pending());
    }

    #[test]
    fn test_duplicate_rejected_but_reverse_allowed() {
        let tree = tree();
        let mut graph = ConnectionGraph::new();
        let mut ids = SequentialIds::default();
        let mut tool = ConnectionTool::default();
        connect(&mut tool, &mut graph, &tree, &mut ids, "b", "c").unwrap();
        let err = connect(&mut tool, &mut graph, &tree, &mut ids, "b", "c").unwrap_err();
        assert!(matches!(err, ConnectRejection::Duplicate { .. }));
        assert_eq!(graph.len(), 1);

        connect(&mut tool, &mut graph, &tree, &mut ids, "c", "b").unwrap();
        assert_eq!(graph.len(), 2);
    }

    #[test]
    fn test_cross_level_rejected() {
        let tree = tree();
        let mut graph = ConnectionGraph::new();
        let mut ids = SequentialIds::default();
        let mut tool = ConnectionTool::default();
        let err = connect(&mut tool, &mut graph, &tree, &mut ids, "c", "b1").unwrap_err();
        assert_eq!(err, ConnectRejection::NotSiblings);
    }

    #[test]
    fn test_finish_while_idle() {
        let tree = tree();
        let mut graph = ConnectionGraph::new();
        let mut ids = SequentialIds::default();
        let mut tool = ConnectionTool::default();
        let err = tool.finish(&mut graph, &tree, "c", None, &mut ids, 0).unwrap_err();
        assert_eq!(err, ConnectRejection::NotPending);
    }

    #[test]
    fn test_level_filter_and_delete() {
        let tree = tree();
        let mut graph = ConnectionGraph::new();
        graph.insert(Connection::new("c1", "b", "c", 0)).unwrap();
        graph.insert(Connection::new("c2", "b1", "ghost", 0)).unwrap();

        let level: Vec<_> = graph.connections_for_level(tree.root()).iter().map(|c| c.id.clone()).collect();
        assert_eq!(level, ["c1"]);

        assert!(graph.delete_connection("c1"));
        assert!(!graph.delete_connection("c1"));
        assert!(graph.connections_for_node("b").is_empty());
    }

    #[test]
    fn test_purge_nodes() {
        let mut graph = ConnectionGraph::new();
        graph.insert(Connection::new("c1", "b", "c", 0)).unwrap();
        graph.insert(Connection::new("c2", "c", "d", 0)).unwrap();
        graph.insert(Connection::new("c3", "x", "y", 0)).unwrap();
        let ids: HashSet<NodeId> = ["c".to_string()].into_iter().collect();
        assert_eq!(graph.purge_nodes(&ids), 2);
        assert_eq!(graph.iter().map(|c| c.id.as_str()).collect::<Vec<_>>(), ["c3"]);
    }

    #[test]
    fn test_buckets_keep_creation_order() {
        let mut graph = ConnectionGraph::new();
        graph.insert(Connection::new("c1", "z", "a", 0)).unwrap();
        graph.insert(Connection::new("c2", "a", "z", 0)).unwrap();
        graph.insert(Connection::new("c3", "z", "b", 0)).unwrap();

        let order: Vec<_> = graph.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(order, ["c1", "c2", "c3"]);
        let from_z: Vec<_> = graph.outgoing("z").map(|c| c.id.as_str()).collect();
        assert_eq!(from_z, ["c1", "c3"]);

        // Emptied buckets are dropped
        assert!(graph.delete_connection("c2"));
        assert_eq!(graph.outgoing("a").count(), 0);
        assert!(graph.delete_connection("c1"));
        assert!(graph.delete_connection("c3"));
        assert!(graph.is_empty());
        assert_eq!(graph.len(), 0);
    }

    #[test]
    fn test_equality_ignores_sequence_gaps() {
        let mut left = ConnectionGraph::new();
        left.insert(Connection::new("gone", "x", "y", 0)).unwrap();
        left.insert(Connection::new("c1", "a", "b", 0)).unwrap();
        left.delete_connection("gone");

        let mut right = ConnectionGraph::new();
        right.insert(Connection::new("c1", "a", "b", 0)).unwrap();
        assert_eq!(left, right);
    }

    #[test]
    fn test_insert_rejects_duplicate_id() {
        let mut graph = ConnectionGraph::new();
        graph.insert(Connection::new("c1", "a", "b", 0)).unwrap();
        assert_eq!(
            graph.insert(Connection::new("c1", "b", "a", 0)),
            Err(ConnectRejection::DuplicateId("c1".into()))
        );
    }
}
