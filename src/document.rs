//! Structure Document Format
//!
//! The JSON shape written by auto-save and export and accepted by import.
//! Node records carry their connection ids for external readers; on import
//! those lists are ignored because the connection array is authoritative.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;

use crate::editor::{Connection, ConnectionGraph, Node, NodeMetadata, NodeTree, NodeType};
use crate::error::DocumentError;

/// Format version written into new documents
pub const FORMAT_VERSION: &str = "1.0.0";

pub const APP_NAME: &str = "Arbor Studio";

/// Which timestamp a document carries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentStamp {
    /// Local auto-save (`savedAt`)
    Saved,
    /// User export (`exportedAt`)
    Exported,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub version: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub saved_at: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exported_at: Option<i64>,

    pub root_node: NodeRecord,

    #[serde(default)]
    pub connections: Vec<Connection>,

    #[serde(default)]
    pub metadata: DocumentMetadata,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentMetadata {
    #[serde(default)]
    pub app_name: String,
}

/// Serialized form of a node and its subtree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeRecord {
    pub id: String,

    pub name: String,

    #[serde(rename = "type")]
    pub node_type: NodeType,

    #[serde(default)]
    pub x: f64,

    #[serde(default)]
    pub y: f64,

    #[serde(default)]
    pub children: Vec<NodeRecord>,

    /// Ids of connections touching this node (derived on export)
    #[serde(default)]
    pub connections: Vec<String>,

    #[serde(default)]
    pub metadata: NodeMetadata,
}

impl NodeRecord {
    fn from_node(node: &Node, graph: &ConnectionGraph) -> Self {
        Self {
            id: node.id.clone(),
            name: node.name.clone(),
            node_type: node.node_type,
            x: node.x,
            y: node.y,
            children: node
                .children
                .iter()
                .map(|c| NodeRecord::from_node(c, graph))
                .collect(),
            connections: graph.connection_ids_for_node(&node.id),
            metadata: node.metadata.clone(),
        }
    }

    fn into_node(self, seen: &mut HashSet<String>) -> Result<Node, DocumentError> {
        if self.id.is_empty() {
            return Err(DocumentError::InvalidFormat("node without an id".into()));
        }
        if !seen.insert(self.id.clone()) {
            return Err(DocumentError::InvalidFormat(format!(
                "node id {} appears more than once",
                self.id
            )));
        }
        let children = self
            .children
            .into_iter()
            .map(|c| c.into_node(seen))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Node {
            id: self.id,
            name: self.name,
            node_type: self.node_type,
            x: self.x,
            y: self.y,
            children,
            metadata: self.metadata,
        })
    }
}

impl Document {
    /// Snapshot the model into a document
    pub fn from_model(tree: &NodeTree, graph: &ConnectionGraph, stamp: DocumentStamp, now: i64) -> Self {
        let (saved_at, exported_at) = match stamp {
            DocumentStamp::Saved => (Some(now), None),
            DocumentStamp::Exported => (None, Some(now)),
        };
        Self {
            version: FORMAT_VERSION.to_string(),
            saved_at,
            exported_at,
            root_node: NodeRecord::from_node(tree.root(), graph),
            connections: graph.iter().cloned().collect(),
            metadata: DocumentMetadata {
                app_name: APP_NAME.to_string(),
            },
        }
    }

    /// Rebuild the tree and connection graph.
    ///
    /// Fails as a whole on duplicate node ids or connections that break the
    /// graph invariants; nothing is partially built.
    pub fn into_model(self) -> Result<(NodeTree, ConnectionGraph), DocumentError> {
        let mut seen = HashSet::new();
        let root = self.root_node.into_node(&mut seen)?;

        let mut graph = ConnectionGraph::new();
        for connection in self.connections {
            let id = connection.id.clone();
            graph
                .insert(connection)
                .map_err(|e| DocumentError::InvalidFormat(format!("connection {}: {}", id, e)))?;
        }
        Ok((NodeTree::new(root), graph))
    }

    /// Parse and validate a document from JSON text
    pub fn from_json(json: &str) -> Result<Self, DocumentError> {
        let value: Value = serde_json::from_str(json)?;
        Self::from_value(value)
    }

    pub fn from_value(value: Value) -> Result<Self, DocumentError> {
        validate_shape(&value)?;
        Ok(serde_json::from_value(value)?)
    }

    pub fn to_json_pretty(&self) -> Result<String, DocumentError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// `savedAt` or `exportedAt`, whichever is present
    pub fn timestamp(&self) -> Option<i64> {
        self.saved_at.or(self.exported_at)
    }
}

/// Minimum acceptance contract: truthy `version`, `rootNode`, `rootNode.id`
/// and `rootNode.name`.
pub fn validate_shape(value: &Value) -> Result<(), DocumentError> {
    let required = [
        ("version", value.get("version")),
        ("rootNode", value.get("rootNode")),
        ("rootNode.id", value.pointer("/rootNode/id")),
        ("rootNode.name", value.pointer("/rootNode/name")),
    ];
    for (field, found) in required {
        if !found.is_some_and(is_truthy) {
            return Err(DocumentError::InvalidFormat(format!("missing {}", field)));
        }
    }
    Ok(())
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}
