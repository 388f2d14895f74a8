//! Arbor Studio - Hierarchical Application Structure Editor
//!
//! Provides the node tree model, drill-down navigation, connection graph,
//! canvas viewport, document format, persistence and the AI suggestion client.

pub mod ai;
pub mod config;
pub mod document;
pub mod editor;
pub mod error;
pub mod export;
pub mod storage;
pub mod theme;

// Re-export commonly used types
pub use config::AppConfig;
pub use document::{Document, DocumentStamp};
pub use editor::{
    Connection, ConnectionGraph, ConnectionType, EditorState, Navigation, Node, NodeId,
    NodeTree, NodeType, Viewport,
};
pub use error::{AiError, ConnectRejection, DocumentError, TreeError};
