//! Hierarchical Graph Editor Core
//!
//! In-memory structure model and the interaction state around it:
//! - Node tree (domain → process → logic → code)
//! - Drill-down navigation with a breadcrumb stack
//! - Directed connections between sibling nodes
//! - Pan/zoom viewport and hit-testing
//! - Native egui canvas rendering

pub mod canvas;
pub mod connection;
pub mod geometry;
pub mod hit_test;
pub mod navigation;
pub mod node;
pub mod services;
pub mod state;
pub mod tree;
pub mod viewport;

pub use canvas::{CanvasAction, CanvasView};
pub use connection::{Connection, ConnectionGraph, ConnectionMetadata, ConnectionTool, ConnectionType};
pub use navigation::{Breadcrumb, Navigation};
pub use node::{Node, NodeId, NodeMetadata, NodeType};
pub use services::{Clock, FixedClock, IdGenerator, Notice, NoticeLevel, Notifications, SequentialIds, SystemClock, UlidIds};
pub use state::EditorState;
pub use tree::NodeTree;
pub use viewport::Viewport;
