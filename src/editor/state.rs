//! Editor State
//!
//! Bundles the tree, connection graph, navigation and viewport with the
//! collaborators they need (ids, clock, notifications). The canvas and the
//! app receive this explicitly; there is no global "current app".

use eframe::egui::Pos2;
use std::collections::HashSet;

use super::connection::{Connection, ConnectionGraph, ConnectionTool, ConnectionType};
use super::geometry::{self, NODE_RADIUS};
use super::hit_test::hit_test;
use super::navigation::{Breadcrumb, Navigation};
use super::node::{Node, NodeId, NodeType};
use super::services::{Clock, IdGenerator, Notifications, SystemClock, UlidIds};
use super::tree::NodeTree;
use super::viewport::Viewport;
use crate::ai::SuggestedNode;
use crate::document::{Document, DocumentStamp};
use crate::error::{ConnectRejection, DocumentError, TreeError};

/// Default name for the root of a new structure
pub const DEFAULT_ROOT_NAME: &str = "Application";

pub struct EditorState {
    tree: NodeTree,

    connections: ConnectionGraph,

    navigation: Navigation,

    tool: ConnectionTool,

    pub viewport: Viewport,

    /// Node circle radius in world units
    node_radius: f32,

    /// User-facing messages waiting for the UI
    pub notices: Notifications,

    ids: Box<dyn IdGenerator>,

    clock: Box<dyn Clock>,

    /// Unsaved changes since the last save
    dirty: bool,
}

impl Default for EditorState {
    fn default() -> Self {
        Self::new(DEFAULT_ROOT_NAME)
    }
}

impl EditorState {
    /// Empty structure with ULID ids and the system clock
    pub fn new(root_name: &str) -> Self {
        Self::with_services(root_name, Box::new(UlidIds), Box::new(SystemClock))
    }

    pub fn with_services(root_name: &str, mut ids: Box<dyn IdGenerator>, clock: Box<dyn Clock>) -> Self {
        let root = Node::new(
            ids.next_id("node"),
            root_name,
            NodeType::Domain,
            0.0,
            0.0,
            clock.now_millis(),
        );
        let navigation = Navigation::new(root.id.clone());
        Self {
            tree: NodeTree::new(root),
            connections: ConnectionGraph::new(),
            navigation,
            tool: ConnectionTool::Idle,
            viewport: Viewport::default(),
            node_radius: NODE_RADIUS,
            notices: Notifications::default(),
            ids,
            clock,
            dirty: false,
        }
    }

    /// Start over with a fresh root
    pub fn reset(&mut self, root_name: &str) {
        let now = self.now();
        let root = Node::new(self.ids.next_id("node"), root_name, NodeType::Domain, 0.0, 0.0, now);
        self.replace_model(NodeTree::new(root), ConnectionGraph::new());
        self.dirty = true;
    }

    pub fn tree(&self) -> &NodeTree {
        &self.tree
    }

    pub fn connections(&self) -> &ConnectionGraph {
        &self.connections
    }

    pub fn navigation(&self) -> &Navigation {
        &self.navigation
    }

    pub fn tool(&self) -> &ConnectionTool {
        &self.tool
    }

    pub fn node_radius(&self) -> f32 {
        self.node_radius
    }

    pub fn set_node_radius(&mut self, radius: f32) {
        self.node_radius = radius.max(1.0);
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn mark_clean(&mut self) {
        self.dirty = false;
    }

    fn now(&self) -> i64 {
        self.clock.now_millis()
    }

    // ── Tree ────────────────────────────────────────────────────────────

    /// Allocate a detached node with a fresh id and timestamps
    pub fn create_node(&mut self, name: &str, node_type: NodeType, x: f64, y: f64) -> Node {
        let now = self.now();
        Node::new(self.ids.next_id("node"), name, node_type, x, y, now)
    }

    /// The node whose children are shown on the canvas
    pub fn current_node(&self) -> &Node {
        self.navigation
            .current_node(&self.tree)
            .unwrap_or_else(|| self.tree.root())
    }

    /// Direct children of the current node
    pub fn current_level(&self) -> &[Node] {
        &self.current_node().children
    }

    /// Natural type for a node added on the current level
    pub fn default_child_type(&self) -> NodeType {
        self.current_node().node_type.child_type().unwrap_or(NodeType::Code)
    }

    /// Create a node on the current level
    pub fn add_node(&mut self, name: &str, node_type: NodeType, position: Pos2) -> Result<NodeId, TreeError> {
        let mut node = self.create_node(name, node_type, 0.0, 0.0);
        node.set_position(position);
        let id = node.id.clone();
        let parent_id = self.current_node().id.clone();
        self.add_child(&parent_id, node)?;
        Ok(id)
    }

    pub fn add_child(&mut self, parent_id: &str, node: Node) -> Result<(), TreeError> {
        let now = self.now();
        log::debug!("Adding {} ({}) under {}", node.name, node.id, parent_id);
        self.tree.add_child(parent_id, node, now)?;
        self.dirty = true;
        Ok(())
    }

    /// Remove a node with its whole subtree and every connection touching it
    pub fn delete_node(&mut self, id: &str) -> bool {
        let Some(parent_id) = self.tree.parent_of(id).map(|p| p.id.clone()) else {
            if self.tree.root_id() == id {
                self.notices.warning("The root node cannot be deleted");
            }
            return false;
        };
        let removed: HashSet<NodeId> = self.tree.descendant_ids(id).into_iter().collect();
        let now = self.now();
        let Some(node) = self.tree.remove_child(&parent_id, id, now) else {
            return false;
        };
        let purged = self.connections.purge_nodes(&removed);
        if self.tool.source_id().is_some_and(|s| removed.contains(s)) {
            self.tool.cancel();
        }
        self.navigation.repair(&self.tree);
        log::info!(
            "Deleted {} with {} descendants and {} connections",
            node.name,
            removed.len() - 1,
            purged
        );
        self.dirty = true;
        true
    }

    pub fn rename_node(&mut self, id: &str, name: &str) -> bool {
        self.edit_node(id, |n| n.name = name.to_string())
    }

    pub fn set_node_type(&mut self, id: &str, node_type: NodeType) -> bool {
        self.edit_node(id, |n| n.node_type = node_type)
    }

    pub fn set_description(&mut self, id: &str, description: &str) -> bool {
        self.edit_node(id, |n| n.metadata.description = description.to_string())
    }

    pub fn set_code(&mut self, id: &str, code: &str) -> bool {
        self.edit_node(id, |n| n.metadata.code = code.to_string())
    }

    /// Move a node; layout only, so the modification time is kept
    pub fn move_node(&mut self, id: &str, position: Pos2) -> bool {
        match self.tree.find_mut(id) {
            Some(node) => {
                node.set_position(position);
                self.dirty = true;
                true
            }
            None => false,
        }
    }

    fn edit_node(&mut self, id: &str, edit: impl FnOnce(&mut Node)) -> bool {
        let now = self.now();
        let changed = self.tree.update(id, now, edit);
        self.dirty |= changed;
        changed
    }

    // ── Hit testing ─────────────────────────────────────────────────────

    /// Node on the current level under a canvas-local screen point
    pub fn hit_test_node(&self, screen: Pos2) -> Option<NodeId> {
        self.hit_test_world(self.viewport.screen_to_world(screen))
    }

    pub fn hit_test_world(&self, world: Pos2) -> Option<NodeId> {
        hit_test(self.current_level(), world, self.node_radius).map(|n| n.id.clone())
    }

    // ── Navigation ──────────────────────────────────────────────────────

    pub fn navigate_to_node(&mut self, id: &str) -> bool {
        let moved = self.navigation.navigate_to_node(&self.tree, id);
        if moved {
            self.tool.cancel();
        }
        moved
    }

    pub fn navigate_back(&mut self) -> bool {
        let moved = self.navigation.navigate_back();
        if moved {
            self.tool.cancel();
        }
        moved
    }

    pub fn navigate_to_stack_index(&mut self, index: usize) -> bool {
        let moved = self.navigation.navigate_to_stack_index(index);
        if moved {
            self.tool.cancel();
        }
        moved
    }

    pub fn breadcrumbs(&self) -> Vec<Breadcrumb> {
        self.navigation.breadcrumbs(&self.tree)
    }

    pub fn selected(&self) -> Option<&str> {
        self.navigation.selected()
    }

    /// Select a node on the current level; unknown ids clear the selection
    pub fn select(&mut self, id: Option<&str>) {
        match id.filter(|id| self.current_node().find_child_by_id(id).is_some()) {
            Some(id) => self.navigation.select(id),
            None => self.navigation.clear_selection(),
        }
    }

    // ── Connections ─────────────────────────────────────────────────────

    /// Begin connecting from a node on the current level
    pub fn start_connection(&mut self, source_id: &str) -> bool {
        if self.current_node().find_child_by_id(source_id).is_none() {
            return false;
        }
        self.tool.start(source_id);
        true
    }

    pub fn update_temp_connection(&mut self, world_x: f32, world_y: f32) {
        self.tool.update_preview(Pos2::new(world_x, world_y));
    }

    pub fn cancel_connection(&mut self) {
        self.tool.cancel();
    }

    /// Complete the pending connection; rejections are reported as notices
    pub fn finish_connection(&mut self, target_id: &str, label: Option<String>) -> Option<Connection> {
        let now = self.now();
        let result = self.tool.finish(
            &mut self.connections,
            &self.tree,
            target_id,
            label,
            self.ids.as_mut(),
            now,
        );
        match result {
            Ok(connection) => {
                self.dirty = true;
                Some(connection)
            }
            Err(ConnectRejection::SelfConnection | ConnectRejection::NotPending) => None,
            Err(rejection @ ConnectRejection::Duplicate { .. }) => {
                log::debug!("{}", rejection);
                self.notices.warning("These nodes are already connected");
                None
            }
            Err(rejection) => {
                self.notices.warning(rejection.to_string());
                None
            }
        }
    }

    pub fn delete_connection(&mut self, id: &str) -> bool {
        let removed = self.connections.delete_connection(id);
        self.dirty |= removed;
        removed
    }

    pub fn set_connection_label(&mut self, id: &str, label: Option<String>) -> bool {
        match self.connections.get_mut(id) {
            Some(connection) => {
                connection.label = label.filter(|l| !l.trim().is_empty());
                self.dirty = true;
                true
            }
            None => false,
        }
    }

    pub fn set_connection_type(&mut self, id: &str, connection_type: ConnectionType) -> bool {
        match self.connections.get_mut(id) {
            Some(connection) => {
                connection.connection_type = connection_type;
                self.dirty = true;
                true
            }
            None => false,
        }
    }

    /// Connections drawn on the current level
    pub fn connections_for_level(&self) -> Vec<&Connection> {
        self.connections.connections_for_level(self.current_node())
    }

    /// Connection ids touching a node, computed from the graph
    pub fn connection_ids_for_node(&self, id: &str) -> Vec<String> {
        self.connections.connection_ids_for_node(id)
    }

    // ── AI suggestions ──────────────────────────────────────────────────

    /// Attach AI-suggested children to `target_id`.
    ///
    /// The target may have been deleted while the request was in flight; in
    /// that case nothing is added. Returns how many nodes were created.
    pub fn apply_suggestions(&mut self, target_id: &str, suggestions: &[SuggestedNode]) -> usize {
        let Some(target) = self.tree.find(target_id) else {
            log::warn!("Discarding suggestions for missing node {}", target_id);
            return 0;
        };
        let fallback_type = target.node_type.child_type().unwrap_or(NodeType::Code);
        let existing = target.children.iter().map(Node::position);
        let center = if target.has_children() {
            geometry::centroid(existing)
        } else {
            Pos2::ZERO
        };

        let usable: Vec<&SuggestedNode> = suggestions.iter().filter(|s| !s.name.trim().is_empty()).collect();
        let ring_radius = self.node_radius * 3.0 + 10.0 * usable.len() as f32;
        let positions = geometry::ring_layout(center, ring_radius, usable.len());

        let mut added = 0;
        for (suggestion, position) in usable.into_iter().zip(positions) {
            let node_type = suggestion.node_type.unwrap_or(fallback_type);
            let mut node = self.create_node(suggestion.name.trim(), node_type, 0.0, 0.0);
            node.set_position(position);
            node.metadata.description = suggestion.description.clone();
            match self.add_child(target_id, node) {
                Ok(()) => added += 1,
                Err(e) => log::warn!("Skipping suggestion {}: {}", suggestion.name, e),
            }
        }
        added
    }

    // ── Documents ───────────────────────────────────────────────────────

    pub fn export_document(&self, stamp: DocumentStamp) -> Document {
        Document::from_model(&self.tree, &self.connections, stamp, self.now())
    }

    /// Replace the model with a parsed document; the model is untouched on error
    pub fn load_document(&mut self, document: Document) -> Result<(), DocumentError> {
        let (tree, graph) = document.into_model()?;
        self.replace_model(tree, graph);
        self.dirty = false;
        Ok(())
    }

    /// Import JSON text, reporting the outcome as a notice
    pub fn import_document(&mut self, json: &str) -> Result<(), DocumentError> {
        let result = Document::from_json(json).and_then(|doc| self.load_document(doc));
        match &result {
            Ok(()) => {
                self.dirty = true;
                self.notices.success(format!("Imported \"{}\"", self.tree.root().name));
            }
            Err(e) => {
                log::warn!("Import rejected: {}", e);
                self.notices.error(format!("Import failed: {}", e));
            }
        }
        result
    }

    fn replace_model(&mut self, tree: NodeTree, graph: ConnectionGraph) {
        self.navigation.reset(tree.root_id());
        self.tree = tree;
        self.connections = graph;
        self.tool.cancel();
        self.viewport.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::editor::services::{FixedClock, NoticeLevel, SequentialIds};

    fn editor() -> EditorState {
        EditorState::with_services("A", Box::new(SequentialIds::default()), Box::new(FixedClock(1_000)))
    }

    #[test]
    fn test_create_node_defaults() {
        let mut state = editor();
        let node = state.create_node("", NodeType::Logic, 1.0, 2.0);
        assert_eq!(node.id, "node_2");
        assert_eq!(node.metadata.created_at, 1_000);
        assert_eq!(node.metadata.modified_at, 1_000);
        assert!(node.metadata.description.is_empty());
        assert!(!node.has_children());
    }

    #[test]
    fn test_add_node_on_current_level() {
        let mut state = editor();
        assert_eq!(state.default_child_type(), NodeType::Process);
        let id = state.add_node("B", NodeType::Process, Pos2::new(10.0, 0.0)).unwrap();
        assert_eq!(state.current_level().len(), 1);
        assert_eq!(state.current_level()[0].id, id);
        assert!(state.is_dirty());
    }

    #[test]
    fn test_hit_test_through_viewport() {
        let mut state = editor();
        let id = state.add_node("B", NodeType::Process, Pos2::new(100.0, 100.0)).unwrap();
        state.viewport.set_zoom(2.0);
        state.viewport.pan = eframe::egui::Vec2::new(50.0, 0.0);
        assert_eq!(state.hit_test_node(Pos2::new(250.0, 200.0)), Some(id));
        assert_eq!(state.hit_test_node(Pos2::new(50.0, 0.0)), None);
    }

    #[test]
    fn test_delete_cascades_connections() {
        let mut state = editor();
        let b = state.add_node("B", NodeType::Process, Pos2::ZERO).unwrap();
        let c = state.add_node("C", NodeType::Process, Pos2::ZERO).unwrap();
        let b1 = state.create_node("B1", NodeType::Logic, 0.0, 0.0);
        let b2 = state.create_node("B2", NodeType::Logic, 0.0, 0.0);
        let (b1_id, b2_id) = (b1.id.clone(), b2.id.clone());
        state.add_child(&b, b1).unwrap();
        state.add_child(&b, b2).unwrap();

        state.start_connection(&b);
        state.finish_connection(&c, None).unwrap();
        assert!(state.navigate_to_node(&b));
        state.start_connection(&b1_id);
        state.finish_connection(&b2_id, Some("inner".into())).unwrap();
        assert_eq!(state.connections().len(), 2);

        assert!(state.navigate_back());
        assert!(state.delete_node(&b));
        assert!(state.connections().is_empty());
        assert!(state.connection_ids_for_node(&c).is_empty());
        assert!(!state.tree().contains(&b1_id));
    }

    #[test]
    fn test_delete_current_level_repairs_navigation() {
        let mut state = editor();
        let b = state.add_node("B", NodeType::Process, Pos2::ZERO).unwrap();
        let b1 = state.create_node("B1", NodeType::Logic, 0.0, 0.0);
        let b1_id = b1.id.clone();
        state.add_child(&b, b1).unwrap();
        state.navigate_to_node(&b);
        state.select(Some(&b1_id));

        assert!(state.delete_node(&b1_id));
        assert_eq!(state.navigation().depth(), 1);
        assert_eq!(state.selected(), None);
    }

    #[test]
    fn test_root_cannot_be_deleted() {
        let mut state = editor();
        let root = state.tree().root_id().to_string();
        assert!(!state.delete_node(&root));
        assert_eq!(state.notices.drain()[0].level, NoticeLevel::Warning);
    }

    #[test]
    fn test_duplicate_connection_notifies() {
        let mut state = editor();
        let b = state.add_node("B", NodeType::Process, Pos2::ZERO).unwrap();
        let c = state.add_node("C", NodeType::Process, Pos2::ZERO).unwrap();
        for _ in 0..2 {
            state.start_connection(&b);
            state.update_temp_connection(5.0, 5.0);
            state.finish_connection(&c, None);
        }
        assert_eq!(state.connections().len(), 1);
        assert_eq!(state.notices.drain().len(), 1);
        assert!(!state.tool().is_pending());
    }

    #[test]
    fn test_self_connection_is_silent() {
        let mut state = editor();
        let b = state.add_node("B", NodeType::Process, Pos2::ZERO).unwrap();
        state.start_connection(&b);
        assert!(state.finish_connection(&b, None).is_none());
        assert!(state.connections().is_empty());
        assert!(state.notices.drain().is_empty());
    }

    #[test]
    fn test_start_requires_current_level() {
        let mut state = editor();
        let root = state.tree().root_id().to_string();
        assert!(!state.start_connection(&root));
        assert!(!state.tool().is_pending());
    }

    #[test]
    fn test_navigation_cancels_pending_connection() {
        let mut state = editor();
        let b = state.add_node("B", NodeType::Process, Pos2::ZERO).unwrap();
        let b1 = state.create_node("B1", NodeType::Logic, 0.0, 0.0);
        state.add_child(&b, b1).unwrap();
        state.start_connection(&b);
        assert!(state.navigate_to_node(&b));
        assert!(!state.tool().is_pending());
    }

    #[test]
    fn test_edits_touch_modified_time() {
        let mut state = EditorState::with_services("A", Box::new(SequentialIds::default()), Box::new(FixedClock(5)));
        let b = state.add_node("B", NodeType::Process, Pos2::ZERO).unwrap();
        state.clock = Box::new(FixedClock(9));
        assert!(state.rename_node(&b, "Billing"));
        assert!(state.set_description(&b, "Handles invoices"));
        assert!(state.set_node_type(&b, NodeType::Logic));
        let node = state.tree().find(&b).unwrap();
        assert_eq!(node.name, "Billing");
        assert_eq!(node.node_type, NodeType::Logic);
        assert_eq!(node.metadata.created_at, 5);
        assert_eq!(node.metadata.modified_at, 9);
        assert!(!state.rename_node("missing", "x"));
    }

    #[test]
    fn test_apply_suggestions() {
        let mut state = editor();
        let b = state.add_node("B", NodeType::Process, Pos2::ZERO).unwrap();
        let suggestions = vec![
            SuggestedNode { name: "Validate".into(), node_type: None, description: "check input".into() },
            SuggestedNode { name: "  ".into(), node_type: None, description: String::new() },
            SuggestedNode { name: "Persist".into(), node_type: Some(NodeType::Code), description: String::new() },
        ];
        assert_eq!(state.apply_suggestions(&b, &suggestions), 2);
        let node = state.tree().find(&b).unwrap();
        assert_eq!(node.children[0].node_type, NodeType::Logic);
        assert_eq!(node.children[0].metadata.description, "check input");
        assert_eq!(node.children[1].node_type, NodeType::Code);

        assert!(state.delete_node(&b));
        assert_eq!(state.apply_suggestions(&b, &suggestions), 0);
    }

    #[test]
    fn test_failed_import_keeps_model() {
        let mut state = editor();
        state.add_node("B", NodeType::Process, Pos2::ZERO).unwrap();
        let before = state.tree().clone();
        let bad = r#"{ "version": "1.0.0", "rootNode": { "name": "X", "type": "domain" } }"#;
        assert!(state.import_document(bad).is_err());
        assert_eq!(state.tree(), &before);
        assert_eq!(state.notices.drain().last().map(|n| n.level), Some(NoticeLevel::Error));
    }

    #[test]
    fn test_import_resets_navigation() {
        let mut state = editor();
        let b = state.add_node("B", NodeType::Process, Pos2::ZERO).unwrap();
        let b1 = state.create_node("B1", NodeType::Logic, 0.0, 0.0);
        state.add_child(&b, b1).unwrap();
        let json = state.export_document(DocumentStamp::Exported).to_json_pretty().unwrap();

        state.navigate_to_node(&b);
        state.import_document(&json).unwrap();
        assert_eq!(state.navigation().depth(), 1);
        assert_eq!(state.tree().node_count(), 3);
    }
}
