//! Pointer hit-testing against the nodes of one level

use eframe::egui::Pos2;

use super::node::Node;

/// Topmost node whose circle contains `world`.
///
/// Later siblings are drawn above earlier ones, so the scan runs in reverse
/// insertion order.
pub fn hit_test<'a>(level: &'a [Node], world: Pos2, radius: f32) -> Option<&'a Node> {
    level.iter().rev().find(|node| node.contains_point(world, radius))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::editor::node::NodeType;

    fn node(id: &str, x: f64, y: f64) -> Node {
        Node::new(id, id, NodeType::Process, x, y, 0)
    }

    #[test]
    fn test_topmost_wins_on_overlap() {
        let level = vec![node("under", 0.0, 0.0), node("over", 30.0, 0.0)];
        let hit = hit_test(&level, Pos2::new(15.0, 0.0), 40.0);
        assert_eq!(hit.map(|n| n.id.as_str()), Some("over"));
    }

    #[test]
    fn test_boundary_and_miss() {
        let level = vec![node("a", 0.0, 0.0)];
        assert!(hit_test(&level, Pos2::new(40.0, 0.0), 40.0).is_some());
        assert!(hit_test(&level, Pos2::new(28.3, 28.3), 40.0).is_none());
        assert!(hit_test(&[], Pos2::ZERO, 40.0).is_none());
    }
}
