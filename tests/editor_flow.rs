//! End-to-end editing scenarios against the public API

use arbor_studio::document::{Document, DocumentStamp};
use arbor_studio::editor::{EditorState, FixedClock, NodeType, NoticeLevel, SequentialIds};
use eframe::egui::{Pos2, Vec2};

fn editor(root: &str) -> EditorState {
    EditorState::with_services(root, Box::new(SequentialIds::default()), Box::new(FixedClock(1_700_000_000_000)))
}

#[test]
fn connect_two_siblings_with_label() {
    let mut state = editor("A");
    let b = state.add_node("B", NodeType::Process, Pos2::new(-100.0, 0.0)).unwrap();
    let c = state.add_node("C", NodeType::Process, Pos2::new(100.0, 0.0)).unwrap();

    assert!(state.start_connection(&b));
    state.update_temp_connection(20.0, 5.0);
    let connection = state.finish_connection(&c, Some("flow".to_string())).unwrap();
    assert_eq!(connection.source_id, b);
    assert_eq!(connection.target_id, c);
    assert_eq!(connection.label.as_deref(), Some("flow"));

    let level = state.connections_for_level();
    assert_eq!(level.len(), 1);
    assert_eq!(level[0].id, connection.id);
    assert_eq!(state.connection_ids_for_node(&b), vec![connection.id.clone()]);
    assert_eq!(state.connection_ids_for_node(&c), vec![connection.id]);

    // B is a leaf
    assert!(!state.navigate_to_node(&b));
    assert_eq!(state.navigation().depth(), 1);
}

#[test]
fn duplicate_finish_keeps_one_connection() {
    let mut state = editor("A");
    let b = state.add_node("B", NodeType::Process, Pos2::ZERO).unwrap();
    let c = state.add_node("C", NodeType::Process, Pos2::ZERO).unwrap();

    state.start_connection(&b);
    assert!(state.finish_connection(&c, None).is_some());
    state.start_connection(&b);
    assert!(state.finish_connection(&c, None).is_none());

    assert_eq!(state.connections().len(), 1);
    let notices = state.notices.drain();
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].level, NoticeLevel::Warning);

    // The reverse direction is a different pair
    state.start_connection(&c);
    assert!(state.finish_connection(&b, None).is_some());
    assert_eq!(state.connections().len(), 2);
}

#[test]
fn zoom_keeps_point_under_cursor() {
    let mut state = editor("A");
    let anchor = Pos2::new(400.0, 300.0);
    let before = state.viewport.screen_to_world(anchor);

    state.viewport.wheel(anchor, 1.0);
    assert!((state.viewport.zoom() - 1.1).abs() < 1e-6);
    let after = state.viewport.screen_to_world(anchor);
    assert!((before - after).length() < 1e-3);

    let back = state.viewport.world_to_screen(after);
    assert!((back - anchor).length() < 1e-3);
}

#[test]
fn pan_then_hit_test() {
    let mut state = editor("A");
    let b = state.add_node("B", NodeType::Process, Pos2::new(0.0, 0.0)).unwrap();
    state.viewport.pan_by(Vec2::new(300.0, 200.0));
    assert_eq!(state.hit_test_node(Pos2::new(310.0, 210.0)), Some(b));
    assert_eq!(state.hit_test_node(Pos2::new(10.0, 10.0)), None);
}

#[test]
fn import_without_root_id_is_rejected() {
    let mut state = editor("A");
    state.add_node("B", NodeType::Process, Pos2::ZERO).unwrap();
    let before = state.export_document(DocumentStamp::Saved);

    let bad = r#"{ "version": "1.0.0", "rootNode": { "name": "Other", "type": "domain", "x": 0, "y": 0 } }"#;
    assert!(state.import_document(bad).is_err());

    assert_eq!(state.export_document(DocumentStamp::Saved), before);
    let notices = state.notices.drain();
    assert_eq!(notices.last().map(|n| n.level), Some(NoticeLevel::Error));
}

#[test]
fn drill_down_and_back() {
    let mut state = editor("Shop");
    let checkout = state.add_node("Checkout", NodeType::Process, Pos2::ZERO).unwrap();
    let cart = state.create_node("Cart", NodeType::Logic, 0.0, 0.0);
    let cart_id = cart.id.clone();
    state.add_child(&checkout, cart).unwrap();
    let pay = state.create_node("Pay", NodeType::Code, 0.0, 0.0);
    state.add_child(&cart_id, pay).unwrap();

    assert!(!state.navigate_back());
    assert!(state.navigate_to_node(&checkout));
    assert!(state.navigate_to_node(&cart_id));
    assert_eq!(state.navigation().depth(), 3);
    assert_eq!(state.current_node().name, "Cart");

    let crumbs: Vec<String> = state.breadcrumbs().into_iter().map(|c| c.name).collect();
    assert_eq!(crumbs, vec!["Shop", "Checkout", "Cart"]);

    assert!(state.navigate_to_stack_index(0));
    assert_eq!(state.navigation().depth(), 1);
    assert!(!state.navigate_to_stack_index(5));
}

#[test]
fn export_import_round_trip() {
    let mut state = editor("Shop");
    let b = state.add_node("Checkout", NodeType::Process, Pos2::new(-80.0, 12.5)).unwrap();
    let c = state.add_node("Shipping", NodeType::Process, Pos2::new(80.0, 12.5)).unwrap();
    state.set_description(&b, "Takes payment");
    state.start_connection(&b);
    state.finish_connection(&c, Some("order".into())).unwrap();

    let json = state.export_document(DocumentStamp::Exported).to_json_pretty().unwrap();
    let mut other = editor("Empty");
    other.import_document(&json).unwrap();

    assert_eq!(other.tree(), state.tree());
    assert_eq!(other.connections(), state.connections());
    let reexported = other.export_document(DocumentStamp::Exported);
    assert_eq!(reexported, Document::from_json(&json).unwrap());
}

#[test]
fn subtree_with_repeated_ids_is_not_attached() {
    let mut state = editor("Shop");
    let checkout = state.add_node("Checkout", NodeType::Process, Pos2::ZERO).unwrap();
    let mut cart = state.create_node("Cart", NodeType::Logic, 0.0, 0.0);
    let pay = state.create_node("Pay", NodeType::Code, 0.0, 0.0);
    cart.children.push(pay.clone());
    cart.children.push(pay);

    assert!(state.add_child(&checkout, cart).is_err());
    assert_eq!(state.tree().node_count(), 2);
    assert!(!state.navigate_to_node(&checkout));
}

#[test]
fn moved_node_exports_its_new_position() {
    let mut state = editor("Shop");
    let b = state.add_node("B", NodeType::Process, Pos2::new(1.0, 2.0)).unwrap();
    assert!(state.move_node(&b, Pos2::new(-40.5, 80.25)));

    let doc = state.export_document(DocumentStamp::Saved);
    let record = &doc.root_node.children[0];
    assert_eq!((record.x, record.y), (-40.5, 80.25));
}
