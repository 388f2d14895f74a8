//! Text renderings of a structure: code skeleton, outline and stats

use regex::Regex;
use std::collections::HashSet;
use std::fmt::Write as _;
use std::sync::OnceLock;

use crate::document::APP_NAME;
use crate::editor::{ConnectionGraph, Node, NodeTree, NodeType};

/// Stub JavaScript-like module for a structure.
///
/// Every code node becomes a function named after its sanitized path; each
/// level with connections gets its pipeline as comments. The output is a
/// skeleton and is not guaranteed to run.
pub fn generate_code(tree: &NodeTree, graph: &ConnectionGraph) -> String {
    let mut out = String::new();
    let root = tree.root();
    let _ = writeln!(out, "// Generated by {}", APP_NAME);
    let _ = writeln!(out, "// Structure: {}", root.name);

    let mut names = HashSet::new();
    let mut path = Vec::new();
    emit_level(&mut out, root, graph, &mut path, &mut names);
    out
}

fn emit_level(
    out: &mut String,
    node: &Node,
    graph: &ConnectionGraph,
    path: &mut Vec<String>,
    names: &mut HashSet<String>,
) {
    path.push(node.name.clone());

    if node.node_type == NodeType::Code {
        emit_function(out, node, path, names);
    } else if node.has_children() {
        let _ = writeln!(out, "\n// ── {} ({}) ──", path.join(" / "), node.node_type.as_str());
        if !node.metadata.description.trim().is_empty() {
            let _ = writeln!(out, "// {}", node.metadata.description.trim());
        }
        for connection in graph.connections_for_level(node) {
            let name_of = |id: &str| {
                node.find_child_by_id(id)
                    .map(|c| c.name.clone())
                    .unwrap_or_else(|| id.to_string())
            };
            let _ = write!(
                out,
                "// pipeline: {} -> {}",
                name_of(&connection.source_id),
                name_of(&connection.target_id)
            );
            if let Some(label) = &connection.label {
                let _ = write!(out, " [{}]", label);
            }
            if connection.connection_type != crate::editor::ConnectionType::Normal {
                let _ = write!(out, " ({})", connection.connection_type.label());
            }
            out.push('\n');
        }
        for child in &node.children {
            emit_level(out, child, graph, path, names);
        }
    }

    path.pop();
}

fn emit_function(out: &mut String, node: &Node, path: &[String], names: &mut HashSet<String>) {
    let base = path_identifier(path);
    let mut ident = base.clone();
    let mut n = 2;
    while !names.insert(ident.clone()) {
        ident = format!("{}_{}", base, n);
        n += 1;
    }

    out.push('\n');
    if !node.metadata.description.trim().is_empty() {
        let _ = writeln!(out, "/** {} */", node.metadata.description.trim());
    }
    let _ = writeln!(out, "function {}() {{", ident);
    let code = node.metadata.code.trim_end();
    if code.trim().is_empty() {
        let _ = writeln!(out, "  throw new Error(\"not implemented: {}\");", path.join(" / "));
    } else {
        for line in code.lines() {
            if line.trim().is_empty() {
                out.push('\n');
            } else {
                let _ = writeln!(out, "  {}", line);
            }
        }
    }
    out.push_str("}\n");
}

fn separators() -> Option<&'static Regex> {
    static SEPARATORS: OnceLock<Option<Regex>> = OnceLock::new();
    SEPARATORS
        .get_or_init(|| Regex::new(r"[^A-Za-z0-9]+").ok())
        .as_ref()
}

/// Lowercase snake-case identifier for a display name
pub fn sanitize_identifier(name: &str) -> String {
    let replaced = match separators() {
        Some(re) => re.replace_all(name, "_").into_owned(),
        None => name
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
            .collect(),
    };
    replaced.trim_matches('_').to_lowercase()
}

/// Identifier for a node path; the root segment is skipped
pub fn path_identifier(path: &[String]) -> String {
    let parts: Vec<String> = path
        .iter()
        .skip(1)
        .map(|segment| sanitize_identifier(segment))
        .filter(|segment| !segment.is_empty())
        .collect();
    let ident = parts.join("_");
    if ident.is_empty() {
        "node".to_string()
    } else if ident.starts_with(|c: char| c.is_ascii_digit()) {
        format!("_{}", ident)
    } else {
        ident
    }
}

/// Indented outline with connection counts, for terminals
pub fn render_outline(tree: &NodeTree, graph: &ConnectionGraph) -> String {
    fn visit(out: &mut String, node: &Node, graph: &ConnectionGraph, depth: usize) {
        let _ = write!(out, "{}{} {} [{}]", "  ".repeat(depth), node.node_type.icon(), node.name, node.node_type.as_str());
        let outgoing = graph.outgoing(&node.id).count();
        if outgoing > 0 {
            let _ = write!(out, " → {}", outgoing);
        }
        out.push('\n');
        for child in &node.children {
            visit(out, child, graph, depth + 1);
        }
    }
    let mut out = String::new();
    visit(&mut out, tree.root(), graph, 0);
    out
}

/// Counts describing a structure
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StructureStats {
    pub nodes: usize,
    pub domains: usize,
    pub processes: usize,
    pub logic: usize,
    pub code: usize,
    pub connections: usize,
    pub depth: usize,
    /// Code nodes with a non-empty body
    pub implemented: usize,
}

impl StructureStats {
    pub fn collect(tree: &NodeTree, graph: &ConnectionGraph) -> Self {
        let mut stats = Self {
            connections: graph.len(),
            depth: tree.root().depth(),
            ..Self::default()
        };
        tree.root().walk(&mut |node| {
            stats.nodes += 1;
            match node.node_type {
                NodeType::Domain => stats.domains += 1,
                NodeType::Process => stats.processes += 1,
                NodeType::Logic => stats.logic += 1,
                NodeType::Code => {
                    stats.code += 1;
                    if !node.metadata.code.trim().is_empty() {
                        stats.implemented += 1;
                    }
                }
            }
        });
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::editor::Connection;
    use eframe::egui::Pos2;

    fn model() -> (NodeTree, ConnectionGraph) {
        let mut root = Node::new("root", "Shop", NodeType::Domain, 0.0, 0.0, 0);
        let mut checkout = Node::new("checkout", "Checkout Flow", NodeType::Process, 0.0, 0.0, 0);
        let mut charge = Node::new("charge", "Charge card!", NodeType::Code, 0.0, 0.0, 0);
        charge.metadata.code = "const total = order.total;\n\nreturn gateway.charge(total);".into();
        charge.metadata.description = "Bill the customer".into();
        checkout
            .children
            .push(Node::new("validate", "Validate", NodeType::Code, 0.0, 0.0, 0));
        checkout.children.push(charge);
        root.children.push(checkout);

        let mut graph = ConnectionGraph::new();
        graph
            .insert(Connection::new("c1", "validate", "charge", 0).with_label(Some("ok".into())))
            .unwrap();
        (NodeTree::new(root), graph)
    }

    #[test]
    fn test_sanitize_identifier() {
        assert_eq!(sanitize_identifier("Charge card!"), "charge_card");
        assert_eq!(sanitize_identifier("  --Hello,  World-- "), "hello_world");
        assert_eq!(sanitize_identifier("!!!"), "");
        assert_eq!(path_identifier(&["Root".into(), "3D View".into()]), "_3d_view");
        assert_eq!(path_identifier(&["Root".into()]), "node");
    }

    #[test]
    fn test_generate_code() {
        let (tree, graph) = model();
        let code = generate_code(&tree, &graph);
        assert!(code.starts_with("// Generated by Arbor Studio\n// Structure: Shop\n"));
        assert!(code.contains("// ── Shop / Checkout Flow (process) ──"));
        assert!(code.contains("// pipeline: Validate -> Charge card! [ok]"));
        assert!(code.contains(
            "function checkout_flow_validate() {\n  throw new Error(\"not implemented: Shop / Checkout Flow / Validate\");\n}"
        ));
        assert!(code.contains(
            "/** Bill the customer */\nfunction checkout_flow_charge_card() {\n  const total = order.total;\n\n  return gateway.charge(total);\n}"
        ));
    }

    #[test]
    fn test_duplicate_function_names_get_suffix() {
        let mut root = Node::new("root", "App", NodeType::Domain, 0.0, 0.0, 0);
        root.children.push(Node::new("a", "Save", NodeType::Code, 0.0, 0.0, 0));
        root.children.push(Node::new("b", "save", NodeType::Code, 0.0, 0.0, 0));
        let code = generate_code(&NodeTree::new(root), &ConnectionGraph::new());
        assert!(code.contains("function save() {"));
        assert!(code.contains("function save_2() {"));
    }

    #[test]
    fn test_outline_and_stats() {
        let (tree, graph) = model();
        let outline = render_outline(&tree, &graph);
        let lines: Vec<&str> = outline.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[0].ends_with("Shop [domain]"));
        assert!(lines[2].starts_with("    "));
        assert!(lines[2].ends_with("Validate [code] → 1"));

        let stats = StructureStats::collect(&tree, &graph);
        assert_eq!(
            stats,
            StructureStats {
                nodes: 4,
                domains: 1,
                processes: 1,
                logic: 0,
                code: 2,
                connections: 1,
                depth: 3,
                implemented: 1,
            }
        );
    }
}
