//! AI child suggestions.
//!
//! This module provides functionality to:
//! - Describe a node and its surroundings as a prompt
//! - Call a messages-style HTTP endpoint off the UI thread
//! - Parse the suggested children out of the reply

pub mod client;

pub use client::{SuggestionClient, SuggestionWorker};

use serde::Deserialize;

use crate::editor::{NodeId, NodeTree, NodeType};
use crate::error::AiError;

/// One proposed child node
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuggestedNode {
    pub name: String,
    /// `None` means "use the target's natural child type"
    pub node_type: Option<NodeType>,
    pub description: String,
}

/// Everything the prompt needs to know about the target node
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuggestionRequest {
    pub target_id: NodeId,
    pub target_name: String,
    pub target_type: NodeType,
    pub description: String,
    /// Names from the root down to the target's parent
    pub ancestry: Vec<String>,
    pub existing_children: Vec<String>,
    pub max_suggestions: usize,
}

/// Result delivered back to the UI, tagged with the node it was asked for
#[derive(Debug)]
pub struct SuggestionOutcome {
    pub target_id: NodeId,
    pub result: Result<Vec<SuggestedNode>, AiError>,
}

impl SuggestionRequest {
    /// Snapshot the target node; `None` if it is not in the tree
    pub fn for_node(tree: &NodeTree, id: &str, max_suggestions: usize) -> Option<Self> {
        let node = tree.find(id)?;
        let ancestry = tree
            .path_to(id)?
            .iter()
            .filter(|ancestor| ancestor.as_str() != id)
            .filter_map(|ancestor| tree.find(ancestor).map(|n| n.name.clone()))
            .collect();
        Some(Self {
            target_id: node.id.clone(),
            target_name: node.name.clone(),
            target_type: node.node_type,
            description: node.metadata.description.clone(),
            ancestry,
            existing_children: node.children.iter().map(|c| c.name.clone()).collect(),
            max_suggestions: max_suggestions.max(1),
        })
    }

    /// Code nodes are leaves and never get generated children
    pub fn validate(&self) -> Result<NodeType, AiError> {
        self.target_type
            .child_type()
            .ok_or(AiError::UnsupportedTarget(self.target_type))
    }
}

/// Build the user prompt for a request
pub fn build_prompt(request: &SuggestionRequest) -> String {
    let child_type = request.target_type.child_type().unwrap_or(NodeType::Code);
    let mut prompt = format!(
        "You are helping design the structure of a software application.\n\
         The structure is a tree of nodes typed domain > process > logic > code.\n\n\
         Target node: \"{}\" ({})\n",
        request.target_name,
        request.target_type.as_str()
    );
    if !request.description.trim().is_empty() {
        prompt.push_str(&format!("Description: {}\n", request.description.trim()));
    }
    if !request.ancestry.is_empty() {
        prompt.push_str(&format!("Located under: {}\n", request.ancestry.join(" > ")));
    }
    if !request.existing_children.is_empty() {
        prompt.push_str(&format!(
            "Existing children (do not repeat): {}\n",
            request.existing_children.join(", ")
        ));
    }
    prompt.push_str(&format!(
        "\nSuggest up to {} child nodes, normally of type \"{}\".\n\
         Reply with only a JSON array of objects with the keys \
         \"name\", \"type\" and \"description\".",
        request.max_suggestions,
        child_type.as_str()
    ));
    prompt
}

#[derive(Deserialize)]
struct RawSuggestion {
    #[serde(default)]
    name: String,
    #[serde(default, rename = "type")]
    node_type: Option<String>,
    #[serde(default)]
    description: Option<String>,
}

/// Extract suggested children from reply text.
///
/// The reply may wrap the array in prose or a code fence; the outermost
/// `[...]` is parsed. Unknown type strings become `None`, nameless entries
/// are dropped, and at most `max` entries are kept.
pub fn parse_suggestions(text: &str, max: usize) -> Result<Vec<SuggestedNode>, AiError> {
    let (Some(start), Some(end)) = (text.find('['), text.rfind(']')) else {
        return Err(AiError::InvalidResponse("no JSON array in reply".into()));
    };
    if end < start {
        return Err(AiError::InvalidResponse("no JSON array in reply".into()));
    }
    let raw: Vec<RawSuggestion> = serde_json::from_str(&text[start..=end])
        .map_err(|e| AiError::InvalidResponse(e.to_string()))?;

    Ok(raw
        .into_iter()
        .filter(|s| !s.name.trim().is_empty())
        .take(max)
        .map(|s| SuggestedNode {
            name: s.name.trim().to_string(),
            node_type: s
                .node_type
                .and_then(|t| NodeType::parse(&t.trim().to_lowercase())),
            description: s.description.unwrap_or_default(),
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::editor::Node;
    use eframe::egui::Pos2;

    fn tree() -> NodeTree {
        let mut root = Node::new("root", "Shop", NodeType::Domain, 0.0, 0.0, 0);
        let mut checkout = Node::new("checkout", "Checkout", NodeType::Process, 0.0, 0.0, 0);
        checkout.metadata.description = "Turns a cart into an order".into();
        checkout.children.push(Node::new("validate", "Validate cart", NodeType::Logic, 0.0, 0.0, 0));
        checkout
            .children
            .push(Node::new("charge", "Charge", NodeType::Code, 0.0, 0.0, 0));
        root.children.push(checkout);
        NodeTree::new(root)
    }

    #[test]
    fn test_request_for_node() {
        let request = SuggestionRequest::for_node(&tree(), "checkout", 5).unwrap();
        assert_eq!(request.ancestry, vec!["Shop"]);
        assert_eq!(request.existing_children, vec!["Validate cart", "Charge"]);
        assert_eq!(request.validate(), Ok(NodeType::Logic));
        assert!(SuggestionRequest::for_node(&tree(), "missing", 5).is_none());
    }

    #[test]
    fn test_code_target_rejected() {
        let request = SuggestionRequest::for_node(&tree(), "charge", 5).unwrap();
        assert!(matches!(request.validate(), Err(AiError::UnsupportedTarget(NodeType::Code))));
    }

    #[test]
    fn test_prompt_mentions_context() {
        let prompt = build_prompt(&SuggestionRequest::for_node(&tree(), "checkout", 4).unwrap());
        assert!(prompt.contains("\"Checkout\" (process)"));
        assert!(prompt.contains("Turns a cart into an order"));
        assert!(prompt.contains("Located under: Shop"));
        assert!(prompt.contains("do not repeat): Validate cart, Charge"));
        assert!(prompt.contains("up to 4 child nodes"));
        assert!(prompt.contains("\"logic\""));
    }

    #[test]
    fn test_parse_fenced_reply() {
        let reply = "Here you go:\n```json\n[\n  {\"name\": \"Apply coupon\", \"type\": \"logic\", \"description\": \"Discounts\"},\n  {\"name\": \"Tax\", \"type\": \"gizmo\"},\n  {\"name\": \"  \"}\n]\n```";
        let parsed = parse_suggestions(reply, 10).unwrap();
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0].node_type, Some(NodeType::Logic));
        assert_eq!(parsed[0].description, "Discounts");
        assert_eq!(parsed[1].node_type, None);
        assert!(parsed[1].description.is_empty());
    }

    #[test]
    fn test_parse_limits_and_errors() {
        let reply = r#"[{"name":"a"},{"name":"b"},{"name":"c"}]"#;
        assert_eq!(parse_suggestions(reply, 2).unwrap().len(), 2);
        assert!(matches!(parse_suggestions("no idea", 3), Err(AiError::InvalidResponse(_))));
        assert!(matches!(parse_suggestions("] oops [", 3), Err(AiError::InvalidResponse(_))));
        assert!(matches!(parse_suggestions("[{\"name\": 3}]", 3), Err(AiError::InvalidResponse(_))));
    }
}
