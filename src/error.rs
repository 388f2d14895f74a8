//! Error types for arbor-studio

use thiserror::Error;

use crate::editor::{NodeId, NodeType};

/// Failures reading or writing a structure document
#[derive(Error, Debug)]
pub enum DocumentError {
    #[error("Invalid document format: {0}")]
    InvalidFormat(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Rejected tree mutations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TreeError {
    #[error("Node {0} already has a parent")]
    AlreadyAttached(NodeId),

    #[error("Node {0} not found")]
    NotFound(NodeId),
}

/// Reasons the connection tool refuses to create an edge.
///
/// These are ordinary outcomes of user input, not faults: the editor turns
/// them into notifications and leaves the graph untouched.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConnectRejection {
    #[error("No connection is in progress")]
    NotPending,

    #[error("A node cannot connect to itself")]
    SelfConnection,

    #[error("Connection from {source_id} to {target_id} already exists")]
    Duplicate { source_id: NodeId, target_id: NodeId },

    #[error("Only nodes on the same level can be connected")]
    NotSiblings,

    #[error("Node {0} not found")]
    UnknownNode(NodeId),

    #[error("Connection id {0} is already in use")]
    DuplicateId(String),
}

/// Failures from the AI suggestion collaborator
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AiError {
    #[error("No API key configured (set {0})")]
    MissingApiKey(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Authentication rejected by the AI service")]
    Authentication,

    #[error("Rate limited by the AI service")]
    RateLimited,

    #[error("AI service returned status {status}: {message}")]
    Server { status: u16, message: String },

    #[error("Invalid AI response: {0}")]
    InvalidResponse(String),

    #[error("{0} nodes cannot have generated children")]
    UnsupportedTarget(NodeType),
}

impl AiError {
    /// Short message suitable for a toast
    pub fn user_message(&self) -> String {
        match self {
            AiError::MissingApiKey(var) => {
                format!("AI suggestions need an API key. Set {} and try again.", var)
            }
            AiError::Network(_) => {
                "Could not reach the AI service. Check your connection.".to_string()
            }
            AiError::Authentication => "The AI service rejected the API key.".to_string(),
            AiError::RateLimited => {
                "Too many AI requests. Wait a moment and try again.".to_string()
            }
            AiError::Server { status, .. } => format!("The AI service failed ({}).", status),
            AiError::InvalidResponse(_) => {
                "The AI service returned suggestions that could not be read.".to_string()
            }
            AiError::UnsupportedTarget(node_type) => {
                format!("{} nodes are leaves and hold code instead of children.", node_type.label())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ai_messages_are_distinct() {
        let errors = [
            AiError::MissingApiKey("KEY".into()),
            AiError::Network("refused".into()),
            AiError::Authentication,
            AiError::RateLimited,
            AiError::Server { status: 500, message: "boom".into() },
            AiError::InvalidResponse("not json".into()),
            AiError::UnsupportedTarget(NodeType::Code),
        ];
        let messages: std::collections::HashSet<String> =
            errors.iter().map(|e| e.user_message()).collect();
        assert_eq!(messages.len(), errors.len());
    }

    #[test]
    fn test_duplicate_display() {
        let err = ConnectRejection::Duplicate {
            source_id: "a".into(),
            target_id: "b".into(),
        };
        assert_eq!(err.to_string(), "Connection from a to b already exists");
    }
}
