//! Suggestion Client - HTTP client for the messages-style AI endpoint.
//!
//! Requests are blocking (`ureq`), so the UI hands them to
//! [`SuggestionWorker`], which runs each on its own thread and delivers the
//! outcome over a channel polled once per frame.

use serde::{Deserialize, Serialize};
use std::sync::mpsc;
use std::time::Duration;

use super::{build_prompt, parse_suggestions, SuggestedNode, SuggestionOutcome, SuggestionRequest};
use crate::config::AiConfig;
use crate::editor::NodeId;
use crate::error::AiError;

const API_VERSION: &str = "2023-06-01";
const MAX_TOKENS: u32 = 1024;

/// Request body
#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: Vec<Message<'a>>,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'a str,
    content: String,
}

/// Response body; only text blocks are read
#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(default, rename = "type")]
    kind: String,
    #[serde(default)]
    text: String,
}

/// Client for suggestion requests
#[derive(Clone)]
pub struct SuggestionClient {
    endpoint: String,
    model: String,
    api_key: Option<String>,
    api_key_env: String,
    http_client: ureq::Agent,
}

impl SuggestionClient {
    /// Create a new client; the key is read from the configured variable
    pub fn new(config: &AiConfig, timeout: Duration) -> Self {
        Self {
            endpoint: config.endpoint.clone(),
            model: config.model.clone(),
            api_key: config.api_key(),
            api_key_env: config.api_key_env.clone(),
            http_client: ureq::AgentBuilder::new().timeout(timeout).build(),
        }
    }

    pub fn api_key_env(&self) -> &str {
        &self.api_key_env
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    /// Ask for children of the request's target node
    pub fn suggest(&self, request: &SuggestionRequest) -> Result<Vec<SuggestedNode>, AiError> {
        request.validate()?;
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| AiError::MissingApiKey(self.api_key_env.clone()))?;

        let body = MessagesRequest {
            model: &self.model,
            max_tokens: MAX_TOKENS,
            messages: vec![Message {
                role: "user",
                content: build_prompt(request),
            }],
        };

        log::info!("Requesting suggestions for {} ({})", request.target_name, request.target_id);
        let response = self
            .http_client
            .post(&self.endpoint)
            .set("x-api-key", api_key)
            .set("anthropic-version", API_VERSION)
            .send_json(&body);

        let response = match response {
            Ok(response) => response,
            Err(ureq::Error::Status(status, response)) => {
                let message = response.into_string().unwrap_or_default();
                return Err(classify_status(status, &message));
            }
            Err(ureq::Error::Transport(transport)) => {
                return Err(AiError::Network(transport.to_string()));
            }
        };

        let reply: MessagesResponse = response
            .into_json()
            .map_err(|e| AiError::InvalidResponse(e.to_string()))?;
        let text = reply_text(&reply);
        let suggestions = parse_suggestions(&text, request.max_suggestions)?;
        log::debug!("Received {} suggestions", suggestions.len());
        Ok(suggestions)
    }
}

/// Map a non-success HTTP status to an error
pub fn classify_status(status: u16, body: &str) -> AiError {
    match status {
        401 | 403 => AiError::Authentication,
        429 => AiError::RateLimited,
        _ => AiError::Server {
            status,
            message: error_message(body),
        },
    }
}

/// `error.message` from a JSON error body, or the trimmed body itself
fn error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.pointer("/error/message").and_then(|m| m.as_str()).map(String::from))
        .unwrap_or_else(|| body.trim().chars().take(200).collect())
}

fn reply_text(reply: &MessagesResponse) -> String {
    reply
        .content
        .iter()
        .filter(|block| block.kind == "text" || block.kind.is_empty())
        .map(|block| block.text.as_str())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Runs one suggestion request at a time off the UI thread
#[derive(Default)]
pub struct SuggestionWorker {
    receiver: Option<mpsc::Receiver<SuggestionOutcome>>,
    in_flight: Option<NodeId>,
}

impl SuggestionWorker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Node the running request is for
    pub fn in_flight(&self) -> Option<&str> {
        self.in_flight.as_deref()
    }

    /// Start a request; returns false while another one is running
    pub fn spawn(&mut self, client: SuggestionClient, request: SuggestionRequest) -> bool {
        if self.is_busy() {
            return false;
        }
        let target = request.target_id.clone();
        let job = move || {
            let result = client.suggest(&request);
            SuggestionOutcome {
                target_id: request.target_id,
                result,
            }
        };

        let (tx, rx) = mpsc::channel();
        let spawned = std::thread::Builder::new()
            .name("arbor-ai".into())
            .spawn(move || {
                // The receiver may be gone if the app closed mid-request
                let _ = tx.send(job());
            });
        match spawned {
            Ok(_) => {
                self.receiver = Some(rx);
                self.in_flight = Some(target);
                true
            }
            Err(e) => {
                log::error!("Could not start AI worker: {}", e);
                false
            }
        }
    }

    /// Collect a finished outcome, if any
    pub fn poll(&mut self) -> Option<SuggestionOutcome> {
        let receiver = self.receiver.as_ref()?;
        match receiver.try_recv() {
            Ok(outcome) => {
                self.receiver = None;
                self.in_flight = None;
                Some(outcome)
            }
            Err(mpsc::TryRecvError::Empty) => None,
            Err(mpsc::TryRecvError::Disconnected) => {
                let target_id = self.in_flight.take().unwrap_or_default();
                self.receiver = None;
                Some(SuggestionOutcome {
                    target_id,
                    result: Err(AiError::Network("suggestion worker stopped".into())),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::editor::NodeType;

    fn request(node_type: NodeType) -> SuggestionRequest {
        SuggestionRequest {
            target_id: "node_1".into(),
            target_name: "Checkout".into(),
            target_type: node_type,
            description: String::new(),
            ancestry: vec![],
            existing_children: vec![],
            max_suggestions: 3,
        }
    }

    fn client() -> SuggestionClient {
        let config = AiConfig {
            api_key_env: "ARBOR_TEST_KEY_THAT_IS_NEVER_SET".into(),
            ..AiConfig::default()
        };
        SuggestionClient::new(&config, Duration::from_secs(1))
    }

    #[test]
    fn test_classify_status() {
        assert_eq!(classify_status(401, ""), AiError::Authentication);
        assert_eq!(classify_status(403, ""), AiError::Authentication);
        assert_eq!(classify_status(429, ""), AiError::RateLimited);
        assert_eq!(
            classify_status(500, r#"{"error":{"message":"overloaded"}}"#),
            AiError::Server { status: 500, message: "overloaded".into() }
        );
        assert_eq!(
            classify_status(502, "  bad gateway \n"),
            AiError::Server { status: 502, message: "bad gateway".into() }
        );
    }

    #[test]
    fn test_reply_text_joins_text_blocks() {
        let reply: MessagesResponse = serde_json::from_str(
            r#"{"content":[{"type":"text","text":"[{\"name\":"},{"type":"tool_use"},{"type":"text","text":"\"A\"}]"}]}"#,
        )
        .unwrap();
        let text = reply_text(&reply);
        assert_eq!(parse_suggestions(&text, 5).unwrap()[0].name, "A");
    }

    #[test]
    fn test_missing_key_and_code_target() {
        let client = client();
        assert!(!client.has_api_key());
        assert_eq!(client.api_key_env(), "ARBOR_TEST_KEY_THAT_IS_NEVER_SET");
        assert!(matches!(
            client.suggest(&request(NodeType::Process)),
            Err(AiError::MissingApiKey(_))
        ));
        assert!(matches!(
            client.suggest(&request(NodeType::Code)),
            Err(AiError::UnsupportedTarget(NodeType::Code))
        ));
    }

    #[test]
    fn test_worker_delivers_outcome_once() {
        let mut worker = SuggestionWorker::new();
        assert!(worker.spawn(client(), request(NodeType::Process)));
        assert!(worker.is_busy());
        assert_eq!(worker.in_flight(), Some("node_1"));
        assert!(!worker.spawn(client(), request(NodeType::Process)));

        let outcome = loop {
            if let Some(outcome) = worker.poll() {
                break outcome;
            }
            std::thread::sleep(Duration::from_millis(5));
        };
        assert_eq!(outcome.target_id, "node_1");
        assert!(matches!(outcome.result, Err(AiError::MissingApiKey(_))));
        assert!(!worker.is_busy());
        assert_eq!(worker.in_flight(), None);
        assert!(worker.poll().is_none());
    }
}
