//! Gmail API payloads and the structured values the tools return.

use serde::{Deserialize, Serialize};

/// Message as returned by `users.messages.get`.
///
/// Every field defaults when absent so a surprising payload degrades to
/// placeholders instead of a decode failure.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawMessage {
    pub id: String,
    pub label_ids: Vec<String>,
    pub snippet: String,
    pub payload: MessagePart,
}

/// One node of the MIME part tree
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MessagePart {
    pub mime_type: String,
    pub headers: Vec<Header>,
    pub body: PartBody,
    pub parts: Vec<MessagePart>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Header {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PartBody {
    /// base64url-encoded content
    pub data: Option<String>,
    pub size: u64,
}

/// Response of `users.messages.list`
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ListMessagesResponse {
    pub messages: Vec<MessageRef>,
    pub next_page_token: Option<String>,
    pub result_size_estimate: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MessageRef {
    pub id: String,
    pub thread_id: String,
}

/// Message summary handed to the agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmailMessage {
    pub id: String,
    pub subject: String,
    pub sender: String,
    /// Provider-formatted, never parsed
    pub date: String,
    #[serde(default)]
    pub snippet: String,
    /// Only filled by a full fetch
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub is_unread: bool,
}

impl EmailMessage {
    /// Placeholder entry for a message that could not be fetched
    pub fn fetch_error(id: &str, error: impl std::fmt::Display) -> Self {
        Self {
            id: id.to_string(),
            subject: format!("Error reading message: {}", error),
            sender: "Error".to_string(),
            date: "Unknown".to_string(),
            snippet: String::new(),
            body: String::new(),
            is_unread: false,
        }
    }
}

/// Result of a search; `total_found` counts the messages actually returned
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmailSearchResult {
    pub query: String,
    pub total_found: usize,
    pub messages: Vec<EmailMessage>,
}

impl EmailSearchResult {
    pub fn new(query: impl Into<String>, messages: Vec<EmailMessage>) -> Self {
        Self {
            query: query.into(),
            total_found: messages.len(),
            messages,
        }
    }
}
