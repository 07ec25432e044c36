//! Gmail tools - read-only mailbox access
//!
//! Thin adapters from JSON arguments to [`Mailbox`] operations. Mailbox
//! failures come back as text, so the agent always gets something to read.

use async_trait::async_trait;
use serde_json::{json, Value};
use crate::Result;
use crate::error::Error;
use crate::gmail::Mailbox;
use super::Tool;

const DEFAULT_SEARCH_RESULTS: i64 = 10;
const DEFAULT_RECENT_COUNT: i64 = 5;

/// Integer argument, also accepting floats and numeric strings from the model
fn int_param(params: &Value, name: &str, default: i64) -> i64 {
    match params.get(name) {
        Some(Value::Number(n)) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)).unwrap_or(default),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(default),
        _ => default,
    }
}

fn render(value: &Value) -> Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}

/// Search messages with a Gmail query
pub struct SearchGmailTool {
    mailbox: Mailbox,
}

impl SearchGmailTool {
    pub fn new(mailbox: Mailbox) -> Self {
        Self { mailbox }
    }
}

#[async_trait]
impl Tool for SearchGmailTool {
    fn name(&self) -> &str { "search_gmail" }
    fn description(&self) -> &str {
        "Search Gmail messages with a query. Returns the query, the number of messages found and \
         each message's id, subject, sender, date, snippet and unread flag."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "Gmail search query (e.g. \"from:example@gmail.com\", \"is:unread\", \"subject:invoice\")"
                },
                "max_results": {
                    "type": "integer",
                    "description": "Maximum number of results to return (1-50, default 10)"
                }
            },
            "required": ["query"]
        })
    }

    async fn execute(&self, params: Value) -> Result<String> {
        let query = params.get("query")
            .and_then(|v| v.as_str())
            .ok_or_else(|| Error::Tool("Missing 'query' parameter".to_string()))?;
        let max_results = int_param(&params, "max_results", DEFAULT_SEARCH_RESULTS);

        render(&self.mailbox.search(query, max_results).await)
    }
}

/// Count unread messages
pub struct CountUnreadGmailTool {
    mailbox: Mailbox,
}

impl CountUnreadGmailTool {
    pub fn new(mailbox: Mailbox) -> Self {
        Self { mailbox }
    }
}

#[async_trait]
impl Tool for CountUnreadGmailTool {
    fn name(&self) -> &str { "count_unread_gmail" }
    fn description(&self) -> &str { "Count unread messages in Gmail" }

    fn parameters(&self) -> Value {
        json!({"type": "object", "properties": {}})
    }

    async fn execute(&self, _params: Value) -> Result<String> {
        render(&self.mailbox.count_unread().await)
    }
}

/// Read one message in full
pub struct ReadGmailMessageTool {
    mailbox: Mailbox,
}

impl ReadGmailMessageTool {
    pub fn new(mailbox: Mailbox) -> Self {
        Self { mailbox }
    }
}

#[async_trait]
impl Tool for ReadGmailMessageTool {
    fn name(&self) -> &str { "read_gmail_message" }
    fn description(&self) -> &str {
        "Read a specific Gmail message by ID: subject, sender, date and plain-text body"
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "message_id": {
                    "type": "string",
                    "description": "Gmail message ID (from search results)"
                }
            },
            "required": ["message_id"]
        })
    }

    async fn execute(&self, params: Value) -> Result<String> {
        let message_id = params.get("message_id")
            .and_then(|v| v.as_str())
            .ok_or_else(|| Error::Tool("Missing 'message_id' parameter".to_string()))?;

        Ok(self.mailbox.read_one(message_id).await)
    }
}

/// List the newest messages
pub struct RecentGmailTool {
    mailbox: Mailbox,
}

impl RecentGmailTool {
    pub fn new(mailbox: Mailbox) -> Self {
        Self { mailbox }
    }
}

#[async_trait]
impl Tool for RecentGmailTool {
    fn name(&self) -> &str { "get_recent_gmail" }
    fn description(&self) -> &str { "Get the most recent Gmail messages" }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "count": {
                    "type": "integer",
                    "description": "Number of recent messages to retrieve (1-20, default 5)"
                }
            }
        })
    }

    async fn execute(&self, params: Value) -> Result<String> {
        let count = int_param(&params, "count", DEFAULT_RECENT_COUNT);
        Ok(self.mailbox.list_recent(count).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gmail::mailbox::tests::{mailbox_with, message, FakeMail};

    fn two_messages() -> FakeMail {
        FakeMail {
            messages: vec![
                message("a", "First", true, Some("hello")),
                message("b", "Second", false, None),
            ],
            ..FakeMail::default()
        }
    }

    #[test]
    fn test_int_param_coercion() {
        assert_eq!(int_param(&json!({"n": 7}), "n", 1), 7);
        assert_eq!(int_param(&json!({"n": 7.9}), "n", 1), 7);
        assert_eq!(int_param(&json!({"n": " 12 "}), "n", 1), 12);
        assert_eq!(int_param(&json!({"n": "many"}), "n", 1), 1);
        assert_eq!(int_param(&json!({}), "n", 3), 3);
    }

    #[tokio::test]
    async fn test_search_tool_returns_json() {
        let (mailbox, mail) = mailbox_with(two_messages());
        let tool = SearchGmailTool::new(mailbox);

        let output = tool.execute(json!({"query": "in:inbox"})).await.unwrap();
        let value: Value = serde_json::from_str(&output).unwrap();
        assert_eq!(value["total_found"], 2);
        assert_eq!(*mail.last_max_results.lock().unwrap(), Some(Some(10)));
    }

    #[tokio::test]
    async fn test_search_tool_requires_query() {
        let (mailbox, _) = mailbox_with(two_messages());
        assert!(SearchGmailTool::new(mailbox).execute(json!({})).await.is_err());
    }

    #[tokio::test]
    async fn test_count_unread_tool() {
        let (mailbox, _) = mailbox_with(two_messages());
        let output = CountUnreadGmailTool::new(mailbox).execute(json!({})).await.unwrap();
        let value: Value = serde_json::from_str(&output).unwrap();
        assert_eq!(value["unread_count"], 1);
        assert_eq!(value["message"], "You have 1 unread message.");
    }

    #[tokio::test]
    async fn test_read_tool() {
        let (mailbox, _) = mailbox_with(two_messages());
        let output = ReadGmailMessageTool::new(mailbox)
            .execute(json!({"message_id": "a"}))
            .await
            .unwrap();
        assert!(output.starts_with("Subject: First\n"));
        assert!(output.ends_with("Body:\nhello"));
    }

    #[tokio::test]
    async fn test_recent_tool_default_count() {
        let (mailbox, mail) = mailbox_with(two_messages());
        let output = RecentGmailTool::new(mailbox).execute(json!({})).await.unwrap();
        assert!(output.starts_with("Your 2 most recent messages:"));
        assert_eq!(*mail.last_max_results.lock().unwrap(), Some(Some(5)));
    }
}
