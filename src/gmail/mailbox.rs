//! Mailbox - the four Gmail operations exposed to the agent
//!
//! Every operation resolves a fresh client through a [`MailConnector`] and
//! converts all failures into an in-band value: a JSON object with an
//! `error` key, or a plain string. Nothing here returns `Err`.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

use crate::auth::CredentialStore;
use crate::config::Config;
use crate::error::Error;
use crate::Result;
use super::client::{DetailLevel, GmailClient, MailApi};
use super::format::{full_message, summarize};
use super::types::{EmailMessage, EmailSearchResult};

pub const MAX_SEARCH_RESULTS: i64 = 50;
pub const MAX_RECENT_MESSAGES: i64 = 20;
/// Bodies longer than this many characters are cut in `read_one`
pub const MAX_BODY_CHARS: usize = 2000;

pub const UNAVAILABLE: &str =
    "Gmail tools not available. Rebuild courier with the `gmail` feature enabled.";

/// Produces an authenticated [`MailApi`] for one operation
#[async_trait]
pub trait MailConnector: Send + Sync {
    async fn connect(&self) -> Result<Arc<dyn MailApi>>;
}

/// Connects through the persisted OAuth credential
pub struct GoogleConnector {
    store: CredentialStore,
    http_client: Client,
}

impl GoogleConnector {
    pub fn new(store: CredentialStore, timeout: Duration) -> Result<Self> {
        let http_client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Config(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { store, http_client })
    }
}

#[async_trait]
impl MailConnector for GoogleConnector {
    async fn connect(&self) -> Result<Arc<dyn MailApi>> {
        let credential = self.store.get_valid_credential().await?;
        Ok(Arc::new(GmailClient::new(self.http_client.clone(), credential.access_token)))
    }
}

/// Read-only Gmail operations
#[derive(Clone)]
pub struct Mailbox {
    connector: Option<Arc<dyn MailConnector>>,
}

impl Mailbox {
    pub fn new(connector: Arc<dyn MailConnector>) -> Self {
        Self { connector: Some(connector) }
    }

    /// A mailbox whose every operation reports that Gmail is unavailable
    pub fn unavailable() -> Self {
        Self { connector: None }
    }

    /// Mailbox backed by Google, or unavailable when the `gmail` feature is off
    pub fn from_config(config: &Config) -> Result<Self> {
        if !super::is_available() {
            return Ok(Self::unavailable());
        }
        let store = CredentialStore::new(&config.gmail, config.request_timeout())?;
        let connector = GoogleConnector::new(store, config.request_timeout())?;
        Ok(Self::new(Arc::new(connector)))
    }

    pub fn is_available(&self) -> bool {
        self.connector.is_some()
    }

    async fn connect(&self) -> Result<Arc<dyn MailApi>> {
        match &self.connector {
            Some(connector) => connector.connect().await,
            None => Err(Error::Tool(UNAVAILABLE.to_string())),
        }
    }

    /// Search with a Gmail query; `max_results` is clamped to 1..=50
    pub async fn search(&self, query: &str, max_results: i64) -> Value {
        if !self.is_available() {
            return json!({ "error": UNAVAILABLE });
        }

        match self.try_search(query, max_results).await {
            Ok(result) => json!(result),
            Err(e) => json!({ "error": describe(&e, "Error searching Gmail") }),
        }
    }

    async fn try_search(&self, query: &str, max_results: i64) -> Result<EmailSearchResult> {
        let max_results = max_results.clamp(1, MAX_SEARCH_RESULTS) as u32;
        let api = self.connect().await?;

        let ids = api.list(Some(query), Some(max_results)).await?;
        tracing::debug!("Search {:?} matched {} messages", query, ids.len());

        let mut messages = Vec::with_capacity(ids.len());
        // The provider already honors maxResults; the cap guards against one that doesn't
        for id in ids.iter().take(max_results as usize) {
            let message = match api.get(id, DetailLevel::Metadata).await {
                Ok(raw) => {
                    let mut message = summarize(&raw);
                    message.id = id.clone();
                    message
                }
                Err(e) => {
                    tracing::warn!("Failed to fetch message {}: {}", id, e);
                    EmailMessage::fetch_error(id, e)
                }
            };
            messages.push(message);
        }

        Ok(EmailSearchResult::new(query, messages))
    }

    /// Number of unread messages with a ready-to-print sentence
    pub async fn count_unread(&self) -> Value {
        if !self.is_available() {
            return json!({ "error": UNAVAILABLE });
        }

        match self.try_count_unread().await {
            Ok(count) => json!({
                "unread_count": count,
                "message": unread_sentence(count),
                "has_unread": count > 0,
            }),
            Err(e) => json!({ "error": describe(&e, "Error counting unread messages") }),
        }
    }

    async fn try_count_unread(&self) -> Result<usize> {
        let api = self.connect().await?;
        Ok(api.list(Some("is:unread"), None).await?.len())
    }

    /// Headers and plain-text body of one message
    pub async fn read_one(&self, message_id: &str) -> String {
        if !self.is_available() {
            return UNAVAILABLE.to_string();
        }

        match self.try_read_one(message_id).await {
            Ok(text) => text,
            Err(e) => describe(&e, &format!("Error reading message {}", message_id)),
        }
    }

    async fn try_read_one(&self, message_id: &str) -> Result<String> {
        let api = self.connect().await?;
        let raw = api.get(message_id, DetailLevel::Full).await?;
        let message = full_message(&raw);

        let mut output = format!(
            "Subject: {}\nFrom: {}\nDate: {}\nMessage ID: {}\n\n",
            message.subject, message.sender, message.date, message_id
        );
        output.push_str(&render_body(&message.body));
        Ok(output)
    }

    /// Numbered listing of the newest messages; `count` is clamped to 1..=20
    pub async fn list_recent(&self, count: i64) -> String {
        if !self.is_available() {
            return UNAVAILABLE.to_string();
        }

        match self.try_list_recent(count).await {
            Ok(text) => text,
            Err(e) => describe(&e, "Error getting recent messages"),
        }
    }

    async fn try_list_recent(&self, count: i64) -> Result<String> {
        let count = count.clamp(1, MAX_RECENT_MESSAGES) as u32;
        let api = self.connect().await?;

        let mut ids = api.list(None, Some(count)).await?;
        ids.truncate(count as usize);
        if ids.is_empty() {
            return Ok("No messages found in your Gmail.".to_string());
        }

        let mut output = format!("Your {} most recent messages:\n\n", ids.len());
        for (i, id) in ids.iter().enumerate() {
            let n = i + 1;
            match api.get(id, DetailLevel::Metadata).await {
                Ok(raw) => {
                    let message = summarize(&raw);
                    output.push_str(&format!(
                        "{}. {}\n   From: {}\n   Date: {}\n   ID: {}\n\n",
                        n, message.subject, message.sender, message.date, id
                    ));
                }
                Err(e) => {
                    tracing::warn!("Failed to fetch message {}: {}", id, e);
                    output.push_str(&format!("{}. Error reading message: {}\n\n", n, e));
                }
            }
        }

        Ok(output.trim_end().to_string())
    }
}

fn unread_sentence(count: usize) -> String {
    let plural = if count == 1 { "" } else { "s" };
    format!("You have {} unread message{}.", count, plural)
}

fn render_body(body: &str) -> String {
    if body.is_empty() {
        return "Body: [Unable to extract text content - may be HTML only or have attachments]"
            .to_string();
    }

    let total = body.chars().count();
    if total > MAX_BODY_CHARS {
        let head: String = body.chars().take(MAX_BODY_CHARS).collect();
        format!(
            "Body (truncated):\n{}...\n\n[Message truncated - {} total characters]",
            head, total
        )
    } else {
        format!("Body:\n{}", body)
    }
}

/// Configuration errors already read as instructions; everything else gets context
fn describe(err: &Error, context: &str) -> String {
    match err {
        Error::Config(_) => err.to_string(),
        _ => format!("{}: {}", context, err),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::config::GmailConfig;
    use crate::gmail::types::{Header, MessagePart, PartBody, RawMessage};
    use base64::{engine::general_purpose::URL_SAFE, Engine};
    use std::collections::HashSet;
    use std::sync::Mutex;

    /// In-memory mailbox, newest message first
    #[derive(Default)]
    pub(crate) struct FakeMail {
        pub messages: Vec<RawMessage>,
        pub broken_ids: HashSet<String>,
        pub list_error: Option<String>,
        pub last_max_results: Mutex<Option<Option<u32>>>,
    }

    #[async_trait]
    impl MailApi for FakeMail {
        async fn list(&self, query: Option<&str>, max_results: Option<u32>) -> Result<Vec<String>> {
            *self.last_max_results.lock().unwrap() = Some(max_results);
            if let Some(err) = &self.list_error {
                return Err(Error::Provider(err.clone()));
            }

            let ids = self.messages
                .iter()
                .filter(|m| query != Some("is:unread") || m.label_ids.iter().any(|l| l == "UNREAD"))
                .map(|m| m.id.clone());
            Ok(match max_results {
                Some(max) => ids.take(max as usize).collect(),
                None => ids.collect(),
            })
        }

        async fn get(&self, id: &str, _detail: DetailLevel) -> Result<RawMessage> {
            if self.broken_ids.contains(id) {
                return Err(Error::Provider(format!("404 Not Found: {}", id)));
            }
            self.messages
                .iter()
                .find(|m| m.id == id)
                .cloned()
                .ok_or_else(|| Error::Provider(format!("Requested entity was not found: {}", id)))
        }
    }

    pub(crate) struct FakeConnector(pub Arc<FakeMail>);

    #[async_trait]
    impl MailConnector for FakeConnector {
        async fn connect(&self) -> Result<Arc<dyn MailApi>> {
            Ok(self.0.clone())
        }
    }

    pub(crate) fn message(id: &str, subject: &str, unread: bool, body: Option<&str>) -> RawMessage {
        let mut labels = vec!["INBOX".to_string()];
        if unread {
            labels.push("UNREAD".to_string());
        }
        RawMessage {
            id: id.to_string(),
            label_ids: labels,
            snippet: format!("snippet of {}", id),
            payload: MessagePart {
                mime_type: "text/plain".to_string(),
                headers: vec![
                    Header { name: "Subject".to_string(), value: subject.to_string() },
                    Header { name: "From".to_string(), value: "alice@example.com".to_string() },
                    Header { name: "Date".to_string(), value: "Tue, 2 Jan 2024 10:00:00 +0000".to_string() },
                ],
                body: PartBody { data: body.map(|b| URL_SAFE.encode(b)), size: 0 },
                parts: vec![],
            },
        }
    }

    pub(crate) fn mailbox_with(mail: FakeMail) -> (Mailbox, Arc<FakeMail>) {
        let mail = Arc::new(mail);
        (Mailbox::new(Arc::new(FakeConnector(mail.clone()))), mail)
    }

    fn inbox(n: usize, unread: usize) -> FakeMail {
        FakeMail {
            messages: (0..n)
                .map(|i| message(&format!("m{}", i), &format!("Subject {}", i), i < unread, None))
                .collect(),
            ..FakeMail::default()
        }
    }

    fn missing_secret_mailbox() -> (Mailbox, String) {
        let dir = std::env::temp_dir().join("courier-no-such-dir");
        let secret = dir.join("client_secret.json");
        let config = GmailConfig {
            client_secret_path: secret.clone(),
            token_path: dir.join("token.json"),
        };
        let store = CredentialStore::new(&config, Duration::from_secs(5)).unwrap();
        let connector = GoogleConnector::new(store, Duration::from_secs(5)).unwrap();
        let mailbox = Mailbox::new(Arc::new(connector));
        (mailbox, secret.display().to_string())
    }

    #[test]
    fn test_from_config_follows_feature_flag() {
        let mailbox = Mailbox::from_config(&Config::default()).unwrap();
        assert_eq!(mailbox.is_available(), crate::gmail::is_available());
    }

    #[tokio::test]
    async fn test_search_returns_summaries() {
        let (mailbox, _) = mailbox_with(inbox(3, 1));
        let result = mailbox.search("from:alice", 10).await;

        assert_eq!(result["query"], "from:alice");
        assert_eq!(result["total_found"], 3);
        assert_eq!(result["messages"][0]["subject"], "Subject 0");
        assert_eq!(result["messages"][0]["is_unread"], true);
        assert_eq!(result["messages"][1]["is_unread"], false);
        assert_eq!(result["messages"][0]["sender"], "alice@example.com");
        assert_eq!(result["messages"][0]["body"], "");
    }

    #[tokio::test]
    async fn test_search_clamps_max_results() {
        let (mailbox, mail) = mailbox_with(inbox(60, 0));

        let result = mailbox.search("x", 500).await;
        assert_eq!(result["total_found"], 50);
        assert_eq!(*mail.last_max_results.lock().unwrap(), Some(Some(50)));

        let result = mailbox.search("x", 0).await;
        assert_eq!(result["total_found"], 1);
        assert_eq!(*mail.last_max_results.lock().unwrap(), Some(Some(1)));

        let result = mailbox.search("x", -3).await;
        assert_eq!(result["messages"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_search_never_exceeds_max_results() {
        let (mailbox, _) = mailbox_with(inbox(60, 0));
        for max in [1, 7, 25, 50] {
            let result = mailbox.search("x", max).await;
            let messages = result["messages"].as_array().unwrap();
            assert!(messages.len() as i64 <= max);
            assert_eq!(result["total_found"], messages.len());
        }
    }

    #[tokio::test]
    async fn test_search_no_matches() {
        let (mailbox, _) = mailbox_with(FakeMail::default());
        let result = mailbox.search("subject:nothing", 10).await;
        assert_eq!(
            result,
            json!({ "query": "subject:nothing", "total_found": 0, "messages": [] })
        );
    }

    #[tokio::test]
    async fn test_search_replaces_failed_fetch() {
        let mut mail = inbox(3, 0);
        mail.broken_ids.insert("m1".to_string());
        let (mailbox, _) = mailbox_with(mail);

        let result = mailbox.search("x", 10).await;
        assert_eq!(result["total_found"], 3);
        let broken = &result["messages"][1];
        assert_eq!(broken["id"], "m1");
        assert_eq!(broken["sender"], "Error");
        assert_eq!(broken["date"], "Unknown");
        assert!(broken["subject"].as_str().unwrap().starts_with("Error reading message:"));
        assert_eq!(result["messages"][2]["subject"], "Subject 2");
    }

    #[tokio::test]
    async fn test_search_list_failure_is_in_band() {
        let (mailbox, _) = mailbox_with(FakeMail {
            list_error: Some("503 Service Unavailable".to_string()),
            ..FakeMail::default()
        });
        let result = mailbox.search("x", 10).await;
        let error = result["error"].as_str().unwrap();
        assert!(error.starts_with("Error searching Gmail:"));
        assert!(error.contains("503"));
    }

    #[tokio::test]
    async fn test_count_unread_plural_and_singular() {
        let (mailbox, _) = mailbox_with(inbox(5, 3));
        assert_eq!(
            mailbox.count_unread().await,
            json!({ "unread_count": 3, "message": "You have 3 unread messages.", "has_unread": true })
        );

        let (mailbox, _) = mailbox_with(inbox(5, 1));
        assert_eq!(mailbox.count_unread().await["message"], "You have 1 unread message.");

        let (mailbox, _) = mailbox_with(inbox(5, 0));
        let result = mailbox.count_unread().await;
        assert_eq!(result["message"], "You have 0 unread messages.");
        assert_eq!(result["has_unread"], false);
    }

    #[tokio::test]
    async fn test_read_one_formats_message() {
        let (mailbox, _) = mailbox_with(FakeMail {
            messages: vec![message("abc", "Lunch", false, Some("See you at noon."))],
            ..FakeMail::default()
        });

        let text = mailbox.read_one("abc").await;
        assert_eq!(
            text,
            "Subject: Lunch\nFrom: alice@example.com\nDate: Tue, 2 Jan 2024 10:00:00 +0000\n\
             Message ID: abc\n\nBody:\nSee you at noon."
        );
    }

    #[tokio::test]
    async fn test_read_one_truncates_long_body() {
        let body = "é".repeat(1500) + &"x".repeat(1000);
        let (mailbox, _) = mailbox_with(FakeMail {
            messages: vec![message("long", "Report", false, Some(&body))],
            ..FakeMail::default()
        });

        let text = mailbox.read_one("long").await;
        let expected_head: String = body.chars().take(MAX_BODY_CHARS).collect();
        assert!(text.contains(&format!("Body (truncated):\n{}...", expected_head)));
        assert!(text.ends_with("[Message truncated - 2500 total characters]"));
        assert!(!text.contains(&"x".repeat(501)));
    }

    #[tokio::test]
    async fn test_read_one_without_text() {
        let (mailbox, _) = mailbox_with(FakeMail {
            messages: vec![message("html", "Newsletter", false, None)],
            ..FakeMail::default()
        });
        assert!(mailbox.read_one("html").await.contains("Unable to extract text content"));
    }

    #[tokio::test]
    async fn test_read_one_unknown_id() {
        let (mailbox, _) = mailbox_with(FakeMail::default());
        let text = mailbox.read_one("nope").await;
        assert!(text.starts_with("Error reading message nope:"));
    }

    #[tokio::test]
    async fn test_list_recent_numbers_messages() {
        let (mailbox, _) = mailbox_with(inbox(3, 0));
        let text = mailbox.list_recent(5).await;

        assert!(text.starts_with("Your 3 most recent messages:\n\n1. Subject 0\n   From: alice@example.com"));
        assert!(text.contains("3. Subject 2\n"));
        assert!(text.ends_with("   ID: m2"));
    }

    #[tokio::test]
    async fn test_list_recent_clamps_count() {
        let (mailbox, mail) = mailbox_with(inbox(30, 0));
        mailbox.list_recent(100).await;
        assert_eq!(*mail.last_max_results.lock().unwrap(), Some(Some(20)));

        let text = mailbox.list_recent(0).await;
        assert!(text.starts_with("Your 1 most recent messages:"));
    }

    #[tokio::test]
    async fn test_list_recent_empty() {
        let (mailbox, _) = mailbox_with(FakeMail::default());
        assert_eq!(mailbox.list_recent(5).await, "No messages found in your Gmail.");
    }

    #[tokio::test]
    async fn test_list_recent_inline_error() {
        let mut mail = inbox(2, 0);
        mail.broken_ids.insert("m0".to_string());
        let (mailbox, _) = mailbox_with(mail);

        let text = mailbox.list_recent(5).await;
        assert!(text.contains("1. Error reading message: Provider error: 404 Not Found: m0"));
        assert!(text.contains("2. Subject 1"));
    }

    #[tokio::test]
    async fn test_missing_client_secret_is_reported_by_every_operation() {
        let (mailbox, path) = missing_secret_mailbox();

        assert!(mailbox.search("x", 10).await["error"].as_str().unwrap().contains(&path));
        assert!(mailbox.count_unread().await["error"].as_str().unwrap().contains(&path));
        assert!(mailbox.read_one("id").await.contains(&path));
        assert!(mailbox.list_recent(5).await.contains(&path));
    }

    #[tokio::test]
    async fn test_unavailable_mailbox() {
        let mailbox = Mailbox::unavailable();
        assert_eq!(mailbox.search("x", 1).await["error"], UNAVAILABLE);
        assert_eq!(mailbox.count_unread().await["error"], UNAVAILABLE);
        assert_eq!(mailbox.read_one("id").await, UNAVAILABLE);
        assert_eq!(mailbox.list_recent(1).await, UNAVAILABLE);
    }
}
