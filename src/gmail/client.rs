//! Gmail REST client
//!
//! Issues `users.messages.list` and `users.messages.get` with a bearer token.
//! There is no retry; every failure surfaces as [`Error::Provider`].

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use url::Url;

use crate::error::Error;
use crate::Result;
use super::types::{ListMessagesResponse, RawMessage};

const GMAIL_API_URL: &str = "https://gmail.googleapis.com/gmail/v1/users/me";

/// How much of a message `get` should return
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetailLevel {
    /// Labels, snippet and the Subject/From/Date headers
    Metadata,
    /// Everything including the MIME part tree
    Full,
}

impl DetailLevel {
    fn as_query(&self) -> &'static str {
        match self {
            DetailLevel::Metadata => "metadata",
            DetailLevel::Full => "full",
        }
    }
}

/// Read access to a mailbox.
///
/// The tool layer only talks to this trait so it can run against a fake.
#[async_trait]
pub trait MailApi: Send + Sync {
    /// Ids of matching messages, newest first. `max_results: None` leaves
    /// the page size to the provider.
    async fn list(&self, query: Option<&str>, max_results: Option<u32>) -> Result<Vec<String>>;

    /// Fetch one message
    async fn get(&self, id: &str, detail: DetailLevel) -> Result<RawMessage>;
}

/// Gmail API client bound to one access token
#[derive(Clone)]
pub struct GmailClient {
    access_token: String,
    base_url: String,
    client: Client,
}

impl GmailClient {
    pub fn new(client: Client, access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            base_url: GMAIL_API_URL.to_string(),
            client,
        }
    }

    /// Point the client at another API root
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// API root with `segments` appended, each percent-encoded as one path segment
    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| Error::Provider(format!("Invalid Gmail API URL {}: {}", self.base_url, e)))?;
        url.path_segments_mut()
            .map_err(|_| Error::Provider(format!("Invalid Gmail API URL {}", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let response = request
            .bearer_auth(&self.access_token)
            .send()
            .await
            .map_err(|e| Error::Provider(format!("Request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Provider(format!("Gmail API returned {}: {}", status, body)));
        }

        response
            .json()
            .await
            .map_err(|e| Error::Provider(format!("Invalid Gmail response: {}", e)))
    }
}

#[async_trait]
impl MailApi for GmailClient {
    async fn list(&self, query: Option<&str>, max_results: Option<u32>) -> Result<Vec<String>> {
        let mut params: Vec<(&str, String)> = Vec::new();
        if let Some(q) = query {
            params.push(("q", q.to_string()));
        }
        if let Some(max) = max_results {
            params.push(("maxResults", max.to_string()));
        }

        tracing::debug!("Listing messages: {:?}", params);

        let request = self.client
            .get(self.endpoint(&["messages"])?)
            .query(&params);
        let list: ListMessagesResponse = self.send(request).await?;

        Ok(list.messages.into_iter().map(|m| m.id).collect())
    }

    async fn get(&self, id: &str, detail: DetailLevel) -> Result<RawMessage> {
        // Dot segments are dropped by URL normalization and would hit another endpoint
        if matches!(id, "" | "." | "..") {
            return Err(Error::Provider(format!("Invalid message id: {:?}", id)));
        }

        let mut params = vec![("format", detail.as_query())];
        if detail == DetailLevel::Metadata {
            params.extend([
                ("metadataHeaders", "Subject"),
                ("metadataHeaders", "From"),
                ("metadataHeaders", "Date"),
            ]);
        }

        tracing::debug!("Fetching message {} ({})", id, detail.as_query());

        let request = self.client
            .get(self.endpoint(&["messages", id])?)
            .query(&params);
        self.send(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    const MESSAGE: &str = r#"{
        "id": "m1",
        "labelIds": ["INBOX"],
        "payload": {"headers": [{"name": "Subject", "value": "Hi"}]}
    }"#;

    fn client_for(server: &mockito::Server) -> GmailClient {
        GmailClient::new(Client::new(), "tok")
            .with_base_url(format!("{}/gmail/v1/users/me", server.url()))
    }

    #[test]
    fn test_detail_level_query_values() {
        assert_eq!(DetailLevel::Metadata.as_query(), "metadata");
        assert_eq!(DetailLevel::Full.as_query(), "full");
    }

    #[tokio::test]
    async fn test_transport_failure_is_provider_error() {
        let client = GmailClient::new(Client::new(), "token")
            .with_base_url("http://127.0.0.1:9/gmail/v1/users/me");

        let err = client.list(Some("is:unread"), Some(5)).await.unwrap_err();
        assert!(matches!(err, Error::Provider(_)));
    }

    #[tokio::test]
    async fn test_list_sends_bearer_query_and_limit() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/gmail/v1/users/me/messages")
            .match_header("authorization", "Bearer tok")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("q".into(), "from:alice is:unread".into()),
                Matcher::UrlEncoded("maxResults".into(), "7".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"messages": [{"id": "a", "threadId": "t"}, {"id": "b"}], "resultSizeEstimate": 2}"#)
            .create_async()
            .await;

        let ids = client_for(&server).list(Some("from:alice is:unread"), Some(7)).await.unwrap();
        assert_eq!(ids, vec!["a", "b"]);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_list_without_messages_key() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/gmail/v1/users/me/messages")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"resultSizeEstimate": 0}"#)
            .create_async()
            .await;

        let ids = client_for(&server).list(None, None).await.unwrap();
        assert!(ids.is_empty());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_get_metadata_requests_three_headers() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/gmail/v1/users/me/messages/m1")
            .match_header("authorization", "Bearer tok")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("format".into(), "metadata".into()),
                Matcher::Regex("metadataHeaders=Subject".into()),
                Matcher::Regex("metadataHeaders=From".into()),
                Matcher::Regex("metadataHeaders=Date".into()),
            ]))
            .with_status(200)
            .with_body(MESSAGE)
            .create_async()
            .await;

        let raw = client_for(&server).get("m1", DetailLevel::Metadata).await.unwrap();
        assert_eq!(raw.id, "m1");
        assert_eq!(raw.label_ids, vec!["INBOX"]);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_get_full() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/gmail/v1/users/me/messages/m1")
            .match_query(Matcher::UrlEncoded("format".into(), "full".into()))
            .with_status(200)
            .with_body(MESSAGE)
            .create_async()
            .await;

        let raw = client_for(&server).get("m1", DetailLevel::Full).await.unwrap();
        assert_eq!(raw.id, "m1");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_get_not_found_is_provider_error_with_body() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/gmail/v1/users/me/messages/nope")
            .match_query(Matcher::Any)
            .with_status(404)
            .with_body(r#"{"error": {"message": "Requested entity was not found."}}"#)
            .create_async()
            .await;

        let err = client_for(&server).get("nope", DetailLevel::Full).await.unwrap_err();
        assert!(matches!(err, Error::Provider(_)));
        let text = err.to_string();
        assert!(text.contains("404"));
        assert!(text.contains("Requested entity was not found."));
    }

    #[tokio::test]
    async fn test_get_escapes_message_id() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/gmail/v1/users/me/messages/..%2Fprofile")
            .match_query(Matcher::UrlEncoded("format".into(), "full".into()))
            .with_status(404)
            .with_body("not found")
            .create_async()
            .await;

        let err = client_for(&server).get("../profile", DetailLevel::Full).await.unwrap_err();
        assert!(matches!(err, Error::Provider(_)));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_get_rejects_dot_segments() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", Matcher::Any)
            .expect(0)
            .create_async()
            .await;

        let client = client_for(&server);
        for id in ["", ".", ".."] {
            let err = client.get(id, DetailLevel::Full).await.unwrap_err();
            assert!(err.to_string().contains("Invalid message id"));
        }
        mock.assert_async().await;
    }
}
