//! Conversation API client.
//!
//! The store only relies on the returned [`Conversation`] shape; the
//! trait seam exists so tests can substitute a mock for the HTTP
//! client.

use async_trait::async_trait;
use reqwest::Response;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use tether_core::errors::ApiError;
use tether_core::ids::ConversationId;
use tether_core::model::{Conversation, ProjectSource};
use tether_core::settings::ApiSettings;

/// Body of the create-conversation request.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateConversationParams {
    /// First prompt text.
    pub text: String,
    /// Resolved project source, if the session has one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_source: Option<ProjectSource>,
    /// Model to run the conversation against.
    pub model: String,
}

/// CRUD surface of the external conversation service.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ConversationApi: Send + Sync {
    /// Lists all conversations.
    async fn fetch_conversations(&self) -> Result<Vec<Conversation>, ApiError>;

    /// Fetches one conversation in full.
    async fn fetch_conversation(&self, id: &ConversationId) -> Result<Conversation, ApiError>;

    /// Creates a conversation from a first prompt.
    async fn create_conversation(
        &self,
        params: CreateConversationParams,
    ) -> Result<Conversation, ApiError>;

    /// Appends a message and returns the updated conversation.
    async fn send_message(
        &self,
        id: &ConversationId,
        text: &str,
    ) -> Result<Conversation, ApiError>;
}

/// [`ConversationApi`] over HTTP.
#[derive(Debug, Clone)]
pub struct HttpConversationApi {
    client: reqwest::Client,
    base_url: String,
}

impl HttpConversationApi {
    /// Client against the configured API base URL.
    #[must_use]
    pub fn new(settings: &ApiSettings) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: settings.base_url.trim_end_matches('/').to_owned(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{path}", self.base_url)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: String) -> Result<T, ApiError> {
        debug!(url, "GET");
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;
        decode(response).await
    }

    async fn post_json<T: DeserializeOwned, B: Serialize + Sync>(
        &self,
        url: String,
        body: &B,
    ) -> Result<T, ApiError> {
        debug!(url, "POST");
        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;
        decode(response).await
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(ApiError::Status {
            status: status.as_u16(),
            body,
        });
    }
    response
        .json::<T>()
        .await
        .map_err(|e| ApiError::Decode(e.to_string()))
}

#[async_trait]
impl ConversationApi for HttpConversationApi {
    async fn fetch_conversations(&self) -> Result<Vec<Conversation>, ApiError> {
        self.get_json(self.url("conversations")).await
    }

    async fn fetch_conversation(&self, id: &ConversationId) -> Result<Conversation, ApiError> {
        self.get_json(self.url(&format!("conversations/{id}"))).await
    }

    async fn create_conversation(
        &self,
        params: CreateConversationParams,
    ) -> Result<Conversation, ApiError> {
        self.post_json(self.url("conversations"), &params).await
    }

    async fn send_message(
        &self,
        id: &ConversationId,
        text: &str,
    ) -> Result<Conversation, ApiError> {
        let body = serde_json::json!({ "text": text });
        self.post_json(self.url(&format!("conversations/{id}/messages")), &body)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn conversation_json(id: &str) -> serde_json::Value {
        serde_json::json!({
            "id": id,
            "messages": [
                {
                    "id": "m-1",
                    "role": "user",
                    "content": "hello",
                    "createdAt": "2026-01-01T00:00:00Z",
                }
            ],
            "model": "claude-sonnet-4-5",
            "createdAt": "2026-01-01T00:00:00Z",
            "updatedAt": "2026-01-01T00:00:01Z",
        })
    }

    fn client_for(server: &MockServer) -> HttpConversationApi {
        HttpConversationApi::new(&ApiSettings {
            base_url: format!("{}/api", server.uri()),
        })
    }

    #[tokio::test]
    async fn fetches_one_conversation() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/conversations/c-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(conversation_json("c-1")))
            .mount(&server)
            .await;

        let api = client_for(&server);
        let conversation = api.fetch_conversation(&"c-1".into()).await.unwrap();
        assert_eq!(conversation.id.as_str(), "c-1");
        assert_eq!(conversation.messages.len(), 1);
    }

    #[tokio::test]
    async fn creates_a_conversation_with_project_source() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/conversations"))
            .and(body_partial_json(serde_json::json!({
                "text": "build it",
                "projectSource": {"type": "gitUrl", "value": "https://example.com/r.git"},
                "model": "claude-sonnet-4-5",
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(conversation_json("c-2")))
            .mount(&server)
            .await;

        let api = client_for(&server);
        let conversation = api
            .create_conversation(CreateConversationParams {
                text: "build it".into(),
                project_source: Some(ProjectSource::GitUrl("https://example.com/r.git".into())),
                model: "claude-sonnet-4-5".into(),
            })
            .await
            .unwrap();
        assert_eq!(conversation.id.as_str(), "c-2");
    }

    #[tokio::test]
    async fn sends_a_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/conversations/c-1/messages"))
            .and(body_partial_json(serde_json::json!({"text": "hi"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(conversation_json("c-1")))
            .mount(&server)
            .await;

        let api = client_for(&server);
        assert!(api.send_message(&"c-1".into(), "hi").await.is_ok());
    }

    #[tokio::test]
    async fn server_error_carries_status_and_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/conversations"))
            .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
            .mount(&server)
            .await;

        let api = client_for(&server);
        let err = api.fetch_conversations().await.unwrap_err();
        assert_matches!(err, ApiError::Status { status: 502, ref body } if body == "bad gateway");
    }

    #[tokio::test]
    async fn malformed_body_is_a_decode_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/conversations/c-1"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let api = client_for(&server);
        let err = api.fetch_conversation(&"c-1".into()).await.unwrap_err();
        assert_matches!(err, ApiError::Decode(_));
    }
}
