use std::future::Future;
use std::time::Duration;

use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, error};

use crate::errors::ApiError;
use crate::models::{
    ConversationId, ConversationMessageRequest, CoverRequest, CoverResponse,
    CreateConversationResponse, HealthResponse, MessageReply,
};

/// Remote Smart Librarian operations the chat client depends on.
pub trait LibrarianApi: Send + Sync {
    /// `POST /conversations`
    fn create_conversation(
        &self,
    ) -> impl Future<Output = Result<CreateConversationResponse, ApiError>> + Send;

    /// `POST /conversations/message`. A 404 maps to [`ApiError::ConversationNotFound`].
    fn send_message(
        &self,
        conversation_id: &str,
        message: &str,
    ) -> impl Future<Output = Result<MessageReply, ApiError>> + Send;

    /// `POST /cover`
    fn cover(
        &self,
        title: &str,
        size: &str,
    ) -> impl Future<Output = Result<CoverResponse, ApiError>> + Send;

    /// `GET /health`
    fn health(&self) -> impl Future<Output = Result<HealthResponse, ApiError>> + Send;
}

/// reqwest-backed [`LibrarianApi`].
#[derive(Clone)]
pub struct HttpLibrarianApi {
    client: Client,
    base_url: String,
}

impl HttpLibrarianApi {
    pub fn new(base_url: &str, timeout: Option<Duration>) -> Result<Self, ApiError> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(|e| ApiError::transport(base_url, e))?;
        Ok(Self { client, base_url: base_url.trim_end_matches('/').to_string() })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    async fn decode<T: DeserializeOwned>(url: &str, resp: Response) -> Result<T, ApiError> {
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            error!("{url} returned {status}");
            return Err(ApiError::Status { status: status.as_u16(), body });
        }
        resp.json::<T>().await.map_err(|e| {
            error!("Failed to parse response from {url}: {e}");
            ApiError::decode(url, e)
        })
    }
}

impl LibrarianApi for HttpLibrarianApi {
    async fn create_conversation(&self) -> Result<CreateConversationResponse, ApiError> {
        let url = self.url("/conversations");
        let resp = self
            .client
            .post(&url)
            .send()
            .await
            .map_err(|e| ApiError::transport(&url, e))?;
        Self::decode(&url, resp).await
    }

    async fn send_message(
        &self,
        conversation_id: &str,
        message: &str,
    ) -> Result<MessageReply, ApiError> {
        let url = self.url("/conversations/message");
        let body = ConversationMessageRequest {
            conversation_id: ConversationId::from(conversation_id),
            message: message.to_string(),
        };
        let resp = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| ApiError::transport(&url, e))?;

        if resp.status() == StatusCode::NOT_FOUND {
            debug!("Conversation {conversation_id} is unknown to the server");
            return Err(ApiError::ConversationNotFound {
                conversation_id: conversation_id.to_string(),
            });
        }
        Self::decode(&url, resp).await
    }

    async fn cover(&self, title: &str, size: &str) -> Result<CoverResponse, ApiError> {
        let url = self.url("/cover");
        let body = CoverRequest { title: title.to_string(), size: size.to_string() };
        let resp = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| ApiError::transport(&url, e))?;
        Self::decode(&url, resp).await
    }

    async fn health(&self) -> Result<HealthResponse, ApiError> {
        let url = self.url("/health");
        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| ApiError::transport(&url, e))?;
        Self::decode(&url, resp).await
    }
}
