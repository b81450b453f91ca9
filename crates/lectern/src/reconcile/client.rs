use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;

use super::{ClientError, ContentApi, ProcessedView};
use crate::content::{ChatMessage, Content};

const USER_AGENT: &str = concat!("lectern-client/", env!("CARGO_PKG_VERSION"));

/// [`ContentApi`] over the lectern HTTP API.
pub struct HttpContentApi {
    http_client: reqwest::Client,
    base_url: String,
}

#[derive(Deserialize)]
struct ProcessResponse {
    #[serde(default)]
    queued: bool,
}

#[derive(Deserialize)]
struct ClassifyResponse {
    classification: ClassificationBody,
}

#[derive(Deserialize)]
struct ClassificationBody {
    display_title: Option<String>,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    messages: Vec<ChatMessage>,
}

impl HttpContentApi {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ClientError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| ClientError::Network(e.to_string()))?;
        Ok(Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn read<T: DeserializeOwned>(
        &self,
        id: &str,
        response: reqwest::Response,
    ) -> Result<T, ClientError> {
        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(ClientError::NotFound(id.to_string()));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::Api {
                status: status.as_u16(),
                body,
            });
        }
        response
            .json()
            .await
            .map_err(|e| ClientError::ResponseParse(e.to_string()))
    }

    async fn get<T: DeserializeOwned>(&self, id: &str, path: &str) -> Result<T, ClientError> {
        let url = format!("{}{}", self.base_url, path);
        tracing::debug!(url = %url, "GET");
        let response = self
            .http_client
            .get(&url)
            .send()
            .await
            .map_err(|e| ClientError::Network(e.to_string()))?;
        self.read(id, response).await
    }

    async fn post<T: DeserializeOwned>(
        &self,
        id: &str,
        path: &str,
        body: serde_json::Value,
    ) -> Result<T, ClientError> {
        let url = format!("{}{}", self.base_url, path);
        tracing::debug!(url = %url, "POST");
        let response = self
            .http_client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| ClientError::Network(e.to_string()))?;
        self.read(id, response).await
    }
}

#[async_trait]
impl ContentApi for HttpContentApi {
    async fn content(&self, id: &str) -> Result<Content, ClientError> {
        self.get(id, &format!("/content/{}", id)).await
    }

    async fn processed(&self, id: &str) -> Result<ProcessedView, ClientError> {
        self.get(id, &format!("/content/{}/processed", id)).await
    }

    async fn request_summary(&self, id: &str) -> Result<bool, ClientError> {
        let response: ProcessResponse = self
            .post(id, "/process", json!({ "contentId": id }))
            .await?;
        Ok(response.queued)
    }

    async fn classify(&self, id: &str) -> Result<Option<String>, ClientError> {
        let response: ClassifyResponse = self
            .post(id, &format!("/content/{}/classify", id), json!({}))
            .await?;
        Ok(response.classification.display_title)
    }

    async fn chat_history(&self, id: &str) -> Result<Vec<ChatMessage>, ClientError> {
        let response: ChatResponse = self.get(id, &format!("/content/{}/chat", id)).await?;
        Ok(response.messages)
    }
}
