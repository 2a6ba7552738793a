use crate::error::ModelError;
use crate::models::{ChatRole, ChatTurn};
use crate::traits::{ChatModel, Embedder};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

/// Client for an Ollama-compatible model server, implementing both the
/// embedding and chat-completion capabilities. Every request carries the
/// configured timeout; elapsed timeouts surface as a distinct error kind.
#[derive(Debug, Clone)]
pub struct OllamaClient {
    client: Client,
    base_url: Url,
    embed_model: String,
    chat_model: String,
}

#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct WireMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    message: WireReply,
}

#[derive(Debug, Deserialize)]
struct WireReply {
    content: String,
}

impl OllamaClient {
    pub fn new(
        base_url: &str,
        embed_model: impl Into<String>,
        chat_model: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ModelError> {
        let base_url = Url::parse(base_url)?;
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url,
            embed_model: embed_model.into(),
            chat_model: chat_model.into(),
        })
    }

    /// Same server and embedding model, different chat model. Lets one
    /// client config serve both contextualization and answering.
    pub fn with_chat_model(&self, chat_model: impl Into<String>) -> Self {
        Self {
            chat_model: chat_model.into(),
            ..self.clone()
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url.as_str().trim_end_matches('/'), path)
    }

    async fn post_json<T: Serialize>(
        &self,
        endpoint: &str,
        payload: &T,
    ) -> Result<reqwest::Response, ModelError> {
        let response = self
            .client
            .post(endpoint)
            .json(payload)
            .send()
            .await
            .map_err(|error| ModelError::from_transport(endpoint, error))?;

        if !response.status().is_success() {
            return Err(ModelError::Backend {
                endpoint: endpoint.to_string(),
                details: response.status().to_string(),
            });
        }

        Ok(response)
    }
}

#[async_trait]
impl Embedder for OllamaClient {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, ModelError> {
        let endpoint = self.endpoint("/api/embed");
        let response = self
            .post_json(
                &endpoint,
                &EmbedRequest {
                    model: &self.embed_model,
                    input: text,
                },
            )
            .await?;

        let payload: EmbedResponse = response
            .json()
            .await
            .map_err(|error| ModelError::from_transport(&endpoint, error))?;

        first_embedding(payload, &endpoint)
    }
}

#[async_trait]
impl ChatModel for OllamaClient {
    async fn complete(&self, messages: &[ChatTurn]) -> Result<String, ModelError> {
        let endpoint = self.endpoint("/api/chat");
        let wire_messages = messages
            .iter()
            .map(|turn| WireMessage {
                role: role_name(turn.role),
                content: &turn.text,
            })
            .collect();

        let response = self
            .post_json(
                &endpoint,
                &ChatRequest {
                    model: &self.chat_model,
                    messages: wire_messages,
                    stream: false,
                },
            )
            .await?;

        let payload: ChatResponse = response
            .json()
            .await
            .map_err(|error| ModelError::from_transport(&endpoint, error))?;

        Ok(payload.message.content)
    }
}

fn role_name(role: ChatRole) -> &'static str {
    match role {
        ChatRole::System => "system",
        ChatRole::User => "user",
        ChatRole::Assistant => "assistant",
    }
}

fn first_embedding(payload: EmbedResponse, endpoint: &str) -> Result<Vec<f32>, ModelError> {
    payload
        .embeddings
        .into_iter()
        .next()
        .ok_or_else(|| ModelError::InvalidResponse {
            endpoint: endpoint.to_string(),
            details: "empty embeddings array".to_string(),
        })
}
