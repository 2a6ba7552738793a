use crate::error::ModelError;
use crate::traits::Reranker;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

/// Client for a cross-encoder rerank service speaking the common
/// `{query, documents} -> {scores}` shape. Optionally authenticated with a
/// bearer token.
#[derive(Debug, Clone)]
pub struct HttpReranker {
    client: Client,
    endpoint: Url,
    api_key: Option<String>,
}

#[derive(Debug, Serialize)]
struct RerankRequest<'a> {
    query: &'a str,
    documents: &'a [String],
}

#[derive(Debug, Deserialize)]
struct RerankResponse {
    scores: Vec<f32>,
}

impl HttpReranker {
    pub fn new(
        endpoint: &str,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, ModelError> {
        Ok(Self {
            client: Client::builder().timeout(timeout).build()?,
            endpoint: Url::parse(endpoint)?,
            api_key,
        })
    }
}

#[async_trait]
impl Reranker for HttpReranker {
    async fn score(&self, query: &str, documents: &[String]) -> Result<Vec<f32>, ModelError> {
        let endpoint = self.endpoint.as_str();
        let mut request = self
            .client
            .post(self.endpoint.clone())
            .json(&RerankRequest { query, documents });

        if let Some(api_key) = &self.api_key {
            request = request.bearer_auth(api_key);
        }

        let response = request
            .send()
            .await
            .map_err(|error| ModelError::from_transport(endpoint, error))?;

        if !response.status().is_success() {
            return Err(ModelError::Backend {
                endpoint: endpoint.to_string(),
                details: response.status().to_string(),
            });
        }

        let payload: RerankResponse = response
            .json()
            .await
            .map_err(|error| ModelError::from_transport(endpoint, error))?;

        Ok(payload.scores)
    }
}
