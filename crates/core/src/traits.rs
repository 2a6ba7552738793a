use crate::error::{ModelError, StorageError};
use crate::models::ChatTurn;
use async_trait::async_trait;

/// Object storage capability: opaque byte blobs under string keys.
///
/// Listing order is unspecified; callers must never rely on it reflecting
/// upload order.
#[async_trait]
pub trait ObjectStore {
    async fn put(&self, key: &str, bytes: &[u8]) -> Result<(), StorageError>;

    async fn get(&self, key: &str) -> Result<Vec<u8>, StorageError>;

    /// Keys under `prefix` whose name ends with `suffix`.
    async fn list_keys(&self, prefix: &str, suffix: &str) -> Result<Vec<String>, StorageError>;
}

/// Text embedding capability.
#[async_trait]
pub trait Embedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, ModelError>;
}

/// Chat completion capability.
#[async_trait]
pub trait ChatModel {
    async fn complete(&self, messages: &[ChatTurn]) -> Result<String, ModelError>;
}

/// Cross-encoder style relevance scoring capability: one score per input
/// document, higher meaning more relevant to the query.
#[async_trait]
pub trait Reranker {
    async fn score(&self, query: &str, documents: &[String]) -> Result<Vec<f32>, ModelError>;
}

#[async_trait]
impl Reranker for Box<dyn Reranker + Send + Sync> {
    async fn score(&self, query: &str, documents: &[String]) -> Result<Vec<f32>, ModelError> {
        (**self).score(query, documents).await
    }
}
