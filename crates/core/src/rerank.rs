use crate::error::{AnswerError, ModelError};
use crate::models::{Chunk, RetrievalCandidate};
use crate::retrieval::cosine_similarity;
use crate::traits::{Embedder, Reranker};
use async_trait::async_trait;

/// Re-scores every merged candidate against the query, sorts descending by
/// relevance, and keeps the top `top_n`. The sort is stable, so equal
/// scores keep their merge order.
pub async fn rerank<R: Reranker>(
    reranker: &R,
    query: &str,
    candidates: Vec<Chunk>,
    top_n: usize,
) -> Result<Vec<RetrievalCandidate>, AnswerError> {
    if candidates.is_empty() {
        return Ok(Vec::new());
    }

    let documents: Vec<String> = candidates.iter().map(Chunk::combined_content).collect();
    let scores = reranker
        .score(query, &documents)
        .await
        .map_err(AnswerError::Model)?;

    if scores.len() != candidates.len() {
        return Err(AnswerError::Model(ModelError::InvalidResponse {
            endpoint: "reranker".to_string(),
            details: format!(
                "expected {} scores, got {}",
                candidates.len(),
                scores.len()
            ),
        }));
    }

    let mut ranked: Vec<RetrievalCandidate> = candidates
        .into_iter()
        .zip(scores)
        .map(|(chunk, score)| RetrievalCandidate {
            chunk,
            score: f64::from(score),
        })
        .collect();

    ranked.sort_by(|a, b| b.score.total_cmp(&a.score));
    ranked.truncate(top_n);
    Ok(ranked)
}

/// Fallback relevance scorer used when no cross-encoder endpoint is
/// configured: cosine similarity between query and document embeddings.
/// Cheaper and less accurate than a true cross-encoder.
pub struct EmbeddingReranker<E: Embedder> {
    embedder: E,
}

impl<E: Embedder> EmbeddingReranker<E> {
    pub fn new(embedder: E) -> Self {
        Self { embedder }
    }
}

#[async_trait]
impl<E: Embedder + Send + Sync> Reranker for EmbeddingReranker<E> {
    async fn score(&self, query: &str, documents: &[String]) -> Result<Vec<f32>, ModelError> {
        let query_vector = self.embedder.embed(query).await?;

        let mut scores = Vec::with_capacity(documents.len());
        for document in documents {
            let vector = self.embedder.embed(document).await?;
            scores.push(cosine_similarity(&query_vector, &vector) as f32);
        }
        Ok(scores)
    }
}
