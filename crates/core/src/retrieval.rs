use crate::error::AnswerError;
use crate::models::{Chunk, RetrievalOptions};
use crate::traits::Embedder;
use std::collections::HashMap;

const RRF_K: f64 = 60.0;
const LEXICAL_WEIGHT: f64 = 0.5;
const SEMANTIC_WEIGHT: f64 = 0.5;

const BM25_K1: f64 = 1.2;
const BM25_B: f64 = 0.75;

/// Combines a BM25 lexical ranking and an embedding-similarity ranking over
/// the full chunk corpus, merged with reciprocal rank fusion at equal
/// weight. The merged list is de-duplicated by chunk identifier and ordered
/// deterministically: fused score descending, ties by first appearance.
pub struct HybridRetriever {
    options: RetrievalOptions,
}

impl HybridRetriever {
    pub fn new(options: RetrievalOptions) -> Self {
        Self { options }
    }

    pub async fn retrieve<E: Embedder>(
        &self,
        embedder: &E,
        corpus: &[Chunk],
        query: &str,
    ) -> Result<Vec<Chunk>, AnswerError> {
        if corpus.is_empty() {
            return Ok(Vec::new());
        }

        let contents: Vec<String> = corpus.iter().map(Chunk::combined_content).collect();

        let lexical = lexical_ranking(&contents, query, self.options.lexical_k);
        let semantic = self
            .semantic_ranking(embedder, &contents, query)
            .await?;

        let mut fused: HashMap<usize, FusedHit> = HashMap::new();
        apply_rrf(&mut fused, &lexical, LEXICAL_WEIGHT);
        apply_rrf(&mut fused, &semantic, SEMANTIC_WEIGHT);

        let mut merged: Vec<FusedHit> = fused.into_values().collect();
        merged.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then(a.first_seen.cmp(&b.first_seen))
        });

        Ok(merged
            .into_iter()
            .map(|hit| corpus[hit.doc].clone())
            .collect())
    }

    async fn semantic_ranking<E: Embedder>(
        &self,
        embedder: &E,
        contents: &[String],
        query: &str,
    ) -> Result<Vec<usize>, AnswerError> {
        let query_vector = embedder.embed(query).await?;

        let mut scored = Vec::with_capacity(contents.len());
        for (doc, content) in contents.iter().enumerate() {
            let vector = embedder.embed(content).await?;
            scored.push((doc, cosine_similarity(&query_vector, &vector)));
        }

        scored.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
        Ok(scored
            .into_iter()
            .take(self.options.semantic_k)
            .map(|(doc, _)| doc)
            .collect())
    }
}

#[derive(Debug)]
struct FusedHit {
    doc: usize,
    score: f64,
    first_seen: usize,
}

fn apply_rrf(target: &mut HashMap<usize, FusedHit>, ranking: &[usize], weight: f64) {
    for (position, &doc) in ranking.iter().enumerate() {
        let order = target.len();
        let entry = target.entry(doc).or_insert(FusedHit {
            doc,
            score: 0.0,
            first_seen: order,
        });
        entry.score += weight / (RRF_K + (position as f64 + 1.0));
    }
}

fn lexical_ranking(contents: &[String], query: &str, top_k: usize) -> Vec<usize> {
    let index = Bm25Index::build(contents);
    let query_terms = tokenize(query);

    let mut scored: Vec<(usize, f64)> = (0..contents.len())
        .map(|doc| (doc, index.score(&query_terms, doc)))
        .filter(|(_, score)| *score > 0.0)
        .collect();

    scored.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
    scored.into_iter().take(top_k).map(|(doc, _)| doc).collect()
}

pub(crate) fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    if a.is_empty() || a.len() != b.len() {
        return 0.0;
    }

    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (x, y) in a.iter().zip(b) {
        dot += f64::from(*x) * f64::from(*y);
        norm_a += f64::from(*x) * f64::from(*x);
        norm_b += f64::from(*y) * f64::from(*y);
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|token| !token.is_empty())
        .map(str::to_string)
        .collect()
}

/// In-memory Okapi BM25 over the chunk corpus, rebuilt per question. The
/// corpus is small enough that indexing on the fly beats keeping a
/// persistent inverted index in sync with the object store.
struct Bm25Index {
    term_frequencies: Vec<HashMap<String, usize>>,
    document_frequencies: HashMap<String, usize>,
    lengths: Vec<usize>,
    average_length: f64,
}

impl Bm25Index {
    fn build(contents: &[String]) -> Self {
        let mut term_frequencies = Vec::with_capacity(contents.len());
        let mut document_frequencies: HashMap<String, usize> = HashMap::new();
        let mut lengths = Vec::with_capacity(contents.len());

        for content in contents {
            let tokens = tokenize(content);
            lengths.push(tokens.len());

            let mut frequencies: HashMap<String, usize> = HashMap::new();
            for token in tokens {
                *frequencies.entry(token).or_insert(0) += 1;
            }
            for term in frequencies.keys() {
                *document_frequencies.entry(term.clone()).or_insert(0) += 1;
            }
            term_frequencies.push(frequencies);
        }

        let total: usize = lengths.iter().sum();
        let average_length = if lengths.is_empty() {
            0.0
        } else {
            total as f64 / lengths.len() as f64
        };

        Self {
            term_frequencies,
            document_frequencies,
            lengths,
            average_length,
        }
    }

    fn score(&self, query_terms: &[String], doc: usize) -> f64 {
        if self.average_length == 0.0 {
            return 0.0;
        }

        let corpus_size = self.term_frequencies.len() as f64;
        let length_norm =
            1.0 - BM25_B + BM25_B * (self.lengths[doc] as f64 / self.average_length);

        let mut score = 0.0;
        for term in query_terms {
            let frequency = *self.term_frequencies[doc].get(term).unwrap_or(&0) as f64;
            if frequency == 0.0 {
                continue;
            }

            let document_frequency =
                *self.document_frequencies.get(term).unwrap_or(&0) as f64;
            let idf =
                ((corpus_size - document_frequency + 0.5) / (document_frequency + 0.5) + 1.0).ln();
            score += idf * (frequency * (BM25_K1 + 1.0))
                / (frequency + BM25_K1 * length_norm);
        }

        score
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ModelError;
    use async_trait::async_trait;

    /// Deterministic toy embedder: buckets byte values into a fixed-width
    /// frequency vector.
    struct ByteBucketEmbedder;

    #[async_trait]
    impl Embedder for ByteBucketEmbedder {
        async fn embed(&self, text: &str) -> Result<Vec<f32>, ModelError> {
            let mut vector = vec![0.0f32; 16];
            for byte in text.bytes() {
                vector[(byte % 16) as usize] += 1.0;
            }
            Ok(vector)
        }
    }

    /// Embedder that must never be called.
    struct PanickingEmbedder;

    #[async_trait]
    impl Embedder for PanickingEmbedder {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>, ModelError> {
            panic!("embedder must not be invoked for an empty corpus");
        }
    }

    fn chunk(id: usize, text: &str) -> Chunk {
        Chunk::new("doc.pdf", id, 0, text.to_string())
    }

    #[tokio::test]
    async fn empty_corpus_returns_empty_without_embedding() {
        let retriever = HybridRetriever::new(RetrievalOptions::default());
        let hits = retriever
            .retrieve(&PanickingEmbedder, &[], "any question")
            .await
            .unwrap();
        assert!(hits.is_empty());
    }

    #[tokio::test]
    async fn lexical_match_is_retrieved() {
        let corpus = vec![
            chunk(0, "the patient presented with a fractured tibia"),
            chunk(1, "invoice totals and billing addresses"),
            chunk(2, "weather conditions on the day of the incident"),
        ];

        let retriever = HybridRetriever::new(RetrievalOptions::default());
        let hits = retriever
            .retrieve(&ByteBucketEmbedder, &corpus, "fractured tibia")
            .await
            .unwrap();

        assert_eq!(hits[0].chunk_id, "doc.pdf-0");
    }

    #[tokio::test]
    async fn merged_list_contains_each_chunk_once() {
        let corpus = vec![
            chunk(0, "hydraulic pump maintenance schedule"),
            chunk(1, "hydraulic pump failure modes"),
        ];

        let retriever = HybridRetriever::new(RetrievalOptions::default());
        let hits = retriever
            .retrieve(&ByteBucketEmbedder, &corpus, "hydraulic pump")
            .await
            .unwrap();

        let mut ids: Vec<&str> = hits.iter().map(|c| c.chunk_id.as_str()).collect();
        let before = ids.len();
        ids.dedup();
        assert_eq!(before, ids.len());
        assert_eq!(before, 2);
    }

    #[tokio::test]
    async fn retrieval_is_deterministic() {
        let corpus = vec![
            chunk(0, "alpha beta gamma"),
            chunk(1, "beta gamma delta"),
            chunk(2, "gamma delta epsilon"),
        ];

        let retriever = HybridRetriever::new(RetrievalOptions::default());
        let first = retriever
            .retrieve(&ByteBucketEmbedder, &corpus, "gamma delta")
            .await
            .unwrap();
        let second = retriever
            .retrieve(&ByteBucketEmbedder, &corpus, "gamma delta")
            .await
            .unwrap();

        let first_ids: Vec<&str> = first.iter().map(|c| c.chunk_id.as_str()).collect();
        let second_ids: Vec<&str> = second.iter().map(|c| c.chunk_id.as_str()).collect();
        assert_eq!(first_ids, second_ids);
    }

    #[test]
    fn bm25_prefers_rarer_terms() {
        let contents = vec![
            "common common common rare".to_string(),
            "common common common common".to_string(),
        ];
        let index = Bm25Index::build(&contents);
        let query = tokenize("rare");
        assert!(index.score(&query, 0) > index.score(&query, 1));
    }

    #[test]
    fn cosine_handles_zero_vectors() {
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]), 0.0);
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
        let same = cosine_similarity(&[1.0, 2.0], &[1.0, 2.0]);
        assert!((same - 1.0).abs() < 1e-9);
    }
}
