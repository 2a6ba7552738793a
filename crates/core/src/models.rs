use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A bounded text window cut from one page of an uploaded document,
/// optionally enriched with an LLM-generated situating summary.
///
/// The serialized form of this struct is the persisted chunk record.
/// Relevance scores are never part of it; they only exist on
/// [`RetrievalCandidate`] during a single answer call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    /// Stable identifier: `{filename}-{sequence number}`.
    pub chunk_id: String,
    pub filename: String,
    /// Position of the chunk within its document, global across pages.
    pub sequence: usize,
    /// Zero-based index of the source page; always a valid page of the
    /// document the chunk was cut from.
    pub page_index: usize,
    pub text_raw: String,
    /// Situating summary produced by the contextualizer; `None` until the
    /// chunk has been contextualized.
    pub context: Option<String>,
    pub ingested_at: DateTime<Utc>,
}

impl Chunk {
    pub fn new(filename: &str, sequence: usize, page_index: usize, text_raw: String) -> Self {
        Self {
            chunk_id: format!("{filename}-{sequence}"),
            filename: filename.to_string(),
            sequence,
            page_index,
            text_raw,
            context: None,
            ingested_at: Utc::now(),
        }
    }

    /// The text that is embedded, scored, and shown to the answering model:
    /// the situating summary, a blank line, then the raw chunk text.
    pub fn combined_content(&self) -> String {
        match &self.context {
            Some(context) => format!("{context}\n\n{}", self.text_raw),
            None => self.text_raw.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

/// A single message in a conversation or an assembled prompt.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatTurn {
    pub role: ChatRole,
    pub text: String,
}

impl ChatTurn {
    pub fn system(text: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            text: text.into(),
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            text: text.into(),
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            text: text.into(),
        }
    }
}

/// A chunk paired with the relevance score the reranker assigned to it.
/// Ephemeral; lives only for the duration of one answer call.
#[derive(Debug, Clone)]
pub struct RetrievalCandidate {
    pub chunk: Chunk,
    pub score: f64,
}

#[derive(Debug, Clone, Copy)]
pub struct ChunkingOptions {
    pub max_chars: usize,
    pub overlap_chars: usize,
}

impl Default for ChunkingOptions {
    fn default() -> Self {
        Self {
            max_chars: 1_024,
            overlap_chars: 64,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RetrievalOptions {
    /// Candidates taken from the BM25 ranking.
    pub lexical_k: usize,
    /// Candidates taken from the embedding-similarity ranking.
    pub semantic_k: usize,
    /// Candidates kept after reranking.
    pub rerank_top_n: usize,
}

impl Default for RetrievalOptions {
    fn default() -> Self {
        Self {
            lexical_k: 4,
            semantic_k: 4,
            rerank_top_n: 5,
        }
    }
}
