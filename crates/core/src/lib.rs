//! Core library for a retrieval-augmented document Q&A backend.
//!
//! Uploaded PDFs are split into overlapping chunks, each chunk is
//! contextualized with an LLM-generated situating summary, and the
//! records are persisted to an object store. Questions are answered by
//! hybrid retrieval (BM25 + embedding similarity, rank-fused), reranking,
//! prompt assembly with the running conversation, and post-processing of
//! the model output.
//!
//! All external services — storage, embeddings, chat completion, rerank
//! scoring, PDF text extraction — sit behind capability traits so they
//! can be swapped or mocked.

pub mod chunking;
pub mod contextualize;
pub mod conversation;
pub mod error;
pub mod extractor;
pub mod models;
pub mod pipeline;
pub mod rerank;
pub mod retrieval;
pub mod store;
pub mod stores;
pub mod traits;

pub use chunking::{normalize_whitespace, split_page, split_pages};
pub use contextualize::situate_chunk;
pub use conversation::{build_prompt, strip_reasoning, Conversation, SYSTEM_PROMPT};
pub use error::{AnswerError, IngestError, ModelError, StorageError};
pub use extractor::{LopdfExtractor, PdfExtractor};
pub use models::{
    ChatRole, ChatTurn, Chunk, ChunkingOptions, RetrievalCandidate, RetrievalOptions,
};
pub use pipeline::{sanitize_filename, RagPipeline};
pub use rerank::{rerank, EmbeddingReranker};
pub use retrieval::HybridRetriever;
pub use store::{ChunkStore, CHUNK_PREFIX, PDF_PREFIX};
pub use stores::{FsObjectStore, HttpReranker, OllamaClient};
pub use traits::{ChatModel, Embedder, ObjectStore, Reranker};
