use crate::chunking::split_pages;
use crate::contextualize::{apply_context, situate_chunk};
use crate::conversation::{build_prompt, strip_reasoning, Conversation};
use crate::error::{AnswerError, IngestError, StorageError};
use crate::extractor::PdfExtractor;
use crate::models::{ChunkingOptions, RetrievalOptions};
use crate::rerank::rerank;
use crate::retrieval::HybridRetriever;
use crate::store::{ChunkStore, PDF_PREFIX};
use crate::traits::{ChatModel, Embedder, ObjectStore, Reranker};
use regex::Regex;
use tracing::info;

/// The whole retrieval-and-generation pipeline wired over the five
/// external capabilities: PDF text extraction, object storage, embeddings,
/// chat completion, and relevance scoring.
///
/// Contextualization and answering may use different chat models, so the
/// pipeline carries two instances of the chat capability.
pub struct RagPipeline<X, S, E, M, R>
where
    X: PdfExtractor,
    S: ObjectStore,
    E: Embedder,
    M: ChatModel,
    R: Reranker,
{
    extractor: X,
    store: ChunkStore<S>,
    embedder: E,
    context_model: M,
    answer_model: M,
    reranker: R,
    chunking: ChunkingOptions,
    retrieval: RetrievalOptions,
}

impl<X, S, E, M, R> RagPipeline<X, S, E, M, R>
where
    X: PdfExtractor + Send + Sync,
    S: ObjectStore + Send + Sync,
    E: Embedder + Send + Sync,
    M: ChatModel + Send + Sync,
    R: Reranker + Send + Sync,
{
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        extractor: X,
        store: S,
        embedder: E,
        context_model: M,
        answer_model: M,
        reranker: R,
        chunking: ChunkingOptions,
        retrieval: RetrievalOptions,
    ) -> Self {
        Self {
            extractor,
            store: ChunkStore::new(store),
            embedder,
            context_model,
            answer_model,
            reranker,
            chunking,
            retrieval,
        }
    }

    /// Stores the raw PDF, then chunks, contextualizes, and persists its
    /// text. Chunks are processed strictly in sequence order; the first
    /// model or storage failure aborts the rest of the document, leaving
    /// any already-persisted chunks in place (no rollback).
    ///
    /// Re-uploading a filename overwrites colliding chunk records; stale
    /// records with higher sequence numbers from a longer previous version
    /// are left behind.
    pub async fn ingest_document(&self, filename: &str, pdf: &[u8]) -> Result<usize, IngestError> {
        validate_filename(filename)?;

        self.store
            .inner()
            .put(&format!("{PDF_PREFIX}{filename}"), pdf)
            .await?;

        let pages = self.extractor.extract_pages(pdf)?;
        let chunks = split_pages(filename, &pages, self.chunking);
        let total = chunks.len();

        for mut chunk in chunks {
            let summary =
                situate_chunk(&self.context_model, &pages[chunk.page_index], &chunk.text_raw)
                    .await?;
            apply_context(&mut chunk, summary);
            let sequence = chunk.sequence;
            self.store.persist(&chunk, filename, sequence).await?;
        }

        info!(filename, chunk_count = total, "document ingested");
        Ok(total)
    }

    /// Answers a question against the full persisted corpus, updating the
    /// conversation only after the answer is finalized. A failure anywhere
    /// in the chain leaves the conversation unchanged.
    ///
    /// An empty corpus is not an error: the model is still invoked with
    /// empty context and its answer flows through the post-processor.
    pub async fn answer(
        &self,
        conversation: &mut Conversation,
        question: &str,
    ) -> Result<String, AnswerError> {
        let corpus = self.store.load_corpus().await?;

        let retriever = HybridRetriever::new(self.retrieval);
        let merged = retriever.retrieve(&self.embedder, &corpus, question).await?;
        let context = rerank(
            &self.reranker,
            question,
            merged,
            self.retrieval.rerank_top_n,
        )
        .await?;

        let prompt = build_prompt(conversation, &context, question);
        let raw = self.answer_model.complete(&prompt).await?;
        if raw.trim().is_empty() {
            return Err(AnswerError::EmptyAnswer);
        }

        let answer = strip_reasoning(&raw).trim().to_string();
        conversation.record_exchange(question, &answer);

        info!(
            context_chunks = context.len(),
            history_turns = conversation.len(),
            "answer generated"
        );
        Ok(answer)
    }

    /// Filenames of all stored source PDFs, sorted.
    pub async fn list_documents(&self) -> Result<Vec<String>, StorageError> {
        let keys = self.store.inner().list_keys(PDF_PREFIX, ".pdf").await?;

        let mut names: Vec<String> = keys
            .into_iter()
            .map(|key| {
                key.rsplit('/')
                    .next()
                    .map(str::to_string)
                    .unwrap_or(key)
            })
            .collect();
        names.sort();
        Ok(names)
    }
}

/// Reduces an uploaded filename to a safe storage key: path components are
/// stripped and anything outside `[A-Za-z0-9._-]` becomes an underscore.
pub fn sanitize_filename(name: &str) -> String {
    let base = name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(name);

    let disallowed = Regex::new(r"[^A-Za-z0-9._-]").expect("static pattern");
    disallowed
        .replace_all(base, "_")
        .trim_matches('.')
        .to_string()
}

fn validate_filename(filename: &str) -> Result<(), IngestError> {
    if filename.is_empty() {
        return Err(IngestError::Validation("no selected file".to_string()));
    }

    let is_pdf = filename
        .rsplit_once('.')
        .is_some_and(|(_, extension)| extension.eq_ignore_ascii_case("pdf"));
    if !is_pdf {
        return Err(IngestError::Validation(format!(
            "file type not permitted: {filename}"
        )));
    }

    Ok(())
}
