use crate::error::{AnswerError, IngestError, StorageError};
use crate::models::Chunk;
use crate::traits::ObjectStore;

/// Storage namespace for persisted chunk records.
pub const CHUNK_PREFIX: &str = "chunks/";
/// Storage namespace for uploaded source PDFs.
pub const PDF_PREFIX: &str = "pdf/";

/// Serializes chunks to persisted records and reconstitutes them.
///
/// Records are keyed `chunks/{document key}-{sequence}.json`. The backing
/// store treats them as opaque blobs; this adapter owns the JSON shape.
pub struct ChunkStore<S: ObjectStore> {
    store: S,
}

impl<S: ObjectStore> ChunkStore<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn inner(&self) -> &S {
        &self.store
    }

    pub fn chunk_key(document_key: &str, sequence: usize) -> String {
        format!("{CHUNK_PREFIX}{document_key}-{sequence}.json")
    }

    pub async fn persist(
        &self,
        chunk: &Chunk,
        document_key: &str,
        sequence: usize,
    ) -> Result<(), IngestError> {
        let record = serde_json::to_vec(chunk)?;
        let key = Self::chunk_key(document_key, sequence);
        self.store.put(&key, &record).await?;
        Ok(())
    }

    pub async fn load(&self, key: &str) -> Result<Chunk, AnswerError> {
        let bytes = self.store.get(key).await?;
        serde_json::from_slice(&bytes).map_err(|error| AnswerError::Deserialization {
            key: key.to_string(),
            details: error.to_string(),
        })
    }

    /// All chunk record keys; order is whatever the backing store returns.
    pub async fn list_chunk_keys(&self) -> Result<Vec<String>, StorageError> {
        self.store.list_keys(CHUNK_PREFIX, ".json").await
    }

    /// Reconstitutes every persisted chunk, sorted by document and sequence
    /// number. Listing order from the backing store is never trusted.
    pub async fn load_corpus(&self) -> Result<Vec<Chunk>, AnswerError> {
        let keys = self.list_chunk_keys().await?;

        let mut corpus = Vec::with_capacity(keys.len());
        for key in keys {
            corpus.push(self.load(&key).await?);
        }

        corpus.sort_by(|a, b| {
            a.filename
                .cmp(&b.filename)
                .then(a.sequence.cmp(&b.sequence))
        });
        Ok(corpus)
    }
}
