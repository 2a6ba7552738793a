use thiserror::Error;

/// Failures talking to the object store that persists PDFs and chunk records.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid object key: {0}")]
    InvalidKey(String),

    #[error("storage request timed out: {0}")]
    Timeout(String),
}

/// Failures from the embedding, chat, or rerank model services.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("url parse error: {0}")]
    Url(#[from] url::ParseError),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("model endpoint {endpoint} returned {details}")]
    Backend { endpoint: String, details: String },

    #[error("invalid response from {endpoint}: {details}")]
    InvalidResponse { endpoint: String, details: String },

    #[error("request to {endpoint} timed out")]
    Timeout { endpoint: String },
}

impl ModelError {
    /// Folds a transport failure into the right variant, keeping timeouts
    /// distinguishable from other transport errors.
    pub fn from_transport(endpoint: &str, error: reqwest::Error) -> Self {
        if error.is_timeout() {
            ModelError::Timeout {
                endpoint: endpoint.to_string(),
            }
        } else {
            ModelError::Http(error)
        }
    }
}

/// Errors raised while uploading and indexing a document.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("upload rejected: {0}")]
    Validation(String),

    #[error("pdf parse error: {0}")]
    PdfParse(String),

    #[error("serialize error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("model invocation failed: {0}")]
    Model(#[from] ModelError),
}

/// Errors raised while answering a question.
#[derive(Debug, Error)]
pub enum AnswerError {
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("corrupt chunk record {key}: {details}")]
    Deserialization { key: String, details: String },

    #[error("model invocation failed: {0}")]
    Model(#[from] ModelError),

    #[error("model returned empty output")]
    EmptyAnswer,
}

pub type Result<T, E = IngestError> = std::result::Result<T, E>;
