pub mod fs;
pub mod ollama;
pub mod rerank;

pub use fs::FsObjectStore;
pub use ollama::OllamaClient;
pub use rerank::HttpReranker;
