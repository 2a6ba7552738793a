use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Form, Json, Router,
};
use chrono::Utc;
use clap::Parser;
use contextual_rag_core::{
    sanitize_filename, AnswerError, ChunkingOptions, Conversation, EmbeddingReranker,
    FsObjectStore, HttpReranker, IngestError, LopdfExtractor, OllamaClient, RagPipeline,
    Reranker, RetrievalOptions,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

type Pipeline = RagPipeline<
    LopdfExtractor,
    FsObjectStore,
    OllamaClient,
    OllamaClient,
    Box<dyn Reranker + Send + Sync>,
>;

#[derive(Parser)]
#[command(name = "contextual-rag-server", version)]
struct Cli {
    /// Address to listen on.
    #[arg(long, env = "RAG_LISTEN", default_value = "127.0.0.1:8000")]
    listen: String,

    /// Root directory of the object store (PDFs and chunk records).
    #[arg(long, env = "RAG_DATA_DIR", default_value = "./data")]
    data_dir: String,

    /// Ollama-compatible model server base URL.
    #[arg(long, env = "RAG_MODEL_URL", default_value = "http://localhost:11434")]
    model_url: String,

    /// Embedding model name.
    #[arg(long, env = "RAG_EMBED_MODEL", default_value = "llama3.2")]
    embed_model: String,

    /// Chat model used to contextualize chunks during upload.
    #[arg(long, env = "RAG_CONTEXT_MODEL", default_value = "llama3.2")]
    context_model: String,

    /// Chat model used to answer questions.
    #[arg(long, env = "RAG_ANSWER_MODEL", default_value = "deepseek-r1:7b")]
    answer_model: String,

    /// Cross-encoder rerank endpoint. When unset, falls back to
    /// embedding-similarity reranking.
    #[arg(long, env = "RAG_RERANK_URL")]
    rerank_url: Option<String>,

    /// Bearer token for the rerank endpoint.
    #[arg(long, env = "RAG_RERANK_API_KEY")]
    rerank_api_key: Option<String>,

    /// Timeout applied to every outbound model call, in seconds.
    #[arg(long, env = "RAG_REQUEST_TIMEOUT_SECS", default_value = "120")]
    request_timeout_secs: u64,

    /// Chunk window size in characters.
    #[arg(long, default_value = "1024")]
    chunk_max_chars: usize,

    /// Overlap between adjacent chunk windows, in characters.
    #[arg(long, default_value = "64")]
    chunk_overlap_chars: usize,
}

struct AppState {
    pipeline: Pipeline,
    /// One conversation per caller-supplied session id; process-local,
    /// lost on restart.
    conversations: Mutex<HashMap<String, Conversation>>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(fmt::layer())
        .init();

    let cli = Cli::parse();
    let timeout = Duration::from_secs(cli.request_timeout_secs);

    let ollama = OllamaClient::new(
        &cli.model_url,
        cli.embed_model.as_str(),
        cli.context_model.as_str(),
        timeout,
    )
    .map_err(|error| anyhow::anyhow!(error.to_string()))?;
    let answer_model = ollama.with_chat_model(cli.answer_model.as_str());

    let reranker: Box<dyn Reranker + Send + Sync> = match &cli.rerank_url {
        Some(url) => Box::new(
            HttpReranker::new(url, cli.rerank_api_key.clone(), timeout)
                .map_err(|error| anyhow::anyhow!(error.to_string()))?,
        ),
        None => Box::new(EmbeddingReranker::new(ollama.clone())),
    };

    let pipeline = RagPipeline::new(
        LopdfExtractor,
        FsObjectStore::new(&cli.data_dir),
        ollama.clone(),
        ollama,
        answer_model,
        reranker,
        ChunkingOptions {
            max_chars: cli.chunk_max_chars,
            overlap_chars: cli.chunk_overlap_chars,
        },
        RetrievalOptions::default(),
    );

    let state = Arc::new(AppState {
        pipeline,
        conversations: Mutex::new(HashMap::new()),
    });

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let router = Router::new()
        .route("/upload", post(upload))
        .route("/chat", post(chat))
        .route("/files", get(files))
        .layer(cors)
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(&cli.listen).await?;
    info!(
        listen = %cli.listen,
        data_dir = %cli.data_dir,
        started_at = %Utc::now().to_rfc3339(),
        "contextual-rag-server boot"
    );

    axum::serve(listener, router).await?;
    Ok(())
}

/// `POST /upload`, multipart `files[]`. Fail-fast across the batch: the
/// first document that fails aborts the remaining files, leaving earlier
/// documents fully ingested.
async fn upload(State(state): State<Arc<AppState>>, mut multipart: Multipart) -> Response {
    let mut uploaded = 0usize;

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(error) => {
                return (StatusCode::BAD_REQUEST, format!("malformed upload: {error}"))
                    .into_response()
            }
        };

        let Some(filename) = field.file_name().map(str::to_string) else {
            // Non-file form fields are ignored.
            continue;
        };
        if filename.is_empty() {
            return (StatusCode::BAD_REQUEST, "no selected file").into_response();
        }

        let bytes = match field.bytes().await {
            Ok(bytes) => bytes,
            Err(error) => {
                return (StatusCode::BAD_REQUEST, format!("malformed upload: {error}"))
                    .into_response()
            }
        };

        let safe_name = sanitize_filename(&filename);
        match state.pipeline.ingest_document(&safe_name, &bytes).await {
            Ok(chunk_count) => {
                info!(filename = %safe_name, chunk_count, "file upload success");
                uploaded += 1;
            }
            Err(error) => return ingest_error_response(error),
        }
    }

    if uploaded == 0 {
        return (StatusCode::BAD_REQUEST, "no file part").into_response();
    }

    (StatusCode::OK, "File upload success").into_response()
}

#[derive(Deserialize)]
struct ChatForm {
    text: String,
    #[serde(default)]
    session: Option<String>,
}

/// `POST /chat`, form fields `text` and optional `session`.
async fn chat(State(state): State<Arc<AppState>>, Form(form): Form<ChatForm>) -> Response {
    let session = form.session.unwrap_or_else(|| "default".to_string());

    let mut conversations = state.conversations.lock().await;
    let conversation = conversations.entry(session).or_default();

    match state.pipeline.answer(conversation, &form.text).await {
        Ok(answer) => (StatusCode::OK, answer).into_response(),
        Err(error) => answer_error_response(error),
    }
}

#[derive(Serialize)]
struct FilesResponse {
    files: Vec<String>,
}

/// `GET /files`.
async fn files(State(state): State<Arc<AppState>>) -> Response {
    match state.pipeline.list_documents().await {
        Ok(files) => Json(FilesResponse { files }).into_response(),
        Err(error) => {
            error!(error = %error, "file listing failed");
            (StatusCode::INTERNAL_SERVER_ERROR, "file listing failed").into_response()
        }
    }
}

fn ingest_error_response(error: IngestError) -> Response {
    match &error {
        IngestError::Validation(message) => {
            (StatusCode::BAD_REQUEST, message.clone()).into_response()
        }
        _ => {
            error!(error = %error, "document processing failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "document processing failed",
            )
                .into_response()
        }
    }
}

fn answer_error_response(error: AnswerError) -> Response {
    error!(error = %error, "answer generation failed");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "answer generation failed",
    )
        .into_response()
}
