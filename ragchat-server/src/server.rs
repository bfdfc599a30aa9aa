use std::{convert::Infallible, future::Future, net::SocketAddr, sync::Arc};

use anyhow::Context;
use axum::{
    Json, Router,
    body::Body,
    extract::State,
    http::header,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use futures::{FutureExt, StreamExt};
use ragchat_model::{
    CompletionRelay, RelayConfig,
    openai::{OPENAI_API_BASE, OpenAIClient, OpenAIConfig},
};
use ragchat_rag::{
    DocumentStore, EmbeddingProvider, KnowledgePublisher, OpenAIEmbeddingProvider,
    RetrievalConfig, Retriever, SeedOptions, knowledge_base,
};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tokio::{net::TcpListener, sync::watch};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{error, info, warn};

use crate::{config::ServerConfig, error::ApiError, seeds::seed_texts};

/// Shared handles for the chat handlers.
#[derive(Clone)]
pub struct AppState {
    pub retriever: Arc<Retriever>,
    pub relay: Arc<CompletionRelay>,
}

impl AppState {
    pub fn new(retriever: Retriever, relay: CompletionRelay) -> Self {
        Self { retriever: Arc::new(retriever), relay: Arc::new(relay) }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    pub reply: String,
}

pub fn app_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/chat", post(chat))
        .route("/chat/stream", post(chat_stream))
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

/// Build the OpenAI-backed pipeline, then seed and serve concurrently until
/// Ctrl-C. See [`serve_until_shutdown`].
pub async fn run(config: ServerConfig) -> anyhow::Result<()> {
    let api_key = std::env::var("OPENAI_API_KEY").context("OPENAI_API_KEY must be set")?;
    let base_url = config.base_url.clone().unwrap_or_else(|| OPENAI_API_BASE.to_string());

    let mut embedder = OpenAIEmbeddingProvider::new(api_key.clone())?
        .with_model(config.embedding_model.clone())
        .with_base_url(base_url.clone())
        .with_timeout(config.request_timeout);
    if let Some(dimensions) = config.embedding_dimensions {
        embedder = embedder.with_dimensions(dimensions);
    }
    let embedder: Arc<dyn EmbeddingProvider> = Arc::new(embedder);

    let model = OpenAIClient::new(
        OpenAIConfig::compatible(api_key, base_url, config.chat_model.clone())
            .with_timeout(config.request_timeout),
    )?;

    let retrieval = RetrievalConfig::builder()
        .top_k(config.top_k)
        .ready_timeout(config.request_timeout)
        .build()?;
    let relay_config = RelayConfig::builder()
        .first_token_timeout(config.request_timeout)
        .idle_timeout(config.request_timeout)
        .build()?;

    let texts = seed_texts(config.knowledge_file.as_deref())?;
    let options = SeedOptions::default()
        .policy(config.seed_policy)
        .concurrency(config.seed_concurrency);

    let (publisher, knowledge) = knowledge_base();
    let state = AppState::new(
        Retriever::new(embedder.clone(), knowledge, retrieval),
        CompletionRelay::new(Arc::new(model), relay_config),
    );

    let addr: SocketAddr = config
        .bind_address()
        .parse()
        .with_context(|| format!("invalid host/port '{}'", config.bind_address()))?;
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(
        address = %addr,
        chat_model = %config.chat_model,
        embedding_model = %config.embedding_model,
        seed_texts = texts.len(),
        "ragchat-server listening"
    );

    let seeding = seed_knowledge(embedder, texts, options, publisher);
    serve_until_shutdown(listener, state, seeding, shutdown_signal()).await
}

/// Serve `state` on `listener` while `seeding` runs.
///
/// Requests that arrive before seeding finishes wait on the knowledge base.
/// The server drains gracefully when `shutdown` resolves or when seeding
/// fails; in the second case the seeding error is returned. A shutdown that
/// arrives first cancels seeding.
pub async fn serve_until_shutdown<S, F>(
    listener: TcpListener,
    state: AppState,
    seeding: S,
    shutdown: F,
) -> anyhow::Result<()>
where
    S: Future<Output = anyhow::Result<()>>,
    F: Future<Output = ()>,
{
    let shutdown = shutdown.shared();
    let (stop, stopped) = watch::channel(false);

    let serve = async move {
        axum::serve(listener, app_router(state))
            .with_graceful_shutdown(stop_requested(stopped))
            .await
            .context("server terminated")
    };

    let supervise = async move {
        let seeded = tokio::select! {
            result = seeding => result,
            () = shutdown.clone() => {
                warn!("shutdown requested before seeding finished");
                stop.send_replace(true);
                return anyhow::Ok(());
            }
        };
        if seeded.is_ok() {
            shutdown.await;
        }
        stop.send_replace(true);
        seeded
    };

    let (seeded, served) = tokio::join!(supervise, serve);
    served?;
    seeded
}

async fn stop_requested(mut stopped: watch::Receiver<bool>) {
    // A dropped sender counts as a stop.
    stopped.wait_for(|stop| *stop).await.ok();
}

/// Seed the store and open the readiness gate, or close it on failure.
pub async fn seed_knowledge(
    embedder: Arc<dyn EmbeddingProvider>,
    texts: Vec<String>,
    options: SeedOptions,
    publisher: KnowledgePublisher,
) -> anyhow::Result<()> {
    match DocumentStore::seed(embedder.as_ref(), texts, options).await {
        Ok(store) => {
            publisher.publish(store);
            Ok(())
        }
        Err(e) => {
            publisher.fail();
            Err(anyhow::Error::new(e).context("failed to seed the knowledge base"))
        }
    }
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("shutdown requested"),
        Err(e) => {
            error!(error = %e, "cannot listen for ctrl-c, running until killed");
            std::future::pending::<()>().await;
        }
    }
}

async fn health(State(state): State<AppState>) -> Json<Value> {
    let documents = state.retriever.knowledge().current().map(|store| store.len());
    Json(json!({
        "status": "ok",
        "ready": documents.is_some(),
        "documents": documents.unwrap_or(0),
    }))
}

fn require_message(request: &ChatRequest) -> Result<&str, ApiError> {
    if request.message.trim().is_empty() {
        return Err(ApiError::BadRequest("message must not be empty".into()));
    }
    Ok(&request.message)
}

async fn chat(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    let message = require_message(&request)?;
    let context = state.retriever.context(message).await?;
    let reply = state.relay.complete(&context, message).await?;
    Ok(Json(ChatResponse { reply: reply.reply }))
}

async fn chat_stream(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Result<Response, ApiError> {
    let message = require_message(&request)?;
    let context = state.retriever.context(message).await?;
    let tokens = state.relay.complete_stream(&context, message).await?;

    let body = Body::from_stream(tokens.map(Ok::<_, Infallible>));
    Ok((
        [(header::CONTENT_TYPE, "text/event-stream"), (header::CACHE_CONTROL, "no-cache")],
        body,
    )
        .into_response())
}
