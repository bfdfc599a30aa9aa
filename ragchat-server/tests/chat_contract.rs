use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use ragchat_model::{ChatModel, CompletionRelay, MockChatModel, RelayConfig};
use ragchat_rag::{
    DocumentStore, EmbeddingProvider, KnowledgeBase, RagError, RetrievalConfig, Retriever,
    SeedOptions, knowledge_base,
};
use ragchat_server::{AppState, ChatResponse, app_router, seed_knowledge, serve_until_shutdown};
use serde_json::{Value, json};

const CATS: &str = "cats are mammals";
const DOGS: &str = "dogs are mammals";
const PARIS: &str = "Paris is in France";
const QUERY: &str = "are cats mammals?";

struct TableEmbeddingProvider {
    table: HashMap<String, Vec<f32>>,
}

#[async_trait]
impl EmbeddingProvider for TableEmbeddingProvider {
    async fn embed(&self, text: &str) -> ragchat_rag::Result<Vec<f32>> {
        self.table.get(text).cloned().ok_or_else(|| RagError::EmbeddingError {
            provider: "table".into(),
            message: format!("no embedding for '{text}'"),
        })
    }
}

fn embedder() -> Arc<dyn EmbeddingProvider> {
    let entries = [
        (CATS, [1.0, 0.1, 0.0]),
        (DOGS, [0.95, 0.15, 0.0]),
        (PARIS, [0.0, 0.1, 1.0]),
        (QUERY, [1.0, 0.12, 0.0]),
    ];
    Arc::new(TableEmbeddingProvider {
        table: entries.iter().map(|(t, v)| (t.to_string(), v.to_vec())).collect(),
    })
}

async fn seeded() -> KnowledgeBase {
    let store = DocumentStore::seed(embedder().as_ref(), [CATS, DOGS, PARIS], SeedOptions::default())
        .await
        .expect("seed store");
    KnowledgeBase::ready(store)
}

fn state(knowledge: KnowledgeBase, model: Arc<dyn ChatModel>, retrieval: RetrievalConfig) -> AppState {
    relay_state(knowledge, model, retrieval, RelayConfig::default())
}

fn relay_state(
    knowledge: KnowledgeBase,
    model: Arc<dyn ChatModel>,
    retrieval: RetrievalConfig,
    relay: RelayConfig,
) -> AppState {
    AppState::new(
        Retriever::new(embedder(), knowledge, retrieval),
        CompletionRelay::new(model, relay),
    )
}

async fn post_stream(base: &str) -> reqwest::Response {
    reqwest::Client::new()
        .post(format!("{}/chat/stream", base))
        .json(&json!({ "message": QUERY }))
        .send()
        .await
        .expect("stream response")
}

async fn spawn_server(state: AppState) -> (String, tokio::task::JoinHandle<()>) {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind test listener");
    let addr = listener.local_addr().expect("listener addr");

    let handle = tokio::spawn(async move {
        axum::serve(listener, app_router(state)).await.expect("server run");
    });

    (format!("http://{}", addr), handle)
}

#[tokio::test]
async fn health_reports_seeded_documents() {
    let model = Arc::new(MockChatModel::new("unused"));
    let (base, handle) = spawn_server(state(seeded().await, model, RetrievalConfig::default())).await;

    let body: Value = reqwest::get(format!("{}/health", base))
        .await
        .expect("health response")
        .json()
        .await
        .expect("health json");

    assert_eq!(body["status"], "ok");
    assert_eq!(body["ready"], true);
    assert_eq!(body["documents"], 3);

    handle.abort();
}

#[tokio::test]
async fn chat_grounds_the_reply_in_the_top_documents() {
    let model = Arc::new(MockChatModel::new("Yes, cats are mammals."));
    let (base, handle) =
        spawn_server(state(seeded().await, model.clone(), RetrievalConfig::default())).await;

    let response = reqwest::Client::new()
        .post(format!("{}/chat", base))
        .json(&json!({ "message": QUERY }))
        .send()
        .await
        .expect("chat response");
    assert!(response.status().is_success());
    let body: ChatResponse = response.json().await.expect("chat json");
    assert_eq!(body.reply, "Yes, cats are mammals.");

    let requests = model.requests();
    assert_eq!(requests.len(), 1);
    let system = &requests[0].messages[0].content;
    assert!(system.ends_with(&format!("{CATS}\n{DOGS}")), "{system}");
    assert!(!system.contains(PARIS));
    assert_eq!(requests[0].messages[1].content, QUERY);

    handle.abort();
}

#[tokio::test]
async fn blank_message_is_rejected() {
    let model = Arc::new(MockChatModel::new("unused"));
    let (base, handle) =
        spawn_server(state(seeded().await, model.clone(), RetrievalConfig::default())).await;

    let response = reqwest::Client::new()
        .post(format!("{}/chat", base))
        .json(&json!({ "message": "   " }))
        .send()
        .await
        .expect("chat response");

    assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);
    assert!(model.requests().is_empty());

    handle.abort();
}

#[tokio::test]
async fn stream_relays_tokens_as_they_arrive() {
    let model = Arc::new(MockChatModel::new("").with_chunks(["The", " answer", " is", " 4."]));
    let (base, handle) = spawn_server(state(seeded().await, model, RetrievalConfig::default())).await;

    let response = reqwest::Client::new()
        .post(format!("{}/chat/stream", base))
        .json(&json!({ "message": QUERY }))
        .send()
        .await
        .expect("stream response");

    assert!(response.status().is_success());
    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    assert_eq!(content_type, "text/event-stream");
    assert_eq!(response.text().await.expect("stream body"), "The answer is 4.");

    handle.abort();
}

#[tokio::test]
async fn model_failure_maps_to_bad_gateway() {
    let model = Arc::new(MockChatModel::failing("service down"));
    let (base, handle) = spawn_server(state(seeded().await, model, RetrievalConfig::default())).await;

    let response = reqwest::Client::new()
        .post(format!("{}/chat", base))
        .json(&json!({ "message": QUERY }))
        .send()
        .await
        .expect("chat response");

    assert_eq!(response.status(), reqwest::StatusCode::BAD_GATEWAY);
    let body: Value = response.json().await.expect("error json");
    assert!(body["error"].is_string());

    handle.abort();
}

#[tokio::test]
async fn stream_failing_before_output_maps_to_bad_gateway() {
    let model = Arc::new(MockChatModel::new("").with_chunks(["never"]).fail_stream_after(0));
    let (base, handle) = spawn_server(state(seeded().await, model, RetrievalConfig::default())).await;

    let response = post_stream(&base).await;
    assert_eq!(response.status(), reqwest::StatusCode::BAD_GATEWAY);

    handle.abort();
}

#[tokio::test]
async fn stream_without_a_first_token_maps_to_gateway_timeout() {
    let model = Arc::new(
        MockChatModel::new("").with_chunks(["late"]).with_chunk_delay(Duration::from_secs(10)),
    );
    let relay = RelayConfig::builder()
        .first_token_timeout(Duration::from_millis(100))
        .build()
        .expect("relay config");
    let (base, handle) =
        spawn_server(relay_state(seeded().await, model, RetrievalConfig::default(), relay)).await;

    let response = post_stream(&base).await;
    assert_eq!(response.status(), reqwest::StatusCode::GATEWAY_TIMEOUT);

    handle.abort();
}

#[tokio::test]
async fn requests_before_seeding_finishes_are_unavailable() {
    let (_publisher, knowledge) = knowledge_base();
    let retrieval = RetrievalConfig::builder()
        .ready_timeout(Duration::from_millis(50))
        .build()
        .expect("retrieval config");
    let model = Arc::new(MockChatModel::new("unused"));
    let (base, handle) = spawn_server(state(knowledge, model, retrieval)).await;

    let health: Value = reqwest::get(format!("{}/health", base))
        .await
        .expect("health response")
        .json()
        .await
        .expect("health json");
    assert_eq!(health["ready"], false);

    let response = reqwest::Client::new()
        .post(format!("{}/chat", base))
        .json(&json!({ "message": QUERY }))
        .send()
        .await
        .expect("chat response");
    assert_eq!(response.status(), reqwest::StatusCode::SERVICE_UNAVAILABLE);

    handle.abort();
}

#[tokio::test]
async fn requests_wait_for_background_seeding() {
    let (publisher, knowledge) = knowledge_base();
    let model = Arc::new(MockChatModel::new("Yes."));
    let (base, handle) = spawn_server(state(knowledge, model, RetrievalConfig::default())).await;

    let chat = tokio::spawn({
        let base = base.clone();
        async move {
            reqwest::Client::new()
                .post(format!("{}/chat", base))
                .json(&json!({ "message": QUERY }))
                .send()
                .await
                .expect("chat response")
                .status()
        }
    });

    let texts = vec![CATS.to_string(), DOGS.to_string(), PARIS.to_string()];
    seed_knowledge(embedder(), texts, SeedOptions::default(), publisher)
        .await
        .expect("seeding");

    assert!(chat.await.expect("chat task").is_success());
    handle.abort();
}

#[tokio::test]
async fn failed_seeding_closes_the_gate() {
    let (publisher, knowledge) = knowledge_base();
    let texts = vec![CATS.to_string(), "unknown text".to_string()];

    let err = seed_knowledge(embedder(), texts, SeedOptions::default(), publisher)
        .await
        .expect_err("seeding should fail");
    assert!(err.to_string().contains("seed"), "{err:#}");

    let waited = knowledge.wait(Duration::from_secs(1)).await.expect_err("gate closed");
    assert!(matches!(waited, RagError::SeedingFailed));
}

async fn bind() -> (tokio::net::TcpListener, String) {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind test listener");
    let addr = listener.local_addr().expect("listener addr");
    (listener, format!("http://{}", addr))
}

#[tokio::test]
async fn server_answers_during_seeding_and_stops_on_shutdown() {
    let (listener, base) = bind().await;
    let (publisher, knowledge) = knowledge_base();
    let model = Arc::new(MockChatModel::new("Yes."));
    let state = state(knowledge, model, RetrievalConfig::default());
    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

    let texts = vec![CATS.to_string(), DOGS.to_string(), PARIS.to_string()];
    let server = serve_until_shutdown(
        listener,
        state,
        seed_knowledge(embedder(), texts, SeedOptions::default(), publisher),
        async move {
            shutdown_rx.await.ok();
        },
    );
    let client = async move {
        let status = reqwest::Client::new()
            .post(format!("{}/chat", base))
            .json(&json!({ "message": QUERY }))
            .send()
            .await
            .expect("chat response")
            .status();
        shutdown_tx.send(()).expect("server still running");
        status
    };

    let (served, status) =
        tokio::time::timeout(Duration::from_secs(10), async { tokio::join!(server, client) })
            .await
            .expect("server stopped after shutdown");
    served.expect("clean shutdown");
    assert!(status.is_success());
}

#[tokio::test]
async fn failed_seeding_stops_the_server_with_the_error() {
    let (listener, _base) = bind().await;
    let (publisher, knowledge) = knowledge_base();
    let state = state(knowledge, Arc::new(MockChatModel::new("unused")), RetrievalConfig::default());

    let texts = vec![CATS.to_string(), "unknown text".to_string()];
    let result = tokio::time::timeout(
        Duration::from_secs(10),
        serve_until_shutdown(
            listener,
            state,
            seed_knowledge(embedder(), texts, SeedOptions::default(), publisher),
            std::future::pending::<()>(),
        ),
    )
    .await
    .expect("server stopped after seeding failed");

    let err = result.expect_err("seeding error is returned");
    assert!(format!("{err:#}").contains("seed"), "{err:#}");
}

#[tokio::test]
async fn shutdown_during_seeding_cancels_it() {
    let (listener, _base) = bind().await;
    let (_publisher, knowledge) = knowledge_base();
    let state = state(knowledge, Arc::new(MockChatModel::new("unused")), RetrievalConfig::default());

    let result = tokio::time::timeout(
        Duration::from_secs(10),
        serve_until_shutdown(
            listener,
            state,
            std::future::pending::<anyhow::Result<()>>(),
            std::future::ready(()),
        ),
    )
    .await
    .expect("server stopped without waiting for seeding");

    assert!(result.is_ok());
}
