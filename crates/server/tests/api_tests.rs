use std::sync::{Arc, Mutex};

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use qa_core::{AppConfig, AppError, AppResult};
use qa_knowledge::extract::fetch_html_text;
use qa_knowledge::ingest::{build_chunks, VectorApiClient};
use qa_knowledge::{ChunkConfig, Metadata, RetrievalResult, VectorStore};
use qa_server::{router, AppState};
use serde_json::{json, Value};
use tempfile::TempDir;

/// Requests received by the fake chat provider.
type Recorded = Arc<Mutex<Vec<Value>>>;

#[derive(Clone)]
struct FakeLlm {
    recorded: Recorded,
    status: StatusCode,
    reply: Option<Value>,
}

async fn chat_completions(State(fake): State<FakeLlm>, Json(body): Json<Value>) -> (StatusCode, String) {
    fake.recorded.lock().unwrap().push(body.clone());

    if fake.status != StatusCode::OK {
        return (fake.status, "rate limited".to_string());
    }

    let reply = fake.reply.clone().unwrap_or_else(|| {
        let question = body["messages"]
            .as_array()
            .and_then(|m| m.last())
            .and_then(|m| m["content"].as_str())
            .unwrap_or_default()
            .to_string();
        json!({
            "model": body["model"],
            "choices": [{"message": {"role": "assistant", "content": format!("answer: {}", question)}}]
        })
    });

    (StatusCode::OK, reply.to_string())
}

async fn serve(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind test listener");
    let addr = listener.local_addr().expect("listener addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("server run");
    });
    format!("http://{}", addr)
}

async fn spawn_fake_llm(status: StatusCode, reply: Option<Value>) -> (String, Recorded) {
    let recorded: Recorded = Arc::new(Mutex::new(Vec::new()));
    let app = Router::new()
        .route("/v1/chat/completions", post(chat_completions))
        .with_state(FakeLlm {
            recorded: recorded.clone(),
            status,
            reply,
        });
    (serve(app).await, recorded)
}

fn config(llm_base: &str, store_dir: Option<&TempDir>) -> AppConfig {
    let mut vars = vec![
        ("DASHSCOPE_API_KEY".to_string(), "sk-test".to_string()),
        ("DASHSCOPE_API_BASE".to_string(), format!("{}/v1", llm_base)),
    ];
    if let Some(dir) = store_dir {
        vars.push(("RAG_ENABLED".to_string(), "true".to_string()));
        vars.push(("EMBEDDING_PROVIDER".to_string(), "mock".to_string()));
        vars.push((
            "VECTOR_STORE_DIR".to_string(),
            dir.path().to_string_lossy().to_string(),
        ));
        vars.push(("RAG_TOP_K".to_string(), "2".to_string()));
    }

    let config = AppConfig::from_sources(None, move |key| {
        vars.iter().find(|(k, _)| k == key).map(|(_, v)| v.clone())
    })
    .expect("config");
    config.validate().expect("valid config");
    config
}

async fn spawn_server(state: AppState) -> String {
    serve(router(state).expect("router")).await
}

async fn spawn_default(store_dir: Option<&TempDir>) -> (String, Recorded) {
    let (llm_base, recorded) = spawn_fake_llm(StatusCode::OK, None).await;
    let state = AppState::from_config(config(&llm_base, store_dir))
        .await
        .expect("state");
    (spawn_server(state).await, recorded)
}

async fn post_json(url: String, body: Value) -> (StatusCode, Value) {
    let response = reqwest::Client::new()
        .post(url)
        .json(&body)
        .send()
        .await
        .expect("response");
    let status = StatusCode::from_u16(response.status().as_u16()).expect("status");
    let body = response.json().await.expect("json body");
    (status, body)
}

fn system_messages(request: &Value) -> Vec<String> {
    request["messages"]
        .as_array()
        .map(|messages| {
            messages
                .iter()
                .filter(|m| m["role"] == "system")
                .filter_map(|m| m["content"].as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}

struct FailingStore;

#[async_trait::async_trait]
impl VectorStore for FailingStore {
    async fn add(
        &self,
        _ids: &[String],
        _texts: &[String],
        _metadatas: Option<&[Metadata]>,
    ) -> AppResult<usize> {
        Err(AppError::Store("disk full".to_string()))
    }

    async fn search(&self, _query: &str, _k: usize) -> AppResult<Vec<RetrievalResult>> {
        Err(AppError::Embedding("embedding service down".to_string()))
    }

    async fn count(&self) -> AppResult<usize> {
        Ok(0)
    }
}

#[tokio::test]
async fn health_reports_provider_and_model() {
    let (base, _) = spawn_default(None).await;

    let body: Value = reqwest::get(format!("{}/api/health", base))
        .await
        .expect("health response")
        .json()
        .await
        .expect("health json");

    assert_eq!(
        body,
        json!({"status": "ok", "model": "qwen2.5-7b-instruct", "provider": "dashscope"})
    );
}

#[tokio::test]
async fn blank_question_is_rejected() {
    let (base, recorded) = spawn_default(None).await;

    let (status, body) = post_json(
        format!("{}/api/qa/ask", base),
        json!({"question": "   \n "}),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["detail"].as_str().is_some());
    assert!(recorded.lock().unwrap().is_empty());
}

#[tokio::test]
async fn context_passes_through_when_rag_disabled() {
    let (base, recorded) = spawn_default(None).await;

    let (status, body) = post_json(
        format!("{}/api/qa/ask", base),
        json!({
            "question": "  What is Platform AI?  ",
            "context": "The user is an admin.",
            "session_id": "s-1",
            "stream": true
        }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["answer"], "answer: What is Platform AI?");
    assert_eq!(body["session_id"], "s-1");

    let requests = recorded.lock().unwrap();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0]["model"], "qwen2.5-7b-instruct");
    assert_eq!(requests[0]["stream"], json!(false));
    assert_eq!(requests[0]["temperature"].as_f64().map(|t| (t * 10.0).round()), Some(7.0));
    assert_eq!(system_messages(&requests[0]), vec!["The user is an admin."]);
}

#[tokio::test]
async fn no_context_sends_only_the_question() {
    let (base, recorded) = spawn_default(None).await;

    let (status, body) = post_json(
        format!("{}/api/qa/ask", base),
        json!({"question": "Hello?", "context": ""}),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["session_id"], Value::Null);

    let requests = recorded.lock().unwrap();
    let messages = requests[0]["messages"].as_array().cloned().unwrap_or_default();
    assert_eq!(messages, vec![json!({"role": "user", "content": "Hello?"})]);
}

#[tokio::test]
async fn upstream_status_and_body_are_propagated() {
    let (llm_base, _) = spawn_fake_llm(StatusCode::TOO_MANY_REQUESTS, None).await;
    let state = AppState::from_config(config(&llm_base, None)).await.expect("state");
    let base = spawn_server(state).await;

    let (status, body) =
        post_json(format!("{}/api/qa/ask", base), json!({"question": "hi"})).await;

    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body, json!({"detail": "rate limited"}));
}

#[tokio::test]
async fn malformed_completion_is_server_error() {
    let (llm_base, _) = spawn_fake_llm(StatusCode::OK, Some(json!({"choices": []}))).await;
    let state = AppState::from_config(config(&llm_base, None)).await.expect("state");
    let base = spawn_server(state).await;

    let (status, body) =
        post_json(format!("{}/api/qa/ask", base), json!({"question": "hi"})).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["detail"].as_str().unwrap_or_default().contains("choices"));
}

#[tokio::test]
async fn vector_endpoints_reject_when_disabled() {
    let (base, _) = spawn_default(None).await;

    let (status, _) = post_json(
        format!("{}/api/vector/add", base),
        json!({"ids": ["a"], "texts": ["t"]}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) =
        post_json(format!("{}/api/vector/search", base), json!({"query": "q"})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["detail"].as_str().unwrap_or_default().contains("disabled"));
}

#[tokio::test]
async fn add_rejects_mismatched_lengths_without_inserting() {
    let dir = TempDir::new().expect("tempdir");
    let (base, _) = spawn_default(Some(&dir)).await;

    let (status, _) = post_json(
        format!("{}/api/vector/add", base),
        json!({"ids": ["a", "b"], "texts": ["only one"]}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = post_json(
        format!("{}/api/vector/search", base),
        json!({"query": "only one"}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"results": []}));
}

#[tokio::test]
async fn search_rejects_zero_k() {
    let dir = TempDir::new().expect("tempdir");
    let (base, _) = spawn_default(Some(&dir)).await;

    let (status, _) = post_json(
        format!("{}/api/vector/search", base),
        json!({"query": "q", "k": 0}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn duplicate_ids_conflict() {
    let dir = TempDir::new().expect("tempdir");
    let (base, _) = spawn_default(Some(&dir)).await;

    let (status, body) = post_json(
        format!("{}/api/vector/add", base),
        json!({"ids": ["a"], "texts": ["first"], "metadatas": [{"source": "manual"}]}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"status": "ok", "count": 1}));

    let (status, _) = post_json(
        format!("{}/api/vector/add", base),
        json!({"ids": ["a"], "texts": ["again"]}),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn ingested_page_is_searchable_and_augments_answers() {
    let dir = TempDir::new().expect("tempdir");
    let (base, recorded) = spawn_default(Some(&dir)).await;

    let sentences = [
        "Token AI bills usage per thousand tokens on a monthly invoice. ",
        "Platform AI runs managed inference for open source models. ",
        "Our support desk answers tickets within one business day. ",
    ];
    let page_text: String = sentences
        .iter()
        .map(|s| s.repeat(700 / s.len() + 1).chars().take(700).collect::<String>())
        .collect();
    let page = Router::new().route(
        "/docs",
        get(move || {
            let html = format!(
                "<html><head><script>track()</script></head><body><div>{}</div></body></html>",
                page_text
            );
            async move { axum::response::Html(html) }
        }),
    );
    let page_base = serve(page).await;
    let url = format!("{}/docs", page_base);

    let text = fetch_html_text(&url).await.expect("fetch page");
    assert!(text.chars().count() > 2000);
    assert!(!text.contains("track()"));

    let chunks = build_chunks(&url, &text, ChunkConfig::default());
    assert_eq!(chunks.len(), 3);
    let first_id = chunks[0].id.clone();
    let first_text = chunks[0].text.clone();

    let reply = VectorApiClient::new(&base)
        .expect("client")
        .add_chunks(chunks)
        .await
        .expect("add chunks");
    assert_eq!(reply, json!({"status": "ok", "count": 3}));

    let (status, body) = post_json(
        format!("{}/api/vector/search", base),
        json!({"query": first_text, "k": 3}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let results = body["results"].as_array().cloned().unwrap_or_default();
    assert_eq!(results.len(), 3);
    assert_eq!(results[0]["id"], json!(first_id));
    assert_eq!(results[0]["metadata"]["source"], "url");
    assert_eq!(results[0]["metadata"]["chunk"], json!(0));

    let (status, _) = post_json(
        format!("{}/api/qa/ask", base),
        json!({"question": "How does tokenai billing work?", "context": "Caller note."}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let requests = recorded.lock().unwrap();
    let system = system_messages(&requests[0]);
    assert_eq!(system.len(), 1);
    assert!(system[0].starts_with("Caller note.\n\n"));
    assert!(system[0].contains("[Doc 1] url\n"));
    assert!(system[0].contains("[Doc 2] url\n"));
    assert!(!system[0].contains("[Doc 3]"));
}

#[tokio::test]
async fn out_of_domain_question_skips_retrieval() {
    let dir = TempDir::new().expect("tempdir");
    let (base, recorded) = spawn_default(Some(&dir)).await;

    let (status, _) = post_json(
        format!("{}/api/vector/add", base),
        json!({"ids": ["a"], "texts": ["Platform AI pricing"]}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = post_json(
        format!("{}/api/qa/ask", base),
        json!({"question": "What is the capital of France?"}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let requests = recorded.lock().unwrap();
    assert!(system_messages(&requests[0]).is_empty());
}

#[tokio::test]
async fn retrieval_failure_falls_back_to_caller_context() {
    let (llm_base, recorded) = spawn_fake_llm(StatusCode::OK, None).await;
    let config = config(&llm_base, None);
    let llm = qa_llm::create_client(&config).expect("llm client");
    let state = AppState::new(config, llm, Some(Arc::new(FailingStore)));
    let base = spawn_server(state).await;

    let (status, body) = post_json(
        format!("{}/api/qa/ask", base),
        json!({"question": "Explain Token.AI quotas", "context": "caller context"}),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["answer"], "answer: Explain Token.AI quotas");

    let requests = recorded.lock().unwrap();
    assert_eq!(system_messages(&requests[0]), vec!["caller context"]);
}

#[tokio::test]
async fn cors_allows_configured_origin_with_credentials() {
    let (base, _) = spawn_default(None).await;
    let client = reqwest::Client::new();

    let response = client
        .request(reqwest::Method::OPTIONS, format!("{}/api/qa/ask", base))
        .header("Origin", "http://localhost:5173")
        .header("Access-Control-Request-Method", "POST")
        .header("Access-Control-Request-Headers", "content-type")
        .send()
        .await
        .expect("preflight");

    let headers = response.headers();
    assert_eq!(
        headers
            .get("access-control-allow-origin")
            .and_then(|v| v.to_str().ok()),
        Some("http://localhost:5173")
    );
    assert_eq!(
        headers
            .get("access-control-allow-credentials")
            .and_then(|v| v.to_str().ok()),
        Some("true")
    );

    let response = client
        .get(format!("{}/api/health", base))
        .header("Origin", "http://evil.test")
        .send()
        .await
        .expect("health");
    assert!(response.headers().get("access-control-allow-origin").is_none());
}
