use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use axum::{Json, Router};
use llm_interface::{
    ClaudeGenerator, ContentGenerator, ContentType, GenerationChain, GenerationRequest,
    OpenAiGenerator,
};
use outreach_core::{CoreError, GenerationConfig, LlmError};
use serde_json::{json, Value};

async fn messages(headers: HeaderMap, Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
    if headers.get("x-api-key").and_then(|v| v.to_str().ok()) != Some("good-key") {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({"type": "error", "error": {"type": "authentication_error"}})),
        );
    }
    assert!(body["system"].as_str().unwrap_or_default().contains("JSON object"));

    let text = "```json\n{\"title\": \"Wallet data\", \"body\": \"Use the balances endpoint.\"}\n```";
    (
        StatusCode::OK,
        Json(json!({"content": [{"type": "text", "text": text}]})),
    )
}

async fn completions(headers: HeaderMap) -> (StatusCode, Json<Value>) {
    let auth = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    if auth != "Bearer sk-good" {
        return (
            StatusCode::TOO_MANY_REQUESTS,
            Json(json!({"error": {"code": "insufficient_quota"}})),
        );
    }
    (
        StatusCode::OK,
        Json(json!({"choices": [{"message": {"content": "Plain text answer."}}]})),
    )
}

async fn spawn_server() -> String {
    let app = Router::new()
        .route("/v1/messages", post(messages))
        .route("/v1/chat/completions", post(completions));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}/v1", addr)
}

fn config(base: &str) -> GenerationConfig {
    GenerationConfig {
        anthropic_base_url: base.to_string(),
        openai_base_url: base.to_string(),
        timeout_secs: 5,
        ..GenerationConfig::default()
    }
}

fn request() -> GenerationRequest {
    GenerationRequest {
        content_type: ContentType::RedditResponse,
        topic: "Best API for Solana wallet data".to_string(),
        keywords: vec!["wallet api".to_string()],
        audience: "crypto developers".to_string(),
        context: "Which API do you use?".to_string(),
    }
}

#[tokio::test]
async fn test_claude_decodes_fenced_json() {
    let base = spawn_server().await;
    let claude = ClaudeGenerator::new("good-key", &config(&base)).unwrap();

    let content = claude.generate(&request()).await.unwrap();
    assert_eq!(content.title, "Wallet data");
    assert_eq!(content.body, "Use the balances endpoint.");
}

#[tokio::test]
async fn test_claude_rejected_key_is_credential_error() {
    let base = spawn_server().await;
    let claude = ClaudeGenerator::new("bad-key", &config(&base)).unwrap();

    let result = claude.generate(&request()).await;
    assert!(matches!(
        result,
        Err(CoreError::Llm(LlmError::AuthenticationFailed { .. }))
    ));
}

#[tokio::test]
async fn test_openai_plain_text_keeps_topic_title() {
    let base = spawn_server().await;
    let openai = OpenAiGenerator::new("sk-good", &config(&base)).unwrap();

    let content = openai.generate(&request()).await.unwrap();
    assert_eq!(content.title, "Best API for Solana wallet data");
    assert_eq!(content.body, "Plain text answer.");
}

#[tokio::test]
async fn test_chain_skips_rejected_claude_for_openai() {
    let base = spawn_server().await;
    let mut config = config(&base);
    config.anthropic_api_key = Some("bad-key".to_string());
    config.openai_api_key = Some("sk-good".to_string());

    let chain = GenerationChain::from_config(&config);
    assert_eq!(chain.provider_names(), vec!["claude", "openai"]);

    let outcome = chain.generate(&request()).await;
    assert_eq!(outcome.provider, "openai");
    assert!(chain.is_disabled("claude"));
}

#[tokio::test]
async fn test_chain_out_of_credits_falls_back_to_template() {
    let base = spawn_server().await;
    let mut config = config(&base);
    config.openai_api_key = Some("sk-empty".to_string());

    let chain = GenerationChain::from_config(&config);
    let outcome = chain.generate(&request()).await;
    assert!(outcome.fell_back);
    assert!(!outcome.content.body.is_empty());
    assert!(chain.is_disabled("openai"));
}
