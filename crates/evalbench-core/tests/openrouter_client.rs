use evalbench_core::errors::GenerationError;
use evalbench_core::providers::llm::openrouter::OpenRouterClient;
use evalbench_core::providers::llm::LlmClient;
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client(server: &MockServer, key: &str) -> OpenRouterClient {
    OpenRouterClient::new("test/model".into(), key.into()).with_base_url(format!("{}/", server.uri()))
}

#[tokio::test]
async fn sends_chat_completion_and_reads_content() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("authorization", "Bearer k"))
        .and(body_partial_json(json!({
            "model": "test/model",
            "messages": [
                {"role": "system", "content": "be brief"},
                {"role": "user", "content": "hi"}
            ]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{"message": {"content": "hello"}}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let resp = client(&server, "k").complete("hi", Some("be brief")).await.unwrap();
    assert_eq!(resp.text, "hello");
    assert_eq!(resp.provider, "openrouter");
    assert_eq!(resp.model, "test/model");
}

#[tokio::test]
async fn missing_content_reads_as_empty() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{"message": {"content": null}}]
        })))
        .mount(&server)
        .await;

    let resp = client(&server, "k").complete("hi", None).await.unwrap();
    assert_eq!(resp.text, "");
}

#[tokio::test]
async fn upstream_error_message_is_surfaced() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "error": {"message": "No auth credentials found", "code": 401}
        })))
        .mount(&server)
        .await;

    let err = client(&server, "k").complete("hi", None).await.unwrap_err();
    assert_eq!(err.status(), Some(401));
    assert_eq!(err.to_string(), "No auth credentials found");
}

#[tokio::test]
async fn upstream_error_without_body_uses_status() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
        .mount(&server)
        .await;

    let err = client(&server, "k").complete("hi", None).await.unwrap_err();
    assert_eq!(err.to_string(), "OpenRouter 502");
}

#[tokio::test]
async fn empty_key_never_calls_out() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let err = client(&server, "").complete("hi", None).await.unwrap_err();
    assert!(matches!(err, GenerationError::NotConfigured { var: "OPENROUTER_API_KEY" }));
}
