use newsletter_pipeline::config::LlmSettings;
use newsletter_pipeline::{CompletionRequest, LlmAdapter, LlmError, OpenAiAdapter};
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn request() -> CompletionRequest {
    CompletionRequest {
        model: "gpt-4o".to_string(),
        system_prompt: "You are an editor".to_string(),
        user_prompt: "Articles: []".to_string(),
        temperature: 0.3,
        max_tokens: 2000,
    }
}

fn adapter(server: &MockServer, key: Option<&str>) -> OpenAiAdapter {
    OpenAiAdapter::new(key.map(str::to_string), &LlmSettings::default())
        .unwrap()
        .with_base_url(server.uri())
}

#[tokio::test]
async fn test_sends_json_mode_request_and_returns_content() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("authorization", "Bearer test-key"))
        .and(body_partial_json(json!({
            "model": "gpt-4o",
            "max_tokens": 2000,
            "response_format": {"type": "json_object"},
            "messages": [
                {"role": "system", "content": "You are an editor"},
                {"role": "user", "content": "Articles: []"}
            ]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "chatcmpl-1",
            "model": "gpt-4o",
            "choices": [
                {"index": 0, "message": {"role": "assistant", "content": "{\"sections\": {}}"}, "finish_reason": "stop"}
            ],
            "usage": {"prompt_tokens": 10, "completion_tokens": 5, "total_tokens": 15}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let content = adapter(&server, Some("test-key")).complete(&request()).await.unwrap();
    assert_eq!(content, "{\"sections\": {}}");
}

#[tokio::test]
async fn test_api_error_carries_status_and_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(429).set_body_json(json!({
            "error": {"message": "Rate limit reached", "type": "rate_limit_error"}
        })))
        .mount(&server)
        .await;

    match adapter(&server, Some("test-key")).complete(&request()).await {
        Err(LlmError::Api { status, message }) => {
            assert_eq!(status, 429);
            assert_eq!(message, "Rate limit reached");
        }
        other => panic!("expected API error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_empty_content_is_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{"message": {"role": "assistant", "content": null}}]
        })))
        .mount(&server)
        .await;

    let result = adapter(&server, Some("test-key")).complete(&request()).await;
    assert!(matches!(result, Err(LlmError::EmptyResponse)));
}

#[tokio::test]
async fn test_missing_key_fails_without_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let result = adapter(&server, None).complete(&request()).await;
    assert!(matches!(result, Err(LlmError::MissingApiKey)));
}
