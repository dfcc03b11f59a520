use super::*;
use serde_json::json;

#[test]
fn test_config_builder() {
    let config = OllamaConfig::new()
        .with_model("llama3.1")
        .with_base_url("http://192.168.1.100:11434/")
        .with_max_tokens(512)
        .with_timeout(Duration::from_secs(30));

    assert_eq!(config.default_model, "llama3.1");
    assert_eq!(config.base_url, "http://192.168.1.100:11434");
    assert_eq!(config.default_max_tokens, 512);
    assert_eq!(config.timeout, Duration::from_secs(30));

    let defaults = OllamaConfig::default();
    assert_eq!(defaults.base_url, DEFAULT_BASE_URL);
    assert_eq!(defaults.default_model, DEFAULT_MODEL);
}

#[test]
fn test_generate_body() {
    let provider = OllamaProvider::new(OllamaConfig::default()).unwrap();

    let plain = CompletionRequest::prompt("summarize the diagnosis", 0.5);
    let body = serde_json::to_value(provider.build_body(&plain)).unwrap();
    assert_eq!(body["model"], DEFAULT_MODEL);
    assert_eq!(body["stream"], false);
    assert_eq!(body["options"]["num_predict"], 1024);
    assert!(body.get("format").is_none());
    assert!(body.get("system").is_none());

    let planning = CompletionRequest::prompt("plan", 0.3)
        .with_model(Some("llama3.1"))
        .with_system("Reply with JSON only")
        .with_max_tokens(Some(256))
        .expecting_json();
    let body = serde_json::to_value(provider.build_body(&planning)).unwrap();
    assert_eq!(body["model"], "llama3.1");
    assert_eq!(body["format"], "json");
    assert_eq!(body["system"], "Reply with JSON only");
    assert_eq!(body["options"]["num_predict"], 256);
}

#[test]
fn test_reply_parsing() {
    let reply: GenerateResponse = serde_json::from_value(json!({
        "model": "qwen2.5:7b",
        "response": "{\"analysis\": \"dns\"}",
        "done": true,
        "done_reason": "stop",
        "eval_count": 12
    }))
    .unwrap();
    assert_eq!(reply.response, "{\"analysis\": \"dns\"}");
    assert_eq!(reply.prompt_eval_count, None);
}

#[test]
fn test_describe_failure() {
    assert!(describe_failure(r#"{"error": "model 'llama3' not found, try pulling it first"}"#)
        .contains("ollama pull"));
    assert!(!describe_failure("open /home/user/.ollama/models/blobs: permission denied")
        .contains("/home"));
    assert_eq!(describe_failure("server busy"), "server busy");
}
