mod harness;

use harness::config::ConfigBuilder;
use harness::mock_ollama::MockOllama;
use harness::mock_openai::MockOpenAi;
use harness::server::TestServer;
use serde_json::json;

#[tokio::test]
async fn health_reports_providers() {
    let ollama = MockOllama::start().await.unwrap();
    let openai = MockOpenAi::start().await.unwrap();
    let config = ConfigBuilder::new()
        .with_ollama_provider("local", &ollama.base_url())
        .with_openai_provider("cloud", &openai.base_url())
        .build();
    let server = TestServer::start(config).await.unwrap();

    let (status, body) = server.get_json("/").await;
    assert_eq!(status, 200);
    assert_eq!(
        body,
        json!({
            "status": "ok",
            "available_providers": ["local", "cloud"],
            "default_provider": "local",
        })
    );
}

#[tokio::test]
async fn health_path_is_configurable() {
    let ollama = MockOllama::start().await.unwrap();
    let config = ConfigBuilder::new()
        .with_ollama_provider("local", &ollama.base_url())
        .with_health_path("/healthz")
        .build();
    let server = TestServer::start(config).await.unwrap();

    let (status, body) = server.get_json("/healthz").await;
    assert_eq!(status, 200);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn health_disabled_returns_404() {
    let ollama = MockOllama::start().await.unwrap();
    let config = ConfigBuilder::new()
        .with_ollama_provider("local", &ollama.base_url())
        .without_health()
        .build();
    let server = TestServer::start(config).await.unwrap();

    let resp = server.client().get(server.url("/")).send().await.unwrap();
    assert_eq!(resp.status(), 404);
}
