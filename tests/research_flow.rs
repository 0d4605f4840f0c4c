//! End-to-end research runs against mocked token, search and chat endpoints.

use std::time::Duration;

use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode};
use company_research::auth::TokenProvider;
use company_research::research::{ProgressReporter, ResearchEvent, research_company};
use company_research::research::retrieve::search_web;
use company_research::search::TavilyClient;
use company_research::{AppState, Config, ResearchError, routes};
use serde_json::{Value, json};
use tokio::sync::mpsc;
use tower::ServiceExt;
use wiremock::matchers::{body_string, body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// base64("client-id:client-secret")
const BASIC_AUTH: &str = "Basic Y2xpZW50LWlkOmNsaWVudC1zZWNyZXQ=";
const CHAT_PATH: &str = "/openai/deployments/gpt-4o/chat/completions";

// ============= Helper Functions =============

fn config(server: &MockServer) -> Config {
    Config {
        port: 0,
        environment: "test".to_string(),
        token_url: Some(format!("{}/oauth/token", server.uri())),
        client_id: Some("client-id".to_string()),
        client_secret: Some("client-secret".to_string()),
        app_key: Some("app-key".to_string()),
        tavily_api_key: Some("tvly-test".to_string()),
        tavily_base_url: server.uri(),
        azure_endpoint: Some(server.uri()),
        azure_api_version: "2024-08-01-preview".to_string(),
        chat_model: "gpt-4o".to_string(),
        search_delay: Duration::ZERO,
        otel_service_name: "company-research-test".to_string(),
        otel_exporter_endpoint: "http://127.0.0.1:4317".to_string(),
    }
}

fn mock_chat_response(content: &str) -> Value {
    chat_completion(json!(content), "stop")
}

fn chat_completion(content: Value, finish_reason: &str) -> Value {
    json!({
        "id": "chatcmpl-test",
        "object": "chat.completion",
        "created": 1_700_000_000,
        "model": "gpt-4o",
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": content},
            "finish_reason": finish_reason,
            "logprobs": null
        }],
        "usage": {"prompt_tokens": 10, "completion_tokens": 5, "total_tokens": 15}
    })
}

fn mock_search_response(title: &str) -> Value {
    json!({
        "query": title,
        "results": [{
            "title": title,
            "content": "Acme is piloting LLM assistants.",
            "url": "https://news.example/acme",
            "score": 0.87
        }]
    })
}

async fn mount_token(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .and(header("authorization", BASIC_AUTH))
        .and(body_string("grant_type=client_credentials"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "test-token",
            "token_type": "Bearer",
            "expires_in": 3600
        })))
        .mount(server)
        .await;
}

/// Splits an SSE body into `(event name, data)` pairs, skipping keep-alive comments.
fn sse_events(text: &str) -> Vec<(String, Value)> {
    text.split("\n\n")
        .filter_map(|block| {
            let mut name = None;
            let mut data = None;
            for line in block.lines() {
                if let Some(v) = line.strip_prefix("event: ") {
                    name = Some(v.to_string());
                } else if let Some(v) = line.strip_prefix("data: ") {
                    data = serde_json::from_str(v).ok();
                }
            }
            Some((name?, data?))
        })
        .collect()
}

async fn mount_chat(server: &MockServer, queries_reply: &str, report: &str) {
    Mock::given(method("POST"))
        .and(path(CHAT_PATH))
        .and(header("api-key", "test-token"))
        .and(body_string_contains("Detail the following aspects of the company"))
        .respond_with(ResponseTemplate::new(200).set_body_json(mock_chat_response(queries_reply)))
        .expect(1)
        .mount(server)
        .await;

    Mock::given(method("POST"))
        .and(path(CHAT_PATH))
        .and(header("api-key", "test-token"))
        .and(body_string_contains("Company Name: Acme Corp"))
        .respond_with(ResponseTemplate::new(200).set_body_json(mock_chat_response(report)))
        .expect(1)
        .mount(server)
        .await;
}

// ============= Token Provider =============

#[tokio::test]
async fn test_token_provider_returns_access_token() {
    let server = MockServer::start().await;
    mount_token(&server).await;

    let provider = TokenProvider::new(
        reqwest::Client::new(),
        format!("{}/oauth/token", server.uri()),
        "client-id",
        "client-secret",
    );

    assert_eq!(provider.get_access_token().await.unwrap(), "test-token");
}

#[tokio::test]
async fn test_token_provider_rejects_non_200() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .respond_with(ResponseTemplate::new(401).set_body_string("invalid_client"))
        .expect(1)
        .mount(&server)
        .await;

    let provider = TokenProvider::new(
        reqwest::Client::new(),
        format!("{}/oauth/token", server.uri()),
        "client-id",
        "wrong",
    );

    let err = provider.get_access_token().await.unwrap_err();
    assert!(matches!(
        &err,
        ResearchError::Authentication { status: 401, body } if body == "invalid_client"
    ));
    assert_eq!(err.to_string(), "Failed to get access token: 401 - invalid_client");
}

// ============= Search Client =============

#[tokio::test]
async fn test_search_web_formats_results() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/search"))
        .and(header("authorization", "Bearer tvly-test"))
        .and(body_string_contains("\"country\":\"united states\""))
        .respond_with(ResponseTemplate::new(200).set_body_json(mock_search_response("Acme AI")))
        .expect(1)
        .mount(&server)
        .await;

    let client = TavilyClient::new(reqwest::Client::new(), "tvly-test", &server.uri());
    let formatted = search_web(&client, "Acme AI").await.unwrap();

    assert_eq!(
        formatted,
        "Title: Acme AI\nContent: Acme is piloting LLM assistants.\nURL: https://news.example/acme\n"
    );
}

#[tokio::test]
async fn test_search_web_error_names_query() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(500).set_body_string("upstream down"))
        .mount(&server)
        .await;

    let client = TavilyClient::new(reqwest::Client::new(), "tvly-test", &server.uri());
    let err = search_web(&client, "Acme AI").await.unwrap_err();

    match err {
        ResearchError::Search { query, message } => {
            assert_eq!(query, "Acme AI");
            assert!(message.contains("upstream down"));
        }
        other => panic!("expected search error, got {other:?}"),
    }
}

// ============= Full Pipeline =============

#[tokio::test]
async fn test_research_company_end_to_end() {
    let server = MockServer::start().await;
    mount_token(&server).await;
    mount_chat(
        &server,
        r#"["Acme Corp AI projects", "Acme Corp LLM partnerships"]"#,
        "# Executive Summary\nAcme Corp runs two LLM pilots.",
    )
    .await;
    Mock::given(method("POST"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(mock_search_response("Acme")))
        .expect(2)
        .mount(&server)
        .await;

    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut progress = ProgressReporter::new(tx);

    let report = research_company(&config(&server), "Acme Corp", &mut progress)
        .await
        .unwrap();

    assert_eq!(report, "# Executive Summary\nAcme Corp runs two LLM pilots.");

    let mut query_lists = Vec::new();
    let mut percents = Vec::new();
    while let Ok(event) = rx.try_recv() {
        match event {
            ResearchEvent::Queries { queries } => query_lists.push(queries),
            ResearchEvent::Progress { percent } => percents.push(percent),
            _ => {}
        }
    }
    assert_eq!(
        query_lists,
        vec![vec![
            "Acme Corp AI projects".to_string(),
            "Acme Corp LLM partnerships".to_string()
        ]]
    );
    assert_eq!(percents.last(), Some(&100));
    assert!(percents.windows(2).all(|w| w[0] <= w[1]));
}

#[tokio::test]
async fn test_research_company_search_failure_produces_no_report() {
    let server = MockServer::start().await;
    mount_token(&server).await;
    Mock::given(method("POST"))
        .and(path(CHAT_PATH))
        .and(body_string_contains("Detail the following aspects of the company"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(mock_chat_response(r#""Acme Corp AI""#)),
        )
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(400).set_body_string("bad query"))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(CHAT_PATH))
        .and(body_string_contains("Company Name: Acme Corp"))
        .respond_with(ResponseTemplate::new(200).set_body_json(mock_chat_response("leaked")))
        .expect(0)
        .mount(&server)
        .await;

    let err = research_company(&config(&server), "Acme Corp", &mut ProgressReporter::silent())
        .await
        .unwrap_err();

    assert!(err.to_string().starts_with("Error during research: Error searching for query 'Acme Corp AI'"));
}

#[tokio::test]
async fn test_research_company_bad_credentials() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .respond_with(ResponseTemplate::new(403).set_body_string("forbidden"))
        .mount(&server)
        .await;

    let err = research_company(&config(&server), "Acme Corp", &mut ProgressReporter::silent())
        .await
        .unwrap_err();

    assert_eq!(
        err.to_string(),
        "Failed to initialize API clients: Failed to get access token: 403 - forbidden"
    );
    assert!(matches!(
        err.root(),
        ResearchError::Authentication { status: 403, body } if body == "forbidden"
    ));
}

#[tokio::test]
async fn test_research_company_null_query_content_is_generation_error() {
    let server = MockServer::start().await;
    mount_token(&server).await;
    Mock::given(method("POST"))
        .and(path(CHAT_PATH))
        .and(body_string_contains("Detail the following aspects of the company"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(chat_completion(Value::Null, "content_filter")),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(mock_search_response("Acme")))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(CHAT_PATH))
        .and(body_string_contains("Company Name: Acme Corp"))
        .respond_with(ResponseTemplate::new(200).set_body_json(mock_chat_response("leaked")))
        .expect(0)
        .mount(&server)
        .await;

    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut progress = ProgressReporter::new(tx);

    let err = research_company(&config(&server), "Acme Corp", &mut progress)
        .await
        .unwrap_err();

    assert!(matches!(err.root(), ResearchError::Generation(_)));
    assert_eq!(
        err.to_string(),
        "Error during research: Error generating search queries: \
         model returned no message content (finish reason: content_filter)"
    );
    while let Ok(event) = rx.try_recv() {
        assert!(!matches!(event, ResearchEvent::Queries { .. }));
    }
}

// ============= HTTP Surface =============

#[tokio::test]
async fn test_http_research_returns_report_and_filenames() {
    let server = MockServer::start().await;
    mount_token(&server).await;
    mount_chat(&server, "no quoted queries", "# Executive Summary\nNothing public.").await;

    let app = routes::router(AppState {
        config: std::sync::Arc::new(config(&server)),
    });

    let response = app
        .oneshot(
            Request::post("/api/research")
                .header("content-type", "application/json")
                .body(Body::from(r#"{"company_name": "  Acme Corp  "}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body["company_name"], "Acme Corp");
    assert_eq!(body["report"], "# Executive Summary\nNothing public.");
    assert!(
        body["markdown_filename"]
            .as_str()
            .unwrap()
            .starts_with("Acme_Corp_AI_Research_Report_")
    );
    assert!(body["text_filename"].as_str().unwrap().ends_with(".txt"));
}

#[tokio::test]
async fn test_http_research_rejects_blank_company() {
    let server = MockServer::start().await;
    let app = routes::router(AppState {
        config: std::sync::Arc::new(config(&server)),
    });

    let response = app
        .oneshot(
            Request::post("/api/research")
                .header("content-type", "application/json")
                .body(Body::from(r#"{"company_name": "   "}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_http_research_surfaces_single_error_message() {
    let server = MockServer::start().await;
    let mut cfg = config(&server);
    cfg.tavily_api_key = None;
    let app = routes::router(AppState {
        config: std::sync::Arc::new(cfg),
    });

    let response = app
        .oneshot(
            Request::post("/api/research")
                .header("content-type", "application/json")
                .body(Body::from(r#"{"company_name": "Acme Corp"}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(
        body["error"],
        "Failed to initialize API clients: TAVILY_API_KEY is not set"
    );
    assert_eq!(body["status"], 500);
    assert!(body.get("report").is_none());
}

#[tokio::test]
async fn test_http_download_sets_attachment_headers() {
    let server = MockServer::start().await;
    mount_token(&server).await;
    mount_chat(&server, "[]", "# Executive Summary").await;

    let app = routes::router(AppState {
        config: std::sync::Arc::new(config(&server)),
    });

    let response = app
        .oneshot(
            Request::post("/api/research/download?format=txt")
                .header("content-type", "application/json")
                .body(Body::from(r#"{"company_name": "Acme Corp"}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()["content-type"],
        "text/plain; charset=utf-8"
    );
    let disposition = response.headers()["content-disposition"].to_str().unwrap();
    assert!(disposition.starts_with("attachment; filename=\"Acme_Corp_AI_Research_Report_"));
    assert!(disposition.ends_with(".txt\""));

    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&body[..], b"# Executive Summary");
}

#[tokio::test]
async fn test_http_health() {
    let server = MockServer::start().await;
    let app = routes::router(AppState {
        config: std::sync::Arc::new(config(&server)),
    });

    let response = app
        .oneshot(Request::get("/api/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_http_research_token_rejection_is_bad_gateway() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .respond_with(ResponseTemplate::new(401).set_body_string("invalid_client"))
        .mount(&server)
        .await;
    let app = routes::router(AppState {
        config: std::sync::Arc::new(config(&server)),
    });

    let response = app
        .oneshot(
            Request::post("/api/research")
                .header("content-type", "application/json")
                .body(Body::from(r#"{"company_name": "Acme Corp"}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
}

#[tokio::test]
async fn test_http_stream_reports_progress_and_completes() {
    let server = MockServer::start().await;
    mount_token(&server).await;
    mount_chat(
        &server,
        r#"["Acme Corp AI projects", "Acme Corp LLM partnerships"]"#,
        "# Executive Summary\nAcme Corp runs two LLM pilots.",
    )
    .await;
    Mock::given(method("POST"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(mock_search_response("Acme")))
        .expect(2)
        .mount(&server)
        .await;

    let app = routes::router(AppState {
        config: std::sync::Arc::new(config(&server)),
    });

    let response = app
        .oneshot(
            Request::post("/api/research/stream")
                .header("content-type", "application/json")
                .body(Body::from(r#"{"company_name": "Acme Corp"}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["content-type"], "text/event-stream");
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let events = sse_events(&String::from_utf8(body.to_vec()).unwrap());

    let queries: Vec<&Value> = events
        .iter()
        .filter(|(name, _)| name == "queries")
        .map(|(_, data)| &data["queries"])
        .collect();
    assert_eq!(
        queries,
        vec![&json!(["Acme Corp AI projects", "Acme Corp LLM partnerships"])]
    );

    let percents: Vec<u64> = events
        .iter()
        .filter(|(name, _)| name == "progress")
        .filter_map(|(_, data)| data["percent"].as_u64())
        .collect();
    assert_eq!(percents.first(), Some(&10));
    assert_eq!(percents.last(), Some(&100));
    assert!(percents.windows(2).all(|w| w[0] <= w[1]));

    let (name, data) = events.last().unwrap();
    assert_eq!(name, "completed");
    assert_eq!(data["report"], "# Executive Summary\nAcme Corp runs two LLM pilots.");
    assert!(
        data["markdown_filename"]
            .as_str()
            .unwrap()
            .starts_with("Acme_Corp_AI_Research_Report_")
    );
    assert!(data["text_filename"].as_str().unwrap().ends_with(".txt"));
    assert!(events.iter().all(|(name, _)| name != "failed"));
}

#[tokio::test]
async fn test_http_stream_ends_with_failed_event() {
    let server = MockServer::start().await;
    let mut cfg = config(&server);
    cfg.token_url = None;
    let app = routes::router(AppState {
        config: std::sync::Arc::new(cfg),
    });

    let response = app
        .oneshot(
            Request::post("/api/research/stream")
                .header("content-type", "application/json")
                .body(Body::from(r#"{"company_name": "Acme Corp"}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let text = String::from_utf8(body.to_vec()).unwrap();
    assert!(text.contains("event: failed"));
    assert!(text.contains("OAUTH_TOKEN_URL is not set"));
}
