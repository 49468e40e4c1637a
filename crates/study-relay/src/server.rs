//! HTTP server startup and routing.
//!
//! All handlers share one [`AppState`]. The only outbound network calls are
//! to the configured local LLM endpoints.

use std::time::Duration;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::{info, warn};

use crate::{api, config::Config, metrics, shared_state::AppState};

/// Run the relay until ctrl-c.
pub async fn run_server(cfg: Config) -> anyhow::Result<()> {
    crate::telemetry::init_tracing();
    crate::metrics::init_metrics();
    cfg.print_config();

    let addr = cfg.api_addr()?;
    let state = AppState::new(cfg)?;

    info!("Starting HTTP server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    let app = build_router(state);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

/// Build the API router.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([axum::http::Method::GET, axum::http::Method::POST])
        .allow_headers(Any);
    let body_limit = state.config.max_request_bytes;

    Router::new()
        // Streaming chat relay
        .route("/api/llm/stream", post(api::stream_api::generate_stream))
        .route("/api/llm", post(api::chat_api::chat))
        // Schedules and calendar events
        .route("/api/schedule/extract", post(api::schedule_api::extract))
        .route("/api/calendar/preview", post(api::schedule_api::preview))
        // Operations
        .route("/healthz", get(|| async { "OK" }))
        .route("/status", get(api::admin_api::status))
        .route("/metrics", get(metrics::get_metrics))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(Duration::from_secs(600)))
        .layer(RequestBodyLimitLayer::new(body_limit))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::tests::create_test_config;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    fn state_for(endpoints: Vec<String>) -> AppState {
        let mut config = create_test_config();
        config.llm_endpoints = endpoints;
        AppState::new(config).unwrap()
    }

    fn router_for(endpoints: Vec<String>) -> Router {
        build_router(state_for(endpoints))
    }

    /// Upstream that sends one token and then holds the connection open
    /// without `[DONE]`. The receiver fires once the relay closes the socket.
    async fn stalling_upstream() -> (String, tokio::sync::oneshot::Receiver<()>) {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        let (closed_tx, closed_rx) = tokio::sync::oneshot::channel();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = vec![0u8; 64 * 1024];
            let _ = socket.read(&mut buf).await;

            let record = "data: {\"choices\":[{\"delta\":{\"content\":\"Hel\"}}]}\n\n";
            let response = format!(
                "HTTP/1.1 200 OK\r\ncontent-type: text/event-stream\r\ntransfer-encoding: chunked\r\n\r\n{:x}\r\n{}\r\n",
                record.len(),
                record
            );
            socket.write_all(response.as_bytes()).await.unwrap();

            // Drain until the relay hangs up.
            loop {
                match socket.read(&mut buf).await {
                    Ok(0) | Err(_) => break,
                    Ok(_) => continue,
                }
            }
            let _ = closed_tx.send(());
        });

        (url, closed_rx)
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_text(response: axum::response::Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_healthz() {
        let app = router_for(vec!["http://127.0.0.1:1".to_string()]);
        let response = app
            .oneshot(Request::builder().uri("/healthz").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(response).await, "OK");
    }

    #[tokio::test]
    async fn test_status_lists_endpoints() {
        let app = router_for(vec!["http://127.0.0.1:1".to_string(), "http://127.0.0.1:2".to_string()]);
        let response = app
            .oneshot(Request::builder().uri("/status").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let status: Value = serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(status["endpoints"], json!(["http://127.0.0.1:1", "http://127.0.0.1:2"]));
        assert_eq!(status["live_endpoint"], Value::Null);
        assert_eq!(status["counters"]["total_requests"], 0);
    }

    #[tokio::test]
    async fn test_stream_rejects_empty_request() {
        let app = router_for(vec!["http://127.0.0.1:1".to_string()]);
        let response = app
            .oneshot(post_json("/api/llm/stream", json!({ "message": "  " })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_stream_relays_upstream_tokens() {
        let mut server = mockito::Server::new_async().await;
        let upstream_body = concat!(
            "data: {\"choices\":[{\"delta\":{\"role\":\"assistant\"}}]}\n\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"Hel\"}}]}\n\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"lo\"}}]}\n\n",
            "data: [DONE]\n\n",
        );
        let mock = server
            .mock("POST", "/v1/chat/completions")
            .match_body(mockito::Matcher::PartialJson(json!({ "stream": true })))
            .with_status(200)
            .with_header("content-type", "text/event-stream")
            .with_body(upstream_body)
            .expect(1)
            .create_async()
            .await;

        let app = router_for(vec![server.url()]);
        let response = app
            .oneshot(post_json("/api/llm/stream", json!({ "message": "Hi", "conversationHistory": [] })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let text = body_text(response).await;
        assert!(text.contains("data: {\"content\":\"Hel\"}\n\n"), "{}", text);
        assert!(text.contains("data: {\"content\":\"lo\"}\n\n"), "{}", text);
        assert!(text.ends_with("data: [DONE]\n\n"), "{}", text);
        assert_eq!(text.matches("[DONE]").count(), 1);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_client_disconnect_releases_upstream() {
        use futures_util::StreamExt;

        let (url, upstream_closed) = stalling_upstream().await;
        let state = state_for(vec![url]);
        let app = build_router(state.clone());

        let response = app
            .oneshot(post_json("/api/llm/stream", json!({ "message": "Hi" })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let mut body = response.into_body().into_data_stream();
        let first = body.next().await.unwrap().unwrap();
        assert!(String::from_utf8_lossy(&first).contains("data: {\"content\":\"Hel\"}"));
        assert_eq!(state.counters.snapshot().active_streams, 1);

        drop(body);

        let snapshot = state.counters.snapshot();
        assert_eq!(snapshot.active_streams, 0);
        assert_eq!(snapshot.failed_streams, 1);
        assert_eq!(snapshot.completed_streams, 0);

        tokio::time::timeout(Duration::from_secs(5), upstream_closed)
            .await
            .expect("upstream connection left open")
            .unwrap();
    }

    #[tokio::test]
    async fn test_stream_reports_unreachable_upstream_in_band() {
        let app = router_for(vec!["http://127.0.0.1:1".to_string()]);
        let response = app
            .oneshot(post_json("/api/llm/stream", json!({ "message": "Hi" })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let text = body_text(response).await;
        assert!(text.starts_with("data: {\"error\":\"Failed to connect to LLM: "), "{}", text);
        assert!(text.contains("http://127.0.0.1:1"), "{}", text);
        assert!(text.ends_with("data: [DONE]\n\n"), "{}", text);
    }

    #[tokio::test]
    async fn test_chat_returns_bad_gateway_when_all_endpoints_fail() {
        let app = router_for(vec!["http://127.0.0.1:1".to_string()]);
        let response = app
            .oneshot(post_json("/api/llm", json!({ "message": "What is osmosis?" })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);

        let body: Value = serde_json::from_str(&body_text(response).await).unwrap();
        assert!(body["error"].as_str().unwrap().starts_with("Failed to connect to LLM: "));
    }

    #[tokio::test]
    async fn test_chat_plain_completion() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/v1/chat/completions")
            .match_body(mockito::Matcher::PartialJson(json!({ "stream": false, "max_tokens": 500 })))
            .with_status(200)
            .with_body(json!({ "choices": [{ "message": { "role": "assistant", "content": "Water moves." } }] }).to_string())
            .create_async()
            .await;

        let app = router_for(vec![server.url()]);
        let response = app
            .oneshot(post_json("/api/llm", json!({ "message": "What is osmosis?" })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body: Value = serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(body["text"], "Water moves.");
        assert_eq!(body["isSchedulingRequest"], false);
        assert!(body.get("events").is_none());
        assert!(!body["id"].as_str().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_chat_scheduling_request_uses_template_when_llm_down() {
        let app = router_for(vec!["http://127.0.0.1:1".to_string()]);
        let response = app
            .oneshot(post_json("/api/llm", json!({ "message": "Make me a study plan for NEET" })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body: Value = serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(body["isSchedulingRequest"], true);
        assert_eq!(body["scheduleData"]["examName"], "NEET");
        assert!(!body["events"].as_array().unwrap().is_empty());
        assert!(body["text"].as_str().unwrap().contains("## NEET Study Schedule"));
    }

    #[tokio::test]
    async fn test_calendar_preview() {
        let app = router_for(vec!["http://127.0.0.1:1".to_string()]);
        let request = json!({
            "schedule": {
                "examName": "NEET",
                "schedule": [{ "subject": "Physics", "hoursPerDay": "2", "daysNeeded": 2 }]
            },
            "startDate": "2026-10-15T10:00:00Z"
        });
        let response = app.oneshot(post_json("/api/calendar/preview", request)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body: Value = serde_json::from_str(&body_text(response).await).unwrap();
        let events = body["events"].as_array().unwrap();
        assert_eq!(events.len(), 4);
        assert_eq!(events[0]["summary"], "Study: Physics");
        assert_eq!(events[0]["startTime"], "2026-10-16T09:00:00Z");
        assert_eq!(events[0]["endTime"], "2026-10-16T11:00:00Z");
        assert_eq!(events[1]["summary"], "Break");
        // weekend skipped
        assert_eq!(events[2]["startTime"], "2026-10-19T09:00:00Z");
    }

    #[tokio::test]
    async fn test_calendar_preview_rejects_bad_start_date() {
        let app = router_for(vec!["http://127.0.0.1:1".to_string()]);
        let request = json!({
            "schedule": { "examName": "NEET", "schedule": [] },
            "startDate": "tomorrow"
        });
        let response = app.oneshot(post_json("/api/calendar/preview", request)).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_schedule_extract_from_fenced_block() {
        let app = router_for(vec!["http://127.0.0.1:1".to_string()]);
        let text = "Here you go:\n```json\n{\"examName\":\"JEE\",\"includeBreaks\":false,\"schedule\":[{\"subject\":\"Math\",\"hoursPerDay\":3,\"daysNeeded\":1}]}\n```";
        let request = json!({ "text": text, "startDate": "2026-10-15T08:00:00+05:30" });
        let response = app.oneshot(post_json("/api/schedule/extract", request)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body: Value = serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(body["schedule"]["examName"], "JEE");
        let events = body["events"].as_array().unwrap();
        assert_eq!(events.len(), 1);
        // 09:00 in +05:30
        assert_eq!(events[0]["startTime"], "2026-10-16T03:30:00Z");
    }

    #[tokio::test]
    async fn test_schedule_extract_without_schedule() {
        let app = router_for(vec!["http://127.0.0.1:1".to_string()]);
        let response = app
            .oneshot(post_json("/api/schedule/extract", json!({ "text": "no plan here" })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body: Value = serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(body["schedule"], Value::Null);
        assert_eq!(body["events"], json!([]));
    }
}
