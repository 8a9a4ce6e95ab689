// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use super::support::{
    body_text, chat_request, deltas, parse_frames, router, router_with, user_turn,
    CountingFetcher, ScriptedProvider, UnreachableStore, rate_limit_config,
};
use axum::http::{header, Request, StatusCode};
use axum::body::Body;
use chat_gateway::api::{AUGMENTATION_ERROR_HEADER, RATE_LIMIT_MESSAGE, REQUEST_ID_HEADER};
use chat_gateway::completion::{CompletionChunk, CompletionError, Role, Usage};
use chat_gateway::rate_limit::{FailurePolicy, RateLimitConfig, RateLimiter};
use std::sync::Arc;
use tower::ServiceExt;

#[tokio::test]
async fn test_deltas_relayed_in_order_then_done() {
    let fetcher = CountingFetcher::succeeding("unused");
    let provider = ScriptedProvider::streaming(vec![
        Ok(CompletionChunk::Delta("Hi".to_string())),
        Ok(CompletionChunk::Delta(" there".to_string())),
        Ok(CompletionChunk::Finished {
            finish_reason: Some("stop".to_string()),
            usage: Some(Usage {
                prompt_tokens: 4,
                completion_tokens: 2,
                total_tokens: 6,
            }),
        }),
    ]);
    let app = router(5, fetcher.clone(), provider.clone());

    let response = app
        .oneshot(chat_request("/chat", user_turn("user-1", "hello")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response
        .headers()
        .get(header::CONTENT_TYPE)
        .unwrap()
        .to_str()
        .unwrap()
        .starts_with("text/event-stream"));
    assert!(response.headers().get(REQUEST_ID_HEADER).is_some());
    assert_eq!(response.headers().get("x-ratelimit-limit").unwrap(), "5");
    assert_eq!(response.headers().get("x-ratelimit-remaining").unwrap(), "4");
    assert!(response.headers().get(AUGMENTATION_ERROR_HEADER).is_none());

    let frames = parse_frames(&body_text(response).await);
    assert_eq!(deltas(&frames), vec!["Hi".to_string(), " there".to_string()]);

    let last = frames.last().unwrap();
    assert_eq!(last.event.as_deref(), Some("done"));
    assert_eq!(last.data["finishReason"], "stop");
    assert_eq!(last.data["usage"]["total_tokens"], 6);

    // No domain in the message, so no scrape
    assert_eq!(fetcher.calls(), 0);
    assert_eq!(provider.calls(), 1);
}

#[tokio::test]
async fn test_mid_stream_failure_ends_with_error_frame() {
    let provider = ScriptedProvider::streaming(vec![
        Ok(CompletionChunk::Delta("Hi".to_string())),
        Err(CompletionError::Http("connection reset".to_string())),
    ]);
    let app = router(5, CountingFetcher::succeeding("unused"), provider);

    let response = app
        .oneshot(chat_request("/chat", user_turn("user-1", "hello")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let frames = parse_frames(&body_text(response).await);
    assert_eq!(deltas(&frames), vec!["Hi".to_string()]);

    let last = frames.last().unwrap();
    assert_eq!(last.event.as_deref(), Some("error"));
    assert!(last.data["error"]
        .as_str()
        .unwrap()
        .contains("connection reset"));
    assert!(frames.iter().all(|f| f.event.as_deref() != Some("done")));
}

#[tokio::test]
async fn test_truncated_provider_stream_is_not_reported_as_done() {
    let provider =
        ScriptedProvider::streaming(vec![Ok(CompletionChunk::Delta("partial".to_string()))]);
    let app = router(5, CountingFetcher::succeeding("unused"), provider);

    let response = app
        .oneshot(chat_request("/chat", user_turn("user-1", "hello")))
        .await
        .unwrap();

    let frames = parse_frames(&body_text(response).await);
    assert_eq!(frames.last().unwrap().event.as_deref(), Some("error"));
}

#[tokio::test]
async fn test_rate_limited_request_never_scrapes_or_completes() {
    let fetcher = CountingFetcher::succeeding("Hello");
    let provider = ScriptedProvider::replying(&["ok"]);
    let app = router(2, fetcher.clone(), provider.clone());

    for _ in 0..2 {
        let response = app
            .clone()
            .oneshot(chat_request("/chat", user_turn("user-1", "read example.com")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        body_text(response).await;
    }

    let response = app
        .clone()
        .oneshot(chat_request("/chat", user_turn("user-1", "read example.com")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert!(response.headers().get(header::RETRY_AFTER).is_some());
    let body: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
    assert_eq!(body["error"], RATE_LIMIT_MESSAGE);

    assert_eq!(fetcher.calls(), 2);
    assert_eq!(provider.calls(), 2);

    // Another user is unaffected
    let response = app
        .oneshot(chat_request("/chat", user_turn("user-2", "hello")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_enriched_content_sent_to_provider() {
    let fetcher = CountingFetcher::succeeding("Hello");
    let provider = ScriptedProvider::replying(&["Summary"]);
    let app = router(5, fetcher.clone(), provider.clone());

    let body = serde_json::json!({
        "userId": "user-1",
        "messages": [
            {"content": "hi", "isUser": true},
            {"content": "Hello! How can I help?", "isUser": false},
            {"content": "check out example.com/page for info", "isUser": true}
        ],
        "model": "meta-llama/Llama-3.3-13B-Instruct"
    });

    let response = app.oneshot(chat_request("/api/chat", body)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().get(AUGMENTATION_ERROR_HEADER).is_none());
    body_text(response).await;

    assert_eq!(fetcher.urls(), vec!["https://example.com".to_string()]);

    let requests = provider.requests();
    assert_eq!(requests.len(), 1);
    let request = &requests[0];
    assert_eq!(request.model, "meta-llama/Llama-3.3-13B-Instruct");
    assert!(request.stream);
    assert_eq!(request.messages.len(), 3);
    assert_eq!(request.messages[0].role, Role::User);
    assert_eq!(request.messages[1].role, Role::Assistant);
    assert_eq!(request.messages[1].content, "Hello! How can I help?");
    assert_eq!(
        request.messages[2].content,
        "Website content for example.com:\nHello\n\nQuestion: check out example.com/page for info"
    );
}

#[tokio::test]
async fn test_scrape_failure_sets_augmentation_header() {
    let fetcher = CountingFetcher::failing();
    let provider = ScriptedProvider::replying(&["From general knowledge"]);
    let app = router(5, fetcher.clone(), provider.clone());

    let response = app
        .oneshot(chat_request("/chat", user_turn("user-1", "what is on example.com?")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(AUGMENTATION_ERROR_HEADER).unwrap(),
        "The site example.com could not be accessed. The response is based on general knowledge."
    );

    let frames = parse_frames(&body_text(response).await);
    assert_eq!(deltas(&frames), vec!["From general knowledge".to_string()]);

    // Original question forwarded unchanged
    assert_eq!(
        provider.requests()[0].messages[0].content,
        "what is on example.com?"
    );
    assert_eq!(fetcher.calls(), 1);
}

#[tokio::test]
async fn test_invalid_requests_rejected() {
    let provider = ScriptedProvider::replying(&["ok"]);
    let app = router(5, CountingFetcher::succeeding("unused"), provider.clone());

    let response = app
        .clone()
        .oneshot(chat_request("/chat", user_turn("", "hello")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let empty = serde_json::json!({"userId": "user-1", "messages": []});
    let response = app.clone().oneshot(chat_request("/chat", empty)).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let assistant_last = serde_json::json!({
        "userId": "user-1",
        "messages": [{"content": "hi", "isUser": true}, {"content": "hello", "isUser": false}]
    });
    let response = app
        .clone()
        .oneshot(chat_request("/chat", assistant_last))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/chat")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from("{not json"))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let unknown_model = serde_json::json!({
        "userId": "user-1",
        "messages": [{"content": "hi", "isUser": true}],
        "model": "gpt-unknown"
    });
    let response = app
        .oneshot(chat_request("/chat", unknown_model))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
    assert_eq!(body["errorType"], "model_not_found");

    assert_eq!(provider.calls(), 0);
}

#[tokio::test]
async fn test_provider_refusal_returns_bad_gateway() {
    let provider = ScriptedProvider::refusing(CompletionError::Status {
        status: 401,
        message: "invalid api key".to_string(),
    });
    let app = router(5, CountingFetcher::succeeding("unused"), provider);

    let response = app
        .oneshot(chat_request("/chat", user_turn("user-1", "hello")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let body: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
    assert_eq!(body["errorType"], "upstream_error");
    assert!(body["requestId"].is_string());
}

#[tokio::test]
async fn test_store_outage_follows_failure_policy() {
    let closed = RateLimitConfig {
        failure_policy: FailurePolicy::Closed,
        ..rate_limit_config(5)
    };
    let provider = ScriptedProvider::replying(&["ok"]);
    let app = router_with(
        RateLimiter::new(Arc::new(UnreachableStore), closed),
        CountingFetcher::succeeding("unused"),
        provider.clone(),
    );
    let response = app
        .oneshot(chat_request("/chat", user_turn("user-1", "hello")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(provider.calls(), 0);

    let open = RateLimitConfig {
        failure_policy: FailurePolicy::Open,
        ..rate_limit_config(5)
    };
    let provider = ScriptedProvider::replying(&["ok"]);
    let app = router_with(
        RateLimiter::new(Arc::new(UnreachableStore), open),
        CountingFetcher::succeeding("unused"),
        provider.clone(),
    );
    let response = app
        .oneshot(chat_request("/chat", user_turn("user-1", "hello")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    body_text(response).await;
    assert_eq!(provider.calls(), 1);
}

#[tokio::test]
async fn test_health_and_models_endpoints() {
    let app = router(
        5,
        CountingFetcher::succeeding("unused"),
        ScriptedProvider::replying(&["ok"]),
    );

    let response = app
        .clone()
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let health: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
    assert_eq!(health["status"], "ok");

    let response = app
        .oneshot(Request::get("/v1/models").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let models: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
    assert_eq!(models["models"].as_array().unwrap().len(), 2);
    assert_eq!(
        models["defaultModel"],
        "meta-llama/Llama-3.3-70B-Instruct-Turbo"
    );
}
