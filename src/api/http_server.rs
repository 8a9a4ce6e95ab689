// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use axum::{
    extract::{rejection::JsonRejection, Json, State},
    http::{header, HeaderMap, HeaderName, HeaderValue, Method, StatusCode},
    response::{
        sse::{KeepAlive, Sse},
        IntoResponse, Response,
    },
    routing::{get, post},
    Router,
};
use futures::stream::StreamExt;
use std::{convert::Infallible, sync::Arc};
use tokio_stream::wrappers::ReceiverStream;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};
use uuid::Uuid;

use super::errors::ApiError;
use super::handlers::{ChatRequest, HealthResponse, ModelsResponse};
use super::server::{ChatGateway, ChatStream};
use super::streaming::to_sse_event;
use crate::config::ServerConfig;

pub const REQUEST_ID_HEADER: &str = "x-request-id";
pub const AUGMENTATION_ERROR_HEADER: &str = "x-augmentation-error";
pub const RATE_LIMIT_LIMIT_HEADER: &str = "x-ratelimit-limit";
pub const RATE_LIMIT_REMAINING_HEADER: &str = "x-ratelimit-remaining";

#[derive(Clone)]
pub struct AppState {
    pub gateway: Arc<ChatGateway>,
}

impl AppState {
    pub fn new(gateway: ChatGateway) -> Self {
        Self {
            gateway: Arc::new(gateway),
        }
    }
}

pub fn create_router(state: AppState, cors_allowed_origins: &[String]) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health_handler))
        // Model catalogue
        .route("/v1/models", get(models_handler))
        // Chat, streamed as SSE
        .route("/chat", post(chat_handler))
        .route("/api/chat", post(chat_handler))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(cors_allowed_origins))
        .with_state(state)
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any)
        // Browsers hide non-safelisted response headers unless exposed
        .expose_headers([
            HeaderName::from_static(REQUEST_ID_HEADER),
            HeaderName::from_static(AUGMENTATION_ERROR_HEADER),
            HeaderName::from_static(RATE_LIMIT_LIMIT_HEADER),
            HeaderName::from_static(RATE_LIMIT_REMAINING_HEADER),
            header::RETRY_AFTER,
        ]);

    if allowed_origins.is_empty() || allowed_origins.iter().any(|o| o == "*") {
        return layer.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|o| HeaderValue::from_str(o).ok())
        .collect();
    layer.allow_origin(AllowOrigin::list(origins))
}

pub async fn start_server(config: &ServerConfig, gateway: ChatGateway) -> anyhow::Result<()> {
    let app = create_router(AppState::new(gateway), &config.cors_allowed_origins);

    let addr = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("Chat gateway listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Chat gateway stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(state.gateway.health_check().await)
}

async fn models_handler(State(state): State<AppState>) -> Json<ModelsResponse> {
    Json(state.gateway.models())
}

async fn chat_handler(
    State(state): State<AppState>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Response {
    let request_id = Uuid::new_v4().to_string();

    let Json(request) = match payload {
        Ok(payload) => payload,
        Err(rejection) => {
            return ApiErrorResponse::new(
                ApiError::InvalidRequest(rejection.body_text()),
                request_id,
            )
            .into_response();
        }
    };

    match state.gateway.handle_chat(request, &request_id).await {
        Ok(chat) => chat_stream_response(chat),
        Err(e) => ApiErrorResponse::new(e, request_id).into_response(),
    }
}

fn chat_stream_response(chat: ChatStream) -> Response {
    let ChatStream {
        request_id,
        admission,
        augmentation_error,
        events,
        ..
    } = chat;

    let stream =
        ReceiverStream::new(events).map(|event| Ok::<_, Infallible>(to_sse_event(event)));
    let mut response = Sse::new(stream)
        .keep_alive(KeepAlive::default())
        .into_response();

    let headers = response.headers_mut();
    insert_text_header(headers, REQUEST_ID_HEADER, &request_id);
    headers.insert(RATE_LIMIT_LIMIT_HEADER, HeaderValue::from(admission.limit));
    headers.insert(
        RATE_LIMIT_REMAINING_HEADER,
        HeaderValue::from(admission.remaining),
    );
    if let Some(error) = augmentation_error {
        insert_text_header(headers, AUGMENTATION_ERROR_HEADER, &error);
    }

    response
}

/// Insert a free-text header, dropping characters a header cannot carry
fn insert_text_header(headers: &mut HeaderMap, name: &'static str, value: &str) {
    let sanitized: String = value
        .chars()
        .map(|c| if c.is_ascii() && !c.is_ascii_control() { c } else { ' ' })
        .collect();
    if let Ok(value) = HeaderValue::from_str(sanitized.trim()) {
        headers.insert(name, value);
    }
}

// Error response wrapper
struct ApiErrorResponse {
    error: ApiError,
    request_id: String,
}

impl ApiErrorResponse {
    fn new(error: ApiError, request_id: String) -> Self {
        Self { error, request_id }
    }
}

impl IntoResponse for ApiErrorResponse {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.error.status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let body = self.error.to_response(Some(self.request_id.clone()));

        let mut response = (status, Json(body)).into_response();
        let headers = response.headers_mut();
        insert_text_header(headers, REQUEST_ID_HEADER, &self.request_id);

        if let Some(retry_after) = self.error.retry_after() {
            headers.insert(header::RETRY_AFTER, HeaderValue::from(retry_after));
        }
        if let ApiError::RateLimitExceeded { limit, .. } = self.error {
            headers.insert(RATE_LIMIT_LIMIT_HEADER, HeaderValue::from(limit));
            headers.insert(RATE_LIMIT_REMAINING_HEADER, HeaderValue::from(0u32));
        }

        response
    }
}
