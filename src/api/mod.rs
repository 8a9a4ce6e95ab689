// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod errors;
pub mod handlers;
pub mod http_server;
pub mod server;
pub mod streaming;

pub use errors::{ApiError, ErrorResponse, RATE_LIMIT_MESSAGE};
pub use handlers::{ChatRequest, DonePayload, HealthResponse, ModelsResponse};
pub use http_server::{
    create_router, start_server, AppState, AUGMENTATION_ERROR_HEADER, RATE_LIMIT_LIMIT_HEADER,
    RATE_LIMIT_REMAINING_HEADER, REQUEST_ID_HEADER,
};
pub use server::{ChatGateway, ChatStream};
pub use streaming::{relay, spawn_relay, to_sse_event, RelayEvent, RelayOutcome};
