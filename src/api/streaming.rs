// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Relay from a provider completion stream to an SSE client
//!
//! One task per request pulls chunks from the provider and pushes them into
//! a bounded channel. When the client goes away the channel closes, the
//! task stops polling and drops the provider stream.

use axum::response::sse::Event;
use futures::stream::StreamExt;
use serde_json::json;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::handlers::DonePayload;
use crate::completion::{CompletionChunk, CompletionError, DeltaStream};

pub const DONE_EVENT: &str = "done";
pub const ERROR_EVENT: &str = "error";

/// One frame on the client stream
#[derive(Debug, Clone, PartialEq)]
pub enum RelayEvent {
    Delta(String),
    Done(DonePayload),
    Error(String),
}

/// How a relay ended
#[derive(Debug, Clone, PartialEq)]
pub enum RelayOutcome {
    Completed { deltas: usize },
    Failed { deltas: usize, error: CompletionError },
    ClientDisconnected { deltas: usize },
}

/// Spawn the relay task and return the client side of its channel
pub fn spawn_relay(
    stream: DeltaStream,
    capacity: usize,
    request_id: String,
) -> mpsc::Receiver<RelayEvent> {
    let (tx, rx) = mpsc::channel(capacity.max(1));

    tokio::spawn(async move {
        match relay(stream, tx).await {
            RelayOutcome::Completed { deltas } => {
                info!("[{}] Stream completed after {} deltas", request_id, deltas);
            }
            RelayOutcome::Failed { deltas, error } => {
                warn!(
                    "[{}] Stream failed after {} deltas: {}",
                    request_id, deltas, error
                );
            }
            RelayOutcome::ClientDisconnected { deltas } => {
                info!(
                    "[{}] Client disconnected after {} deltas, provider stream dropped",
                    request_id, deltas
                );
            }
        }
    });

    rx
}

/// Forward chunks in arrival order until a terminal item or disconnect
///
/// Always ends the client stream with exactly one `Done` or `Error` frame
/// unless the client left first.
pub async fn relay(mut stream: DeltaStream, tx: mpsc::Sender<RelayEvent>) -> RelayOutcome {
    let mut deltas = 0;

    loop {
        let next = tokio::select! {
            _ = tx.closed() => {
                return RelayOutcome::ClientDisconnected { deltas };
            }
            next = stream.next() => next,
        };

        match next {
            Some(Ok(CompletionChunk::Delta(text))) => {
                deltas += 1;
                if tx.send(RelayEvent::Delta(text)).await.is_err() {
                    return RelayOutcome::ClientDisconnected { deltas };
                }
            }
            Some(Ok(CompletionChunk::Finished {
                finish_reason,
                usage,
            })) => {
                debug!("Provider finished: {:?}", finish_reason);
                let done = RelayEvent::Done(DonePayload {
                    finish_reason,
                    usage,
                });
                if tx.send(done).await.is_err() {
                    return RelayOutcome::ClientDisconnected { deltas };
                }
                return RelayOutcome::Completed { deltas };
            }
            Some(Err(error)) => {
                return fail(&tx, deltas, error).await;
            }
            None => {
                return fail(&tx, deltas, CompletionError::UnexpectedEof).await;
            }
        }
    }
}

async fn fail(
    tx: &mpsc::Sender<RelayEvent>,
    deltas: usize,
    error: CompletionError,
) -> RelayOutcome {
    if tx.send(RelayEvent::Error(error.to_string())).await.is_err() {
        return RelayOutcome::ClientDisconnected { deltas };
    }
    RelayOutcome::Failed { deltas, error }
}

/// Render a relay event as an SSE frame
pub fn to_sse_event(event: RelayEvent) -> Event {
    match event {
        RelayEvent::Delta(content) => Event::default().data(json!({ "content": content }).to_string()),
        RelayEvent::Done(payload) => Event::default()
            .event(DONE_EVENT)
            .data(serde_json::to_string(&payload).unwrap_or_else(|_| "{}".to_string())),
        RelayEvent::Error(error) => Event::default()
            .event(ERROR_EVENT)
            .data(json!({ "error": error }).to_string()),
    }
}
