// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    response::{
        sse::{Event, KeepAlive},
        IntoResponse, Response, Sse,
    },
    routing::{get, post},
    Json, Router,
};
use futures::stream::Stream;
use serde_json::{json, Value};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Instant;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::StreamExt;
use tracing::debug;

use crate::application::service::ContextService;
use crate::application::subscribers::SubscriptionId;
use crate::domain::context::{ContextDomain, ContextSnapshot};
use crate::domain::decision::DecisionParams;
use crate::infrastructure::channel_subscriber::ChannelSubscriber;

/// Snapshots buffered per SSE client before it counts as a failing listener
const STREAM_BUFFER: usize = 16;

pub struct AppState {
    pub context_service: Arc<ContextService>,
    pub started_at: Instant,
}

pub fn app(service: Arc<ContextService>) -> Router {
    let state = Arc::new(AppState {
        context_service: service,
        started_at: Instant::now(),
    });

    Router::new()
        .route("/health", get(health))
        .route("/v1/context", get(get_context))
        .route("/v1/context/stream", get(stream_context))
        .route("/v1/context/{domain}", get(get_domain))
        .route("/v1/decisions/{action}", post(evaluate_decision))
        .with_state(state)
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(json!({ "error": message.into() }))).into_response()
}

async fn health(State(state): State<Arc<AppState>>) -> Json<Value> {
    let service = &state.context_service;
    let snapshot = service.get_context();

    Json(json!({
        "status": "healthy",
        "uptime_seconds": state.started_at.elapsed().as_secs(),
        "snapshot_cycle": snapshot.cycle,
        "snapshot_age_ms": service.snapshot_age().as_millis() as u64,
        "aggregation_running": service.is_running(),
    }))
}

async fn get_context(State(state): State<Arc<AppState>>) -> Response {
    let snapshot = state.context_service.get_context();
    Json(&*snapshot).into_response()
}

async fn get_domain(
    State(state): State<Arc<AppState>>,
    Path(domain): Path<String>,
) -> Response {
    match domain.parse::<ContextDomain>() {
        Ok(domain) => Json(state.context_service.get_domain(domain)).into_response(),
        Err(e) => error_response(StatusCode::NOT_FOUND, e),
    }
}

async fn evaluate_decision(
    State(state): State<Arc<AppState>>,
    Path(action): Path<String>,
    body: Bytes,
) -> Response {
    let params = if body.iter().all(u8::is_ascii_whitespace) {
        DecisionParams::new()
    } else {
        let value: Value = match serde_json::from_slice(&body) {
            Ok(value) => value,
            Err(e) => {
                return error_response(StatusCode::BAD_REQUEST, format!("Invalid JSON body: {}", e))
            }
        };
        match DecisionParams::try_from(value) {
            Ok(params) => params,
            Err(e) => return error_response(StatusCode::BAD_REQUEST, e),
        }
    };

    Json(state.context_service.evaluate(&action, &params)).into_response()
}

/// Published snapshots for one SSE client; unsubscribes when the client goes away
struct SnapshotStream {
    inner: ReceiverStream<Arc<ContextSnapshot>>,
    service: Arc<ContextService>,
    subscription_id: SubscriptionId,
}

impl Stream for SnapshotStream {
    type Item = Arc<ContextSnapshot>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.inner).poll_next(cx)
    }
}

impl Drop for SnapshotStream {
    fn drop(&mut self) {
        debug!(subscription_id = %self.subscription_id, "Context stream closed");
        self.service.unsubscribe(self.subscription_id);
    }
}

async fn stream_context(
    State(state): State<Arc<AppState>>,
) -> Sse<impl Stream<Item = Result<Event, axum::Error>>> {
    let service = state.context_service.clone();
    let (listener, rx) = ChannelSubscriber::new("sse-client", STREAM_BUFFER);
    let subscription_id = service.subscribe(Arc::new(listener));

    let stream = SnapshotStream {
        inner: ReceiverStream::new(rx),
        service,
        subscription_id,
    }
    .map(|snapshot| {
        Event::default()
            .event("snapshot")
            .id(snapshot.cycle.to_string())
            .json_data(&*snapshot)
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}
