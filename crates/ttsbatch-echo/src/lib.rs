//! Stand-in TTS endpoint: answers every `/tts` POST by echoing the body back

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::State,
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use prometheus::{Encoder, IntCounter, Registry, TextEncoder};
use tokio::sync::Mutex as AsyncMutex;

#[derive(Clone)]
pub struct EchoState {
    inner: Arc<Inner>,
}

struct Inner {
    delay: Option<Duration>,
    received: Option<AsyncMutex<Vec<String>>>,
    registry: Registry,
    requests_total: IntCounter,
}

impl EchoState {
    pub fn new() -> Self { Self::build(None, false) }

    /// Keeps every `/tts` body in memory so callers can inspect what arrived.
    pub fn recording() -> Self { Self::build(None, true) }

    /// Every `/tts` call sleeps for `delay` before answering.
    pub fn with_delay(delay: Option<Duration>) -> Self { Self::build(delay, false) }

    fn build(delay: Option<Duration>, record: bool) -> Self {
        let registry = Registry::new();
        let requests_total =
            IntCounter::new("tts_requests_total", "Total number of /tts requests").expect("counter");
        registry.register(Box::new(requests_total.clone())).expect("register counter");
        Self {
            inner: Arc::new(Inner {
                delay,
                received: record.then(|| AsyncMutex::new(Vec::new())),
                registry,
                requests_total,
            }),
        }
    }

    /// Bodies of all `/tts` requests seen so far, in arrival order.
    /// Always empty unless the state was built with [`EchoState::recording`].
    pub async fn received(&self) -> Vec<String> {
        match &self.inner.received {
            Some(log) => log.lock().await.clone(),
            None => Vec::new(),
        }
    }

    pub fn requests_total(&self) -> u64 { self.inner.requests_total.get() }
}

impl Default for EchoState {
    fn default() -> Self { Self::new() }
}

pub fn app() -> Router {
    app_with(EchoState::new())
}

pub fn app_with(state: EchoState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/tts", post(tts))
        .route("/metrics", get(metrics))
        .with_state(state)
}

/// Serves [`app`] on `addr` until Ctrl+C.
pub async fn serve(addr: SocketAddr) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(target: "echo", "listening on http://{}", listener.local_addr()?);
    let shutdown = async {
        let _ = tokio::signal::ctrl_c().await;
        tracing::info!(target: "echo", "shutdown signal received");
    };
    axum::serve(listener, app()).with_graceful_shutdown(shutdown).await
}

async fn root() -> &'static str {
    "Hello, World! This is a GET response."
}

async fn tts(State(state): State<EchoState>, body: String) -> String {
    state.inner.requests_total.inc();
    tracing::debug!(target: "echo", bytes = body.len(), "tts request");
    if let Some(delay) = state.inner.delay {
        tokio::time::sleep(delay).await;
    }
    if let Some(log) = &state.inner.received {
        log.lock().await.push(body.clone());
    }
    format!("You posted: {body}")
}

async fn metrics(State(state): State<EchoState>) -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&state.inner.registry.gather(), &mut buffer) {
        tracing::warn!(target: "echo", "metrics encoding failed: {e}");
    }
    ([("content-type", encoder.format_type().to_string())], buffer)
}
