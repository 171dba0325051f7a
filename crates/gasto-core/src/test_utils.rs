//! Test utilities for gasto-core
//!
//! This module provides testing infrastructure: mock servers standing in for
//! the AI provider APIs and the exchange-rate API, so tests never touch the
//! network.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::extract::{Json, Path, State};
use axum::http::{header, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use serde_json::json;
use tokio::sync::oneshot;

/// Bind an ephemeral port and serve the router until the sender fires.
async fn spawn_router(app: Router) -> (SocketAddr, oneshot::Sender<()>) {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let (shutdown_tx, shutdown_rx) = oneshot::channel();

    tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async {
                shutdown_rx.await.ok();
            })
            .await
            .unwrap();
    });

    (addr, shutdown_tx)
}

// ---------------------------------------------------------------------------
// Exchange-rate API mock
// ---------------------------------------------------------------------------

#[derive(Default)]
struct RateState {
    /// Response body per uppercased base currency
    bodies: HashMap<String, serde_json::Value>,
    failing: bool,
    hits: usize,
}

/// Mock exchange-rate server answering `GET /latest/{base}`
pub struct MockRateServer {
    addr: SocketAddr,
    state: Arc<Mutex<RateState>>,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl MockRateServer {
    /// Start the mock server on an available port
    pub async fn start() -> Self {
        let state = Arc::new(Mutex::new(RateState::default()));

        let app = Router::new()
            .route("/latest/:base", get(handle_latest_rates))
            .with_state(state.clone());

        let (addr, shutdown_tx) = spawn_router(app).await;

        Self {
            addr,
            state,
            shutdown_tx: Some(shutdown_tx),
        }
    }

    /// Get the base URL for this mock server
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Serve a rate table for the given base currency
    pub fn set_rates(&self, base: &str, rates: &[(&str, f64)]) {
        let mut table = serde_json::Map::new();
        for (code, rate) in rates {
            table.insert((*code).to_string(), json!(rate));
        }
        let body = json!({ "base": base, "rates": table });
        self.set_body(base, body);
    }

    /// Serve a raw response body for the given base currency
    pub fn set_body(&self, base: &str, body: serde_json::Value) {
        let mut state = self.state.lock().unwrap();
        state.bodies.insert(base.to_uppercase(), body);
    }

    /// While failing, every request gets a 500
    pub fn set_failing(&self, failing: bool) {
        self.state.lock().unwrap().failing = failing;
    }

    /// Number of rate lookups received so far
    pub fn hits(&self) -> usize {
        self.state.lock().unwrap().hits
    }

    /// Stop the mock server
    pub fn stop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

impl Drop for MockRateServer {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn handle_latest_rates(
    State(state): State<Arc<Mutex<RateState>>>,
    Path(base): Path<String>,
) -> Response {
    let mut state = state.lock().unwrap();
    state.hits += 1;

    if state.failing {
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }

    match state.bodies.get(&base.to_uppercase()) {
        Some(body) => Json(body.clone()).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

// ---------------------------------------------------------------------------
// Static file mock
// ---------------------------------------------------------------------------

#[derive(Clone)]
struct ServedFile {
    bytes: Vec<u8>,
    content_type: String,
}

/// Mock file host serving registered paths, 404 for everything else
pub struct MockFileServer {
    addr: SocketAddr,
    files: Arc<Mutex<HashMap<String, ServedFile>>>,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl MockFileServer {
    /// Start the mock server on an available port
    pub async fn start() -> Self {
        let files: Arc<Mutex<HashMap<String, ServedFile>>> = Arc::default();

        let app = Router::new()
            .fallback(handle_file_request)
            .with_state(files.clone());

        let (addr, shutdown_tx) = spawn_router(app).await;

        Self {
            addr,
            files,
            shutdown_tx: Some(shutdown_tx),
        }
    }

    /// Get the base URL for this mock server
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Register a file at the given path
    pub fn serve(&self, path: &str, bytes: Vec<u8>, content_type: &str) {
        let path = if path.starts_with('/') {
            path.to_string()
        } else {
            format!("/{path}")
        };
        self.files.lock().unwrap().insert(
            path,
            ServedFile {
                bytes,
                content_type: content_type.to_string(),
            },
        );
    }

    /// Stop the mock server
    pub fn stop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

impl Drop for MockFileServer {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn handle_file_request(
    State(files): State<Arc<Mutex<HashMap<String, ServedFile>>>>,
    uri: Uri,
) -> Response {
    let served = {
        let files = files.lock().unwrap();
        files.get(uri.path()).cloned()
    };

    match served {
        Some(file) => ([(header::CONTENT_TYPE, file.content_type)], file.bytes).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

// ---------------------------------------------------------------------------
// AI provider mock
// ---------------------------------------------------------------------------

struct ProviderState {
    reply: String,
    failing: bool,
    requests: usize,
    last_body: Option<serde_json::Value>,
}

/// Mock AI provider answering both the OpenAI chat-completions endpoint and
/// the Anthropic messages endpoint with a canned reply.
pub struct MockProviderServer {
    addr: SocketAddr,
    state: Arc<Mutex<ProviderState>>,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl MockProviderServer {
    /// Start the mock server on an available port
    pub async fn start() -> Self {
        let state = Arc::new(Mutex::new(ProviderState {
            reply: "{}".to_string(),
            failing: false,
            requests: 0,
            last_body: None,
        }));

        let app = Router::new()
            .route("/v1/chat/completions", post(handle_chat_completions))
            .route("/v1/messages", post(handle_messages))
            .with_state(state.clone());

        let (addr, shutdown_tx) = spawn_router(app).await;

        Self {
            addr,
            state,
            shutdown_tx: Some(shutdown_tx),
        }
    }

    /// Get the base URL for this mock server
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Set the assistant reply returned by both endpoints
    pub fn set_reply(&self, reply: &str) {
        self.state.lock().unwrap().reply = reply.to_string();
    }

    /// While failing, every request gets a 500
    pub fn set_failing(&self, failing: bool) {
        self.state.lock().unwrap().failing = failing;
    }

    /// Number of completion requests received so far
    pub fn requests(&self) -> usize {
        self.state.lock().unwrap().requests
    }

    /// The most recent request body, if any
    pub fn last_request(&self) -> Option<serde_json::Value> {
        self.state.lock().unwrap().last_body.clone()
    }

    /// Stop the mock server
    pub fn stop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

impl Drop for MockProviderServer {
    fn drop(&mut self) {
        self.stop();
    }
}

/// OpenAI chat completions endpoint
async fn handle_chat_completions(
    State(state): State<Arc<Mutex<ProviderState>>>,
    Json(body): Json<serde_json::Value>,
) -> Response {
    let reply = {
        let mut state = state.lock().unwrap();
        state.requests += 1;
        state.last_body = Some(body);
        if state.failing {
            return (StatusCode::INTERNAL_SERVER_ERROR, "mock provider down").into_response();
        }
        state.reply.clone()
    };

    Json(json!({
        "id": "chatcmpl-mock",
        "choices": [{
            "index": 0,
            "message": { "role": "assistant", "content": reply },
            "finish_reason": "stop"
        }]
    }))
    .into_response()
}

/// Anthropic messages endpoint
async fn handle_messages(
    State(state): State<Arc<Mutex<ProviderState>>>,
    Json(body): Json<serde_json::Value>,
) -> Response {
    let reply = {
        let mut state = state.lock().unwrap();
        state.requests += 1;
        state.last_body = Some(body);
        if state.failing {
            return (StatusCode::INTERNAL_SERVER_ERROR, "mock provider down").into_response();
        }
        state.reply.clone()
    };

    Json(json!({
        "id": "msg-mock",
        "type": "message",
        "role": "assistant",
        "content": [{ "type": "text", "text": reply }]
    }))
    .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::{ClaudeProvider, ExpenseAnalyzer, OpenAiProvider};
    use crate::currency::CurrencyConverter;
    use chrono::NaiveDate;

    #[tokio::test]
    async fn test_rate_server_serves_configured_rates() {
        let server = MockRateServer::start().await;
        server.set_rates("EUR", &[("USD", 2.0)]);
        let converter = CurrencyConverter::new("EUR").with_base_url(&server.url());

        let date = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        let rate = converter.get_exchange_rate("EUR", "USD", date).await;

        assert_eq!(rate, 2.0);
        assert_eq!(server.hits(), 1);
    }

    #[tokio::test]
    async fn test_rate_server_unknown_base_falls_back() {
        let server = MockRateServer::start().await;
        let converter = CurrencyConverter::new("EUR").with_base_url(&server.url());

        let date = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        let rate = converter.get_exchange_rate("CHF", "USD", date).await;

        assert_eq!(rate, 1.0);
        assert_eq!(server.hits(), 1);
    }

    #[tokio::test]
    async fn test_provider_server_openai_roundtrip() {
        let server = MockProviderServer::start().await;
        server.set_reply(
            r#"{"amount": 42.5, "currency": "USD", "description": "Test purchase",
                "date": "2024-03-01", "category_name": "Compras"}"#,
        );
        let provider = OpenAiProvider::new("test-key", "EUR").with_base_url(&server.url());

        let data = provider.analyze(Some("a receipt"), None).await.unwrap();

        assert_eq!(data.amount, 42.5);
        assert_eq!(data.currency, "USD");
        assert_eq!(data.category_name, "Compras");
        assert_eq!(data.date, NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());

        let body = server.last_request().unwrap();
        let system = body["messages"][0]["content"].as_str().unwrap();
        assert!(system.contains("expense analysis assistant"));
    }

    #[tokio::test]
    async fn test_provider_failure_surfaces_as_analysis_error() {
        let server = MockProviderServer::start().await;
        server.set_failing(true);
        let provider = OpenAiProvider::new("test-key", "EUR").with_base_url(&server.url());

        let result = provider.analyze(Some("a receipt"), None).await;

        match result {
            Err(crate::error::Error::Analysis(msg)) => {
                assert!(msg.contains("500"), "status missing from: {}", msg);
                assert!(msg.contains("mock provider down"), "body missing from: {}", msg);
            }
            other => panic!("Expected analysis error, got {:?}", other.map(|d| d.amount)),
        }
    }

    #[tokio::test]
    async fn test_provider_server_claude_roundtrip() {
        let server = MockProviderServer::start().await;
        server.set_reply(
            r#"{"amount": 9.99, "currency": "EUR", "description": "Coffee",
                "date": "2024-03-02", "category_name": "Comida"}"#,
        );
        let provider = ClaudeProvider::new("test-key", "EUR").with_base_url(&server.url());

        let data = provider.analyze(Some("a receipt"), None).await.unwrap();

        assert_eq!(data.amount, 9.99);
        assert_eq!(data.category_name, "Comida");

        let body = server.last_request().unwrap();
        let system = body["system"].as_str().unwrap();
        assert!(system.contains("expense analysis assistant"));
        assert_eq!(server.requests(), 1);
    }
}
