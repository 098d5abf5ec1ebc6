//! Exposes an in-process messages service for use in integration tests.
//!
//! ```
//! use loadtest_test::server::TestServer;
//!
//! #[tokio::main]
//! async fn main() {
//!    let server = TestServer::new().await;
//!    let url = server.url("/messages/1");
//!    // use the URL in tests...
//! }
//! ```

use std::collections::BTreeMap;
use std::net::{SocketAddr, TcpListener};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::post;
use serde_json::Value;

/// Shared state of the messages service.
#[derive(Debug, Default)]
struct Messages {
    failing: bool,
    actors: Mutex<BTreeMap<u32, Vec<String>>>,
    posts: AtomicU64,
    gets: AtomicU64,
}

type AppState = Arc<Messages>;

/// An in-process messages service for use in integration tests.
///
/// The service stores messages per actor in memory and counts the requests it receives. It listens
/// on a random available port on localhost and stops when dropped.
#[derive(Debug)]
pub struct TestServer {
    handle: tokio::task::JoinHandle<()>,
    socket: SocketAddr,
    state: AppState,
}

impl TestServer {
    /// Starts a service which accepts all valid requests.
    pub async fn new() -> Self {
        Self::start(false).await
    }

    /// Starts a service which responds to every request with `500 Internal Server Error`.
    pub async fn failing() -> Self {
        Self::start(true).await
    }

    async fn start(failing: bool) -> Self {
        let addr = SocketAddr::from(([127, 0, 0, 1], 0));
        let listener = TcpListener::bind(addr).unwrap();
        listener.set_nonblocking(true).unwrap();
        let socket = listener.local_addr().unwrap();

        let state = Arc::new(Messages {
            failing,
            ..Default::default()
        });
        let router = axum::Router::new()
            .route("/messages/{actor_id}", post(add_message).get(get_messages))
            .with_state(Arc::clone(&state));

        let handle = tokio::spawn(async move {
            let listener = tokio::net::TcpListener::from_std(listener).unwrap();
            axum::serve(listener, router).await.unwrap();
        });

        Self {
            handle,
            socket,
            state,
        }
    }

    /// Returns a full URL pointing to the given path.
    ///
    /// This URL uses `localhost` as hostname.
    pub fn url(&self, path: &str) -> String {
        let path = path.trim_start_matches('/');
        format!("http://localhost:{}/{}", self.socket.port(), path)
    }

    /// The number of `POST` requests received.
    pub fn posts(&self) -> u64 {
        self.state.posts.load(Ordering::Relaxed)
    }

    /// The number of `GET` requests received.
    pub fn gets(&self) -> u64 {
        self.state.gets.load(Ordering::Relaxed)
    }

    /// All stored messages, keyed by actor id.
    pub fn messages(&self) -> BTreeMap<u32, Vec<String>> {
        self.state.actors.lock().unwrap().clone()
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn add_message(
    State(state): State<AppState>,
    Path(actor_id): Path<u32>,
    Json(body): Json<Value>,
) -> StatusCode {
    state.posts.fetch_add(1, Ordering::Relaxed);
    if state.failing {
        return StatusCode::INTERNAL_SERVER_ERROR;
    }

    let message = match body {
        Value::String(text) => text,
        other => other.to_string(),
    };
    if message.trim().is_empty() {
        return StatusCode::BAD_REQUEST;
    }

    tracing::trace!(actor_id, text = %message, "adding message");
    let mut actors = state.actors.lock().unwrap();
    actors.entry(actor_id).or_default().push(message);
    StatusCode::OK
}

async fn get_messages(
    State(state): State<AppState>,
    Path(actor_id): Path<u32>,
) -> Result<Json<Vec<String>>, StatusCode> {
    state.gets.fetch_add(1, Ordering::Relaxed);
    if state.failing {
        return Err(StatusCode::INTERNAL_SERVER_ERROR);
    }

    let actors = state.actors.lock().unwrap();
    let messages = actors.get(&actor_id).cloned().unwrap_or_default();
    Ok(Json(messages))
}
