#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::Router;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, Method, StatusCode, Uri, header};
use axum::response::{IntoResponse, Response};
use serde_json::{Value, json};
use tidepool::Client;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

/// One request as seen by the test server.
#[derive(Clone, Debug)]
pub struct Recorded {
    pub method: String,
    pub path: String,
    pub accept: Option<String>,
    pub content_type: Option<String>,
    pub body: Option<Value>,
}

/// Canned answer for a recorded request.
#[derive(Clone, Debug)]
pub struct Reply {
    pub status: u16,
    pub body: String,
    pub delay: Duration,
}

impl Reply {
    pub fn json(status: u16, body: Value) -> Self {
        Self {
            status,
            body: body.to_string(),
            delay: Duration::ZERO,
        }
    }

    pub fn no_content() -> Self {
        Self {
            status: 204,
            body: String::new(),
            delay: Duration::ZERO,
        }
    }

    pub fn raw(status: u16, body: &str) -> Self {
        Self {
            status,
            body: body.to_string(),
            delay: Duration::ZERO,
        }
    }

    pub fn after(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

type Handler = Arc<dyn Fn(&Recorded) -> Reply + Send + Sync>;

#[derive(Clone)]
struct AppState {
    requests: Arc<Mutex<Vec<Recorded>>>,
    handler: Handler,
}

pub struct TestServer {
    pub addr: SocketAddr,
    requests: Arc<Mutex<Vec<Recorded>>>,
    shutdown_tx: Option<oneshot::Sender<()>>,
    _server_handle: JoinHandle<()>,
}

impl TestServer {
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.requests.lock().unwrap().clone()
    }

    pub fn count(&self, path: &str) -> usize {
        self.requests().iter().filter(|r| r.path == path).count()
    }

    pub fn contains(&self, path: &str) -> bool {
        self.count(path) > 0
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

async fn handle(
    State(state): State<AppState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let header_value = |name: header::HeaderName| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };
    let recorded = Recorded {
        method: method.to_string(),
        path: uri.path().to_string(),
        accept: header_value(header::ACCEPT),
        content_type: header_value(header::CONTENT_TYPE),
        body: serde_json::from_slice(&body).ok(),
    };
    let reply = (state.handler)(&recorded);
    state.requests.lock().unwrap().push(recorded);

    if !reply.delay.is_zero() {
        tokio::time::sleep(reply.delay).await;
    }
    let status = StatusCode::from_u16(reply.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, [(header::CONTENT_TYPE, "application/json")], reply.body).into_response()
}

/// Start a server on a random local port that answers with `handler`.
pub async fn spawn_server<F>(handler: F) -> TestServer
where
    F: Fn(&Recorded) -> Reply + Send + Sync + 'static,
{
    let requests = Arc::new(Mutex::new(Vec::new()));
    let state = AppState {
        requests: Arc::clone(&requests),
        handler: Arc::new(handler),
    };
    let app = Router::new().fallback(handle).with_state(state);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
    let server_handle = tokio::spawn(async move {
        let _ = axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
            })
            .await;
    });

    TestServer {
        addr,
        requests,
        shutdown_tx: Some(shutdown_tx),
        _server_handle: server_handle,
    }
}

/// Ingest service stand-in: status endpoints report fixed counters,
/// everything else answers 204.
pub fn ingest_backend(req: &Recorded) -> Reply {
    if req.path == "/health" {
        return Reply::json(200, json!({"service": "ingest", "status": "ok"}));
    }
    if req.path.ends_with("/status") {
        return Reply::json(
            200,
            json!({
                "last_run": "2025-01-01T00:00:00Z",
                "wal_files": 1,
                "wal_entries": 2,
                "segments": 3,
                "total_vecs": 4,
                "dimensions": 5
            }),
        );
    }
    Reply::no_content()
}

/// Query service stand-in: echoes the queried namespace and lists two
/// namespaces.
pub fn query_backend(req: &Recorded) -> Reply {
    if req.path == "/health" {
        return Reply::json(200, json!({"service": "query", "status": "ok"}));
    }
    if req.method == "GET" && req.path == "/v1/namespaces" {
        return Reply::json(
            200,
            json!({
                "namespaces": [
                    {"namespace": "default", "approx_count": 10, "dimensions": 3, "pending_compaction": true},
                    {"namespace": "products", "approx_count": 5, "dimensions": 3}
                ]
            }),
        );
    }
    if req.method == "POST" {
        if let Some(namespace) = req.path.strip_prefix("/v1/vectors/") {
            return Reply::json(
                200,
                json!({"namespace": namespace, "results": [{"id": "a", "score": 0.1}]}),
            );
        }
    }
    Reply::no_content()
}

/// Both stand-in services plus a client pointed at them.
pub struct Backend {
    pub query: TestServer,
    pub ingest: TestServer,
    pub client: Client,
}

pub async fn backend() -> Backend {
    let query = spawn_server(query_backend).await;
    let ingest = spawn_server(ingest_backend).await;
    let client = Client::builder()
        .query_url(query.url())
        .ingest_url(ingest.url())
        .default_namespace("default")
        .build()
        .unwrap();
    Backend {
        query,
        ingest,
        client,
    }
}
