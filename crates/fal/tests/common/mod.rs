//! In-process stand-in for the fal.ai queue API.
//!
//! Binds an axum router on an ephemeral port and serves the submit /
//! status / result / file endpoints according to a [`Scenario`], while
//! recording what the client sent.

use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Path, State};
use axum::http::header::{AUTHORIZATION, RETRY_AFTER};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;

use agentmint_core::work_item::WorkItem;
use agentmint_fal::client::{FalClient, FalConfig};

/// How the fake queue behaves for every request it receives.
#[derive(Debug, Clone)]
pub enum Scenario {
    /// Report `IN_PROGRESS` for the first `pending_polls` polls, then complete.
    Completes { pending_polls: usize },
    /// Reject the submission with the given status and optional `Retry-After`.
    SubmitRejected {
        status: u16,
        retry_after: Option<&'static str>,
    },
    /// The queue reports the request as `FAILED`.
    QueueFailed,
    /// The queue never leaves `IN_QUEUE`.
    NeverCompletes,
    /// The result nests the image list under `output` as bare strings.
    NestedStringImage,
    /// The result contains no images.
    NoImages,
    /// The file endpoint serves an HTML page instead of an image.
    NotAnImage,
}

pub struct FakeQueue {
    base_url: String,
    scenario: Scenario,
    pub submits: AtomicUsize,
    pub polls: AtomicUsize,
    pub auth_headers: Mutex<Vec<String>>,
    pub submitted_bodies: Mutex<Vec<serde_json::Value>>,
}

impl FakeQueue {
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn submit_count(&self) -> usize {
        self.submits.load(Ordering::SeqCst)
    }
}

/// Start a fake queue server and return its shared state.
pub async fn start(scenario: Scenario) -> Arc<FakeQueue> {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind ephemeral port");
    let addr = listener.local_addr().expect("local addr");

    let state = Arc::new(FakeQueue {
        base_url: format!("http://{addr}"),
        scenario,
        submits: AtomicUsize::new(0),
        polls: AtomicUsize::new(0),
        auth_headers: Mutex::new(Vec::new()),
        submitted_bodies: Mutex::new(Vec::new()),
    });

    let app = Router::new()
        .route("/queue/{*model}", post(submit))
        .route("/requests/{id}/status", get(status))
        .route("/requests/{id}", get(result))
        .route("/files/{name}", get(file))
        .with_state(Arc::clone(&state));

    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("fake queue server");
    });

    state
}

/// A client pointed at the fake queue with fast polling.
pub fn client_for(queue: &FakeQueue) -> FalClient {
    FalClient::new(FalConfig {
        queue_url: format!("{}/queue", queue.base_url()),
        poll_interval: Duration::from_millis(5),
        max_poll_attempts: 5,
        ..FalConfig::new("test-key")
    })
    .expect("valid config")
}

pub fn work_item(token_id: u32) -> WorkItem {
    WorkItem {
        token_id,
        prompt: format!("chibi agent #{token_id}, black suit, sunglasses"),
        model: "fal-ai/nano-banana".to_string(),
        rarity: Some("rare".to_string()),
    }
}

/// A small valid PNG.
pub fn png_bytes() -> Vec<u8> {
    let mut out = Cursor::new(Vec::new());
    image::RgbImage::new(4, 4)
        .write_to(&mut out, image::ImageFormat::Png)
        .expect("encode png");
    out.into_inner()
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn submit(
    State(queue): State<Arc<FakeQueue>>,
    Path(_model): Path<String>,
    headers: HeaderMap,
    Json(body): Json<serde_json::Value>,
) -> Response {
    queue.submits.fetch_add(1, Ordering::SeqCst);
    if let Some(auth) = headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok()) {
        queue.auth_headers.lock().unwrap().push(auth.to_string());
    }
    queue.submitted_bodies.lock().unwrap().push(body);

    if let Scenario::SubmitRejected {
        status,
        retry_after,
    } = queue.scenario
    {
        let code = StatusCode::from_u16(status).expect("valid status");
        let mut response = (code, "rejected by fake queue").into_response();
        if let Some(value) = retry_after {
            response
                .headers_mut()
                .insert(RETRY_AFTER, HeaderValue::from_static(value));
        }
        return response;
    }

    let base = queue.base_url();
    Json(json!({
        "request_id": "req-1",
        "status_url": format!("{base}/requests/req-1/status"),
        "response_url": format!("{base}/requests/req-1"),
    }))
    .into_response()
}

async fn status(State(queue): State<Arc<FakeQueue>>, Path(_id): Path<String>) -> Json<serde_json::Value> {
    let poll = queue.polls.fetch_add(1, Ordering::SeqCst) + 1;
    let body = match queue.scenario {
        Scenario::Completes { pending_polls } if poll <= pending_polls => {
            json!({"status": "IN_PROGRESS"})
        }
        Scenario::QueueFailed => json!({"status": "FAILED", "error": "content policy violation"}),
        Scenario::NeverCompletes => json!({"status": "IN_QUEUE"}),
        _ => json!({"status": "COMPLETED"}),
    };
    Json(body)
}

async fn result(State(queue): State<Arc<FakeQueue>>, Path(id): Path<String>) -> Json<serde_json::Value> {
    let url = format!("{}/files/{id}.png", queue.base_url());
    let body = match queue.scenario {
        Scenario::NestedStringImage => json!({"output": {"images": [url]}}),
        Scenario::NoImages => json!({"images": [], "seed": 7}),
        _ => json!({"images": [{"url": url, "width": 4, "height": 4}]}),
    };
    Json(body)
}

async fn file(State(queue): State<Arc<FakeQueue>>, Path(_name): Path<String>) -> Vec<u8> {
    match queue.scenario {
        Scenario::NotAnImage => b"<html>temporarily unavailable</html>".to_vec(),
        _ => png_bytes(),
    }
}
