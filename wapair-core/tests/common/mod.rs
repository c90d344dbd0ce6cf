//! Shared test utilities for wapair-core integration tests
//!
//! FakeGateway is a small axum server speaking the gateway instance API and
//! the downstream `updateStatusConnection` call.

use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use wapair_core::LifecycleEvent;

/// PNG signature, a valid but tiny "QR" payload
#[allow(dead_code)]
pub const PNG_ARTIFACT: &str = "data:image/png;base64,iVBORw0KGgo=";

type Reply = (StatusCode, Value);

/// Scripted gateway state shared with the handlers
#[derive(Default)]
pub struct FakeState {
    create_reply: Mutex<Option<Reply>>,
    connect_reply: Mutex<Option<Reply>>,
    poll_replies: Mutex<VecDeque<Reply>>,
    record_status: Mutex<Option<StatusCode>>,
    created_names: Mutex<Vec<String>>,
    records: Mutex<Vec<Value>>,
    poll_calls: AtomicUsize,
    next_id: AtomicU64,
}

#[allow(dead_code)]
impl FakeState {
    pub fn reply_to_create(&self, status: StatusCode, body: Value) {
        *self.create_reply.lock().unwrap() = Some((status, body));
    }

    pub fn reply_to_connect(&self, status: StatusCode, body: Value) {
        *self.connect_reply.lock().unwrap() = Some((status, body));
    }

    pub fn queue_states(&self, states: &[&str]) {
        let mut replies = self.poll_replies.lock().unwrap();
        for state in states {
            replies.push_back((StatusCode::OK, json!({ "state": state })));
        }
    }

    pub fn queue_poll_failures(&self, count: usize) {
        let mut replies = self.poll_replies.lock().unwrap();
        for _ in 0..count {
            replies.push_back((
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({ "error": "gateway restarting" }),
            ));
        }
    }

    pub fn reject_records(&self, status: StatusCode) {
        *self.record_status.lock().unwrap() = Some(status);
    }

    pub fn created_names(&self) -> Vec<String> {
        self.created_names.lock().unwrap().clone()
    }

    pub fn records(&self) -> Vec<Value> {
        self.records.lock().unwrap().clone()
    }

    pub fn poll_calls(&self) -> usize {
        self.poll_calls.load(Ordering::SeqCst)
    }
}

/// A running fake gateway
pub struct FakeGateway {
    pub state: Arc<FakeState>,
    pub addr: SocketAddr,
}

impl FakeGateway {
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }
}

/// Spawn a fake gateway on an ephemeral port
pub async fn spawn_fake_gateway() -> FakeGateway {
    let state = Arc::new(FakeState::default());

    let app = Router::new()
        .route("/instance/create", post(create_instance))
        .route("/instance/connect/:id", get(connect))
        .route("/instance/connectionState/:id", get(connection_state))
        .route("/updateStatusConnection", post(update_status))
        .with_state(Arc::clone(&state));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    // Brief delay to ensure server is accepting connections
    tokio::time::sleep(Duration::from_millis(10)).await;

    FakeGateway { state, addr }
}

async fn create_instance(
    State(state): State<Arc<FakeState>>,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    if let Some(name) = body["instanceName"].as_str() {
        state.created_names.lock().unwrap().push(name.to_string());
    }

    if let Some((status, body)) = state.create_reply.lock().unwrap().clone() {
        return (status, Json(body));
    }

    let id = state.next_id.fetch_add(1, Ordering::SeqCst) + 1;
    (
        StatusCode::OK,
        Json(json!({ "data": { "id": id, "status": "created" } })),
    )
}

async fn connect(
    State(state): State<Arc<FakeState>>,
    Path(_id): Path<u64>,
) -> (StatusCode, Json<Value>) {
    let reply = state.connect_reply.lock().unwrap().clone();
    let (status, body) = reply.unwrap_or((StatusCode::OK, json!({ "base64": PNG_ARTIFACT })));
    (status, Json(body))
}

async fn connection_state(
    State(state): State<Arc<FakeState>>,
    Path(_id): Path<u64>,
) -> (StatusCode, Json<Value>) {
    state.poll_calls.fetch_add(1, Ordering::SeqCst);
    let reply = state.poll_replies.lock().unwrap().pop_front();
    let (status, body) = reply.unwrap_or((StatusCode::OK, json!({ "state": "connecting" })));
    (status, Json(body))
}

async fn update_status(State(state): State<Arc<FakeState>>, Json(body): Json<Value>) -> StatusCode {
    state.records.lock().unwrap().push(body);
    state.record_status.lock().unwrap().unwrap_or(StatusCode::OK)
}

/// Wait for the next event matching `predicate`
#[allow(dead_code)]
pub async fn wait_for_event(
    events: &mut broadcast::Receiver<LifecycleEvent>,
    predicate: impl Fn(&LifecycleEvent) -> bool,
) -> LifecycleEvent {
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let event = events.recv().await.unwrap();
            if predicate(&event) {
                return event;
            }
        }
    })
    .await
    .expect("expected event did not arrive within 5s")
}
