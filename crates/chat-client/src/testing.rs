//! Test utilities for chat-client
//!
//! Provides an in-process chat server that speaks the same endpoints as the
//! real one: the event stream, chat submission and ratings.

use std::collections::VecDeque;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chat_core::{EventKind, ServerEvent, SENTINEL};
use parking_lot::Mutex;
use serde::Deserialize;
use serde_json::json;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;
use tracing::debug;

use crate::client::{RATE_PATH, STREAM_PATH};
use crate::config::DEFAULT_CHAT_PATH;
use crate::types::{ChatRequest, RateRequest};
use crate::{ChatClient, Result};

const EVENT_CAPACITY: usize = 256;
/// How long a scripted answer waits for a stream subscriber
const SUBSCRIBER_WAIT: Duration = Duration::from_secs(2);

/// A test server that automatically shuts down when dropped
pub struct TestServer {
    pub addr: SocketAddr,
    pub client: ChatClient,
    shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
    handle: Option<tokio::task::JoinHandle<()>>,
}

impl TestServer {
    /// Serve `router` on an ephemeral local port
    ///
    /// # Example
    ///
    /// ```ignore
    /// use chat_client::testing::{FakeChatServer, TestServer};
    ///
    /// let fake = FakeChatServer::new();
    /// let server = TestServer::start(fake.router()).await?;
    /// let ack = server.client.send_message("/chatgpt", &ChatRequest::new("hi")).await?;
    /// ```
    pub async fn start<S>(router: Router<S>) -> Result<Self>
    where
        S: Clone + Send + Sync + 'static,
        Router<S>: Into<Router>,
    {
        Self::start_with_timeout(router, Duration::from_secs(5), Duration::from_secs(2)).await
    }

    /// Create a new test server with custom client timeouts
    pub async fn start_with_timeout<S>(
        router: Router<S>,
        timeout: Duration,
        connect_timeout: Duration,
    ) -> Result<Self>
    where
        S: Clone + Send + Sync + 'static,
        Router<S>: Into<Router>,
    {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;

        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();

        let router: Router = router.into();

        let handle = tokio::spawn(async move {
            axum::serve(listener, router)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await
                .ok();
        });

        // Give server a moment to start
        tokio::time::sleep(Duration::from_millis(10)).await;

        let base_url = format!("http://{}", addr);
        let client = ChatClient::with_config(&base_url, timeout, connect_timeout)?;

        Ok(Self {
            addr,
            client,
            shutdown_tx: Some(shutdown_tx),
            handle: Some(handle),
        })
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn client(&self) -> &ChatClient {
        &self.client
    }

    /// Shutdown the server gracefully
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

/// Wait for a condition with timeout
pub async fn wait_for<F, Fut>(condition: F, timeout: Duration) -> bool
where
    F: Fn() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + timeout;

    while tokio::time::Instant::now() < deadline {
        if condition().await {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    false
}

// =============================================================================
// Fake chat server
// =============================================================================

/// In-process stand-in for the chat server
///
/// Answers are scripted ahead of time and streamed to every connected
/// subscriber when the next question is posted. Clones share state.
#[derive(Clone)]
pub struct FakeChatServer {
    inner: Arc<FakeInner>,
}

struct FakeInner {
    events: Mutex<broadcast::Sender<ServerEvent>>,
    answers: Mutex<VecDeque<Vec<ServerEvent>>>,
    requests: Mutex<Vec<ChatRequest>>,
    ratings: Mutex<Vec<RateRequest>>,
    connections: Mutex<Vec<String>>,
    chat_status: Mutex<Option<StatusCode>>,
    stream_status: Mutex<Option<StatusCode>>,
    chat_id: String,
}

#[derive(Debug, Deserialize)]
struct StreamQuery {
    #[serde(rename = "connectionId", default)]
    connection_id: String,
}

impl Default for FakeChatServer {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeChatServer {
    pub fn new() -> Self {
        Self::with_chat_id("chat-1")
    }

    /// Server that acknowledges questions with the given chat id
    pub fn with_chat_id(chat_id: impl Into<String>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            inner: Arc::new(FakeInner {
                events: Mutex::new(events),
                answers: Mutex::new(VecDeque::new()),
                requests: Mutex::new(Vec::new()),
                ratings: Mutex::new(Vec::new()),
                connections: Mutex::new(Vec::new()),
                chat_status: Mutex::new(None),
                stream_status: Mutex::new(None),
                chat_id: chat_id.into(),
            }),
        }
    }

    /// Router serving the stream, chat and rating endpoints
    pub fn router(&self) -> Router {
        Router::new()
            .route(STREAM_PATH, get(stream_events))
            .route(DEFAULT_CHAT_PATH, post(chat))
            .route(RATE_PATH, post(rate))
            .with_state(self.clone())
    }

    // =========================================================================
    // Scripting
    // =========================================================================

    /// Queue a text answer for the next question, followed by the sentinel
    pub fn push_answer<I, S>(&self, fragments: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut events: Vec<ServerEvent> = fragments
            .into_iter()
            .map(|f| ServerEvent::chat(f.into()))
            .collect();
        events.push(ServerEvent::chat(SENTINEL));
        self.push_events(events);
    }

    /// Queue a tabular answer for the next question, followed by the sentinel
    pub fn push_table(&self, json: impl Into<String>) {
        self.push_events(vec![
            ServerEvent::new(EventKind::SqlTable, json.into()),
            ServerEvent::chat(SENTINEL),
        ]);
    }

    /// Queue arbitrary events for the next question
    pub fn push_events(&self, events: Vec<ServerEvent>) {
        self.inner.answers.lock().push_back(events);
    }

    /// Send an event to current subscribers right away
    ///
    /// Returns how many subscribers it reached.
    pub fn send_now(&self, event: ServerEvent) -> usize {
        self.inner.events.lock().send(event).unwrap_or(0)
    }

    /// Answer chat submissions with this status from now on
    pub fn fail_chat_with(&self, status: StatusCode) {
        *self.inner.chat_status.lock() = Some(status);
    }

    /// Refuse stream connections with this status from now on
    pub fn reject_streams_with(&self, status: StatusCode) {
        *self.inner.stream_status.lock() = Some(status);
    }

    /// Accept stream connections and chat submissions again
    pub fn recover(&self) {
        *self.inner.chat_status.lock() = None;
        *self.inner.stream_status.lock() = None;
    }

    /// End every open stream
    pub fn close_streams(&self) {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        *self.inner.events.lock() = events;
    }

    // =========================================================================
    // Inspection
    // =========================================================================

    pub fn subscriber_count(&self) -> usize {
        self.inner.events.lock().receiver_count()
    }

    /// Connection ids of every stream request so far
    pub fn connection_ids(&self) -> Vec<String> {
        self.inner.connections.lock().clone()
    }

    pub fn requests(&self) -> Vec<ChatRequest> {
        self.inner.requests.lock().clone()
    }

    pub fn ratings(&self) -> Vec<RateRequest> {
        self.inner.ratings.lock().clone()
    }
}

fn to_sse(event: ServerEvent) -> Event {
    let sse = Event::default().data(event.data);
    let sse = match event.kind {
        EventKind::Message => sse,
        kind => sse.event(kind.as_str()),
    };
    match event.id {
        Some(id) => sse.id(id),
        None => sse,
    }
}

async fn stream_events(
    State(fake): State<FakeChatServer>,
    Query(query): Query<StreamQuery>,
) -> Response {
    if let Some(status) = *fake.inner.stream_status.lock() {
        return (status, "stream unavailable").into_response();
    }

    debug!("Stream subscriber {}", query.connection_id);
    fake.inner.connections.lock().push(query.connection_id);
    let receiver = fake.inner.events.lock().subscribe();

    let stream = BroadcastStream::new(receiver)
        .filter_map(|result| result.ok().map(|event| Ok::<_, Infallible>(to_sse(event))));

    Sse::new(stream)
        .keep_alive(KeepAlive::default())
        .into_response()
}

async fn chat(State(fake): State<FakeChatServer>, Json(request): Json<ChatRequest>) -> Response {
    fake.inner.requests.lock().push(request);

    if let Some(status) = *fake.inner.chat_status.lock() {
        return (status, Json(json!({ "message": "chat backend unavailable" }))).into_response();
    }

    if let Some(events) = fake.inner.answers.lock().pop_front() {
        let sender = fake.inner.events.lock().clone();
        tokio::spawn(async move {
            let subscribed = wait_for(
                || {
                    let sender = sender.clone();
                    async move { sender.receiver_count() > 0 }
                },
                SUBSCRIBER_WAIT,
            )
            .await;
            if !subscribed {
                debug!("No stream subscriber, dropping scripted answer");
                return;
            }
            for event in events {
                let _ = sender.send(event);
            }
        });
    }

    Json(json!({ "status": "OK", "chatId": fake.inner.chat_id })).into_response()
}

async fn rate(State(fake): State<FakeChatServer>, Json(request): Json<RateRequest>) -> StatusCode {
    fake.inner.ratings.lock().push(request);
    StatusCode::OK
}
