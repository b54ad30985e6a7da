//! A single stream connection and its reader task

use std::sync::Arc;

use chat_core::{EventKind, ServerEvent};
use futures::StreamExt;
use parking_lot::Mutex;
use reqwest::Client;
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};
use url::Url;

use super::handler::StreamHandler;
use super::parser::SseParser;
use super::types::{ReadyState, StreamError};

/// Shared handle to a stream connection
///
/// Clones refer to the same connection. Closing through any clone stops
/// the reader task; no further callbacks are made afterwards.
#[derive(Clone)]
pub struct ConnectionHandle {
    inner: Arc<ConnectionInner>,
}

struct ConnectionInner {
    url: Url,
    state: Mutex<ReadyState>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl std::fmt::Debug for ConnectionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionHandle")
            .field("url", &self.inner.url.as_str())
            .field("state", &self.ready_state())
            .finish()
    }
}

impl ConnectionHandle {
    /// Start connecting to `url` in a background task
    pub(crate) fn spawn<H: StreamHandler>(client: Client, url: Url, handler: H) -> Self {
        let handle = Self {
            inner: Arc::new(ConnectionInner {
                url,
                state: Mutex::new(ReadyState::Connecting),
                task: Mutex::new(None),
            }),
        };

        let task = tokio::spawn(read_stream(handle.clone(), client, handler));
        *handle.inner.task.lock() = Some(task);
        handle
    }

    pub fn url(&self) -> &Url {
        &self.inner.url
    }

    pub fn ready_state(&self) -> ReadyState {
        *self.inner.state.lock()
    }

    pub fn is_closed(&self) -> bool {
        self.ready_state() == ReadyState::Closed
    }

    /// Whether two handles refer to the same connection
    pub fn ptr_eq(&self, other: &ConnectionHandle) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Close the connection; idempotent
    pub fn close(&self) {
        {
            let mut state = self.inner.state.lock();
            if *state == ReadyState::Closed {
                return;
            }
            *state = ReadyState::Closed;
        }
        debug!("Closing stream {}", self.inner.url);
        if let Some(task) = self.inner.task.lock().take() {
            task.abort();
        }
    }

    /// Mark open unless closed while connecting
    fn mark_open(&self) -> bool {
        let mut state = self.inner.state.lock();
        if *state == ReadyState::Connecting {
            *state = ReadyState::Open;
            true
        } else {
            false
        }
    }
}

async fn read_stream<H: StreamHandler>(handle: ConnectionHandle, client: Client, mut handler: H) {
    debug!("Connecting to SSE stream: {}", handle.url());

    let response = match client
        .get(handle.url().clone())
        .header(reqwest::header::ACCEPT, "text/event-stream")
        .send()
        .await
    {
        Ok(response) => response,
        Err(e) => return fail(&handle, &mut handler, StreamError::Connection(e)),
    };

    if !response.status().is_success() {
        let status = response.status().as_u16();
        let message = response.text().await.unwrap_or_default();
        return fail(&handle, &mut handler, StreamError::Server { status, message });
    }

    if !handle.mark_open() {
        return;
    }
    debug!("SSE connection opened");
    handler.on_open(&handle);

    let mut parser = SseParser::new();
    let mut body = response.bytes_stream();

    while let Some(chunk) = body.next().await {
        let bytes = match chunk {
            Ok(bytes) => bytes,
            Err(e) => return fail(&handle, &mut handler, StreamError::Connection(e)),
        };

        for result in parser.feed(bytes) {
            if handle.is_closed() {
                return;
            }
            match result {
                Ok(event) => dispatch(&mut handler, event),
                Err(e) => warn!("Skipping malformed SSE line: {}", e),
            }
        }
    }

    fail(&handle, &mut handler, StreamError::Closed);
}

fn dispatch<H: StreamHandler>(handler: &mut H, event: ServerEvent) {
    match &event.kind {
        EventKind::Message => debug!("onmessage SSE event received: {}", event.data),
        EventKind::ChatResponse | EventKind::SqlTable => {
            trace!("SSE event [{}] received", event.kind);
            handler.on_event(event);
        }
        EventKind::Other(name) => trace!("No listener for SSE event [{}]", name),
    }
}

fn fail<H: StreamHandler>(handle: &ConnectionHandle, handler: &mut H, err: StreamError) {
    if handle.is_closed() {
        return;
    }
    handler.on_error(handle, &err);
}
