//! At-most-one stream connection per tab

use std::sync::Arc;
use std::time::Duration;

use chat_core::storage::{self, SessionStore};
use reqwest::Client;
use tracing::{debug, info};
use url::Url;

use super::connection::ConnectionHandle;
use super::handler::StreamHandler;
use super::types::ReadyState;

const DEFAULT_LIVENESS_DELAY: Duration = Duration::from_secs(5);

/// Owns the tab's single event stream connection
pub struct StreamConsumer {
    client: Client,
    local: Arc<dyn SessionStore>,
    current: Option<ConnectionHandle>,
    liveness_delay: Duration,
}

impl StreamConsumer {
    /// Create a consumer
    ///
    /// `client` should have no overall request timeout. `local` is the store
    /// shared by every tab and receives the advisory `sse-active` flag.
    pub fn new(client: Client, local: Arc<dyn SessionStore>) -> Self {
        Self {
            client,
            local,
            current: None,
            liveness_delay: DEFAULT_LIVENESS_DELAY,
        }
    }

    pub fn with_liveness_delay(mut self, delay: Duration) -> Self {
        self.liveness_delay = delay;
        self
    }

    /// The current connection, if one was ever opened
    pub fn current(&self) -> Option<&ConnectionHandle> {
        self.current.as_ref()
    }

    /// Whether a connection exists that has not been closed
    pub fn is_live(&self) -> bool {
        self.current.as_ref().is_some_and(|c| !c.is_closed())
    }

    /// Open the stream unless one is already live
    ///
    /// While the current connection is connecting or open this returns it
    /// unchanged and `handler` is dropped.
    pub fn open<H: StreamHandler>(&mut self, url: Url, handler: H) -> ConnectionHandle {
        if let Some(current) = &self.current {
            if !current.is_closed() {
                debug!("Reusing SSE connection: {}", current.ready_state().describe());
                return current.clone();
            }
        }

        info!("Opening SSE connection to {}", url);
        let handle = ConnectionHandle::spawn(self.client.clone(), url, handler);
        info!("SSE connection status: {}", handle.ready_state().describe());
        storage::set_stream_active(self.local.as_ref(), true);

        let watched = handle.clone();
        let delay = self.liveness_delay;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let state = watched.ready_state();
            if state == ReadyState::Open {
                debug!("SSE connection status after {:?}: {}", delay, state.describe());
            } else {
                info!("SSE connection status after {:?}: {}", delay, state.describe());
            }
        });

        self.current = Some(handle.clone());
        handle
    }

    /// Close the current connection, if any
    pub fn close(&mut self) {
        if let Some(current) = &self.current {
            current.close();
        }
    }

    /// Tear down on tab unload
    pub fn unload(&mut self) {
        self.close();
        storage::set_stream_active(self.local.as_ref(), false);
        debug!("Stream consumer unloaded");
    }
}

impl Drop for StreamConsumer {
    fn drop(&mut self) {
        self.close();
    }
}
