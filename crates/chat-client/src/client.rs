//! Chat server HTTP client

use std::time::Duration;

use reqwest::{Client, StatusCode};
use tokio::task::JoinHandle;
use tracing::{debug, instrument, warn};
use url::Url;

use crate::error::{ChatClientError, Result};
use crate::types::*;

/// Default request timeout
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
/// Default connection timeout
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Path of the event stream endpoint
pub const STREAM_PATH: &str = "/sse2";
/// Path of the rating endpoint
pub const RATE_PATH: &str = "/api/v1/rate";

/// Chat server client
///
/// Posts questions and ratings; the event stream itself is opened through
/// [`StreamConsumer`](crate::StreamConsumer) with the URL from
/// [`ChatClient::stream_url`].
#[derive(Debug, Clone)]
pub struct ChatClient {
    client: Client,
    stream_client: Client,
    base_url: Url,
}

impl ChatClient {
    /// Create a new chat client
    ///
    /// # Arguments
    /// * `base_url` - Base URL of the chat server (e.g., "http://localhost:8080")
    pub fn new(base_url: &str) -> Result<Self> {
        Self::with_config(base_url, DEFAULT_TIMEOUT, DEFAULT_CONNECT_TIMEOUT)
    }

    /// Create a new chat client with custom timeouts
    ///
    /// `timeout` bounds plain requests only; the event stream is opened
    /// with a client that has no overall timeout.
    pub fn with_config(
        base_url: &str,
        timeout: Duration,
        connect_timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(connect_timeout)
            .build()?;
        let stream_client = Client::builder()
            .connect_timeout(connect_timeout)
            .build()?;

        let base_url = Url::parse(base_url)?;

        Ok(Self {
            client,
            stream_client,
            base_url,
        })
    }

    /// Get the base URL
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Get a reference to the underlying HTTP client
    pub fn http_client(&self) -> &Client {
        &self.client
    }

    /// HTTP client for long-lived streams; it has no overall timeout
    pub fn stream_http_client(&self) -> &Client {
        &self.stream_client
    }

    /// Event stream URL for a tab's connection id
    pub fn stream_url(&self, connection_id: &str) -> Result<Url> {
        let mut url = self.base_url.join(STREAM_PATH)?;
        url.query_pairs_mut()
            .append_pair("connectionId", connection_id);
        Ok(url)
    }

    // =========================================================================
    // Chat
    // =========================================================================

    /// Submit a question
    ///
    /// The answer streams back over the event stream. A success response
    /// whose body is not JSON is accepted as an empty acknowledgement.
    #[instrument(skip(self, request))]
    pub async fn send_message(&self, path: &str, request: &ChatRequest) -> Result<ChatAck> {
        let url = self.base_url.join(path)?;
        debug!("Posting chat message to {}", url);

        let response = self.client.post(url).json(request).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(self.extract_error_from_status(response, status).await);
        }

        let body = response.text().await?;
        match serde_json::from_str::<ChatAck>(&body) {
            Ok(ack) => Ok(ack),
            Err(_) => {
                debug!("Chat response was not JSON, ignoring body");
                Ok(ChatAck::default())
            }
        }
    }

    // =========================================================================
    // Ratings
    // =========================================================================

    /// Submit a rating for an assistant answer
    #[instrument(skip(self), fields(idx = request.chat_idx))]
    pub async fn rate(&self, request: &RateRequest) -> Result<()> {
        let url = self.base_url.join(RATE_PATH)?;
        let response = self.client.post(url).json(request).send().await?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(self.extract_error(response).await)
        }
    }

    /// Submit a rating without waiting for the outcome
    pub fn rate_detached(&self, request: RateRequest) -> JoinHandle<()> {
        let client = self.clone();
        tokio::spawn(async move {
            if let Err(e) = client.rate(&request).await {
                warn!("Rating submission failed: {}", e);
            }
        })
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    /// Extract error from failed response
    async fn extract_error(&self, response: reqwest::Response) -> ChatClientError {
        let status = response.status();
        self.extract_error_from_status(response, status).await
    }

    async fn extract_error_from_status(
        &self,
        response: reqwest::Response,
        status: StatusCode,
    ) -> ChatClientError {
        let message = match response.json::<ErrorResponse>().await {
            Ok(err) => err.message,
            Err(_) => format!("HTTP {}", status),
        };
        ChatClientError::server_error(status.as_u16(), message)
    }
}
