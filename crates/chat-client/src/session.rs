//! Per-tab chat controller
//!
//! A [`StreamSession`] owns everything a chat tab mutates: the transcript,
//! the reveal renderer, the stream connection slot and the chat id. The
//! connection task only forwards events over a channel; the session applies
//! them one at a time.

use std::future::Future;
use std::sync::Arc;

use chat_core::storage::{self, MemoryStore, TabRegistry};
use chat_core::{
    BroadcastHub, FragmentOutcome, Rating, ServerEvent, TabChannel, Transcript, TranscriptError,
    TurnId, TypingRenderer,
};
use chrono::Utc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Interval, MissedTickBehavior};
use tracing::{debug, info, instrument, warn};

use crate::client::ChatClient;
use crate::config::SessionConfig;
use crate::error::{ChatClientError, Result};
use crate::streaming::{ChannelHandler, ConnectionHandle, StreamConsumer, StreamMessage};
use crate::types::{ChatRequest, RateRequest};

/// Element name the send action is counted under
const SEND_BUTTON: &str = "btnChatSend";

enum Step {
    Message(Option<StreamMessage>),
    Tick,
    NoticeExpired,
    Shutdown,
}

/// Chat controller for one tab
pub struct StreamSession {
    client: ChatClient,
    config: SessionConfig,
    transcript: Transcript,
    renderer: TypingRenderer,
    consumer: StreamConsumer,
    session_store: MemoryStore,
    local_store: MemoryStore,
    chat_id: Option<String>,
    events_tx: mpsc::UnboundedSender<StreamMessage>,
    events_rx: mpsc::UnboundedReceiver<StreamMessage>,
    stream_failure: Option<String>,
    broadcast: Option<JoinHandle<()>>,
    tab_open: bool,
}

impl StreamSession {
    /// Create a session with fresh stores
    pub fn new(client: ChatClient, config: SessionConfig) -> Self {
        Self::with_stores(client, config, MemoryStore::new(), MemoryStore::new())
    }

    /// Create a session over existing stores
    ///
    /// `session_store` is private to the tab; `local_store` is shared with
    /// other tabs of the same origin.
    pub fn with_stores(
        client: ChatClient,
        config: SessionConfig,
        session_store: MemoryStore,
        local_store: MemoryStore,
    ) -> Self {
        let consumer = StreamConsumer::new(
            client.stream_http_client().clone(),
            Arc::new(local_store.clone()),
        )
        .with_liveness_delay(config.liveness_delay);

        let tab = TabRegistry::new(&local_store, &session_store).open();
        debug!("Tab {} opened on route {}", tab, config.route);

        let (events_tx, events_rx) = mpsc::unbounded_channel();

        Self {
            client,
            transcript: Transcript::new().with_notice_ttl(config.notice_ttl),
            renderer: TypingRenderer::new(config.strategy()),
            config,
            consumer,
            session_store,
            local_store,
            chat_id: None,
            events_tx,
            events_rx,
            stream_failure: None,
            broadcast: None,
            tab_open: true,
        }
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn renderer(&self) -> &TypingRenderer {
        &self.renderer
    }

    pub fn client(&self) -> &ChatClient {
        &self.client
    }

    /// Server-side conversation id, once assigned
    pub fn chat_id(&self) -> Option<&str> {
        self.chat_id.as_deref()
    }

    /// The current stream connection, if one was opened
    pub fn connection(&self) -> Option<&ConnectionHandle> {
        self.consumer.current()
    }

    /// This tab's connection id, minted on first use
    pub fn connection_id(&self) -> String {
        storage::connection_id(&self.session_store)
    }

    pub fn session_store(&self) -> &MemoryStore {
        &self.session_store
    }

    pub fn local_store(&self) -> &MemoryStore {
        &self.local_store
    }

    /// Whether nothing is in flight: no open assistant turn and no animation
    pub fn is_idle(&self) -> bool {
        !self.renderer.is_animating() && !self.awaiting_answer()
    }

    fn awaiting_answer(&self) -> bool {
        matches!(self.transcript.last(), Some(t) if t.is_assistant() && !t.is_sealed())
    }

    // =========================================================================
    // Stream
    // =========================================================================

    /// Open the event stream unless it is already live
    pub fn open_stream(&mut self) -> Result<ConnectionHandle> {
        let url = self.client.stream_url(&self.connection_id())?;
        if !self.consumer.is_live() {
            self.stream_failure = None;
        }
        Ok(self
            .consumer
            .open(url, ChannelHandler::new(self.events_tx.clone())))
    }

    /// Join the cross-tab channel
    ///
    /// Incoming messages are logged by a background listener. The returned
    /// endpoint posts under this tab's sender id.
    pub fn join_broadcast(&mut self, hub: &BroadcastHub) -> TabChannel {
        let listener = hub.join(&self.session_store);
        if let Some(previous) = self.broadcast.replace(tokio::spawn(listener.listen())) {
            previous.abort();
        }
        hub.join(&self.session_store)
    }

    /// Apply one message from the connection task
    pub fn handle_message(&mut self, msg: StreamMessage) {
        match msg {
            StreamMessage::Opened => debug!("SSE connection opened"),
            StreamMessage::Event(event) => {
                self.handle_event(event);
            }
            StreamMessage::Failed(reason) => {
                warn!("Event stream closed: {}", reason);
                self.stream_failure = Some(reason);
            }
        }
    }

    /// Apply every message already waiting, without blocking
    pub fn process_pending(&mut self) -> usize {
        let mut handled = 0;
        while let Ok(msg) = self.events_rx.try_recv() {
            self.handle_message(msg);
            handled += 1;
        }
        handled
    }

    /// Hand a content event to the renderer
    pub fn handle_event(&mut self, event: ServerEvent) -> FragmentOutcome {
        debug!(kind = %event.kind, "Handling stream event");
        let outcome = self.renderer.push(&mut self.transcript, &event.data);
        if outcome == FragmentOutcome::Finalized {
            info!("Answer complete");
        }
        outcome
    }

    /// Advance the typing animation by one step
    pub fn tick(&mut self) -> bool {
        self.renderer.tick(&mut self.transcript)
    }

    // =========================================================================
    // Chat
    // =========================================================================

    /// Send a question
    ///
    /// Opens the stream, adds the user turn and an assistant placeholder,
    /// then posts the question. On failure the placeholder is removed and
    /// an error notice is raised. Returns the placeholder's id.
    #[instrument(skip(self, text))]
    pub async fn submit(&mut self, text: &str) -> Result<TurnId> {
        let text = text.trim();
        if text.is_empty() {
            return Err(ChatClientError::EmptyMessage);
        }

        self.open_stream()?;
        let clicks = storage::count_click(&self.local_store, SEND_BUTTON);
        debug!("Click count for {}: {} times", SEND_BUTTON, clicks);

        self.transcript.push_user(text);
        let pending = self.transcript.begin_assistant();

        let request = ChatRequest::new(text).with_chat_id(self.chat_id.clone());
        match self
            .client
            .send_message(&self.config.chat_path, &request)
            .await
        {
            Ok(ack) => {
                if !ack.is_ok() {
                    debug!("Chat acknowledged with status {:?}", ack.status);
                }
                if ack.chat_id.is_some() {
                    self.chat_id = ack.chat_id;
                }
                Ok(pending)
            }
            Err(e) => {
                self.transcript
                    .fail_pending(e.status().unwrap_or(0), Utc::now());
                Err(e)
            }
        }
    }

    /// Rate the assistant answer at `ordinal` (counting from 1)
    pub fn rate(&mut self, ordinal: usize, score: u8) -> Result<JoinHandle<()>> {
        let id = self
            .transcript
            .assistant_by_ordinal(ordinal)
            .map(|t| t.id())
            .ok_or(TranscriptError::OrdinalOutOfRange(ordinal))?;
        self.rate_turn(id, Rating::try_from(score)?)
    }

    /// Rate an assistant answer by id
    ///
    /// The annotation is recorded locally and the submission runs in the
    /// background.
    pub fn rate_turn(&mut self, id: TurnId, rating: Rating) -> Result<JoinHandle<()>> {
        self.transcript.rate(id, rating)?;
        let chat_idx = self
            .transcript
            .ordinal_of(id)
            .ok_or(TranscriptError::TurnNotFound(id))?;

        let request = RateRequest {
            chat_id: self.chat_id.clone().unwrap_or_default(),
            chat_rating: rating,
            chat_idx,
            turn_id: Some(id),
        };
        Ok(self.client.rate_detached(request))
    }

    // =========================================================================
    // Event loop
    // =========================================================================

    /// Process events until the current answer is complete
    ///
    /// Fails if the stream closes while an answer is still expected. Any
    /// running animation is finished first.
    pub async fn run_until_idle(&mut self) -> Result<()> {
        let mut ticker = self.ticker();
        loop {
            if self.is_idle() {
                return Ok(());
            }
            if !self.renderer.is_animating() {
                if let Some(reason) = &self.stream_failure {
                    return Err(ChatClientError::StreamError(reason.clone()));
                }
            }

            match self.next_step(&mut ticker, std::future::pending()).await {
                Step::Message(Some(msg)) => self.handle_message(msg),
                Step::Message(None) | Step::Shutdown => return Ok(()),
                Step::Tick => {
                    self.tick();
                }
                Step::NoticeExpired => {
                    self.transcript.prune_notices(Utc::now());
                }
            }
        }
    }

    /// Process events until `shutdown` resolves, then unload
    pub async fn run<F>(&mut self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        let mut ticker = self.ticker();
        tokio::pin!(shutdown);
        loop {
            match self.next_step(&mut ticker, &mut shutdown).await {
                Step::Message(Some(msg)) => self.handle_message(msg),
                Step::Message(None) | Step::Shutdown => break,
                Step::Tick => {
                    self.tick();
                }
                Step::NoticeExpired => {
                    let pruned = self.transcript.prune_notices(Utc::now());
                    debug!("Dismissed {} notice(s)", pruned);
                }
            }
        }
        self.unload();
    }

    fn ticker(&self) -> Interval {
        let mut ticker = tokio::time::interval(self.config.typing_period());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker
    }

    async fn next_step<F>(&mut self, ticker: &mut Interval, shutdown: F) -> Step
    where
        F: Future<Output = ()>,
    {
        let animating = self.renderer.is_animating();
        let notice_wait = self
            .transcript
            .next_notice_expiry()
            .map(|at| (at - Utc::now()).to_std().unwrap_or_default());

        tokio::select! {
            msg = self.events_rx.recv() => Step::Message(msg),
            _ = ticker.tick(), if animating => Step::Tick,
            _ = tokio::time::sleep(notice_wait.unwrap_or_default()), if notice_wait.is_some() => {
                Step::NoticeExpired
            }
            _ = shutdown => Step::Shutdown,
        }
    }

    /// Tear down on tab close
    pub fn unload(&mut self) {
        self.consumer.unload();
        if std::mem::take(&mut self.tab_open) {
            let remaining = TabRegistry::new(&self.local_store, &self.session_store).close();
            debug!("Tab closed, {} remaining", remaining);
        }
        if let Some(listener) = self.broadcast.take() {
            listener.abort();
        }
    }
}
