//! Cross-tab broadcast channel
//!
//! Tabs can post messages to each other. Receipt is logged and nothing
//! else; no tab acts on what it hears.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{debug, info};

use crate::storage::{keys, random_id, SessionStore};

const DEFAULT_CAPACITY: usize = 64;
const SENDER_ID_LEN: usize = 9;

/// A message posted between tabs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BroadcastMessage {
    pub id: String,
    pub sender_id: String,
    pub message: String,
}

/// Shared channel all tabs of an origin join
#[derive(Debug, Clone)]
pub struct BroadcastHub {
    tx: broadcast::Sender<BroadcastMessage>,
}

impl Default for BroadcastHub {
    fn default() -> Self {
        Self::new()
    }
}

impl BroadcastHub {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(DEFAULT_CAPACITY);
        Self { tx }
    }

    /// Join the channel as the tab owning `session`
    pub fn join(&self, session: &dyn SessionStore) -> TabChannel {
        let sender_id = match session.get(keys::SENDER_ID) {
            Some(id) => id,
            None => {
                let id = format!("_{}", random_id(SENDER_ID_LEN));
                session.set(keys::SENDER_ID, &id);
                id
            }
        };
        TabChannel {
            sender_id,
            tx: self.tx.clone(),
            rx: self.tx.subscribe(),
        }
    }
}

/// One tab's endpoint on the broadcast channel
#[derive(Debug)]
pub struct TabChannel {
    sender_id: String,
    tx: broadcast::Sender<BroadcastMessage>,
    rx: broadcast::Receiver<BroadcastMessage>,
}

impl TabChannel {
    pub fn sender_id(&self) -> &str {
        &self.sender_id
    }

    /// Post a message to the other tabs
    pub fn post(&self, message: impl Into<String>) -> BroadcastMessage {
        let msg = BroadcastMessage {
            id: format!("_{}", random_id(SENDER_ID_LEN)),
            sender_id: self.sender_id.clone(),
            message: message.into(),
        };
        debug!("Send broadcast message: {:?}", msg);
        // no receivers is fine
        let _ = self.tx.send(msg.clone());
        msg
    }

    /// Next message from another tab, if one is waiting
    pub fn try_recv(&mut self) -> Option<BroadcastMessage> {
        loop {
            match self.rx.try_recv() {
                Ok(msg) if msg.sender_id == self.sender_id => continue,
                Ok(msg) => return Some(msg),
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    debug!("Broadcast receiver lagged by {} messages", n);
                    continue;
                }
                Err(_) => return None,
            }
        }
    }

    /// Log incoming messages until every other endpoint is gone
    pub async fn listen(self) {
        let TabChannel {
            sender_id,
            tx,
            mut rx,
        } = self;
        drop(tx);
        loop {
            match rx.recv().await {
                Ok(msg) if msg.sender_id == sender_id => {}
                Ok(msg) => info!("Receive broadcast message: {:?}", msg),
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    debug!("Broadcast receiver lagged by {} messages", n)
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    }
}
