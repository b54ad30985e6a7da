//! Ephemeral key-value state for a tab
//!
//! Two stores exist per tab: a session store private to the tab and a local
//! store shared by every tab of the same origin. Everything kept here is
//! advisory UX state; the stream protocol does not depend on it.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

/// Well-known storage keys
pub mod keys {
    /// Per-tab connection identifier (session store)
    pub const CONNECTION_ID: &str = "connectionId";
    /// Number of open tabs (local store)
    pub const TOTAL_TABS: &str = "total-tabs";
    /// Ordinal of this tab (session store)
    pub const CURRENT_TAB_INDEX: &str = "current-tab-index";
    /// Whether some tab has a live stream (local store)
    pub const SSE_ACTIVE: &str = "sse-active";
    /// Broadcast sender id of this tab (session store)
    pub const SENDER_ID: &str = "_sender_id_";

    /// Click counter key for a UI element (local store)
    pub fn click(element: &str) -> String {
        format!("click_{}", element)
    }
}

const CONNECTION_ID_LEN: usize = 16;

/// String key-value storage
pub trait SessionStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str);
    fn remove(&self, key: &str);
}

/// In-memory store; clones share the same entries
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: Arc<RwLock<HashMap<String, String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl SessionStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.read().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) {
        self.entries.write().insert(key.to_string(), value.to_string());
    }

    fn remove(&self, key: &str) {
        self.entries.write().remove(key);
    }
}

fn get_u64(store: &dyn SessionStore, key: &str) -> u64 {
    store.get(key).and_then(|v| v.parse().ok()).unwrap_or(0)
}

/// Random lowercase alphanumeric id of the given length (at most 32)
pub(crate) fn random_id(len: usize) -> String {
    let mut id = Uuid::new_v4().simple().to_string();
    id.truncate(len);
    id
}

/// The tab's connection id, minted and persisted on first use
pub fn connection_id(session: &dyn SessionStore) -> String {
    if let Some(id) = session.get(keys::CONNECTION_ID) {
        return id;
    }
    let id = random_id(CONNECTION_ID_LEN);
    session.set(keys::CONNECTION_ID, &id);
    debug!("Minted connection id {}", id);
    id
}

/// Increment and return the click counter for a UI element
pub fn count_click(local: &dyn SessionStore, element: &str) -> u64 {
    let key = keys::click(element);
    let count = get_u64(local, &key) + 1;
    local.set(&key, &count.to_string());
    debug!("Click count for {}: {} times", element, count);
    count
}

/// Set the shared advisory stream flag
pub fn set_stream_active(local: &dyn SessionStore, active: bool) {
    local.set(keys::SSE_ACTIVE, if active { "true" } else { "false" });
}

pub fn is_stream_active(local: &dyn SessionStore) -> bool {
    local.get(keys::SSE_ACTIVE).as_deref() == Some("true")
}

/// Tracks how many tabs are open and which ordinal this tab holds
pub struct TabRegistry<'a> {
    local: &'a dyn SessionStore,
    session: &'a dyn SessionStore,
}

impl<'a> TabRegistry<'a> {
    pub fn new(local: &'a dyn SessionStore, session: &'a dyn SessionStore) -> Self {
        Self { local, session }
    }

    /// Register this tab; returns its ordinal
    pub fn open(&self) -> u64 {
        let index = get_u64(self.local, keys::TOTAL_TABS) + 1;
        self.local.set(keys::TOTAL_TABS, &index.to_string());
        self.session
            .set(keys::CURRENT_TAB_INDEX, &index.to_string());
        info!("Tab opened with index: {}", index);
        index
    }

    /// Unregister this tab; returns the remaining tab count
    pub fn close(&self) -> u64 {
        let mut total = get_u64(self.local, keys::TOTAL_TABS);
        if total > 0 {
            total -= 1;
            self.local.set(keys::TOTAL_TABS, &total.to_string());
        }
        self.session.remove(keys::CURRENT_TAB_INDEX);
        info!("Tab closed. Remaining tabs: {}", total);
        total
    }

    pub fn total(&self) -> u64 {
        get_u64(self.local, keys::TOTAL_TABS)
    }

    pub fn current_index(&self) -> Option<u64> {
        self.session
            .get(keys::CURRENT_TAB_INDEX)
            .and_then(|v| v.parse().ok())
    }
}
