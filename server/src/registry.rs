//! Server-side bookkeeping of live transport connections.
//!
//! Each accepted connection gets one [`ConnectionEntry`] tying the transport
//! handle to the player id derived from it. The registry does not own the
//! transport: liveness is passed in as a predicate so the session loop stays
//! the only place that touches sockets.
//!
//! Dead entries are removed by [`ConnectionRegistry::sweep`], never flagged,
//! so a player id is handed to the disconnect path exactly once.

use log::{info, warn};
use shared::ConnectionId;

#[derive(Debug, Clone, PartialEq)]
pub struct ConnectionEntry {
    pub handle: ConnectionId,
    pub player_id: String,
}

impl ConnectionEntry {
    /// Player ids are the transport's own connection id, stringified. The
    /// transport never hands out the same id twice while one is live.
    pub fn new(handle: ConnectionId) -> Self {
        Self {
            handle,
            player_id: handle.to_string(),
        }
    }
}

#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    entries: Vec<ConnectionEntry>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a freshly accepted connection and returns its player id.
    ///
    /// Returns `None` if the handle is already registered.
    pub fn register(&mut self, handle: ConnectionId) -> Option<String> {
        if self.contains(handle) {
            warn!("Connection {} is already registered", handle);
            return None;
        }

        let entry = ConnectionEntry::new(handle);
        let player_id = entry.player_id.clone();
        info!("Accepted connection {}, player id {}", handle, player_id);
        self.entries.push(entry);
        Some(player_id)
    }

    /// Removes every entry whose handle is no longer live and returns them.
    pub fn sweep<F>(&mut self, is_live: F) -> Vec<ConnectionEntry>
    where
        F: Fn(ConnectionId) -> bool,
    {
        let mut dead = Vec::new();
        self.entries.retain(|entry| {
            if is_live(entry.handle) {
                true
            } else {
                dead.push(entry.clone());
                false
            }
        });

        for entry in &dead {
            info!(
                "Connection {} (player {}) is gone",
                entry.handle, entry.player_id
            );
        }
        dead
    }

    /// Calls `f` for each entry whose handle is currently live.
    pub fn for_each_live<L, F>(&self, is_live: L, mut f: F)
    where
        L: Fn(ConnectionId) -> bool,
        F: FnMut(&ConnectionEntry),
    {
        for entry in self.entries.iter().filter(|e| is_live(e.handle)) {
            f(entry);
        }
    }

    /// Handles of live entries, in registration order.
    pub fn live_handles<L>(&self, is_live: L) -> Vec<ConnectionId>
    where
        L: Fn(ConnectionId) -> bool,
    {
        let mut handles = Vec::with_capacity(self.entries.len());
        self.for_each_live(is_live, |entry| handles.push(entry.handle));
        handles
    }

    /// All registered handles, live or not.
    pub fn handles(&self) -> Vec<ConnectionId> {
        self.entries.iter().map(|e| e.handle).collect()
    }

    pub fn player_id(&self, handle: ConnectionId) -> Option<&str> {
        self.entries
            .iter()
            .find(|e| e.handle == handle)
            .map(|e| e.player_id.as_str())
    }

    pub fn find_by_player(&self, player_id: &str) -> Option<ConnectionId> {
        self.entries
            .iter()
            .find(|e| e.player_id == player_id)
            .map(|e| e.handle)
    }

    pub fn contains(&self, handle: ConnectionId) -> bool {
        self.entries.iter().any(|e| e.handle == handle)
    }

    /// Drops every entry, returning them.
    pub fn clear(&mut self) -> Vec<ConnectionEntry> {
        std::mem::take(&mut self.entries)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
