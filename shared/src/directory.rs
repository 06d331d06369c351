//! Player directory: id -> replicated state, in insertion order.
//!
//! The server owns the authoritative copy; each client keeps one as a cache
//! reconciled from join/leave/snapshot messages. Insertion order is kept so
//! snapshots list players deterministically (oldest connection first).

use crate::{PlayerState, Rgb, Vec3};
use log::debug;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DirectoryError {
    #[error("unknown player reference: {0:?}")]
    UnknownPlayer(String),
}

#[derive(Debug, Clone, Default)]
pub struct PlayerDirectory {
    players: Vec<PlayerState>,
}

impl PlayerDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the entry with the same id, or appends a new one.
    ///
    /// Returns true if the id was not present before.
    pub fn upsert(&mut self, player: PlayerState) -> bool {
        match self.index_of(&player.id) {
            Some(index) => {
                self.players[index] = player;
                false
            }
            None => {
                debug!("Directory added player {}", player.id);
                self.players.push(player);
                true
            }
        }
    }

    /// Removes and returns the entry. Absent ids are a no-op.
    pub fn remove(&mut self, id: &str) -> Option<PlayerState> {
        let index = self.index_of(id)?;
        debug!("Directory removed player {}", id);
        Some(self.players.remove(index))
    }

    pub fn lookup(&self, id: &str) -> Option<&PlayerState> {
        self.players.iter().find(|p| p.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index_of(id).is_some()
    }

    /// Overwrites position and colour of an existing entry.
    pub fn update_existing(&mut self, player: &PlayerState) -> Result<(), DirectoryError> {
        let entry = self.entry_mut(&player.id)?;
        entry.position = player.position;
        entry.color = player.color;
        Ok(())
    }

    pub fn set_position(&mut self, id: &str, position: Vec3) -> Result<(), DirectoryError> {
        self.entry_mut(id)?.position = position;
        Ok(())
    }

    pub fn set_color(&mut self, id: &str, color: Rgb) -> Result<(), DirectoryError> {
        self.entry_mut(id)?.color = color;
        Ok(())
    }

    /// Full roster in insertion order.
    pub fn snapshot(&self) -> Vec<PlayerState> {
        self.players.clone()
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.players.iter().map(|p| p.id.as_str())
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    pub fn clear(&mut self) -> Vec<PlayerState> {
        std::mem::take(&mut self.players)
    }

    fn index_of(&self, id: &str) -> Option<usize> {
        self.players.iter().position(|p| p.id == id)
    }

    fn entry_mut(&mut self, id: &str) -> Result<&mut PlayerState, DirectoryError> {
        self.players
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| DirectoryError::UnknownPlayer(id.to_string()))
    }
}
