//! Client-side replica of the player list.
//!
//! [`ClientWorld`] reconciles the local [`PlayerDirectory`] with what the
//! server announces and mirrors every change to the presentation layer. Its
//! membership is only what the server has told us so far; it is eventually
//! consistent, never authoritative.

use crate::presentation::Presentation;
use log::debug;
use shared::{PlayerDirectory, PlayerState, Vec3};

#[derive(Debug, Default)]
pub struct ClientWorld {
    directory: PlayerDirectory,
    /// Identity assigned by the server's handshake.
    own_id: Option<String>,
    /// Id of the entity driven by local input, once it exists.
    local_id: Option<String>,
}

impl ClientWorld {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_own_id(&mut self, id: String) {
        if self.own_id.as_deref() != Some(id.as_str()) {
            debug!("Own player id is now {}", id);
        }
        self.own_id = Some(id);
    }

    pub fn own_id(&self) -> Option<&str> {
        self.own_id.as_deref()
    }

    pub fn local_player(&self) -> Option<&PlayerState> {
        self.directory.lookup(self.local_id.as_deref()?)
    }

    pub fn directory(&self) -> &PlayerDirectory {
        &self.directory
    }

    /// Creates an entity for a newly announced player. Returns false if one
    /// already exists for that id.
    pub fn apply_joined<P: Presentation>(&mut self, player: PlayerState, presentation: &mut P) -> bool {
        if self.directory.contains(&player.id) {
            debug!("Player {} already present, join ignored", player.id);
            return false;
        }

        let is_local = self.own_id.as_deref() == Some(player.id.as_str());
        if is_local {
            self.local_id = Some(player.id.clone());
        }

        presentation.on_entity_create(&player.id, player.position, player.color, is_local);
        self.directory.upsert(player);
        true
    }

    /// Destroys the entity for `id`. Returns false if there was none.
    pub fn apply_left<P: Presentation>(&mut self, id: &str, presentation: &mut P) -> bool {
        if self.directory.remove(id).is_none() {
            debug!("Player {} not present, leave ignored", id);
            return false;
        }

        if self.local_id.as_deref() == Some(id) {
            self.local_id = None;
        }
        presentation.on_entity_destroy(id);
        true
    }

    /// Moves every known entity to its snapshot position. Players without a
    /// local entity are skipped, and colours are left untouched.
    pub fn apply_snapshot<P: Presentation>(&mut self, players: &[PlayerState], presentation: &mut P) {
        for player in players {
            if self.directory.set_position(&player.id, player.position).is_ok() {
                presentation.on_entity_update_position(&player.id, player.position);
            }
        }
    }

    /// Applies one sample of local input to the locally controlled entity and
    /// returns its new state, or `None` if there is no such entity yet.
    pub fn advance_local<P: Presentation>(&mut self, presentation: &mut P) -> Option<PlayerState> {
        let id = self.local_id.clone()?;
        let current = self.directory.lookup(&id)?.position;

        let delta = presentation.read_local_input_delta();
        let color = presentation.read_local_color();

        let position = current + delta;
        self.directory.set_position(&id, position).ok()?;
        self.directory.set_color(&id, color).ok()?;
        if delta != Vec3::ZERO {
            presentation.on_entity_update_position(&id, position);
        }

        self.directory.lookup(&id).cloned()
    }

    /// Forgets the connection identity. Entities are kept.
    pub fn reset_identity(&mut self) {
        self.own_id = None;
        self.local_id = None;
    }

    /// Destroys every entity.
    pub fn purge<P: Presentation>(&mut self, presentation: &mut P) {
        for player in self.directory.clear() {
            presentation.on_entity_destroy(&player.id);
        }
        self.local_id = None;
    }
}
