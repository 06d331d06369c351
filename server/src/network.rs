//! Server session loop: connection lifecycle, message dispatch and fan-out.
//!
//! [`Server::tick`] runs one frame in a fixed order:
//!
//! 1. pump the transport,
//! 2. sweep dead connections and announce `PLAYER_LEFT`,
//! 3. accept new connections (handshake, `PLAYER_JOINED` fan-out, roster),
//! 4. drain and dispatch inbound messages,
//! 5. fire whichever periodic sends are due (handshake re-announcement every
//!    [`HANDSHAKE_INTERVAL`], snapshot every [`STATE_SYNC_INTERVAL`]).
//!
//! Cleanup runs before accept so a new player's roster never lists a
//! connection that has already died, and both run before dispatch so no data
//! is handled for a torn-down connection.
//!
//! All state is owned by the [`Server`] value and mutated from one thread.

use crate::config::ServerConfig;
use crate::registry::{ConnectionEntry, ConnectionRegistry};
use crate::spawn::spawn_player;
use log::{debug, error, info, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;
use shared::{
    decode, encode, ConnectionId, Decoded, Message, NetEvent, PlayerDirectory, PlayerState,
    Periodic, ServerTransport, HANDSHAKE_INTERVAL, STATE_SYNC_INTERVAL,
};
use std::time::{Duration, Instant};

/// Ticks between status lines at debug level.
const STATUS_LOG_TICKS: u64 = 600;

pub struct Server<T: ServerTransport> {
    transport: T,
    registry: ConnectionRegistry,
    directory: PlayerDirectory,
    rng: StdRng,
    apply_client_updates: bool,
    handshake_timer: Periodic,
    snapshot_timer: Periodic,
    tick: u64,
}

impl<T: ServerTransport> Server<T> {
    /// Wraps an already bound transport. Both periodic sends start at `now`.
    pub fn new(transport: T, config: &ServerConfig, now: Instant) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let mut handshake_timer = Periodic::new(HANDSHAKE_INTERVAL);
        handshake_timer.start(now, Duration::ZERO);
        let mut snapshot_timer = Periodic::new(STATE_SYNC_INTERVAL);
        snapshot_timer.start(now, Duration::ZERO);

        if config.apply_client_updates {
            info!("Client position/colour updates will be applied to the directory");
        }

        Self {
            transport,
            registry: ConnectionRegistry::new(),
            directory: PlayerDirectory::new(),
            rng,
            apply_client_updates: config.apply_client_updates,
            handshake_timer,
            snapshot_timer,
            tick: 0,
        }
    }

    /// Runs one frame of the session loop at time `now`.
    pub fn tick(&mut self, now: Instant) {
        self.transport.pump();

        self.cleanup_connections();
        self.accept_connections();
        self.read_incoming_messages();

        if self.handshake_timer.poll(now) {
            self.announce_handshakes();
        }
        if self.snapshot_timer.poll(now) {
            self.broadcast_snapshot();
        }

        self.tick += 1;
        if self.tick % STATUS_LOG_TICKS == 0 {
            debug!(
                "Tick {}: {} connections, {} players",
                self.tick,
                self.registry.len(),
                self.directory.len()
            );
        }
    }

    /// Disconnects every client and drops all session state.
    pub fn shutdown(&mut self) {
        for entry in self.registry.clear() {
            self.transport.disconnect(entry.handle);
        }
        self.directory.clear();
        self.handshake_timer.stop();
        self.snapshot_timer.stop();
        info!("Server shut down");
    }

    pub fn directory(&self) -> &PlayerDirectory {
        &self.directory
    }

    pub fn registry(&self) -> &ConnectionRegistry {
        &self.registry
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn player_count(&self) -> usize {
        self.directory.len()
    }

    pub fn connection_count(&self) -> usize {
        self.registry.len()
    }

    pub fn ticks(&self) -> u64 {
        self.tick
    }

    fn cleanup_connections(&mut self) {
        let transport = &self.transport;
        let dead = self.registry.sweep(|c| transport.is_live(c));
        for entry in dead {
            self.on_disconnect(entry);
        }
    }

    fn on_disconnect(&mut self, entry: ConnectionEntry) {
        let player = match self.directory.remove(&entry.player_id) {
            Some(player) => player,
            None => {
                warn!(
                    "Unknown player reference {:?} while cleaning up connection {}",
                    entry.player_id, entry.handle
                );
                PlayerState::with_id(entry.player_id.clone())
            }
        };

        info!("Player {} left", player.id);
        self.broadcast(&Message::PlayerLeft { player }, None);
    }

    fn accept_connections(&mut self) {
        while let Some(conn) = self.transport.accept() {
            self.on_connect(conn);
        }
    }

    fn on_connect(&mut self, conn: ConnectionId) {
        let Some(player_id) = self.registry.register(conn) else {
            return;
        };

        self.send_to(
            conn,
            &Message::Handshake {
                player_id: player_id.clone(),
            },
        );

        let player = spawn_player(&player_id, &mut self.rng);
        info!(
            "Player {} joined at ({}, {}, {})",
            player_id, player.position.x, player.position.y, player.position.z
        );

        self.broadcast(
            &Message::PlayerJoined {
                player: player.clone(),
            },
            Some(conn),
        );
        self.directory.upsert(player);

        // The newcomer rebuilds the full roster, itself included, from joins.
        for existing in self.directory.snapshot() {
            self.send_to(conn, &Message::PlayerJoined { player: existing });
        }
    }

    fn read_incoming_messages(&mut self) {
        let transport = &self.transport;
        let live = self.registry.live_handles(|c| transport.is_live(c));
        for conn in live {
            while let Some(event) = self.transport.pop_event(conn) {
                match event {
                    NetEvent::Data(bytes) => self.on_data(conn, &bytes),
                    NetEvent::Disconnect => {
                        info!("Connection {} disconnected", conn);
                    }
                    NetEvent::Connect => {
                        debug!("Ignoring connect event on accepted connection {}", conn);
                    }
                }
            }
        }
    }

    fn on_data(&mut self, conn: ConnectionId, bytes: &[u8]) {
        match decode(bytes) {
            Ok(Decoded::Message(message)) => self.handle_message(conn, message),
            Ok(Decoded::Unrecognized(cmd)) => {
                warn!("Unrecognized message {:?} from connection {}", cmd, conn);
            }
            Err(e) => {
                warn!("Discarding message from connection {}: {}", conn, e);
            }
        }
    }

    fn handle_message(&mut self, conn: ConnectionId, message: Message) {
        match message {
            Message::Handshake { player_id } => {
                debug!("Handshake from connection {} (id {:?})", conn, player_id);
            }
            Message::PlayerUpdate { player } => {
                debug!("Player update from connection {} for {}", conn, player.id);
                if self.apply_client_updates {
                    self.apply_player_update(conn, &player);
                }
            }
            Message::ServerUpdate { players } => {
                debug!(
                    "Server update from connection {} ({} players), ignored",
                    conn,
                    players.len()
                );
            }
            Message::PlayerJoined { .. } | Message::PlayerLeft { .. } => {
                warn!(
                    "Unexpected {} from connection {}, ignored",
                    message.command(),
                    conn
                );
            }
        }
    }

    /// Copies a client's self-reported position and colour into the directory.
    fn apply_player_update(&mut self, conn: ConnectionId, player: &PlayerState) {
        if self.registry.player_id(conn) != Some(player.id.as_str()) {
            warn!(
                "Connection {} sent an update for player {}, ignored",
                conn, player.id
            );
            return;
        }

        if let Err(e) = self.directory.update_existing(player) {
            warn!("{}", e);
        }
    }

    fn announce_handshakes(&mut self) {
        let transport = &self.transport;
        let targets: Vec<(ConnectionId, String)> = {
            let mut targets = Vec::new();
            self.registry.for_each_live(
                |c| transport.is_live(c),
                |entry| targets.push((entry.handle, entry.player_id.clone())),
            );
            targets
        };

        for (conn, player_id) in targets {
            self.send_to(conn, &Message::Handshake { player_id });
        }
    }

    fn broadcast_snapshot(&mut self) {
        let message = Message::ServerUpdate {
            players: self.directory.snapshot(),
        };
        self.broadcast(&message, None);
    }

    fn send_to(&mut self, conn: ConnectionId, message: &Message) {
        match encode(message) {
            Ok(bytes) => self.send_bytes(conn, &bytes, message),
            Err(e) => error!("Failed to encode {}: {}", message.command(), e),
        }
    }

    /// Sends to every live connection except `exclude`.
    fn broadcast(&mut self, message: &Message, exclude: Option<ConnectionId>) {
        let bytes = match encode(message) {
            Ok(bytes) => bytes,
            Err(e) => {
                error!("Failed to encode {}: {}", message.command(), e);
                return;
            }
        };

        let transport = &self.transport;
        let targets = self.registry.live_handles(|c| transport.is_live(c));
        for conn in targets {
            if Some(conn) == exclude {
                continue;
            }
            self.send_bytes(conn, &bytes, message);
        }
    }

    fn send_bytes(&mut self, conn: ConnectionId, bytes: &[u8], message: &Message) {
        if let Err(e) = self.transport.send(conn, bytes) {
            error!(
                "Failed to send {} to connection {}: {}",
                message.command(),
                conn,
                e
            );
        }
    }
}
