//! Client session loop.
//!
//! [`Client::tick`] pumps the transport, handles every queued event and then
//! fires whichever periodic sends are due. Both periodic senders only run
//! while connected: the handshake heartbeat every [`HANDSHAKE_INTERVAL`] and
//! the local-state push every [`STATE_SYNC_INTERVAL`].

use crate::config::ClientConfig;
use crate::game::ClientWorld;
use crate::presentation::Presentation;
use log::{debug, error, info, warn};
use shared::{
    decode, encode, ClientTransport, Decoded, Message, NetEvent, Periodic, HANDSHAKE_INTERVAL,
    STATE_SYNC_INTERVAL,
};
use std::time::{Duration, Instant};

pub struct Client<T: ClientTransport, P: Presentation> {
    transport: T,
    presentation: P,
    world: ClientWorld,
    purge_on_disconnect: bool,
    connected: bool,
    handshake_timer: Periodic,
    push_timer: Periodic,
}

impl<T: ClientTransport, P: Presentation> Client<T, P> {
    /// Wraps a transport whose connect is already under way.
    pub fn new(transport: T, presentation: P, config: &ClientConfig) -> Self {
        Self {
            transport,
            presentation,
            world: ClientWorld::new(),
            purge_on_disconnect: config.purge_on_disconnect,
            connected: false,
            handshake_timer: Periodic::new(HANDSHAKE_INTERVAL),
            push_timer: Periodic::new(STATE_SYNC_INTERVAL),
        }
    }

    /// Runs one frame of the session loop at time `now`.
    pub fn tick(&mut self, now: Instant) {
        self.transport.pump();

        while let Some(event) = self.transport.pop_event() {
            match event {
                NetEvent::Connect => self.on_connected(now),
                NetEvent::Data(bytes) => self.on_data(&bytes),
                NetEvent::Disconnect => self.on_disconnected(),
            }
        }

        if self.handshake_timer.poll(now) {
            self.send_heartbeat();
        }
        if self.push_timer.poll(now) {
            self.push_local_state();
        }
    }

    /// Closes the connection, or abandons it if still connecting. Entities are
    /// purged only if configured to.
    pub fn disconnect(&mut self) {
        self.transport.disconnect();
        self.on_disconnected();
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    pub fn own_id(&self) -> Option<&str> {
        self.world.own_id()
    }

    pub fn world(&self) -> &ClientWorld {
        &self.world
    }

    pub fn presentation(&self) -> &P {
        &self.presentation
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    fn on_connected(&mut self, now: Instant) {
        info!("Connected to server");
        self.connected = true;
        self.handshake_timer.start(now, HANDSHAKE_INTERVAL);
        self.push_timer.start(now, Duration::ZERO);
    }

    fn on_disconnected(&mut self) {
        if self.connected {
            info!("Disconnected from server");
        }
        self.connected = false;
        self.handshake_timer.stop();
        self.push_timer.stop();
        self.world.reset_identity();

        if self.purge_on_disconnect {
            self.world.purge(&mut self.presentation);
        }
    }

    fn on_data(&mut self, bytes: &[u8]) {
        match decode(bytes) {
            Ok(Decoded::Message(message)) => self.handle_message(message),
            Ok(Decoded::Unrecognized(cmd)) => {
                warn!("Unrecognized message {:?} from server", cmd);
            }
            Err(e) => {
                warn!("Discarding message from server: {}", e);
            }
        }
    }

    fn handle_message(&mut self, message: Message) {
        match message {
            Message::Handshake { player_id } => {
                debug!("Handshake: we are player {}", player_id);
                self.world.set_own_id(player_id);
            }
            Message::PlayerJoined { player } => {
                debug!("Player {} joined", player.id);
                self.world.apply_joined(player, &mut self.presentation);
            }
            Message::PlayerLeft { player } => {
                debug!("Player {} left", player.id);
                self.world.apply_left(&player.id, &mut self.presentation);
            }
            Message::ServerUpdate { players } => {
                self.world.apply_snapshot(&players, &mut self.presentation);
            }
            Message::PlayerUpdate { player } => {
                debug!("Player update for {} from server, ignored", player.id);
            }
        }
    }

    fn send_heartbeat(&mut self) {
        let player_id = self.world.own_id().unwrap_or_default().to_string();
        self.send(&Message::Handshake { player_id });
    }

    fn push_local_state(&mut self) {
        if let Some(player) = self.world.advance_local(&mut self.presentation) {
            self.send(&Message::PlayerUpdate { player });
        }
    }

    fn send(&mut self, message: &Message) {
        let bytes = match encode(message) {
            Ok(bytes) => bytes,
            Err(e) => {
                error!("Failed to encode {}: {}", message.command(), e);
                return;
            }
        };

        if let Err(e) = self.transport.send(&bytes) {
            error!("Failed to send {}: {}", message.command(), e);
        }
    }
}
