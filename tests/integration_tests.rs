//! Integration tests for the replication server and client
//!
//! These tests run real `Server` and `Client` session loops against each other,
//! over the in-memory network for deterministic scenarios and over TCP for
//! one end-to-end check.

use client::presentation::Presentation;
use client::{Client, ClientConfig};
use server::{Server, ServerConfig};
use shared::memory::{Direction, MemoryClientTransport, MemoryNetwork};
use shared::{decode, encode, Decoded, Message, PlayerState, Rgb, ServerTransport, Vec3};
use std::collections::BTreeSet;
use std::time::{Duration, Instant};

/// Presentation double that records entity lifecycle calls.
#[derive(Debug, Default)]
struct Recorder {
    created: Vec<(String, Vec3, Rgb, bool)>,
    destroyed: Vec<String>,
    delta: Vec3,
}

impl Presentation for Recorder {
    fn on_entity_create(&mut self, id: &str, position: Vec3, color: Rgb, is_local: bool) {
        self.created.push((id.to_string(), position, color, is_local));
    }

    fn on_entity_update_position(&mut self, _id: &str, _position: Vec3) {}

    fn on_entity_destroy(&mut self, id: &str) {
        self.destroyed.push(id.to_string());
    }

    fn read_local_input_delta(&mut self) -> Vec3 {
        self.delta
    }

    fn read_local_color(&mut self) -> Rgb {
        Rgb::new(0.5, 0.5, 0.5)
    }
}

type MemoryClient = Client<MemoryClientTransport, Recorder>;

fn server_config() -> ServerConfig {
    ServerConfig {
        seed: Some(7),
        ..Default::default()
    }
}

fn new_client(network: &MemoryNetwork) -> MemoryClient {
    Client::new(network.connect(), Recorder::default(), &ClientConfig::default())
}

fn ms(n: u64) -> Duration {
    Duration::from_millis(n)
}

/// SCENARIOS FROM THE PROTOCOL DESCRIPTION
mod scenario_tests {
    use super::*;

    /// A handshake followed by our own join creates the locally-controlled entity
    #[test]
    fn handshake_then_own_join_creates_local_entity() {
        let network = MemoryNetwork::new();
        let mut server = network.listen();
        let mut client = new_client(&network);

        server.pump();
        let conn = server.accept().unwrap();
        let handshake = Message::Handshake {
            player_id: "5".to_string(),
        };
        let joined = Message::PlayerJoined {
            player: PlayerState::new("5", Vec3::new(1.0, 2.0, 3.0), Rgb::new(0.2, 0.4, 0.6)),
        };
        server.send(conn, &encode(&handshake).unwrap()).unwrap();
        server.send(conn, &encode(&joined).unwrap()).unwrap();

        client.tick(Instant::now());

        assert_eq!(client.own_id(), Some("5"));
        assert_eq!(
            client.presentation().created,
            vec![(
                "5".to_string(),
                Vec3::new(1.0, 2.0, 3.0),
                Rgb::new(0.2, 0.4, 0.6),
                true
            )]
        );
        let local = client.world().local_player().unwrap();
        assert_eq!(local.id, "5");
    }

    /// When one of two clients leaves, the other destroys its entity
    #[test]
    fn remaining_client_destroys_departed_player() {
        let network = MemoryNetwork::new();
        let t0 = Instant::now();
        let mut server = Server::new(network.listen(), &server_config(), t0);
        let mut stay = new_client(&network);
        let mut leave = new_client(&network);

        server.tick(t0);
        stay.tick(t0);
        leave.tick(t0);

        let stay_id = stay.own_id().unwrap().to_string();
        let leave_id = leave.own_id().unwrap().to_string();
        assert_ne!(stay_id, leave_id);
        assert!(stay.world().directory().contains(&leave_id));
        assert!(leave.world().directory().contains(&stay_id));

        leave.disconnect();
        server.tick(t0 + ms(1));
        server.tick(t0 + ms(2));
        stay.tick(t0 + ms(2));

        assert!(!server.directory().contains(&leave_id));
        assert!(!stay.world().directory().contains(&leave_id));
        assert_eq!(stay.presentation().destroyed, vec![leave_id]);
        assert!(stay.world().directory().contains(&stay_id));
    }

    /// A snapshot with no players is a valid message
    #[test]
    fn empty_snapshot_decodes() {
        let bytes = br#"{"cmd":"SERVER_UPDATE","players":[]}"#;
        match decode(bytes).unwrap() {
            Decoded::Message(Message::ServerUpdate { players }) => assert!(players.is_empty()),
            other => panic!("expected empty ServerUpdate, got {:?}", other),
        }

        // A server with nobody connected still broadcasts nothing harmful.
        let network = MemoryNetwork::new();
        let t0 = Instant::now();
        let mut server = Server::new(network.listen(), &server_config(), t0);
        server.tick(t0);
        assert!(network.sent_log().is_empty());
    }
}

/// CLIENT VIEW CONVERGENCE
mod convergence_tests {
    use super::*;

    /// Duplicate joins and leaves of unknown players leave the view unchanged
    #[test]
    fn joins_and_leaves_are_idempotent() {
        let network = MemoryNetwork::new();
        let mut server = network.listen();
        let mut client = new_client(&network);
        server.pump();
        let conn = server.accept().unwrap();

        let player = PlayerState::new("7", Vec3::new(1.0, 1.0, 1.0), Rgb::new(1.0, 0.0, 0.0));
        for message in [
            Message::PlayerJoined {
                player: player.clone(),
            },
            Message::PlayerJoined {
                player: player.clone(),
            },
            Message::PlayerLeft {
                player: PlayerState::with_id("404"),
            },
        ] {
            server.send(conn, &encode(&message).unwrap()).unwrap();
        }
        client.tick(Instant::now());

        assert_eq!(client.presentation().created.len(), 1);
        assert!(client.presentation().destroyed.is_empty());
        assert_eq!(client.world().directory().snapshot(), vec![player]);
    }

    /// Every client ends up with the same roster as the server
    #[test]
    fn late_joiner_sees_full_roster() {
        let network = MemoryNetwork::new();
        let t0 = Instant::now();
        let mut server = Server::new(network.listen(), &server_config(), t0);

        let mut clients: Vec<MemoryClient> = Vec::new();
        for step in 0..4u64 {
            clients.push(new_client(&network));
            server.tick(t0 + ms(step));
            for client in &mut clients {
                client.tick(t0 + ms(step));
            }
        }

        let expected: BTreeSet<&str> = server.directory().ids().collect();
        assert_eq!(expected.len(), 4);
        for client in &clients {
            let seen: BTreeSet<&str> = client.world().directory().ids().collect();
            assert_eq!(seen, expected);
            assert!(client.world().local_player().is_some());
        }
    }

    /// With client updates enabled, one client's movement reaches the others
    #[test]
    fn client_movement_reaches_other_clients_when_applied() {
        let network = MemoryNetwork::new();
        let t0 = Instant::now();
        let config = ServerConfig {
            apply_client_updates: true,
            ..server_config()
        };
        let mut server = Server::new(network.listen(), &config, t0);
        let mut mover = Client::new(
            network.connect(),
            Recorder {
                delta: Vec3::new(1.0, 0.0, 0.0),
                ..Default::default()
            },
            &ClientConfig::default(),
        );
        let mut watcher = new_client(&network);

        server.tick(t0);
        mover.tick(t0);
        watcher.tick(t0);

        let mover_id = mover.own_id().unwrap().to_string();
        let spawn = server.directory().lookup(&mover_id).unwrap().position;

        server.tick(t0 + ms(1));
        server.tick(t0 + ms(40));
        watcher.tick(t0 + ms(40));

        let seen = watcher.world().directory().lookup(&mover_id).unwrap();
        assert_eq!(seen.position, spawn + Vec3::new(1.0, 0.0, 0.0));
    }

    /// Without client updates, snapshots keep reporting the spawn position
    #[test]
    fn client_movement_is_ignored_by_default() {
        let network = MemoryNetwork::new();
        let t0 = Instant::now();
        let mut server = Server::new(network.listen(), &server_config(), t0);
        let mut mover = Client::new(
            network.connect(),
            Recorder {
                delta: Vec3::new(1.0, 0.0, 0.0),
                ..Default::default()
            },
            &ClientConfig::default(),
        );

        server.tick(t0);
        mover.tick(t0);
        let mover_id = mover.own_id().unwrap().to_string();
        let spawn = server.directory().lookup(&mover_id).unwrap().clone();

        server.tick(t0 + ms(1));
        server.tick(t0 + ms(40));
        assert_eq!(server.directory().lookup(&mover_id), Some(&spawn));

        // The snapshot pulls the local cube back to spawn before the next
        // push moves it one step again.
        mover.tick(t0 + ms(40));
        assert_eq!(
            mover.world().local_player().unwrap().position,
            spawn.position + Vec3::new(1.0, 0.0, 0.0)
        );
    }
}

/// SERVER BOOKKEEPING
mod server_tests {
    use super::*;

    fn live_ids(clients: &[(MemoryClientTransport, bool)]) -> BTreeSet<String> {
        clients
            .iter()
            .filter(|(_, live)| *live)
            .map(|(c, _)| c.connection_id().to_string())
            .collect()
    }

    /// The directory always holds exactly the live connections' players
    #[test]
    fn directory_tracks_live_connections() {
        use shared::ClientTransport;

        let network = MemoryNetwork::new();
        let t0 = Instant::now();
        let mut server = Server::new(network.listen(), &server_config(), t0);
        let mut clients: Vec<(MemoryClientTransport, bool)> = Vec::new();
        let mut clock = 0u64;

        // (connect count, index to disconnect, index to sever)
        let script: [(usize, Option<usize>, Option<usize>); 6] = [
            (3, None, None),
            (1, Some(0), None),
            (0, None, Some(2)),
            (2, Some(1), Some(3)),
            (0, Some(4), None),
            (1, None, Some(5)),
        ];

        for (connects, disconnect, sever) in script {
            for _ in 0..connects {
                clients.push((network.connect(), true));
            }
            if let Some(i) = disconnect {
                clients[i].0.disconnect();
                clients[i].1 = false;
            }
            if let Some(i) = sever {
                network.sever(clients[i].0.connection_id());
                clients[i].1 = false;
            }

            // A graceful disconnect takes one tick to observe and one to sweep.
            for _ in 0..2 {
                clock += 1;
                server.tick(t0 + ms(clock));
            }

            let directory: BTreeSet<String> =
                server.directory().ids().map(str::to_string).collect();
            assert_eq!(directory, live_ids(&clients));
            assert_eq!(server.connection_count(), directory.len());
            assert_eq!(server.player_count(), directory.len());
        }
    }

    /// Cleanup runs before accept within a single tick
    #[test]
    fn dead_connection_is_gone_before_newcomer_handshake() {
        let network = MemoryNetwork::new();
        let t0 = Instant::now();
        let mut server = Server::new(network.listen(), &server_config(), t0);
        let stay = network.connect();
        let dead = network.connect();
        server.tick(t0);

        let dead_id = dead.connection_id().to_string();
        network.sever(dead.connection_id());
        let newcomer = network.connect();
        network.clear_sent_log();
        server.tick(t0 + ms(1));

        let decoded: Vec<(shared::ConnectionId, Direction, Message)> = network
            .sent_log()
            .into_iter()
            .map(|frame| match decode(&frame.payload).unwrap() {
                Decoded::Message(m) => (frame.conn, frame.direction, m),
                Decoded::Unrecognized(cmd) => panic!("unexpected cmd {}", cmd),
            })
            .collect();

        let left_at = decoded
            .iter()
            .position(|(conn, _, m)| {
                *conn == stay.connection_id()
                    && matches!(m, Message::PlayerLeft { player } if player.id == dead_id)
            })
            .expect("PlayerLeft was not sent");
        let handshake_at = decoded
            .iter()
            .position(|(conn, _, m)| {
                *conn == newcomer.connection_id() && matches!(m, Message::Handshake { .. })
            })
            .expect("Handshake was not sent");
        assert!(left_at < handshake_at);

        let roster: Vec<&str> = decoded
            .iter()
            .filter(|(conn, dir, _)| *conn == newcomer.connection_id() && *dir == Direction::ToClient)
            .filter_map(|(_, _, m)| match m {
                Message::PlayerJoined { player } => Some(player.id.as_str()),
                _ => None,
            })
            .collect();
        assert!(!roster.contains(&dead_id.as_str()));
        assert_eq!(roster.len(), 2);
        assert!(!server.directory().contains(&dead_id));
    }
}

/// REAL NETWORK TESTS
mod network_tests {
    use super::*;
    use client::transport::TcpClientTransport;
    use server::transport::TcpServerTransport;

    /// Server and client exchange handshake and roster over TCP
    #[tokio::test]
    async fn tcp_end_to_end_session() {
        let config = ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            ..server_config()
        };
        let transport = TcpServerTransport::bind(&config.bind_address())
            .await
            .unwrap();
        let addr = transport.local_addr();
        let mut server = Server::new(transport, &config, Instant::now());

        let mut client = Client::new(
            TcpClientTransport::connect(addr),
            Recorder::default(),
            &ClientConfig::default(),
        );

        for _ in 0..200 {
            server.tick(Instant::now());
            client.tick(Instant::now());
            if client.world().local_player().is_some() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }

        assert!(client.is_connected());
        assert_eq!(client.own_id(), Some("0"));
        let local = client.world().local_player().expect("no local entity");
        assert_eq!(local.id, "0");
        assert!(server.directory().contains("0"));
        assert_eq!(server.player_count(), 1);

        client.disconnect();
        for _ in 0..200 {
            server.tick(Instant::now());
            if server.player_count() == 0 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert_eq!(server.player_count(), 0);
    }
}
