//! # Replication Client Library
//!
//! Client side of the cube-sync protocol. A client connects to the server,
//! learns its own player id from the `HANDSHAKE`, mirrors the server's player
//! list into a local cache and streams its own cube's position and colour
//! back at 30 Hz.
//!
//! ## Module Organization
//!
//! ### Game Module (`game`)
//! [`game::ClientWorld`] holds the local copy of the player list:
//! - joins are idempotent, leaves of unknown players are no-ops
//! - snapshots overwrite positions of known players only
//! - the player whose id matches our handshake is the locally-controlled one
//!
//! ### Network Module (`network`)
//! [`network::Client`] is the session loop. It pumps the transport once per
//! tick, dispatches every decoded message through a single exhaustive match
//! and drives the handshake heartbeat and the local-state push.
//!
//! ### Transport Module (`transport`)
//! [`transport::TcpClientTransport`] runs the socket on a Tokio task and hands
//! events to the loop through a channel. Tests use
//! [`shared::memory::MemoryNetwork`] instead.
//!
//! ### Presentation Module (`presentation`)
//! The [`presentation::Presentation`] trait is everything the core needs from
//! a renderer: create/move/destroy hooks plus local input and colour. The
//! bundled [`presentation::HeadlessPresenter`] logs entity changes and moves
//! the local cube with [`input::ScriptedInput`].
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use client::config::ClientConfig;
//! use client::input::ScriptedInput;
//! use client::network::Client;
//! use client::presentation::HeadlessPresenter;
//! use client::transport::{resolve_server_addr, TcpClientTransport};
//! use std::time::Instant;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ClientConfig::default();
//!     let addr = resolve_server_addr(&config.server_addr).await?;
//!
//!     let transport = TcpClientTransport::connect(addr);
//!     let presenter = HeadlessPresenter::new(ScriptedInput::default());
//!     let mut client = Client::new(transport, presenter, &config);
//!
//!     let mut ticker = tokio::time::interval(config.tick_duration());
//!     loop {
//!         ticker.tick().await;
//!         client.tick(Instant::now());
//!     }
//! }
//! ```

pub mod config;
pub mod error;
pub mod game;
pub mod input;
pub mod network;
pub mod presentation;
pub mod transport;

pub use config::ClientConfig;
pub use error::ClientError;
pub use network::Client;
