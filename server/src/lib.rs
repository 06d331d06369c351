//! # Replication Server Library
//!
//! Authoritative side of the cube-sync protocol. The server accepts client
//! connections, gives each one a player with a random spawn position and
//! colour, and keeps every client's view of the shared player list in sync.
//!
//! ## Core Responsibilities
//!
//! ### Connection Tracking
//! Accepted connections are recorded in the [`registry::ConnectionRegistry`].
//! A connection's player id is its transport connection id, stringified.
//! Dead connections are swept at the start of every tick and their players
//! announced as `PLAYER_LEFT` to everyone still connected.
//!
//! ### Authoritative Directory
//! The server's [`shared::PlayerDirectory`] always holds exactly the players
//! of registered connections. New players are announced with
//! `PLAYER_JOINED`; a newcomer receives a `PLAYER_JOINED` for every player,
//! itself included, so late joiners rebuild the roster with the same message
//! used for live joins.
//!
//! ### Periodic Broadcasts
//! Two timers run alongside the tick: a `HANDSHAKE` re-announcement every two
//! seconds and a full `SERVER_UPDATE` snapshot at 30 Hz.
//!
//! ## Architecture Design
//!
//! ### Single-Threaded Session Loop
//! [`network::Server`] owns the registry, the directory and the transport and
//! mutates them from one thread only, so no locking is needed. Socket I/O
//! runs on Tokio tasks inside [`transport::TcpServerTransport`] and reaches
//! the loop through channels drained once per tick.
//!
//! ### Deterministic Timing
//! The loop never reads the clock itself: [`network::Server::tick`] takes the
//! current instant, so tests step time explicitly.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::config::ServerConfig;
//! use server::network::Server;
//! use server::transport::TcpServerTransport;
//! use std::time::Instant;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ServerConfig::default();
//!     let transport = TcpServerTransport::bind(&config.bind_address()).await?;
//!     let mut server = Server::new(transport, &config, Instant::now());
//!
//!     let mut ticker = tokio::time::interval(config.tick_duration());
//!     loop {
//!         ticker.tick().await;
//!         server.tick(Instant::now());
//!     }
//! }
//! ```

pub mod config;
pub mod error;
pub mod network;
pub mod registry;
pub mod spawn;
pub mod transport;

pub use config::ServerConfig;
pub use error::ServerError;
pub use network::Server;
