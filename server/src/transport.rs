//! TCP implementation of [`ServerTransport`].
//!
//! Socket work happens on Tokio tasks:
//! - **Listener**: accepts streams and announces them on the event channel.
//! - **Reader** (one per connection): reads length-prefixed frames and
//!   forwards them; reports `Closed` on EOF or error.
//! - **Writer** (one per connection): drains the connection's outbox.
//!
//! The session loop never awaits. [`TcpServerTransport::pump`] drains the
//! event channel synchronously into per-connection queues, which `accept`
//! and `pop_event` then read.

use crate::error::ServerError;
use log::{debug, error, info, warn};
use shared::framing::{check_frame_size, read_frame, write_frame};
use shared::{ConnectionId, NetEvent, ServerTransport, TransportError};
use std::collections::{HashMap, VecDeque};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpListener;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

/// Messages sent from network tasks to the transport.
#[derive(Debug)]
enum TransportEvent {
    Accepted {
        conn: ConnectionId,
        outbox: mpsc::UnboundedSender<Vec<u8>>,
        shutdown: oneshot::Sender<()>,
    },
    Data {
        conn: ConnectionId,
        payload: Vec<u8>,
    },
    Closed {
        conn: ConnectionId,
    },
}

struct Connection {
    outbox: mpsc::UnboundedSender<Vec<u8>>,
    // Dropping this stops the reader task.
    _shutdown: oneshot::Sender<()>,
    inbox: VecDeque<NetEvent>,
}

pub struct TcpServerTransport {
    local_addr: SocketAddr,
    events_rx: mpsc::UnboundedReceiver<TransportEvent>,
    pending: VecDeque<ConnectionId>,
    connections: HashMap<ConnectionId, Connection>,
    listener_task: JoinHandle<()>,
}

impl TcpServerTransport {
    /// Binds and starts listening. Must be called inside a Tokio runtime.
    pub async fn bind(addr: &str) -> Result<Self, ServerError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| ServerError::Bind {
                addr: addr.to_string(),
                source,
            })?;
        let local_addr = listener.local_addr().map_err(|source| ServerError::Bind {
            addr: addr.to_string(),
            source,
        })?;
        info!("Server listening on {}", local_addr);

        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let listener_task = tokio::spawn(accept_loop(listener, events_tx));

        Ok(Self {
            local_addr,
            events_rx,
            pending: VecDeque::new(),
            connections: HashMap::new(),
            listener_task,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }
}

impl Drop for TcpServerTransport {
    fn drop(&mut self) {
        self.listener_task.abort();
    }
}

impl ServerTransport for TcpServerTransport {
    fn pump(&mut self) {
        while let Ok(event) = self.events_rx.try_recv() {
            match event {
                TransportEvent::Accepted {
                    conn,
                    outbox,
                    shutdown,
                } => {
                    self.connections.insert(
                        conn,
                        Connection {
                            outbox,
                            _shutdown: shutdown,
                            inbox: VecDeque::new(),
                        },
                    );
                    self.pending.push_back(conn);
                }
                TransportEvent::Data { conn, payload } => {
                    if let Some(connection) = self.connections.get_mut(&conn) {
                        connection.inbox.push_back(NetEvent::Data(payload));
                    }
                }
                TransportEvent::Closed { conn } => {
                    if let Some(connection) = self.connections.get_mut(&conn) {
                        connection.inbox.push_back(NetEvent::Disconnect);
                    }
                }
            }
        }
    }

    fn accept(&mut self) -> Option<ConnectionId> {
        while let Some(conn) = self.pending.pop_front() {
            if self.connections.contains_key(&conn) {
                return Some(conn);
            }
        }
        None
    }

    fn is_live(&self, conn: ConnectionId) -> bool {
        self.connections.contains_key(&conn)
    }

    fn pop_event(&mut self, conn: ConnectionId) -> Option<NetEvent> {
        let event = self.connections.get_mut(&conn)?.inbox.pop_front()?;
        if event == NetEvent::Disconnect {
            self.connections.remove(&conn);
        }
        Some(event)
    }

    fn send(&mut self, conn: ConnectionId, payload: &[u8]) -> Result<(), TransportError> {
        let connection = self
            .connections
            .get(&conn)
            .ok_or(TransportError::UnknownConnection(conn))?;
        check_frame_size(payload).map_err(|_| TransportError::PayloadTooLarge(payload.len()))?;
        connection
            .outbox
            .send(payload.to_vec())
            .map_err(|_| TransportError::Closed(conn))
    }

    fn disconnect(&mut self, conn: ConnectionId) {
        if self.connections.remove(&conn).is_some() {
            debug!("Closing connection {}", conn);
        }
    }
}

async fn accept_loop(listener: TcpListener, events_tx: mpsc::UnboundedSender<TransportEvent>) {
    let mut next_id: u32 = 0;

    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                let conn = ConnectionId(next_id);
                next_id = next_id.wrapping_add(1);
                debug!("TCP connection {} from {}", conn, addr);

                if let Err(e) = stream.set_nodelay(true) {
                    warn!("Failed to set TCP_NODELAY for {}: {}", addr, e);
                }
                let (read_half, write_half) = stream.into_split();
                let (outbox_tx, outbox_rx) = mpsc::unbounded_channel();
                let (shutdown_tx, shutdown_rx) = oneshot::channel();

                tokio::spawn(write_loop(conn, write_half, outbox_rx));

                // Announce before the reader starts so data never precedes it.
                let accepted = TransportEvent::Accepted {
                    conn,
                    outbox: outbox_tx,
                    shutdown: shutdown_tx,
                };
                if events_tx.send(accepted).is_err() {
                    break;
                }
                tokio::spawn(read_loop(conn, read_half, events_tx.clone(), shutdown_rx));
            }
            Err(e) => {
                error!("Error accepting connection: {}", e);
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        }
    }
}

async fn read_loop(
    conn: ConnectionId,
    mut reader: OwnedReadHalf,
    events_tx: mpsc::UnboundedSender<TransportEvent>,
    mut shutdown: oneshot::Receiver<()>,
) {
    loop {
        tokio::select! {
            frame = read_frame(&mut reader) => match frame {
                Ok(payload) => {
                    if events_tx.send(TransportEvent::Data { conn, payload }).is_err() {
                        return;
                    }
                }
                Err(e) => {
                    debug!("Connection {} closed: {}", conn, e);
                    break;
                }
            },
            _ = &mut shutdown => return,
        }
    }

    let _ = events_tx.send(TransportEvent::Closed { conn });
}

async fn write_loop(
    conn: ConnectionId,
    mut writer: OwnedWriteHalf,
    mut outbox: mpsc::UnboundedReceiver<Vec<u8>>,
) {
    while let Some(payload) = outbox.recv().await {
        if let Err(e) = write_frame(&mut writer, &payload).await {
            warn!("Failed to write to connection {}: {}", conn, e);
            break;
        }
    }
    let _ = writer.shutdown().await;
}
