//! TCP implementation of [`ClientTransport`].
//!
//! One Tokio task owns the socket. It reports `Connect` once the stream is
//! open, forwards every inbound frame as `Data`, writes whatever the session
//! loop queues in the outbox, and reports `Disconnect` when either direction
//! fails. A connect attempt that fails goes straight to `Disconnect`.

use crate::error::ClientError;
use log::{debug, info, warn};
use shared::framing::{check_frame_size, read_frame, write_frame};
use shared::{ClientTransport, NetEvent, TransportError};
use std::collections::VecDeque;
use std::net::SocketAddr;
use tokio::io::AsyncWriteExt;
use tokio::net::{lookup_host, TcpStream};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Resolves `host:port` to the first socket address it names.
pub async fn resolve_server_addr(addr: &str) -> Result<SocketAddr, ClientError> {
    let mut addrs = lookup_host(addr)
        .await
        .map_err(|source| ClientError::InvalidAddress {
            addr: addr.to_string(),
            source,
        })?;
    addrs
        .next()
        .ok_or_else(|| ClientError::NoAddress(addr.to_string()))
}

pub struct TcpClientTransport {
    events_rx: mpsc::UnboundedReceiver<NetEvent>,
    outbox: Option<mpsc::UnboundedSender<Vec<u8>>>,
    ready: VecDeque<NetEvent>,
    connected: bool,
    task: JoinHandle<()>,
}

impl TcpClientTransport {
    /// Starts connecting to `addr` in the background. Must be called inside a
    /// Tokio runtime.
    pub fn connect(addr: SocketAddr) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (outbox_tx, outbox_rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(connection_task(addr, events_tx, outbox_rx));

        Self {
            events_rx,
            outbox: Some(outbox_tx),
            ready: VecDeque::new(),
            connected: false,
            task,
        }
    }
}

impl Drop for TcpClientTransport {
    fn drop(&mut self) {
        self.task.abort();
    }
}

impl ClientTransport for TcpClientTransport {
    fn pump(&mut self) {
        while let Ok(event) = self.events_rx.try_recv() {
            if self.outbox.is_some() {
                self.ready.push_back(event);
            }
        }
    }

    fn pop_event(&mut self) -> Option<NetEvent> {
        let event = self.ready.pop_front()?;
        match event {
            NetEvent::Connect => self.connected = true,
            NetEvent::Disconnect => self.connected = false,
            NetEvent::Data(_) => {}
        }
        Some(event)
    }

    fn send(&mut self, payload: &[u8]) -> Result<(), TransportError> {
        if !self.connected {
            return Err(TransportError::NotConnected);
        }
        check_frame_size(payload).map_err(|_| TransportError::PayloadTooLarge(payload.len()))?;
        self.outbox
            .as_ref()
            .ok_or(TransportError::NotConnected)?
            .send(payload.to_vec())
            .map_err(|_| TransportError::NotConnected)
    }

    fn disconnect(&mut self) {
        // Closing the outbox lets the writer flush and shut the socket down.
        if self.outbox.take().is_some() {
            debug!("Closing connection to server");
        }
        if !self.connected {
            // Still connecting: nothing to flush, and no late Connect.
            self.task.abort();
        }
        self.connected = false;
        self.ready.clear();
    }
}

async fn connection_task(
    addr: SocketAddr,
    events_tx: mpsc::UnboundedSender<NetEvent>,
    mut outbox: mpsc::UnboundedReceiver<Vec<u8>>,
) {
    let stream = match TcpStream::connect(addr).await {
        Ok(stream) => stream,
        Err(e) => {
            warn!("Failed to connect to {}: {}", addr, e);
            let _ = events_tx.send(NetEvent::Disconnect);
            return;
        }
    };
    info!("TCP connection to {} established", addr);

    if let Err(e) = stream.set_nodelay(true) {
        warn!("Failed to set TCP_NODELAY: {}", e);
    }
    let (mut reader, mut writer) = stream.into_split();

    if events_tx.send(NetEvent::Connect).is_err() {
        return;
    }

    let read = async {
        loop {
            match read_frame(&mut reader).await {
                Ok(payload) => {
                    if events_tx.send(NetEvent::Data(payload)).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    debug!("Connection to server closed: {}", e);
                    break;
                }
            }
        }
    };

    let write = async {
        while let Some(payload) = outbox.recv().await {
            if let Err(e) = write_frame(&mut writer, &payload).await {
                warn!("Failed to write to server: {}", e);
                break;
            }
        }
        let _ = writer.shutdown().await;
    };

    tokio::select! {
        _ = read => {}
        _ = write => {}
    }

    let _ = events_tx.send(NetEvent::Disconnect);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::net::TcpListener;

    async fn next_event(transport: &mut TcpClientTransport) -> NetEvent {
        for _ in 0..200 {
            transport.pump();
            if let Some(event) = transport.pop_event() {
                return event;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("no event arrived");
    }

    #[tokio::test]
    async fn test_resolve_server_addr() {
        let addr = resolve_server_addr("127.0.0.1:8080").await.unwrap();
        assert_eq!(addr, "127.0.0.1:8080".parse::<SocketAddr>().unwrap());

        let err = resolve_server_addr("no-port-here").await.unwrap_err();
        assert!(matches!(err, ClientError::InvalidAddress { .. }));
    }

    #[tokio::test]
    async fn test_connect_exchange_and_close() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let mut transport = TcpClientTransport::connect(listener.local_addr().unwrap());

        assert!(matches!(
            transport.send(b"early"),
            Err(TransportError::NotConnected)
        ));

        let (mut peer, _) = listener.accept().await.unwrap();
        assert_eq!(next_event(&mut transport).await, NetEvent::Connect);

        transport.send(b"ping").unwrap();
        assert_eq!(read_frame(&mut peer).await.unwrap(), b"ping");

        write_frame(&mut peer, b"pong").await.unwrap();
        assert_eq!(
            next_event(&mut transport).await,
            NetEvent::Data(b"pong".to_vec())
        );

        drop(peer);
        assert_eq!(next_event(&mut transport).await, NetEvent::Disconnect);
        assert!(transport.send(b"late").is_err());
    }

    #[tokio::test]
    async fn test_disconnect_while_connecting_stays_closed() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let mut transport = TcpClientTransport::connect(listener.local_addr().unwrap());
        transport.disconnect();

        for _ in 0..20 {
            tokio::time::sleep(Duration::from_millis(5)).await;
            transport.pump();
            assert_eq!(transport.pop_event(), None);
        }
        assert!(matches!(
            transport.send(b"late"),
            Err(TransportError::NotConnected)
        ));
    }

    #[tokio::test]
    async fn test_oversized_send_is_rejected() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let mut transport = TcpClientTransport::connect(listener.local_addr().unwrap());
        let (mut peer, _) = listener.accept().await.unwrap();
        assert_eq!(next_event(&mut transport).await, NetEvent::Connect);

        let big = vec![b'x'; shared::framing::MAX_FRAME_SIZE as usize + 1];
        assert!(matches!(
            transport.send(&big),
            Err(TransportError::PayloadTooLarge(_))
        ));

        transport.send(b"small").unwrap();
        assert_eq!(read_frame(&mut peer).await.unwrap(), b"small");
    }

    #[tokio::test]
    async fn test_refused_connect_reports_disconnect() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let mut transport = TcpClientTransport::connect(addr);
        assert_eq!(next_event(&mut transport).await, NetEvent::Disconnect);
    }
}
