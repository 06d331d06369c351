//! In-process loopback transport.
//!
//! A [`MemoryNetwork`] connects one listening [`MemoryServerTransport`] to any
//! number of [`MemoryClientTransport`]s on the same thread. Delivery is staged:
//! anything sent becomes visible to the receiver only after its next `pump`,
//! matching the once-per-tick pump model of the real transports. Every payload
//! that crosses the network is appended to a send log so tests can assert
//! global ordering.

use crate::transport::{ClientTransport, ConnectionId, NetEvent, ServerTransport, TransportError};
use std::cell::RefCell;
use std::collections::{BTreeMap, VecDeque};
use std::rc::Rc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    ToServer,
    ToClient,
}

/// One payload recorded by the send log.
#[derive(Debug, Clone, PartialEq)]
pub struct SentFrame {
    pub conn: ConnectionId,
    pub direction: Direction,
    pub payload: Vec<u8>,
}

#[derive(Debug)]
struct Mailbox<T> {
    in_flight: VecDeque<T>,
    ready: VecDeque<T>,
}

impl<T> Default for Mailbox<T> {
    fn default() -> Self {
        Self {
            in_flight: VecDeque::new(),
            ready: VecDeque::new(),
        }
    }
}

impl<T> Mailbox<T> {
    fn deliver(&mut self, item: T) {
        self.in_flight.push_back(item);
    }

    fn flush(&mut self) {
        self.ready.extend(self.in_flight.drain(..));
    }

    fn pop(&mut self) -> Option<T> {
        self.ready.pop_front()
    }
}

#[derive(Debug, Default)]
struct Link {
    accepted: bool,
    server_open: bool,
    client_open: bool,
    to_server: Mailbox<NetEvent>,
    to_client: Mailbox<NetEvent>,
}

#[derive(Debug, Default)]
struct Hub {
    listening: bool,
    next_conn: u32,
    backlog: Mailbox<ConnectionId>,
    links: BTreeMap<ConnectionId, Link>,
    sent: Vec<SentFrame>,
}

#[derive(Debug, Clone, Default)]
pub struct MemoryNetwork {
    hub: Rc<RefCell<Hub>>,
}

impl MemoryNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts listening and returns the server end.
    pub fn listen(&self) -> MemoryServerTransport {
        self.hub.borrow_mut().listening = true;
        MemoryServerTransport {
            hub: Rc::clone(&self.hub),
        }
    }

    /// Opens a client connection. Completion is observed later as a
    /// `Connect` event, after the server accepts it.
    pub fn connect(&self) -> MemoryClientTransport {
        let mut hub = self.hub.borrow_mut();
        let conn = ConnectionId(hub.next_conn);
        hub.next_conn += 1;

        hub.links.insert(
            conn,
            Link {
                client_open: true,
                ..Default::default()
            },
        );
        if hub.listening {
            hub.backlog.deliver(conn);
        }

        MemoryClientTransport {
            hub: Rc::clone(&self.hub),
            conn,
        }
    }

    /// Drops a connection abruptly: neither side is told, the server just
    /// sees it as no longer live.
    pub fn sever(&self, conn: ConnectionId) {
        if let Some(link) = self.hub.borrow_mut().links.get_mut(&conn) {
            link.server_open = false;
            link.client_open = false;
        }
    }

    pub fn sent_log(&self) -> Vec<SentFrame> {
        self.hub.borrow().sent.clone()
    }

    pub fn clear_sent_log(&self) {
        self.hub.borrow_mut().sent.clear();
    }
}

#[derive(Debug)]
pub struct MemoryServerTransport {
    hub: Rc<RefCell<Hub>>,
}

impl ServerTransport for MemoryServerTransport {
    fn pump(&mut self) {
        let mut hub = self.hub.borrow_mut();
        hub.backlog.flush();
        for link in hub.links.values_mut() {
            link.to_server.flush();
        }
    }

    fn accept(&mut self) -> Option<ConnectionId> {
        let mut hub = self.hub.borrow_mut();
        loop {
            let conn = hub.backlog.pop()?;
            let Some(link) = hub.links.get_mut(&conn) else {
                continue;
            };
            if !link.client_open {
                // Gave up before being accepted.
                continue;
            }
            link.accepted = true;
            link.server_open = true;
            link.to_client.deliver(NetEvent::Connect);
            return Some(conn);
        }
    }

    fn is_live(&self, conn: ConnectionId) -> bool {
        self.hub
            .borrow()
            .links
            .get(&conn)
            .map(|link| link.server_open)
            .unwrap_or(false)
    }

    fn pop_event(&mut self, conn: ConnectionId) -> Option<NetEvent> {
        let mut hub = self.hub.borrow_mut();
        let link = hub.links.get_mut(&conn)?;
        if !link.server_open {
            return None;
        }

        let event = link.to_server.pop()?;
        if event == NetEvent::Disconnect {
            link.server_open = false;
        }
        Some(event)
    }

    fn send(&mut self, conn: ConnectionId, payload: &[u8]) -> Result<(), TransportError> {
        let mut hub = self.hub.borrow_mut();
        let link = hub
            .links
            .get_mut(&conn)
            .ok_or(TransportError::UnknownConnection(conn))?;
        if !link.server_open || !link.client_open {
            return Err(TransportError::Closed(conn));
        }

        link.to_client.deliver(NetEvent::Data(payload.to_vec()));
        hub.sent.push(SentFrame {
            conn,
            direction: Direction::ToClient,
            payload: payload.to_vec(),
        });
        Ok(())
    }

    fn disconnect(&mut self, conn: ConnectionId) {
        if let Some(link) = self.hub.borrow_mut().links.get_mut(&conn) {
            if link.server_open && link.client_open {
                link.to_client.deliver(NetEvent::Disconnect);
            }
            link.server_open = false;
        }
    }
}

#[derive(Debug)]
pub struct MemoryClientTransport {
    hub: Rc<RefCell<Hub>>,
    conn: ConnectionId,
}

impl MemoryClientTransport {
    /// The id the server will know this connection by.
    pub fn connection_id(&self) -> ConnectionId {
        self.conn
    }
}

impl ClientTransport for MemoryClientTransport {
    fn pump(&mut self) {
        if let Some(link) = self.hub.borrow_mut().links.get_mut(&self.conn) {
            link.to_client.flush();
        }
    }

    fn pop_event(&mut self) -> Option<NetEvent> {
        let mut hub = self.hub.borrow_mut();
        let link = hub.links.get_mut(&self.conn)?;
        if !link.client_open {
            return None;
        }

        let event = link.to_client.pop()?;
        if event == NetEvent::Disconnect {
            link.client_open = false;
        }
        Some(event)
    }

    fn send(&mut self, payload: &[u8]) -> Result<(), TransportError> {
        let conn = self.conn;
        let mut hub = self.hub.borrow_mut();
        let link = hub
            .links
            .get_mut(&conn)
            .ok_or(TransportError::UnknownConnection(conn))?;
        if !link.accepted {
            return Err(TransportError::NotConnected);
        }
        if !link.server_open || !link.client_open {
            return Err(TransportError::Closed(conn));
        }

        link.to_server.deliver(NetEvent::Data(payload.to_vec()));
        hub.sent.push(SentFrame {
            conn,
            direction: Direction::ToServer,
            payload: payload.to_vec(),
        });
        Ok(())
    }

    fn disconnect(&mut self) {
        if let Some(link) = self.hub.borrow_mut().links.get_mut(&self.conn) {
            if link.client_open && link.server_open {
                link.to_server.deliver(NetEvent::Disconnect);
            }
            link.client_open = false;
        }
    }
}
