//! Transport abstraction used by both session loops.
//!
//! A transport queues connection events internally and only surfaces them
//! after [`ServerTransport::pump`] / [`ClientTransport::pump`] runs, once per
//! tick. `pop_event` returning `None` is the "empty" event: nothing more is
//! queued for that connection this tick.

use std::fmt;

/// Transport-level connection identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(pub u32);

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum NetEvent {
    Connect,
    Data(Vec<u8>),
    Disconnect,
}

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("connection {0} is closed")]
    Closed(ConnectionId),

    #[error("connection {0} is unknown")]
    UnknownConnection(ConnectionId),

    #[error("not connected")]
    NotConnected,

    #[error("payload of {0} bytes exceeds the frame limit")]
    PayloadTooLarge(usize),
}

pub trait ServerTransport {
    /// Moves queued network activity into the per-connection event queues.
    fn pump(&mut self);

    /// Takes the next connection waiting to be accepted.
    fn accept(&mut self) -> Option<ConnectionId>;

    fn is_live(&self, conn: ConnectionId) -> bool;

    fn pop_event(&mut self, conn: ConnectionId) -> Option<NetEvent>;

    /// Sends one encoded message.
    fn send(&mut self, conn: ConnectionId, payload: &[u8]) -> Result<(), TransportError>;

    fn disconnect(&mut self, conn: ConnectionId);
}

pub trait ClientTransport {
    fn pump(&mut self);

    fn pop_event(&mut self) -> Option<NetEvent>;

    fn send(&mut self, payload: &[u8]) -> Result<(), TransportError>;

    fn disconnect(&mut self);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_id_display() {
        assert_eq!(ConnectionId(5).to_string(), "5");
        assert_eq!(ConnectionId(0).to_string(), "0");
    }

    #[test]
    fn test_error_message_formatting() {
        let err = TransportError::Closed(ConnectionId(3));
        assert_eq!(err.to_string(), "connection 3 is closed");

        let err = TransportError::UnknownConnection(ConnectionId(8));
        assert_eq!(err.to_string(), "connection 8 is unknown");

        let err = TransportError::PayloadTooLarge(2_000_000);
        assert_eq!(err.to_string(), "payload of 2000000 bytes exceeds the frame limit");
    }
}
