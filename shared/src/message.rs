//! Wire messages and their JSON codec.
//!
//! Every payload is a JSON object carrying a `cmd` discriminant next to the
//! variant's own fields:
//!
//! ```json
//! {"cmd":"PLAYER_JOINED","player":{"id":"5","position":{"x":1.0,"y":2.0,"z":3.0},"color":{"r":0.2,"g":0.4,"b":0.6}}}
//! ```
//!
//! Decoding is two-phase. [`decode`] first reads only the discriminant; an
//! unknown `cmd` yields [`Decoded::Unrecognized`] so the caller can log and
//! discard it without touching the connection. A known `cmd` is then parsed
//! into its full shape, and a body that does not match it is a
//! [`CodecError`].

use crate::PlayerState;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(tag = "cmd", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Message {
    Handshake { player_id: String },
    PlayerUpdate { player: PlayerState },
    ServerUpdate { players: Vec<PlayerState> },
    PlayerJoined { player: PlayerState },
    PlayerLeft { player: PlayerState },
}

impl Message {
    /// Discriminants understood by this protocol version.
    pub const COMMANDS: [&'static str; 5] = [
        "HANDSHAKE",
        "PLAYER_UPDATE",
        "SERVER_UPDATE",
        "PLAYER_JOINED",
        "PLAYER_LEFT",
    ];

    /// The `cmd` value this message is written with.
    pub fn command(&self) -> &'static str {
        match self {
            Message::Handshake { .. } => "HANDSHAKE",
            Message::PlayerUpdate { .. } => "PLAYER_UPDATE",
            Message::ServerUpdate { .. } => "SERVER_UPDATE",
            Message::PlayerJoined { .. } => "PLAYER_JOINED",
            Message::PlayerLeft { .. } => "PLAYER_LEFT",
        }
    }
}

/// Outcome of decoding one payload.
#[derive(Debug, Clone, PartialEq)]
pub enum Decoded {
    Message(Message),
    /// Well-formed envelope whose `cmd` is not part of the protocol.
    Unrecognized(String),
}

#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("malformed payload: {0}")]
    Json(#[from] serde_json::Error),

    #[error("payload has no `cmd` discriminant")]
    MissingDiscriminant,
}

#[derive(Deserialize)]
struct Header {
    cmd: Option<String>,
}

pub fn encode(message: &Message) -> Result<Vec<u8>, CodecError> {
    Ok(serde_json::to_vec(message)?)
}

pub fn decode(bytes: &[u8]) -> Result<Decoded, CodecError> {
    let header: Header = serde_json::from_slice(bytes)?;
    let cmd = header.cmd.ok_or(CodecError::MissingDiscriminant)?;

    if !Message::COMMANDS.contains(&cmd.as_str()) {
        return Ok(Decoded::Unrecognized(cmd));
    }

    let message: Message = serde_json::from_slice(bytes)?;
    Ok(Decoded::Message(message))
}
