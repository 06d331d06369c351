//! Types and protocol pieces shared by the replication server and its clients.
//!
//! The wire protocol is JSON text with a `cmd` discriminant on every message
//! (see [`message`]). Both ends keep a [`PlayerDirectory`]: authoritative on
//! the server, a reconciled cache on each client.

use serde::{Deserialize, Serialize};
use std::time::Duration;

pub mod directory;
pub mod framing;
pub mod memory;
pub mod message;
pub mod schedule;
pub mod transport;

pub use directory::{DirectoryError, PlayerDirectory};
pub use message::{decode, encode, CodecError, Decoded, Message};
pub use schedule::Periodic;
pub use transport::{ClientTransport, ConnectionId, NetEvent, ServerTransport, TransportError};

/// How often each side re-sends its `HANDSHAKE`.
pub const HANDSHAKE_INTERVAL: Duration = Duration::from_secs(2);

/// Snapshot broadcast (server) and local-state push (client) period, 1/30 s.
pub const STATE_SYNC_INTERVAL: Duration = Duration::from_nanos(33_333_333);

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Default)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const ZERO: Vec3 = Vec3 {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }
}

impl std::ops::Add for Vec3 {
    type Output = Vec3;

    fn add(self, rhs: Vec3) -> Vec3 {
        Vec3::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl std::ops::Mul<f32> for Vec3 {
    type Output = Vec3;

    fn mul(self, rhs: f32) -> Vec3 {
        Vec3::new(self.x * rhs, self.y * rhs, self.z * rhs)
    }
}

/// Linear RGB colour, channels in `[0, 1]`.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Default)]
pub struct Rgb {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Rgb {
    pub fn new(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    /// Converts hue/saturation/value (all in `[0, 1]`) to RGB.
    pub fn from_hsv(h: f32, s: f32, v: f32) -> Self {
        let h = h.rem_euclid(1.0) * 6.0;
        let sector = h.floor();
        let f = h - sector;

        let p = v * (1.0 - s);
        let q = v * (1.0 - s * f);
        let t = v * (1.0 - s * (1.0 - f));

        match sector as u32 {
            0 => Rgb::new(v, t, p),
            1 => Rgb::new(q, v, p),
            2 => Rgb::new(p, v, t),
            3 => Rgb::new(p, q, v),
            4 => Rgb::new(t, p, v),
            _ => Rgb::new(v, p, q),
        }
    }
}

/// Replicated state of one participant.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
pub struct PlayerState {
    pub id: String,
    pub position: Vec3,
    pub color: Rgb,
}

impl PlayerState {
    pub fn new(id: impl Into<String>, position: Vec3, color: Rgb) -> Self {
        Self {
            id: id.into(),
            position,
            color,
        }
    }

    /// A state carrying only the id, used when the last known state is gone.
    pub fn with_id(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }
}
