use std::time::Duration;

/// Runtime settings for a replication client.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    /// `host:port` of the server.
    pub server_addr: String,
    /// Session loop ticks per second.
    pub tick_rate: u32,
    /// Destroy every entity when the connection drops.
    pub purge_on_disconnect: bool,
    /// Speed of the scripted local cube, in units per second.
    pub speed: f32,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_addr: "127.0.0.1:8080".to_string(),
            tick_rate: 60,
            purge_on_disconnect: false,
            speed: 5.0,
        }
    }
}

impl ClientConfig {
    pub fn tick_duration(&self) -> Duration {
        Duration::from_nanos(1_000_000_000 / u64::from(self.tick_rate.max(1)))
    }
}
