use std::time::Duration;

/// Runtime settings for the replication server.
#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Session loop ticks per second.
    pub tick_rate: u32,
    /// Write client `PLAYER_UPDATE` position/colour into the authoritative
    /// directory. Off by default: snapshots then only ever carry spawn state.
    pub apply_client_updates: bool,
    /// Seed for spawn positions and colours. `None` seeds from the OS.
    pub seed: Option<u64>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            tick_rate: 60,
            apply_client_updates: false,
            seed: None,
        }
    }
}

impl ServerConfig {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn tick_duration(&self) -> Duration {
        Duration::from_nanos(1_000_000_000 / u64::from(self.tick_rate.max(1)))
    }
}
