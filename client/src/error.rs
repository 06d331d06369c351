use thiserror::Error;

/// Errors that stop the client from starting.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("invalid server address {addr:?}: {source}")]
    InvalidAddress {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("server address {0:?} did not resolve to any socket address")]
    NoAddress(String),
}
