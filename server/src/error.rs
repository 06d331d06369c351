use thiserror::Error;

/// Errors that stop the server from starting.
///
/// Everything that goes wrong after startup (bad payloads, dead connections,
/// unknown player ids) is logged and contained inside the session loop.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;
    use std::io;

    #[test]
    fn test_bind_error_formatting() {
        let err = ServerError::Bind {
            addr: "0.0.0.0:8080".to_string(),
            source: io::Error::new(io::ErrorKind::AddrInUse, "address in use"),
        };

        assert_eq!(err.to_string(), "failed to bind 0.0.0.0:8080: address in use");
        assert!(err.source().is_some());
    }
}
