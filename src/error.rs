/*!
Error taxonomy for a telemetry retrieval.

- `FetchError`: terminal outcomes of one `fetch_telemetry` call. Every variant is
  surfaced to the caller exactly once; nothing in this crate retries.
- `ConfigError`: problems loading or validating a `MonitorConfig`.

A malformed telemetry row is not an error at all, see `parsers::transceiver::LineOutcome`.
*/

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("{address} is not responding to SSH (port {secure_port}) or Telnet (port {legacy_port})")]
    Unreachable {
        address: String,
        secure_port: u16,
        legacy_port: u16,
    },
    #[error("SSH authentication error: {0}")]
    Authentication(String),
    #[error("Connection timed out: {0}")]
    ConnectTimeout(String),
    #[error("Transport error: {0}")]
    Transport(String),
    #[error("Host key for {host} rejected (SHA256 {fingerprint})")]
    HostKeyRejected { host: String, fingerprint: String },
    #[error("Async error: {0}")]
    Task(String),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl FetchError {
    /// Maps a socket-level error onto the timeout/transport split.
    pub(crate) fn from_io(context: &str, err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::TimedOut | std::io::ErrorKind::WouldBlock => {
                FetchError::ConnectTimeout(format!("{context}: {err}"))
            }
            _ => FetchError::Transport(format!("{context}: {err}")),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Invalid config: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_io_maps_to_connect_timeout() {
        let err = std::io::Error::new(std::io::ErrorKind::TimedOut, "slow");
        assert!(matches!(FetchError::from_io("connect", err), FetchError::ConnectTimeout(_)));

        let err = std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset");
        assert!(matches!(FetchError::from_io("read", err), FetchError::Transport(_)));
    }

    #[test]
    fn test_unreachable_message_names_both_ports() {
        let err = FetchError::Unreachable {
            address: "10.0.0.1".to_string(),
            secure_port: 22,
            legacy_port: 23,
        };
        let msg = err.to_string();
        assert!(msg.contains("10.0.0.1"));
        assert!(msg.contains("22"));
        assert!(msg.contains("23"));
    }
}
