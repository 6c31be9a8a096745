use std::{fmt, net::SocketAddr, time::Duration};

use crate::error::FetchError;

/// Login details for a single retrieval. Held only for the duration of one call.
#[derive(Clone)]
pub struct Credentials {
    pub address: String,
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(address: impl Into<String>, username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("address", &self.address)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Which remote shell a retrieval talks to. Chosen once per call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportChoice {
    SecureShell,
    LegacyShell,
}

impl fmt::Display for TransportChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportChoice::SecureShell => write!(f, "ssh"),
            TransportChoice::LegacyShell => write!(f, "telnet"),
        }
    }
}

/// Raw command output from a device, split into lines.
/// Consumed by value when parsed, so nothing keeps it around afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawResponse {
    lines: Vec<String>,
}

impl RawResponse {
    /// Splits on `\r\n`, `\n` and a lone `\r`. Switches redraw the prompt with a bare
    /// carriage return, and the row after it must still come out as its own line.
    pub fn from_text(text: &str) -> Self {
        let mut lines = Vec::new();
        let mut rest = text;
        while let Some(pos) = rest.find(['\r', '\n']) {
            lines.push(rest[..pos].to_string());
            let skip = if rest[pos..].starts_with("\r\n") { 2 } else { 1 };
            rest = &rest[pos + skip..];
        }
        if !rest.is_empty() {
            lines.push(rest.to_string());
        }
        Self { lines }
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn into_lines(self) -> Vec<String> {
        self.lines
    }
}

/// A remote shell that can run the transceiver command on a device.
pub trait SessionTransport: Send + Sync {
    fn choice(&self) -> TransportChoice;

    /// Opens one connection to `addr` (the address that answered the probe for
    /// `credentials.address`), runs the command sequence and returns the output.
    /// The connection is closed before returning, on every path.
    fn execute(&self, credentials: &Credentials, addr: SocketAddr, timeout: Duration) -> Result<RawResponse, FetchError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_redacts_password() {
        let creds = Credentials::new("10.1.1.1", "admin", "hunter2");
        let out = format!("{:?}", creds);
        assert!(out.contains("admin"));
        assert!(!out.contains("hunter2"));
    }

    #[test]
    fn test_raw_response_splits_crlf() {
        let raw = RawResponse::from_text("a\r\nb\nc");
        assert_eq!(raw.len(), 3);
        assert_eq!(raw.into_lines(), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_raw_response_splits_bare_carriage_return() {
        let raw = RawResponse::from_text("switch#\rGi1/13 39.1 3.20 -5.7 -7.3\r\n\r\nend\n");
        assert_eq!(raw.into_lines(), vec!["switch#", "Gi1/13 39.1 3.20 -5.7 -7.3", "", "end"]);
    }

    #[test]
    fn test_prompt_redraw_row_is_parsed() {
        let raw = RawResponse::from_text("switch#\rGi1/13 39.1 3.20 -5.7 -7.3\r\n");
        let records = crate::parsers::TransceiverParser::default().parse(raw.into_lines());
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].name, "Gi1/13");
    }

    #[test]
    fn test_raw_response_empty_text() {
        assert!(RawResponse::from_text("").is_empty());
    }
}
