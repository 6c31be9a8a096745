/*!
Clear-text telnet variant of the session transport.

Telnet has no command/response framing, so the transport types like a person would:
username, password, disable paging, the transceiver command, exit. It then reads until
the switch hangs up or the deadline passes.

A rejected login is indistinguishable from an empty transceiver table here: the switch
just prints its login failure text, which the parser will not recognise as rows. Callers
get an empty record list either way and have to decide what that means.
*/

use std::io::{ErrorKind, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpStream};
use std::time::{Duration, Instant};

use tracing::debug;

use super::core::{Credentials, RawResponse, SessionTransport, TransportChoice};
use super::{DISABLE_PAGING_COMMAND, EXIT_COMMAND, TRANSCEIVER_COMMAND};
use crate::error::FetchError;

const NUL: u8 = 0;
const IAC: u8 = 255;
const DONT: u8 = 254;
const DO: u8 = 253;
const WONT: u8 = 252;
const WILL: u8 = 251;
const SB: u8 = 250;
const SE: u8 = 240;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum DecodeState {
    #[default]
    Data,
    Iac,
    Negotiate(u8),
    Sub,
    SubIac,
}

/// Strips telnet commands out of the byte stream and refuses every option the peer offers.
/// NUL padding (as in a `CR NUL` bare carriage return) is dropped too.
/// Keeps state between calls so sequences split across reads are handled.
#[derive(Debug, Default)]
pub struct TelnetDecoder {
    state: DecodeState,
}

impl TelnetDecoder {
    /// Appends payload bytes to `data` and any negotiation answers to `replies`.
    pub fn feed(&mut self, input: &[u8], data: &mut Vec<u8>, replies: &mut Vec<u8>) {
        for &byte in input {
            self.state = match (self.state, byte) {
                (DecodeState::Data, IAC) => DecodeState::Iac,
                (DecodeState::Data, NUL) => DecodeState::Data,
                (DecodeState::Data, b) => {
                    data.push(b);
                    DecodeState::Data
                }
                (DecodeState::Iac, IAC) => {
                    data.push(IAC);
                    DecodeState::Data
                }
                (DecodeState::Iac, cmd @ (DO | DONT | WILL | WONT)) => DecodeState::Negotiate(cmd),
                (DecodeState::Iac, SB) => DecodeState::Sub,
                // NOP, GA, AYT and friends carry no payload.
                (DecodeState::Iac, _) => DecodeState::Data,
                (DecodeState::Negotiate(cmd), option) => {
                    match cmd {
                        DO => replies.extend_from_slice(&[IAC, WONT, option]),
                        WILL => replies.extend_from_slice(&[IAC, DONT, option]),
                        _ => {}
                    }
                    DecodeState::Data
                }
                (DecodeState::Sub, IAC) => DecodeState::SubIac,
                (DecodeState::Sub, _) => DecodeState::Sub,
                (DecodeState::SubIac, SE) => DecodeState::Data,
                (DecodeState::SubIac, _) => DecodeState::Sub,
            };
        }
    }
}

/// Doubles any 0xFF so it is sent as data rather than a command.
pub fn escape_iac(bytes: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(bytes.len());
    for &b in bytes {
        out.push(b);
        if b == IAC {
            out.push(IAC);
        }
    }
    out
}

/// Closes both directions of the socket on drop.
struct TelnetConnection {
    stream: TcpStream,
}

impl Drop for TelnetConnection {
    fn drop(&mut self) {
        _ = self.stream.shutdown(Shutdown::Both);
    }
}

pub struct TelnetTransport {
    commands: Vec<String>,
}

impl Default for TelnetTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl TelnetTransport {
    pub fn new() -> Self {
        Self {
            commands: vec![
                DISABLE_PAGING_COMMAND.to_string(),
                TRANSCEIVER_COMMAND.to_string(),
                EXIT_COMMAND.to_string(),
            ],
        }
    }

    /// Everything the transport types, in order, already IAC-escaped.
    fn login_script(&self, credentials: &Credentials) -> Vec<u8> {
        let mut script = Vec::new();
        for line in [credentials.username.as_str(), credentials.password.as_str()]
            .into_iter()
            .chain(self.commands.iter().map(String::as_str))
        {
            script.extend(escape_iac(line.as_bytes()));
            script.push(b'\n');
        }
        script
    }

    fn read_until_closed(conn: &mut TelnetConnection, deadline: Instant) -> Vec<u8> {
        let mut decoder = TelnetDecoder::default();
        let mut data = Vec::new();
        let mut replies = Vec::new();
        let mut buf = [0u8; 4096];

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                debug!("telnet: session deadline reached");
                break;
            }
            if let Err(e) = conn.stream.set_read_timeout(Some(remaining)) {
                debug!(error = %e, "telnet: failed to set read timeout");
                break;
            }
            match conn.stream.read(&mut buf) {
                Ok(0) => {
                    debug!("telnet: peer closed connection");
                    break;
                }
                Ok(n) => {
                    decoder.feed(&buf[..n], &mut data, &mut replies);
                    if !replies.is_empty() {
                        if let Err(e) = conn.stream.write_all(&replies) {
                            debug!(error = %e, "telnet: failed to send option refusal");
                        }
                        replies.clear();
                    }
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {
                    debug!("telnet: read timed out");
                    break;
                }
                Err(e) => {
                    debug!(error = %e, "telnet: read ended");
                    break;
                }
            }
        }
        data
    }
}

impl SessionTransport for TelnetTransport {
    fn choice(&self) -> TransportChoice {
        TransportChoice::LegacyShell
    }

    fn execute(&self, credentials: &Credentials, addr: SocketAddr, timeout: Duration) -> Result<RawResponse, FetchError> {
        let deadline = Instant::now() + timeout;
        let stream = TcpStream::connect_timeout(&addr, timeout).map_err(|e| FetchError::from_io("TCP connect", e))?;
        let mut conn = TelnetConnection { stream };
        conn.stream
            .set_write_timeout(Some(timeout))
            .map_err(|e| FetchError::from_io("Configuring socket", e))?;
        debug!(address = %credentials.address, %addr, "telnet connected");

        conn.stream
            .write_all(&self.login_script(credentials))
            .map_err(|e| FetchError::from_io("Sending login script", e))?;

        let data = Self::read_until_closed(&mut conn, deadline);
        let text = String::from_utf8_lossy(&data);
        debug!(bytes = data.len(), "telnet output received");
        Ok(RawResponse::from_text(&text))
    }
}
