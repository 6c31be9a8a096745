use std::io::Read;
use std::net::{SocketAddr, TcpStream};
use std::sync::Arc;
use std::time::Duration;

use ssh2::{DisconnectCode, ErrorCode, HashType, Session};
use tracing::debug;

use super::core::{Credentials, RawResponse, SessionTransport, TransportChoice};
use super::host_key::{HostIdentity, HostKeyDecision, HostKeyVerifier};
use super::TRANSCEIVER_COMMAND;
use crate::error::FetchError;

// libssh2 LIBSSH2_ERROR_TIMEOUT
const LIBSSH2_ERROR_TIMEOUT: i32 = -9;

/// Secure shell variant: one authenticated session, one `exec` channel.
pub struct SshTransport {
    verifier: Arc<dyn HostKeyVerifier>,
    command: String,
}

/// Disconnects the session when dropped, whichever way `execute` returns.
struct SessionGuard {
    session: Session,
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        if let Err(e) = self
            .session
            .disconnect(Some(DisconnectCode::ByApplication), "done", None)
        {
            debug!(error = %e, "ssh disconnect failed");
        }
    }
}

fn is_timeout(err: &ssh2::Error) -> bool {
    matches!(err.code(), ErrorCode::Session(LIBSSH2_ERROR_TIMEOUT))
}

fn session_error(context: &str, err: ssh2::Error) -> FetchError {
    if is_timeout(&err) {
        FetchError::ConnectTimeout(format!("{context}: {err}"))
    } else {
        FetchError::Transport(format!("{context}: {err}"))
    }
}

/// A timeout during login is still a timeout; anything else means the credentials were refused.
fn auth_error(err: ssh2::Error) -> FetchError {
    if is_timeout(&err) {
        FetchError::ConnectTimeout(format!("SSH authentication: {err}"))
    } else {
        FetchError::Authentication(err.to_string())
    }
}

impl SshTransport {
    pub fn new(verifier: Arc<dyn HostKeyVerifier>) -> Self {
        Self {
            verifier,
            command: TRANSCEIVER_COMMAND.to_string(),
        }
    }

    fn connect_sync_inner(
        &self,
        credentials: &Credentials,
        addr: SocketAddr,
        timeout: Duration,
    ) -> Result<SessionGuard, FetchError> {
        let tcp = TcpStream::connect_timeout(&addr, timeout).map_err(|e| FetchError::from_io("TCP connect", e))?;
        let mut session = Session::new().map_err(|e| session_error("SSH session", e))?;
        session.set_timeout(u32::try_from(timeout.as_millis()).unwrap_or(u32::MAX));
        session.set_tcp_stream(tcp);
        let mut guard = SessionGuard { session };

        guard
            .session
            .handshake()
            .map_err(|e| session_error("SSH handshake", e))?;
        debug!(address = %credentials.address, %addr, "ssh handshake complete");

        self.check_host_key(&guard.session, &credentials.address, addr.port())?;

        guard
            .session
            .userauth_password(&credentials.username, &credentials.password)
            .map_err(auth_error)?;
        if !guard.session.authenticated() {
            return Err(FetchError::Authentication("Authentication failed".to_string()));
        }
        debug!(address = %credentials.address, username = %credentials.username, "ssh authenticated");
        Ok(guard)
    }

    fn check_host_key(&self, session: &Session, host: &str, port: u16) -> Result<(), FetchError> {
        let (key, key_type) = session
            .host_key()
            .ok_or_else(|| FetchError::Transport("Server presented no host key".to_string()))?;
        let fingerprint = session
            .host_key_hash(HashType::Sha256)
            .map(hex::encode)
            .unwrap_or_default();
        let identity = HostIdentity {
            host: host.to_string(),
            port,
            key_type: format!("{:?}", key_type),
            key: key.to_vec(),
            fingerprint,
        };
        match self.verifier.verify(&identity) {
            HostKeyDecision::Accept => Ok(()),
            HostKeyDecision::Reject => Err(FetchError::HostKeyRejected {
                host: identity.host,
                fingerprint: identity.fingerprint,
            }),
        }
    }

    fn execute_command_sync(session: &Session, command: &str) -> Result<String, FetchError> {
        let mut channel = session
            .channel_session()
            .map_err(|e| session_error("SSH channel", e))?;
        channel.exec(command).map_err(|e| session_error("Command execution", e))?;
        let mut output = String::new();
        channel
            .read_to_string(&mut output)
            .map_err(|e| FetchError::from_io("Reading command output", e))?;
        channel.wait_close().map_err(|e| session_error("SSH channel close", e))?;
        match channel.exit_status() {
            Ok(status) => debug!(status, "ssh command exited"),
            Err(e) => debug!(error = %e, "ssh exit status unavailable"),
        }
        Ok(output)
    }
}

impl SessionTransport for SshTransport {
    fn choice(&self) -> TransportChoice {
        TransportChoice::SecureShell
    }

    fn execute(&self, credentials: &Credentials, addr: SocketAddr, timeout: Duration) -> Result<RawResponse, FetchError> {
        let guard = self.connect_sync_inner(credentials, addr, timeout)?;
        let output = Self::execute_command_sync(&guard.session, &self.command)?;
        debug!(bytes = output.len(), "ssh command output received");
        Ok(RawResponse::from_text(&output))
    }
}
