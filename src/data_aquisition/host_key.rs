/*!
Host identity verification for SSH sessions.

- `HostKeyVerifier`: decides whether the key a server presented is trusted.
- `StrictHostKeys`: the default. Trusts pinned SHA-256 fingerprints and entries of an
  OpenSSH `known_hosts` file, rejects everything else.
- `AcceptAnyHostKey`: auto-accepts any key (trust on first use without remembering).
  This is a security weakness and must be opted into explicitly.
*/

use std::{collections::HashSet, path::PathBuf};

use base64::Engine;
use base64::engine::general_purpose::STANDARD_NO_PAD;
use ssh2::{CheckResult, KnownHostFileKind, Session};
use tracing::{debug, warn};

use crate::error::ConfigError;

const SHA256_LEN: usize = 32;

/// The identity a server presented during the SSH handshake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostIdentity {
    pub host: String,
    pub port: u16,
    pub key_type: String,
    pub key: Vec<u8>,
    /// Lowercase hex SHA-256 of the host key.
    pub fingerprint: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostKeyDecision {
    Accept,
    Reject,
}

pub trait HostKeyVerifier: Send + Sync {
    fn verify(&self, identity: &HostIdentity) -> HostKeyDecision;
}

#[derive(Debug, Clone, Default)]
pub struct StrictHostKeys {
    trusted_fingerprints: HashSet<String>,
    known_hosts: Option<PathBuf>,
}

impl StrictHostKeys {
    /// Fails if any pinned fingerprint is not a SHA-256 digest in a form `parse_fingerprint` accepts.
    pub fn new<I, S>(trusted_fingerprints: I, known_hosts: Option<PathBuf>) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Ok(Self {
            trusted_fingerprints: trusted_fingerprints
                .into_iter()
                .map(|f| parse_fingerprint(f.as_ref()))
                .collect::<Result<_, _>>()?,
            known_hosts,
        })
    }

    fn check_known_hosts(&self, identity: &HostIdentity) -> Option<CheckResult> {
        let path = self.known_hosts.as_ref()?;
        if !path.exists() {
            debug!(path = %path.display(), "known_hosts file not found");
            return None;
        }
        // libssh2 only exposes known_hosts parsing through a session handle.
        let session = Session::new().ok()?;
        let mut known = session.known_hosts().ok()?;
        if let Err(e) = known.read_file(path, KnownHostFileKind::OpenSSH) {
            warn!(path = %path.display(), error = %e, "failed to read known_hosts");
            return None;
        }
        Some(known.check_port(&identity.host, identity.port, &identity.key))
    }
}

impl HostKeyVerifier for StrictHostKeys {
    fn verify(&self, identity: &HostIdentity) -> HostKeyDecision {
        if self.trusted_fingerprints.contains(&identity.fingerprint) {
            debug!(host = %identity.host, "host key matches pinned fingerprint");
            return HostKeyDecision::Accept;
        }
        match self.check_known_hosts(identity) {
            Some(CheckResult::Match) => {
                debug!(host = %identity.host, "host key found in known_hosts");
                HostKeyDecision::Accept
            }
            Some(CheckResult::Mismatch) => {
                warn!(
                    host = %identity.host,
                    fingerprint = %identity.fingerprint,
                    "host key does not match known_hosts entry"
                );
                HostKeyDecision::Reject
            }
            _ => {
                warn!(
                    host = %identity.host,
                    fingerprint = %identity.fingerprint,
                    "unknown host key rejected"
                );
                HostKeyDecision::Reject
            }
        }
    }
}

/// Accepts every host key. Opt-in only.
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptAnyHostKey;

impl HostKeyVerifier for AcceptAnyHostKey {
    fn verify(&self, identity: &HostIdentity) -> HostKeyDecision {
        warn!(
            host = %identity.host,
            port = identity.port,
            fingerprint = %identity.fingerprint,
            "accepting unverified host key"
        );
        HostKeyDecision::Accept
    }
}

/// Parses a pinned SHA-256 host key fingerprint into lowercase hex.
///
/// Two forms are accepted:
/// - OpenSSH style, `SHA256:` followed by unpadded base64 (what `ssh-keygen -lf` prints);
/// - 64 hex digits, optionally separated by colons (`aa:bb:..`).
pub fn parse_fingerprint(raw: &str) -> Result<String, ConfigError> {
    let raw = raw.trim();
    if let Some(encoded) = raw.strip_prefix("SHA256:") {
        let digest = STANDARD_NO_PAD
            .decode(encoded.trim_end_matches('='))
            .map_err(|e| ConfigError::Invalid(format!("fingerprint {raw:?} is not valid base64: {e}")))?;
        if digest.len() != SHA256_LEN {
            return Err(ConfigError::Invalid(format!(
                "fingerprint {raw:?} decodes to {} bytes, expected {SHA256_LEN}",
                digest.len()
            )));
        }
        return Ok(hex::encode(digest));
    }

    let digits: String = raw.chars().filter(|c| *c != ':').collect();
    if digits.len() == SHA256_LEN * 2 && digits.chars().all(|c| c.is_ascii_hexdigit()) {
        Ok(digits.to_ascii_lowercase())
    } else {
        Err(ConfigError::Invalid(format!(
            "fingerprint {raw:?} is neither SHA256:<base64> nor {} hex digits",
            SHA256_LEN * 2
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // SHA-256 of the empty input, in both notations.
    const EMPTY_HEX: &str = "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";
    const EMPTY_OPENSSH: &str = "SHA256:47DEQpj8HBSa+/TImW+5JCeuQeRkm5NMpJWZG3hSuFU";

    fn identity(fingerprint: &str) -> HostIdentity {
        HostIdentity {
            host: "switch1".to_string(),
            port: 22,
            key_type: "Ed255219".to_string(),
            key: vec![1, 2, 3, 4],
            fingerprint: fingerprint.to_string(),
        }
    }

    #[test]
    fn test_strict_rejects_unknown() {
        let strict = StrictHostKeys::default();
        assert_eq!(strict.verify(&identity(EMPTY_HEX)), HostKeyDecision::Reject);
    }

    #[test]
    fn test_strict_accepts_pinned_hex_fingerprint() {
        let strict = StrictHostKeys::new([EMPTY_HEX.to_ascii_uppercase()], None).unwrap();
        assert_eq!(strict.verify(&identity(EMPTY_HEX)), HostKeyDecision::Accept);

        let mut other = EMPTY_HEX.to_string();
        other.replace_range(63.., "4");
        assert_eq!(strict.verify(&identity(&other)), HostKeyDecision::Reject);
    }

    #[test]
    fn test_strict_accepts_pinned_openssh_fingerprint() {
        // The form `ssh-keygen -lf` prints must match the hex digest libssh2 reports.
        let strict = StrictHostKeys::new([EMPTY_OPENSSH], None).unwrap();
        assert_eq!(strict.verify(&identity(EMPTY_HEX)), HostKeyDecision::Accept);
    }

    #[test]
    fn test_strict_rejects_malformed_pins() {
        assert!(StrictHostKeys::new(["AB:CD:EF"], None).is_err());
        assert!(StrictHostKeys::new(["SHA256:not base64!"], None).is_err());
    }

    #[test]
    fn test_strict_missing_known_hosts_rejects() {
        let strict =
            StrictHostKeys::new(Vec::<String>::new(), Some(PathBuf::from("/nonexistent/known_hosts"))).unwrap();
        assert_eq!(strict.verify(&identity(EMPTY_HEX)), HostKeyDecision::Reject);
    }

    #[test]
    fn test_accept_any() {
        assert_eq!(AcceptAnyHostKey.verify(&identity(EMPTY_HEX)), HostKeyDecision::Accept);
    }

    #[test]
    fn test_parse_fingerprint_forms() {
        assert_eq!(parse_fingerprint(EMPTY_OPENSSH).unwrap(), EMPTY_HEX);
        assert_eq!(parse_fingerprint(&format!(" {EMPTY_OPENSSH}= ")).unwrap(), EMPTY_HEX);

        let colon_hex = EMPTY_HEX
            .as_bytes()
            .chunks(2)
            .map(|pair| std::str::from_utf8(pair).unwrap().to_ascii_uppercase())
            .collect::<Vec<_>>()
            .join(":");
        assert_eq!(parse_fingerprint(&colon_hex).unwrap(), EMPTY_HEX);
    }

    #[test]
    fn test_parse_fingerprint_rejects_wrong_length() {
        // SHA-1 sized digest
        assert!(parse_fingerprint("SHA256:2jmj7l5rSw0yVb/vlWAYkK/YBwk").is_err());
        assert!(parse_fingerprint(&EMPTY_HEX[..62]).is_err());
        assert!(parse_fingerprint("").is_err());
    }
}
