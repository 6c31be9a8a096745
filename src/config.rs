/*!
Runtime configuration for a `DeviceMonitor`.

Ports, recognised interface prefixes, timeouts and the host key policy are all explicit
here rather than constants scattered through the transports. Every field has a default,
so an empty JSON object is a valid config.

Durations are written as human readable strings: `{"timeouts": {"probe": "2s", "session": "15s"}}`.
*/

use std::{path::Path, path::PathBuf, sync::Arc, time::Duration};

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::data_aquisition::host_key::{AcceptAnyHostKey, HostKeyVerifier, StrictHostKeys, parse_fingerprint};
use crate::error::ConfigError;
use crate::parsers::transceiver::DEFAULT_PREFIXES;

pub const DEFAULT_SSH_PORT: u16 = 22;
pub const DEFAULT_TELNET_PORT: u16 = 23;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Timeouts {
    /// Bound on each reachability probe.
    #[serde(with = "humantime_duration")]
    pub probe: Duration,
    /// Bound on connecting, logging in and reading the command output.
    #[serde(with = "humantime_duration")]
    pub session: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            probe: Duration::from_secs(5),
            session: Duration::from_secs(10),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum HostKeyPolicyConfig {
    Strict {
        #[serde(default = "default_known_hosts")]
        known_hosts: Option<PathBuf>,
        #[serde(default)]
        trusted_fingerprints: Vec<String>,
    },
    /// Accept any host key without verification. Insecure, opt-in only.
    AcceptAny,
}

impl Default for HostKeyPolicyConfig {
    fn default() -> Self {
        HostKeyPolicyConfig::Strict {
            known_hosts: default_known_hosts(),
            trusted_fingerprints: Vec::new(),
        }
    }
}

impl HostKeyPolicyConfig {
    pub fn build(&self) -> Result<Arc<dyn HostKeyVerifier>, ConfigError> {
        Ok(match self {
            HostKeyPolicyConfig::Strict {
                known_hosts,
                trusted_fingerprints,
            } => Arc::new(StrictHostKeys::new(trusted_fingerprints, known_hosts.clone())?),
            HostKeyPolicyConfig::AcceptAny => Arc::new(AcceptAnyHostKey),
        })
    }
}

fn default_known_hosts() -> Option<PathBuf> {
    std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".ssh").join("known_hosts"))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    pub secure_port: u16,
    pub legacy_port: u16,
    pub recognized_prefixes: Vec<String>,
    pub timeouts: Timeouts,
    pub host_keys: HostKeyPolicyConfig,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            secure_port: DEFAULT_SSH_PORT,
            legacy_port: DEFAULT_TELNET_PORT,
            recognized_prefixes: DEFAULT_PREFIXES.iter().map(|p| p.to_string()).collect(),
            timeouts: Timeouts::default(),
            host_keys: HostKeyPolicyConfig::default(),
        }
    }
}

impl MonitorConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: MonitorConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.secure_port == 0 || self.legacy_port == 0 {
            return Err(ConfigError::Invalid("ports must be non-zero".to_string()));
        }
        if self.secure_port == self.legacy_port {
            return Err(ConfigError::Invalid(format!(
                "SSH and Telnet ports must differ (both {})",
                self.secure_port
            )));
        }
        if self.recognized_prefixes.is_empty() {
            return Err(ConfigError::Invalid("at least one interface prefix is required".to_string()));
        }
        if self.recognized_prefixes.iter().any(|p| p.trim().is_empty()) {
            return Err(ConfigError::Invalid("interface prefixes must not be empty".to_string()));
        }
        if self.timeouts.probe.is_zero() || self.timeouts.session.is_zero() {
            return Err(ConfigError::Invalid("timeouts must be non-zero".to_string()));
        }
        if let HostKeyPolicyConfig::Strict {
            trusted_fingerprints, ..
        } = &self.host_keys
        {
            for fingerprint in trusted_fingerprints {
                parse_fingerprint(fingerprint)?;
            }
        }
        Ok(())
    }
}

mod humantime_duration {
    use super::*;

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&humantime::format_duration(*duration).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let raw = String::deserialize(deserializer)?;
        humantime::parse_duration(&raw).map_err(serde::de::Error::custom)
    }
}
