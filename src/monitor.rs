/*!
Device facade: probe, connect over the first shell that answers, parse.

This module defines:
- `DeviceMonitor`: composes a `Prober`, the two `SessionTransport`s and a `TransceiverParser`.
- `TelemetrySource`: async interface for callers living on a tokio runtime. The transports
  are blocking, so the async path runs them on the blocking pool.

Exactly one transport is attempted per call. If SSH answers the probe but then fails
(bad password, reset), that error is returned; Telnet is not tried as a fallback.
*/

use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};

use crate::config::MonitorConfig;
use crate::data_aquisition::core::{Credentials, SessionTransport, TransportChoice};
use crate::data_aquisition::probe::{Prober, TcpProber};
use crate::data_aquisition::ssh::SshTransport;
use crate::data_aquisition::telnet::TelnetTransport;
use crate::error::{ConfigError, FetchError};
use crate::parsers::transceiver::{InterfaceTelemetry, TransceiverParser};

pub type FetchResult<T> = Result<T, FetchError>;

#[derive(Clone)]
pub struct DeviceMonitor {
    config: MonitorConfig,
    prober: Arc<dyn Prober>,
    secure: Arc<dyn SessionTransport>,
    legacy: Arc<dyn SessionTransport>,
    parser: TransceiverParser,
}

impl DeviceMonitor {
    /// Builds a monitor with the real TCP prober, SSH and Telnet transports.
    pub fn new(config: MonitorConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let secure = Arc::new(SshTransport::new(config.host_keys.build()?));
        Ok(Self::with_parts(
            config,
            Arc::new(TcpProber),
            secure,
            Arc::new(TelnetTransport::new()),
        ))
    }

    pub fn with_parts(
        config: MonitorConfig,
        prober: Arc<dyn Prober>,
        secure: Arc<dyn SessionTransport>,
        legacy: Arc<dyn SessionTransport>,
    ) -> Self {
        let parser = TransceiverParser::new(config.recognized_prefixes.iter().cloned());
        Self {
            config,
            prober,
            secure,
            legacy,
            parser,
        }
    }

    /// Probes SSH, then Telnet. Returns the first that accepts a connection, together
    /// with the resolved address that answered.
    pub fn select_transport(&self, address: &str) -> Option<(TransportChoice, SocketAddr)> {
        let timeout = self.config.timeouts.probe;
        for (choice, port) in [
            (TransportChoice::SecureShell, self.config.secure_port),
            (TransportChoice::LegacyShell, self.config.legacy_port),
        ] {
            if let Some(addr) = self.prober.probe(address, port, timeout) {
                return Some((choice, addr));
            }
            debug!(address, port, %choice, "port not reachable");
        }
        None
    }

    /// Retrieves and parses the transceiver table. Blocks for up to probe + session timeouts.
    ///
    /// An empty result over Telnet is ambiguous: it may mean no transceivers are fitted, or
    /// that the login was refused. The Telnet transport cannot tell the two apart.
    pub fn fetch_telemetry(&self, credentials: &Credentials) -> FetchResult<Vec<InterfaceTelemetry>> {
        let (choice, addr) = self
            .select_transport(&credentials.address)
            .ok_or_else(|| FetchError::Unreachable {
                address: credentials.address.clone(),
                secure_port: self.config.secure_port,
                legacy_port: self.config.legacy_port,
            })?;
        let transport = match choice {
            TransportChoice::SecureShell => &self.secure,
            TransportChoice::LegacyShell => &self.legacy,
        };
        info!(address = %credentials.address, %addr, transport = %transport.choice(), "fetching transceiver telemetry");
        let response = transport.execute(credentials, addr, self.config.timeouts.session)?;
        let line_count = response.len();
        let records = self.parser.parse(response.into_lines());
        info!(lines = line_count, records = records.len(), "parsed transceiver table");
        Ok(records)
    }
}

/// Async interface for telemetry retrieval.
#[async_trait]
pub trait TelemetrySource: Send + Sync {
    async fn fetch(&self, credentials: Credentials) -> FetchResult<Vec<InterfaceTelemetry>>;
}

#[async_trait]
impl TelemetrySource for DeviceMonitor {
    async fn fetch(&self, credentials: Credentials) -> FetchResult<Vec<InterfaceTelemetry>> {
        let monitor = self.clone();
        tokio::task::spawn_blocking(move || monitor.fetch_telemetry(&credentials))
            .await
            .map_err(|e| FetchError::Task(e.to_string()))?
    }
}

/// One-shot convenience: build a monitor from `config` and fetch once.
pub fn fetch_telemetry(credentials: &Credentials, config: MonitorConfig) -> FetchResult<Vec<InterfaceTelemetry>> {
    let monitor = DeviceMonitor::new(config)?;
    monitor.fetch_telemetry(credentials)
}
