use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use sfp_monitor::{Credentials, DeviceMonitor, HostKeyPolicyConfig, MonitorConfig, TelemetrySource};
use tracing::error;
use tracing_subscriber::EnvFilter;

const PASSWORD_ENV: &str = "SFP_MONITOR_PASSWORD";

/// Prints SFP transceiver telemetry from a switch as JSON lines.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// Switch address (IP or hostname)
    address: String,
    /// Login username. The password is read from SFP_MONITOR_PASSWORD.
    #[arg(short, long)]
    username: String,
    /// JSON config file
    #[arg(short, long)]
    config: Option<PathBuf>,
    #[arg(long)]
    ssh_port: Option<u16>,
    #[arg(long)]
    telnet_port: Option<u16>,
    /// e.g. "2s", "500ms"
    #[arg(long, value_parser = humantime::parse_duration)]
    probe_timeout: Option<Duration>,
    #[arg(long, value_parser = humantime::parse_duration)]
    session_timeout: Option<Duration>,
    /// Interface name prefix to treat as a table row (repeatable, replaces the defaults)
    #[arg(long = "prefix")]
    prefixes: Vec<String>,
    /// Accept any SSH host key without verification (insecure)
    #[arg(long)]
    accept_unknown_host_keys: bool,
}

impl Args {
    fn build_config(&self) -> Result<MonitorConfig, sfp_monitor::ConfigError> {
        let mut config = match &self.config {
            Some(path) => MonitorConfig::load(path)?,
            None => MonitorConfig::default(),
        };
        if let Some(port) = self.ssh_port {
            config.secure_port = port;
        }
        if let Some(port) = self.telnet_port {
            config.legacy_port = port;
        }
        if let Some(timeout) = self.probe_timeout {
            config.timeouts.probe = timeout;
        }
        if let Some(timeout) = self.session_timeout {
            config.timeouts.session = timeout;
        }
        if !self.prefixes.is_empty() {
            config.recognized_prefixes = self.prefixes.clone();
        }
        if self.accept_unknown_host_keys {
            config.host_keys = HostKeyPolicyConfig::AcceptAny;
        }
        config.validate()?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let config = match args.build_config() {
        Ok(config) => config,
        Err(e) => {
            error!("{}", e);
            return ExitCode::from(2);
        }
    };
    let password = match std::env::var(PASSWORD_ENV) {
        Ok(password) => password,
        Err(e) => {
            error!("{} must hold the login password: {}", PASSWORD_ENV, e);
            return ExitCode::from(2);
        }
    };
    let credentials = Credentials::new(args.address.clone(), args.username.clone(), password);

    let monitor = match DeviceMonitor::new(config) {
        Ok(monitor) => monitor,
        Err(e) => {
            error!("{}", e);
            return ExitCode::from(2);
        }
    };

    match monitor.fetch(credentials).await {
        Ok(records) => {
            for record in records {
                match serde_json::to_string(&record) {
                    Ok(line) => println!("{}", line),
                    Err(e) => error!("Error serializing record: {}", e),
                }
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
