/*!
SFP transceiver telemetry from switch CLIs.

Probes a switch for SSH (falling back to Telnet when SSH is not listening), runs
`show interface transceiver`, and turns the vendor table into `InterfaceTelemetry` records.

```rust,no_run
use sfp_monitor::{Credentials, DeviceMonitor, MonitorConfig};

let monitor = DeviceMonitor::new(MonitorConfig::default())?;
for record in monitor.fetch_telemetry(&Credentials::new("10.0.0.2", "admin", "secret"))? {
    println!("{} {} dBm", record.name, record.rx_power_dbm);
}
# Ok::<(), sfp_monitor::FetchError>(())
```
*/

pub mod config;
pub mod data_aquisition;
pub mod error;
pub mod monitor;
pub mod parsers;

pub use config::{HostKeyPolicyConfig, MonitorConfig, Timeouts};
pub use data_aquisition::core::{Credentials, RawResponse, SessionTransport, TransportChoice};
pub use data_aquisition::host_key::{AcceptAnyHostKey, HostIdentity, HostKeyDecision, HostKeyVerifier, StrictHostKeys};
pub use data_aquisition::probe::{Prober, TcpProber, probe};
pub use error::{ConfigError, FetchError};
pub use monitor::{DeviceMonitor, TelemetrySource, fetch_telemetry};
pub use parsers::transceiver::{InterfaceTelemetry, Measurement, TransceiverParser};
