use std::{
    net::{Shutdown, SocketAddr, TcpStream, ToSocketAddrs},
    time::{Duration, Instant},
};

use tracing::debug;

/// Decides whether a port answers before committing to a full session.
pub trait Prober: Send + Sync {
    /// The socket address that accepted a connection, if any. Sessions connect to
    /// this exact address so they talk to the same host the probe reached.
    fn probe(&self, address: &str, port: u16, timeout: Duration) -> Option<SocketAddr>;
}

/// Plain TCP connect probe.
#[derive(Debug, Clone, Copy, Default)]
pub struct TcpProber;

impl Prober for TcpProber {
    fn probe(&self, address: &str, port: u16, timeout: Duration) -> Option<SocketAddr> {
        reachable_addr(address, port, timeout)
    }
}

/// Resolves `address:port` (IP literal or DNS name) into socket addresses.
fn resolve(address: &str, port: u16) -> std::io::Result<Vec<SocketAddr>> {
    if let Ok(ip) = address.parse::<std::net::IpAddr>() {
        return Ok(vec![SocketAddr::new(ip, port)]);
    }
    Ok((address, port).to_socket_addrs()?.collect())
}

/// Returns true iff a TCP connection to `address:port` is established within `timeout`.
/// The connection is shut down right away and no data is exchanged.
/// Every failure (resolution, refusal, timeout) is reported as `false`.
pub fn probe(address: &str, port: u16, timeout: Duration) -> bool {
    reachable_addr(address, port, timeout).is_some()
}

/// Like `probe`, but reports which resolved address answered.
pub fn reachable_addr(address: &str, port: u16, timeout: Duration) -> Option<SocketAddr> {
    match resolve(address, port) {
        Ok(addrs) => first_reachable(&addrs, timeout),
        Err(e) => {
            debug!(address, port, error = %e, "probe: address resolution failed");
            None
        }
    }
}

/// Tries `addrs` in order. All attempts share one deadline, so the whole call
/// finishes within `timeout` however many addresses a name resolves to.
pub fn first_reachable(addrs: &[SocketAddr], timeout: Duration) -> Option<SocketAddr> {
    let deadline = Instant::now() + timeout;
    for addr in addrs {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            debug!(%addr, "probe: deadline reached before trying address");
            break;
        }
        match TcpStream::connect_timeout(addr, remaining) {
            Ok(stream) => {
                _ = stream.shutdown(Shutdown::Both);
                debug!(%addr, "probe: port open");
                return Some(*addr);
            }
            Err(e) => {
                debug!(%addr, error = %e, "probe: connect failed");
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::TcpListener;

    fn closed_port() -> u16 {
        // Bind then drop to get a port nobody is listening on.
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    }

    #[test]
    fn test_probe_open_port() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        assert!(probe("127.0.0.1", port, Duration::from_secs(2)));
        assert_eq!(
            TcpProber.probe("127.0.0.1", port, Duration::from_secs(2)),
            Some(listener.local_addr().unwrap())
        );
    }

    #[test]
    fn test_probe_closed_port_returns_false_quickly() {
        let timeout = Duration::from_millis(500);
        let start = Instant::now();
        assert!(!probe("127.0.0.1", closed_port(), timeout));
        assert!(start.elapsed() < timeout + Duration::from_secs(1));
    }

    #[test]
    fn test_probe_unresolvable_host() {
        assert_eq!(TcpProber.probe("no-such-host.invalid", 22, Duration::from_millis(200)), None);
    }

    #[test]
    fn test_reports_the_address_that_answered() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let open = listener.local_addr().unwrap();
        let dead = SocketAddr::from(([127, 0, 0, 1], closed_port()));

        assert_eq!(first_reachable(&[dead, open], Duration::from_secs(2)), Some(open));
        assert_eq!(first_reachable(&[dead], Duration::from_secs(2)), None);
    }

    #[test]
    fn test_many_addresses_share_one_deadline() {
        // Non-routable addresses either hang until the timeout or fail fast;
        // both must stay inside a single timeout overall.
        let blackholes: Vec<SocketAddr> = (1..=4)
            .map(|i| SocketAddr::from(([10, 255, 255, i], 22)))
            .collect();
        let timeout = Duration::from_millis(400);
        let start = Instant::now();
        assert_eq!(first_reachable(&blackholes, timeout), None);
        assert!(start.elapsed() < timeout + Duration::from_millis(500));
    }
}
