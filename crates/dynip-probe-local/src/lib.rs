// # Local Interface Probe
//
// Reads the address currently assigned to a named network interface.
//
// ## Selection
//
// - Entries of other interfaces are ignored
// - Unspecified, loopback, multicast and link-local addresses are skipped
// - The first remaining address of the configured family wins, in the
//   order the operating system reports them
//
// An interface counts as present when any entry carries its name, even one
// without an address.
//
// ## Platform Support
//
// Interface enumeration uses `getifaddrs(3)` and is only available on
// Unix. Elsewhere the probe reports the interface as missing.

use async_trait::async_trait;
use dynip_core::{AddressFamily, AddressProbe, ObservedAddress, ProbeError};
use std::net::IpAddr;

/// One interface entry: name and optional address
pub type InterfaceEntry = (String, Option<IpAddr>);

/// Probe reading a local interface
#[derive(Debug, Clone)]
pub struct LocalInterfaceProbe {
    interface: String,
    family: AddressFamily,
    span: tracing::Span,
}

impl LocalInterfaceProbe {
    /// Create a probe for `interface`
    pub fn new(interface: impl Into<String>, family: AddressFamily) -> Self {
        let interface = interface.into();
        let span = tracing::info_span!("probe", interface = %interface);
        Self {
            interface,
            family,
            span,
        }
    }

    /// Replace the logging span used by this probe
    pub fn with_span(mut self, span: tracing::Span) -> Self {
        self.span = span;
        self
    }
}

#[async_trait]
impl AddressProbe for LocalInterfaceProbe {
    async fn probe(&self) -> Result<ObservedAddress, ProbeError> {
        self.span.in_scope(|| -> Result<ObservedAddress, ProbeError> {
            let entries = interface_entries()?;
            let address = select_address(&entries, &self.interface, self.family)?;
            tracing::debug!("address on {}: {}", self.interface, address);
            Ok(address)
        })
    }

    fn name(&self) -> &str {
        &self.interface
    }
}

/// Whether `ip` is usable as a propagated address
pub fn is_usable(ip: &IpAddr) -> bool {
    if ip.is_unspecified() || ip.is_loopback() || ip.is_multicast() {
        return false;
    }
    match ip {
        IpAddr::V4(v4) => !v4.is_link_local(),
        // fe80::/10
        IpAddr::V6(v6) => (v6.segments()[0] & 0xffc0) != 0xfe80,
    }
}

/// Pick the address of `interface` from enumerated entries
pub fn select_address(
    entries: &[InterfaceEntry],
    interface: &str,
    family: AddressFamily,
) -> Result<ObservedAddress, ProbeError> {
    let mut present = false;

    for (name, address) in entries {
        if name != interface {
            continue;
        }
        present = true;

        if let Some(ip) = address
            && family.accepts(ip)
            && is_usable(ip)
        {
            return Ok(ObservedAddress::from_ip(*ip));
        }
    }

    if present {
        Err(ProbeError::NoAddress(interface.to_string()))
    } else {
        Err(ProbeError::InterfaceNotFound(interface.to_string()))
    }
}

#[cfg(unix)]
fn interface_entries() -> Result<Vec<InterfaceEntry>, ProbeError> {
    use std::net::{SocketAddrV4, SocketAddrV6};

    let addresses = nix::ifaddrs::getifaddrs().map_err(std::io::Error::from)?;

    Ok(addresses
        .map(|ifaddr| {
            let ip = ifaddr.address.as_ref().and_then(|storage| {
                if let Some(sin) = storage.as_sockaddr_in() {
                    Some(IpAddr::V4(*SocketAddrV4::from(*sin).ip()))
                } else {
                    storage
                        .as_sockaddr_in6()
                        .map(|sin6| IpAddr::V6(*SocketAddrV6::from(*sin6).ip()))
                }
            });
            (ifaddr.interface_name, ip)
        })
        .collect())
}

#[cfg(not(unix))]
fn interface_entries() -> Result<Vec<InterfaceEntry>, ProbeError> {
    Ok(Vec::new())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(name: &str, ip: Option<&str>) -> InterfaceEntry {
        (name.to_string(), ip.map(|ip| ip.parse().unwrap()))
    }

    #[test]
    fn test_first_usable_address_wins() {
        let entries = vec![
            entry("lo", Some("127.0.0.1")),
            entry("eth0", None),
            entry("eth0", Some("fe80::1")),
            entry("eth0", Some("192.168.1.10")),
            entry("eth0", Some("192.168.1.11")),
            entry("eth1", Some("10.0.0.1")),
        ];

        let address = select_address(&entries, "eth0", AddressFamily::Any).unwrap();
        assert_eq!(address, ObservedAddress::v4("192.168.1.10"));
    }

    #[test]
    fn test_family_filter_applies() {
        let entries = vec![
            entry("eth0", Some("192.168.1.10")),
            entry("eth0", Some("2001:db8::10")),
        ];

        assert_eq!(
            select_address(&entries, "eth0", AddressFamily::V6).unwrap(),
            ObservedAddress::v6("2001:db8::10")
        );
        assert_eq!(
            select_address(&entries, "eth0", AddressFamily::V4).unwrap(),
            ObservedAddress::v4("192.168.1.10")
        );
    }

    #[test]
    fn test_missing_interface() {
        let entries = vec![entry("eth1", Some("10.0.0.1"))];
        let err = select_address(&entries, "eth0", AddressFamily::Any).unwrap_err();
        assert!(matches!(err, ProbeError::InterfaceNotFound(name) if name == "eth0"));
    }

    #[test]
    fn test_interface_without_usable_address() {
        let entries = vec![
            entry("wg0", None),
            entry("wg0", Some("169.254.0.3")),
            entry("wg0", Some("fe80::abcd")),
        ];
        let err = select_address(&entries, "wg0", AddressFamily::Any).unwrap_err();
        assert!(matches!(err, ProbeError::NoAddress(name) if name == "wg0"));
    }

    #[test]
    fn test_usable_classification() {
        for raw in ["0.0.0.0", "127.0.0.1", "224.0.0.1", "169.254.1.1", "::", "::1", "ff02::1", "fe80::1"] {
            let ip: IpAddr = raw.parse().unwrap();
            assert!(!is_usable(&ip), "{raw} should be skipped");
        }
        for raw in ["192.168.1.1", "203.0.113.5", "2001:db8::1", "fd00::1"] {
            let ip: IpAddr = raw.parse().unwrap();
            assert!(is_usable(&ip), "{raw} should be usable");
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_probe_unknown_interface() {
        let probe = LocalInterfaceProbe::new("dynip-test-none0", AddressFamily::Any);
        let err = probe.probe().await.unwrap_err();
        assert!(matches!(err, ProbeError::InterfaceNotFound(_)), "got {err:?}");
    }
}
