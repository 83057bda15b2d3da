//! Observed address value type
//!
//! An [`ObservedAddress`] is the result of one probe and, once committed,
//! the baseline the next probe is compared against.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::IpAddr;

/// Address family filter applied by probes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AddressFamily {
    /// Accept IPv4 and IPv6
    #[default]
    Any,
    /// IPv4 only
    V4,
    /// IPv6 only
    V6,
}

impl AddressFamily {
    /// Check whether `ip` belongs to this family
    pub fn accepts(&self, ip: &IpAddr) -> bool {
        match self {
            AddressFamily::Any => true,
            AddressFamily::V4 => ip.is_ipv4(),
            AddressFamily::V6 => ip.is_ipv6(),
        }
    }
}

/// Addresses observed on the monitored interface
///
/// Equality is exact and field-wise: an address with only `ipv4` set never
/// equals one with only `ipv6` set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObservedAddress {
    /// IPv4 address, if one was observed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ipv4: Option<String>,

    /// IPv6 address, if one was observed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ipv6: Option<String>,
}

impl ObservedAddress {
    /// Create an address from explicit fields
    pub fn new(ipv4: Option<String>, ipv6: Option<String>) -> Self {
        Self { ipv4, ipv6 }
    }

    /// Create an address holding only an IPv4 value
    pub fn v4(ip: impl Into<String>) -> Self {
        Self::new(Some(ip.into()), None)
    }

    /// Create an address holding only an IPv6 value
    pub fn v6(ip: impl Into<String>) -> Self {
        Self::new(None, Some(ip.into()))
    }

    /// Classify a single probed IP into the matching field
    pub fn from_ip(ip: IpAddr) -> Self {
        match ip {
            IpAddr::V4(v4) => Self::v4(v4.to_string()),
            IpAddr::V6(v6) => Self::v6(v6.to_string()),
        }
    }

    /// The zero value: nothing observed
    pub fn is_empty(&self) -> bool {
        self.ipv4.is_none() && self.ipv6.is_none()
    }

    /// Address handed to destinations, IPv4 first
    pub fn primary(&self) -> Option<&str> {
        self.ipv4.as_deref().or(self.ipv6.as_deref())
    }
}

impl fmt::Display for ObservedAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const EMPTY: &str = "<EMPTY>";
        write!(
            f,
            "v4={}, v6={}",
            self.ipv4.as_deref().unwrap_or(EMPTY),
            self.ipv6.as_deref().unwrap_or(EMPTY)
        )
    }
}

/// Check whether two observed addresses are identical
///
/// Used by the cycle to decide whether propagation is needed.
pub fn equal(a: &ObservedAddress, b: &ObservedAddress) -> bool {
    a.ipv4 == b.ipv4 && a.ipv6 == b.ipv6
}
