//! Destinations receiving the new address
//!
//! The set of destinations is closed: a DNS record updater and a templated
//! file updater. New kinds are added by extending [`Destination`].
//!
//! Every `update` must be idempotent. A partially failed cycle is not
//! committed, so destinations that already succeeded receive the same
//! address again on the next cycle.

pub mod dns;
pub mod file;

pub use dns::DnsDestination;
pub use file::{FileDestination, FileOutput};

use crate::error::UpdateError;

/// A configured destination
#[derive(Debug)]
pub enum Destination {
    /// DNS record updater
    Dns(DnsDestination),
    /// Templated file updater
    File(FileDestination),
}

impl Destination {
    /// Human-readable identifier (for logging)
    pub fn name(&self) -> &str {
        match self {
            Destination::Dns(dns) => dns.name(),
            Destination::File(file) => file.name(),
        }
    }

    /// Apply `address` to this destination
    pub async fn update(&self, address: &str) -> Result<(), UpdateError> {
        match self {
            Destination::Dns(dns) => dns.update(address).await,
            Destination::File(file) => file.update(address).await,
        }
    }
}

impl From<DnsDestination> for Destination {
    fn from(dns: DnsDestination) -> Self {
        Destination::Dns(dns)
    }
}

impl From<FileDestination> for Destination {
    fn from(file: FileDestination) -> Self {
        Destination::File(file)
    }
}
