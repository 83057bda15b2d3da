//! Core traits for the dynip system
//!
//! This module defines the seams between the cycle and its collaborators.
//!
//! - [`AddressProbe`]: Observe the current address
//! - [`StateStore`]: Hold the last committed address
//! - [`DnsApi`]: Provider API used by the DNS destination

pub mod address_probe;
pub mod dns_api;
pub mod state_store;

pub use address_probe::AddressProbe;
pub use dns_api::{DnsApi, DnsRecord};
pub use state_store::StateStore;
