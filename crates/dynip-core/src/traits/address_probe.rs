// # Address Probe Trait
//
// Defines the interface for observing the address of the monitored interface.
//
// ## Implementations
//
// - Local interface enumeration: `dynip-probe-local` crate
// - External discovery through a public resolver: `dynip-probe-opendns` crate
//
// ## Usage
//
// ```rust,ignore
// use dynip_core::AddressProbe;
//
// #[tokio::main]
// async fn main() -> anyhow::Result<()> {
//     let probe = /* AddressProbe implementation */;
//
//     let observed = probe.probe().await?;
//     println!("{} sees {}", probe.name(), observed);
//
//     Ok(())
// }
// ```

use async_trait::async_trait;

use crate::address::ObservedAddress;
use crate::error::ProbeError;

/// Trait for address probe strategies
///
/// A probe is a pure function of its configuration: it holds no state
/// between calls and touches nothing but the network. The orchestrator does
/// not know which strategy is active.
///
/// # Deadlines
///
/// Probes may set their own internal timeouts, but the orchestrator always
/// bounds a whole probe with the configured probe deadline.
#[async_trait]
pub trait AddressProbe: Send + Sync {
    /// Observe the current address
    ///
    /// # Returns
    ///
    /// - `Ok(ObservedAddress)`: A freshly constructed observation
    /// - `Err(ProbeError)`: The address could not be determined
    async fn probe(&self) -> Result<ObservedAddress, ProbeError>;

    /// Strategy name (for logging)
    fn name(&self) -> &str;
}
