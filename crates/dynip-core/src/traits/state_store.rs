// # State Store Trait
//
// Defines the interface for holding the last committed address.
//
// ## Purpose
//
// The stored value is "the last address successfully propagated to all
// destinations". It is only advanced by a commit after a fully successful
// dispatch, and cleared when a probe fails.
//
// ## Implementations
//
// - Volatile: `MemoryStateStore`
// - Durable: `FileStateStore` (JSON file, write-then-rename)

use async_trait::async_trait;

use crate::address::ObservedAddress;
use crate::error::StateError;

/// Trait for state store implementations
///
/// # Ownership
///
/// A store is exclusively owned by one orchestrator for the lifetime of the
/// process. Implementations need not coordinate with other writers.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Get the committed address
    ///
    /// # Returns
    ///
    /// - `Ok(ObservedAddress)`: The committed address, or the zero value if
    ///   nothing was committed yet
    /// - `Err(StateError)`: The backing storage could not be read
    async fn get(&self) -> Result<ObservedAddress, StateError>;

    /// Commit a new address
    async fn set(&self, address: &ObservedAddress) -> Result<(), StateError>;

    /// Clear the committed address back to the zero value
    async fn reset(&self) -> Result<(), StateError>;

    /// Backend name (for logging)
    fn backend(&self) -> &'static str;
}
