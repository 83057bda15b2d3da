// # dynip-core
//
// Core library for the dynamic address propagation daemon.
//
// ## Architecture Overview
//
// - **AddressProbe**: Observes the current address (local interface or
//   external resolver)
// - **StateStore**: Holds the last address propagated to every destination
// - **Destination**: Receives a changed address (DNS record, templated file)
// - **Orchestrator**: Runs one probe, compare, dispatch and commit cycle
// - **Scheduler**: Runs the orchestrator immediately, then on an interval
//
// ## Flow
//
// Scheduler → Orchestrator → AddressProbe → StateStore (get)
//   → [if changed] Destinations → StateStore (set, only if all succeeded)

pub mod address;
pub mod config;
pub mod destination;
pub mod engine;
pub mod error;
pub mod state;
pub mod traits;

// Re-export core types for convenience
pub use address::{AddressFamily, ObservedAddress};
pub use config::{DestinationConfig, DynipConfig, ListenConfig, StateConfig};
pub use destination::{Destination, DnsDestination, FileDestination};
pub use engine::{CycleOutcome, CycleSettings, Orchestrator, Scheduler, SchedulerHandle};
pub use error::{Error, ProbeError, Result, StateError, UpdateError};
pub use state::{FileStateStore, MemoryStateStore};
pub use traits::{AddressProbe, DnsApi, DnsRecord, StateStore};
