//! Propagation cycle
//!
//! The [`Orchestrator`] runs one cycle per invocation:
//!
//! ```text
//! ┌──────────────┐   candidate   ┌──────────────┐   changed?   ┌──────────────┐
//! │ AddressProbe │──────────────▶│  StateStore  │─────────────▶│ Destinations │
//! │   (probe)    │               │    (get)     │              │  (fan-out)   │
//! └──────────────┘               └──────────────┘              └──────────────┘
//!                                                                      │
//!                                       commit only if all succeeded   │
//!                                ┌──────────────┐                      │
//!                                │  StateStore  │◀─────────────────────┘
//!                                │    (set)     │
//!                                └──────────────┘
//! ```
//!
//! ## Commit Policy
//!
//! - All destinations succeeded: the candidate is committed
//! - Some or all failed: nothing is committed, so the next cycle sees the
//!   same difference and re-dispatches to every destination
//!
//! Destinations are therefore required to be idempotent.
//!
//! ## Error Handling
//!
//! No error escapes a cycle. Probe failures reset the store, store read
//! failures degrade to "nothing committed", destination failures are
//! aggregated into the [`CycleOutcome`].

pub mod scheduler;

pub use scheduler::{Scheduler, SchedulerHandle};

use std::time::Duration;
use tokio::time::{Instant, timeout};
use tracing::{Instrument, debug, error, info, warn};

use crate::address::{self, ObservedAddress};
use crate::config::ListenConfig;
use crate::destination::Destination;
use crate::error::{ProbeError, UpdateError};
use crate::traits::{AddressProbe, StateStore};

/// Deadlines applied within a cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleSettings {
    /// Upper bound for one probe
    pub probe_timeout: Duration,
    /// Upper bound for one destination update
    pub update_timeout: Duration,
}

impl Default for CycleSettings {
    fn default() -> Self {
        Self {
            probe_timeout: Duration::from_secs(30),
            update_timeout: Duration::from_secs(30),
        }
    }
}

impl From<&ListenConfig> for CycleSettings {
    fn from(listen: &ListenConfig) -> Self {
        Self {
            probe_timeout: listen.probe_timeout(),
            update_timeout: listen.update_timeout(),
        }
    }
}

/// How a cycle ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// The probe failed; the store was reset
    ProbeFailed,

    /// The probed address equals the committed one; nothing dispatched
    Unchanged,

    /// Every destination accepted the address
    Propagated {
        address: ObservedAddress,
        elapsed: Duration,
        /// Whether the commit reached the store
        persisted: bool,
    },

    /// Some destinations failed; nothing committed
    PartialFailure {
        address: ObservedAddress,
        failed: Vec<String>,
        succeeded: Vec<String>,
        elapsed: Duration,
    },

    /// Every destination failed; nothing committed
    AllFailed {
        address: ObservedAddress,
        elapsed: Duration,
    },
}

impl CycleOutcome {
    /// Whether this cycle advanced the committed state
    pub fn committed(&self) -> bool {
        matches!(self, CycleOutcome::Propagated { persisted: true, .. })
    }
}

/// Runs propagation cycles
///
/// Owns the probe, the state store and the destinations for its whole
/// lifetime. Cycles are never run concurrently: the [`Scheduler`] drives a
/// single orchestrator from a single task.
pub struct Orchestrator {
    probe: Box<dyn AddressProbe>,
    store: Box<dyn StateStore>,
    destinations: Vec<Destination>,
    settings: CycleSettings,
    span: tracing::Span,
}

impl Orchestrator {
    /// Create an orchestrator and load the committed state
    ///
    /// Loading is best effort: a store that cannot be read is reset and the
    /// orchestrator starts with nothing committed.
    pub async fn new(
        probe: Box<dyn AddressProbe>,
        store: Box<dyn StateStore>,
        destinations: Vec<Destination>,
        settings: CycleSettings,
    ) -> Self {
        let span = tracing::info_span!("cycle", probe = %probe.name());

        match store.get().await {
            Ok(committed) if committed.is_empty() => {
                debug!("no committed state found");
            }
            Ok(committed) => {
                info!("loaded committed state: {}", committed);
            }
            Err(e) => {
                debug!("failed to load state, starting empty: {}", e);
                if let Err(e) = store.reset().await {
                    warn!("failed to reset {} state: {}", store.backend(), e);
                }
            }
        }

        Self {
            probe,
            store,
            destinations,
            settings,
            span,
        }
    }

    /// Names of the configured destinations, in dispatch order
    pub fn destination_names(&self) -> Vec<&str> {
        self.destinations.iter().map(Destination::name).collect()
    }

    /// Run one probe, compare, dispatch and commit pass
    pub async fn run_cycle(&self) -> CycleOutcome {
        self.cycle().instrument(self.span.clone()).await
    }

    async fn cycle(&self) -> CycleOutcome {
        let candidate = match self.probe_once().await {
            Ok(candidate) => candidate,
            Err(e) => {
                error!("failed to probe address: {}", e);
                if let Err(e) = self.store.reset().await {
                    warn!("failed to reset state: {}", e);
                }
                return CycleOutcome::ProbeFailed;
            }
        };

        let stored = match self.store.get().await {
            Ok(stored) => stored,
            Err(e) => {
                warn!("failed to read committed state, treating as empty: {}", e);
                ObservedAddress::default()
            }
        };

        if address::equal(&stored, &candidate) {
            debug!("address unchanged: {}", candidate);
            return CycleOutcome::Unchanged;
        }

        // Non-empty after probe_once
        let Some(ip) = candidate.primary() else {
            return CycleOutcome::ProbeFailed;
        };

        info!("address changed: {} -> {}", stored, candidate);
        self.dispatch(ip, candidate.clone()).await
    }

    async fn probe_once(&self) -> Result<ObservedAddress, ProbeError> {
        let probe_timeout = self.settings.probe_timeout;
        let candidate = timeout(probe_timeout, self.probe.probe())
            .await
            .map_err(|_| ProbeError::Timeout(probe_timeout))??;

        if candidate.is_empty() {
            return Err(ProbeError::NoAddress(self.probe.name().to_string()));
        }
        debug!("probed address: {}", candidate);
        Ok(candidate)
    }

    async fn dispatch(&self, ip: &str, candidate: ObservedAddress) -> CycleOutcome {
        let start = Instant::now();
        let mut succeeded = Vec::new();
        let mut failed = Vec::new();

        for destination in &self.destinations {
            match self.update_one(destination, ip).await {
                Ok(()) => {
                    debug!("updated {}", destination.name());
                    succeeded.push(destination.name().to_string());
                }
                Err(e) => {
                    warn!("failed to update {}: {}", destination.name(), e);
                    failed.push(destination.name().to_string());
                }
            }
        }

        let elapsed = start.elapsed();
        debug!("dispatch took {:?}", elapsed);

        if failed.is_empty() {
            let persisted = match self.store.set(&candidate).await {
                Ok(()) => true,
                Err(e) => {
                    warn!("failed to persist {}: {}", candidate, e);
                    false
                }
            };
            info!(
                "propagated {} to {} destinations in {:?}",
                candidate,
                succeeded.len(),
                elapsed
            );
            return CycleOutcome::Propagated {
                address: candidate,
                elapsed,
                persisted,
            };
        }

        if succeeded.is_empty() {
            error!(
                "all {} destinations failed to apply {} ({:?}), will retry next cycle",
                failed.len(),
                candidate,
                elapsed
            );
            return CycleOutcome::AllFailed {
                address: candidate,
                elapsed,
            };
        }

        warn!(
            "{} of {} destinations failed to apply {} ({:?}): {}",
            failed.len(),
            self.destinations.len(),
            candidate,
            elapsed,
            failed.join(", ")
        );
        CycleOutcome::PartialFailure {
            address: candidate,
            failed,
            succeeded,
            elapsed,
        }
    }

    async fn update_one(&self, destination: &Destination, ip: &str) -> Result<(), UpdateError> {
        let update_timeout = self.settings.update_timeout;
        timeout(update_timeout, destination.update(ip))
            .await
            .map_err(|_| UpdateError::Timeout(update_timeout))?
    }
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("probe", &self.probe.name())
            .field("store", &self.store.backend())
            .field("destinations", &self.destination_names())
            .field("settings", &self.settings)
            .finish()
    }
}
