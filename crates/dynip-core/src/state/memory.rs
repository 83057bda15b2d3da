// # Memory State Store
//
// Volatile implementation of StateStore.
//
// ## Crash Behavior
//
// - The committed address is lost on restart/crash
// - The first cycle after a restart always dispatches to every destination
//
// ## When to Use
//
// - Testing environments
// - Deployments where one redundant update after a restart is harmless

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::address::ObservedAddress;
use crate::error::StateError;
use crate::traits::StateStore;

/// In-memory state store implementation
///
/// # Example
///
/// ```rust
/// use dynip_core::state::MemoryStateStore;
/// use dynip_core::{ObservedAddress, StateStore};
///
/// # tokio_test::block_on(async {
/// let store = MemoryStateStore::new();
/// store.set(&ObservedAddress::v4("1.2.3.4")).await.unwrap();
/// assert_eq!(store.get().await.unwrap(), ObservedAddress::v4("1.2.3.4"));
/// # });
/// ```
#[derive(Debug, Clone)]
pub struct MemoryStateStore {
    inner: Arc<RwLock<ObservedAddress>>,
    span: tracing::Span,
}

impl MemoryStateStore {
    /// Create a new store holding the zero value
    pub fn new() -> Self {
        Self {
            inner: Arc::default(),
            span: tracing::info_span!("state", backend = "memory"),
        }
    }

    /// Replace the logging span used by this store
    pub fn with_span(mut self, span: tracing::Span) -> Self {
        self.span = span;
        self
    }
}

impl Default for MemoryStateStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StateStore for MemoryStateStore {
    async fn get(&self) -> Result<ObservedAddress, StateError> {
        Ok(self.inner.read().await.clone())
    }

    async fn set(&self, address: &ObservedAddress) -> Result<(), StateError> {
        *self.inner.write().await = address.clone();
        self.span.in_scope(|| tracing::trace!("state held: {}", address));
        Ok(())
    }

    async fn reset(&self) -> Result<(), StateError> {
        *self.inner.write().await = ObservedAddress::default();
        self.span.in_scope(|| tracing::debug!("state cleared"));
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}
