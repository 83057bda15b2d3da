// # State Store Implementations
//
// The set of backends is closed: volatile memory or a durable file.

pub mod file;
pub mod memory;

pub use file::FileStateStore;
pub use memory::MemoryStateStore;

use crate::config::StateConfig;
use crate::error::Result;
use crate::traits::StateStore;

/// Build the configured state store, logging inside `span`
///
/// Failing to open the store is a construction-time error and prevents the
/// daemon from starting.
pub async fn open(config: &StateConfig, span: tracing::Span) -> Result<Box<dyn StateStore>> {
    match config {
        StateConfig::Memory => Ok(Box::new(MemoryStateStore::new().with_span(span))),
        StateConfig::File { path } => {
            Ok(Box::new(FileStateStore::open(path).await?.with_span(span)))
        }
    }
}
