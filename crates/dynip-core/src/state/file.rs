// # File State Store
//
// Durable implementation of StateStore.
//
// ## Crash Safety
//
// - Atomic writes: the record is written to a sibling temporary file,
//   flushed, then renamed over the state file
// - A crash mid-write leaves either the old or the new record, never a
//   truncated one
//
// ## File Format
//
// ```json
// {
//   "ipv4": "1.2.3.4",
//   "ipv6": "2001:db8::1"
// }
// ```
//
// Absent fields mean the family was never observed. A missing file is the
// zero value.

use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::Instrument;

use crate::address::ObservedAddress;
use crate::error::StateError;
use crate::traits::StateStore;

/// File-based state store
///
/// The file is only touched by this process; no external-writer
/// coordination is attempted.
///
/// # Example
///
/// ```rust,no_run
/// use dynip_core::state::FileStateStore;
/// use dynip_core::{ObservedAddress, StateStore};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let store = FileStateStore::open("/var/lib/dynip/state.json").await?;
///
///     store.set(&ObservedAddress::v4("1.2.3.4")).await?;
///     assert_eq!(store.get().await?, ObservedAddress::v4("1.2.3.4"));
///
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct FileStateStore {
    path: PathBuf,
    span: tracing::Span,
}

impl FileStateStore {
    /// Open a state file, creating its parent directory if needed
    ///
    /// The file itself is not read here; loading is best effort and owned
    /// by the orchestrator.
    pub async fn open<P: AsRef<Path>>(path: P) -> Result<Self, StateError> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| StateError::io(parent, e))?;
        }

        let span = tracing::info_span!("state", backend = "file", path = %path.display());
        Ok(Self { path, span })
    }

    /// Replace the logging span used by this store
    pub fn with_span(mut self, span: tracing::Span) -> Self {
        self.span = span;
        self
    }

    /// Path of the state file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Path of the temporary file used for atomic writes
    fn temp_path(&self) -> PathBuf {
        let mut name = self.path.file_name().unwrap_or_default().to_os_string();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    async fn write_atomic(&self, address: &ObservedAddress) -> Result<(), StateError> {
        let json = serde_json::to_vec_pretty(address)?;

        let temp_path = self.temp_path();
        {
            let mut file = fs::File::create(&temp_path)
                .await
                .map_err(|e| StateError::io(&temp_path, e))?;
            file.write_all(&json)
                .await
                .map_err(|e| StateError::io(&temp_path, e))?;
            file.sync_all()
                .await
                .map_err(|e| StateError::io(&temp_path, e))?;
        }

        fs::rename(&temp_path, &self.path)
            .await
            .map_err(|e| StateError::io(&self.path, e))?;

        tracing::trace!("state written: {}", address);
        Ok(())
    }
}

#[async_trait]
impl StateStore for FileStateStore {
    async fn get(&self) -> Result<ObservedAddress, StateError> {
        let content = match fs::read(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Ok(ObservedAddress::default());
            }
            Err(e) => return Err(StateError::io(&self.path, e)),
        };

        serde_json::from_slice(&content).map_err(|source| StateError::Corrupt {
            path: self.path.clone(),
            source,
        })
    }

    async fn set(&self, address: &ObservedAddress) -> Result<(), StateError> {
        self.write_atomic(address)
            .instrument(self.span.clone())
            .await
    }

    async fn reset(&self) -> Result<(), StateError> {
        match fs::remove_file(&self.path).await {
            Ok(()) => {
                self.span.in_scope(|| tracing::debug!("state file removed"));
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StateError::io(&self.path, e)),
        }
    }

    fn backend(&self) -> &'static str {
        "file"
    }
}
