//! Configuration types for the dynip system
//!
//! This module defines the configuration file schema (YAML) and its
//! validation. Validation errors are fatal to startup only.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::address::AddressFamily;
use crate::error::{Error, Result};

/// Main dynip configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DynipConfig {
    /// Where and how often to observe the address
    pub listen: ListenConfig,

    /// Where the committed address is kept
    #[serde(default)]
    pub state: StateConfig,

    /// Destinations receiving the new address, in dispatch order
    #[serde(default)]
    pub destinations: Vec<DestinationConfig>,

    /// Logger settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl DynipConfig {
    /// Parse and validate a YAML configuration
    pub fn parse(source: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(source)
            .map_err(|e| Error::config(format!("invalid configuration: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a YAML configuration file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path)
            .map_err(|e| Error::config(format!("failed to read {}: {}", path.display(), e)))?;
        Self::parse(&source)
    }

    /// Validate the configuration
    ///
    /// Sections are checked in order: listener, state, destinations, logging.
    pub fn validate(&self) -> Result<()> {
        self.listen.validate()?;
        self.state.validate()?;

        if self.destinations.is_empty() {
            return Err(Error::config(
                "no destination for the address provided, need at least one",
            ));
        }
        for destination in &self.destinations {
            destination.validate()?;
        }

        self.logging.validate()
    }
}

impl fmt::Display for DynipConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}; state: {}; destinations: {}",
            self.listen,
            self.state.type_name(),
            self.destinations
                .iter()
                .map(DestinationConfig::type_name)
                .collect::<Vec<_>>()
                .join(", ")
        )
    }
}

/// Listener configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListenConfig {
    /// Network interface to monitor (e.g., "eth0")
    #[serde(default)]
    pub interface: Option<String>,

    /// Discover the externally visible address instead of reading the
    /// interface (for hosts behind NAT)
    #[serde(default)]
    pub external: bool,

    /// Address family to observe
    #[serde(default)]
    pub family: AddressFamily,

    /// Minutes between periodic checks
    #[serde(default = "default_interval")]
    pub interval: u64,

    /// Deadline for one whole probe (in seconds)
    #[serde(default = "default_timeout_secs")]
    pub probe_timeout_secs: u64,

    /// Deadline for one destination update (in seconds)
    #[serde(default = "default_timeout_secs")]
    pub update_timeout_secs: u64,
}

impl ListenConfig {
    /// Create a listener for a local interface with defaults
    pub fn new(interface: impl Into<String>) -> Self {
        Self {
            interface: Some(interface.into()),
            external: false,
            family: AddressFamily::default(),
            interval: default_interval(),
            probe_timeout_secs: default_timeout_secs(),
            update_timeout_secs: default_timeout_secs(),
        }
    }

    /// Time between periodic checks
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval.saturating_mul(60))
    }

    /// Deadline for one whole probe
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }

    /// Deadline for one destination update
    pub fn update_timeout(&self) -> Duration {
        Duration::from_secs(self.update_timeout_secs)
    }

    fn validate(&self) -> Result<()> {
        let has_interface = self.interface.as_ref().is_some_and(|i| !i.is_empty());
        if !self.external && !has_interface {
            return Err(Error::config(
                "listener: no interface provided on which the daemon monitors changes",
            ));
        }
        if self.interval == 0 {
            return Err(Error::config(
                "listener: checking period must be greater than zero (minutes)",
            ));
        }
        if self.interval > MAX_INTERVAL_MINUTES {
            return Err(Error::config(format!(
                "listener: checking period must not exceed {} minutes",
                MAX_INTERVAL_MINUTES
            )));
        }
        if self.probe_timeout_secs == 0 || self.update_timeout_secs == 0 {
            return Err(Error::config("listener: timeouts must be greater than zero"));
        }
        Ok(())
    }
}

impl fmt::Display for ListenConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "updates every: {}m; iface: {:?}; external: {}",
            self.interval,
            self.interface.as_deref().unwrap_or(""),
            self.external
        )
    }
}

/// Longest accepted checking period (one week)
pub const MAX_INTERVAL_MINUTES: u64 = 7 * 24 * 60;

fn default_interval() -> u64 {
    5
}

fn default_timeout_secs() -> u64 {
    30
}

/// State store configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StateConfig {
    /// Durable state in a single file
    File {
        /// Path to the state file
        path: PathBuf,
    },

    /// Volatile in-memory state
    #[default]
    Memory,
}

impl StateConfig {
    /// Get the backend type name
    pub fn type_name(&self) -> &'static str {
        match self {
            StateConfig::File { .. } => "file",
            StateConfig::Memory => "memory",
        }
    }

    fn validate(&self) -> Result<()> {
        match self {
            StateConfig::File { path } if path.as_os_str().is_empty() => {
                Err(Error::config("state location not provided"))
            }
            _ => Ok(()),
        }
    }
}

/// Destination configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DestinationConfig {
    /// Cloudflare DNS records
    Cloudflare {
        /// API credentials
        access: CloudflareAccess,
        /// Zone name → record to rewrite
        zones: BTreeMap<String, ZoneConfig>,
    },

    /// Rendered template file
    File {
        /// Template to render
        template: PathBuf,
        /// File receiving the rendered output
        output: PathBuf,
    },
}

impl DestinationConfig {
    /// Get the destination type name
    pub fn type_name(&self) -> &'static str {
        match self {
            DestinationConfig::Cloudflare { .. } => "cloudflare",
            DestinationConfig::File { .. } => "file",
        }
    }

    fn validate(&self) -> Result<()> {
        match self {
            DestinationConfig::Cloudflare { access, zones } => {
                access.validate()?;
                if zones.is_empty() {
                    return Err(Error::config(
                        "cloudflare: no zone to update record in provided",
                    ));
                }
                if zones.keys().any(String::is_empty) {
                    return Err(Error::config("cloudflare: zone with no name provided"));
                }
                Ok(())
            }
            DestinationConfig::File { template, output } => {
                if template.as_os_str().is_empty() {
                    return Err(Error::config("file: no input template provided"));
                }
                if output.as_os_str().is_empty() {
                    return Err(Error::config("file: no output file provided"));
                }
                Ok(())
            }
        }
    }
}

/// Cloudflare credentials
///
/// The Debug implementation never exposes secrets.
#[derive(Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CloudflareAccess {
    /// Scoped API token (bearer authentication)
    Token {
        /// API token
        token: String,
    },

    /// Legacy global API key
    Key {
        /// API key
        key: String,
        /// Account email associated with the key
        email: String,
    },
}

impl CloudflareAccess {
    /// Check that every credential field is set
    pub fn validate(&self) -> Result<()> {
        match self {
            CloudflareAccess::Token { token } if token.is_empty() => {
                Err(Error::config("cloudflare: no API token provided"))
            }
            CloudflareAccess::Key { key, .. } if key.is_empty() => {
                Err(Error::config("cloudflare: no API key provided"))
            }
            CloudflareAccess::Key { email, .. } if email.is_empty() => {
                Err(Error::config("cloudflare: no API email provided"))
            }
            _ => Ok(()),
        }
    }
}

impl fmt::Debug for CloudflareAccess {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CloudflareAccess::Token { .. } => f
                .debug_struct("Token")
                .field("token", &"<REDACTED>")
                .finish(),
            CloudflareAccess::Key { email, .. } => f
                .debug_struct("Key")
                .field("key", &"<REDACTED>")
                .field("email", email)
                .finish(),
        }
    }
}

/// Record to rewrite inside a zone
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneConfig {
    /// Record name relative to the zone; the zone apex when absent
    #[serde(default)]
    pub record: Option<String>,
}

impl ZoneConfig {
    /// Create a zone entry targeting `record.<zone>`
    pub fn record(record: impl Into<String>) -> Self {
        Self {
            record: Some(record.into()),
        }
    }

    /// Fully qualified name of the record to rewrite in `zone`
    pub fn target(&self, zone: &str) -> String {
        match self.record.as_deref() {
            Some(record) if !record.is_empty() => format!("{}.{}", record, zone),
            _ => zone.to_string(),
        }
    }
}

/// Logger configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Where logs are written: "console" or a file path
    #[serde(default = "default_log_destination")]
    pub destination: String,

    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            destination: default_log_destination(),
            level: default_log_level(),
        }
    }
}

impl LoggingConfig {
    fn validate(&self) -> Result<()> {
        match self.level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => {
                return Err(Error::config(format!(
                    "logging: level {:?} is not valid, valid levels: trace, debug, info, warn, error",
                    self.level
                )));
            }
        }
        if self.destination.is_empty() {
            return Err(Error::config("logging: no destination provided"));
        }
        Ok(())
    }
}

fn default_log_destination() -> String {
    "console".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}
