// # DNS API Trait
//
// Decouples the DNS destination from the provider SDK that talks to the
// wire. The destination owns zone/record matching; the API only lists and
// rewrites records.
//
// ## Implementations
//
// - Cloudflare v4: `dynip-provider-cloudflare` crate

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::UpdateError;

/// A DNS record as reported by the provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DnsRecord {
    /// Provider-specific record ID
    pub id: String,

    /// Fully qualified record name (e.g. "dynip.example.ch")
    pub name: String,

    /// Record type ("A", "AAAA", "CNAME", ...)
    #[serde(rename = "type")]
    pub record_type: String,

    /// Record value
    pub content: String,

    /// Time-to-live in seconds (1 means automatic on some providers)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ttl: Option<u32>,

    /// Whether the provider proxies traffic for this record
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proxied: Option<bool>,
}

impl DnsRecord {
    /// Create a record with the given identity and value
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        record_type: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            record_type: record_type.into(),
            content: content.into(),
            ttl: None,
            proxied: None,
        }
    }
}

/// Trait for DNS provider APIs
///
/// Implementations perform exactly one provider request per call and never
/// retry; retries happen by construction on the next cycle.
#[async_trait]
pub trait DnsApi: Send + Sync {
    /// Resolve a zone name to the provider's zone ID
    ///
    /// Must fail with [`UpdateError::ZoneNotFound`] when no zone matches.
    async fn zone_id_by_name(&self, zone: &str) -> Result<String, UpdateError>;

    /// List the records of a zone
    async fn dns_records(&self, zone_id: &str) -> Result<Vec<DnsRecord>, UpdateError>;

    /// Replace a record (matched by `record.id`) with the given content
    async fn update_dns_record(&self, zone_id: &str, record: &DnsRecord) -> Result<(), UpdateError>;

    /// Provider name (for logging)
    fn provider_name(&self) -> &'static str;
}
