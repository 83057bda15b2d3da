// # Cloudflare DNS API
//
// Implements the `DnsApi` seam of the DNS destination against the
// Cloudflare API v4. Zone and record matching is owned by the destination;
// this crate only lists and rewrites records.
//
// ## Behavior
//
// - One HTTP request per call, except for paginated record listings
// - No retry logic: a failed call fails the destination for this cycle and
//   the next cycle retries
// - HTTP timeout of 30 seconds
// - HTTP status codes are mapped to specific errors (401/403, 404, 429, 5xx)
//
// ## Security Requirements
//
// - Credentials NEVER appear in logs or Debug output
// - Empty credentials are rejected at construction
//
// ## API Reference
//
// - List Zones: GET `/zones?name=...`
// - List DNS Records: GET `/zones/:zone_id/dns_records?page=..&per_page=..`
// - Update DNS Record: PUT `/zones/:zone_id/dns_records/:record_id`

use async_trait::async_trait;
use dynip_core::config::CloudflareAccess;
use dynip_core::{DnsApi, DnsRecord, Error, Result, UpdateError};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Cloudflare API base URL
pub const CLOUDFLARE_API_BASE: &str = "https://api.cloudflare.com/client/v4";

/// Default HTTP timeout for API requests (30 seconds)
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Records requested per page when listing a zone
const RECORDS_PER_PAGE: u32 = 100;

const PROVIDER: &str = "cloudflare";

/// Response envelope shared by all v4 endpoints
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    success: bool,
    #[serde(default)]
    errors: Vec<ApiMessage>,
    result: Option<T>,
    #[serde(default)]
    result_info: Option<ResultInfo>,
}

#[derive(Debug, Deserialize)]
struct ApiMessage {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
struct ResultInfo {
    #[serde(default)]
    total_pages: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct Zone {
    id: String,
    name: String,
}

/// Body of a record update
#[derive(Debug, Serialize)]
struct RecordUpdate<'a> {
    #[serde(rename = "type")]
    record_type: &'a str,
    name: &'a str,
    content: &'a str,
    ttl: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    proxied: Option<bool>,
}

impl<'a> From<&'a DnsRecord> for RecordUpdate<'a> {
    fn from(record: &'a DnsRecord) -> Self {
        Self {
            record_type: &record.record_type,
            name: &record.name,
            content: &record.content,
            // 1 means automatic
            ttl: record.ttl.unwrap_or(1),
            proxied: record.proxied,
        }
    }
}

/// Cloudflare API client
///
/// Stateless and single-shot: nothing is cached between calls.
pub struct CloudflareApi {
    access: CloudflareAccess,
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl CloudflareApi {
    /// Create a client for the public Cloudflare API
    pub fn new(access: CloudflareAccess) -> Result<Self> {
        Self::with_base_url(access, CLOUDFLARE_API_BASE)
    }

    /// Create a client talking to `base_url` instead of the public API
    pub fn with_base_url(access: CloudflareAccess, base_url: impl Into<String>) -> Result<Self> {
        access.validate()?;

        let client = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .map_err(|e| Error::config(format!("cloudflare: failed to build HTTP client: {}", e)))?;

        Ok(Self {
            access,
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout: DEFAULT_HTTP_TIMEOUT,
        })
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.access {
            CloudflareAccess::Token { token } => request.bearer_auth(token),
            CloudflareAccess::Key { key, email } => request
                .header("X-Auth-Key", key)
                .header("X-Auth-Email", email),
        }
    }

    /// Send a request and unwrap the v4 envelope
    async fn send<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
        what: &str,
    ) -> std::result::Result<(T, Option<ResultInfo>), UpdateError> {
        let response = self
            .authorize(request)
            .header("Content-Type", "application/json")
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    UpdateError::Timeout(self.timeout)
                } else {
                    UpdateError::provider(PROVIDER, format!("{}: HTTP request failed: {}", what, e))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error response".to_string());
            return Err(map_status(status.as_u16(), what, &error_text));
        }

        let envelope: Envelope<T> = response.json().await.map_err(|e| {
            UpdateError::provider(PROVIDER, format!("{}: failed to parse response: {}", what, e))
        })?;

        if !envelope.success {
            let messages: Vec<String> = envelope
                .errors
                .iter()
                .map(|m| format!("{} ({})", m.message, m.code))
                .collect();
            return Err(UpdateError::provider(
                PROVIDER,
                format!("{} rejected: {}", what, messages.join("; ")),
            ));
        }

        let result = envelope.result.ok_or_else(|| {
            UpdateError::provider(PROVIDER, format!("{}: response carries no result", what))
        })?;
        Ok((result, envelope.result_info))
    }
}

/// Map a non-success HTTP status to an update error
pub fn map_status(status: u16, what: &str, body: &str) -> UpdateError {
    match status {
        401 | 403 => UpdateError::Authentication(format!(
            "{}: invalid credentials or insufficient permissions (status {})",
            what, status
        )),
        404 => UpdateError::provider(PROVIDER, format!("{}: not found (status {})", what, status)),
        429 => UpdateError::RateLimited(format!("{}: status {}", what, status)),
        500..=599 => UpdateError::provider(
            PROVIDER,
            format!("{}: server error (transient): {} - {}", what, status, body),
        ),
        _ => UpdateError::provider(PROVIDER, format!("{}: {} - {}", what, status, body)),
    }
}

#[async_trait]
impl DnsApi for CloudflareApi {
    async fn zone_id_by_name(&self, zone: &str) -> std::result::Result<String, UpdateError> {
        tracing::debug!("looking up zone ID for {}", zone);

        let request = self
            .client
            .get(format!("{}/zones", self.base_url))
            .query(&[("name", zone)]);
        let (zones, _): (Vec<Zone>, _) = self.send(request, "zone lookup").await?;

        zones
            .into_iter()
            .find(|z| z.name == zone)
            .map(|z| z.id)
            .ok_or_else(|| UpdateError::ZoneNotFound(zone.to_string()))
    }

    async fn dns_records(&self, zone_id: &str) -> std::result::Result<Vec<DnsRecord>, UpdateError> {
        let url = format!("{}/zones/{}/dns_records", self.base_url, zone_id);
        let mut records = Vec::new();
        let mut page = 1;

        loop {
            let request = self.client.get(&url).query(&[
                ("page", page.to_string()),
                ("per_page", RECORDS_PER_PAGE.to_string()),
            ]);
            let (batch, info): (Vec<DnsRecord>, _) = self.send(request, "record listing").await?;
            records.extend(batch);

            let total_pages = info.and_then(|i| i.total_pages).unwrap_or(1);
            if page >= total_pages {
                break;
            }
            page += 1;
        }

        tracing::debug!("zone {} holds {} records", zone_id, records.len());
        Ok(records)
    }

    async fn update_dns_record(
        &self,
        zone_id: &str,
        record: &DnsRecord,
    ) -> std::result::Result<(), UpdateError> {
        let url = format!("{}/zones/{}/dns_records/{}", self.base_url, zone_id, record.id);
        let request = self.client.put(&url).json(&RecordUpdate::from(record));

        let _: (serde_json::Value, _) = self.send(request, "record update").await?;
        tracing::info!(
            "updated {} record {} -> {}",
            record.record_type,
            record.name,
            record.content
        );
        Ok(())
    }

    fn provider_name(&self) -> &'static str {
        PROVIDER
    }
}

// Custom Debug implementation that hides the credentials
impl std::fmt::Debug for CloudflareApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudflareApi")
            .field("access", &self.access)
            .field("base_url", &self.base_url)
            .finish()
    }
}
