//! DNS record destination
//!
//! For every configured zone the destination resolves the zone, lists its
//! records and rewrites the first address record whose name matches
//! `<record>.<zone>` (or `<zone>` when no record is configured). The record
//! type follows the address family: `A` for IPv4, `AAAA` for IPv6.

use std::collections::BTreeMap;
use std::fmt;
use std::net::IpAddr;
use tracing::Instrument;

use crate::config::ZoneConfig;
use crate::error::UpdateError;
use crate::traits::DnsApi;

/// Updates address records through a provider API
pub struct DnsDestination {
    name: String,
    zones: BTreeMap<String, ZoneConfig>,
    api: Box<dyn DnsApi>,
    span: tracing::Span,
}

impl DnsDestination {
    /// Create a destination for the given zones
    pub fn new(zones: BTreeMap<String, ZoneConfig>, api: Box<dyn DnsApi>) -> Self {
        let zone_names: Vec<&str> = zones.keys().map(String::as_str).collect();
        let name = format!("{} updater ({})", api.provider_name(), zone_names.join(", "));
        let span = tracing::info_span!("destination", name = %name);
        Self {
            name,
            zones,
            api,
            span,
        }
    }

    /// Replace the logging span used by this destination
    pub fn with_span(mut self, span: tracing::Span) -> Self {
        self.span = span;
        self
    }

    /// Human-readable identifier
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Rewrite the configured records to `address`
    ///
    /// Zones are processed in name order; the first failing zone aborts the
    /// update.
    pub async fn update(&self, address: &str) -> Result<(), UpdateError> {
        self.update_zones(address)
            .instrument(self.span.clone())
            .await
    }

    async fn update_zones(&self, address: &str) -> Result<(), UpdateError> {
        let ip: IpAddr = address
            .parse()
            .map_err(|_| UpdateError::InvalidAddress(address.to_string()))?;
        let record_type = match ip {
            IpAddr::V4(_) => "A",
            IpAddr::V6(_) => "AAAA",
        };

        let mut updated = 0;
        for (zone, zone_config) in &self.zones {
            tracing::debug!("updating zone: {}", zone);

            let zone_id = self.api.zone_id_by_name(zone).await?;
            let records = self.api.dns_records(&zone_id).await?;

            let target = zone_config.target(zone);
            let mut record = records
                .into_iter()
                .find(|r| r.record_type == record_type && r.name == target)
                .ok_or_else(|| UpdateError::RecordNotFound(target.clone()))?;

            record.content = ip.to_string();
            self.api.update_dns_record(&zone_id, &record).await?;

            tracing::debug!(
                "updated {} record {:?} with address {:?}",
                record_type,
                target,
                record.content
            );
            updated += 1;
        }

        tracing::debug!("updated {} records", updated);
        Ok(())
    }
}

impl fmt::Debug for DnsDestination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DnsDestination")
            .field("name", &self.name)
            .field("zones", &self.zones)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::DnsRecord;
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};

    /// In-memory provider with one zone
    #[derive(Clone)]
    struct MockApi {
        zone_name: &'static str,
        zone_id: &'static str,
        records: Arc<Mutex<Vec<DnsRecord>>>,
        list_calls: Arc<Mutex<usize>>,
    }

    impl MockApi {
        fn new(records: Vec<DnsRecord>) -> Self {
            Self {
                zone_name: "example.ch",
                zone_id: "zone-1",
                records: Arc::new(Mutex::new(records)),
                list_calls: Arc::new(Mutex::new(0)),
            }
        }

        fn content_of(&self, id: &str) -> String {
            let records = self.records.lock().unwrap();
            records.iter().find(|r| r.id == id).unwrap().content.clone()
        }
    }

    #[async_trait]
    impl DnsApi for MockApi {
        async fn zone_id_by_name(&self, zone: &str) -> Result<String, UpdateError> {
            if zone != self.zone_name {
                return Err(UpdateError::ZoneNotFound(zone.to_string()));
            }
            Ok(self.zone_id.to_string())
        }

        async fn dns_records(&self, zone_id: &str) -> Result<Vec<DnsRecord>, UpdateError> {
            *self.list_calls.lock().unwrap() += 1;
            assert_eq!(zone_id, self.zone_id);
            Ok(self.records.lock().unwrap().clone())
        }

        async fn update_dns_record(
            &self,
            zone_id: &str,
            record: &DnsRecord,
        ) -> Result<(), UpdateError> {
            assert_eq!(zone_id, self.zone_id);
            let mut records = self.records.lock().unwrap();
            let slot = records
                .iter_mut()
                .find(|r| r.id == record.id)
                .ok_or_else(|| UpdateError::RecordNotFound(record.id.clone()))?;
            *slot = record.clone();
            Ok(())
        }

        fn provider_name(&self) -> &'static str {
            "mock"
        }
    }

    fn zones(zone: &str, record: Option<&str>) -> BTreeMap<String, ZoneConfig> {
        BTreeMap::from([(
            zone.to_string(),
            ZoneConfig {
                record: record.map(str::to_string),
            },
        )])
    }

    #[test]
    fn test_name_lists_zones() {
        let mut both = zones("example.org", Some("home"));
        both.insert("example.ch".to_string(), ZoneConfig::record("dynip"));

        let destination = DnsDestination::new(both, Box::new(MockApi::new(Vec::new())));
        assert_eq!(destination.name(), "mock updater (example.ch, example.org)");
    }

    #[tokio::test]
    async fn test_rewrites_matching_record() {
        let api = MockApi::new(vec![
            DnsRecord::new("mx", "example.ch", "MX", "mail.example.ch"),
            DnsRecord::new("rec-1", "dynip.example.ch", "A", "192.168.1.1"),
        ]);
        let destination = DnsDestination::new(zones("example.ch", Some("dynip")), Box::new(api.clone()));

        destination.update("1.2.3.4").await.unwrap();

        assert_eq!(api.content_of("rec-1"), "1.2.3.4");
        assert_eq!(api.content_of("mx"), "mail.example.ch");
    }

    #[tokio::test]
    async fn test_zone_apex_without_record_name() {
        let api = MockApi::new(vec![DnsRecord::new("apex", "example.ch", "A", "192.168.1.1")]);
        let destination = DnsDestination::new(zones("example.ch", None), Box::new(api.clone()));

        destination.update("1.2.3.4").await.unwrap();
        assert_eq!(api.content_of("apex"), "1.2.3.4");
    }

    #[tokio::test]
    async fn test_ipv6_targets_aaaa_record() {
        let api = MockApi::new(vec![
            DnsRecord::new("v4", "dynip.example.ch", "A", "192.168.1.1"),
            DnsRecord::new("v6", "dynip.example.ch", "AAAA", "2001:db8::1"),
        ]);
        let destination = DnsDestination::new(zones("example.ch", Some("dynip")), Box::new(api.clone()));

        destination.update("2001:db8::2").await.unwrap();

        assert_eq!(api.content_of("v6"), "2001:db8::2");
        assert_eq!(api.content_of("v4"), "192.168.1.1");
    }

    #[tokio::test]
    async fn test_missing_record_fails() {
        let api = MockApi::new(vec![DnsRecord::new("other", "www.example.ch", "A", "192.168.1.1")]);
        let destination = DnsDestination::new(zones("example.ch", Some("dynip")), Box::new(api.clone()));

        let err = destination.update("1.2.3.4").await.unwrap_err();
        assert!(
            matches!(&err, UpdateError::RecordNotFound(name) if name == "dynip.example.ch"),
            "got {err:?}"
        );
        assert_eq!(api.content_of("other"), "192.168.1.1");
    }

    #[tokio::test]
    async fn test_unknown_zone_fails_without_listing() {
        let api = MockApi::new(vec![DnsRecord::new("rec-1", "dynip.example.ch", "A", "192.168.1.1")]);
        let destination =
            DnsDestination::new(zones("not-available.ch", Some("dynip")), Box::new(api.clone()));

        let err = destination.update("1.2.3.4").await.unwrap_err();
        assert!(matches!(err, UpdateError::ZoneNotFound(_)), "got {err:?}");
        assert_eq!(*api.list_calls.lock().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_invalid_address_is_rejected_before_api_calls() {
        let api = MockApi::new(Vec::new());
        let destination = DnsDestination::new(zones("example.ch", None), Box::new(api.clone()));

        let err = destination.update("not-an-ip").await.unwrap_err();
        assert!(matches!(err, UpdateError::InvalidAddress(_)));
        assert_eq!(*api.list_calls.lock().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_update_is_idempotent() {
        let api = MockApi::new(vec![DnsRecord::new("rec-1", "dynip.example.ch", "A", "192.168.1.1")]);
        let destination = DnsDestination::new(zones("example.ch", Some("dynip")), Box::new(api.clone()));

        destination.update("1.2.3.4").await.unwrap();
        let once = api.records.lock().unwrap().clone();
        destination.update("1.2.3.4").await.unwrap();
        let twice = api.records.lock().unwrap().clone();

        assert_eq!(once, twice);
    }
}
