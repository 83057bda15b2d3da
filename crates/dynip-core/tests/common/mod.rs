//! Test doubles and common utilities for cycle contract tests
//!
//! Every double is `Clone` and clones share their counters, so a test can
//! hand one copy to the orchestrator and keep another for assertions.

#![allow(dead_code)]

use async_trait::async_trait;
use dynip_core::config::ZoneConfig;
use dynip_core::error::{ProbeError, StateError, UpdateError};
use dynip_core::traits::{AddressProbe, DnsApi, DnsRecord, StateStore};
use dynip_core::{Destination, DnsDestination, MemoryStateStore, ObservedAddress};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Shared, ordered log of destination calls
pub type Journal = Arc<Mutex<Vec<String>>>;

/// A probe whose answer the test controls
#[derive(Clone)]
pub struct ScriptedProbe {
    answer: Arc<Mutex<Option<ObservedAddress>>>,
    delay: Arc<Mutex<Option<Duration>>>,
    calls: Arc<AtomicUsize>,
    in_flight: Arc<AtomicUsize>,
    max_in_flight: Arc<AtomicUsize>,
}

impl ScriptedProbe {
    /// Create a probe answering with `address`
    pub fn answering(address: ObservedAddress) -> Self {
        Self {
            answer: Arc::new(Mutex::new(Some(address))),
            delay: Arc::new(Mutex::new(None)),
            calls: Arc::new(AtomicUsize::new(0)),
            in_flight: Arc::new(AtomicUsize::new(0)),
            max_in_flight: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Create a probe answering with a single IPv4 address
    pub fn v4(ip: &str) -> Self {
        Self::answering(ObservedAddress::v4(ip))
    }

    /// Change the answer for subsequent probes
    pub fn answer_with(&self, address: ObservedAddress) {
        *self.answer.lock().unwrap() = Some(address);
    }

    /// Make subsequent probes fail as if the interface vanished
    pub fn fail(&self) {
        *self.answer.lock().unwrap() = None;
    }

    /// Make every probe take `delay` before answering
    pub fn slow_down(&self, delay: Duration) {
        *self.delay.lock().unwrap() = Some(delay);
    }

    /// Number of probes issued
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Highest number of probes observed running at once
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AddressProbe for ScriptedProbe {
    async fn probe(&self) -> Result<ObservedAddress, ProbeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(running, Ordering::SeqCst);

        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        let answer = self.answer.lock().unwrap().clone();
        answer.ok_or_else(|| ProbeError::InterfaceNotFound("eth0".to_string()))
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

/// A DNS API holding one zone with one address record
#[derive(Clone)]
pub struct RecordingDnsApi {
    name: &'static str,
    zone: String,
    records: Arc<Mutex<Vec<DnsRecord>>>,
    failing: Arc<AtomicBool>,
    update_calls: Arc<AtomicUsize>,
    journal: Journal,
}

impl RecordingDnsApi {
    /// Create an API serving `zone` with an `A` record `record` at `content`
    pub fn new(name: &'static str, zone: &str, record: &str, content: &str) -> Self {
        Self {
            name,
            zone: zone.to_string(),
            records: Arc::new(Mutex::new(vec![DnsRecord::new(
                "rec-1",
                format!("{}.{}", record, zone),
                "A",
                content,
            )])),
            failing: Arc::new(AtomicBool::new(false)),
            update_calls: Arc::new(AtomicUsize::new(0)),
            journal: Arc::default(),
        }
    }

    /// Record calls into a journal shared with other doubles
    pub fn with_journal(mut self, journal: Journal) -> Self {
        self.journal = journal;
        self
    }

    /// Toggle failure of record updates
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Number of update requests received, failed ones included
    pub fn update_calls(&self) -> usize {
        self.update_calls.load(Ordering::SeqCst)
    }

    /// Current value of the address record
    pub fn content(&self) -> String {
        self.records.lock().unwrap()[0].content.clone()
    }

    /// Wrap into a destination updating `record` in the served zone
    pub fn destination(&self, record: &str) -> Destination {
        let zones = BTreeMap::from([(self.zone.clone(), ZoneConfig::record(record))]);
        DnsDestination::new(zones, Box::new(self.clone())).into()
    }
}

#[async_trait]
impl DnsApi for RecordingDnsApi {
    async fn zone_id_by_name(&self, zone: &str) -> Result<String, UpdateError> {
        if zone != self.zone {
            return Err(UpdateError::ZoneNotFound(zone.to_string()));
        }
        Ok(format!("{}-id", self.zone))
    }

    async fn dns_records(&self, _zone_id: &str) -> Result<Vec<DnsRecord>, UpdateError> {
        Ok(self.records.lock().unwrap().clone())
    }

    async fn update_dns_record(&self, _zone_id: &str, record: &DnsRecord) -> Result<(), UpdateError> {
        self.update_calls.fetch_add(1, Ordering::SeqCst);
        self.journal
            .lock()
            .unwrap()
            .push(format!("{}:{}", self.name, record.content));

        if self.failing.load(Ordering::SeqCst) {
            return Err(UpdateError::provider(self.name, "service unavailable"));
        }

        let mut records = self.records.lock().unwrap();
        if let Some(slot) = records.iter_mut().find(|r| r.id == record.id) {
            *slot = record.clone();
        }
        Ok(())
    }

    fn provider_name(&self) -> &'static str {
        self.name
    }
}

/// A DNS API whose calls never complete
#[derive(Clone)]
pub struct HangingDnsApi {
    name: &'static str,
    calls: Arc<AtomicUsize>,
}

impl HangingDnsApi {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            calls: Arc::default(),
        }
    }

    /// Number of calls started
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Wrap into a destination for `zone`
    pub fn destination(&self, zone: &str) -> Destination {
        let zones = BTreeMap::from([(zone.to_string(), ZoneConfig::default())]);
        DnsDestination::new(zones, Box::new(self.clone())).into()
    }
}

#[async_trait]
impl DnsApi for HangingDnsApi {
    async fn zone_id_by_name(&self, _zone: &str) -> Result<String, UpdateError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        std::future::pending().await
    }

    async fn dns_records(&self, _zone_id: &str) -> Result<Vec<DnsRecord>, UpdateError> {
        std::future::pending().await
    }

    async fn update_dns_record(&self, _zone_id: &str, _record: &DnsRecord) -> Result<(), UpdateError> {
        std::future::pending().await
    }

    fn provider_name(&self) -> &'static str {
        self.name
    }
}

/// A memory store that counts calls and can refuse reads or writes
#[derive(Clone, Default)]
pub struct CountingStateStore {
    inner: MemoryStateStore,
    get_calls: Arc<AtomicUsize>,
    set_calls: Arc<AtomicUsize>,
    reset_calls: Arc<AtomicUsize>,
    unreadable: Arc<AtomicBool>,
    read_only: Arc<AtomicBool>,
}

impl CountingStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store already holding `address`
    pub async fn holding(address: ObservedAddress) -> Self {
        let store = Self::new();
        store.inner.set(&address).await.unwrap();
        store
    }

    /// Make `get` fail until toggled back
    pub fn set_unreadable(&self, unreadable: bool) {
        self.unreadable.store(unreadable, Ordering::SeqCst);
    }

    /// Make `set` fail until toggled back
    pub fn set_read_only(&self, read_only: bool) {
        self.read_only.store(read_only, Ordering::SeqCst);
    }

    /// Committed value, bypassing the counters
    pub async fn committed(&self) -> ObservedAddress {
        self.inner.get().await.unwrap()
    }

    pub fn get_calls(&self) -> usize {
        self.get_calls.load(Ordering::SeqCst)
    }

    pub fn set_calls(&self) -> usize {
        self.set_calls.load(Ordering::SeqCst)
    }

    pub fn reset_calls(&self) -> usize {
        self.reset_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StateStore for CountingStateStore {
    async fn get(&self) -> Result<ObservedAddress, StateError> {
        self.get_calls.fetch_add(1, Ordering::SeqCst);
        if self.unreadable.load(Ordering::SeqCst) {
            return Err(StateError::io(
                "/var/lib/dynip/state.json",
                std::io::Error::from(std::io::ErrorKind::PermissionDenied),
            ));
        }
        self.inner.get().await
    }

    async fn set(&self, address: &ObservedAddress) -> Result<(), StateError> {
        self.set_calls.fetch_add(1, Ordering::SeqCst);
        if self.read_only.load(Ordering::SeqCst) {
            return Err(StateError::io(
                "/var/lib/dynip/state.json",
                std::io::Error::from(std::io::ErrorKind::ReadOnlyFilesystem),
            ));
        }
        self.inner.set(address).await
    }

    async fn reset(&self) -> Result<(), StateError> {
        self.reset_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.reset().await
    }

    fn backend(&self) -> &'static str {
        "counting"
    }
}
