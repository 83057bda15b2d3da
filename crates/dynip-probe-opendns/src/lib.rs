// # OpenDNS Address Probe
//
// Discovers the public address as seen from the internet, for hosts that
// sit behind NAT and never see their public address on a local interface.
//
// ## Protocol
//
// 1. Resolve `resolver1.opendns.com` with the system resolver
// 2. Ask that server directly for `myip.opendns.com`
// 3. The answer is the address the query arrived from
//
// The whole exchange is bounded by a single timeout.

use async_trait::async_trait;
use dynip_core::{AddressFamily, AddressProbe, ObservedAddress, ProbeError};
use hickory_resolver::TokioAsyncResolver;
use hickory_resolver::config::{LookupIpStrategy, NameServerConfigGroup, ResolverConfig, ResolverOpts};
use std::net::IpAddr;
use std::time::Duration;
use tracing::Instrument;

/// Resolver answering `myip` queries
pub const RESOLVER_HOST: &str = "resolver1.opendns.com";

/// Name whose answer is the caller's address
pub const MYIP_NAME: &str = "myip.opendns.com.";

/// Default bound for one probe
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// External address probe backed by OpenDNS
#[derive(Debug, Clone)]
pub struct OpenDnsProbe {
    family: AddressFamily,
    timeout: Duration,
    resolver_host: String,
    resolver_port: u16,
    span: tracing::Span,
}

impl OpenDnsProbe {
    /// Create a probe for the given address family
    pub fn new(family: AddressFamily) -> Self {
        Self {
            family,
            timeout: DEFAULT_TIMEOUT,
            resolver_host: RESOLVER_HOST.to_string(),
            resolver_port: 53,
            span: tracing::info_span!("probe", resolver = RESOLVER_HOST),
        }
    }

    /// Replace the logging span used by this probe
    pub fn with_span(mut self, span: tracing::Span) -> Self {
        self.span = span;
        self
    }

    /// Bound the probe by `timeout`
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Query a different resolver
    pub fn with_resolver(mut self, host: impl Into<String>, port: u16) -> Self {
        self.resolver_host = host.into();
        self.resolver_port = port;
        self
    }

    async fn resolver_addresses(&self) -> Result<Vec<IpAddr>, ProbeError> {
        let addresses: Vec<IpAddr> =
            tokio::net::lookup_host((self.resolver_host.as_str(), self.resolver_port))
                .await
                .map_err(|e| {
                    ProbeError::ResolutionFailed(format!(
                        "failed to resolve {}: {}",
                        self.resolver_host, e
                    ))
                })?
                .map(|addr| addr.ip())
                .collect();

        if addresses.is_empty() {
            return Err(ProbeError::ResolutionFailed(format!(
                "{} has no addresses",
                self.resolver_host
            )));
        }
        Ok(addresses)
    }

    async fn lookup(&self) -> Result<ObservedAddress, ProbeError> {
        let servers = self.resolver_addresses().await?;
        tracing::debug!("querying {} via {:?}", MYIP_NAME, servers);

        let config = ResolverConfig::from_parts(
            None,
            Vec::new(),
            NameServerConfigGroup::from_ips_clear(&servers, self.resolver_port, true),
        );
        let resolver = TokioAsyncResolver::tokio(config, resolver_options(self.family, self.timeout));

        let answers = resolver.lookup_ip(MYIP_NAME).await.map_err(|e| {
            ProbeError::ResolutionFailed(format!("lookup of {} failed: {}", MYIP_NAME, e))
        })?;

        select_answer(answers.iter(), self.family)
            .ok_or_else(|| ProbeError::NoAddress(MYIP_NAME.to_string()))
    }

    async fn bounded_lookup(&self) -> Result<ObservedAddress, ProbeError> {
        let address = tokio::time::timeout(self.timeout, self.lookup())
            .await
            .map_err(|_| ProbeError::Timeout(self.timeout))??;

        tracing::debug!("external address: {}", address);
        Ok(address)
    }
}

fn resolver_options(family: AddressFamily, timeout: Duration) -> ResolverOpts {
    let mut opts = ResolverOpts::default();
    opts.ip_strategy = match family {
        AddressFamily::Any => LookupIpStrategy::Ipv4thenIpv6,
        AddressFamily::V4 => LookupIpStrategy::Ipv4Only,
        AddressFamily::V6 => LookupIpStrategy::Ipv6Only,
    };
    // Every probe must observe the current answer
    opts.cache_size = 0;
    opts.timeout = timeout;
    opts
}

/// Pick the first answer of the wanted family
pub fn select_answer(
    answers: impl IntoIterator<Item = IpAddr>,
    family: AddressFamily,
) -> Option<ObservedAddress> {
    answers
        .into_iter()
        .find(|ip| family.accepts(ip))
        .map(ObservedAddress::from_ip)
}

#[async_trait]
impl AddressProbe for OpenDnsProbe {
    async fn probe(&self) -> Result<ObservedAddress, ProbeError> {
        self.bounded_lookup().instrument(self.span.clone()).await
    }

    fn name(&self) -> &str {
        "opendns"
    }
}
