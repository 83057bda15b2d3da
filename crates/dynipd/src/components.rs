//! Builds the probe and destinations named by the configuration
//!
//! Backends compiled out by feature flags are reported as configuration
//! errors at startup.

use anyhow::{Result, bail};
use dynip_core::config::{DestinationConfig, ListenConfig};
use dynip_core::{AddressProbe, Destination, FileDestination};

/// Select the probe strategy
pub fn probe(listen: &ListenConfig) -> Result<Box<dyn AddressProbe>> {
    if listen.external {
        return external_probe(listen);
    }

    match &listen.interface {
        Some(interface) => local_probe(interface, listen),
        None => bail!("listen: neither an interface nor external discovery configured"),
    }
}

#[cfg(feature = "opendns")]
fn external_probe(listen: &ListenConfig) -> Result<Box<dyn AddressProbe>> {
    let span = tracing::info_span!("probe", kind = "opendns", family = ?listen.family);
    Ok(Box::new(
        dynip_probe_opendns::OpenDnsProbe::new(listen.family)
            .with_timeout(listen.probe_timeout())
            .with_span(span),
    ))
}

#[cfg(not(feature = "opendns"))]
fn external_probe(_listen: &ListenConfig) -> Result<Box<dyn AddressProbe>> {
    bail!("external address discovery is not compiled in (feature \"opendns\")")
}

#[cfg(feature = "local")]
fn local_probe(interface: &str, listen: &ListenConfig) -> Result<Box<dyn AddressProbe>> {
    let span = tracing::info_span!("probe", kind = "local", interface = %interface);
    Ok(Box::new(
        dynip_probe_local::LocalInterfaceProbe::new(interface, listen.family).with_span(span),
    ))
}

#[cfg(not(feature = "local"))]
fn local_probe(_interface: &str, _listen: &ListenConfig) -> Result<Box<dyn AddressProbe>> {
    bail!("local interface probing is not compiled in (feature \"local\")")
}

/// Build every destination, preserving configuration order
///
/// Each destination logs inside a span carrying its position in the list.
pub fn destinations(configs: &[DestinationConfig]) -> Result<Vec<Destination>> {
    configs
        .iter()
        .enumerate()
        .map(|(index, config)| destination(index, config))
        .collect()
}

fn destination(index: usize, config: &DestinationConfig) -> Result<Destination> {
    match config {
        DestinationConfig::Cloudflare { access, zones } => cloudflare(index, access, zones),
        DestinationConfig::File { template, output } => {
            let destination = FileDestination::new(template, output);
            let span = destination_span(index, destination.name());
            Ok(destination.with_span(span).into())
        }
    }
}

fn destination_span(index: usize, name: &str) -> tracing::Span {
    tracing::info_span!("destination", index, name = %name)
}

#[cfg(feature = "cloudflare")]
fn cloudflare(
    index: usize,
    access: &dynip_core::config::CloudflareAccess,
    zones: &std::collections::BTreeMap<String, dynip_core::config::ZoneConfig>,
) -> Result<Destination> {
    let api = dynip_provider_cloudflare::CloudflareApi::new(access.clone())?;
    let destination = dynip_core::DnsDestination::new(zones.clone(), Box::new(api));
    let span = destination_span(index, destination.name());
    Ok(destination.with_span(span).into())
}

#[cfg(not(feature = "cloudflare"))]
fn cloudflare(
    _index: usize,
    _access: &dynip_core::config::CloudflareAccess,
    _zones: &std::collections::BTreeMap<String, dynip_core::config::ZoneConfig>,
) -> Result<Destination> {
    bail!("cloudflare destinations are not compiled in (feature \"cloudflare\")")
}
