// Mail reachability through DNS. A domain accepts mail when it publishes MX
// records, or, lacking those, an address record (implicit MX).

use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::debug;
use trust_dns_resolver::config::{ResolverConfig, ResolverOpts};
use trust_dns_resolver::error::ResolveErrorKind;
use trust_dns_resolver::TokioAsyncResolver;

use super::DomainProbe;

pub struct MxProbe {
    resolver: TokioAsyncResolver,
}

impl MxProbe {
    pub fn new() -> Self {
        Self {
            resolver: TokioAsyncResolver::tokio(ResolverConfig::default(), ResolverOpts::default()),
        }
    }
}

impl Default for MxProbe {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DomainProbe for MxProbe {
    async fn accepts_mail(&self, domain: &str) -> Result<bool> {
        let fqdn = format!("{}.", domain.trim_end_matches('.'));
        match self.resolver.mx_lookup(fqdn.as_str()).await {
            Ok(lookup) => {
                let count = lookup.iter().count();
                debug!(domain, mx_records = count, "MX lookup");
                if count > 0 {
                    return Ok(true);
                }
            }
            Err(e) if matches!(e.kind(), ResolveErrorKind::NoRecordsFound { .. }) => {
                debug!(domain, "No MX records, checking address records");
            }
            Err(e) => return Err(e).with_context(|| format!("MX lookup failed for {domain}")),
        }

        match self.resolver.lookup_ip(fqdn.as_str()).await {
            Ok(ips) => Ok(ips.iter().next().is_some()),
            Err(e) if matches!(e.kind(), ResolveErrorKind::NoRecordsFound { .. }) => Ok(false),
            Err(e) => Err(e).with_context(|| format!("Address lookup failed for {domain}")),
        }
    }
}
