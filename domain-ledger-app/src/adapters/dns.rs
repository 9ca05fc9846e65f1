//! Hickory-based `TxtResolver`.

use std::net::IpAddr;
use std::time::Duration;

use async_trait::async_trait;
use hickory_resolver::{
    config::{NameServerConfigGroup, ResolverConfig, ResolverOpts},
    name_server::TokioConnectionProvider,
    TokioResolver,
};

use domain_ledger_core::traits::{LookupError, TxtResolver};

/// Resolver settings taken from the `[verification]` config section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolverSettings {
    /// Query this nameserver instead of the system configuration
    pub nameserver: Option<IpAddr>,
    pub timeout: Duration,
    pub attempts: usize,
}

impl Default for ResolverSettings {
    fn default() -> Self {
        Self {
            nameserver: None,
            timeout: Duration::from_secs(5),
            attempts: 2,
        }
    }
}

/// TXT lookups through `hickory-resolver`.
pub struct HickoryTxtResolver {
    resolver: TokioResolver,
}

impl HickoryTxtResolver {
    #[must_use]
    pub fn new(settings: &ResolverSettings) -> Self {
        Self {
            resolver: build_resolver(settings),
        }
    }
}

impl Default for HickoryTxtResolver {
    fn default() -> Self {
        Self::new(&ResolverSettings::default())
    }
}

#[async_trait]
impl TxtResolver for HickoryTxtResolver {
    async fn lookup_txt(&self, name: &str) -> Result<Vec<String>, LookupError> {
        match self.resolver.txt_lookup(name).await {
            Ok(response) => Ok(response
                .iter()
                .map(|txt| {
                    txt.iter()
                        .map(|data| String::from_utf8_lossy(data).to_string())
                        .collect::<String>()
                })
                .collect()),
            Err(e) if e.is_no_records_found() || e.is_nx_domain() => Err(LookupError::NotFound),
            Err(e) => {
                log::warn!("TXT lookup for {name} failed: {e}");
                Err(LookupError::Transient(e.to_string()))
            }
        }
    }
}

fn resolver_opts(settings: &ResolverSettings) -> ResolverOpts {
    let mut opts = ResolverOpts::default();
    opts.timeout = settings.timeout;
    opts.attempts = settings.attempts;
    opts
}

/// Target `settings.nameserver` if set, else the host system configuration,
/// falling back to Hickory's default upstreams.
fn build_resolver(settings: &ResolverSettings) -> TokioResolver {
    if let Some(ns_ip) = settings.nameserver {
        let config = ResolverConfig::from_parts(
            None,
            vec![],
            NameServerConfigGroup::from_ips_clear(&[ns_ip], 53, true),
        );
        return TokioResolver::builder_with_config(config, TokioConnectionProvider::default())
            .with_options(resolver_opts(settings))
            .build();
    }

    #[cfg(any(unix, target_os = "windows"))]
    {
        match TokioResolver::builder_tokio() {
            Ok(mut builder) => {
                *builder.options_mut() = resolver_opts(settings);
                return builder.build();
            }
            Err(e) => {
                log::warn!(
                    "Failed to load system DNS configuration, falling back to defaults: {e}"
                );
            }
        }
    }

    TokioResolver::builder_with_config(
        ResolverConfig::default(),
        TokioConnectionProvider::default(),
    )
    .with_options(resolver_opts(settings))
    .build()
}
