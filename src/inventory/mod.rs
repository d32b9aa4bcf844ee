//! Device inventory port and its backing implementations.

pub mod host;
pub mod mysql;

use async_trait::async_trait;

use crate::error::Result;

pub use host::Host;
pub use mysql::MySqlInventory;

/// Port to the device inventory store.
#[async_trait]
pub trait HostSource: Send + Sync {
    /// Active hosts, slowest first by last observed operation duration,
    /// so the longest-running work is scheduled earliest. Disabled hosts
    /// are never returned.
    async fn fetch_ordered_hosts(&self) -> Result<Vec<Host>>;

    /// Device id of the first enabled host whose name matches `hostname`.
    async fn host_id_by_name(&self, hostname: &str) -> Result<Option<i64>>;

    /// Stored host name for `device_id`, domain suffix stripped.
    async fn host_name_by_id(&self, device_id: i64) -> Result<Option<String>>;
}

/// In-memory host source for tests and fixtures.
#[derive(Debug, Default, Clone)]
pub struct StaticHostSource {
    hosts: Vec<Host>,
    domain_suffix: Option<String>,
}

impl StaticHostSource {
    pub fn new(hosts: Vec<Host>) -> Self {
        Self {
            hosts,
            domain_suffix: None,
        }
    }

    pub fn with_domain_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.domain_suffix = Some(suffix.into());
        self
    }
}

#[async_trait]
impl HostSource for StaticHostSource {
    async fn fetch_ordered_hosts(&self) -> Result<Vec<Host>> {
        let mut hosts: Vec<Host> = self.hosts.iter().filter(|h| !h.disabled).cloned().collect();
        hosts.sort_by(|a, b| b.last_poll_duration.total_cmp(&a.last_poll_duration));
        Ok(hosts)
    }

    async fn host_id_by_name(&self, hostname: &str) -> Result<Option<i64>> {
        Ok(self
            .hosts
            .iter()
            .find(|h| !h.disabled && h.hostname.starts_with(hostname))
            .map(|h| h.device_id))
    }

    async fn host_name_by_id(&self, device_id: i64) -> Result<Option<String>> {
        Ok(self
            .hosts
            .iter()
            .find(|h| h.device_id == device_id)
            .map(|h| strip_domain(&h.hostname, self.domain_suffix.as_deref())))
    }
}

/// Strip the configured domain suffix from a stored FQDN.
pub(crate) fn strip_domain(hostname: &str, suffix: Option<&str>) -> String {
    match suffix {
        Some(sfx) => hostname.strip_suffix(sfx).unwrap_or(hostname).to_string(),
        None => hostname.to_string(),
    }
}
