use std::path::PathBuf;
use std::time::Duration;

/// Immutable configuration for one wrapper run.
///
/// Loaded once at process start and passed down by handle; nothing in here
/// changes while a run is in flight.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// MySQL server holding the device inventory.
    pub db_host: String,
    /// Inventory database name.
    pub db_name: String,
    /// Account used when the credentials file does not name one.
    pub db_user: String,
    /// MySQL client defaults file carrying `[client]` user/password.
    pub credentials_file: PathBuf,
    /// Domain suffix stripped from stored FQDNs when reporting host names.
    pub domain_suffix: Option<String>,
    /// Unprivileged service identity the external binaries run as.
    pub service_user: String,
    /// Binary invoked for the poll operation.
    pub poller_binary: PathBuf,
    /// Binary invoked for the discovery operation.
    pub discovery_binary: PathBuf,
    /// Hard wall-clock limit for a single external invocation.
    pub job_time_limit: Duration,
    /// How long the run waits for the group before returning a partial summary.
    pub collect_deadline: Duration,
    /// Retention for job results in the local result store.
    pub result_ttl: Duration,
    /// Cap on concurrently executing jobs in the local pool. None = unbounded.
    pub max_concurrency: Option<usize>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            db_host: "localhost".to_string(),
            db_name: "observium".to_string(),
            db_user: "observium".to_string(),
            credentials_file: PathBuf::from("~/.my.cnf"),
            domain_suffix: None,
            service_user: "observium".to_string(),
            poller_binary: PathBuf::from("/opt/observium/poller.php"),
            discovery_binary: PathBuf::from("/opt/observium/discovery.php"),
            job_time_limit: Duration::from_secs(300),
            collect_deadline: Duration::from_secs(500),
            result_ttl: Duration::from_secs(3600),
            max_concurrency: None,
        }
    }
}

impl RunConfig {
    pub fn new(db_host: impl Into<String>) -> Self {
        Self {
            db_host: db_host.into(),
            ..Default::default()
        }
    }

    pub fn with_job_time_limit(mut self, limit: Duration) -> Self {
        self.job_time_limit = limit;
        self
    }

    pub fn with_domain_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.domain_suffix = Some(suffix.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_config_default() {
        let cfg = RunConfig::default();
        assert_eq!(cfg.db_host, "localhost");
        assert_eq!(cfg.db_name, "observium");
        assert_eq!(cfg.service_user, "observium");
        assert_eq!(cfg.poller_binary, PathBuf::from("/opt/observium/poller.php"));
        assert_eq!(
            cfg.discovery_binary,
            PathBuf::from("/opt/observium/discovery.php")
        );
        assert_eq!(cfg.job_time_limit, Duration::from_secs(300));
        assert_eq!(cfg.collect_deadline, Duration::from_secs(500));
        assert_eq!(cfg.result_ttl, Duration::from_secs(3600));
        assert!(cfg.max_concurrency.is_none());
    }

    #[test]
    fn run_config_new() {
        let cfg = RunConfig::new("inventory.example.com");
        assert_eq!(cfg.db_host, "inventory.example.com");
        assert_eq!(cfg.db_name, "observium");
    }

    #[test]
    fn run_config_builders() {
        let cfg = RunConfig::new("db")
            .with_job_time_limit(Duration::from_secs(60))
            .with_domain_suffix(".example.com");
        assert_eq!(cfg.job_time_limit, Duration::from_secs(60));
        assert_eq!(cfg.domain_suffix.as_deref(), Some(".example.com"));
    }
}
