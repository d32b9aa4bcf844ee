use std::path::Path;

use async_trait::async_trait;
use sqlx::mysql::{MySqlConnectOptions, MySqlPool, MySqlPoolOptions};
use sqlx::FromRow;

use crate::config::RunConfig;
use crate::error::{PollerError, Result};
use crate::inventory::{strip_domain, Host, HostSource};

/// MySQL-backed implementation of the [`HostSource`] port.
#[derive(Clone, Debug)]
pub struct MySqlInventory {
    pool: MySqlPool,
    domain_suffix: Option<String>,
}

#[derive(Debug, FromRow)]
struct DeviceRow {
    device_id: i64,
    hostname: String,
    disabled: bool,
    last_polled_timetaken: f64,
}

impl From<DeviceRow> for Host {
    fn from(row: DeviceRow) -> Self {
        Host {
            device_id: row.device_id,
            hostname: row.hostname,
            disabled: row.disabled,
            last_poll_duration: row.last_polled_timetaken,
        }
    }
}

impl MySqlInventory {
    /// Connect to the inventory server named in `config`, authenticating
    /// with the account from the credentials file. Connection failure is
    /// fatal to the run.
    pub async fn connect(config: &RunConfig) -> Result<Self> {
        let creds = ClientCredentials::load(&config.credentials_file)?;

        let mut options = MySqlConnectOptions::new()
            .host(&config.db_host)
            .database(&config.db_name)
            .username(creds.user.as_deref().unwrap_or(&config.db_user));
        if let Some(ref password) = creds.password {
            options = options.password(password);
        }

        let pool = MySqlPoolOptions::new()
            .max_connections(2)
            .connect_with(options)
            .await?;

        tracing::debug!(db_host = %config.db_host, db_name = %config.db_name, "connected to inventory");
        Ok(Self {
            pool,
            domain_suffix: config.domain_suffix.clone(),
        })
    }
}

#[async_trait]
impl HostSource for MySqlInventory {
    async fn fetch_ordered_hosts(&self) -> Result<Vec<Host>> {
        let rows = sqlx::query_as::<_, DeviceRow>(
            "SELECT device_id, hostname, disabled, last_polled_timetaken \
             FROM devices \
             WHERE disabled != 1 \
             ORDER BY last_polled_timetaken DESC",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Host::from).collect())
    }

    async fn host_id_by_name(&self, hostname: &str) -> Result<Option<i64>> {
        let id = sqlx::query_scalar::<_, i64>(
            "SELECT device_id FROM devices WHERE disabled != 1 AND hostname LIKE ?",
        )
        .bind(format!("{hostname}%"))
        .fetch_optional(&self.pool)
        .await?;

        Ok(id)
    }

    async fn host_name_by_id(&self, device_id: i64) -> Result<Option<String>> {
        let name =
            sqlx::query_scalar::<_, String>("SELECT hostname FROM devices WHERE device_id = ?")
                .bind(device_id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(name.map(|n| strip_domain(&n, self.domain_suffix.as_deref())))
    }
}

/// `[client]` section of a MySQL defaults file.
#[derive(Debug, Default, PartialEq, Eq)]
struct ClientCredentials {
    user: Option<String>,
    password: Option<String>,
}

impl ClientCredentials {
    fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|_| PollerError::Credentials(path.to_path_buf()))?;
        Ok(Self::parse(&text))
    }

    fn parse(text: &str) -> Self {
        let mut creds = Self::default();
        // Keys before any section header are treated as client settings.
        let mut in_client = true;
        for line in text.lines() {
            let line = line.trim();
            if line.starts_with('#') || line.starts_with(';') {
                continue;
            }
            if line.starts_with('[') {
                in_client = line == "[client]";
                continue;
            }
            if !in_client {
                continue;
            }
            if let Some((key, value)) = line.split_once('=') {
                let value = value.trim().trim_matches('"').to_string();
                match key.trim() {
                    "user" => creds.user = Some(value),
                    "password" => creds.password = Some(value),
                    _ => {}
                }
            }
        }
        creds
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn parse_client_section() {
        let creds = ClientCredentials::parse(
            "[client]\nuser = monitor\npassword = \"s3cret\"\n\n[mysqld]\nuser = ignored\n",
        );
        assert_eq!(creds.user.as_deref(), Some("monitor"));
        assert_eq!(creds.password.as_deref(), Some("s3cret"));
    }

    #[test]
    fn parse_without_section_header() {
        let creds = ClientCredentials::parse("user=monitor\npassword=pw\n");
        assert_eq!(creds.user.as_deref(), Some("monitor"));
        assert_eq!(creds.password.as_deref(), Some("pw"));
    }

    #[test]
    fn parse_ignores_comments_and_unknown_keys() {
        let creds = ClientCredentials::parse("[client]\n# user = commented\nhost = db1\n");
        assert_eq!(creds, ClientCredentials::default());
    }

    #[test]
    fn load_missing_file_is_a_credentials_error() {
        let err = ClientCredentials::load(Path::new("/nonexistent/.my.cnf")).unwrap_err();
        assert!(matches!(err, PollerError::Credentials(_)));
    }

    #[test]
    fn load_reads_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[client]\nuser = monitor").unwrap();
        let creds = ClientCredentials::load(file.path()).unwrap();
        assert_eq!(creds.user.as_deref(), Some("monitor"));
        assert!(creds.password.is_none());
    }
}
