use std::fmt;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::php::{self, PhpLiteralError};

// =============================================================================
// Probe constants
// =============================================================================

/// Nextcloud installation directory used when none is configured
pub const DEFAULT_BASE_DIR: &str = "/var/www/nextcloud";

/// Environment variable overriding the installation directory
pub const BASE_DIR_ENV: &str = "NEXTCLOUD_BASE_DIR";

/// Environment variable naming a log file
pub const LOG_FILE_ENV: &str = "NEXTCLOUD_VERSION_CHECK_LOG";

/// Service name printed in the status line
pub const SERVICE_NAME: &str = "Nextcloud_Version";

/// Application configuration, relative to the installation directory
pub const CONFIG_FILE: &str = "config/config.php";

/// Version descriptor, relative to the installation directory
pub const VERSION_FILE: &str = "version.php";

/// `appid` of the row holding the last update check result
pub const UPDATE_RESULT_APP_ID: &str = "core";

/// `configkey` of the row holding the last update check result
pub const UPDATE_RESULT_CONFIG_KEY: &str = "lastupdateResult";

const CONFIG_VARIABLE: &str = "CONFIG";
const DEFAULT_TABLE_PREFIX: &str = "oc_";
const DEFAULT_SQLITE_DB_NAME: &str = "owncloud";

// =============================================================================
// Database configuration
// =============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {}: {source}", path.display())]
    Php {
        path: PathBuf,
        #[source]
        source: PhpLiteralError,
    },

    #[error("{} does not assign ${variable}", path.display())]
    MissingAssignment { path: PathBuf, variable: &'static str },

    #[error("Invalid configuration: {0}")]
    Invalid(#[from] serde_json::Error),

    #[error("Missing configuration parameter: {0}")]
    MissingParameter(&'static str),

    #[error("Invalid database host: {0}")]
    InvalidHost(String),

    #[error("Invalid database port: {0}")]
    InvalidPort(String),

    #[error("Unsupported database type: {0}")]
    UnsupportedDatabase(String),
}

/// Connection settings for the application database
#[derive(Debug, Clone, PartialEq)]
pub struct DatabaseConfig {
    pub backend: DatabaseBackend,
    /// Prefix of every application table (`oc_` unless configured)
    pub table_prefix: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DatabaseBackend {
    Mysql(MysqlParams),
    Sqlite { path: PathBuf },
}

#[derive(Clone, PartialEq)]
pub struct MysqlParams {
    pub endpoint: MysqlEndpoint,
    pub database: String,
    pub user: String,
    pub password: String,
}

impl fmt::Debug for MysqlParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MysqlParams")
            .field("endpoint", &self.endpoint)
            .field("database", &self.database)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MysqlEndpoint {
    Tcp { host: String, port: Option<u16> },
    Socket(String),
}

/// The subset of `config.php` the probe understands
#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
#[serde(default)]
struct NextcloudConfig {
    dbtype: Option<String>,
    dbhost: Option<String>,
    dbname: Option<String>,
    dbuser: Option<String>,
    dbpassword: Option<String>,
    dbport: Option<PortSetting>,
    dbtableprefix: Option<String>,
    datadirectory: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(untagged)]
enum PortSetting {
    Number(u16),
    Text(String),
}

impl PortSetting {
    fn resolve(&self) -> Result<Option<u16>, ConfigError> {
        match self {
            PortSetting::Number(port) => Ok(Some(*port)),
            PortSetting::Text(text) if text.trim().is_empty() => Ok(None),
            PortSetting::Text(text) => text
                .trim()
                .parse()
                .map(Some)
                .map_err(|_| ConfigError::InvalidPort(text.clone())),
        }
    }
}

/// Load database connection settings from `<base_dir>/config/config.php`.
pub fn load_database_config(base_dir: &Path) -> Result<DatabaseConfig, ConfigError> {
    let path = base_dir.join(CONFIG_FILE);
    debug!("Loading application configuration from {:?}", path);

    let source = std::fs::read_to_string(&path).map_err(|source| ConfigError::Io {
        path: path.clone(),
        source,
    })?;

    let value = php::extract_assignment(&source, CONFIG_VARIABLE)
        .map_err(|source| ConfigError::Php {
            path: path.clone(),
            source,
        })?
        .ok_or_else(|| ConfigError::MissingAssignment {
            path: path.clone(),
            variable: CONFIG_VARIABLE,
        })?;

    let config: NextcloudConfig = serde_json::from_value(value.into_json())?;
    database_config_from(config, base_dir)
}

fn database_config_from(
    config: NextcloudConfig,
    base_dir: &Path,
) -> Result<DatabaseConfig, ConfigError> {
    let table_prefix = config
        .dbtableprefix
        .unwrap_or_else(|| DEFAULT_TABLE_PREFIX.to_string());

    let dbtype = config.dbtype.as_deref().unwrap_or("mysql");
    let backend = match dbtype {
        "mysql" => {
            let port = config.dbport.as_ref().map(PortSetting::resolve).transpose()?.flatten();
            let host = config.dbhost.ok_or(ConfigError::MissingParameter("dbhost"))?;
            DatabaseBackend::Mysql(MysqlParams {
                endpoint: parse_dbhost(&host, port)?,
                database: config.dbname.ok_or(ConfigError::MissingParameter("dbname"))?,
                user: config.dbuser.ok_or(ConfigError::MissingParameter("dbuser"))?,
                password: config
                    .dbpassword
                    .ok_or(ConfigError::MissingParameter("dbpassword"))?,
            })
        }
        "sqlite" | "sqlite3" => {
            let data_dir = config
                .datadirectory
                .unwrap_or_else(|| base_dir.join("data"));
            let name = config
                .dbname
                .unwrap_or_else(|| DEFAULT_SQLITE_DB_NAME.to_string());
            DatabaseBackend::Sqlite {
                path: data_dir.join(format!("{}.db", name)),
            }
        }
        other => return Err(ConfigError::UnsupportedDatabase(other.to_string())),
    };

    Ok(DatabaseConfig {
        backend,
        table_prefix,
    })
}

/// Split a `dbhost` value into host and port or socket path.
///
/// Accepted forms: `host`, `host:3306`, `host:/path/to.sock`, `[::1]`,
/// `[::1]:3306`. An explicit `dbport` takes precedence over a port in
/// `dbhost`.
fn parse_dbhost(dbhost: &str, explicit_port: Option<u16>) -> Result<MysqlEndpoint, ConfigError> {
    let (host, suffix) = if let Some(bracketed) = dbhost.strip_prefix('[') {
        match bracketed.split_once(']') {
            Some((addr, rest)) => (addr, rest.strip_prefix(':')),
            None => return Err(ConfigError::InvalidHost(dbhost.to_string())),
        }
    } else {
        match dbhost.split_once(':') {
            Some((host, rest)) => (host, Some(rest)),
            None => (dbhost, None),
        }
    };

    let host = if host.is_empty() { "localhost" } else { host };

    match suffix.filter(|s| !s.is_empty()) {
        Some(rest) => match rest.parse::<u16>() {
            Ok(port) => Ok(MysqlEndpoint::Tcp {
                host: host.to_string(),
                port: explicit_port.or(Some(port)),
            }),
            Err(_) if rest.chars().all(|c| c.is_ascii_digit()) => {
                Err(ConfigError::InvalidPort(rest.to_string()))
            }
            Err(_) => Ok(MysqlEndpoint::Socket(rest.to_string())),
        },
        None => Ok(MysqlEndpoint::Tcp {
            host: host.to_string(),
            port: explicit_port,
        }),
    }
}
