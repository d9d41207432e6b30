//! Access to the application's `appconfig` table

use std::path::Path;
use std::sync::LazyLock;

#[cfg(test)]
use mockall::automock;

use mysql::prelude::Queryable;
use mysql::{Conn, OptsBuilder};
use regex::Regex;
use rusqlite::{Connection, OpenFlags, OptionalExtension};
use tracing::{debug, info};

use crate::config::{DatabaseBackend, DatabaseConfig, MysqlEndpoint, MysqlParams};
use crate::version::error::StoreError;

/// Where MySQL and MariaDB packages put the server socket, in lookup order
const DEFAULT_MYSQL_SOCKETS: &[&str] = &[
    "/run/mysqld/mysqld.sock",
    "/var/run/mysqld/mysqld.sock",
    "/var/lib/mysql/mysql.sock",
    "/tmp/mysql.sock",
];

static TABLE_PREFIX_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_]*$").unwrap());

/// Trait for reading application configuration values
#[cfg_attr(test, automock)]
pub trait AppConfigStore {
    /// Get the value stored for `(app_id, config_key)`.
    ///
    /// Returns `None` when no row exists. A SQL `NULL` value is returned as
    /// an empty string.
    fn app_config_value(
        &mut self,
        app_id: &str,
        config_key: &str,
    ) -> Result<Option<String>, StoreError>;
}

/// Build the point lookup against `<prefix>appconfig`.
///
/// The prefix is interpolated into the statement, so only identifier
/// characters are allowed.
fn app_config_query(table_prefix: &str) -> Result<String, StoreError> {
    if !TABLE_PREFIX_RE.is_match(table_prefix) {
        return Err(StoreError::InvalidTablePrefix(table_prefix.to_string()));
    }

    Ok(format!(
        "SELECT configvalue FROM {}appconfig WHERE appid = ? AND configkey = ?",
        table_prefix
    ))
}

/// Open the store described by `config`.
pub fn open_store(config: &DatabaseConfig) -> Result<Box<dyn AppConfigStore>, StoreError> {
    match &config.backend {
        DatabaseBackend::Mysql(params) => {
            Ok(Box::new(MysqlStore::connect(params, &config.table_prefix)?))
        }
        DatabaseBackend::Sqlite { path } => {
            Ok(Box::new(SqliteStore::open(path, &config.table_prefix)?))
        }
    }
}

pub struct SqliteStore {
    conn: Connection,
    query: String,
}

impl SqliteStore {
    /// Open an existing database read-only.
    pub fn open(db_path: &Path, table_prefix: &str) -> Result<Self, StoreError> {
        let query = app_config_query(table_prefix)?;

        info!("Opening SQLite database at {:?}", db_path);
        let conn = Connection::open_with_flags(
            db_path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;

        Ok(Self { conn, query })
    }
}

impl AppConfigStore for SqliteStore {
    fn app_config_value(
        &mut self,
        app_id: &str,
        config_key: &str,
    ) -> Result<Option<String>, StoreError> {
        debug!("Querying {}/{} from SQLite", app_id, config_key);

        let value = self
            .conn
            .query_row(&self.query, (app_id, config_key), |row| {
                row.get::<_, Option<String>>(0)
            })
            .optional()?;

        Ok(value.map(Option::unwrap_or_default))
    }
}

/// Bare `localhost` without a port means the local socket, as in
/// libmysqlclient. Falls back to TCP when no candidate socket exists.
fn resolve_endpoint(endpoint: &MysqlEndpoint, sockets: &[&str]) -> MysqlEndpoint {
    match endpoint {
        MysqlEndpoint::Tcp { host, port: None } if host == "localhost" => sockets
            .iter()
            .find(|socket| Path::new(socket).exists())
            .map(|socket| MysqlEndpoint::Socket(socket.to_string()))
            .unwrap_or_else(|| endpoint.clone()),
        _ => endpoint.clone(),
    }
}

pub struct MysqlStore {
    conn: Conn,
    query: String,
}

impl MysqlStore {
    pub fn connect(params: &MysqlParams, table_prefix: &str) -> Result<Self, StoreError> {
        let query = app_config_query(table_prefix)?;

        let builder = OptsBuilder::new()
            .user(Some(&params.user))
            .pass(Some(&params.password))
            .db_name(Some(&params.database));

        let builder = match &resolve_endpoint(&params.endpoint, DEFAULT_MYSQL_SOCKETS) {
            MysqlEndpoint::Tcp { host, port } => {
                info!("Connecting to MySQL at {}:{:?}", host, port);
                let builder = builder.ip_or_hostname(Some(host));
                match port {
                    Some(port) => builder.tcp_port(*port),
                    None => builder,
                }
            }
            MysqlEndpoint::Socket(socket) => {
                info!("Connecting to MySQL through socket {}", socket);
                builder.socket(Some(socket))
            }
        };

        let conn = Conn::new(builder)?;
        debug!("MySQL connection established");

        Ok(Self { conn, query })
    }
}

impl AppConfigStore for MysqlStore {
    fn app_config_value(
        &mut self,
        app_id: &str,
        config_key: &str,
    ) -> Result<Option<String>, StoreError> {
        debug!("Querying {}/{} from MySQL", app_id, config_key);

        let value: Option<Option<String>> =
            self.conn.exec_first(&self.query, (app_id, config_key))?;

        Ok(value.map(Option::unwrap_or_default))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn create_db(prefix: &str, rows: &[(&str, &str, Option<&str>)]) -> (TempDir, PathBuf) {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("nextcloud.db");
        let conn = Connection::open(&db_path).unwrap();
        conn.execute(
            &format!(
                "CREATE TABLE {}appconfig (appid TEXT NOT NULL, configkey TEXT NOT NULL, configvalue TEXT, PRIMARY KEY (appid, configkey))",
                prefix
            ),
            [],
        )
        .unwrap();
        for (app_id, key, value) in rows {
            conn.execute(
                &format!(
                    "INSERT INTO {}appconfig (appid, configkey, configvalue) VALUES (?1, ?2, ?3)",
                    prefix
                ),
                (app_id, key, value),
            )
            .unwrap();
        }
        (temp_dir, db_path)
    }

    #[test]
    fn sqlite_store_returns_value_for_matching_row() {
        let (_temp_dir, db_path) = create_db(
            "oc_",
            &[
                ("core", "lastupdateResult", Some(r#"{"version":"20.0.4"}"#)),
                ("core", "installedat", Some("1607600000")),
                ("files", "lastupdateResult", Some("{}")),
            ],
        );
        let mut store = SqliteStore::open(&db_path, "oc_").unwrap();

        let value = store.app_config_value("core", "lastupdateResult").unwrap();

        assert_eq!(value, Some(r#"{"version":"20.0.4"}"#.to_string()));
    }

    #[test]
    fn sqlite_store_returns_none_when_row_is_missing() {
        let (_temp_dir, db_path) = create_db("oc_", &[("core", "installedat", Some("1"))]);
        let mut store = SqliteStore::open(&db_path, "oc_").unwrap();

        let value = store.app_config_value("core", "lastupdateResult").unwrap();

        assert_eq!(value, None);
    }

    #[test]
    fn sqlite_store_maps_null_value_to_empty_string() {
        let (_temp_dir, db_path) = create_db("oc_", &[("core", "lastupdateResult", None)]);
        let mut store = SqliteStore::open(&db_path, "oc_").unwrap();

        let value = store.app_config_value("core", "lastupdateResult").unwrap();

        assert_eq!(value, Some(String::new()));
    }

    #[test]
    fn sqlite_store_uses_configured_table_prefix() {
        let (_temp_dir, db_path) = create_db("nc_", &[("core", "lastupdateResult", Some("{}"))]);
        let mut store = SqliteStore::open(&db_path, "nc_").unwrap();

        let value = store.app_config_value("core", "lastupdateResult").unwrap();

        assert_eq!(value, Some("{}".to_string()));
    }

    #[test]
    fn sqlite_store_fails_when_table_is_missing() {
        let (_temp_dir, db_path) = create_db("nc_", &[]);
        let mut store = SqliteStore::open(&db_path, "oc_").unwrap();

        let err = store.app_config_value("core", "lastupdateResult").unwrap_err();

        assert!(matches!(err, StoreError::Sqlite(_)));
    }

    #[test]
    fn sqlite_store_open_fails_for_missing_database() {
        let temp_dir = TempDir::new().unwrap();

        let result = SqliteStore::open(&temp_dir.path().join("absent.db"), "oc_");

        assert!(matches!(result, Err(StoreError::Sqlite(_))));
    }

    #[test]
    fn app_config_query_rejects_unsafe_prefix() {
        let err = app_config_query("oc_; DROP TABLE x; --").unwrap_err();

        assert!(matches!(err, StoreError::InvalidTablePrefix(_)));
    }

    #[test]
    fn resolve_endpoint_prefers_existing_socket_for_bare_localhost() {
        let temp_dir = TempDir::new().unwrap();
        let socket = temp_dir.path().join("mysqld.sock");
        std::fs::write(&socket, "").unwrap();
        let missing = temp_dir.path().join("absent.sock");
        let candidates = [missing.to_str().unwrap(), socket.to_str().unwrap()];
        let localhost = MysqlEndpoint::Tcp {
            host: "localhost".to_string(),
            port: None,
        };

        assert_eq!(
            resolve_endpoint(&localhost, &candidates),
            MysqlEndpoint::Socket(socket.to_str().unwrap().to_string())
        );
    }

    #[rstest]
    #[case(MysqlEndpoint::Tcp { host: "localhost".to_string(), port: Some(3306) })]
    #[case(MysqlEndpoint::Tcp { host: "127.0.0.1".to_string(), port: None })]
    #[case(MysqlEndpoint::Tcp { host: "db.internal".to_string(), port: None })]
    #[case(MysqlEndpoint::Socket("/srv/mysql.sock".to_string()))]
    fn resolve_endpoint_keeps_explicit_endpoints(#[case] endpoint: MysqlEndpoint) {
        let temp_dir = TempDir::new().unwrap();
        let socket = temp_dir.path().join("mysqld.sock");
        std::fs::write(&socket, "").unwrap();

        assert_eq!(
            resolve_endpoint(&endpoint, &[socket.to_str().unwrap()]),
            endpoint
        );
    }

    #[test]
    fn resolve_endpoint_falls_back_to_tcp_without_socket() {
        let temp_dir = TempDir::new().unwrap();
        let missing = temp_dir.path().join("absent.sock");
        let localhost = MysqlEndpoint::Tcp {
            host: "localhost".to_string(),
            port: None,
        };

        assert_eq!(
            resolve_endpoint(&localhost, &[missing.to_str().unwrap()]),
            localhost
        );
    }

    #[test]
    fn open_store_dispatches_to_sqlite_backend() {
        let (_temp_dir, db_path) = create_db("oc_", &[("core", "lastupdateResult", Some("[]"))]);
        let config = DatabaseConfig {
            backend: DatabaseBackend::Sqlite { path: db_path },
            table_prefix: "oc_".to_string(),
        };

        let mut store = open_store(&config).unwrap();

        assert_eq!(
            store.app_config_value("core", "lastupdateResult").unwrap(),
            Some("[]".to_string())
        );
    }
}
