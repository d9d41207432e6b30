use std::path::PathBuf;

use thiserror::Error;

use crate::php::PhpLiteralError;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("MySQL error: {0}")]
    Mysql(#[from] mysql::Error),

    #[error("Invalid table prefix: {0:?}")]
    InvalidTablePrefix(String),
}

#[derive(Debug, Error)]
pub enum VersionFileError {
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

    #[error("{} does not assign $OC_Version", path.display())]
    MissingAssignment { path: PathBuf },

    #[error("Invalid version components: {0}")]
    InvalidComponents(String),
}
