//! One probe run: read both version facts and build the report

use std::path::Path;

use anyhow::Context;
use tracing::{error, info};

use crate::config::load_database_config;
use crate::report::Report;
use crate::version::installed::fetch_installed_version;
use crate::version::latest::fetch_latest_version;
use crate::version::store::open_store;
use crate::version::LatestVersion;

/// Run the probe against the installation at `base_dir`.
///
/// Never fails: configuration and database errors are logged and reported
/// as an unknown latest version, which can only yield a warning.
pub fn run(base_dir: &Path) -> Report {
    info!("Checking Nextcloud installation at {:?}", base_dir);

    let latest = read_latest_version(base_dir).unwrap_or_else(|e| {
        error!("Unable to read the latest version: {:#}", e);
        LatestVersion::Unknown
    });
    let installed = fetch_installed_version(base_dir);

    let report = Report::from_facts(&latest, &installed);
    info!(
        "latest={:?} installed={:?} status={}",
        latest, installed, report.status
    );
    report
}

/// Load the database configuration, connect, and read the last update
/// check result.
pub fn read_latest_version(base_dir: &Path) -> anyhow::Result<LatestVersion> {
    let config =
        load_database_config(base_dir).context("Failed to load database configuration")?;
    let mut store = open_store(&config).context("Failed to open application database")?;
    let latest = fetch_latest_version(store.as_mut())
        .context("Failed to query the last update check result")?;

    Ok(latest)
}
