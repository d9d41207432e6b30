//! Latest available version, as recorded by the application's own update check

use serde_json::Value;
use tracing::debug;

use crate::config::{UPDATE_RESULT_APP_ID, UPDATE_RESULT_CONFIG_KEY};
use crate::version::error::StoreError;
use crate::version::store::AppConfigStore;

/// Result of the last update check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LatestVersion {
    /// No usable update check result
    Unknown,
    /// The check ran and found nothing to install
    UpToDate,
    /// The check found this version
    Available(String),
}

/// Interpret the JSON stored under `core/lastupdateResult`.
///
/// An empty list counts as an empty mapping: the application encodes "no
/// update" as `[]`.
pub fn parse_last_update_result(raw: &str) -> LatestVersion {
    let value = match serde_json::from_str::<Value>(raw) {
        Ok(value) => value,
        Err(e) => {
            debug!("Update check result is not valid JSON: {}", e);
            return LatestVersion::Unknown;
        }
    };

    match value {
        Value::Object(map) if map.is_empty() => LatestVersion::UpToDate,
        Value::Array(items) if items.is_empty() => LatestVersion::UpToDate,
        Value::Object(map) => match map.get("version") {
            Some(Value::String(version)) => LatestVersion::Available(version.clone()),
            other => {
                debug!("Update check result has no usable version: {:?}", other);
                LatestVersion::Unknown
            }
        },
        other => {
            debug!("Update check result is not a mapping: {}", other);
            LatestVersion::Unknown
        }
    }
}

/// Read and interpret the last update check result.
///
/// A missing row is `Unknown`; store failures are returned as errors.
pub fn fetch_latest_version<S: AppConfigStore + ?Sized>(
    store: &mut S,
) -> Result<LatestVersion, StoreError> {
    let Some(raw) = store.app_config_value(UPDATE_RESULT_APP_ID, UPDATE_RESULT_CONFIG_KEY)? else {
        debug!("No update check result stored");
        return Ok(LatestVersion::Unknown);
    };

    Ok(parse_last_update_result(&raw))
}
