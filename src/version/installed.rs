//! Installed version, read from the application's `version.php`

use std::path::Path;

use tracing::{debug, warn};

use crate::config::VERSION_FILE;
use crate::php::{self, PhpValue};
use crate::version::error::VersionFileError;

const VERSION_VARIABLE: &str = "OC_Version";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstalledVersion {
    Known(String),
    Unreadable,
}

/// Read the installed version, logging why it could not be determined.
pub fn fetch_installed_version(base_dir: &Path) -> InstalledVersion {
    match read_installed_version(base_dir) {
        Ok(version) => {
            debug!("Installed version is {}", version);
            InstalledVersion::Known(version)
        }
        Err(e) => {
            warn!("Unable to read installed version: {}", e);
            InstalledVersion::Unreadable
        }
    }
}

/// Read `$OC_Version` from `<base_dir>/version.php` and join its components
/// with `.`.
pub fn read_installed_version(base_dir: &Path) -> Result<String, VersionFileError> {
    let path = base_dir.join(VERSION_FILE);
    debug!("Reading version descriptor from {:?}", path);

    let source = std::fs::read_to_string(&path).map_err(|source| VersionFileError::Io {
        path: path.clone(),
        source,
    })?;

    let value = php::extract_assignment(&source, VERSION_VARIABLE)
        .map_err(|source| VersionFileError::Php {
            path: path.clone(),
            source,
        })?
        .ok_or(VersionFileError::MissingAssignment { path })?;

    join_version_components(&value)
}

/// Join a list of non-negative integers, e.g. `[20, 0, 3]` -> `20.0.3`.
fn join_version_components(value: &PhpValue) -> Result<String, VersionFileError> {
    let PhpValue::Array(entries) = value else {
        return Err(VersionFileError::InvalidComponents(format!(
            "expected an array, found {:?}",
            value
        )));
    };

    if entries.is_empty() {
        return Err(VersionFileError::InvalidComponents(
            "empty array".to_string(),
        ));
    }

    let components = entries
        .values()
        .map(|component| match component {
            PhpValue::Int(n) if *n >= 0 => Ok(n.to_string()),
            other => Err(VersionFileError::InvalidComponents(format!(
                "{:?} is not a version number",
                other
            ))),
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(components.join("."))
}
