//! Status line for the monitoring system

use std::fmt;

use crate::config::SERVICE_NAME;
use crate::version::{InstalledVersion, LatestVersion};

/// Monitoring state. Doubles as the process exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Ok,
    Warning,
}

impl Status {
    pub fn code(self) -> u8 {
        match self {
            Status::Ok => 0,
            Status::Warning => 1,
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    pub status: Status,
    pub message: String,
}

impl Report {
    fn new(status: Status, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    /// Decide the report for a pair of facts. Rules are checked in order;
    /// an unknown latest version wins over an unreadable installed one.
    pub fn from_facts(latest: &LatestVersion, installed: &InstalledVersion) -> Self {
        let installed = match (latest, installed) {
            (LatestVersion::Unknown, _) => {
                return Self::new(Status::Warning, "Unable to read new version");
            }
            (_, InstalledVersion::Unreadable) => {
                return Self::new(Status::Warning, "Unable to read current version");
            }
            (_, InstalledVersion::Known(installed)) => installed,
        };

        match latest {
            LatestVersion::Available(available) if available != installed => Self::new(
                Status::Warning,
                format!(
                    "An update to version {} is available (installed version: {})",
                    available, installed
                ),
            ),
            _ => Self::new(
                Status::Ok,
                format!("No update available (installed version: {})", installed),
            ),
        }
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} - {}", self.status, SERVICE_NAME, self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn known(version: &str) -> InstalledVersion {
        InstalledVersion::Known(version.to_string())
    }

    fn available(version: &str) -> LatestVersion {
        LatestVersion::Available(version.to_string())
    }

    #[rstest]
    #[case(LatestVersion::Unknown, known("20.0.3"), Status::Warning, "Unable to read new version")]
    #[case(LatestVersion::Unknown, InstalledVersion::Unreadable, Status::Warning, "Unable to read new version")]
    #[case(LatestVersion::UpToDate, InstalledVersion::Unreadable, Status::Warning, "Unable to read current version")]
    #[case(available("20.0.4"), InstalledVersion::Unreadable, Status::Warning, "Unable to read current version")]
    #[case(LatestVersion::UpToDate, known("20.0.3"), Status::Ok, "No update available (installed version: 20.0.3)")]
    #[case(available("20.0.3"), known("20.0.3"), Status::Ok, "No update available (installed version: 20.0.3)")]
    #[case(available("20.0.4"), known("20.0.3"), Status::Warning, "An update to version 20.0.4 is available (installed version: 20.0.3)")]
    #[case(available("20.0.3"), known("20.0.3.2"), Status::Warning, "An update to version 20.0.3 is available (installed version: 20.0.3.2)")]
    fn from_facts_follows_decision_table(
        #[case] latest: LatestVersion,
        #[case] installed: InstalledVersion,
        #[case] status: Status,
        #[case] message: &str,
    ) {
        let report = Report::from_facts(&latest, &installed);

        assert_eq!(
            report,
            Report {
                status,
                message: message.to_string(),
            }
        );
    }

    #[test]
    fn display_renders_local_check_line() {
        let report = Report::from_facts(&available("20.0.4"), &known("20.0.3"));

        assert_eq!(
            report.to_string(),
            "1 Nextcloud_Version - An update to version 20.0.4 is available (installed version: 20.0.3)"
        );
    }

    #[test]
    fn status_codes_are_ok_and_warning() {
        assert_eq!(Status::Ok.code(), 0);
        assert_eq!(Status::Warning.code(), 1);
    }
}
