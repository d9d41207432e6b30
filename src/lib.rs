//! Monitoring probe reporting whether a Nextcloud installation has a pending
//! update.
//!
//! - config.rs: probe constants and the application database configuration
//! - php: read-only parsing of PHP data files
//! - version: latest and installed version facts
//! - report.rs: decision table and status line
//! - probe.rs: one complete run

pub mod config;
pub mod php;
pub mod probe;
pub mod report;
pub mod version;
