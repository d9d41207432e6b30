//! Version facts compared by the probe
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐
//! │    Store    │────▶│   Latest    │──┐
//! │ (appconfig) │     │ (JSON fact) │  │   ┌─────────────┐
//! └─────────────┘     └─────────────┘  ├──▶│   Report    │
//! ┌─────────────┐     ┌─────────────┐  │   │  (compare)  │
//! │ version.php │────▶│  Installed  │──┘   └─────────────┘
//! └─────────────┘     └─────────────┘
//! ```
//!
//! # Modules
//!
//! - [`store`]: `AppConfigStore` trait with SQLite and MySQL backends
//! - [`latest`]: Interpretation of the stored update check result
//! - [`installed`]: Installed version from the version descriptor
//! - [`error`]: Error types for store and version file operations

pub mod error;
pub mod installed;
pub mod latest;
pub mod store;

pub use installed::InstalledVersion;
pub use latest::LatestVersion;
