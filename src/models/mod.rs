//! Data models for ONEKEY platform entities.
//!
//! - `Tenant`: an isolated customer environment within the platform
//! - `FirmwareMetadata`: descriptive fields attached to a firmware upload

pub mod firmware;
pub mod tenant;

pub use firmware::FirmwareMetadata;
pub use tenant::Tenant;
