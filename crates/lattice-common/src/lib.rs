//! Common types for Lattice worker planning: resources, errors, and utilities

#![deny(missing_docs)]

pub mod crd;
pub mod error;
pub mod kube_utils;
pub mod telemetry;

pub use error::Error;

/// Result type alias using our custom Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Field manager name used for server-side apply and status patches
pub const FIELD_MANAGER: &str = "lattice-worker";
