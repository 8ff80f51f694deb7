//! StreamLens Common Library
//!
//! Shared types and utilities for the StreamLens platform: the
//! listening-history record model, export-file ingest, and the
//! aggregation that backs the dashboard.

pub mod error;
pub mod ingest;
pub mod stats;
pub mod types;

// Re-export commonly used types
pub use error::{Error, Result};
pub use ingest::{load_paths, parse_export};
pub use stats::DashboardStats;
pub use types::*;

/// StreamLens version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
