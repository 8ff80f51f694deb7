//! StreamLens Web Dashboard
//!
//! Serves the listening-history dashboard UI and the JSON analysis API the
//! UI posts export files to.

pub mod server;
pub mod static_files;

pub use server::{serve, WebServer, WebServerConfig};
