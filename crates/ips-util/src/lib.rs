//! Shared utilities for ips-common
//!
//! This crate provides:
//! - Default paths for configuration and data files
//! - host:port formatting for URLs

mod net;
mod paths;

pub use net::*;
pub use paths::*;
