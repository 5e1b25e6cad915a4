//! Core building blocks for lading operations
//!
//! - **config**: lading.toml parsing and validation
//! - **error**: Error taxonomy with exit codes and contextual help messages

pub mod config;
pub mod error;
