//! HDP Common Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Shared types, utilities, and error handling for the HDP project.
//!
//! # Overview
//!
//! This crate provides common functionality used across all HDP workspace members:
//!
//! - **Error Handling**: Custom error types and result types
//! - **Checksums**: Package and file integrity verification utilities
//! - **Types**: Shared domain types (package kinds, statuses)
//! - **Logging**: Centralized tracing subscriber setup
//!
//! # Example
//!
//! ```no_run
//! use hdp_common::{Result, HdpError};
//! use hdp_common::checksum::digest_bytes;
//! use hdp_common::types::ChecksumAlgorithm;
//!
//! fn fingerprint(data: &[u8]) -> Result<String> {
//!     Ok(digest_bytes(data, ChecksumAlgorithm::Sha256))
//! }
//! ```

pub mod checksum;
pub mod error;
pub mod logging;
pub mod types;

// Re-export commonly used types
pub use error::{HdpError, Result};
