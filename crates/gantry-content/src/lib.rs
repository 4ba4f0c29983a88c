//! Gantry Content - Content-addressed storage for deployment blobs
//!
//! Deployment content is immutable and addressed by its BLAKE3 hash. The
//! repository keeps each blob at a stable filesystem path so deployments can
//! be installed, removed, and re-installed from the same bytes without the
//! caller holding the content itself:
//!
//! - **ContentHash**: a 32-byte digest with a lowercase hex text form
//! - **ContentRepository**: the async storage contract
//! - **FsContentRepository**: the filesystem implementation with a fan-out
//!   directory layout

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]
#![cfg_attr(not(feature = "strict-docs"), allow(missing_docs))]

pub mod error;
pub mod hash;
pub mod repository;

// Re-exports
pub use error::{ContentError, Result};
pub use hash::ContentHash;
pub use repository::{ContentRepository, FsContentRepository};
