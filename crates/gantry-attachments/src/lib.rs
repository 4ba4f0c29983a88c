//! Gantry Attachments - Typed, identity-keyed state for deployment processing
//!
//! Deployment units and phase contexts carry loosely-coupled state between
//! processors as *attachments*: values addressed by typed key tokens rather
//! than by name. This crate provides:
//!
//! - **AttachmentKey / ListAttachmentKey**: opaque identity tokens, each
//!   parameterized by the value type it stores
//! - **AttachmentStore**: a mutex-guarded heterogeneous map addressed by keys
//! - **Attachable**: the trait implemented by anything that owns a store
//!
//! Keys are compared by identity, never by name. Two keys created with the
//! same diagnostic name are still distinct, so a processor can only read what
//! it (or a collaborator sharing the key) wrote.

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]
#![cfg_attr(not(feature = "strict-docs"), allow(missing_docs))]

pub mod attachable;
pub mod error;
pub mod key;
pub mod store;

// Re-exports
pub use attachable::Attachable;
pub use error::{AttachmentError, Result};
pub use key::{AttachmentKey, ListAttachmentKey};
pub use store::AttachmentStore;
