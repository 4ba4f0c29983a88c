//! Gantry Deployment - The phased deployment processing kernel
//!
//! Deployments enter as content blobs and come out the other side as running
//! services. In between sits a fixed sequence of [`Phase`]s, each backed by
//! an ordered chain of [`DeploymentUnitProcessor`]s that transform the
//! [`DeploymentUnit`]'s attachments and install runtime services. The phase
//! engine expresses the whole pipeline as container services:
//!
//! - one bootstrap service per unit anchors the chain and owns the unit's
//!   arena entry
//! - one service per phase runs that phase's processors and installs the
//!   next phase, gated on every dependency the processors recorded
//! - removing the bootstrap unwinds everything in reverse, undeploying each
//!   phase's processors back-to-front
//!
//! Failures are symmetric with success: a processor error unwinds the
//! processors that already ran in its phase and leaves no service for that
//! phase or any later one, while services installed for earlier phases come
//! down through the ordinary reverse path.

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]
#![cfg_attr(not(feature = "strict-docs"), allow(missing_docs))]

pub mod attachments;
pub mod chain;
pub mod context;
pub mod deferred;
pub mod error;
pub mod manager;
pub mod names;
pub mod phase;
pub mod processor;
pub mod registry;
pub mod unit;

mod phase_service;
mod unit_service;

// Re-exports
pub use chain::{DeployerChains, DeployerChainsBuilder, Priority, RegisteredProcessor};
pub use context::DeploymentPhaseContext;
pub use deferred::DeferredModuleList;
pub use error::{DeployerError, DeploymentUnitProcessingError, Result};
pub use manager::{DeploymentManager, DeploymentPlan};
pub use phase::Phase;
pub use processor::DeploymentUnitProcessor;
pub use registry::DeploymentUnitRegistry;
pub use unit::DeploymentUnit;
pub use unit_service::install_sub_deployment;
