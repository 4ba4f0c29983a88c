//! Gantry Services - Named service container with dependency-ordered lifecycle
//!
//! A small service container in the style of classic application-server
//! kernels: services are installed under hierarchical names, declare the
//! names they require, and the container starts and stops them in dependency
//! order on its own worker tasks. The deployment pipeline is expressed
//! entirely against this contract:
//!
//! - **ServiceName / Mode / ServiceState**: identity and lifecycle vocabulary
//! - **Service**: the async start/stop contract plus an optional exposed value
//! - **Injector / InjectedValue**: how dependency values reach dependents
//! - **ServiceContainer / ServiceTarget / ServiceBuilder**: installation and
//!   scheduling, with broadcast lifecycle events and await helpers
//!
//! Services installed through another service's child target live only as
//! long as that service stays up; removing a service tears down its whole
//! subtree before the name is released.

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]
#![cfg_attr(not(feature = "strict-docs"), allow(missing_docs))]

pub mod container;
pub mod error;
pub mod event;
pub mod inject;
pub mod mode;
pub mod name;
pub mod service;

// Re-exports
pub use container::{ContainerConfig, ServiceBuilder, ServiceContainer, ServiceRegistry, ServiceTarget};
pub use error::{ContainerError, Result, StartError};
pub use event::{ContainerEvent, EventKind};
pub use inject::{ErasedInjectedValue, InjectError, InjectedValue, Injector};
pub use mode::Mode;
pub use name::ServiceName;
pub use service::{Service, ServiceState, ServiceValue, StartContext, StopContext, ValueService};
