//! Well-known attachment keys
//!
//! Keys compare by identity, so anything that wants to read state written
//! under one of these must use the static itself. Keys not listed here are
//! private coordination between cooperating processors.

use std::path::PathBuf;
use std::sync::{Arc, LazyLock};

use gantry_attachments::{AttachmentKey, ListAttachmentKey};
use gantry_content::ContentHash;
use gantry_services::ServiceName;

use crate::context::AttachableDependency;
use crate::deferred::DeferredModuleList;

/// The name the deployment runs under. Differs from the management name
/// when a runtime name was supplied at deploy time.
pub static RUNTIME_NAME: LazyLock<AttachmentKey<String>> =
    LazyLock::new(|| AttachmentKey::create("runtime-name"));

/// The name the deployment is managed under.
pub static MANAGEMENT_NAME: LazyLock<AttachmentKey<String>> =
    LazyLock::new(|| AttachmentKey::create("management-name"));

/// Hash of the deployment's content blob.
pub static CONTENT_HASH: LazyLock<AttachmentKey<ContentHash>> =
    LazyLock::new(|| AttachmentKey::create("content-hash"));

/// Path of the content blob, set on top-level units before the first phase
/// runs.
pub static DEPLOYMENT_CONTENTS: LazyLock<AttachmentKey<PathBuf>> =
    LazyLock::new(|| AttachmentKey::create("deployment-contents"));

/// Root a sub-deployment is mounted under, set on sub-deployment units.
pub static DEPLOYMENT_ROOT: LazyLock<AttachmentKey<PathBuf>> =
    LazyLock::new(|| AttachmentKey::create("deployment-root"));

/// Service names of a unit's sub-deployments, in registration order.
pub static SUB_DEPLOYMENT_NAMES: LazyLock<ListAttachmentKey<ServiceName>> =
    LazyLock::new(|| ListAttachmentKey::create("sub-deployment-names"));

/// Subsystems whose processors are skipped for this unit. A unit that never
/// materialized this list inherits its parent's; an empty list excludes
/// nothing.
pub static EXCLUDED_SUBSYSTEMS: LazyLock<ListAttachmentKey<String>> =
    LazyLock::new(|| ListAttachmentKey::create("excluded-subsystems"));

/// Marks a unit whose first module use is held back until every deferred
/// sibling under the same top-level unit is ready.
pub static DEFERRED_MODULE: LazyLock<AttachmentKey<bool>> =
    LazyLock::new(|| AttachmentKey::create("deferred-module"));

/// Shared bookkeeping of deferred siblings, attached to the top-level unit.
pub static DEFERRED_MODULES: LazyLock<AttachmentKey<Arc<DeferredModuleList>>> =
    LazyLock::new(|| AttachmentKey::create("deferred-modules"));

// Engine-internal keys on the phase context: dependency requests recorded
// during a phase, drained when the next phase's service is installed.

pub(crate) static NEXT_PHASE_DEPS: LazyLock<ListAttachmentKey<ServiceName>> =
    LazyLock::new(|| ListAttachmentKey::create("next-phase-deps"));

pub(crate) static NEXT_PHASE_ATTACHABLE_DEPS: LazyLock<ListAttachmentKey<AttachableDependency>> =
    LazyLock::new(|| ListAttachmentKey::create("next-phase-attachable-deps"));
